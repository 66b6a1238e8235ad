// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

pub mod sqlite;

pub use sqlite::SqliteExecutor;

use llm_contracts::{CollaboratorError, CollaboratorResult};
use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

/// Rejects anything but a single read-only query (`SELECT`, `VALUES` or
/// `WITH ... SELECT`). Generated queries run unattended, so this is the last
/// gate before the database.
pub fn ensure_read_only(query: &str) -> CollaboratorResult<()> {
    let statements = Parser::parse_sql(&SQLiteDialect {}, query)
        .map_err(|e| CollaboratorError::Database(format!("Could not parse query: {e}")))?;
    let statement = match statements.as_slice() {
        [statement] => statement,
        [] => return Err(CollaboratorError::Database("Query is empty".to_string())),
        _ => {
            return Err(CollaboratorError::Database(
                "Only a single statement is allowed".to_string(),
            ))
        }
    };
    match statement {
        Statement::Query(query) if is_read_only(query) => Ok(()),
        Statement::Query(_) => Err(CollaboratorError::Database(
            "Query modifies data".to_string(),
        )),
        other => Err(CollaboratorError::Database(format!(
            "Only SELECT queries are allowed, got: {}",
            statement_kind(other)
        ))),
    }
}

fn is_read_only(query: &Query) -> bool {
    let ctes_read_only = query
        .with
        .as_ref()
        .map_or(true, |with| with.cte_tables.iter().all(|cte| is_read_only(&cte.query)));
    ctes_read_only && is_read_only_body(&query.body)
}

fn is_read_only_body(body: &SetExpr) -> bool {
    match body {
        SetExpr::Select(_) | SetExpr::Values(_) | SetExpr::Table(_) => true,
        SetExpr::Query(query) => is_read_only(query),
        SetExpr::SetOperation { left, right, .. } => {
            is_read_only_body(left) && is_read_only_body(right)
        }
        _ => false,
    }
}

fn statement_kind(statement: &Statement) -> &'static str {
    match statement {
        Statement::Insert { .. } => "INSERT",
        Statement::Update { .. } => "UPDATE",
        Statement::Delete { .. } => "DELETE",
        Statement::Drop { .. } => "DROP",
        Statement::AlterTable { .. } => "ALTER TABLE",
        Statement::CreateTable { .. }
        | Statement::CreateIndex { .. }
        | Statement::CreateView { .. } => "CREATE",
        Statement::Truncate { .. } => "TRUNCATE",
        Statement::Pragma { .. } => "PRAGMA",
        Statement::AttachDatabase { .. } => "ATTACH",
        _ => "non-query statement",
    }
}
