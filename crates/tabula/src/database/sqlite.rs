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

use super::ensure_read_only;
use chrono::NaiveDate;
use llm_contracts::{CellValue, CollaboratorError, CollaboratorResult, QueryExecutor, RawRow};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::str::FromStr;
use tracing::{debug, info, instrument};

/// Runs generated queries against SQLite.
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
    pool: SqlitePool,
}

impl SqliteExecutor {
    /// In-memory databases live as long as their one pooled connection, so
    /// that connection is never recycled.
    pub async fn connect(url: &str) -> CollaboratorResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_error)?
            .create_if_missing(true);
        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            SqlitePoolOptions::new()
                .max_connections(4)
                .connect_with(options)
                .await
        }
        .map_err(db_error)?;
        info!(url, "Connected to SQLite");
        Ok(Self { pool })
    }

    /// Runs a multi-statement script such as a schema plus seed data. No
    /// read-only check applies here.
    pub async fn execute_script(&self, script: &str) -> CollaboratorResult<()> {
        sqlx::raw_sql(script)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait::async_trait]
impl QueryExecutor for SqliteExecutor {
    #[instrument(skip(self))]
    async fn execute_query(&self, query: &str) -> CollaboratorResult<Vec<RawRow>> {
        ensure_read_only(query)?;
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        debug!(rows = rows.len(), "Query executed");
        rows.iter().map(convert_row).collect()
    }
}

fn db_error(err: sqlx::Error) -> CollaboratorError {
    CollaboratorError::Database(err.to_string())
}

fn convert_row(row: &SqliteRow) -> CollaboratorResult<RawRow> {
    let mut raw = RawRow::with_capacity(row.columns().len());
    for column in row.columns() {
        let idx = column.ordinal();
        let declared_date = column.type_info().name().to_ascii_uppercase().contains("DATE");
        let value = row.try_get_raw(idx).map_err(db_error)?;
        let cell = if value.is_null() {
            CellValue::Null
        } else {
            let storage = value.type_info().name().to_ascii_uppercase();
            match storage.as_str() {
                "INTEGER" | "BOOLEAN" => {
                    let n: i64 = row.try_get_unchecked(idx).map_err(db_error)?;
                    CellValue::from(n)
                }
                "REAL" | "NUMERIC" => {
                    let n: f64 = row.try_get_unchecked(idx).map_err(db_error)?;
                    CellValue::Number(n)
                }
                "BLOB" => {
                    let bytes: Vec<u8> = row.try_get_unchecked(idx).map_err(db_error)?;
                    CellValue::Text(hex::encode(bytes))
                }
                _ => {
                    let text: String = row.try_get_unchecked(idx).map_err(db_error)?;
                    text_cell(text, declared_date)
                }
            }
        };
        raw.insert(column.name().to_string(), cell);
    }
    Ok(raw)
}

fn text_cell(text: String, declared_date: bool) -> CellValue {
    if declared_date {
        if let Ok(date) = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d") {
            return CellValue::Date(date);
        }
    }
    CellValue::Text(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_in_date_columns_becomes_a_date() {
        assert_eq!(
            text_cell("2021-06-01".into(), true),
            CellValue::Date(NaiveDate::from_ymd_opt(2021, 6, 1).unwrap())
        );
        assert_eq!(text_cell("2021-06-01".into(), false), CellValue::text("2021-06-01"));
        assert_eq!(text_cell("June".into(), true), CellValue::text("June"));
    }
}
