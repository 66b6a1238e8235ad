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

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single cell of a query result.
///
/// Serialised untagged so rows round-trip through plain JSON objects. Variant
/// order matters for deserialisation: a string is tried as a date before it
/// falls back to text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl CellValue {
    pub fn text<S: Into<String>>(value: S) -> Self {
        Self::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

/// Column name to cell, in column order.
pub type Row = IndexMap<String, CellValue>;

/// A row exactly as the executor produced it, before numeric coercion.
pub type RawRow = Row;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("row {row} has columns {found:?}, expected {expected:?}")]
pub struct RowShapeError {
    pub row: usize,
    pub expected: Vec<String>,
    pub found: Vec<String>,
}

/// Rows of one query result plus the column list derived from the first row.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl ResultSet {
    /// Builds a result set, rejecting rows whose key set differs from the first row's.
    pub fn from_rows(rows: Vec<Row>) -> Result<Self, RowShapeError> {
        let columns: Vec<String> = rows
            .first()
            .map(|first| first.keys().cloned().collect())
            .unwrap_or_default();
        for (index, row) in rows.iter().enumerate().skip(1) {
            let same_shape =
                row.len() == columns.len() && columns.iter().all(|c| row.contains_key(c));
            if !same_shape {
                return Err(RowShapeError {
                    row: index,
                    expected: columns,
                    found: row.keys().cloned().collect(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// A chart needs at least two columns and two rows to say anything.
    pub fn is_chartable(&self) -> bool {
        self.columns.len() > 1 && self.rows.len() >= 2
    }
}

/// Chart families the renderer knows, plus whatever else a model might answer with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChartKind {
    Bar,
    Line,
    Area,
    Pie,
    Other(String),
}

impl ChartKind {
    pub fn as_str(&self) -> &str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Area => "area",
            ChartKind::Pie => "pie",
            ChartKind::Other(name) => name,
        }
    }

    /// Bar and pie charts plot one mark per category.
    pub fn is_categorical(&self) -> bool {
        matches!(self, ChartKind::Bar | ChartKind::Pie)
    }
}

impl From<String> for ChartKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "bar" => ChartKind::Bar,
            "line" => ChartKind::Line,
            "area" => ChartKind::Area,
            "pie" => ChartKind::Pie,
            _ => ChartKind::Other(s),
        }
    }
}

impl From<&str> for ChartKind {
    fn from(s: &str) -> Self {
        ChartKind::from(s.to_string())
    }
}

impl From<ChartKind> for String {
    fn from(kind: ChartKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declarative chart description inferred for a result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub x_key: String,
    pub y_keys: Vec<String>,
    #[serde(default)]
    pub legend: bool,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub takeaway: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_lines: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_column: Option<String>,
}

impl ChartConfig {
    pub fn new<S: Into<String>>(kind: ChartKind, x_key: S, y_keys: Vec<String>) -> Self {
        Self {
            kind,
            x_key: x_key.into(),
            y_keys,
            legend: false,
            title: String::new(),
            description: String::new(),
            takeaway: String::new(),
            multiple_lines: None,
            measurement_column: None,
        }
    }

    /// True when a line chart declares one line per distinct value of
    /// `measurement_column` and that column is one of the measured keys.
    pub fn uses_multi_line_pivot(&self) -> bool {
        self.kind == ChartKind::Line
            && self.multiple_lines == Some(true)
            && self
                .measurement_column
                .as_ref()
                .is_some_and(|m| self.y_keys.contains(m))
    }

    /// Checks the config against the columns of the result it describes.
    ///
    /// The multi-line hints are not checked here: a config whose hints do
    /// not describe a pivot is drawn from the rows as they are.
    pub fn validate(&self, columns: &[String]) -> Result<(), String> {
        if self.y_keys.is_empty() {
            return Err("yKeys must not be empty".to_string());
        }
        if !columns.contains(&self.x_key) {
            return Err(format!("xKey '{}' is not a result column", self.x_key));
        }
        if let Some(missing) = self.y_keys.iter().find(|k| !columns.contains(k)) {
            return Err(format!("yKey '{missing}' is not a result column"));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialisation error: {0}")]
    Serialisation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Timeout error")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

impl From<serde_json::Error> for CollaboratorError {
    fn from(err: serde_json::Error) -> Self {
        CollaboratorError::Serialisation(err.to_string())
    }
}
