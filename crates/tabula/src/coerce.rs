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

//! Numeric coercion of raw result cells.
//!
//! Data sources hand back numbers as text often enough (aggregates, decimal
//! columns) that category axes and measures can only be told apart after
//! coercion. A cell is converted when, and only when, its text is a complete
//! decimal number literal; the position of the cell never matters.

use llm_contracts::{CellValue, RawRow, ResultSet, Row, RowShapeError};

/// Coerces every cell and builds the result set.
pub fn coerce(rows: Vec<RawRow>) -> Result<ResultSet, RowShapeError> {
    let coerced = rows.into_iter().map(coerce_row).collect();
    ResultSet::from_rows(coerced)
}

pub fn coerce_row(row: RawRow) -> Row {
    row.into_iter()
        .map(|(column, value)| (column, coerce_cell(value)))
        .collect()
}

pub fn coerce_cell(value: CellValue) -> CellValue {
    match value {
        CellValue::Text(text) => match parse_numeric_text(&text) {
            Some(number) => CellValue::Number(number),
            None => CellValue::Text(text),
        },
        other => other,
    }
}

/// Parses text that is entirely a finite decimal literal, surrounding
/// whitespace allowed: `12`, `-3.5`, `.5`, `4.`, `1e6`, `+2.5E-3`.
pub fn parse_numeric_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if !is_decimal_literal(trimmed) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn is_decimal_literal(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        digits += i - frac_start;
    }
    if digits == 0 {
        return false;
    }
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }
    i == bytes.len()
}
