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

//! Long-to-wide reshaping for multi-line charts.
//!
//! A result such as `(date, metric, value)` with one row per date and metric
//! becomes one row per date with a column per distinct metric, which is the
//! shape a line renderer needs to draw one line per metric.

use indexmap::{IndexMap, IndexSet};
use llm_contracts::{CellValue, ChartConfig, Row};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotedSeries {
    /// One row per distinct axis value, in first-seen order.
    pub data: Vec<Row>,
    pub x_axis_field: String,
    /// Distinct measurement values, in first-seen order; one line each.
    pub line_fields: Vec<String>,
}

/// Pivots `rows` when `config` asks for a multi-line layout, `None` otherwise.
///
/// The measured value of each row is read from the first `yKeys` column that is
/// not the measurement column. When two rows share an axis value and a
/// measurement value, the later row overwrites the earlier one. Nothing is
/// summed, so such duplicates lose data.
pub fn pivot(rows: &[Row], config: &ChartConfig) -> Option<PivotedSeries> {
    if !config.uses_multi_line_pivot() {
        return None;
    }
    let measurement = config.measurement_column.as_deref()?;
    let x_key = config.x_key.as_str();
    let value_column = config.y_keys.iter().find(|k| k.as_str() != measurement);
    if value_column.is_none() {
        warn!(
            measurement,
            "No value column besides the measurement column, lines will be empty"
        );
    }

    let mut groups: IndexMap<String, Row> = IndexMap::new();
    let mut line_fields: IndexSet<String> = IndexSet::new();
    let mut overwritten = 0usize;

    for row in rows {
        let axis_value = row.get(x_key).cloned().unwrap_or_default();
        let series = row
            .get(measurement)
            .map_or_else(|| CellValue::Null.to_string(), ToString::to_string);
        line_fields.insert(series.clone());

        let wide = groups.entry(axis_value.to_string()).or_insert_with(|| {
            let mut wide = Row::new();
            wide.insert(x_key.to_string(), axis_value.clone());
            wide
        });
        if let Some(column) = value_column {
            let value = row.get(column).cloned().unwrap_or_default();
            if wide.insert(series, value).is_some() {
                overwritten += 1;
            }
        }
    }

    if overwritten > 0 {
        debug!(
            overwritten,
            "Duplicate axis/measurement pairs, later rows won"
        );
    }

    Some(PivotedSeries {
        data: groups.into_values().collect(),
        x_axis_field: x_key.to_string(),
        line_fields: line_fields.into_iter().collect(),
    })
}
