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

//! Display-ready tabular results and the query preview shown above them.

use crate::format::{column_title, CellFormatter};
use llm_contracts::{QueryExplanation, ResultSet};
use serde::Serialize;

pub const NO_RESULTS_MESSAGE: &str = "No results found.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    /// Column titles for display, in result column order.
    pub headers: Vec<String>,
    pub columns: Vec<String>,
    /// Formatted cells, one inner vector per result row.
    pub rows: Vec<Vec<String>>,
    /// Whether the result set can also be drawn as a chart.
    pub chartable: bool,
}

impl TableView {
    /// Formats every row. Sampling never applies here.
    pub fn from_results(results: &ResultSet, formatter: &CellFormatter) -> Self {
        let columns = results.columns().to_vec();
        let rows = results
            .rows()
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| {
                        row.get(column)
                            .map(|value| formatter.format(column, value))
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();
        Self {
            headers: columns.iter().map(|c| column_title(c)).collect(),
            columns,
            rows,
            chartable: results.is_chartable(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Message shown in place of the table when there is nothing to show.
    pub fn empty_message(&self) -> Option<&'static str> {
        self.is_empty().then_some(NO_RESULTS_MESSAGE)
    }
}

/// The generated query, collapsed to a prefix until the user asks for more.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPreview {
    query: String,
    cutoff: usize,
    expanded: bool,
    explanations: Vec<QueryExplanation>,
}

impl QueryPreview {
    /// Long queries start expanded.
    pub fn new<S: Into<String>>(query: S, cutoff: usize) -> Self {
        let query = query.into();
        let expanded = query.chars().count() > cutoff;
        Self {
            query,
            cutoff,
            expanded,
            explanations: Vec::new(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_long(&self) -> bool {
        self.query.chars().count() > self.cutoff
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn expand(&mut self) {
        self.expanded = true;
    }

    /// Attaching explanations also expands the preview.
    pub fn attach_explanations(&mut self, explanations: Vec<QueryExplanation>) {
        self.expanded = true;
        self.explanations = explanations;
    }

    pub fn explanations(&self) -> &[QueryExplanation] {
        &self.explanations
    }

    pub fn display(&self) -> String {
        if self.expanded {
            return self.query.clone();
        }
        let mut shown: String = self.query.chars().take(self.cutoff).collect();
        if self.is_long() {
            shown.push_str("...");
        }
        shown
    }
}
