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

use llm_contracts::ResultSet;

/// Rows beyond this are left out of the chart prompt.
pub const CHART_PROMPT_ROW_LIMIT: usize = 50;

pub fn query_system_prompt(schema: &str) -> String {
    format!(
        "You are a SQL (SQLite) and data visualisation expert. Write a single read-only \
SELECT query that answers the user's question against this table:\n\n{schema}\n\n\
Rules:\n\
- Only SELECT statements; never modify data.\n\
- Match text with LOWER(column) LIKE LOWER('%term%') so case and partial matches work.\n\
- select_investors is a comma separated list; search it with LIKE.\n\
- Return at least two columns when the answer could be charted, for example a category \
and a count, so it can be plotted.\n\
- Rates are fractions between 0 and 1, valuations are in billions.\n\
- Use strftime for date parts.\n\
Respond with the SQL only, no explanation."
    )
}

pub fn chart_system_prompt() -> &'static str {
    "You are a data visualisation expert. Given a user question and the rows answering it, \
decide how to chart them. Respond with JSON only, shaped as:\n\
{\"config\": {\"type\": \"bar\" | \"line\" | \"area\" | \"pie\", \"xKey\": string, \
\"yKeys\": [string], \"legend\": boolean, \"title\": string, \"description\": string, \
\"takeaway\": string, \"multipleLines\": boolean, \"measurementColumn\": string}}\n\
xKey and every yKeys entry must be column names from the rows. Use multipleLines with a \
line chart when one column names the series to draw, and list that column in yKeys as the \
measurementColumn. Answer {\"config\": null} when a table is the better display."
}

pub fn chart_prompt(results: &ResultSet, question: &str) -> String {
    let shown = &results.rows()[..results.len().min(CHART_PROMPT_ROW_LIMIT)];
    let rows = serde_json::to_string_pretty(shown).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Question: {question}\n\nColumns: {}\n\nRows ({} of {}):\n{rows}",
        results.columns().join(", "),
        shown.len(),
        results.len()
    )
}

pub fn explain_system_prompt(schema: &str) -> String {
    format!(
        "You explain SQL queries to people who do not know SQL. The table is:\n\n{schema}\n\n\
Split the query into its clauses and explain each one in a sentence. Every section must be \
copied verbatim from the query, and the sections together must cover the whole query. \
Respond with JSON only: {{\"explanations\": [{{\"section\": string, \"explanation\": string}}]}}"
    )
}

pub fn explain_prompt(question: &str, query: &str) -> String {
    format!("Question: {question}\n\nQuery:\n{query}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_contracts::{CellValue, Row};

    #[test]
    fn chart_prompt_caps_rows() {
        let rows: Vec<Row> = (0..60)
            .map(|i| {
                let mut row = Row::new();
                row.insert("n".to_string(), CellValue::Number(i as f64));
                row
            })
            .collect();
        let results = ResultSet::from_rows(rows).unwrap();
        let prompt = chart_prompt(&results, "how many?");
        assert!(prompt.starts_with("Question: how many?"));
        assert!(prompt.contains("Rows (50 of 60)"));
        assert!(prompt.contains("Columns: n"));
    }

    #[test]
    fn schema_is_embedded() {
        assert!(query_system_prompt("unicorns (id INTEGER)").contains("unicorns (id INTEGER)"));
        assert!(explain_system_prompt("t").contains("\"explanations\""));
    }
}
