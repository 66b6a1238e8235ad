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

//! Table cell formatting.

use crate::config::TableSettings;
use crate::error::{PipelineError, Result};
use chrono::format::{Item, StrftimeItems};
use llm_contracts::CellValue;
use tracing::{debug, warn};

const DEFAULT_DATE_FORMAT: &str = "%-m/%-d/%Y";

/// Formats cells by column name, then by value type.
///
/// Rules are tried in order and the first match wins:
/// 1. column name contains `valuation`: billions of dollars, `$3.5B`
/// 2. column name contains `rate`: a fraction shown as a percentage, `12.34%`
/// 3. date values: short date, `6/1/2021` by default
/// 4. everything else: the value's plain text
///
/// Name matching ignores case, and a `valuation_rate` column is currency.
#[derive(Debug, Clone)]
pub struct CellFormatter {
    date_format: String,
}

impl Default for CellFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMAT)
    }
}

impl CellFormatter {
    /// An invalid chrono pattern is replaced by the default one.
    pub fn new<S: Into<String>>(date_format: S) -> Self {
        let date_format = date_format.into();
        let valid = StrftimeItems::new(&date_format).all(|item| !matches!(item, Item::Error));
        if !valid {
            warn!(pattern = %date_format, "Invalid date format, using the default");
            return Self {
                date_format: DEFAULT_DATE_FORMAT.to_string(),
            };
        }
        Self { date_format }
    }

    pub fn from_settings(settings: &TableSettings) -> Self {
        Self::new(settings.date_format.clone())
    }

    /// Formats a cell, rendering unparsable currency or rate cells as `""`.
    pub fn format(&self, column: &str, value: &CellValue) -> String {
        self.try_format(column, value).unwrap_or_else(|err| {
            debug!(error = %err, "Rendering empty cell");
            String::new()
        })
    }

    pub fn try_format(&self, column: &str, value: &CellValue) -> Result<String> {
        let name = column.to_lowercase();
        if name.contains("valuation") {
            let amount = leading_number(value).ok_or_else(|| unparsable(column, value))?;
            return Ok(format!("${}B", trim_fraction(&format!("{amount:.2}"))));
        }
        if name.contains("rate") {
            let fraction = leading_number(value).ok_or_else(|| unparsable(column, value))?;
            return Ok(format!("{:.2}%", fraction * 100.0));
        }
        if let CellValue::Date(date) = value {
            return Ok(date.format(&self.date_format).to_string());
        }
        Ok(value.to_string())
    }
}

/// `people_count` -> `People count`.
pub fn column_title(column: &str) -> String {
    column
        .split('_')
        .enumerate()
        .map(|(i, word)| {
            if i > 0 {
                return word.to_string();
            }
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn unparsable(column: &str, value: &CellValue) -> PipelineError {
    PipelineError::UnparsableCellValue {
        column: column.to_string(),
        value: value.to_string(),
    }
}

fn leading_number(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Text(text) => parse_leading_float(text),
        _ => None,
    }
}

/// Reads the longest decimal prefix of `text` after leading whitespace, so
/// `"3.5 billion"` reads as 3.5 and `"abc"` reads as nothing.
fn parse_leading_float(text: &str) -> Option<f64> {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let mut digits = 0;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        digits += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        let mut frac = end + 1;
        while frac < bytes.len() && bytes[frac].is_ascii_digit() {
            frac += 1;
            digits += 1;
        }
        end = frac;
    }
    if digits == 0 {
        return None;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && matches!(bytes[exp], b'+' | b'-') {
            exp += 1;
        }
        let exp_digits = exp;
        while exp < bytes.len() && bytes[exp].is_ascii_digit() {
            exp += 1;
        }
        if exp > exp_digits {
            end = exp;
        }
    }
    s[..end].parse::<f64>().ok().filter(|n| n.is_finite())
}

/// `3.50` -> `3.5`, `3.00` -> `3`.
fn trim_fraction(fixed: &str) -> &str {
    if !fixed.contains('.') {
        return fixed;
    }
    fixed.trim_end_matches('0').trim_end_matches('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fmt(column: &str, value: CellValue) -> String {
        CellFormatter::default().format(column, &value)
    }

    #[test]
    fn valuation_is_billions_of_dollars() {
        assert_eq!(fmt("valuation", "3.50".into()), "$3.5B");
        assert_eq!(fmt("valuation", "3.00".into()), "$3B");
        assert_eq!(fmt("Valuation", 100.0.into()), "$100B");
        assert_eq!(fmt("total_valuation", 0.004.into()), "$0B");
        assert_eq!(fmt("valuation", " 12.5 approx".into()), "$12.5B");
    }

    #[test]
    fn unparsable_amounts_render_empty() {
        assert_eq!(fmt("valuation", "abc".into()), "");
        assert_eq!(fmt("growth_rate", CellValue::Null), "");
        let err = CellFormatter::default()
            .try_format("valuation", &CellValue::text("abc"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnparsableCellValue { .. }));
    }

    #[test]
    fn rate_is_a_percentage() {
        assert_eq!(fmt("growth_rate", "0.1234".into()), "12.34%");
        assert_eq!(fmt("RATE", 1.0.into()), "100.00%");
    }

    #[test]
    fn valuation_rule_wins_over_rate() {
        assert_eq!(fmt("valuation_rate", "1.5".into()), "$1.5B");
    }

    #[test]
    fn dates_use_short_pattern() {
        let date = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
        assert_eq!(fmt("date_joined", date.into()), "6/1/2021");
        assert_eq!(
            CellFormatter::new("%Y-%m-%d").format("date_joined", &date.into()),
            "2021-06-01"
        );
        assert_eq!(
            CellFormatter::new("%Q").format("date_joined", &date.into()),
            "6/1/2021"
        );
    }

    #[test]
    fn other_values_use_plain_text() {
        assert_eq!(fmt("company", "Stripe".into()), "Stripe");
        assert_eq!(fmt("count", 42.0.into()), "42");
        assert_eq!(fmt("company", CellValue::Null), "null");
        assert_eq!(fmt("active", CellValue::Bool(true)), "true");
    }

    #[test]
    fn column_titles_capitalise_first_word_only() {
        assert_eq!(column_title("date_joined"), "Date joined");
        assert_eq!(column_title("select_investors_list"), "Select investors list");
        assert_eq!(column_title("city"), "City");
    }
}
