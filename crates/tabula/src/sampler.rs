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

use crate::config::ChartSettings;
use llm_contracts::{ChartKind, Row};
use tracing::debug;

/// Bounds the rows drawn by category charts. The cut is for display only and
/// hands back a sub-slice of the caller's rows, so the table keeps every row.
#[derive(Debug, Clone, Copy)]
pub struct ChartDataSampler {
    row_limit: usize,
    sample_size: usize,
}

impl Default for ChartDataSampler {
    fn default() -> Self {
        Self::from_settings(&ChartSettings::default())
    }
}

impl ChartDataSampler {
    pub fn new(row_limit: usize, sample_size: usize) -> Self {
        Self {
            row_limit,
            sample_size,
        }
    }

    pub fn from_settings(settings: &ChartSettings) -> Self {
        Self::new(
            settings.categorical_row_limit,
            settings.categorical_sample_size,
        )
    }

    pub fn sample<'a>(&self, rows: &'a [Row], kind: &ChartKind) -> &'a [Row] {
        if !kind.is_categorical() || rows.len() <= self.row_limit {
            return rows;
        }
        let kept = rows.len().min(self.sample_size);
        debug!(
            chart_type = %kind,
            total = rows.len(),
            kept,
            "Sampling rows for category chart"
        );
        &rows[..kept]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_contracts::CellValue;

    fn rows(n: usize) -> Vec<Row> {
        (0..n)
            .map(|i| {
                let mut row = Row::new();
                row.insert("i".to_string(), CellValue::Number(i as f64));
                row
            })
            .collect()
    }

    #[test]
    fn small_category_charts_are_untouched() {
        let sampler = ChartDataSampler::default();
        for n in 0..=8 {
            let data = rows(n);
            assert_eq!(sampler.sample(&data, &ChartKind::Bar), data.as_slice());
            assert_eq!(sampler.sample(&data, &ChartKind::Pie), data.as_slice());
        }
    }

    #[test]
    fn large_category_charts_keep_first_twenty() {
        let sampler = ChartDataSampler::default();
        let data = rows(50);
        let sampled = sampler.sample(&data, &ChartKind::Bar);
        assert_eq!(sampled.len(), 20);
        assert_eq!(sampled, &data[..20]);
        // nine rows is above the limit but below the sample size
        let nine = rows(9);
        assert_eq!(sampler.sample(&nine, &ChartKind::Pie).len(), 9);
    }

    #[test]
    fn series_charts_are_never_truncated() {
        let sampler = ChartDataSampler::default();
        let data = rows(500);
        assert_eq!(sampler.sample(&data, &ChartKind::Line).len(), 500);
        assert_eq!(sampler.sample(&data, &ChartKind::Area).len(), 500);
        assert_eq!(
            sampler
                .sample(&data, &ChartKind::Other("scatter".into()))
                .len(),
            500
        );
    }
}
