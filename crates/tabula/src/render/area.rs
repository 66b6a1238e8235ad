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

use super::{base_spec, series_for, AxisSpec, ChartRenderer, ChartSpec, Palette, SeriesMark};
use llm_contracts::{ChartConfig, ChartKind, Row};

/// Filled area series per measured key. Axes carry no labels and there is no
/// multi-line pivot.
#[derive(Debug, Default, Clone, Copy)]
pub struct AreaRenderer;

impl ChartRenderer for AreaRenderer {
    fn kind(&self) -> ChartKind {
        ChartKind::Area
    }

    fn render(&self, data: &[Row], config: &ChartConfig, palette: &Palette) -> ChartSpec {
        let mut spec = base_spec(data.to_vec(), config, palette);
        spec.series = series_for(&config.y_keys, SeriesMark::Area, palette);
        spec.x_axis = Some(AxisSpec {
            data_key: Some(config.x_key.clone()),
            label: None,
        });
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_contracts::CellValue;

    #[test]
    fn area_ignores_multi_line_layout_and_omits_labels() {
        let mut config = ChartConfig::new(
            ChartKind::Area,
            "year",
            vec!["count".to_string(), "industry".to_string()],
        );
        config.multiple_lines = Some(true);
        config.measurement_column = Some("industry".to_string());
        let mut row = Row::new();
        row.insert("year".into(), CellValue::Number(2020.0));
        row.insert("count".into(), CellValue::Number(3.0));
        row.insert("industry".into(), CellValue::text("AI"));

        let spec = AreaRenderer.render(&[row.clone()], &config, &Palette::default());
        assert_eq!(spec.data, vec![row]);
        let keys: Vec<_> = spec.series.iter().map(|s| s.data_key.as_str()).collect();
        assert_eq!(keys, ["count", "industry"]);
        assert!(spec.x_axis.unwrap().label.is_none());
        assert!(spec.y_axis.is_none());
        assert!(!spec.legend);
    }
}
