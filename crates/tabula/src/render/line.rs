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

use super::{base_spec, series_for, title_case, AxisSpec, ChartRenderer, ChartSpec, Palette, SeriesMark};
use crate::pivot::pivot;
use llm_contracts::{ChartConfig, ChartKind, Row};
use tracing::debug;

/// Line per measured key, or per distinct measurement value when the config
/// asks for a multi-line layout.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineRenderer;

impl ChartRenderer for LineRenderer {
    fn kind(&self) -> ChartKind {
        ChartKind::Line
    }

    fn render(&self, data: &[Row], config: &ChartConfig, palette: &Palette) -> ChartSpec {
        let y_label = config.y_keys.first().map(|k| title_case(k));
        let mut spec = match pivot(data, config) {
            Some(pivoted) => {
                debug!(lines = pivoted.line_fields.len(), "Pivoted rows for multi-line chart");
                let mut spec = base_spec(pivoted.data, config, palette);
                spec.series = series_for(&pivoted.line_fields, SeriesMark::Line, palette);
                spec.category_key = pivoted.x_axis_field;
                spec
            }
            None => {
                let mut spec = base_spec(data.to_vec(), config, palette);
                spec.series = series_for(&config.y_keys, SeriesMark::Line, palette);
                spec
            }
        };
        spec.x_axis = Some(AxisSpec {
            data_key: Some(spec.category_key.clone()),
            label: Some(title_case(&config.x_key)),
        });
        spec.y_axis = Some(AxisSpec {
            data_key: None,
            label: y_label,
        });
        spec
    }
}
