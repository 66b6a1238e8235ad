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
use llm_contracts::{ChartConfig, ChartKind, Row};

/// One bar series per measured key against the category axis.
#[derive(Debug, Default, Clone, Copy)]
pub struct BarRenderer;

impl ChartRenderer for BarRenderer {
    fn kind(&self) -> ChartKind {
        ChartKind::Bar
    }

    fn render(&self, data: &[Row], config: &ChartConfig, palette: &Palette) -> ChartSpec {
        let mut spec = base_spec(data.to_vec(), config, palette);
        spec.series = series_for(&config.y_keys, SeriesMark::Bar, palette);
        spec.x_axis = Some(AxisSpec {
            data_key: Some(config.x_key.clone()),
            label: Some(title_case(&config.x_key)),
        });
        spec.y_axis = Some(AxisSpec {
            data_key: None,
            label: config.y_keys.first().map(|k| title_case(k)),
        });
        spec
    }
}
