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

use super::{base_spec, ChartRenderer, ChartSpec, Palette, SeriesMark, SeriesSpec};
use llm_contracts::{ChartConfig, ChartKind, Row};

/// Single series: `yKeys[0]` sizes the slices, `xKey` names them, and every
/// row gets its own colour.
#[derive(Debug, Default, Clone, Copy)]
pub struct PieRenderer;

impl ChartRenderer for PieRenderer {
    fn kind(&self) -> ChartKind {
        ChartKind::Pie
    }

    fn render(&self, data: &[Row], config: &ChartConfig, palette: &Palette) -> ChartSpec {
        let mut spec = base_spec(data.to_vec(), config, palette);
        if let Some(magnitude) = config.y_keys.first() {
            spec.series = vec![SeriesSpec {
                data_key: magnitude.clone(),
                mark: SeriesMark::PieSlice,
                color: palette.color(0).to_string(),
            }];
        }
        spec.slice_colors = (0..data.len())
            .map(|i| palette.color(i).to_string())
            .collect();
        spec
    }
}
