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

//! Chart rendering strategies.
//!
//! Rendering stops at a declarative [`ChartSpec`]: which rows, which series,
//! which colours and labels. Painting it is the front end's job.

pub mod area;
pub mod bar;
pub mod line;
pub mod pie;

use crate::config::ChartSettings;
use crate::error::PipelineError;
use crate::sampler::ChartDataSampler;
use indexmap::IndexMap;
use llm_contracts::{ChartConfig, ChartKind, ResultSet, Row};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

pub use area::AreaRenderer;
pub use bar::BarRenderer;
pub use line::LineRenderer;
pub use pie::PieRenderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesMark {
    Bar,
    /// Monotone-interpolated line.
    Line,
    /// Filled monotone area, stroked in the fill colour.
    Area,
    PieSlice,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSpec {
    pub data_key: String,
    pub mark: SeriesMark,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisSpec {
    pub data_key: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesStyle {
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub description: String,
    pub takeaway: String,
    pub data: Vec<Row>,
    /// Column naming each category (pie slice label, x axis key).
    pub category_key: String,
    pub series: Vec<SeriesSpec>,
    pub x_axis: Option<AxisSpec>,
    pub y_axis: Option<AxisSpec>,
    pub legend: bool,
    /// Per-row slice colours, pie charts only.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub slice_colors: Vec<String>,
    /// Label and colour per configured `yKeys` entry, for tooltips and legends.
    pub series_config: IndexMap<String, SeriesStyle>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderedChart {
    Chart(Box<ChartSpec>),
    /// Nothing to draw.
    NoData,
    /// Placeholder for a chart type no strategy handles.
    Unsupported { chart_type: String },
}

impl RenderedChart {
    pub fn spec(&self) -> Option<&ChartSpec> {
        match self {
            RenderedChart::Chart(spec) => Some(spec.as_ref()),
            _ => None,
        }
    }

    pub fn placeholder_text(&self) -> Option<String> {
        match self {
            RenderedChart::Chart(_) => None,
            RenderedChart::NoData => Some("No chart data".to_string()),
            RenderedChart::Unsupported { chart_type } => {
                Some(format!("Unsupported chart type: {chart_type}"))
            }
        }
    }
}

/// Fixed colour cycle shared by every strategy.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<String>,
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(ChartSettings::default().palette)
    }
}

impl Palette {
    /// An empty list falls back to the default colours.
    pub fn new(colors: Vec<String>) -> Self {
        if colors.is_empty() {
            return Self::default();
        }
        Self { colors }
    }

    pub fn color(&self, index: usize) -> &str {
        &self.colors[index % self.colors.len()]
    }
}

/// `date_joined` -> `Date Joined`.
pub fn title_case(column: &str) -> String {
    column
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub trait ChartRenderer: Send + Sync {
    fn kind(&self) -> ChartKind;
    fn render(&self, data: &[Row], config: &ChartConfig, palette: &Palette) -> ChartSpec;
}

/// Spec skeleton shared by the strategies; each one fills in series and axes.
pub(crate) fn base_spec(data: Vec<Row>, config: &ChartConfig, palette: &Palette) -> ChartSpec {
    let series_config = config
        .y_keys
        .iter()
        .enumerate()
        .map(|(i, key)| {
            (
                key.clone(),
                SeriesStyle {
                    label: key.clone(),
                    color: palette.color(i).to_string(),
                },
            )
        })
        .collect();
    ChartSpec {
        kind: config.kind.clone(),
        title: config.title.clone(),
        description: config.description.clone(),
        takeaway: config.takeaway.clone(),
        data,
        category_key: config.x_key.clone(),
        series: Vec::new(),
        x_axis: None,
        y_axis: None,
        legend: config.legend,
        slice_colors: Vec::new(),
        series_config,
    }
}

pub(crate) fn series_for<'a, I>(keys: I, mark: SeriesMark, palette: &Palette) -> Vec<SeriesSpec>
where
    I: IntoIterator<Item = &'a String>,
{
    keys.into_iter()
        .enumerate()
        .map(|(i, key)| SeriesSpec {
            data_key: key.clone(),
            mark,
            color: palette.color(i).to_string(),
        })
        .collect()
}

/// Picks the strategy for a config's chart type.
pub struct ChartRenderDispatcher {
    renderers: HashMap<ChartKind, Box<dyn ChartRenderer>>,
    palette: Palette,
    sampler: ChartDataSampler,
}

impl Default for ChartRenderDispatcher {
    fn default() -> Self {
        Self::from_settings(&ChartSettings::default())
    }
}

impl std::fmt::Debug for ChartRenderDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartRenderDispatcher")
            .field("renderers", &self.renderers.keys().collect::<Vec<_>>())
            .field("palette", &self.palette)
            .field("sampler", &self.sampler)
            .finish()
    }
}

impl ChartRenderDispatcher {
    pub fn new(palette: Palette, sampler: ChartDataSampler) -> Self {
        Self {
            renderers: HashMap::new(),
            palette,
            sampler,
        }
    }

    /// Dispatcher with the bar, line, area and pie strategies registered.
    pub fn from_settings(settings: &ChartSettings) -> Self {
        let mut dispatcher = Self::new(
            Palette::new(settings.palette.clone()),
            ChartDataSampler::from_settings(settings),
        );
        dispatcher.register(Box::new(BarRenderer));
        dispatcher.register(Box::new(LineRenderer));
        dispatcher.register(Box::new(AreaRenderer));
        dispatcher.register(Box::new(PieRenderer));
        dispatcher
    }

    pub fn register(&mut self, renderer: Box<dyn ChartRenderer>) {
        self.renderers.insert(renderer.kind(), renderer);
    }

    pub fn supported_kinds(&self) -> Vec<ChartKind> {
        self.renderers.keys().cloned().collect()
    }

    /// Renders already-prepared rows. Unknown chart types come back as a
    /// placeholder, never as an error.
    pub fn render(&self, data: &[Row], config: &ChartConfig) -> RenderedChart {
        let Some(renderer) = self.renderers.get(&config.kind) else {
            let err = PipelineError::UnsupportedChartType(config.kind.to_string());
            warn!(error = %err, "Rendering placeholder");
            return RenderedChart::Unsupported {
                chart_type: config.kind.to_string(),
            };
        };
        if data.is_empty() {
            return RenderedChart::NoData;
        }
        debug!(chart_type = %config.kind, rows = data.len(), "Rendering chart");
        RenderedChart::Chart(Box::new(renderer.render(data, config, &self.palette)))
    }

    /// Samples a full result set for display and renders it.
    pub fn render_results(&self, results: &ResultSet, config: &ChartConfig) -> RenderedChart {
        let data = self.sampler.sample(results.rows(), &config.kind);
        self.render(data, config)
    }
}
