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

//! Natural-language questions answered as tables and charts.
//!
//! A question goes to a query generator, the query to an executor, and the
//! rows to a chart inference step. [`QueryPipelineOrchestrator`] drives the
//! stages; the rest of the crate turns results into display-ready tables and
//! chart descriptions.

pub mod coerce;
pub mod config;
pub mod database;
pub mod error;
pub mod format;
pub mod llm;
pub mod orchestrator;
pub mod pivot;
pub mod render;
pub mod sampler;
pub mod table;

pub use coerce::coerce;
pub use config::{ChartSettings, DatabaseSettings, TableSettings, TabulaConfig};
pub use database::SqliteExecutor;
pub use error::{PipelineError, Result};
pub use format::{column_title, CellFormatter};
pub use llm::{HttpLlmClient, LlmClient};
pub use orchestrator::{
    ChartSlot, Collaborators, FailedStage, PipelineFailure, PipelineStage, PipelineState,
    QueryPipelineOrchestrator, ReadyState, SubmissionContext,
};
pub use pivot::{pivot, PivotedSeries};
pub use render::{ChartRenderDispatcher, ChartRenderer, ChartSpec, Palette, RenderedChart};
pub use sampler::ChartDataSampler;
pub use table::{QueryPreview, TableView};

pub use llm_contracts::{
    CellValue, ChartConfig, ChartGeneration, ChartKind, QueryExplanation, RawRow, ResultSet, Row,
};
