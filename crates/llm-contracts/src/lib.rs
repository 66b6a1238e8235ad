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

//! Boundary types shared by the question-to-chart pipeline and the services it
//! talks to: result rows, chart configurations, query explanations, and the
//! async traits each collaborator implements.

pub mod config;
pub mod requests;
pub mod responses;
pub mod traits;
pub mod types;

pub use config::{ModelSettings, Provider};
pub use requests::{LlmRequest, Message};
pub use responses::{ChartGeneration, QueryExplanation};
pub use traits::{ChartConfigGenerator, QueryExecutor, QueryExplainer, QueryGenerator};
pub use types::{
    CellValue, ChartConfig, ChartKind, CollaboratorError, CollaboratorResult, RawRow, ResultSet,
    Row, RowShapeError,
};
