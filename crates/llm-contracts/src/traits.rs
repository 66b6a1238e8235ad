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

use crate::responses::{ChartGeneration, QueryExplanation};
use crate::types::{CollaboratorResult, RawRow, ResultSet};

/// Turns a natural-language question into query text.
#[async_trait::async_trait]
pub trait QueryGenerator: Send + Sync {
    /// `Ok(None)` is a generation failure, same as `Err`.
    async fn generate_query(&self, question: &str) -> CollaboratorResult<Option<String>>;
}

#[async_trait::async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute_query(&self, query: &str) -> CollaboratorResult<Vec<RawRow>>;
}

/// Infers how a result set should be charted.
#[async_trait::async_trait]
pub trait ChartConfigGenerator: Send + Sync {
    async fn generate_chart_config(
        &self,
        results: &ResultSet,
        question: &str,
    ) -> CollaboratorResult<ChartGeneration>;
}

#[async_trait::async_trait]
pub trait QueryExplainer: Send + Sync {
    async fn explain_query(
        &self,
        question: &str,
        query: &str,
    ) -> CollaboratorResult<Vec<QueryExplanation>>;
}
