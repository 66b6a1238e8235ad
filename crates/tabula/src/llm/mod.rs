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

//! Language-model backed collaborators.

pub mod client;
pub mod generators;
pub mod json;
pub mod prompts;

use llm_contracts::{CollaboratorResult, LlmRequest};

pub use client::HttpLlmClient;
pub use generators::{LlmChartConfigGenerator, LlmQueryExplainer, LlmQueryGenerator};

/// Plain text completion from some model.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> CollaboratorResult<String>;
}
