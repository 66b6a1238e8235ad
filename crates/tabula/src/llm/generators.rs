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

use super::json::{extract_json, extract_sql};
use super::prompts;
use super::LlmClient;
use llm_contracts::{
    ChartConfig, ChartConfigGenerator, ChartGeneration, CollaboratorError, CollaboratorResult,
    LlmRequest, QueryExplainer, QueryExplanation, QueryGenerator, ResultSet,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Question to SQL through a language model.
pub struct LlmQueryGenerator {
    client: Arc<dyn LlmClient>,
    schema: String,
}

impl LlmQueryGenerator {
    pub fn new<S: Into<String>>(client: Arc<dyn LlmClient>, schema: S) -> Self {
        Self {
            client,
            schema: schema.into(),
        }
    }
}

#[async_trait::async_trait]
impl QueryGenerator for LlmQueryGenerator {
    #[instrument(skip(self))]
    async fn generate_query(&self, question: &str) -> CollaboratorResult<Option<String>> {
        let request = LlmRequest::new(question)
            .with_system(prompts::query_system_prompt(&self.schema))
            .with_temperature(0.0);
        let response = self.client.complete(&request).await?;
        let query = extract_sql(&response);
        if query.is_empty() {
            warn!("Model returned no query");
            return Ok(None);
        }
        debug!(query = %query, "Generated query");
        Ok(Some(query))
    }
}

/// Chart inference through a language model.
pub struct LlmChartConfigGenerator {
    client: Arc<dyn LlmClient>,
}

impl LlmChartConfigGenerator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ChartConfigGenerator for LlmChartConfigGenerator {
    #[instrument(skip(self, results), fields(rows = results.len()))]
    async fn generate_chart_config(
        &self,
        results: &ResultSet,
        question: &str,
    ) -> CollaboratorResult<ChartGeneration> {
        let request = LlmRequest::new(prompts::chart_prompt(results, question))
            .with_system(prompts::chart_system_prompt());
        let response = self.client.complete(&request).await?;
        parse_chart_generation(&response)
    }
}

/// Accepts `{"config": {...}}`, `{"config": null}` or a bare config object.
pub fn parse_chart_generation(response: &str) -> CollaboratorResult<ChartGeneration> {
    let value = extract_json(response).ok_or_else(|| {
        CollaboratorError::Serialisation("no JSON object in chart response".to_string())
    })?;
    let config = match value {
        Value::Object(mut object) if object.contains_key("config") => {
            object.remove("config").unwrap_or(Value::Null)
        }
        other => other,
    };
    if config.is_null() {
        return Ok(ChartGeneration::table_only());
    }
    let config: ChartConfig = serde_json::from_value(config)?;
    Ok(ChartGeneration::with_config(config))
}

/// Clause-by-clause query explanations through a language model.
pub struct LlmQueryExplainer {
    client: Arc<dyn LlmClient>,
    schema: String,
}

impl LlmQueryExplainer {
    pub fn new<S: Into<String>>(client: Arc<dyn LlmClient>, schema: S) -> Self {
        Self {
            client,
            schema: schema.into(),
        }
    }
}

#[async_trait::async_trait]
impl QueryExplainer for LlmQueryExplainer {
    #[instrument(skip(self, query))]
    async fn explain_query(
        &self,
        question: &str,
        query: &str,
    ) -> CollaboratorResult<Vec<QueryExplanation>> {
        let request = LlmRequest::new(prompts::explain_prompt(question, query))
            .with_system(prompts::explain_system_prompt(&self.schema));
        let response = self.client.complete(&request).await?;
        parse_explanations(&response)
    }
}

/// Accepts `{"explanations": [...]}` or a bare array.
pub fn parse_explanations(response: &str) -> CollaboratorResult<Vec<QueryExplanation>> {
    let value = extract_json(response).ok_or_else(|| {
        CollaboratorError::Serialisation("no JSON in explanation response".to_string())
    })?;
    let list = match value {
        Value::Object(mut object) => object.remove("explanations").unwrap_or(Value::Null),
        other => other,
    };
    Ok(serde_json::from_value(list)?)
}
