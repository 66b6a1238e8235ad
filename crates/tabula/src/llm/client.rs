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

use super::LlmClient;
use llm_contracts::{CollaboratorError, CollaboratorResult, LlmRequest, ModelSettings, Provider};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Talks to the Anthropic messages API, the OpenAI chat completions API or
/// a local Ollama server, depending on the configured provider.
#[derive(Debug, Clone)]
pub struct HttpLlmClient {
    http: Client,
    settings: ModelSettings,
    api_key: Option<String>,
}

impl HttpLlmClient {
    /// Reads the provider's API key from the environment.
    pub fn new(settings: ModelSettings) -> CollaboratorResult<Self> {
        let api_key = match settings.provider.api_key_var() {
            Some(var) => Some(std::env::var(var).map_err(|_| {
                CollaboratorError::Configuration(format!(
                    "{var} must be set for the {} provider",
                    settings.provider.as_str()
                ))
            })?),
            None => None,
        };
        Self::with_api_key(settings, api_key)
    }

    pub fn with_api_key(
        settings: ModelSettings,
        api_key: Option<String>,
    ) -> CollaboratorResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| CollaboratorError::Configuration(e.to_string()))?;
        Ok(Self {
            http,
            settings,
            api_key,
        })
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    fn payload(&self, request: &LlmRequest) -> Value {
        let max_tokens = request.max_tokens.unwrap_or(self.settings.max_tokens);
        let temperature = request.temperature.unwrap_or(self.settings.temperature);
        match self.settings.provider {
            Provider::Anthropic => {
                let mut payload = json!({
                    "model": self.settings.model,
                    "max_tokens": max_tokens,
                    "temperature": temperature,
                    "messages": [{
                        "role": "user",
                        "content": request.prompt
                    }]
                });
                if let Some(system) = &request.system_prompt {
                    payload["system"] = json!(system);
                }
                payload
            }
            Provider::OpenAI => json!({
                "model": self.settings.model,
                "max_tokens": max_tokens,
                "temperature": temperature,
                "messages": request.messages()
            }),
            Provider::Ollama => {
                let mut payload = json!({
                    "model": self.settings.model,
                    "prompt": request.prompt,
                    "stream": false,
                    "options": {
                        "temperature": temperature,
                        "num_predict": max_tokens
                    }
                });
                if let Some(system) = &request.system_prompt {
                    payload["system"] = json!(system);
                }
                payload
            }
        }
    }

    fn extract_content(&self, response: &Value) -> CollaboratorResult<String> {
        let content = match self.settings.provider {
            Provider::Anthropic => response["content"][0]["text"].as_str(),
            Provider::OpenAI => response["choices"][0]["message"]["content"].as_str(),
            Provider::Ollama => response["response"].as_str(),
        };
        content.map(str::to_string).ok_or_else(|| {
            CollaboratorError::Provider(format!(
                "Failed to extract content from {} response",
                self.settings.provider.as_str()
            ))
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for HttpLlmClient {
    #[instrument(skip(self, request), fields(provider = %self.settings.provider.as_str(), model = %self.settings.model))]
    async fn complete(&self, request: &LlmRequest) -> CollaboratorResult<String> {
        let payload = self.payload(request);
        debug!(payload = ?payload, "Sending request to LLM API");

        let mut builder = self
            .http
            .post(self.settings.endpoint())
            .header("content-type", "application/json");
        builder = match (&self.settings.provider, &self.api_key) {
            (Provider::Anthropic, Some(key)) => builder
                .header("x-api-key", key)
                .header("anthropic-version", &self.settings.api_version),
            (Provider::OpenAI, Some(key)) => builder.bearer_auth(key),
            _ => builder,
        };

        let response = builder.json(&payload).send().await.map_err(|e| {
            if e.is_timeout() {
                CollaboratorError::Timeout
            } else {
                CollaboratorError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        info!(%status, "Received response from LLM API");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    CollaboratorError::Authentication(body)
                }
                StatusCode::TOO_MANY_REQUESTS => CollaboratorError::RateLimit,
                _ => CollaboratorError::Provider(format!(
                    "{} API error {status}: {body}",
                    self.settings.provider.as_str()
                )),
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Serialisation(e.to_string()))?;
        self.extract_content(&data)
    }
}
