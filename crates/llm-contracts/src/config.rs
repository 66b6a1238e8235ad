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

use crate::types::CollaboratorError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Provider {
    Anthropic,
    OpenAI,
    Ollama,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAI => "openai",
            Provider::Ollama => "ollama",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Provider::Anthropic => "https://api.anthropic.com/v1/messages",
            Provider::OpenAI => "https://api.openai.com/v1/chat/completions",
            Provider::Ollama => "http://localhost:11434/api/generate",
        }
    }

    /// Environment variable holding the API key, if the provider needs one.
    pub fn api_key_var(&self) -> Option<&'static str> {
        match self {
            Provider::Anthropic => Some("ANTHROPIC_API_KEY"),
            Provider::OpenAI => Some("OPENAI_API_KEY"),
            Provider::Ollama => None,
        }
    }
}

impl FromStr for Provider {
    type Err = CollaboratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" => Ok(Provider::Anthropic),
            "openai" => Ok(Provider::OpenAI),
            "ollama" => Ok(Provider::Ollama),
            other => Err(CollaboratorError::Configuration(format!(
                "unknown LLM provider '{other}', expected anthropic, openai or ollama"
            ))),
        }
    }
}

impl TryFrom<String> for Provider {
    type Error = CollaboratorError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Provider> for String {
    fn from(provider: Provider) -> Self {
        provider.as_str().to_string()
    }
}

/// Connection and sampling settings for the language model behind the
/// query, chart and explanation generators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default = "default_provider")]
    pub provider: Provider,
    #[serde(default = "default_model")]
    pub model: String,
    /// Overrides the provider's public endpoint.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            endpoint: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout_seconds(),
            api_version: default_api_version(),
        }
    }
}

impl ModelSettings {
    pub fn endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.provider.default_endpoint())
    }
}

fn default_provider() -> Provider {
    Provider::Anthropic
}
fn default_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_temperature() -> f32 {
    0.2
}
fn default_timeout_seconds() -> u64 {
    120
}
fn default_api_version() -> String {
    "2023-06-01".to_string()
}
