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

use crate::error::{PipelineError, Result};
use llm_contracts::{ModelSettings, Provider};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const UNICORNS_SCHEMA: &str = "unicorns (
  id INTEGER PRIMARY KEY,
  company TEXT NOT NULL UNIQUE,
  valuation REAL NOT NULL, -- in billions of US dollars
  date_joined DATE, -- ISO date the company first reached a $1B valuation
  country TEXT NOT NULL,
  city TEXT NOT NULL,
  industry TEXT NOT NULL,
  select_investors TEXT NOT NULL -- comma separated list
)";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSettings {
    /// Bar and pie charts with at most this many rows are drawn in full.
    #[serde(default = "default_categorical_row_limit")]
    pub categorical_row_limit: usize,
    /// Rows kept for bar and pie charts above the limit.
    #[serde(default = "default_categorical_sample_size")]
    pub categorical_sample_size: usize,
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            categorical_row_limit: default_categorical_row_limit(),
            categorical_sample_size: default_categorical_sample_size(),
            palette: default_palette(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSettings {
    /// chrono pattern for date cells.
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_query_preview_cutoff")]
    pub query_preview_cutoff: usize,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            query_preview_cutoff: default_query_preview_cutoff(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Schema text handed to the query generator.
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default)]
    pub seed_script: Option<PathBuf>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            schema: default_schema(),
            seed_script: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TabulaConfig {
    #[serde(default)]
    pub chart: ChartSettings,
    #[serde(default)]
    pub table: TableSettings,
    #[serde(default)]
    pub llm: ModelSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
}

impl TabulaConfig {
    /// Reads a TOML config file. A missing file yields the defaults.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config = match tokio::fs::read_to_string(path).await {
            Ok(content) => Self::from_toml_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "config file not found, using default settings");
                Self::default()
            }
            Err(e) => return Err(e.into()),
        };
        info!(
            provider = %config.llm.provider.as_str(),
            model = %config.llm.model,
            database = %config.database.url,
            "Loaded tabula config"
        );
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chart.palette.is_empty() {
            return Err(PipelineError::config("chart.palette must not be empty"));
        }
        if self.chart.categorical_sample_size == 0 {
            return Err(PipelineError::config(
                "chart.categorical_sample_size must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Applies `TABULA_*` overrides from the process environment. Callers
    /// load `.env` first.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("TABULA_LLM_PROVIDER") {
            self.llm.provider = provider.parse::<Provider>().map_err(|e| {
                warn!(provider = %provider, "Rejecting TABULA_LLM_PROVIDER override");
                PipelineError::config(e.to_string())
            })?;
        }
        if let Some(model) = lookup("TABULA_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(endpoint) = lookup("TABULA_LLM_ENDPOINT") {
            self.llm.endpoint = Some(endpoint);
        }
        if let Some(url) = lookup("TABULA_DATABASE_URL") {
            self.database.url = url;
        }
        Ok(())
    }
}

fn default_categorical_row_limit() -> usize {
    8
}
fn default_categorical_sample_size() -> usize {
    20
}
fn default_palette() -> Vec<String> {
    (1..=5).map(|i| format!("var(--chart-{i})")).collect()
}
fn default_date_format() -> String {
    "%-m/%-d/%Y".to_string()
}
fn default_query_preview_cutoff() -> usize {
    100
}
fn default_database_url() -> String {
    "sqlite::memory:".to_string()
}
fn default_schema() -> String {
    UNICORNS_SCHEMA.to_string()
}
