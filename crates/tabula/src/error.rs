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

use llm_contracts::{CollaboratorError, RowShapeError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Query generation failed: {0}")]
    QueryGeneration(String),
    #[error("Query execution failed: {0}")]
    Execution(String),
    #[error("Chart configuration unavailable: {0}")]
    ChartConfig(String),
    #[error("Unsupported chart type: {0}")]
    UnsupportedChartType(String),
    #[error("Cannot format value '{value}' for column '{column}'")]
    UnparsableCellValue { column: String, value: String },
    #[error("Configuration is invalid: {0}")]
    Config(String),
    #[error("Collaborator failed: {0}")]
    Collaborator(#[from] CollaboratorError),
    #[error("Result rows are inconsistent: {0}")]
    Shape(#[from] RowShapeError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub fn query_generation<S: Into<String>>(msg: S) -> Self {
        Self::QueryGeneration(msg.into())
    }
    pub fn execution<S: Into<String>>(msg: S) -> Self {
        Self::Execution(msg.into())
    }
    pub fn chart_config<S: Into<String>>(msg: S) -> Self {
        Self::ChartConfig(msg.into())
    }
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Stage 1 and stage 2 failures end a submission; everything else is
    /// recovered where it happens.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::QueryGeneration(_) | Self::Execution(_) | Self::Shape(_)
        )
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(err: toml::de::Error) -> Self {
        PipelineError::Config(format!("TOML parsing error: {err}"))
    }
}
