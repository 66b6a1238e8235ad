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

use llm_contracts::{ChartConfig, ResultSet};
use std::fmt;
use std::sync::Arc;

pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred. Please try again.";

/// What the front end should show for the current submission.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    GeneratingQuery {
        question: String,
    },
    Executing {
        question: String,
        query: String,
    },
    /// Rows are displayable. The chart may still be on its way.
    Ready(ReadyState),
    Failed(PipelineFailure),
}

impl PipelineState {
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineState::Idle => PipelineStage::Idle,
            PipelineState::GeneratingQuery { .. } => PipelineStage::GeneratingQuery,
            PipelineState::Executing { .. } => PipelineStage::Executing,
            PipelineState::Ready(ready) if ready.chart == ChartSlot::Pending => {
                PipelineStage::GeneratingChart
            }
            PipelineState::Ready(_) => PipelineStage::Ready,
            PipelineState::Failed(_) => PipelineStage::Failed,
        }
    }

    /// No further transitions will happen without a new submission or clear.
    pub fn is_settled(&self) -> bool {
        matches!(
            self.stage(),
            PipelineStage::Idle | PipelineStage::Ready | PipelineStage::Failed
        )
    }

    pub fn ready(&self) -> Option<&ReadyState> {
        match self {
            PipelineState::Ready(ready) => Some(ready),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&PipelineFailure> {
        match self {
            PipelineState::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn question(&self) -> Option<&str> {
        match self {
            PipelineState::Idle => None,
            PipelineState::GeneratingQuery { question }
            | PipelineState::Executing { question, .. } => Some(question),
            PipelineState::Ready(ready) => Some(&ready.question),
            PipelineState::Failed(failure) => Some(&failure.question),
        }
    }

    /// The generated query, once there is one. A failed execution keeps it
    /// so it can still be shown.
    pub fn active_query(&self) -> Option<&str> {
        match self {
            PipelineState::Executing { query, .. } => Some(query),
            PipelineState::Ready(ready) => Some(&ready.query),
            PipelineState::Failed(failure) => failure.query.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Idle,
    GeneratingQuery,
    Executing,
    GeneratingChart,
    Ready,
    Failed,
}

impl PipelineStage {
    /// Progress text for the in-flight stages.
    pub fn progress_message(&self) -> Option<&'static str> {
        match self {
            PipelineStage::GeneratingQuery => Some("Generating SQL query..."),
            PipelineStage::Executing => Some("Running SQL query..."),
            PipelineStage::GeneratingChart => Some("Generating chart..."),
            _ => None,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::GeneratingQuery => "generating_query",
            PipelineStage::Executing => "executing",
            PipelineStage::GeneratingChart => "generating_chart",
            PipelineStage::Ready => "ready",
            PipelineStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadyState {
    pub question: String,
    pub query: String,
    pub results: Arc<ResultSet>,
    pub chart: ChartSlot,
}

impl ReadyState {
    pub fn chart(&self) -> Option<&ChartConfig> {
        match &self.chart {
            ChartSlot::Attached(config) => Some(config),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartSlot {
    /// Inference still running.
    Pending,
    Attached(ChartConfig),
    /// Table only: no config, a rejected config, or a failed inference.
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedStage {
    QueryGeneration,
    Execution,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineFailure {
    pub stage: FailedStage,
    pub question: String,
    pub query: Option<String>,
    /// Internal detail for logs; never shown to the user.
    pub reason: String,
}

impl PipelineFailure {
    pub fn code(&self) -> &'static str {
        match self.stage {
            FailedStage::QueryGeneration => "query-generation-error",
            FailedStage::Execution => "execution-error",
        }
    }

    pub fn user_message(&self) -> &'static str {
        GENERIC_FAILURE_MESSAGE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_contracts::ChartKind;

    fn ready(chart: ChartSlot) -> PipelineState {
        PipelineState::Ready(ReadyState {
            question: "q".into(),
            query: "SELECT 1".into(),
            results: Arc::new(ResultSet::empty()),
            chart,
        })
    }

    #[test]
    fn pending_chart_reports_generating_chart() {
        assert_eq!(ready(ChartSlot::Pending).stage(), PipelineStage::GeneratingChart);
        assert!(!ready(ChartSlot::Pending).is_settled());
        assert_eq!(ready(ChartSlot::Unavailable).stage(), PipelineStage::Ready);
        let config = ChartConfig::new(ChartKind::Bar, "a", vec!["b".into()]);
        let attached = ready(ChartSlot::Attached(config.clone()));
        assert_eq!(attached.ready().and_then(ReadyState::chart), Some(&config));
        assert_eq!(attached.active_query(), Some("SELECT 1"));
    }

    #[test]
    fn failures_carry_codes_and_a_generic_message() {
        let failure = PipelineFailure {
            stage: FailedStage::Execution,
            question: "q".into(),
            query: Some("SELECT nope".into()),
            reason: "no such column".into(),
        };
        assert_eq!(failure.code(), "execution-error");
        assert_eq!(failure.user_message(), "An error occurred. Please try again.");
        let state = PipelineState::Failed(failure);
        assert_eq!(state.active_query(), Some("SELECT nope"));
        assert!(state.is_settled());
        assert_eq!(PipelineStage::Executing.progress_message(), Some("Running SQL query..."));
    }
}
