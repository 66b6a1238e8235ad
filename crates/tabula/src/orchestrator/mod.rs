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

//! Question -> query -> rows -> chart.
//!
//! Every submission gets an id. State writes go through the watch channel's
//! lock and only land when the writer's id is still the latest one, so a
//! superseded run can finish its collaborator calls but never publish.

pub mod context;
pub mod state;

use crate::coerce::coerce;
use crate::config::TabulaConfig;
use crate::database::SqliteExecutor;
use crate::error::{PipelineError, Result};
use crate::llm::{
    HttpLlmClient, LlmChartConfigGenerator, LlmClient, LlmQueryExplainer, LlmQueryGenerator,
};
use llm_contracts::{
    ChartConfigGenerator, ChartGeneration, QueryExecutor, QueryExplainer, QueryExplanation,
    QueryGenerator, ResultSet,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn, Instrument};

pub use context::SubmissionContext;
pub use state::{
    ChartSlot, FailedStage, PipelineFailure, PipelineStage, PipelineState, ReadyState,
    GENERIC_FAILURE_MESSAGE,
};

/// The four external services a pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub query_generator: Arc<dyn QueryGenerator>,
    pub executor: Arc<dyn QueryExecutor>,
    pub chart_generator: Arc<dyn ChartConfigGenerator>,
    pub explainer: Arc<dyn QueryExplainer>,
}

impl Collaborators {
    pub fn new(
        query_generator: Arc<dyn QueryGenerator>,
        executor: Arc<dyn QueryExecutor>,
        chart_generator: Arc<dyn ChartConfigGenerator>,
        explainer: Arc<dyn QueryExplainer>,
    ) -> Self {
        Self {
            query_generator,
            executor,
            chart_generator,
            explainer,
        }
    }

    /// LLM-backed generators over one HTTP client and a SQLite executor,
    /// seeded from `database.seed_script` when one is configured.
    pub async fn from_config(config: &TabulaConfig) -> Result<Self> {
        let client: Arc<dyn LlmClient> = Arc::new(HttpLlmClient::new(config.llm.clone())?);
        let executor = SqliteExecutor::connect(&config.database.url).await?;
        if let Some(seed) = &config.database.seed_script {
            let script = tokio::fs::read_to_string(seed).await?;
            executor.execute_script(&script).await?;
            info!(path = %seed.display(), "Seeded database");
        }
        Ok(Self::new(
            Arc::new(LlmQueryGenerator::new(
                client.clone(),
                config.database.schema.clone(),
            )),
            Arc::new(executor),
            Arc::new(LlmChartConfigGenerator::new(client.clone())),
            Arc::new(LlmQueryExplainer::new(
                client,
                config.database.schema.clone(),
            )),
        ))
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub struct QueryPipelineOrchestrator {
    collaborators: Collaborators,
    state: Arc<watch::Sender<PipelineState>>,
    submissions: Arc<AtomicU64>,
}

impl QueryPipelineOrchestrator {
    pub fn new(collaborators: Collaborators) -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);
        Self {
            collaborators,
            state: Arc::new(state),
            submissions: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    pub fn current_state(&self) -> PipelineState {
        self.state.borrow().clone()
    }

    /// Runs query generation and execution, publishes the rows, then leaves
    /// chart inference running in the background.
    ///
    /// Returns as soon as the table is displayable (or the submission failed).
    /// An empty question changes nothing. If a newer submission or a clear
    /// took over meanwhile, the current state is returned untouched.
    pub async fn submit(&self, question: &str) -> PipelineState {
        if question.is_empty() {
            debug!("Ignoring empty question");
            return self.current_state();
        }
        let ctx = self.begin(question);
        let span = ctx.span();
        self.run(ctx).instrument(span).await
    }

    /// Waits until the current submission stops moving: chart attached or
    /// given up on, failed, or cleared.
    pub async fn settled(&self) -> PipelineState {
        let mut rx = self.state.subscribe();
        loop {
            let state = rx.borrow_and_update().clone();
            if state.is_settled() || rx.changed().await.is_err() {
                return state;
            }
        }
    }

    /// Drops all results and supersedes whatever is in flight.
    pub fn clear(&self) {
        self.state.send_modify(|state| {
            self.submissions.fetch_add(1, Ordering::SeqCst);
            *state = PipelineState::Idle;
        });
        info!("Pipeline cleared");
    }

    /// Asks for an explanation of `query`. Failures and empty answers both
    /// come back as `None`.
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn explain(&self, question: &str, query: &str) -> Option<Vec<QueryExplanation>> {
        match self.collaborators.explainer.explain_query(question, query).await {
            Ok(explanations) if !explanations.is_empty() => {
                debug!(sections = explanations.len(), "Query explained");
                Some(explanations)
            }
            Ok(_) => {
                debug!("Explainer returned no sections");
                None
            }
            Err(e) => {
                warn!(error = %e, "Query explanation failed");
                None
            }
        }
    }

    fn begin(&self, question: &str) -> SubmissionContext {
        let mut id = 0;
        self.state.send_modify(|state| {
            id = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;
            *state = PipelineState::GeneratingQuery {
                question: question.to_string(),
            };
        });
        SubmissionContext::new(id, question)
    }

    fn is_current(&self, ctx: &SubmissionContext) -> bool {
        self.submissions.load(Ordering::SeqCst) == ctx.id
    }

    /// Publishes `next` if `ctx` is still the latest submission.
    fn transition(&self, ctx: &SubmissionContext, next: PipelineState) -> bool {
        self.state.send_if_modified(|state| {
            if !self.is_current(ctx) {
                return false;
            }
            *state = next;
            true
        })
    }

    async fn run(&self, ctx: SubmissionContext) -> PipelineState {
        info!(question = %ctx.question, "Submission started");

        let generated = self
            .collaborators
            .query_generator
            .generate_query(&ctx.question)
            .await;
        let query = match generated {
            Ok(Some(query)) if !query.trim().is_empty() => query,
            Ok(_) => {
                let err = PipelineError::query_generation("no query was generated");
                return self.fail(&ctx, FailedStage::QueryGeneration, err, None);
            }
            Err(e) => {
                let err = PipelineError::query_generation(e.to_string());
                return self.fail(&ctx, FailedStage::QueryGeneration, err, None);
            }
        };
        debug!(query = %query, "Query generated");

        let executing = PipelineState::Executing {
            question: ctx.question.clone(),
            query: query.clone(),
        };
        if !self.transition(&ctx, executing) {
            debug!("Superseded before execution");
            return self.current_state();
        }

        let results = match self.collaborators.executor.execute_query(&query).await {
            Ok(rows) => match coerce(rows) {
                Ok(results) => Arc::new(results),
                Err(e) => {
                    let err = PipelineError::from(e);
                    return self.fail(&ctx, FailedStage::Execution, err, Some(query));
                }
            },
            Err(e) => {
                let err = PipelineError::execution(e.to_string());
                return self.fail(&ctx, FailedStage::Execution, err, Some(query));
            }
        };

        let ready = PipelineState::Ready(ReadyState {
            question: ctx.question.clone(),
            query,
            results: results.clone(),
            chart: ChartSlot::Pending,
        });
        if !self.transition(&ctx, ready.clone()) {
            debug!("Superseded before rows were shown");
            return self.current_state();
        }
        info!(
            rows = results.len(),
            columns = results.columns().len(),
            elapsed_ms = ctx.elapsed().as_millis() as u64,
            "Results ready"
        );

        self.spawn_chart_inference(ctx, results);
        ready
    }

    fn spawn_chart_inference(&self, ctx: SubmissionContext, results: Arc<ResultSet>) {
        let this = self.clone();
        let span = ctx.span();
        tokio::spawn(async move { this.infer_chart(&ctx, &results).await }.instrument(span));
    }

    async fn infer_chart(&self, ctx: &SubmissionContext, results: &ResultSet) {
        let generated = self
            .collaborators
            .chart_generator
            .generate_chart_config(results, &ctx.question)
            .await;
        let slot = match generated {
            Ok(ChartGeneration {
                config: Some(config),
            }) => match config.validate(results.columns()) {
                Ok(()) => ChartSlot::Attached(config),
                Err(reason) => {
                    let err = PipelineError::chart_config(reason);
                    warn!(error = %err, "Discarding chart config, showing table only");
                    ChartSlot::Unavailable
                }
            },
            Ok(ChartGeneration { config: None }) => {
                info!("No chart suggested, showing table only");
                ChartSlot::Unavailable
            }
            Err(e) => {
                let err = PipelineError::chart_config(e.to_string());
                warn!(error = %err, "Chart inference failed, showing table only");
                ChartSlot::Unavailable
            }
        };

        let attached = self.state.send_if_modified(|state| {
            if !self.is_current(ctx) {
                return false;
            }
            match state {
                PipelineState::Ready(ready) => {
                    ready.chart = slot;
                    true
                }
                _ => false,
            }
        });
        if attached {
            debug!(elapsed_ms = ctx.elapsed().as_millis() as u64, "Chart stage finished");
        } else {
            debug!("Superseded, dropping chart config");
        }
    }

    fn fail(
        &self,
        ctx: &SubmissionContext,
        stage: FailedStage,
        err: PipelineError,
        query: Option<String>,
    ) -> PipelineState {
        let failure = PipelineState::Failed(PipelineFailure {
            stage,
            question: ctx.question.clone(),
            query,
            reason: err.to_string(),
        });
        if !self.transition(ctx, failure.clone()) {
            debug!(error = %err, "Superseded submission failed");
            return self.current_state();
        }
        warn!(error = %err, fatal = err.is_fatal(), "Submission failed");
        failure
    }
}
