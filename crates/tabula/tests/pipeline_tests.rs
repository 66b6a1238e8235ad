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

use llm_contracts::{
    CellValue, ChartConfig, ChartConfigGenerator, ChartGeneration, ChartKind, CollaboratorError,
    CollaboratorResult, QueryExecutor, QueryExplainer, QueryExplanation, QueryGenerator, RawRow,
    ResultSet,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tabula::{
    ChartRenderDispatcher, ChartSlot, Collaborators, FailedStage, PipelineStage, PipelineState, QueryPipelineOrchestrator,
};
use tokio::sync::Notify;

/// Holds a collaborator call until the test releases it.
#[derive(Default)]
struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

#[derive(Default)]
struct FakeQueryGenerator {
    /// Question -> query; missing questions generate nothing.
    queries: HashMap<String, String>,
    gates: HashMap<String, Arc<Gate>>,
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl QueryGenerator for FakeQueryGenerator {
    async fn generate_query(&self, question: &str) -> CollaboratorResult<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = self.gates.get(question) {
            gate.pass().await;
        }
        if question == "provider down" {
            return Err(CollaboratorError::Network("connection refused".into()));
        }
        Ok(self.queries.get(question).cloned())
    }
}

struct FakeExecutor;

#[async_trait::async_trait]
impl QueryExecutor for FakeExecutor {
    async fn execute_query(&self, query: &str) -> CollaboratorResult<Vec<RawRow>> {
        if query.contains("missing_table") {
            return Err(CollaboratorError::Database("no such table: missing_table".into()));
        }
        if query.contains("ragged") {
            return Ok(vec![
                raw(&[("country", "Sweden"), ("count", "1")]),
                raw(&[("country", "Norway")]),
            ]);
        }
        let country = if query.contains("asia") { "China" } else { "United States" };
        Ok(vec![
            raw(&[("country", country), ("count", "656")]),
            raw(&[("country", "India"), ("count", "71")]),
        ])
    }
}

#[derive(Default)]
struct FakeChartGenerator {
    gates: HashMap<String, Arc<Gate>>,
    /// Question -> x key to chart; `None` values mean "table only".
    configs: HashMap<String, Option<String>>,
    /// Question -> exact config, checked before `configs`.
    exact: HashMap<String, ChartConfig>,
}

#[async_trait::async_trait]
impl ChartConfigGenerator for FakeChartGenerator {
    async fn generate_chart_config(
        &self,
        _results: &ResultSet,
        question: &str,
    ) -> CollaboratorResult<ChartGeneration> {
        if let Some(gate) = self.gates.get(question) {
            gate.pass().await;
        }
        if let Some(config) = self.exact.get(question) {
            return Ok(ChartGeneration::with_config(config.clone()));
        }
        match self.configs.get(question) {
            Some(Some(x_key)) => {
                let mut config = ChartConfig::new(ChartKind::Bar, x_key, vec!["count".into()]);
                config.title = question.to_string();
                Ok(ChartGeneration::with_config(config))
            }
            Some(None) => Ok(ChartGeneration::table_only()),
            None => Err(CollaboratorError::Provider("model overloaded".into())),
        }
    }
}

struct FakeExplainer;

#[async_trait::async_trait]
impl QueryExplainer for FakeExplainer {
    async fn explain_query(
        &self,
        _question: &str,
        query: &str,
    ) -> CollaboratorResult<Vec<QueryExplanation>> {
        if query.is_empty() {
            return Err(CollaboratorError::Timeout);
        }
        Ok(vec![QueryExplanation {
            section: query.to_string(),
            explanation: "Counts unicorns per country.".into(),
        }])
    }
}

fn raw(pairs: &[(&str, &str)]) -> RawRow {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), CellValue::text(*v)))
        .collect()
}

fn orchestrator(
    generator: FakeQueryGenerator,
    charts: FakeChartGenerator,
) -> (QueryPipelineOrchestrator, Arc<FakeQueryGenerator>) {
    let generator = Arc::new(generator);
    let collaborators = Collaborators::new(
        generator.clone(),
        Arc::new(FakeExecutor),
        Arc::new(charts),
        Arc::new(FakeExplainer),
    );
    (QueryPipelineOrchestrator::new(collaborators), generator)
}

fn queries(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(q, sql)| (q.to_string(), sql.to_string()))
        .collect()
}

fn charts(pairs: &[(&str, Option<&str>)]) -> HashMap<String, Option<String>> {
    pairs
        .iter()
        .map(|(q, x)| (q.to_string(), x.map(str::to_string)))
        .collect()
}

#[tokio::test]
async fn test_table_is_ready_before_chart() {
    let gate = Arc::new(Gate::default());
    let generator = FakeQueryGenerator {
        queries: queries(&[("unicorns by country", "SELECT country, count FROM t")]),
        ..Default::default()
    };
    let chart_generator = FakeChartGenerator {
        gates: [("unicorns by country".to_string(), gate.clone())].into(),
        configs: charts(&[("unicorns by country", Some("country"))]),
        ..Default::default()
    };
    let (pipeline, _) = orchestrator(generator, chart_generator);
    let mut rx = pipeline.subscribe();

    let state = pipeline.submit("unicorns by country").await;
    let ready = state.ready().expect("rows are shown before the chart");
    assert_eq!(ready.chart, ChartSlot::Pending);
    assert_eq!(state.stage(), PipelineStage::GeneratingChart);
    assert_eq!(ready.results.len(), 2);
    assert_eq!(ready.results.rows()[0]["count"], CellValue::Number(656.0));
    assert_eq!(ready.results.columns(), ["country", "count"]);

    gate.entered.notified().await;
    assert_eq!(rx.borrow_and_update().stage(), PipelineStage::GeneratingChart);
    gate.release.notify_one();

    let settled = pipeline.settled().await;
    let chart = settled.ready().and_then(|r| r.chart()).expect("chart attached");
    assert_eq!(chart.x_key, "country");
    assert_eq!(settled.stage(), PipelineStage::Ready);
    assert_eq!(settled.ready().unwrap().results, ready.results);
}

#[tokio::test]
async fn test_superseded_submission_never_overwrites() {
    let gate = Arc::new(Gate::default());
    let generator = FakeQueryGenerator {
        queries: queries(&[
            ("slow question", "SELECT * FROM slow"),
            ("asia unicorns", "SELECT * FROM asia"),
        ]),
        gates: [("slow question".to_string(), gate.clone())].into(),
        ..Default::default()
    };
    let chart_generator = FakeChartGenerator {
        configs: charts(&[("slow question", Some("country")), ("asia unicorns", None)]),
        ..Default::default()
    };
    let (pipeline, _) = orchestrator(generator, chart_generator);

    let slow = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.submit("slow question").await })
    };
    gate.entered.notified().await;

    let fast = pipeline.submit("asia unicorns").await;
    assert_eq!(fast.question(), Some("asia unicorns"));

    gate.release.notify_one();
    let stale = slow.await.unwrap();
    assert_eq!(stale.question(), Some("asia unicorns"));

    let settled = pipeline.settled().await;
    let ready = settled.ready().unwrap();
    assert_eq!(ready.question, "asia unicorns");
    assert_eq!(ready.query, "SELECT * FROM asia");
    assert_eq!(ready.chart, ChartSlot::Unavailable);
    assert_eq!(ready.results.rows()[0]["country"], CellValue::text("China"));
}

#[tokio::test]
async fn test_late_chart_from_superseded_submission_is_dropped() {
    let gate = Arc::new(Gate::default());
    let generator = FakeQueryGenerator {
        queries: queries(&[("first", "SELECT 1"), ("second", "SELECT 2")]),
        ..Default::default()
    };
    let chart_generator = FakeChartGenerator {
        gates: [("first".to_string(), gate.clone())].into(),
        configs: charts(&[("first", Some("country")), ("second", Some("count"))]),
        ..Default::default()
    };
    let (pipeline, _) = orchestrator(generator, chart_generator);

    pipeline.submit("first").await;
    gate.entered.notified().await;
    pipeline.submit("second").await;
    let settled = pipeline.settled().await;
    assert_eq!(settled.ready().and_then(|r| r.chart()).unwrap().title, "second");

    gate.release.notify_one();
    tokio::task::yield_now().await;
    let current = pipeline.current_state();
    assert_eq!(current.ready().and_then(|r| r.chart()).unwrap().title, "second");
}

#[tokio::test]
async fn test_missing_query_fails_and_clears_previous_results() {
    let generator = FakeQueryGenerator {
        queries: queries(&[("unicorns by country", "SELECT country, count FROM t")]),
        ..Default::default()
    };
    let (pipeline, _) = orchestrator(generator, FakeChartGenerator::default());

    let first = pipeline.submit("unicorns by country").await;
    assert!(first.ready().is_some());

    let state = pipeline.submit("something unanswerable").await;
    let failure = state.failure().expect("generation failure");
    assert_eq!(failure.stage, FailedStage::QueryGeneration);
    assert_eq!(failure.code(), "query-generation-error");
    assert_eq!(failure.user_message(), "An error occurred. Please try again.");
    assert!(state.active_query().is_none());
    assert!(pipeline.current_state().ready().is_none());

    let state = pipeline.submit("provider down").await;
    assert!(state.failure().unwrap().reason.contains("connection refused"));
}

#[tokio::test]
async fn test_execution_failure_keeps_the_query() {
    let generator = FakeQueryGenerator {
        queries: queries(&[("bad", "SELECT * FROM missing_table")]),
        ..Default::default()
    };
    let (pipeline, _) = orchestrator(generator, FakeChartGenerator::default());

    let state = pipeline.submit("bad").await;
    let failure = state.failure().unwrap();
    assert_eq!(failure.stage, FailedStage::Execution);
    assert_eq!(failure.code(), "execution-error");
    assert_eq!(state.active_query(), Some("SELECT * FROM missing_table"));
    assert!(state.is_settled());
}

#[tokio::test]
async fn test_inconsistent_rows_fail_execution() {
    let generator = FakeQueryGenerator {
        queries: queries(&[("ragged", "SELECT * FROM ragged")]),
        ..Default::default()
    };
    let (pipeline, _) = orchestrator(generator, FakeChartGenerator::default());

    let state = pipeline.submit("ragged").await;
    let failure = state.failure().unwrap();
    assert_eq!(failure.stage, FailedStage::Execution);
    assert!(failure.reason.contains("row 1"));
}

#[tokio::test]
async fn test_chart_failure_keeps_the_table() {
    let generator = FakeQueryGenerator {
        queries: queries(&[
            ("overloaded", "SELECT 1"),
            ("bad config", "SELECT 2"),
            ("table only", "SELECT 3"),
        ]),
        ..Default::default()
    };
    let chart_generator = FakeChartGenerator {
        configs: charts(&[("bad config", Some("no_such_column")), ("table only", None)]),
        ..Default::default()
    };
    let (pipeline, _) = orchestrator(generator, chart_generator);

    for question in ["overloaded", "bad config", "table only"] {
        pipeline.submit(question).await;
        let settled = pipeline.settled().await;
        let ready = settled.ready().expect("table survives chart failure");
        assert_eq!(ready.chart, ChartSlot::Unavailable, "{question}");
        assert_eq!(ready.results.len(), 2);
    }
}

#[tokio::test]
async fn test_line_hints_without_pivot_still_chart_every_y_key() {
    let generator = FakeQueryGenerator {
        queries: queries(&[
            ("count trend", "SELECT country, count FROM t"),
            ("count bars", "SELECT country, count FROM t"),
        ]),
        ..Default::default()
    };
    let mut line = ChartConfig::new(ChartKind::Line, "country", vec!["count".into()]);
    line.multiple_lines = Some(true);
    line.measurement_column = Some("metric".into());
    let mut bar = ChartConfig::new(ChartKind::Bar, "country", vec!["count".into()]);
    bar.multiple_lines = Some(true);
    let chart_generator = FakeChartGenerator {
        exact: [
            ("count trend".to_string(), line),
            ("count bars".to_string(), bar),
        ]
        .into(),
        ..Default::default()
    };
    let (pipeline, _) = orchestrator(generator, chart_generator);
    let dispatcher = ChartRenderDispatcher::default();

    for question in ["count trend", "count bars"] {
        pipeline.submit(question).await;
        let settled = pipeline.settled().await;
        let ready = settled.ready().expect("table is shown");
        let config = ready.chart().expect("config with unused line hints is attached");

        let rendered = dispatcher.render_results(&ready.results, config);
        let spec = rendered.spec().expect("chart renders from the rows as they are");
        let keys: Vec<_> = spec.series.iter().map(|s| s.data_key.as_str()).collect();
        assert_eq!(keys, vec!["count"], "{question}");
        assert_eq!(spec.data.len(), 2);
    }
}

#[tokio::test]
async fn test_empty_question_is_a_no_op() {
    let (pipeline, generator) =
        orchestrator(FakeQueryGenerator::default(), FakeChartGenerator::default());
    let state = pipeline.submit("").await;
    assert_eq!(state, PipelineState::Idle);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_clear_supersedes_in_flight_submission() {
    let gate = Arc::new(Gate::default());
    let generator = FakeQueryGenerator {
        queries: queries(&[("slow question", "SELECT 1")]),
        gates: [("slow question".to_string(), gate.clone())].into(),
        ..Default::default()
    };
    let (pipeline, _) = orchestrator(generator, FakeChartGenerator::default());

    let slow = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.submit("slow question").await })
    };
    gate.entered.notified().await;
    pipeline.clear();
    gate.release.notify_one();

    assert_eq!(slow.await.unwrap(), PipelineState::Idle);
    assert_eq!(pipeline.settled().await, PipelineState::Idle);
}

#[tokio::test]
async fn test_explain_is_independent_of_the_pipeline() {
    let (pipeline, _) =
        orchestrator(FakeQueryGenerator::default(), FakeChartGenerator::default());
    let explained = pipeline
        .explain("unicorns by country", "SELECT country FROM unicorns")
        .await
        .unwrap();
    assert_eq!(explained[0].section, "SELECT country FROM unicorns");
    assert!(pipeline.explain("q", "").await.is_none());
    assert_eq!(pipeline.current_state(), PipelineState::Idle);
}
