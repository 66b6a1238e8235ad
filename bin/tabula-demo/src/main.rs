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

use anyhow::Result;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tabula::{
    CellFormatter, ChartRenderDispatcher, Collaborators, PipelineStage, PipelineState,
    QueryPipelineOrchestrator, QueryPreview, RenderedChart, TableView, TabulaConfig,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

const DEFAULT_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config/tabula.toml");
const BUNDLED_SEED: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data/unicorns.sql");

#[derive(Parser, Debug, Clone)]
#[command(name = "tabula-demo", about = "Ask questions about a table of unicorn startups")]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// SQLite URL, e.g. sqlite://unicorns.db
    #[arg(long)]
    database: Option<String>,

    /// SQL script run once after connecting.
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Answer one question and exit.
    #[arg(long)]
    question: Option<String>,
}

/// What the last answered question left on screen.
#[derive(Default)]
struct Session {
    question: Option<String>,
    preview: Option<QueryPreview>,
}

struct Demo {
    pipeline: QueryPipelineOrchestrator,
    dispatcher: ChartRenderDispatcher,
    formatter: CellFormatter,
    preview_cutoff: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();
    let cli = Cli::parse();

    let mut config = TabulaConfig::load(&cli.config).await?;
    config.apply_env_overrides()?;
    if let Some(url) = cli.database {
        config.database.url = url;
    }
    if let Some(seed) = cli.seed {
        config.database.seed_script = Some(seed);
    }
    if config.database.seed_script.is_none() && config.database.url.contains(":memory:") {
        config.database.seed_script = Some(PathBuf::from(BUNDLED_SEED));
    }

    let collaborators = Collaborators::from_config(&config).await?;
    let demo = Demo {
        pipeline: QueryPipelineOrchestrator::new(collaborators),
        dispatcher: ChartRenderDispatcher::from_settings(&config.chart),
        formatter: CellFormatter::from_settings(&config.table),
        preview_cutoff: config.table.query_preview_cutoff,
    };
    spawn_progress_printer(&demo.pipeline);
    info!("tabula demo ready");

    let mut session = Session::default();
    if let Some(question) = cli.question {
        demo.ask(&question, &mut session).await?;
        return Ok(());
    }

    println!("\nAsk about unicorn startups, e.g. \"Which countries have the most unicorns?\"");
    println!("Commands: 'explain' the last query, 'full' to show it whole, 'clear', 'exit'.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => continue,
            "exit" | "quit" => break,
            "clear" => {
                demo.pipeline.clear();
                session = Session::default();
                println!("Cleared.");
            }
            "full" => match session.preview.as_mut() {
                Some(preview) => {
                    preview.expand();
                    println!("{}", preview.display());
                }
                None => println!("No query yet."),
            },
            "explain" => demo.explain(&mut session).await,
            question => demo.ask(question, &mut session).await?,
        }
    }
    println!("Goodbye!");
    Ok(())
}

fn spawn_progress_printer(pipeline: &QueryPipelineOrchestrator) {
    let mut rx = pipeline.subscribe();
    tokio::spawn(async move {
        let mut last = PipelineStage::Idle;
        while rx.changed().await.is_ok() {
            let stage = rx.borrow_and_update().stage();
            if stage != last {
                if let Some(message) = stage.progress_message() {
                    println!("{message}");
                }
                last = stage;
            }
        }
    });
}

impl Demo {
    async fn ask(&self, question: &str, session: &mut Session) -> Result<()> {
        let state = self.pipeline.submit(question).await;
        session.question = Some(question.to_string());
        session.preview = state
            .active_query()
            .map(|query| QueryPreview::new(query, self.preview_cutoff));

        match &state {
            PipelineState::Failed(failure) => {
                warn!(code = failure.code(), reason = %failure.reason, "Question failed");
                println!("{}", failure.user_message());
                if let Some(preview) = &session.preview {
                    println!("\n{}", preview.display());
                }
                return Ok(());
            }
            PipelineState::Ready(ready) => {
                if let Some(preview) = &session.preview {
                    println!("\n{}\n", preview.display());
                }
                let table = TableView::from_results(&ready.results, &self.formatter);
                match table.empty_message() {
                    Some(message) => println!("{message}"),
                    None => print_table(&table),
                }
            }
            _ => return Ok(()),
        }

        let settled = self.pipeline.settled().await;
        let Some(ready) = settled.ready() else {
            return Ok(());
        };
        if !ready.results.is_chartable() {
            return Ok(());
        }
        match ready.chart() {
            Some(config) => match self.dispatcher.render_results(&ready.results, config) {
                RenderedChart::Chart(spec) => {
                    if !spec.title.is_empty() {
                        println!("\n{}", spec.title);
                    }
                    println!("{}", serde_json::to_string_pretty(&spec)?);
                    if !spec.takeaway.is_empty() {
                        println!("{}", spec.takeaway);
                    }
                }
                other => {
                    if let Some(text) = other.placeholder_text() {
                        println!("\n{text}");
                    }
                }
            },
            None => println!("\n(no chart for this result)"),
        }
        Ok(())
    }

    async fn explain(&self, session: &mut Session) {
        let (Some(question), Some(preview)) = (&session.question, session.preview.as_mut()) else {
            println!("No query to explain.");
            return;
        };
        match self.pipeline.explain(question, preview.query()).await {
            Some(explanations) => {
                preview.attach_explanations(explanations);
                println!("{}\n", preview.display());
                for item in preview.explanations() {
                    println!("  {}\n    {}", item.section, item.explanation);
                }
            }
            None => println!("No explanation available."),
        }
    }
}

fn print_table(table: &TableView) {
    let widths: Vec<usize> = table
        .headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            table
                .rows
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();
    let render = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join(" | ")
    };
    println!("{}", render(&table.headers));
    println!("{}", "─".repeat(widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1)));
    for row in &table.rows {
        println!("{}", render(row));
    }
}
