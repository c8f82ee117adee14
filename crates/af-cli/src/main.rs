//! agentflow CLI: turn a plain-English automation request into an n8n workflow.

mod cli;

use af_compiler::{extractor, schedule, validator, Compiler, WorkflowOutcome};
use af_core::event::WORKFLOW_GENERATED;
use af_core::export::{from_n8n_json, to_n8n_json};
use af_core::prelude::{EventRecord, ValidationResult};
use af_trace::store::EventStore;
use anyhow::{bail, Context};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "agentflow=debug,af_compiler=debug,af_trace=debug"
    } else {
        "agentflow=info,af_compiler=info,af_trace=info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Generate {
            request,
            output,
            save,
            json,
            log_db,
        } => {
            let output = cli::output_path(output, save);
            cmd_generate(&request.join(" "), output.as_deref(), json, log_db.as_deref()).await?
        }
        Commands::Validate { file } => cmd_validate(&file)?,
        Commands::Extract { text } => cmd_extract(&text.join(" "))?,
        Commands::Schedule { text } => println!("{}", schedule::to_schedule(&text.join(" "))),
        Commands::Events {
            log_db,
            limit,
            event_type,
        } => cmd_events(&log_db, limit, event_type.as_deref())?,
    }

    Ok(())
}

async fn cmd_generate(
    request: &str,
    output: Option<&Path>,
    json: bool,
    log_db: Option<&Path>,
) -> anyhow::Result<()> {
    let compiler = Compiler::from_env();
    let outcome = compiler.generate_workflow(request).await;

    if let Some(path) = log_db {
        let store = EventStore::open(path)
            .with_context(|| format!("Failed to open event log {}", path.display()))?;
        let event = EventRecord::new(WORKFLOW_GENERATED, outcome.event_payload())
            .with_user_message(request);
        store.append(&event).context("Failed to log workflow event")?;
    }

    if let (Some(path), Some(graph)) = (output, outcome.graph.as_ref()) {
        std::fs::write(path, to_n8n_json(graph)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "saved workflow");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome)?;
    }

    if outcome.generation_failed() {
        bail!("workflow generation failed");
    }
    Ok(())
}

fn print_outcome(outcome: &WorkflowOutcome) -> anyhow::Result<()> {
    println!("Summary:");
    for line in &outcome.summary {
        println!("  - {line}");
    }
    if let Some(graph) = &outcome.graph {
        println!();
        println!("{}", to_n8n_json(graph)?);
    }
    print_findings(&outcome.errors, &outcome.warnings);
    Ok(())
}

fn print_findings(errors: &[String], warnings: &[String]) {
    if !errors.is_empty() {
        println!();
        println!("Errors:");
        for e in errors {
            println!("  - {e}");
        }
    }
    if !warnings.is_empty() {
        println!();
        println!("Warnings:");
        for w in warnings {
            println!("  - {w}");
        }
    }
}

fn cmd_validate(file: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let graph = from_n8n_json(&content)
        .with_context(|| format!("{} is not a valid workflow document", file.display()))?;

    let ValidationResult { errors, warnings } = validator::validate(&graph);
    if errors.is_empty() && warnings.is_empty() {
        println!("Workflow is valid ({} nodes)", graph.nodes.len());
    } else {
        print_findings(&errors, &warnings);
    }

    if !errors.is_empty() {
        bail!("workflow has {} error(s)", errors.len());
    }
    Ok(())
}

fn cmd_extract(text: &str) -> anyhow::Result<()> {
    let entities = extractor::extract(text);
    println!("{}", serde_json::to_string_pretty(&entities)?);
    Ok(())
}

fn cmd_events(log_db: &Path, limit: u32, event_type: Option<&str>) -> anyhow::Result<()> {
    let store = EventStore::open(log_db)
        .with_context(|| format!("Failed to open event log {}", log_db.display()))?;
    let events = match event_type {
        Some(t) => store.by_type(t, limit)?,
        None => store.recent(limit)?,
    };
    println!("{}", af_trace::export::export_json(&events)?);
    Ok(())
}
