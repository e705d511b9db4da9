use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use kbagent_cli::{FillArgs, build_knowledgebase};
use kbagent_knowledge::load_directory;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let args = FillArgs::parse();
    kbagent_telemetry::init_telemetry(&args.common.telemetry()).context("failed to initialise logging")?;

    let knowledgebase = build_knowledgebase(&args.store, &args.embedding, args.common.timeout())?;
    let report = load_directory(&knowledgebase, &args.dir, args.concurrency)
        .await
        .with_context(|| format!("failed to load documents from {}", args.dir.display()))?;

    for stored in &report.stored {
        info!(document = %stored.name, key = %stored.key, "stored");
    }
    for failed in &report.failed {
        error!(document = %failed.name, error = %failed.error, "not stored");
    }
    info!(total = report.total(), stored = report.stored.len(), failed = report.failed.len(), "done");

    Ok(if report.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
