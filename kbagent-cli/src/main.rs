use anyhow::Context;
use clap::Parser;
use kbagent_cli::{ServeArgs, build_agent, build_knowledgebase};
use kbagent_server::{AppState, app_router, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = ServeArgs::parse();
    kbagent_telemetry::init_telemetry(&args.common.telemetry()).context("failed to initialise logging")?;

    let timeout = args.common.timeout();
    let knowledgebase = build_knowledgebase(&args.store, &args.embedding, timeout)?;
    let agent = build_agent(knowledgebase, &args.chat, timeout)?;

    run_server(args.listen.server_config(), app_router(AppState::new(agent))).await
}
