pub mod controllers;

use axum::{
    Router,
    routing::{get, post},
};
use kbagent_agent::Agent;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::config::ServerConfig;

pub use controllers::chat::THREAD_ID_HEADER;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub agent: Agent,
}

impl AppState {
    pub fn new(agent: Agent) -> Self {
        Self { agent }
    }
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/", post(controllers::chat::chat))
        .route("/health", get(controllers::health::health))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serve `app` until Ctrl-C.
pub async fn run_server(config: ServerConfig, app: Router) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "kbagent listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the process is killed.
        std::future::pending::<()>().await;
    }
}
