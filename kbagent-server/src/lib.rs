//! # kbagent-server
//!
//! axum front door for a kbagent [`Agent`](kbagent_agent::Agent).
//!
//! - `POST /` answers a chat message with the agent's final reply as plain text
//! - `GET /health` reports liveness
//!
//! ```rust,ignore
//! let app = kbagent_server::app_router(AppState::new(agent));
//! kbagent_server::run_server(ServerConfig::default(), app).await?;
//! ```

pub mod config;
pub mod rest;

pub use config::ServerConfig;
pub use rest::{AppState, THREAD_ID_HEADER, app_router, run_server};
