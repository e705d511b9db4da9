//! # kbagent-cli
//!
//! Configuration and wiring shared by the `kbagent` and `fill-knowledgebase`
//! binaries.

pub mod config;
pub mod setup;

pub use config::{FillArgs, ServeArgs, StoreBackend};
pub use setup::{build_agent, build_knowledgebase};
