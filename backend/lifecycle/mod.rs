//! Server lifecycle management.
//!
//! Start/stop/restart/status/port-reclaim/log-tailing for the HTTP server
//! process, driven by the `docforgectl` CLI. State lives in three files in
//! the working directory: `.backend.pid`, `backend.log`, and
//! `.backend_config.json`.

pub mod manager;
pub mod process;
pub mod types;

pub use manager::ServerManager;
pub use types::{ConfigPatch, LifecycleError, ServerConfig, StatusReport};
