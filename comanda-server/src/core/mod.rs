//! Core module: configuration, state, lifecycle and errors
//!
//! - [`Config`]: environment-driven configuration
//! - [`ServerState`]: shared component handles
//! - [`Server`]: HTTP server
//! - [`ServerError`]: startup and serving errors

pub mod config;
pub mod error;
pub mod server;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use error::{Result, ServerError};
pub use server::Server;
pub use state::ServerState;
pub use tasks::{BackgroundTasks, TaskKind};
