//! Shared types for the comanda kitchen printing workspace
//!
//! Domain models exchanged over the HTTP API and between crates, plus the
//! unified error system used at every HTTP boundary.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
