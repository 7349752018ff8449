//! Utilities
//!
//! - [`AppError`], [`ApiResponse`], [`AppResult`]: HTTP error types (from `shared::error`)
//! - [`logger`]: tracing subscriber setup

pub mod logger;

pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
