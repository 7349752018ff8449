//! Data models
//!
//! Shared between comanda-server and its HTTP clients.
//! All IDs are `i64`, allocated sequentially by the server.
//! All timestamps are Unix milliseconds.

pub mod order;
pub mod print_job;
pub mod printer;

// Re-exports
pub use order::*;
pub use print_job::*;
pub use printer::*;
