//! Comanda print server: kitchen print orchestration
//!
//! Every order line becomes one thermal-printer ticket. Print jobs move
//! through a durable state machine, a dispatcher sends them to devices, and
//! a synchronizer advances order lines (and whole orders) once their tickets
//! are printed.
//!
//! ```text
//! comanda-server/src/
//! ├── core/          # config, state, server, background tasks
//! ├── printing/      # queue, dispatcher, registry, renderer, synchronizer
//! ├── orders/        # order service gateway (HTTP and in-memory)
//! ├── api/           # HTTP routes and handlers
//! └── utils/         # logging, error re-exports
//! ```

pub mod api;
pub mod core;
pub mod orders;
pub mod printing;
pub mod utils;

pub use core::{Config, Server, ServerState};
pub use utils::logger::{init_logger, init_logger_with_file};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

/// Create the work and log directories, then start logging
pub fn setup_environment(config: &Config) -> std::io::Result<()> {
    std::fs::create_dir_all(&config.work_dir)?;
    if let Some(dir) = &config.log_dir {
        std::fs::create_dir_all(dir)?;
    }
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
    Ok(())
}
