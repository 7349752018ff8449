//! Error types for the printer library

use thiserror::Error;

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// Transport could not be opened (TCP connect / serial open)
    #[error("Connection failed: {0}")]
    Connection(String),

    /// IO error during printing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Device accepted the connection but did not take the whole payload
    #[error("Printer rejected data: {0}")]
    Rejected(String),

    /// Timeout waiting for printer
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl PrintError {
    /// Whether the device could not be reached at all
    ///
    /// Rejections and short writes are protocol-level failures; everything
    /// else means the transport never delivered.
    pub fn is_connectivity(&self) -> bool {
        !matches!(self, PrintError::Rejected(_))
    }
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
