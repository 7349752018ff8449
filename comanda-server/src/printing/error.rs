//! Print engine error taxonomy

use comanda_printer::PrintError;
use shared::error::{AppError, ErrorCode};
use shared::models::PrintJobStatus;
use thiserror::Error;

use super::storage::PrintStorageError;
use crate::orders::GatewayError;

#[derive(Debug, Error)]
pub enum PrintingError {
    /// Device unreachable, refused or timed out
    #[error("Printer unreachable: {0}")]
    Connectivity(String),

    /// Device accepted the connection but rejected the data
    #[error("Printer rejected data: {0}")]
    Protocol(String),

    #[error("Printer {0} is inactive")]
    InactiveDevice(i64),

    #[error("Print job {id} has no retries left ({attempts}/{max_attempts})")]
    ExhaustedRetries {
        id: i64,
        attempts: u32,
        max_attempts: u32,
    },

    /// Another dispatcher won the claim
    #[error("Print job {0} is no longer pending")]
    ConcurrencyConflict(i64),

    #[error("Cannot {action} print job {id} in status {status}")]
    InvalidState {
        id: i64,
        status: PrintJobStatus,
        action: &'static str,
    },

    #[error("Printer {0} not found")]
    PrinterNotFound(i64),

    #[error("Print job {0} not found")]
    JobNotFound(i64),

    #[error("Printer {id} is referenced by {jobs} live print job(s)")]
    InUse { id: i64, jobs: usize },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] PrintStorageError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

pub type PrintingResult<T> = Result<T, PrintingError>;

impl From<PrintError> for PrintingError {
    fn from(err: PrintError) -> Self {
        match err {
            PrintError::Rejected(msg) => PrintingError::Protocol(msg),
            PrintError::InvalidConfig(msg) => PrintingError::Validation(msg),
            other => PrintingError::Connectivity(other.to_string()),
        }
    }
}

impl From<redb::TransactionError> for PrintingError {
    fn from(err: redb::TransactionError) -> Self {
        PrintingError::Storage(err.into())
    }
}

impl From<redb::CommitError> for PrintingError {
    fn from(err: redb::CommitError) -> Self {
        PrintingError::Storage(err.into())
    }
}

impl From<PrintingError> for AppError {
    fn from(err: PrintingError) -> Self {
        let message = err.to_string();
        match err {
            PrintingError::Connectivity(_) => {
                AppError::with_message(ErrorCode::PrinterNotAvailable, message)
            }
            PrintingError::Protocol(_) => AppError::with_message(ErrorCode::PrintFailed, message),
            PrintingError::InactiveDevice(id) => {
                AppError::with_message(ErrorCode::PrinterInactive, message)
                    .with_detail("printer_id", id)
            }
            PrintingError::ExhaustedRetries {
                id,
                attempts,
                max_attempts,
            } => AppError::with_message(ErrorCode::PrintRetriesExhausted, message)
                .with_detail("id", id)
                .with_detail("attempts", attempts)
                .with_detail("max_attempts", max_attempts),
            PrintingError::ConcurrencyConflict(id) => {
                AppError::with_message(ErrorCode::PrintJobConflict, message).with_detail("id", id)
            }
            PrintingError::InvalidState { id, status, .. } => {
                AppError::with_message(ErrorCode::PrintJobInvalidState, message)
                    .with_detail("id", id)
                    .with_detail("status", status.as_str())
            }
            PrintingError::PrinterNotFound(id) => {
                AppError::with_message(ErrorCode::PrinterNotFound, message)
                    .with_detail("printer_id", id)
            }
            PrintingError::JobNotFound(id) => {
                AppError::with_message(ErrorCode::PrintJobNotFound, message).with_detail("id", id)
            }
            PrintingError::InUse { id, jobs } => {
                AppError::with_message(ErrorCode::PrinterInUse, message)
                    .with_detail("printer_id", id)
                    .with_detail("jobs", jobs)
            }
            PrintingError::Validation(_) => {
                AppError::with_message(ErrorCode::ValidationFailed, message)
            }
            PrintingError::Storage(_) => AppError::database(message),
            PrintingError::Gateway(e) => e.into(),
        }
    }
}
