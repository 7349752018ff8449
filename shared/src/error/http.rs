//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            Self::ValidationFailed => StatusCode::BAD_REQUEST,

            // 404 Not Found
            Self::OrderNotFound
            | Self::OrderItemNotFound
            | Self::PrinterNotFound
            | Self::PrintJobNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::PrinterInUse
            | Self::PrinterInactive
            | Self::PrintJobInvalidState
            | Self::PrintRetriesExhausted
            | Self::PrintJobConflict => StatusCode::CONFLICT,

            // 502 Bad Gateway (device rejected the data)
            Self::PrintFailed => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable (transient errors, client can retry)
            Self::NetworkError | Self::PrinterNotAvailable => StatusCode::SERVICE_UNAVAILABLE,

            // 504 Gateway Timeout
            Self::TimeoutError => StatusCode::GATEWAY_TIMEOUT,

            Self::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status() {
        assert_eq!(ErrorCode::OrderNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::PrinterNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::PrintJobNotFound.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflict_status() {
        assert_eq!(ErrorCode::PrinterInUse.http_status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::PrinterInactive.http_status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::PrintRetriesExhausted.http_status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_device_errors_status() {
        assert_eq!(
            ErrorCode::PrinterNotAvailable.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(ErrorCode::PrintFailed.http_status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ErrorCode::TimeoutError.http_status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_validation_is_bad_request() {
        assert_eq!(
            ErrorCode::ValidationFailed.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
