//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            Self::PrinterNotFound => StatusCode::NOT_FOUND,

            // 503 Service Unavailable (transient, client can retry)
            Self::PrinterNotAvailable => StatusCode::SERVICE_UNAVAILABLE,

            Self::PrintFailed | Self::DocumentLoadFailed => StatusCode::INTERNAL_SERVER_ERROR,

            Self::ValidationFailed | Self::JobListEmpty | Self::InvalidJob => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_status() {
        assert_eq!(ErrorCode::Success.http_status(), StatusCode::OK);
    }

    #[test]
    fn test_not_found_status() {
        assert_eq!(
            ErrorCode::PrinterNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_bad_request_status() {
        assert_eq!(
            ErrorCode::JobListEmpty.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::ValidationFailed.http_status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_server_side_status() {
        assert_eq!(
            ErrorCode::PrintFailed.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::DocumentLoadFailed.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::PrinterNotAvailable.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
