use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - session token may be expired")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("No data in response from {0}")]
    MissingData(String),

    #[error("{error_type}: {message}")]
    Upstream { error_type: String, message: String },
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// `error_type` the API uses when the session token is invalid or expired
const TOKEN_EXCEPTION: &str = "TokenException";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error_type: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let cut: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
            format!("{}... (truncated, {} total bytes)", cut, body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let (error_type, message) = match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => (parsed.error_type, parsed.message),
            Err(_) => (None, None),
        };

        if error_type.as_deref() == Some(TOKEN_EXCEPTION) {
            return ApiError::Unauthorized;
        }

        let detail = message.unwrap_or_else(|| Self::truncate_body(body));
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(detail),
            404 => ApiError::NotFound(detail),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(detail),
            _ => match error_type {
                Some(error_type) => ApiError::Upstream {
                    error_type,
                    message: detail,
                },
                None => ApiError::InvalidResponse(format!("Status {}: {}", status, detail)),
            },
        }
    }

    /// Error for a 2xx response whose envelope still says `"status": "error"`.
    pub fn from_envelope(error_type: Option<String>, message: Option<String>) -> Self {
        match error_type {
            Some(t) if t == TOKEN_EXCEPTION => ApiError::Unauthorized,
            Some(error_type) => ApiError::Upstream {
                error_type,
                message: message.unwrap_or_default(),
            },
            None => ApiError::InvalidResponse(message.unwrap_or_else(|| "error status without message".to_string())),
        }
    }

    /// Whether the caller should run the login handshake again.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    #[test]
    fn test_token_exception_is_unauthorized() {
        let body = r#"{"status":"error","message":"Incorrect `api_key` or `access_token`.","error_type":"TokenException"}"#;
        let err = ApiError::from_status(StatusCode::FORBIDDEN, body);
        assert!(err.is_auth_failure());
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(ApiError::from_status(StatusCode::UNAUTHORIZED, ""), ApiError::Unauthorized));
        assert!(matches!(ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""), ApiError::RateLimited));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream down"),
            ApiError::ServerError(ref m) if m == "upstream down"
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::FORBIDDEN, r#"{"message":"Not allowed","error_type":"PermissionException"}"#),
            ApiError::AccessDenied(ref m) if m == "Not allowed"
        ));
    }

    #[test]
    fn test_input_exception_keeps_type() {
        let body = r#"{"status":"error","message":"Invalid quantity","error_type":"InputException"}"#;
        match ApiError::from_status(StatusCode::BAD_REQUEST, body) {
            ApiError::Upstream { error_type, message } => {
                assert_eq!(error_type, "InputException");
                assert_eq!(message, "Invalid quantity");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_long_body_is_truncated() {
        let body = "x".repeat(2000);
        match ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &body) {
            ApiError::ServerError(m) => assert!(m.ends_with("(truncated, 2000 total bytes)")),
            other => panic!("unexpected error: {}", other),
        }
    }
}
