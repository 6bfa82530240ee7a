//! API error taxonomy and classification
//!
//! Every failure a call can end in is one of the [`ApiError`] variants, and
//! each variant knows its process exit code. Raw failures (transport errors,
//! HTTP statuses, undecodable bodies) are turned into variants here.

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use thiserror::Error;

/// Process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GenericError = 1,
    NotFound = 2,
    RateLimited = 3,
    InvalidArgs = 4,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}

/// Errors that can end an API call or command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The resource does not exist (HTTP 404, missing page, unknown constant)
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// The server asked us to slow down (HTTP 429)
    #[error("{}", rate_limit_message(*retry_after_secs))]
    RateLimited { retry_after_secs: u64 },

    /// Bad flags, arguments or configuration
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    /// Connection, DNS or timeout failure
    #[error("network error: {0}")]
    Network(String),

    /// HTTP 500, 502 or 503 after all retries
    #[error("server error: HTTP {status} from {resource}")]
    ServerError { status: u16, resource: String },

    /// Any other failure, including other 4xx statuses and undecodable bodies
    #[error("{message}")]
    Generic {
        status: Option<u16>,
        message: String,
    },
}

fn rate_limit_message(retry_after_secs: u64) -> String {
    if retry_after_secs > 0 {
        format!("rate limited: retry after {} seconds", retry_after_secs)
    } else {
        "rate limited: please try again later".to_string()
    }
}

impl ApiError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        ApiError::NotFound {
            resource: resource.into(),
        }
    }

    /// A success response whose body could not be decoded
    pub fn parse(resource: &str, err: serde_json::Error) -> Self {
        ApiError::Generic {
            status: None,
            message: format!("failed to parse {} response: {}", resource, err),
        }
    }

    /// Exit code reported at the process boundary
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ApiError::NotFound { .. } => ExitCode::NotFound,
            ApiError::RateLimited { .. } => ExitCode::RateLimited,
            ApiError::InvalidArgs(_) => ExitCode::InvalidArgs,
            ApiError::Network(_) | ApiError::ServerError { .. } | ApiError::Generic { .. } => {
                ExitCode::GenericError
            }
        }
    }

    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Network(_) | ApiError::RateLimited { .. } | ApiError::ServerError { .. }
        )
    }
}

/// Classifies a failure that happened before any response arrived
pub fn classify_transport(err: &reqwest::Error) -> ApiError {
    if err.is_builder() {
        return ApiError::Generic {
            status: None,
            message: format!("invalid request: {}", err),
        };
    }
    if err.is_timeout() {
        return ApiError::Network(format!("request timed out: {}", err));
    }
    ApiError::Network(err.to_string())
}

/// Classifies an HTTP response
///
/// Returns `None` for statuses below 400, which count as success.
pub fn classify_status(
    status: StatusCode,
    headers: &HeaderMap,
    body: &[u8],
    resource: &str,
) -> Option<ApiError> {
    match status {
        StatusCode::NOT_FOUND => Some(ApiError::not_found(resource)),
        StatusCode::TOO_MANY_REQUESTS => Some(ApiError::RateLimited {
            retry_after_secs: retry_after(headers).unwrap_or(0),
        }),
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE => Some(ApiError::ServerError {
            status: status.as_u16(),
            resource: resource.to_string(),
        }),
        s if s.as_u16() >= 400 => Some(ApiError::Generic {
            status: Some(s.as_u16()),
            message: format!(
                "API error: HTTP {} - {}",
                s.as_u16(),
                String::from_utf8_lossy(body).trim()
            ),
        }),
        _ => None,
    }
}

/// Reads the `Retry-After` header as whole seconds
pub fn retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_retry_after)
}

/// Parses a base-10, non-negative integer; anything else is no hint
pub fn parse_retry_after(value: &str) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Generic {
            status: None,
            message: format!("failed to write output: {}", err),
        }
    }
}
