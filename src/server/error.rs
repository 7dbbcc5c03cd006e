//! Mapping of internal errors to JSON error responses.

use axum::Json;
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use crate::core::errors::HubError;
use crate::sources::error::SourceError;

/// Error returned by every handler; renders as `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    retry_after: Option<u64>,
}

impl ApiError {
    /// Error with an explicit status.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    /// 400.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 401.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// Response status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Response message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<SourceError> for ApiError {
    fn from(err: SourceError) -> Self {
        let status = match &err {
            SourceError::InvalidRepositoryUrl(_) | SourceError::UnsupportedMimeType(_) => {
                StatusCode::BAD_REQUEST
            }
            SourceError::AccessDenied(_) => StatusCode::UNAUTHORIZED,
            SourceError::NotFound(_) => StatusCode::NOT_FOUND,
            SourceError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            SourceError::HttpRequest(_)
            | SourceError::Status { .. }
            | SourceError::JsonParse(_)
            | SourceError::Timeout => StatusCode::BAD_GATEWAY,
            SourceError::HttpClient(_)
            | SourceError::InvalidUrl(_)
            | SourceError::Archive(_)
            | SourceError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let retry_after = match &err {
            SourceError::RateLimited(seconds) => Some(*seconds),
            _ => None,
        };
        Self {
            status,
            message: err.to_string(),
            retry_after,
        }
    }
}

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        let status = match err {
            HubError::Source(source) => return source.into(),
            HubError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            HubError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            HubError::NotFound(_) => StatusCode::NOT_FOUND,
            HubError::Upstream { .. }
            | HubError::Http(_)
            | HubError::Embedding(_)
            | HubError::HttpClient(_)
            | HubError::DimensionMismatch { .. } => StatusCode::BAD_GATEWAY,
            HubError::InvalidConfig(_)
            | HubError::Sqlite(_)
            | HubError::TokioSqlite(_)
            | HubError::Serialization(_)
            | HubError::Url(_)
            | HubError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.message, "Request failed");
        } else {
            warn!(status = %self.status, error = %self.message, "Request rejected");
        }

        let body = Json(serde_json::json!({
            "error": self.message,
        }));
        let mut response = (self.status, body).into_response();
        if let Some(seconds) = self.retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}

/// Handler result.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (HubError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (HubError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (HubError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                HubError::Upstream {
                    service: "Pinecone",
                    status: 500,
                    message: String::new(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (HubError::InvalidConfig("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                HubError::Source(SourceError::RateLimited(30)),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                HubError::Source(SourceError::InvalidRepositoryUrl("u".into())),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[tokio::test]
    async fn test_body_and_retry_after() {
        let response = ApiError::from(SourceError::RateLimited(42)).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "42");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Rate limit exceeded, retry after 42 seconds");
    }
}
