//! HTTP plumbing shared by the provider clients.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::warn;

use crate::core::config::SourcesConfig;
use crate::sources::error::SourceError;

/// Longest error body excerpt carried in errors.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Retry settings for transient failures.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base delay; attempt `n` waits `n * delay`.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Build the policy from the sources configuration.
    #[must_use]
    pub const fn from_config(config: &SourcesConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Build an HTTP client with the headers both providers expect.
///
/// # Errors
/// Returns an error if the client cannot be constructed.
pub fn build_client(config: &SourcesConfig) -> Result<reqwest::Client, SourceError> {
    let mut headers = HeaderMap::new();

    if let Ok(ua) = HeaderValue::from_str(&config.user_agent) {
        headers.insert(USER_AGENT, ua);
    }

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
        .map_err(|e| SourceError::HttpClient(e.to_string()))
}

/// Send a request, map error statuses, and retry transient failures.
///
/// `make` is called once per attempt because a sent `RequestBuilder` is consumed.
///
/// # Errors
/// Returns the last error once retries are exhausted or the error is not retryable.
pub async fn send_checked<F>(
    service: &'static str,
    retry: RetryPolicy,
    make: F,
) -> Result<reqwest::Response, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt: u32 = 0;
    loop {
        let result = match make().send().await {
            Ok(response) => check_status(service, response).await,
            Err(err) if err.is_timeout() => Err(SourceError::Timeout),
            Err(err) => Err(SourceError::HttpRequest(err)),
        };

        match result {
            Err(err) if err.is_retryable() && attempt < retry.max_retries => {
                attempt += 1;
                let wait = retry.delay * attempt;
                warn!(service, attempt, ?wait, error = %err, "Retrying request");
                tokio::time::sleep(wait).await;
            }
            other => return other,
        }
    }
}

/// Turn non-success statuses into [`SourceError`]s.
///
/// # Errors
/// Returns an error for every non-2xx status.
pub async fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::UNAUTHORIZED {
        return Err(SourceError::AccessDenied(format!(
            "{service} rejected the access token"
        )));
    }

    if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
        if let Some(wait) = rate_limit_wait(response.headers(), chrono::Utc::now().timestamp()) {
            return Err(SourceError::RateLimited(wait));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited(60));
        }
        let body = excerpt(&response.text().await.unwrap_or_default());
        return Err(SourceError::AccessDenied(format!("{service}: {body}")));
    }

    if status == StatusCode::NOT_FOUND {
        return Err(SourceError::NotFound(response.url().path().to_string()));
    }

    let message = excerpt(&response.text().await.unwrap_or_default());
    Err(SourceError::Status {
        service,
        status: status.as_u16(),
        message,
    })
}

/// Seconds to wait according to `Retry-After` or GitHub's rate-limit headers.
fn rate_limit_wait(headers: &HeaderMap, now_epoch: i64) -> Option<u64> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<i64>().ok())
    };

    if let Some(seconds) = header("retry-after") {
        return Some(u64::try_from(seconds).unwrap_or(0).max(1));
    }

    if header("x-ratelimit-remaining") == Some(0) {
        let reset = header("x-ratelimit-reset").unwrap_or(now_epoch + 60);
        return Some(u64::try_from(reset - now_epoch).unwrap_or(0).max(1));
    }

    None
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    out.push_str("...");
    out
}
