//! HTTP client utilities.
//!
//! Provides the shared HTTP client for all provider adapters and the mapping
//! from transport errors, status codes and structured error bodies to
//! [`ProviderFailure`]. Adapters never look at error message text.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{GatewayError, ProviderFailure, Result};

/// Default per-call deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection establishment timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Structured error codes that mean the account is out of quota or credit.
const QUOTA_CODES: &[&str] = &["insufficient_quota", "RESOURCE_EXHAUSTED", "quota_exceeded"];

/// Build the shared HTTP client.
///
/// No overall request timeout is set here: each call runs under its own
/// deadline (see [`with_deadline`]).
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client() -> Result<Client> {
    ClientBuilder::new()
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(format!("aigate/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))
}

/// Run a provider call under a deadline.
///
/// On expiry the inner future is dropped, which aborts the in-flight request
/// and closes its connection.
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> std::result::Result<T, ProviderFailure>
where
    F: Future<Output = std::result::Result<T, ProviderFailure>>,
{
    tokio::time::timeout(deadline, call)
        .await
        .unwrap_or_else(|_| {
            Err(ProviderFailure::Timeout {
                after_ms: duration_ms(deadline),
            })
        })
}

/// Send a request, mapping transport errors.
pub async fn send(request: RequestBuilder) -> std::result::Result<Response, ProviderFailure> {
    request.send().await.map_err(|e| map_transport_error(&e))
}

/// Send a request and decode a successful JSON body.
pub async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
) -> std::result::Result<T, ProviderFailure> {
    let response = check_status(send(request).await?).await?;
    let body = response.bytes().await.map_err(|e| map_transport_error(&e))?;
    serde_json::from_slice(&body).map_err(|e| ProviderFailure::malformed(format!("invalid JSON: {e}")))
}

/// Send a request and return a successful binary body with its content type.
pub async fn send_bytes(
    request: RequestBuilder,
) -> std::result::Result<(Vec<u8>, Option<String>), ProviderFailure> {
    let response = check_status(send(request).await?).await?;
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());
    let body = response.bytes().await.map_err(|e| map_transport_error(&e))?;
    if body.is_empty() {
        return Err(ProviderFailure::malformed("empty body"));
    }
    Ok((body.to_vec(), content_type))
}

/// Pass successful responses through; classify everything else.
async fn check_status(response: Response) -> std::result::Result<Response, ProviderFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    Err(classify_status(status, &body))
}

/// Map a non-success status and its (possibly empty) body to a failure.
#[must_use]
pub fn classify_status(status: StatusCode, body: &[u8]) -> ProviderFailure {
    let code = status.as_u16();
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return ProviderFailure::Auth { status: code };
    }
    if matches!(status, StatusCode::PAYMENT_REQUIRED | StatusCode::TOO_MANY_REQUESTS)
        || body_has_quota_code(body)
    {
        return ProviderFailure::Quota { status: code };
    }
    if status.is_server_error() {
        return ProviderFailure::Server { status: code };
    }
    ProviderFailure::Rejected { status: code }
}

/// Whether a structured error body carries a quota code.
///
/// Looks at the fields providers use for machine-readable codes:
/// `error.code`, `error.type`, `error.status`, `detail.status`, `err_code`.
fn body_has_quota_code(body: &[u8]) -> bool {
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        return false;
    };
    let candidates = [
        value.pointer("/error/code"),
        value.pointer("/error/type"),
        value.pointer("/error/status"),
        value.pointer("/detail/status"),
        value.pointer("/err_code"),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .any(|code| QUOTA_CODES.contains(&code))
}

/// Map a reqwest transport error.
#[must_use]
pub fn map_transport_error(err: &reqwest::Error) -> ProviderFailure {
    if err.is_timeout() {
        ProviderFailure::Timeout { after_ms: 0 }
    } else if err.is_decode() || err.is_body() {
        ProviderFailure::malformed("response body could not be read")
    } else if err.is_connect() {
        ProviderFailure::Unavailable {
            reason: "connection failed".to_string(),
        }
    } else {
        ProviderFailure::Unavailable {
            reason: "request failed".to_string(),
        }
    }
}

/// Join a base URL and a path without doubling slashes.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
