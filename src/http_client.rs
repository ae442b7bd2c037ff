// Request dispatcher
// Builds authenticated requests against the API base URL, executes them with
// optional retries and decodes the `data` envelope

use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, Request, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenSource;
use crate::error::{ClientError, Result};
use crate::models::DataEnvelope;
use crate::utils::mask_token;

/// Default base delay for exponential backoff
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Longest single backoff sleep
const MAX_RETRY_DELAY_MS: u64 = 30_000;

/// HTTP dispatcher shared by all resource services
pub struct RequestDispatcher {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// API base URL, always ending in `/`
    base_url: Url,

    user_agent: String,

    /// Log headers and response bodies
    debug: bool,

    /// Supplies the bearer token; `None` sends requests unauthenticated
    token_source: Option<Arc<dyn TokenSource>>,

    /// Retries after the first attempt (0 disables retrying)
    max_retries: u32,

    retry_base_delay: Duration,
}

impl std::fmt::Debug for RequestDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDispatcher")
            .field("base_url", &self.base_url.as_str())
            .field("user_agent", &self.user_agent)
            .field("debug", &self.debug)
            .field("authenticated", &self.token_source.is_some())
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

/// Error body returned by the API for non-2xx responses
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl RequestDispatcher {
    /// Create a dispatcher
    pub fn new(
        base_url: Url,
        user_agent: impl Into<String>,
        request_timeout: Duration,
        token_source: Option<Arc<dyn TokenSource>>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self {
            client,
            base_url,
            user_agent: user_agent.into(),
            debug: false,
            token_source,
            max_retries: 0,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
        })
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Build a request for `path` relative to the base URL
    ///
    /// Asks the token source for a bearer token first. If that fails the
    /// request is never built and the error is returned as `ClientError::Auth`.
    pub async fn new_request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Request> {
        self.new_request_with_query(method, path, &[], body).await
    }

    /// [`new_request`](Self::new_request) with query parameters
    pub async fn new_request_with_query(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Request> {
        let mut url = self.resolve(path)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        let mut builder = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, &self.user_agent);

        // reqwest sets Content-Type: application/json along with the body
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        if let Some(source) = &self.token_source {
            let token = source.token().await.map_err(|e| {
                tracing::error!(error = %e, path = %path, "Token unavailable, request not sent");
                ClientError::Auth(e)
            })?;
            builder = builder.bearer_auth(token);
        }

        builder.build().map_err(ClientError::Http)
    }

    /// Execute a request, classifying non-2xx statuses as `ClientError::Api`
    ///
    /// With `max_retries > 0`, 429/5xx responses and network errors are retried
    /// with exponential backoff.
    pub async fn send(&self, request: Request) -> Result<Response> {
        let method = request.method().clone();
        let url = request.url().clone();
        let mut attempt: u32 = 0;

        tracing::debug!(method = %method, url = %url, "Sending HTTP request");
        if self.debug {
            tracing::debug!(headers = ?masked_headers(request.headers()), "Request headers");
        }

        loop {
            let retryable = attempt < self.max_retries;
            let req = request.try_clone().ok_or_else(|| {
                ClientError::InvalidRequest("request body is not cloneable".to_string())
            })?;

            match self.client.execute(req).await {
                Ok(response) => {
                    let status = response.status();
                    tracing::debug!(status = %status, attempt = attempt + 1, "Received HTTP response");

                    if status.is_success() {
                        return Ok(response);
                    }

                    if retryable && ClientError::is_retryable_status(status.as_u16()) {
                        let delay = self.backoff_delay(attempt);
                        tracing::warn!(
                            "Received {}, retrying after {}ms (attempt {}/{})",
                            status,
                            delay.as_millis(),
                            attempt + 1,
                            self.max_retries
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    let body = response.text().await.unwrap_or_default();
                    let message = error_message(&body, status.canonical_reason());

                    tracing::error!(
                        status = status.as_u16(),
                        url = %url,
                        error = %message,
                        attempt = attempt + 1,
                        "HTTP request failed with error response"
                    );

                    return Err(ClientError::Api {
                        status: status.as_u16(),
                        url: url.to_string(),
                        message,
                    });
                }

                Err(e) => {
                    let error_kind = if e.is_timeout() {
                        "timeout"
                    } else if e.is_connect() {
                        "connection_failed"
                    } else if e.is_request() {
                        "request_error"
                    } else {
                        "unknown"
                    };

                    if retryable {
                        let delay = self.backoff_delay(attempt);
                        tracing::warn!(
                            error_kind = error_kind,
                            error = %e,
                            url = %url,
                            "Request failed, retrying after {}ms (attempt {}/{})",
                            delay.as_millis(),
                            attempt + 1,
                            self.max_retries
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    tracing::error!(
                        error_kind = error_kind,
                        error = %e,
                        url = %url,
                        total_attempts = attempt + 1,
                        "HTTP request failed"
                    );

                    if attempt > 0 {
                        return Err(ClientError::MaxRetriesExceeded(attempt + 1));
                    }
                    return Err(ClientError::Http(e));
                }
            }
        }
    }

    /// Execute and decode the `data` field of the response envelope
    pub async fn execute<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        let envelope: DataEnvelope<T> = self.execute_raw(request).await?;
        Ok(envelope.data)
    }

    /// Execute and decode the whole response body
    pub async fn execute_raw<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        let url = request.url().to_string();
        let response = self.send(request).await?;
        let body = response.text().await.map_err(ClientError::Http)?;

        if self.debug {
            tracing::debug!(url = %url, body = %body, "Response body");
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Failed to decode response");
            ClientError::InvalidResponse(format!("{} (from {})", e, url))
        })
    }

    /// Join a relative path onto the base URL without escaping the API prefix
    fn resolve(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Exponential backoff: base_delay * 2^attempt, capped
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.retry_base_delay.as_millis() as u64;
        let delay = base.saturating_mul(2_u64.saturating_pow(attempt));
        Duration::from_millis(delay.min(MAX_RETRY_DELAY_MS))
    }
}

/// Serialize a request body
pub fn json_body<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| ClientError::InvalidRequest(format!("failed to encode body: {}", e)))
}

/// Render headers for logging with the bearer token masked
fn masked_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = value.to_str().unwrap_or("<binary>");
            let shown = if *name == AUTHORIZATION {
                match value.strip_prefix("Bearer ") {
                    Some(token) => format!("Bearer {}", mask_token(token)),
                    None => mask_token(value),
                }
            } else {
                value.to_string()
            };
            (name.to_string(), shown)
        })
        .collect()
}

/// Pull a readable message out of an error body
fn error_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(err) = serde_json::from_str::<ApiErrorBody>(body) {
        let message = match err.message {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            Some(Value::Array(items)) if !items.is_empty() => Some(
                items
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            _ => None,
        };

        if let Some(message) = message.or(err.error.filter(|e| !e.is_empty())) {
            return message;
        }
    }

    if !body.trim().is_empty() {
        return body.trim().to_string();
    }

    reason.unwrap_or("unknown error").to_string()
}
