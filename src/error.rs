// Error handling module
// Defines the authentication and client error taxonomies

use std::time::Duration;
use thiserror::Error;

use crate::auth::GrantType;

/// Stage of the auth lifecycle an error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    Discovery,
    TokenExchange,
}

impl std::fmt::Display for AuthStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthStage::Discovery => f.write_str("discovery"),
            AuthStage::TokenExchange => f.write_str("token exchange"),
        }
    }
}

/// Why the discovery endpoint could not provide a configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigFailure {
    /// Network failure or timeout before any response
    #[error("request failed{}: {message}", timeout_suffix(.timed_out))]
    Transport { timed_out: bool, message: String },

    /// Endpoint answered with a non-200 status
    #[error("endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Body was not a valid admin settings document
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Errors raised by the authentication core
#[derive(Error, Debug, Clone)]
pub enum AuthError {
    /// Discovery endpoint unreachable, non-200 or unparseable
    #[error("Authentication configuration unavailable from {url}: {reason}")]
    ConfigUnavailable { url: String, reason: ConfigFailure },

    /// The selected mechanism lacks required identity provider settings
    #[error("Incomplete identity provider configuration in entry '{entry}': missing {}", .missing.join(", "))]
    IncompleteConfig {
        entry: String,
        missing: Vec<&'static str>,
    },

    /// No admin settings entry names a supported mechanism
    #[error("No usable authentication mechanism found in admin settings")]
    NoUsableMechanism,

    /// Identity provider rejected the grant
    #[error("Token exchange ({grant} grant) failed{}: {message}", status_suffix(.status))]
    TokenExchangeFailed {
        grant: GrantType,
        status: Option<u16>,
        message: String,
    },

    /// Network failure or timeout talking to the identity provider
    #[error("Transport error during {stage}{}: {message}", timeout_suffix(.timed_out))]
    Transport {
        stage: AuthStage,
        timed_out: bool,
        message: String,
    },

    /// Discovery has not completed successfully
    #[error("Authentication manager is not initialized")]
    NotInitialized,

    /// Caller-supplied deadline elapsed
    #[error("Authentication deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

impl AuthError {
    /// Whether retrying the same call later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Transport { .. } | AuthError::DeadlineExceeded(_) => true,
            AuthError::ConfigUnavailable { reason, .. } => match reason {
                ConfigFailure::Transport { .. } => true,
                ConfigFailure::Status { status, .. } => *status == 429 || *status >= 500,
                ConfigFailure::Malformed(_) => false,
            },
            AuthError::TokenExchangeFailed { status, .. } => {
                matches!(status, Some(s) if *s == 429 || *s >= 500)
            }
            _ => false,
        }
    }

    /// Build a transport error from a reqwest failure
    pub(crate) fn transport(stage: AuthStage, err: &reqwest::Error) -> Self {
        AuthError::Transport {
            stage,
            timed_out: err.is_timeout(),
            message: err.to_string(),
        }
    }
}

fn timeout_suffix(timed_out: &bool) -> &'static str {
    if *timed_out {
        " (timed out)"
    } else {
        ""
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|s| format!(" with status {}", s))
        .unwrap_or_default()
}

/// Errors that can occur during ENBUILD client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// Token could not be obtained; the request was never sent
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Server answered with a status outside [200, 300)
    #[error("API error ({status}) at {url}: {message}")]
    Api {
        status: u16,
        url: String,
        message: String,
    },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    /// Base URL or path could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Request arguments were rejected before sending
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Lookup returned no matching resource
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Retry budget exhausted
    #[error("Maximum retries exceeded ({0} attempts)")]
    MaxRetriesExceeded(u32),
}

impl ClientError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Http(_) | ClientError::MaxRetriesExceeded(_) => true,
            ClientError::Api { status, .. } => Self::is_retryable_status(*status),
            ClientError::Auth(e) => e.is_transient(),
            _ => false,
        }
    }

    /// 429 and 5xx are worth retrying; other statuses fail immediately
    pub fn is_retryable_status(status: u16) -> bool {
        status == 429 || (500..=599).contains(&status)
    }

    /// Check if this error indicates an authentication failure
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            ClientError::Auth(_) | ClientError::Api { status: 401, .. }
        )
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
