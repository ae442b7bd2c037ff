// Bearer token providers consumed by the request dispatcher

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::manager::AuthManager;
use crate::error::AuthError;

/// Anything that can hand out a bearer token for an outgoing request
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<String, AuthError>;
}

#[async_trait]
impl TokenSource for AuthManager {
    async fn token(&self) -> Result<String, AuthError> {
        self.get_token().await
    }
}

/// Pre-issued API token, sent as-is
#[derive(Debug, Clone)]
pub struct StaticToken(SecretString);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::new(token.into().into()))
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String, AuthError> {
        Ok(self.0.expose_secret().to_string())
    }
}
