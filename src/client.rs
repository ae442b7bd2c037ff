// ENBUILD client
// Wires the auth strategy, the request dispatcher and the resource services

use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{
    AuthManager, Clock, Credentials, Mechanism, RefreshPolicy, StaticToken, TokenSource,
    DEFAULT_AUTH_TIMEOUT,
};
use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::http_client::RequestDispatcher;
use crate::services::{
    AdminSettingsService, AuthLocalService, CatalogsService, ManifestsService, MlDatasetService,
    OperationsService, RepositoryService, RolesService, UsersService,
};

/// Default ENBUILD deployment
pub const DEFAULT_BASE_URL: &str = "https://enbuild.vivplatform.io";

/// Resource API prefix appended to the base URL
pub const API_PREFIX: &str = "/enbuild-bk/api/v1/";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How the client authenticates its requests
#[derive(Debug, Clone)]
pub enum AuthStrategy {
    /// Pre-issued bearer token sent as-is
    ApiToken(SecretString),

    /// Username/password driven AuthManager with mechanism discovery
    Password(Credentials),
}

impl AuthStrategy {
    pub fn api_token(token: impl Into<String>) -> Self {
        AuthStrategy::ApiToken(SecretString::new(token.into().into()))
    }

    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        AuthStrategy::Password(Credentials::new(username, password))
    }
}

/// Builder for [`EnbuildClient`]
pub struct ClientBuilder {
    base_url: String,
    timeout: Duration,
    debug: bool,
    user_agent: String,
    auth: Option<AuthStrategy>,
    auth_timeout: Duration,
    max_retries: u32,
    refresh_policy: RefreshPolicy,
    clock: Option<Arc<dyn Clock>>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            debug: false,
            user_agent: format!("enbuild-sdk-rust/{}", env!("CARGO_PKG_VERSION")),
            auth: None,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            max_retries: 0,
            refresh_policy: RefreshPolicy::default(),
            clock: None,
        }
    }

    /// Start from loaded CLI/environment configuration
    pub fn from_config(config: &Config) -> Self {
        let auth = match (&config.api_token, &config.username, &config.password) {
            (Some(token), _, _) => Some(AuthStrategy::ApiToken(token.clone())),
            (None, Some(username), Some(password)) => Some(AuthStrategy::Password(Credentials {
                username: username.clone(),
                password: password.clone(),
            })),
            _ => None,
        };

        let mut builder = Self::new()
            .base_url(config.base_url.clone())
            .timeout(Duration::from_secs(config.http_request_timeout))
            .auth_timeout(Duration::from_secs(config.auth_timeout))
            .max_retries(config.http_max_retries)
            .debug(config.debug);
        builder.auth = auth;
        builder
    }

    /// Base URL of the deployment; `/enbuild-bk/api/v1/` is appended when missing
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn auth(mut self, strategy: AuthStrategy) -> Self {
        self.auth = Some(strategy);
        self
    }

    /// Timeout for discovery and token exchanges
    pub fn auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.refresh_policy = policy;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the client
    ///
    /// With password auth this runs mechanism discovery; the first token is
    /// acquired on the first request.
    pub async fn build(self) -> Result<EnbuildClient> {
        let base_url = normalize_base_url(&self.base_url)?;
        tracing::debug!(base_url = %base_url, "Building ENBUILD client");

        let (token_source, auth_manager): (Option<Arc<dyn TokenSource>>, _) = match self.auth {
            Some(AuthStrategy::ApiToken(token)) => (
                Some(Arc::new(StaticToken::new(token.expose_secret())) as Arc<dyn TokenSource>),
                None,
            ),
            Some(AuthStrategy::Password(credentials)) => {
                let mut builder = AuthManager::builder(base_url.clone(), credentials)
                    .timeout(self.auth_timeout)
                    .refresh_policy(self.refresh_policy);
                if let Some(clock) = self.clock {
                    builder = builder.clock(clock);
                }

                let manager = Arc::new(builder.build()?);
                manager.initialize().await?;
                (Some(manager.clone() as Arc<dyn TokenSource>), Some(manager))
            }
            None => {
                tracing::warn!("No authentication configured, requests are sent without a token");
                (None, None)
            }
        };

        let dispatcher = RequestDispatcher::new(base_url, self.user_agent, self.timeout, token_source)?
            .with_debug(self.debug)
            .with_max_retries(self.max_retries);

        Ok(EnbuildClient {
            dispatcher,
            auth_manager,
        })
    }
}

/// Typed client for the ENBUILD API
#[derive(Debug)]
pub struct EnbuildClient {
    dispatcher: RequestDispatcher,
    auth_manager: Option<Arc<AuthManager>>,
}

impl EnbuildClient {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    /// AuthManager behind password authentication
    pub fn auth_manager(&self) -> Option<&Arc<AuthManager>> {
        self.auth_manager.as_ref()
    }

    /// Discovered mechanism, `None` for API-token or unauthenticated clients
    pub fn mechanism(&self) -> Option<&Mechanism> {
        self.auth_manager.as_ref().and_then(|m| m.mechanism())
    }

    pub fn users(&self) -> UsersService<'_> {
        UsersService::new(&self.dispatcher)
    }

    pub fn roles(&self) -> RolesService<'_> {
        RolesService::new(&self.dispatcher)
    }

    pub fn operations(&self) -> OperationsService<'_> {
        OperationsService::new(&self.dispatcher)
    }

    pub fn repository(&self) -> RepositoryService<'_> {
        RepositoryService::new(&self.dispatcher)
    }

    pub fn ml_dataset(&self) -> MlDatasetService<'_> {
        MlDatasetService::new(&self.dispatcher)
    }

    pub fn admin_settings(&self) -> AdminSettingsService<'_> {
        AdminSettingsService::new(&self.dispatcher)
    }

    pub fn auth_local(&self) -> AuthLocalService<'_> {
        AuthLocalService::new(&self.dispatcher)
    }

    pub fn manifests(&self) -> ManifestsService<'_> {
        ManifestsService::new(&self.dispatcher)
    }

    pub fn catalogs(&self) -> CatalogsService<'_> {
        CatalogsService::new(&self.dispatcher)
    }
}

/// Parse the base URL and make sure it ends in the API prefix
///
/// `https://host` and `https://host/enbuild-bk` both become
/// `https://host/enbuild-bk/api/v1/`.
pub fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ClientError::InvalidUrl(format!(
            "{}: scheme must be http or https",
            raw
        )));
    }

    let path = url.path().trim_end_matches('/').to_string();
    let prefix = API_PREFIX.trim_end_matches('/');
    let path = if path.ends_with(prefix) || path.ends_with("/api/v1") {
        path
    } else if path.ends_with("/enbuild-bk") {
        format!("{}/api/v1", path)
    } else {
        format!("{}{}", path, prefix)
    };

    url.set_path(&format!("{}/", path));
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
