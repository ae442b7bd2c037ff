use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use secrecy::ExposeSecret;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell, RwLock};

use super::clock::{Clock, SystemClock};
use super::discovery;
use super::refresh;
use super::types::{
    AuthConfig, Credentials, IdentityProvider, Mechanism, RefreshPolicy, TokenState,
    LOCAL_SENTINEL_TOKEN,
};
use crate::error::{AuthError, ClientError, Result};

/// Default timeout for discovery and token exchanges
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Seconds subtracted from the provider-reported token lifetime
pub const DEFAULT_EXPIRY_MARGIN_SECS: i64 = 30;

/// Last completed renewal, guarded by the renewal lock
#[derive(Debug, Default)]
struct RenewalSlot {
    /// Number of completed renewal attempts
    attempt: u64,
    /// Error of the last attempt, `None` after a success
    last_error: Option<AuthError>,
}

/// Authentication manager
/// Discovers the auth mechanism once, then issues and renews bearer tokens
///
/// Renewal is single-flight: the first caller to find the token missing or
/// expired performs the exchange while concurrent callers wait on the
/// renewal lock and reuse its outcome, success or failure.
pub struct AuthManager {
    /// Admin settings endpoint derived from the API base URL
    discovery_url: Url,

    /// Username/password for the password grant
    credentials: Credentials,

    /// HTTP client for discovery and token requests (bounded timeout)
    client: Client,

    clock: Arc<dyn Clock>,

    refresh_policy: RefreshPolicy,

    expiry_margin_secs: i64,

    /// Set once by a successful discovery
    config: OnceCell<AuthConfig>,

    /// Current token pair, replaced wholesale on every exchange
    state: RwLock<Option<TokenState>>,

    /// Held for the duration of a renewal exchange
    renewal: Mutex<RenewalSlot>,

    /// Mirror of `RenewalSlot::attempt`, readable without the lock
    completed_renewals: AtomicU64,
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("discovery_url", &self.discovery_url.as_str())
            .field("credentials", &self.credentials)
            .field("refresh_policy", &self.refresh_policy)
            .field("expiry_margin_secs", &self.expiry_margin_secs)
            .field("config", &self.config.get())
            .finish_non_exhaustive()
    }
}

/// Builder for [`AuthManager`]
pub struct AuthManagerBuilder {
    base_url: Url,
    credentials: Credentials,
    timeout: Duration,
    refresh_policy: RefreshPolicy,
    expiry_margin_secs: i64,
    clock: Arc<dyn Clock>,
}

impl AuthManagerBuilder {
    /// Timeout applied to each discovery or token request
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.refresh_policy = policy;
        self
    }

    /// Safety margin subtracted from `expires_in`
    pub fn expiry_margin_secs(mut self, secs: i64) -> Self {
        self.expiry_margin_secs = secs.max(0);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> Result<AuthManager> {
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(ClientError::Http)?;

        Ok(AuthManager {
            discovery_url: discovery::discovery_url(&self.base_url),
            credentials: self.credentials,
            client,
            clock: self.clock,
            refresh_policy: self.refresh_policy,
            expiry_margin_secs: self.expiry_margin_secs,
            config: OnceCell::new(),
            state: RwLock::new(None),
            renewal: Mutex::new(RenewalSlot::default()),
            completed_renewals: AtomicU64::new(0),
        })
    }
}

impl AuthManager {
    /// Start building a manager for the API at `base_url`
    pub fn builder(base_url: Url, credentials: Credentials) -> AuthManagerBuilder {
        AuthManagerBuilder {
            base_url,
            credentials,
            timeout: DEFAULT_AUTH_TIMEOUT,
            refresh_policy: RefreshPolicy::default(),
            expiry_margin_secs: DEFAULT_EXPIRY_MARGIN_SECS,
            clock: Arc::new(SystemClock),
        }
    }

    /// Create a manager with default settings
    pub fn new(base_url: Url, credentials: Credentials) -> Result<Self> {
        Self::builder(base_url, credentials).build()
    }

    /// Discover the authentication mechanism
    ///
    /// Runs discovery at most once successfully; later calls are no-ops.
    /// After a failure the manager stays unusable until this is called again.
    pub async fn initialize(&self) -> std::result::Result<(), AuthError> {
        if self.config.initialized() {
            return Ok(());
        }

        tracing::debug!(username = %self.credentials.username, "Initializing authentication");

        self.config
            .get_or_try_init(|| discovery::fetch_auth_config(&self.client, &self.discovery_url))
            .await?;

        Ok(())
    }

    /// [`initialize`](Self::initialize) bounded by a caller deadline
    pub async fn initialize_within(&self, limit: Duration) -> std::result::Result<(), AuthError> {
        tokio::time::timeout(limit, self.initialize())
            .await
            .map_err(|_| {
                tracing::warn!(?limit, "Authentication discovery deadline exceeded");
                AuthError::DeadlineExceeded(limit)
            })?
    }

    /// Get a valid access token, renewing it if necessary
    /// Safe to call from many tasks at once
    pub async fn get_token(&self) -> std::result::Result<String, AuthError> {
        let config = self.config.get().ok_or(AuthError::NotInitialized)?;

        let idp = match &config.mechanism {
            Mechanism::Local => return Ok(LOCAL_SENTINEL_TOKEN.to_string()),
            Mechanism::OidcPassword(idp) => idp,
        };

        let seen = self.completed_renewals.load(Ordering::Acquire);

        if let Some(token) = self.cached_token().await {
            return Ok(token);
        }

        let mut slot = self.renewal.lock().await;

        // Another caller may have renewed while we waited for the lock
        if let Some(token) = self.cached_token().await {
            tracing::debug!("Token was renewed by a concurrent caller");
            return Ok(token);
        }

        // An attempt finished while we waited and failed; share its error
        if slot.attempt != seen {
            if let Some(err) = &slot.last_error {
                tracing::debug!(error = %err, "Concurrent renewal failed, not retrying");
                return Err(err.clone());
            }
        }

        let outcome = self.renew(idp).await;
        slot.attempt += 1;
        self.completed_renewals.store(slot.attempt, Ordering::Release);

        let fresh = match outcome {
            Ok(fresh) => fresh,
            Err(e) => {
                slot.last_error = Some(e.clone());
                return Err(e);
            }
        };
        slot.last_error = None;
        let token = fresh.access_token.expose_secret().to_string();

        {
            let mut state = self.state.write().await;
            *state = Some(fresh);
        }

        Ok(token)
    }

    /// [`get_token`](Self::get_token) bounded by a caller deadline
    ///
    /// An exchange still in flight when the deadline passes is abandoned and
    /// the cached token state is left untouched.
    pub async fn get_token_within(&self, limit: Duration) -> std::result::Result<String, AuthError> {
        tokio::time::timeout(limit, self.get_token())
            .await
            .map_err(|_| {
                tracing::warn!(?limit, "Token acquisition deadline exceeded");
                AuthError::DeadlineExceeded(limit)
            })?
    }

    /// Check if discovery has completed
    pub fn is_initialized(&self) -> bool {
        self.config.initialized()
    }

    /// Discovered mechanism, if initialized
    pub fn mechanism(&self) -> Option<&Mechanism> {
        self.config.get().map(|c| &c.mechanism)
    }

    /// Check if a cached token is currently valid (always true for local auth)
    pub async fn has_valid_token(&self) -> bool {
        match self.mechanism() {
            Some(Mechanism::Local) => true,
            Some(Mechanism::OidcPassword(_)) => self.cached_token().await.is_some(),
            None => false,
        }
    }

    /// Buffered expiry of the cached token, valid or stale
    pub async fn token_expires_at(&self) -> Option<DateTime<Utc>> {
        let state = self.state.read().await;
        state.as_ref().map(|s| s.expires_at)
    }

    async fn cached_token(&self) -> Option<String> {
        let now = self.clock.now();
        let state = self.state.read().await;
        state
            .as_ref()
            .filter(|s| s.is_valid_at(now))
            .map(|s| s.access_token.expose_secret().to_string())
    }

    /// Perform the exchange; caller holds the renewal lock
    async fn renew(&self, idp: &IdentityProvider) -> std::result::Result<TokenState, AuthError> {
        let refresh_token = {
            let now = self.clock.now();
            let state = self.state.read().await;
            state
                .as_ref()
                .and_then(|s| s.usable_refresh_token(now))
                .map(str::to_string)
        };

        let response = match refresh_token {
            Some(refresh_token) => {
                tracing::debug!("Token expired, refreshing...");
                match refresh::refresh_grant(&self.client, idp, &refresh_token).await {
                    Ok(response) => response,
                    Err(e) if self.refresh_policy == RefreshPolicy::FallbackToPassword => {
                        tracing::warn!(
                            error = %e,
                            "Refresh grant failed, falling back to password grant"
                        );
                        refresh::password_grant(&self.client, idp, &self.credentials)
                            .await
                            .inspect_err(|e| tracing::error!("Password grant failed: {}", e))?
                    }
                    Err(e) => {
                        tracing::error!("Token refresh failed: {}", e);
                        return Err(e);
                    }
                }
            }
            None => refresh::password_grant(&self.client, idp, &self.credentials)
                .await
                .inspect_err(|e| tracing::error!("Password grant failed: {}", e))?,
        };

        let state = TokenState::from_response(response, self.clock.now(), self.expiry_margin_secs);
        tracing::info!(expires_at = %state.expires_at.to_rfc3339(), "Token cached");

        Ok(state)
    }
}
