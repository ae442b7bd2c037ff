// Authentication types

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Fixed bearer token handed out when the server runs with local authentication
pub const LOCAL_SENTINEL_TOKEN: &str = "enbuild_local_admin_token";

/// Username/password pair used for the password grant
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::new(password.into().into()),
        }
    }
}

/// Identity provider connection parameters discovered from admin settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProvider {
    /// Backend URL with scheme and without trailing slash
    pub issuer_base_url: String,
    pub realm: String,
    pub client_id: String,
}

impl IdentityProvider {
    /// Token endpoint shared by the password and refresh grants
    pub fn token_url(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.issuer_base_url, self.realm
        )
    }
}

/// Resolved authentication mechanism
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mechanism {
    /// Static sentinel token, no identity provider involved
    Local,

    /// OpenID Connect password grant against a Keycloak-style provider
    OidcPassword(IdentityProvider),
}

impl Mechanism {
    pub fn name(&self) -> &'static str {
        match self {
            Mechanism::Local => "local",
            Mechanism::OidcPassword(_) => "oidc-password",
        }
    }
}

/// Discovery result, fixed for the lifetime of an AuthManager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Key of the admin settings entry the mechanism was taken from
    pub source_entry: String,
    pub mechanism: Mechanism,
}

/// What to do when a refresh grant is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Retry with a full password grant before giving up
    #[default]
    FallbackToPassword,

    /// Surface the refresh failure directly
    FailOnRefreshError,
}

/// OAuth2 grant used for a token exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    Password,
    RefreshToken,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::Password => "password",
            GrantType::RefreshToken => "refresh_token",
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Longest token lifetime accepted from a provider (one year)
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 365 * 24 * 60 * 60;

/// `issued_at + secs`, with `secs` clamped to `0..=MAX_TOKEN_LIFETIME_SECS`
fn expiry_after(issued_at: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
    let secs = secs.clamp(0, MAX_TOKEN_LIFETIME_SECS);
    issued_at
        .checked_add_signed(Duration::seconds(secs))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Cached token pair with buffered expiry
#[derive(Debug, Clone)]
pub struct TokenState {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    /// Provider expiry minus the safety margin
    pub expires_at: DateTime<Utc>,
    /// Absent when the provider did not report a refresh lifetime
    pub refresh_expires_at: Option<DateTime<Utc>>,
}

impl TokenState {
    /// Build the state for a token response received at `issued_at`
    pub fn from_response(
        response: TokenResponse,
        issued_at: DateTime<Utc>,
        margin_secs: i64,
    ) -> Self {
        let ttl = response.expires_in.saturating_sub(margin_secs);
        let refresh_expires_at = match response.refresh_expires_in {
            Some(secs) if secs > 0 => Some(expiry_after(issued_at, secs)),
            _ => None,
        };

        Self {
            access_token: SecretString::new(response.access_token.into()),
            refresh_token: response
                .refresh_token
                .filter(|t| !t.is_empty())
                .map(|t| SecretString::new(t.into())),
            expires_at: expiry_after(issued_at, ttl),
            refresh_expires_at,
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Refresh token usable at `now`, if any
    pub fn usable_refresh_token(&self, now: DateTime<Utc>) -> Option<&str> {
        let token = self.refresh_token.as_ref()?;
        match self.refresh_expires_at {
            Some(exp) if now >= exp => None,
            _ => Some(token.expose_secret()),
        }
    }
}

// ==================================================================================================
// Wire formats
// ==================================================================================================

/// Admin settings response: `data` maps arbitrary keys to settings records
#[derive(Debug, Deserialize)]
pub struct AdminSettingsResponse {
    pub data: Map<String, Value>,
}

/// One admin settings record, only the fields discovery cares about
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSettingEntry {
    #[serde(default)]
    pub auth_mechanism: Option<String>,
    #[serde(default)]
    pub admin_configs: Option<AdminConfigs>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminConfigs {
    #[serde(default)]
    pub keycloak: Option<KeycloakSettings>,
}

#[derive(Debug, Default, Deserialize)]
pub struct KeycloakSettings {
    #[serde(rename = "KEYCLOAK_BACKEND_URL", default)]
    pub backend_url: Option<String>,
    #[serde(rename = "KEYCLOAK_CLIENT_ID", default)]
    pub client_id: Option<String>,
    #[serde(rename = "KEYCLOAK_REALM", default)]
    pub realm: Option<String>,
}

/// Token endpoint response
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub refresh_expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_expires_in", &self.refresh_expires_in)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .finish()
    }
}

/// OAuth2 error body (`error`, `error_description`)
#[derive(Debug, Deserialize)]
pub struct OAuthErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}
