// Authentication mechanism discovery from the admin settings endpoint

use reqwest::{Client, StatusCode, Url};

use super::types::{
    AdminConfigs, AdminSettingEntry, AdminSettingsResponse, AuthConfig, IdentityProvider,
    Mechanism,
};
use crate::error::{AuthError, ConfigFailure};

/// Well-known admin settings path, independent of the resource API prefix
pub const ADMIN_SETTINGS_PATH: &str = "/enbuild-user/api/v1/adminSettings";

/// Mechanism names accepted in `authMechanism`
enum MechanismKind {
    Local,
    OidcPassword,
}

fn parse_mechanism_name(name: &str) -> Option<MechanismKind> {
    match name.trim().to_lowercase().as_str() {
        "local" => Some(MechanismKind::Local),
        // "keycloak" is what deployed servers report
        "keycloak" | "oidc-password" => Some(MechanismKind::OidcPassword),
        _ => None,
    }
}

/// Derive the discovery URL: same scheme, host and port as `base_url`
pub fn discovery_url(base_url: &Url) -> Url {
    let mut url = base_url.clone();
    url.set_path(ADMIN_SETTINGS_PATH);
    url.set_query(None);
    url.set_fragment(None);
    url
}

/// Fetch and resolve the authentication configuration
pub async fn fetch_auth_config(client: &Client, url: &Url) -> Result<AuthConfig, AuthError> {
    tracing::debug!(url = %url, "Fetching authentication configuration");

    let unavailable = |reason: ConfigFailure| AuthError::ConfigUnavailable {
        url: url.to_string(),
        reason,
    };

    let response = client.get(url.clone()).send().await.map_err(|e| {
        tracing::error!(url = %url, error = %e, "Admin settings request failed");
        unavailable(ConfigFailure::Transport {
            timed_out: e.is_timeout(),
            message: e.to_string(),
        })
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| {
        unavailable(ConfigFailure::Transport {
            timed_out: e.is_timeout(),
            message: format!("failed to read body: {}", e),
        })
    })?;

    if status != StatusCode::OK {
        tracing::error!(
            url = %url,
            status = status.as_u16(),
            "Admin settings endpoint returned an error"
        );
        return Err(unavailable(ConfigFailure::Status {
            status: status.as_u16(),
            body,
        }));
    }

    let config = parse_admin_settings(url.as_str(), &body)?;

    match &config.mechanism {
        Mechanism::Local => {
            tracing::info!(entry = %config.source_entry, "Using local authentication mechanism")
        }
        Mechanism::OidcPassword(idp) => tracing::info!(
            entry = %config.source_entry,
            issuer = %idp.issuer_base_url,
            realm = %idp.realm,
            client_id = %idp.client_id,
            "Using Keycloak password authentication"
        ),
    }

    Ok(config)
}

/// Select the first entry naming a supported mechanism
///
/// Entries with a missing or unknown `authMechanism` are skipped. An OIDC
/// entry must carry backend URL, realm and client ID; otherwise discovery
/// fails rather than moving on to later entries.
pub fn parse_admin_settings(url: &str, body: &str) -> Result<AuthConfig, AuthError> {
    let settings: AdminSettingsResponse =
        serde_json::from_str(body).map_err(|e| AuthError::ConfigUnavailable {
            url: url.to_string(),
            reason: ConfigFailure::Malformed(e.to_string()),
        })?;

    for (key, raw) in settings.data {
        let entry: AdminSettingEntry = match serde_json::from_value(raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(entry = %key, error = %e, "Skipping unreadable admin settings entry");
                continue;
            }
        };

        let Some(name) = entry.auth_mechanism.as_deref() else {
            continue;
        };

        match parse_mechanism_name(name) {
            Some(MechanismKind::Local) => {
                return Ok(AuthConfig {
                    source_entry: key,
                    mechanism: Mechanism::Local,
                })
            }
            Some(MechanismKind::OidcPassword) => {
                let idp = resolve_identity_provider(&key, entry.admin_configs)?;
                return Ok(AuthConfig {
                    source_entry: key,
                    mechanism: Mechanism::OidcPassword(idp),
                });
            }
            None => {
                tracing::debug!(entry = %key, mechanism = %name, "Ignoring unsupported auth mechanism");
            }
        }
    }

    Err(AuthError::NoUsableMechanism)
}

fn resolve_identity_provider(
    entry: &str,
    configs: Option<AdminConfigs>,
) -> Result<IdentityProvider, AuthError> {
    let keycloak = configs.and_then(|c| c.keycloak).unwrap_or_default();

    let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let backend_url = non_empty(keycloak.backend_url);
    let realm = non_empty(keycloak.realm);
    let client_id = non_empty(keycloak.client_id);

    match (backend_url, realm, client_id) {
        (Some(backend_url), Some(realm), Some(client_id)) => Ok(IdentityProvider {
            issuer_base_url: normalize_backend_url(&backend_url),
            realm,
            client_id,
        }),
        (backend_url, realm, client_id) => {
            let mut missing = Vec::new();
            if backend_url.is_none() {
                missing.push("backend URL");
            }
            if realm.is_none() {
                missing.push("realm");
            }
            if client_id.is_none() {
                missing.push("client ID");
            }
            Err(AuthError::IncompleteConfig {
                entry: entry.to_string(),
                missing,
            })
        }
    }
}

/// Prepend `https://` when the backend URL has no scheme; drop trailing slashes
fn normalize_backend_url(url: &str) -> String {
    let url = url.trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}
