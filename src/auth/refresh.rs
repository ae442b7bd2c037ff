// Token acquisition and refresh against the identity provider

use reqwest::Client;
use secrecy::ExposeSecret;

use super::types::{Credentials, GrantType, IdentityProvider, OAuthErrorBody, TokenResponse};
use crate::error::{AuthError, AuthStage};
use crate::utils::mask_token;

/// Exchange username/password for a token pair
pub async fn password_grant(
    client: &Client,
    idp: &IdentityProvider,
    creds: &Credentials,
) -> Result<TokenResponse, AuthError> {
    tracing::info!(
        username = %creds.username,
        client_id = %idp.client_id,
        "Requesting new token via password grant..."
    );

    let form = [
        ("grant_type", GrantType::Password.as_str()),
        ("client_id", idp.client_id.as_str()),
        ("username", creds.username.as_str()),
        ("password", creds.password.expose_secret()),
    ];

    request_token(client, idp, GrantType::Password, &form).await
}

/// Exchange a refresh token for a new token pair
pub async fn refresh_grant(
    client: &Client,
    idp: &IdentityProvider,
    refresh_token: &str,
) -> Result<TokenResponse, AuthError> {
    tracing::info!(
        client_id = %idp.client_id,
        refresh_token = %mask_token(refresh_token),
        "Refreshing token via refresh grant..."
    );

    let form = [
        ("grant_type", GrantType::RefreshToken.as_str()),
        ("client_id", idp.client_id.as_str()),
        ("refresh_token", refresh_token),
    ];

    request_token(client, idp, GrantType::RefreshToken, &form).await
}

async fn request_token(
    client: &Client,
    idp: &IdentityProvider,
    grant: GrantType,
    form: &[(&str, &str)],
) -> Result<TokenResponse, AuthError> {
    let url = idp.token_url();
    tracing::debug!(url = %url, grant = %grant, "Sending token request");

    // Body is form-urlencoded; reqwest sets the Content-Type
    let response = client.post(&url).form(form).send().await.map_err(|e| {
        tracing::warn!(url = %url, grant = %grant, error = %e, "Token request failed");
        AuthError::transport(AuthStage::TokenExchange, &e)
    })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AuthError::transport(AuthStage::TokenExchange, &e))?;

    if !status.is_success() {
        let message = match serde_json::from_str::<OAuthErrorBody>(&body) {
            Ok(err) => match err.error_description {
                Some(desc) => format!("{}: {}", err.error, desc),
                None => err.error,
            },
            Err(_) => body,
        };

        tracing::warn!(
            url = %url,
            grant = %grant,
            status = status.as_u16(),
            error = %message,
            "Identity provider rejected token request"
        );

        return Err(AuthError::TokenExchangeFailed {
            grant,
            status: Some(status.as_u16()),
            message,
        });
    }

    let data: TokenResponse =
        serde_json::from_str(&body).map_err(|e| AuthError::TokenExchangeFailed {
            grant,
            status: Some(status.as_u16()),
            message: format!("failed to decode token response: {}", e),
        })?;

    if data.access_token.is_empty() {
        return Err(AuthError::TokenExchangeFailed {
            grant,
            status: Some(status.as_u16()),
            message: "token response does not contain access_token".to_string(),
        });
    }

    tracing::info!(
        grant = %grant,
        expires_in = data.expires_in,
        token = %mask_token(&data.access_token),
        "Token obtained"
    );

    Ok(data)
}
