use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use quiz_core::model::{AuthError, ProviderIdentity};

use super::provider::{IdentityProvider, TokenGrant};
use crate::error::AuthFlowError;

const AUTHORIZE_URL: &str = "https://id.twitch.tv/oauth2/authorize";
const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
const USERS_URL: &str = "https://api.twitch.tv/helix/users";

/// The scope needed to read the account's email alongside its identity.
const SCOPE: &str = "user:read:email";

#[derive(Clone, Debug)]
pub struct TwitchConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

impl TwitchConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let client_id = env::var("QUIZ_TWITCH_CLIENT_ID").ok()?;
        if client_id.trim().is_empty() {
            return None;
        }
        let client_secret = env::var("QUIZ_TWITCH_CLIENT_SECRET").ok()?;
        let redirect_url = env::var("QUIZ_TWITCH_REDIRECT_URL")
            .unwrap_or_else(|_| "http://localhost:8080/auth/callback".into());
        Some(Self {
            client_id,
            client_secret,
            redirect_url,
        })
    }
}

/// Twitch OAuth client: authorize URL, code exchange, user lookup.
#[derive(Clone)]
pub struct TwitchProvider {
    client: Client,
    config: Option<TwitchConfig>,
}

impl TwitchProvider {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(TwitchConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<TwitchConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    fn config(&self) -> Result<&TwitchConfig, AuthFlowError> {
        self.config.as_ref().ok_or(AuthFlowError::Disabled)
    }
}

#[async_trait]
impl IdentityProvider for TwitchProvider {
    fn authorize_url(&self, state: &str) -> Result<String, AuthFlowError> {
        let config = self.config()?;
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &config.client_id)
            .append_pair("redirect_uri", &config.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", SCOPE)
            .append_pair("state", state)
            .finish();
        Ok(format!("{AUTHORIZE_URL}?{query}"))
    }

    async fn exchange_code(
        &self,
        code: &str,
    ) -> Result<(TokenGrant, ProviderIdentity), AuthFlowError> {
        let config = self.config()?;

        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", config.redirect_url.as_str()),
            ])
            .send()
            .await?;

        // Twitch answers 4xx with a message body when it refuses a code.
        if response.status().is_client_error() {
            let reason = response.text().await.unwrap_or_default();
            return Err(AuthError::ProviderRejected { reason }.into());
        }
        if !response.status().is_success() {
            return Err(AuthFlowError::HttpStatus(response.status()));
        }
        let token: TokenResponse = response.json().await?;

        let response = self
            .client
            .get(USERS_URL)
            .bearer_auth(&token.access_token)
            .header("Client-Id", &config.client_id)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AuthFlowError::HttpStatus(response.status()));
        }
        let users: UsersResponse = response.json().await?;
        let user = users.data.into_iter().next().ok_or_else(|| {
            AuthFlowError::from(AuthError::ProviderRejected {
                reason: "user lookup returned no account".into(),
            })
        })?;

        Ok((
            TokenGrant {
                access_token: token.access_token,
                expires_in_secs: token.expires_in,
            },
            ProviderIdentity {
                twitch_id: user.id,
                login: user.login,
                email: user.email,
            },
        ))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct UsersResponse {
    data: Vec<TwitchUser>,
}

#[derive(Debug, Deserialize)]
struct TwitchUser {
    id: String,
    login: String,
    email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> TwitchProvider {
        TwitchProvider::new(Some(TwitchConfig {
            client_id: "abc123".into(),
            client_secret: "shh".into(),
            redirect_url: "http://localhost:8080/auth/callback".into(),
        }))
    }

    #[test]
    fn authorize_url_carries_state_and_client() {
        let provider = configured();
        let url = provider.authorize_url("nonce-xyz").unwrap();
        assert!(url.starts_with("https://id.twitch.tv/oauth2/authorize?"));
        assert!(url.contains("client_id=abc123"));
        assert!(url.contains("state=nonce-xyz"));
        assert!(url.contains("response_type=code"));
        // The secret never appears in the redirect URL.
        assert!(!url.contains("shh"));
    }

    #[test]
    fn unconfigured_provider_is_disabled() {
        let provider = TwitchProvider::new(None);
        assert!(!provider.enabled());
        let err = provider.authorize_url("state").unwrap_err();
        assert!(matches!(err, AuthFlowError::Disabled));
    }
}
