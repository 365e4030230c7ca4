use async_trait::async_trait;
use std::fmt;

use quiz_core::model::ProviderIdentity;

use crate::error::AuthFlowError;

/// Token material returned by a successful code exchange.
#[derive(Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_in_secs: i64,
}

// Token must not leak into logs.
impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field("expires_in_secs", &self.expires_in_secs)
            .finish()
    }
}

/// Seam to the external identity provider.
///
/// The production implementation talks to Twitch; tests substitute a stub
/// so login flows run without the network.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authorization URL the UI navigates to, carrying the anti-forgery
    /// state value.
    ///
    /// # Errors
    ///
    /// Returns `AuthFlowError::Disabled` when no provider is configured.
    fn authorize_url(&self, state: &str) -> Result<String, AuthFlowError>;

    /// Exchange the callback code for a token grant and the account's
    /// identity.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ProviderRejected` (wrapped) when the provider
    /// refuses the code, transport errors otherwise.
    async fn exchange_code(
        &self,
        code: &str,
    ) -> Result<(TokenGrant, ProviderIdentity), AuthFlowError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_grant_debug_redacts_token() {
        let grant = TokenGrant {
            access_token: "very-secret".into(),
            expires_in_secs: 3_600,
        };
        let rendered = format!("{grant:?}");
        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
