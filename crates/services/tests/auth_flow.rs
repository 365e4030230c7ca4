use std::sync::Arc;

use async_trait::async_trait;
use quiz_core::model::{AuthError, ProviderIdentity};
use quiz_core::time::{fixed_clock, fixed_now};
use services::auth::{AuthService, AuthSnapshot, IdentityProvider, ProviderResponse, TokenGrant};
use services::error::AuthFlowError;
use storage::repository::{HostRepository, InMemoryRepository};

struct StubProvider {
    identity: ProviderIdentity,
    expires_in_secs: i64,
}

impl StubProvider {
    fn new() -> Self {
        Self {
            identity: ProviderIdentity {
                twitch_id: "twitch-77".into(),
                login: "quizzer".into(),
                email: Some("quizzer@example.com".into()),
            },
            expires_in_secs: 3_600,
        }
    }
}

#[async_trait]
impl IdentityProvider for StubProvider {
    fn authorize_url(&self, state: &str) -> Result<String, AuthFlowError> {
        Ok(format!("https://id.example.test/authorize?state={state}"))
    }

    async fn exchange_code(
        &self,
        code: &str,
    ) -> Result<(TokenGrant, ProviderIdentity), AuthFlowError> {
        if code == "bad-code" {
            return Err(AuthError::ProviderRejected {
                reason: "invalid authorization code".into(),
            }
            .into());
        }
        Ok((
            TokenGrant {
                access_token: "stub-token".into(),
                expires_in_secs: self.expires_in_secs,
            },
            self.identity.clone(),
        ))
    }
}

fn service_with(provider: StubProvider) -> (AuthService, InMemoryRepository) {
    let repo = InMemoryRepository::new();
    let auth = AuthService::new(fixed_clock(), Arc::new(provider), Arc::new(repo.clone()));
    (auth, repo)
}

#[tokio::test]
async fn login_handshake_creates_session_and_host_record() {
    let (auth, repo) = service_with(StubProvider::new());
    assert_eq!(auth.snapshot(), AuthSnapshot::Absent);
    assert!(auth.current_session().is_none());

    let handshake = auth.begin_login().unwrap();
    assert!(handshake.authorize_url.contains(&handshake.state));
    assert_eq!(auth.snapshot(), AuthSnapshot::Pending);

    let session = auth
        .complete_login(ProviderResponse::success(handshake.state, "good-code"))
        .await
        .unwrap();
    assert_eq!(session.identity().login, "quizzer");
    assert!(session.is_valid(fixed_now()));

    let current = auth.current_session().expect("session present");
    assert_eq!(current.id(), session.id());
    assert!(matches!(auth.snapshot(), AuthSnapshot::LoggedIn { .. }));

    // The host record was created and stamped.
    let host = repo
        .get_host_by_twitch_id("twitch-77")
        .await
        .unwrap()
        .expect("host created");
    assert_eq!(host.username(), "quizzer");
    assert_eq!(host.last_login(), Some(fixed_now()));
}

#[tokio::test]
async fn second_login_reuses_host_record() {
    let (auth, repo) = service_with(StubProvider::new());

    let handshake = auth.begin_login().unwrap();
    auth.complete_login(ProviderResponse::success(handshake.state, "code-1"))
        .await
        .unwrap();
    auth.logout();

    let handshake = auth.begin_login().unwrap();
    auth.complete_login(ProviderResponse::success(handshake.state, "code-2"))
        .await
        .unwrap();

    let host = repo
        .get_host_by_twitch_id("twitch-77")
        .await
        .unwrap()
        .unwrap();
    // Still one account: a fresh insert would have bumped the id.
    assert_eq!(host.id().value(), 1);
}

#[tokio::test]
async fn mismatched_state_never_creates_a_session() {
    let (auth, repo) = service_with(StubProvider::new());
    let _handshake = auth.begin_login().unwrap();

    let err = auth
        .complete_login(ProviderResponse::success("forged-state", "good-code"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthFlowError::Auth(AuthError::InvalidState)));
    assert!(auth.current_session().is_none());

    // No exchange ran, so no host record either.
    assert!(
        repo.get_host_by_twitch_id("twitch-77")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn provider_rejection_drops_back_to_logged_out() {
    let (auth, _repo) = service_with(StubProvider::new());

    let handshake = auth.begin_login().unwrap();
    let err = auth
        .complete_login(ProviderResponse::failure(handshake.state, "access_denied"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthFlowError::Auth(AuthError::ProviderRejected { .. })
    ));
    assert_eq!(auth.snapshot(), AuthSnapshot::Absent);

    // Same for a code the provider refuses at exchange time.
    let handshake = auth.begin_login().unwrap();
    let err = auth
        .complete_login(ProviderResponse::success(handshake.state, "bad-code"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthFlowError::Auth(AuthError::ProviderRejected { .. })
    ));
    assert!(auth.current_session().is_none());
}

#[tokio::test]
async fn complete_login_without_begin_is_invalid_state() {
    let (auth, _repo) = service_with(StubProvider::new());
    let err = auth
        .complete_login(ProviderResponse::success("anything", "code"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthFlowError::Auth(AuthError::InvalidState)));
}

#[tokio::test]
async fn second_begin_login_invalidates_the_first_handshake() {
    let (auth, _repo) = service_with(StubProvider::new());

    let first = auth.begin_login().unwrap();
    let second = auth.begin_login().unwrap();
    assert_ne!(first.state, second.state);

    let err = auth
        .complete_login(ProviderResponse::success(first.state, "good-code"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthFlowError::Auth(AuthError::InvalidState)));

    // The second handshake still completes.
    auth.complete_login(ProviderResponse::success(second.state, "good-code"))
        .await
        .unwrap();
    assert!(auth.current_session().is_some());
}

#[tokio::test]
async fn logout_is_idempotent() {
    let (auth, _repo) = service_with(StubProvider::new());

    // No session: a no-op.
    auth.logout();
    assert!(auth.current_session().is_none());

    let handshake = auth.begin_login().unwrap();
    auth.complete_login(ProviderResponse::success(handshake.state, "good-code"))
        .await
        .unwrap();
    assert!(auth.current_session().is_some());

    auth.logout();
    assert!(auth.current_session().is_none());
    assert_eq!(auth.snapshot(), AuthSnapshot::Absent);

    auth.logout();
    assert!(auth.current_session().is_none());
}

#[tokio::test]
async fn expired_session_reads_as_absent() {
    let provider = StubProvider {
        expires_in_secs: 0,
        ..StubProvider::new()
    };
    let (auth, _repo) = service_with(provider);

    let handshake = auth.begin_login().unwrap();
    auth.complete_login(ProviderResponse::success(handshake.state, "good-code"))
        .await
        .unwrap();

    // expires_at == now, and validity requires now < expires_at.
    assert!(auth.current_session().is_none());
    assert_eq!(auth.snapshot(), AuthSnapshot::Absent);
}
