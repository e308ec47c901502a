use crate::domain_model::*;
use crate::domain_port::*;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// The session could not be restored; the user has to sign in again.
    #[error("session expired")]
    SessionExpired,
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("request cancelled by caller")]
    Cancelled,
}

/// Entry point for API-calling code outside the session core.
#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    /// Restores persisted credentials. Await this before issuing traffic.
    async fn load(&self) -> SessionPhase;

    /// Sends an authenticated request, refreshing credentials at most once.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, SessionError>;

    /// Like [`SessionService::send`] but gives up when `cancel` fires. Only the
    /// caller stops waiting; a shared refresh in flight keeps running.
    async fn send_until(
        &self,
        request: ApiRequest,
        cancel: CancellationToken,
    ) -> Result<ApiResponse, SessionError>;

    /// Seeds the session after an external login.
    async fn update(&self, pair: CredentialPair);

    /// Explicit logout.
    async fn clear(&self);

    fn phase(&self) -> SessionPhase;

    fn snapshot(&self) -> Option<CredentialPair>;

    fn subscribe(&self) -> watch::Receiver<SessionView>;
}
