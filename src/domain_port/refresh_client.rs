use crate::domain_model::*;
use crate::domain_port::TransportError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum RefreshError {
    #[error("no refresh token available")]
    NoRefreshToken,
    #[error("refresh timed out")]
    Timeout,
    #[error("refresh rejected with status {0}")]
    Rejected(u16),
    #[error("malformed refresh response: {0}")]
    Malformed(String),
    #[error("refresh transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("refresh aborted: {0}")]
    Aborted(String),
}

/// Exchanges a refresh token for a new credential pair.
#[async_trait::async_trait]
pub trait RefreshClient: Send + Sync {
    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<CredentialPair, RefreshError>;
}
