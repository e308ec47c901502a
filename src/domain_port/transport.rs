use crate::domain_model::*;

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
}

/// Performs exactly one outbound call. No retry, no session awareness.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// `bearer` is the access token to send as `Authorization: Bearer <token>`.
    async fn execute(
        &self,
        request: &ApiRequest,
        bearer: Option<&AccessToken>,
    ) -> Result<ApiResponse, TransportError>;
}
