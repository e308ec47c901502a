use crate::application_impl::SessionState;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use std::sync::Arc;

/// Result of one dispatched call, with the access token it carried.
#[derive(Debug)]
pub struct Dispatched {
    pub response: ApiResponse,
    pub credential: Option<AccessToken>,
}

/// Single-attempt executor: attaches the current access token and sends.
pub struct RequestDispatcher {
    transport: Arc<dyn Transport>,
    state: Arc<SessionState>,
}

impl RequestDispatcher {
    pub fn new(transport: Arc<dyn Transport>, state: Arc<SessionState>) -> Self {
        Self { transport, state }
    }

    pub async fn execute(&self, request: &ApiRequest) -> Result<Dispatched, TransportError> {
        let credential = self.state.snapshot().map(|pair| pair.access_token);
        let response = self
            .transport
            .execute(request, credential.as_ref())
            .await
            .inspect_err(|e| {
                debug!(method = %request.method, path = %request.path, error = %e, "request failed");
            })?;
        Ok(Dispatched {
            response,
            credential,
        })
    }
}
