use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub location: StoreLocation,
    pub refresh_timeout: Duration,
}

/// Process-wide session facade. Share it behind an `Arc`; there is no global.
pub struct SessionManager {
    state: Arc<SessionState>,
    coordinator: RefreshCoordinator,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn TokenStore>,
        transport: Arc<dyn Transport>,
        refresh_client: Arc<dyn RefreshClient>,
        config: SessionConfig,
    ) -> Self {
        let state = Arc::new(SessionState::new(store, config.location));
        let dispatcher = RequestDispatcher::new(transport, state.clone());
        let coordinator = RefreshCoordinator::new(
            dispatcher,
            state.clone(),
            refresh_client,
            config.refresh_timeout,
        );
        Self { state, coordinator }
    }

    pub fn view(&self) -> SessionView {
        self.state.view()
    }
}

#[async_trait::async_trait]
impl SessionService for SessionManager {
    async fn load(&self) -> SessionPhase {
        let phase = self.state.load().await;
        debug!(%phase, "session loaded");
        phase
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, SessionError> {
        self.coordinator.send_with_auth(&request).await
    }

    async fn send_until(
        &self,
        request: ApiRequest,
        cancel: CancellationToken,
    ) -> Result<ApiResponse, SessionError> {
        tokio::select! {
            result = self.coordinator.send_with_auth(&request) => result,
            _ = cancel.cancelled() => {
                debug!(path = %request.path, "caller stopped waiting");
                Err(SessionError::Cancelled)
            }
        }
    }

    async fn update(&self, pair: CredentialPair) {
        self.state.replace(pair).await;
    }

    async fn clear(&self) {
        self.state.mark_cleared().await;
    }

    fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    fn snapshot(&self) -> Option<CredentialPair> {
        self.state.snapshot()
    }

    fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.state.subscribe()
    }
}
