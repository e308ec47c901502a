use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_http::DEFAULT_REFRESH_PATH;
use crate::logger::*;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FakeRefreshMode {
    /// Accepts the current refresh token and rotates both tokens.
    Rotate,
    /// Answers every refresh with 401.
    Reject,
    /// Fails every refresh at the transport level.
    NetworkError,
    /// Never answers.
    Hang,
}

struct FakeApiState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    generation: u32,
    mode: FakeRefreshMode,
    reject_all: bool,
    bearers: Vec<Option<String>>,
}

/// In-process stand-in for the dashboard API.
///
/// Ordinary paths answer 200 when the bearer matches the current access token
/// and 401 otherwise. The refresh path issues `at<n>` / `rt<n>` pairs.
pub struct FakeApiTransport {
    subject: String,
    refresh_delay: Duration,
    state: Mutex<FakeApiState>,
    refresh_calls: AtomicUsize,
    api_calls: AtomicUsize,
}

impl FakeApiTransport {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            refresh_delay: Duration::ZERO,
            state: Mutex::new(FakeApiState {
                access_token: None,
                refresh_token: None,
                generation: 0,
                mode: FakeRefreshMode::Rotate,
                reject_all: false,
                bearers: Vec::new(),
            }),
            refresh_calls: AtomicUsize::new(0),
            api_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    fn state(&self) -> MutexGuard<'_, FakeApiState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulates a login: issues and accepts the next pair.
    pub fn issue(&self) -> CredentialPair {
        let mut state = self.state();
        state.generation += 1;
        let access = format!("at{}", state.generation);
        let refresh = format!("rt{}", state.generation);
        state.access_token = Some(access.clone());
        state.refresh_token = Some(refresh.clone());
        CredentialPair::new(access, refresh, self.subject.clone())
    }

    /// Accepts `token` for the next refresh; the pair issued then is `generation + 1`.
    pub fn accept_refresh_token(&self, token: impl Into<String>, generation: u32) {
        let mut state = self.state();
        state.refresh_token = Some(token.into());
        state.generation = generation;
    }

    pub fn expire_access_token(&self) {
        self.state().access_token = None;
    }

    pub fn set_refresh_mode(&self, mode: FakeRefreshMode) {
        self.state().mode = mode;
    }

    /// Answers 401 to every ordinary request, whatever the bearer.
    pub fn set_reject_all(&self, reject_all: bool) {
        self.state().reject_all = reject_all;
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn api_calls(&self) -> usize {
        self.api_calls.load(Ordering::SeqCst)
    }

    /// Bearer tokens seen on ordinary requests, in arrival order.
    pub fn bearers(&self) -> Vec<Option<String>> {
        self.state().bearers.clone()
    }

    async fn handle_refresh(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let mode = self.state().mode;
        if mode == FakeRefreshMode::Hang {
            std::future::pending::<()>().await;
        }
        if !self.refresh_delay.is_zero() {
            tokio::time::sleep(self.refresh_delay).await;
        }

        match mode {
            FakeRefreshMode::NetworkError => {
                return Err(TransportError::Network("connection reset".to_string()));
            }
            FakeRefreshMode::Reject => {
                return Ok(unauthorized());
            }
            FakeRefreshMode::Rotate | FakeRefreshMode::Hang => {}
        }

        let presented = request
            .body
            .as_ref()
            .and_then(|body| body.get("refresh_token"))
            .and_then(|token| token.as_str())
            .map(str::to_string);

        let mut state = self.state();
        if presented.is_none() || presented != state.refresh_token {
            debug!("fake api: unknown refresh token");
            return Ok(unauthorized());
        }
        state.generation += 1;
        let access = format!("at{}", state.generation);
        let refresh = format!("rt{}", state.generation);
        state.access_token = Some(access.clone());
        state.refresh_token = Some(refresh.clone());

        let body = json!({
            "status": 200,
            "data": {
                "access_token": access,
                "refresh_token": refresh,
                "_id": self.subject,
            }
        });
        Ok(ApiResponse::new(200, body.to_string()))
    }

    fn handle_api(&self, request: &ApiRequest, bearer: Option<&AccessToken>) -> ApiResponse {
        self.api_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        let presented = bearer.map(|token| token.as_str().to_string());
        state.bearers.push(presented.clone());

        if state.reject_all || presented.is_none() || presented != state.access_token {
            return unauthorized();
        }
        let body = json!({
            "status": 200,
            "data": { "path": request.path, "_id": self.subject },
        });
        ApiResponse::new(200, body.to_string())
    }
}

fn unauthorized() -> ApiResponse {
    let body = json!({ "status": 401, "message": "Unauthorized" });
    ApiResponse::new(401, body.to_string())
}

#[async_trait::async_trait]
impl Transport for FakeApiTransport {
    async fn execute(
        &self,
        request: &ApiRequest,
        bearer: Option<&AccessToken>,
    ) -> Result<ApiResponse, TransportError> {
        if request.path == DEFAULT_REFRESH_PATH {
            self.handle_refresh(request).await
        } else {
            Ok(self.handle_api(request, bearer))
        }
    }
}
