use crate::application_impl::{RequestDispatcher, SessionState};
use crate::application_port::SessionError;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use nanoid::nanoid;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub type RefreshResult = Result<CredentialPair, RefreshError>;

type RefreshFlight = Shared<BoxFuture<'static, RefreshResult>>;

struct InFlight {
    id: String,
    flight: RefreshFlight,
}

/// Turns concurrent expiry signals into a single refresh call and replays
/// each expired request at most once.
///
/// The refresh runs in its own task. A caller that stops waiting drops only
/// its clone of the shared flight; the task still runs to completion and
/// every other waiter receives the same result.
///
/// The task empties the `in_flight` slot before the shared result reaches
/// any waiter. A 401 that arrives after that point starts a new flight
/// unless its credential is already stale, in which case the caller just
/// replays with the rotated token.
pub struct RefreshCoordinator {
    dispatcher: RequestDispatcher,
    state: Arc<SessionState>,
    refresh_client: Arc<dyn RefreshClient>,
    refresh_timeout: Duration,
    in_flight: Arc<Mutex<Option<InFlight>>>,
}

impl RefreshCoordinator {
    pub fn new(
        dispatcher: RequestDispatcher,
        state: Arc<SessionState>,
        refresh_client: Arc<dyn RefreshClient>,
        refresh_timeout: Duration,
    ) -> Self {
        Self {
            dispatcher,
            state,
            refresh_client,
            refresh_timeout,
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn send_with_auth(&self, request: &ApiRequest) -> Result<ApiResponse, SessionError> {
        let first = self.dispatcher.execute(request).await?;
        if !first.response.is_unauthorized() {
            return Ok(first.response);
        }

        let current = self.state.snapshot().map(|pair| pair.access_token);
        let rotated = current.is_some() && current != first.credential;
        if rotated {
            debug!(path = %request.path, "credential rotated while request was in flight");
        } else if let Err(e) = self.refresh_once().await {
            warn!(path = %request.path, error = %e, "session could not be refreshed");
            return Err(SessionError::SessionExpired);
        }

        // Exactly one replay. Whatever comes back, 401 included, is final.
        let retry = self.dispatcher.execute(request).await?;
        if retry.response.is_unauthorized() {
            warn!(path = %request.path, "request still unauthorized after refresh");
        }
        Ok(retry.response)
    }

    /// Joins the refresh in flight, or starts one if there is none.
    pub async fn refresh_once(&self) -> RefreshResult {
        let flight = {
            let mut slot = self.in_flight.lock().await;
            match slot.as_ref() {
                Some(current) => {
                    debug!(flight = %current.id, "joining refresh in flight");
                    current.flight.clone()
                }
                None => {
                    let id = nanoid!(8);
                    let flight = self.start_flight(id.clone());
                    *slot = Some(InFlight {
                        id,
                        flight: flight.clone(),
                    });
                    flight
                }
            }
        };
        flight.await
    }

    pub async fn is_refreshing(&self) -> bool {
        self.in_flight.lock().await.is_some()
    }

    fn start_flight(&self, id: String) -> RefreshFlight {
        let state = self.state.clone();
        let client = self.refresh_client.clone();
        let timeout = self.refresh_timeout;
        let in_flight = self.in_flight.clone();
        let flight_id = id.clone();

        let handle = tokio::spawn(async move {
            let result = run_refresh(&flight_id, &state, client.as_ref(), timeout).await;
            let mut slot = in_flight.lock().await;
            if slot.as_ref().is_some_and(|current| current.id == flight_id) {
                *slot = None;
            }
            result
        });

        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(RefreshError::Aborted(e.to_string())))
        }
        .boxed()
        .shared()
    }
}

async fn run_refresh(
    id: &str,
    state: &SessionState,
    client: &dyn RefreshClient,
    timeout: Duration,
) -> RefreshResult {
    let Some(current) = state
        .snapshot()
        .filter(|pair| !pair.refresh_token.as_str().is_empty())
    else {
        warn!(flight = %id, "refresh requested without a refresh token");
        state.mark_cleared().await;
        return Err(RefreshError::NoRefreshToken);
    };

    state.begin_refresh();
    info!(flight = %id, subject = %current.subject_id, "refreshing credentials");

    let result = match tokio::time::timeout(timeout, client.refresh(&current.refresh_token)).await
    {
        Ok(result) => result,
        Err(_) => Err(RefreshError::Timeout),
    };

    match &result {
        Ok(pair) => {
            if state.replace_if_current(&current.refresh_token, pair.clone()).await {
                info!(flight = %id, "refresh succeeded");
            } else {
                // logout or a fresh login happened while the call was out
                return match state.snapshot() {
                    Some(newer) => {
                        info!(flight = %id, "refreshed pair superseded by newer credentials");
                        Ok(newer)
                    }
                    None => {
                        info!(flight = %id, "session cleared during refresh");
                        Err(RefreshError::Aborted("session cleared during refresh".to_string()))
                    }
                };
            }
        }
        Err(e) => {
            warn!(flight = %id, error = %e, "refresh failed");
            // Clearing happens before waiters are woken, so every one of them
            // returns to a session that is already gone.
            state.invalidate(&current.refresh_token).await;
        }
    }
    result
}
