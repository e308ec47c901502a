//! A tiny dashboard API served by warp, plus session fixtures.

use serde_json::{Value, json};
use sessionkeeper::application_impl::{SessionConfig, SessionManager};
use sessionkeeper::domain_port::*;
use sessionkeeper::infra_file::FileTokenStore;
use sessionkeeper::infra_http::{ApiRefreshClient, DEFAULT_REFRESH_PATH, ReqwestTransport};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use warp::Filter;
use warp::http::StatusCode;

#[derive(Default)]
pub struct ApiState {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub generation: u32,
    pub subject: String,
    pub refresh_calls: usize,
    pub refresh_bodies: Vec<Value>,
    pub api_calls: usize,
    pub authorization: Vec<Option<String>>,
    pub refresh_delay: Duration,
    pub reject_everything: bool,
}

#[derive(Clone)]
pub struct TestApi {
    pub addr: SocketAddr,
    pub state: Arc<Mutex<ApiState>>,
}

impl TestApi {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn refresh_calls(&self) -> usize {
        self.state.lock().unwrap().refresh_calls
    }

    pub fn api_calls(&self) -> usize {
        self.state.lock().unwrap().api_calls
    }

    pub fn authorization(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().authorization.clone()
    }
}

fn reply(status: StatusCode, body: Value) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(&body), status)
}

async fn handle_refresh(
    body: Value,
    state: Arc<Mutex<ApiState>>,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, warp::Rejection> {
    let delay = {
        let mut s = state.lock().unwrap();
        s.refresh_calls += 1;
        s.refresh_bodies.push(body.clone());
        s.refresh_delay
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let mut s = state.lock().unwrap();
    let presented = body.get("refresh_token").and_then(Value::as_str);
    if presented.is_none() || presented != s.refresh_token.as_deref() {
        return Ok(reply(
            StatusCode::UNAUTHORIZED,
            json!({ "status": 401, "message": "invalid refresh token" }),
        ));
    }
    s.generation += 1;
    let access = format!("at{}", s.generation);
    let refresh = format!("rt{}", s.generation);
    s.access_token = Some(access.clone());
    s.refresh_token = Some(refresh.clone());
    Ok(reply(
        StatusCode::OK,
        json!({
            "status": 200,
            "data": { "access_token": access, "refresh_token": refresh, "_id": s.subject },
        }),
    ))
}

fn handle_api(
    resource: String,
    authorization: Option<String>,
    state: Arc<Mutex<ApiState>>,
) -> warp::reply::WithStatus<warp::reply::Json> {
    let mut s = state.lock().unwrap();
    s.api_calls += 1;
    s.authorization.push(authorization.clone());
    let expected = s.access_token.as_ref().map(|t| format!("Bearer {}", t));
    if s.reject_everything || authorization.is_none() || authorization != expected {
        return reply(
            StatusCode::UNAUTHORIZED,
            json!({ "status": 401, "message": "Unauthorized" }),
        );
    }
    reply(
        StatusCode::OK,
        json!({ "status": 200, "data": { "resource": resource, "items": [] } }),
    )
}

/// Starts the API on an ephemeral port.
pub fn spawn_api(state: ApiState) -> TestApi {
    let state = Arc::new(Mutex::new(state));
    let with_state = {
        let state = state.clone();
        warp::any().map(move || state.clone())
    };

    let refresh = warp::post()
        .and(warp::path!("admin" / "auth" / "refresh-token"))
        .and(warp::body::json())
        .and(with_state.clone())
        .and_then(handle_refresh);

    let api = warp::path!("api" / String)
        .and(warp::header::optional::<String>("authorization"))
        .and(with_state)
        .map(handle_api);

    let (addr, server) = warp::serve(refresh.or(api)).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    TestApi { addr, state }
}

pub fn location() -> StoreLocation {
    StoreLocation::new("dashboard", "session", 1)
}

pub fn http_transport(base_url: &str) -> Arc<dyn Transport> {
    Arc::new(ReqwestTransport::new(base_url, Duration::from_secs(5)).unwrap())
}

/// Session over real HTTP, persisted under `dir`.
pub fn session_for(
    api_url: &str,
    refresh_url: &str,
    dir: &std::path::Path,
    refresh_timeout: Duration,
) -> Arc<SessionManager> {
    let refresh_client = Arc::new(ApiRefreshClient::new(
        http_transport(refresh_url),
        DEFAULT_REFRESH_PATH,
    ));
    Arc::new(SessionManager::new(
        Arc::new(FileTokenStore::new(dir)),
        http_transport(api_url),
        refresh_client,
        SessionConfig {
            location: location(),
            refresh_timeout,
        },
    ))
}

/// Writes a credential triple straight into the file store, as a previous run would have.
pub async fn seed_store(dir: &std::path::Path, access: &str, refresh: &str, subject: &str) {
    let store = FileTokenStore::new(dir);
    let handle = store.open(&location()).await.unwrap();
    store.set(&handle, "access_token", access).await.unwrap();
    store.set(&handle, "refresh_token", refresh).await.unwrap();
    store.set(&handle, "_id", subject).await.unwrap();
}

pub async fn stored(dir: &std::path::Path, key: &str) -> Option<String> {
    let store = FileTokenStore::new(dir);
    let handle = store.open(&location()).await.unwrap();
    store.get(&handle, key).await.unwrap()
}
