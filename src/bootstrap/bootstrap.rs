use crate::application_impl::*;
use crate::domain_port::*;
use crate::infra_file::*;
use crate::infra_http::*;
use crate::infra_memory::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::{Settings, Store};
use anyhow::anyhow;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_STORE_DIR: &str = ".sessionkeeper";

pub fn build_token_store(store: &Store) -> anyhow::Result<Arc<dyn TokenStore>> {
    let token_store: Arc<dyn TokenStore> = match store.backend.as_str() {
        "memory" => Arc::new(MemoryTokenStore::new()),
        "file" => Arc::new(FileTokenStore::new(
            store.path.as_deref().unwrap_or(DEFAULT_STORE_DIR),
        )),
        "redis" => {
            let url = store
                .redis_url
                .as_deref()
                .ok_or_else(|| anyhow!("store.redis_url is required for the redis backend"))?;
            Arc::new(RedisTokenStore::open_url(url)?)
        }
        other => return Err(anyhow!("Unknown store backend: {}", other)),
    };
    Ok(token_store)
}

/// Wires the configured adapters into a [`SessionManager`].
pub fn try_build(settings: &Settings) -> anyhow::Result<SessionManager> {
    let token_store = build_token_store(&settings.store)?;

    let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(
        settings.api.base_url.clone(),
        Duration::from_millis(settings.api.request_timeout_ms),
    )?);
    let refresh_client: Arc<dyn RefreshClient> = Arc::new(ApiRefreshClient::new(
        transport.clone(),
        settings.refresh.path.clone(),
    ));

    let config = SessionConfig {
        location: StoreLocation::new(
            settings.store.namespace.clone(),
            settings.store.collection.clone(),
            settings.store.version,
        ),
        refresh_timeout: Duration::from_millis(settings.refresh.timeout_ms),
    };

    info!(
        base_url = %settings.api.base_url,
        store = %settings.store.backend,
        location = %config.location,
        "session pipeline assembled"
    );

    Ok(SessionManager::new(
        token_store,
        transport,
        refresh_client,
        config,
    ))
}
