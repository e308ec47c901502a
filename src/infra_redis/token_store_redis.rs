use crate::domain_port::*;
use crate::logger::*;
use redis::AsyncCommands;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Keeps each collection as one Redis hash keyed `<namespace>:<collection>:v<version>`.
pub struct RedisTokenStore {
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
    /// Locations already checked with a PING, by hash key.
    opened: DashMap<String, Arc<OnceCell<()>>>,
}

impl RedisTokenStore {
    pub fn new(client: redis::Client) -> Self {
        RedisTokenStore {
            client,
            conn: OnceCell::new(),
            opened: DashMap::new(),
        }
    }

    pub fn open_url(url: &str) -> Result<Self, TokenStoreError> {
        let client =
            redis::Client::open(url).map_err(|e| TokenStoreError::Unavailable(e.to_string()))?;
        Ok(Self::new(client))
    }

    fn key(handle: &StoreHandle) -> String {
        handle.id()
    }

    async fn conn(&self) -> Result<ConnectionManager, TokenStoreError> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                self.client
                    .get_connection_manager()
                    .await
                    .map_err(|e| TokenStoreError::Unavailable(e.to_string()))
            })
            .await?;
        Ok(conn.clone())
    }
}

#[async_trait::async_trait]
impl TokenStore for RedisTokenStore {
    async fn open(&self, location: &StoreLocation) -> Result<StoreHandle, TokenStoreError> {
        let handle = StoreHandle::new(location.clone());
        let key = Self::key(&handle);
        let cell = self.opened.entry(key.clone()).or_default().clone();
        cell.get_or_try_init(|| async {
            let mut conn = self.conn().await?;
            let _: String = redis::cmd("PING")
                .query_async(&mut conn)
                .await
                .map_err(|e| TokenStoreError::Unavailable(e.to_string()))?;
            debug!(%key, "token collection opened");
            Ok::<(), TokenStoreError>(())
        })
        .await?;
        Ok(handle)
    }

    async fn get(
        &self,
        handle: &StoreHandle,
        key: &str,
    ) -> Result<Option<String>, TokenStoreError> {
        let mut conn = self.conn().await?;
        let val: Option<String> = conn
            .hget(Self::key(handle), key)
            .await
            .map_err(|e| TokenStoreError::Storage(e.to_string()))?;
        Ok(val)
    }

    async fn set(
        &self,
        handle: &StoreHandle,
        key: &str,
        value: &str,
    ) -> Result<(), TokenStoreError> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .hset(Self::key(handle), key, value)
            .await
            .map_err(|e| TokenStoreError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn clear(&self, handle: &StoreHandle) -> Result<(), TokenStoreError> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .del(Self::key(handle))
            .await
            .map_err(|e| TokenStoreError::Storage(e.to_string()))?;
        Ok(())
    }
}
