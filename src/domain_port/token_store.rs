use std::fmt;

/// Identifies one collection inside a durable medium.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct StoreLocation {
    pub namespace: String,
    pub collection: String,
    pub version: u32,
}

impl StoreLocation {
    pub fn new(namespace: impl Into<String>, collection: impl Into<String>, version: u32) -> Self {
        Self {
            namespace: namespace.into(),
            collection: collection.into(),
            version,
        }
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:v{}", self.namespace, self.collection, self.version)
    }
}

/// Returned by [`TokenStore::open`]. Two handles for the same location are equal.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct StoreHandle {
    location: StoreLocation,
}

impl StoreHandle {
    pub fn new(location: StoreLocation) -> Self {
        Self { location }
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    /// Stable identifier adapters use to index per-collection state.
    pub fn id(&self) -> String {
        self.location.to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Durable, namespaced key/value persistence for credential material.
///
/// A missing key is `Ok(None)`, never an error. Writes have overwrite
/// semantics and are never observable half-done.
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    /// Idempotent. Concurrent opens of one location share a single setup.
    async fn open(&self, location: &StoreLocation) -> Result<StoreHandle, TokenStoreError>;

    async fn get(&self, handle: &StoreHandle, key: &str)
    -> Result<Option<String>, TokenStoreError>;

    async fn set(&self, handle: &StoreHandle, key: &str, value: &str)
    -> Result<(), TokenStoreError>;

    /// Removes every key under the handle's collection.
    async fn clear(&self, handle: &StoreHandle) -> Result<(), TokenStoreError>;
}
