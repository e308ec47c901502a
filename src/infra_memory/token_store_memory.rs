use crate::domain_port::*;
use dashmap::DashMap;
use std::collections::HashMap;

/// Process-local token store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryTokenStore {
    collections: DashMap<String, HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collection_of(&self, handle: &StoreHandle) -> Result<String, TokenStoreError> {
        let id = handle.id();
        if self.collections.contains_key(&id) {
            Ok(id)
        } else {
            Err(TokenStoreError::Storage(format!("collection {} is not open", id)))
        }
    }
}

#[async_trait::async_trait]
impl TokenStore for MemoryTokenStore {
    async fn open(&self, location: &StoreLocation) -> Result<StoreHandle, TokenStoreError> {
        let handle = StoreHandle::new(location.clone());
        self.collections.entry(handle.id()).or_default();
        Ok(handle)
    }

    async fn get(
        &self,
        handle: &StoreHandle,
        key: &str,
    ) -> Result<Option<String>, TokenStoreError> {
        let id = self.collection_of(handle)?;
        Ok(self
            .collections
            .get(&id)
            .and_then(|entries| entries.get(key).cloned()))
    }

    async fn set(
        &self,
        handle: &StoreHandle,
        key: &str,
        value: &str,
    ) -> Result<(), TokenStoreError> {
        let id = self.collection_of(handle)?;
        self.collections
            .entry(id)
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn clear(&self, handle: &StoreHandle) -> Result<(), TokenStoreError> {
        let id = self.collection_of(handle)?;
        if let Some(mut entries) = self.collections.get_mut(&id) {
            entries.clear();
        }
        Ok(())
    }
}
