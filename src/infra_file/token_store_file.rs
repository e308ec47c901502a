use crate::domain_port::*;
use crate::logger::*;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

struct FileCollection {
    path: PathBuf,
    write_lock: Mutex<()>,
}

/// Keeps each collection as one JSON object at
/// `<root>/<namespace>/<collection>.v<version>.json`.
///
/// Every write rewrites a temp file and renames it over the original, so a
/// reader sees either the old or the new object.
pub struct FileTokenStore {
    root: PathBuf,
    collections: DashMap<String, Arc<OnceCell<Arc<FileCollection>>>>,
}

impl FileTokenStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            collections: DashMap::new(),
        }
    }

    fn collection_path(&self, location: &StoreLocation) -> PathBuf {
        self.root
            .join(&location.namespace)
            .join(format!("{}.v{}.json", location.collection, location.version))
    }

    fn collection(&self, handle: &StoreHandle) -> Result<Arc<FileCollection>, TokenStoreError> {
        self.collections
            .get(&handle.id())
            .and_then(|cell| cell.get().cloned())
            .ok_or_else(|| TokenStoreError::Storage(format!("collection {} is not open", handle.id())))
    }
}

async fn read_entries(path: &Path) -> Result<BTreeMap<String, String>, TokenStoreError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => serde_json::from_str(&text)
            .map_err(|e| TokenStoreError::Storage(format!("corrupt collection file: {}", e))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(TokenStoreError::Storage(e.to_string())),
    }
}

async fn write_entries(
    path: &Path,
    entries: &BTreeMap<String, String>,
) -> Result<(), TokenStoreError> {
    let text =
        serde_json::to_string_pretty(entries).map_err(|e| TokenStoreError::Storage(e.to_string()))?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, text)
        .await
        .map_err(|e| TokenStoreError::Storage(e.to_string()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| TokenStoreError::Storage(e.to_string()))?;
    Ok(())
}

#[async_trait::async_trait]
impl TokenStore for FileTokenStore {
    async fn open(&self, location: &StoreLocation) -> Result<StoreHandle, TokenStoreError> {
        let handle = StoreHandle::new(location.clone());
        let cell = self
            .collections
            .entry(handle.id())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        cell.get_or_try_init(|| async {
            let path = self.collection_path(location);
            if let Some(dir) = path.parent() {
                tokio::fs::create_dir_all(dir)
                    .await
                    .map_err(|e| TokenStoreError::Unavailable(e.to_string()))?;
            }
            debug!(path = %path.display(), "token collection opened");
            Ok::<_, TokenStoreError>(Arc::new(FileCollection {
                path,
                write_lock: Mutex::new(()),
            }))
        })
        .await?;

        Ok(handle)
    }

    async fn get(
        &self,
        handle: &StoreHandle,
        key: &str,
    ) -> Result<Option<String>, TokenStoreError> {
        let collection = self.collection(handle)?;
        let mut entries = read_entries(&collection.path).await?;
        Ok(entries.remove(key))
    }

    async fn set(
        &self,
        handle: &StoreHandle,
        key: &str,
        value: &str,
    ) -> Result<(), TokenStoreError> {
        let collection = self.collection(handle)?;
        let _guard = collection.write_lock.lock().await;
        let mut entries = read_entries(&collection.path).await?;
        entries.insert(key.to_string(), value.to_string());
        write_entries(&collection.path, &entries).await
    }

    async fn clear(&self, handle: &StoreHandle) -> Result<(), TokenStoreError> {
        let collection = self.collection(handle)?;
        let _guard = collection.write_lock.lock().await;
        match tokio::fs::remove_file(&collection.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TokenStoreError::Storage(e.to_string())),
        }
    }
}
