use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell, watch};

/// In-memory source of truth for the current credential pair and phase.
///
/// Only this type writes to the [`TokenStore`]. Every mutation holds
/// `write_lock` for its whole duration, so a `replace` and a `mark_cleared`
/// never interleave their durable writes.
pub struct SessionState {
    store: Arc<dyn TokenStore>,
    location: StoreLocation,
    handle: OnceCell<StoreHandle>,
    view: watch::Sender<SessionView>,
    write_lock: Mutex<()>,
}

impl SessionState {
    pub fn new(store: Arc<dyn TokenStore>, location: StoreLocation) -> Self {
        let (view, _) = watch::channel(SessionView::uninitialized());
        Self {
            store,
            location,
            handle: OnceCell::new(),
            view,
            write_lock: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Option<CredentialPair> {
        self.view.borrow().credentials.clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.view.borrow().phase
    }

    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.subscribe()
    }

    /// Reads the three credential fields from the store. A store failure or a
    /// missing field counts as "no session".
    pub async fn load(&self) -> SessionPhase {
        let _guard = self.write_lock.lock().await;
        self.set_phase(SessionPhase::Loading);

        let pair = match self.read_pair().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(location = %self.location, error = %e, "reading credentials failed");
                None
            }
        };

        match pair {
            Some(pair) => {
                info!(subject = %pair.subject_id, "session restored from store");
                self.view.send_modify(|view| {
                    view.phase = SessionPhase::Ready;
                    view.credentials = Some(pair);
                });
                SessionPhase::Ready
            }
            None => {
                self.view.send_modify(|view| {
                    view.phase = SessionPhase::Cleared;
                    view.credentials = None;
                    view.refreshed_at = None;
                });
                // leftovers of a half-written pair must not survive
                self.wipe_store().await;
                info!("no stored session");
                SessionPhase::Cleared
            }
        }
    }

    /// Accepts a new pair in memory first, then persists it field by field.
    /// Store failures are logged and swallowed.
    pub async fn replace(&self, pair: CredentialPair) {
        let _guard = self.write_lock.lock().await;
        self.replace_locked(pair).await;
    }

    /// Installs `pair` only if the session still holds the pair identified by
    /// `refresh_token`. A cleared session or a newer login is left alone.
    pub async fn replace_if_current(
        &self,
        refresh_token: &RefreshToken,
        pair: CredentialPair,
    ) -> bool {
        let _guard = self.write_lock.lock().await;
        match self.snapshot() {
            Some(current) if &current.refresh_token == refresh_token => {
                self.replace_locked(pair).await;
                true
            }
            _ => {
                debug!("session changed since refresh started; dropping refreshed pair");
                false
            }
        }
    }

    async fn replace_locked(&self, pair: CredentialPair) {
        self.view.send_modify(|view| {
            view.phase = SessionPhase::Ready;
            view.credentials = Some(pair.clone());
            view.refreshed_at = Some(Utc::now());
        });
        info!(subject = %pair.subject_id, "credentials replaced");

        if let Err(e) = self.write_pair(&pair).await {
            warn!(location = %self.location, error = %e, "persisting credentials failed");
            // a mixed old/new pair must never be restored by the next load
            self.wipe_store().await;
        }
    }

    pub async fn mark_cleared(&self) {
        let _guard = self.write_lock.lock().await;
        self.clear_locked().await;
    }

    /// Clears the session only if it still holds the pair identified by
    /// `refresh_token`. A pair installed by a later `replace` is left alone.
    pub async fn invalidate(&self, refresh_token: &RefreshToken) -> bool {
        let _guard = self.write_lock.lock().await;
        let current = self.snapshot();
        match current {
            Some(pair) if &pair.refresh_token != refresh_token => {
                debug!("credentials changed since refresh started; keeping them");
                false
            }
            _ => {
                self.clear_locked().await;
                true
            }
        }
    }

    /// Ready -> Refreshing. Returns false in any other phase.
    pub fn begin_refresh(&self) -> bool {
        self.view.send_if_modified(|view| {
            if view.phase == SessionPhase::Ready {
                view.phase = SessionPhase::Refreshing;
                true
            } else {
                false
            }
        })
    }

    async fn clear_locked(&self) {
        self.view.send_modify(|view| {
            view.phase = SessionPhase::Cleared;
            view.credentials = None;
            view.refreshed_at = None;
        });
        info!("session cleared");
        self.wipe_store().await;
    }

    async fn wipe_store(&self) {
        let result = match self.handle().await {
            Ok(handle) => self.store.clear(handle).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(location = %self.location, error = %e, "clearing stored credentials failed");
        }
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.view.send_modify(|view| view.phase = phase);
    }

    async fn handle(&self) -> Result<&StoreHandle, TokenStoreError> {
        self.handle
            .get_or_try_init(|| self.store.open(&self.location))
            .await
    }

    async fn read_pair(&self) -> Result<Option<CredentialPair>, TokenStoreError> {
        let handle = self.handle().await?;
        let access = self
            .store
            .get(handle, CredentialKey::AccessToken.as_str())
            .await?;
        let refresh = self
            .store
            .get(handle, CredentialKey::RefreshToken.as_str())
            .await?;
        let subject = self
            .store
            .get(handle, CredentialKey::SubjectId.as_str())
            .await?;

        match (access, refresh, subject) {
            (Some(access), Some(refresh), Some(subject)) => {
                Ok(Some(CredentialPair::new(access, refresh, subject)))
            }
            _ => Ok(None),
        }
    }

    async fn write_pair(&self, pair: &CredentialPair) -> Result<(), TokenStoreError> {
        let handle = self.handle().await?;
        self.store
            .set(
                handle,
                CredentialKey::AccessToken.as_str(),
                pair.access_token.as_str(),
            )
            .await?;
        self.store
            .set(
                handle,
                CredentialKey::RefreshToken.as_str(),
                pair.refresh_token.as_str(),
            )
            .await?;
        self.store
            .set(handle, CredentialKey::SubjectId.as_str(), &pair.subject_id.0)
            .await?;
        Ok(())
    }
}
