use std::sync::Arc;

use tokio::sync::{RwLock, watch};
use tracing::info;

use crate::{dao::game_store::GameStore, error::GameStoreError};

/// Shared handle to [`AppState`].
pub type SharedState = Arc<AppState>;

/// Central application state holding the storage backend shared by every operation.
pub struct AppState {
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new() -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            game_store: RwLock::new(None),
            degraded: degraded_tx,
        })
    }

    /// Construct a state with `store` already installed.
    pub fn with_store(store: Arc<dyn GameStore>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(false);
        Arc::new(Self {
            game_store: RwLock::new(Some(store)),
            degraded: degraded_tx,
        })
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current store, or [`GameStoreError::Degraded`] when none is usable.
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, GameStoreError> {
        if self.is_degraded() {
            return Err(GameStoreError::Degraded);
        }
        self.game_store().await.ok_or(GameStoreError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn install_game_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current game store and enter degraded mode.
    pub async fn clear_game_store(&self) -> Option<Arc<dyn GameStore>> {
        let previous = {
            let mut guard = self.game_store.write().await;
            guard.take()
        };
        self.update_degraded(true);
        previous
    }

    /// Detach the store and release its connection resources.
    pub async fn shutdown(&self) {
        if let Some(store) = self.clear_game_store().await {
            store.shutdown().await;
            info!("storage backend released");
        }
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub(crate) fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }
}

#[cfg(all(test, feature = "memory-store"))]
mod tests {
    use super::*;
    use crate::dao::game_store::memory::MemoryGameStore;

    #[tokio::test]
    async fn starts_degraded_until_a_store_is_installed() {
        let state = AppState::new();
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_game_store().await,
            Err(GameStoreError::Degraded)
        ));

        state
            .install_game_store(Arc::new(MemoryGameStore::new()))
            .await;
        assert!(!state.is_degraded());
        assert!(state.require_game_store().await.is_ok());
    }

    #[tokio::test]
    async fn watcher_sees_transitions() {
        let state = AppState::new();
        let mut watcher = state.degraded_watcher();

        state
            .install_game_store(Arc::new(MemoryGameStore::new()))
            .await;
        watcher.changed().await.unwrap();
        assert!(!*watcher.borrow_and_update());

        state.shutdown().await;
        watcher.changed().await.unwrap();
        assert!(*watcher.borrow_and_update());
        assert!(state.game_store().await.is_none());
    }
}
