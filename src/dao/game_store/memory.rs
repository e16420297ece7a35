//! In-process [`GameStore`] used for local runs and tests.
//!
//! Matches live in a [`DashMap`] so the conditional join runs under the entry's shard lock,
//! giving the same all-or-nothing guarantee as the MongoDB `find_one_and_update` path.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::dao::{
    game_store::{GameStore, InsertOutcome},
    models::{Collection, Filter, FilterValue, MatchEntity, Record, UserEntity},
    storage::{StorageError, StorageResult},
};

/// Failures reported by the in-memory backend.
#[derive(Debug, Error)]
pub enum MemoryStoreError {
    /// The store was switched offline with [`MemoryGameStore::set_online`].
    #[error("in-memory store is offline")]
    Offline,
    /// Writes are refused, see [`MemoryGameStore::set_rejecting_writes`].
    #[error("in-memory store rejected the write")]
    WriteRejected,
}

/// In-memory backend keeping users in insertion order and matches keyed by title.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    users: RwLock<Vec<UserEntity>>,
    games: DashMap<String, MatchEntity>,
    offline: AtomicBool,
    reject_writes: AtomicBool,
}

impl MemoryGameStore {
    /// Empty, online store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing or regaining the backend; while offline every call fails as unavailable.
    pub fn set_online(&self, online: bool) {
        self.inner.offline.store(!online, Ordering::SeqCst);
    }

    /// Make every insert and join fail as a rejected write while reads keep working.
    pub fn set_rejecting_writes(&self, reject: bool) {
        self.inner.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Overwrite a match document, bypassing the join rules.
    pub fn put_match(&self, game: MatchEntity) {
        self.inner.games.insert(game.id.clone(), game);
    }

    fn ensure_online(&self) -> StorageResult<()> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable(
                "in-memory store offline".into(),
                MemoryStoreError::Offline,
            ));
        }
        Ok(())
    }

    fn ensure_writable(&self) -> StorageResult<()> {
        self.ensure_online()?;
        if self.inner.reject_writes.load(Ordering::SeqCst) {
            return Err(StorageError::operation(
                "in-memory store rejected the write".into(),
                MemoryStoreError::WriteRejected,
            ));
        }
        Ok(())
    }

    async fn find_many(
        &self,
        collection: Collection,
        filter: Filter,
    ) -> StorageResult<Vec<Record>> {
        self.ensure_online()?;
        let records = match collection {
            Collection::Users => {
                let users = self.inner.users.read().await;
                users
                    .iter()
                    .filter(|user| user_matches(user, &filter))
                    .cloned()
                    .map(Record::User)
                    .collect()
            }
            Collection::Games => {
                let mut games: Vec<MatchEntity> = self
                    .inner
                    .games
                    .iter()
                    .filter(|entry| match_matches(entry.value(), &filter))
                    .map(|entry| entry.value().clone())
                    .collect();
                games.sort_by(|left, right| left.id.cmp(&right.id));
                games.into_iter().map(Record::Match).collect()
            }
        };
        Ok(records)
    }

    async fn insert_user(&self, user: UserEntity) -> StorageResult<InsertOutcome> {
        self.ensure_writable()?;
        debug!(username = %user.username, "inserted user");
        self.inner.users.write().await.push(user);
        Ok(InsertOutcome::Inserted)
    }

    fn insert_match(&self, game: MatchEntity) -> StorageResult<InsertOutcome> {
        self.ensure_writable()?;
        match self.inner.games.entry(game.id.clone()) {
            Entry::Occupied(_) => Ok(InsertOutcome::Duplicate),
            Entry::Vacant(slot) => {
                debug!(title = %game.id, "inserted match");
                slot.insert(game);
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    fn find_match(&self, title: &str) -> StorageResult<Option<MatchEntity>> {
        self.ensure_online()?;
        Ok(self.inner.games.get(title).map(|entry| entry.value().clone()))
    }

    fn try_join_match(&self, title: &str, player: String) -> StorageResult<Option<MatchEntity>> {
        self.ensure_writable()?;
        let Some(mut game) = self.inner.games.get_mut(title) else {
            return Ok(None);
        };
        if game.is_full() || game.has_player(&player) {
            return Ok(None);
        }
        game.num_players += 1;
        game.players.push(player);
        Ok(Some(game.value().clone()))
    }
}

impl GameStore for MemoryGameStore {
    fn find_one(
        &self,
        collection: Collection,
        filter: Filter,
    ) -> BoxFuture<'static, StorageResult<Option<Record>>> {
        let store = self.clone();
        Box::pin(async move {
            let records = store.find_many(collection, filter).await?;
            Ok(records.into_iter().next())
        })
    }

    fn find_many(
        &self,
        collection: Collection,
        filter: Filter,
    ) -> BoxFuture<'static, StorageResult<Vec<Record>>> {
        let store = self.clone();
        Box::pin(async move { store.find_many(collection, filter).await })
    }

    fn insert_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<InsertOutcome>> {
        let store = self.clone();
        Box::pin(async move { store.insert_user(user).await })
    }

    fn insert_match(&self, game: MatchEntity) -> BoxFuture<'static, StorageResult<InsertOutcome>> {
        let store = self.clone();
        Box::pin(async move { store.insert_match(game) })
    }

    fn find_match(&self, title: String) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_match(&title) })
    }

    fn try_join_match(
        &self,
        title: String,
        player: String,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.try_join_match(&title, player) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_online() })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_online() })
    }

    fn shutdown(&self) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }
}

fn user_matches(user: &UserEntity, filter: &Filter) -> bool {
    filter.iter().all(|(field, value)| match field {
        "username" => value_is_str(value, &user.username),
        "password" => value_is_str(value, &user.password),
        "salt" => value_is_str(value, &user.salt),
        _ => false,
    })
}

fn match_matches(game: &MatchEntity, filter: &Filter) -> bool {
    filter.iter().all(|(field, value)| match field {
        "_id" => value_is_str(value, &game.id),
        "open" => *value == FilterValue::Bool(game.open),
        "numPlayers" => *value == FilterValue::Int(game.num_players.into()),
        // Scalar against array: any element may match.
        "players" => game.players.iter().any(|name| value_is_str(value, name)),
        _ => false,
    })
}

fn value_is_str(value: &FilterValue, expected: &str) -> bool {
    matches!(value, FilterValue::Str(text) if text == expected)
}
