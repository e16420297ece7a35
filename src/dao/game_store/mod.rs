#[cfg(feature = "memory-store")]
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::config::{AppConfig, BackendKind};
use crate::dao::models::{Collection, Filter, MatchEntity, Record, UserEntity};
use crate::dao::storage::{StorageError, StorageResult};

/// Result of an insert that may collide with an existing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The document was written.
    Inserted,
    /// The backend rejected the document because its key already exists.
    Duplicate,
}

/// Abstraction over the persistence layer for accounts and matches.
pub trait GameStore: Send + Sync {
    /// First document of `collection` matching `filter`.
    fn find_one(
        &self,
        collection: Collection,
        filter: Filter,
    ) -> BoxFuture<'static, StorageResult<Option<Record>>>;
    /// Every document of `collection` matching `filter`.
    fn find_many(
        &self,
        collection: Collection,
        filter: Filter,
    ) -> BoxFuture<'static, StorageResult<Vec<Record>>>;
    /// Insert a user document without any uniqueness check of its own.
    fn insert_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<InsertOutcome>>;
    /// Insert a match document keyed by its title.
    fn insert_match(&self, game: MatchEntity) -> BoxFuture<'static, StorageResult<InsertOutcome>>;
    /// Load a single match by title.
    fn find_match(&self, title: String) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// Append `player` and increment the player count as one indivisible update, only when
    /// the match exists, is not full, and does not already list `player`.
    ///
    /// Returns the updated match, or `None` when the condition did not hold.
    fn try_join_match(
        &self,
        title: String,
        player: String,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// Cheap liveness check.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Replace the underlying connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Release the underlying connection resources.
    fn shutdown(&self) -> BoxFuture<'static, ()>;
}

/// Open the backend selected by `config`.
pub async fn connect(config: &AppConfig) -> StorageResult<Arc<dyn GameStore>> {
    match config.backend {
        #[cfg(feature = "mongo-store")]
        BackendKind::Mongo => {
            let mongo_config = self::mongodb::MongoConfig::from_uri(
                &config.mongo_uri,
                Some(&config.database),
            )
            .await?
            .with_connect_attempts(config.connect_attempts);
            let store = self::mongodb::MongoGameStore::connect(mongo_config).await?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "memory-store")]
        BackendKind::Memory => Ok(Arc::new(self::memory::MemoryGameStore::new())),
        #[allow(unreachable_patterns)]
        other => Err(StorageError::Unsupported {
            backend: other.as_str(),
        }),
    }
}
