use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::doc,
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{
    config::MongoConfig,
    connection::open_client,
    error::{MongoDaoError, MongoResult, is_duplicate_key},
    models::{MongoMatchDocument, MongoUserDocument, filter_document, join_guard, join_update},
};
use crate::dao::{
    game_store::{GameStore, InsertOutcome},
    models::{Collection as StoreCollection, Filter, MatchEntity, Record, UserEntity},
    storage::StorageResult,
};

const USER_COLLECTION_NAME: &str = "users";
const GAME_COLLECTION_NAME: &str = "games";

/// MongoDB-backed [`GameStore`] implementation.
///
/// A single driver client (and its connection pool) is shared by every clone of the store.
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) = open_client(&self.config).await?;
        let previous = {
            let mut guard = self.state.write().await;
            let previous = guard.client.clone();
            guard.client = client;
            guard.database = database;
            previous
        };
        previous.shutdown().await;
        info!("MongoDB connection re-established");
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) = open_client(&config).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        // Lookups by name only; duplicate usernames stay insertable.
        let collection = self.user_collection().await;
        let index = IndexModel::builder()
            .keys(doc! {"username": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("user_username_idx".to_owned()))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: USER_COLLECTION_NAME,
                index: "username",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn user_collection(&self) -> Collection<MongoUserDocument> {
        self.database()
            .await
            .collection::<MongoUserDocument>(USER_COLLECTION_NAME)
    }

    async fn game_collection(&self) -> Collection<MongoMatchDocument> {
        self.database()
            .await
            .collection::<MongoMatchDocument>(GAME_COLLECTION_NAME)
    }

    async fn find_one(
        &self,
        collection: StoreCollection,
        filter: Filter,
    ) -> MongoResult<Option<Record>> {
        let query = filter_document(&filter);
        let query_error = |source: mongodb::error::Error| MongoDaoError::Query {
            collection: collection.name(),
            source,
        };

        let record = match collection {
            StoreCollection::Users => self
                .user_collection()
                .await
                .find_one(query)
                .await
                .map_err(query_error)?
                .map(|document| Record::User(document.into())),
            StoreCollection::Games => self
                .game_collection()
                .await
                .find_one(query)
                .await
                .map_err(query_error)?
                .map(|document| Record::Match(document.into())),
        };

        Ok(record)
    }

    async fn find_many(
        &self,
        collection: StoreCollection,
        filter: Filter,
    ) -> MongoResult<Vec<Record>> {
        let query = filter_document(&filter);
        let query_error = |source: mongodb::error::Error| MongoDaoError::Query {
            collection: collection.name(),
            source,
        };

        let records = match collection {
            StoreCollection::Users => {
                let documents: Vec<MongoUserDocument> = self
                    .user_collection()
                    .await
                    .find(query)
                    .await
                    .map_err(query_error)?
                    .try_collect()
                    .await
                    .map_err(query_error)?;
                documents
                    .into_iter()
                    .map(|document| Record::User(document.into()))
                    .collect()
            }
            StoreCollection::Games => {
                let documents: Vec<MongoMatchDocument> = self
                    .game_collection()
                    .await
                    .find(query)
                    .await
                    .map_err(query_error)?
                    .try_collect()
                    .await
                    .map_err(query_error)?;
                documents
                    .into_iter()
                    .map(|document| Record::Match(document.into()))
                    .collect()
            }
        };

        Ok(records)
    }

    async fn insert_user(&self, user: UserEntity) -> MongoResult<InsertOutcome> {
        let username = user.username.clone();
        let document: MongoUserDocument = user.into();

        match self.user_collection().await.insert_one(&document).await {
            Ok(_) => {
                debug!(%username, "inserted user");
                Ok(InsertOutcome::Inserted)
            }
            Err(err) if is_duplicate_key(&err) => {
                warn!(%username, "user insert rejected by unique index");
                Ok(InsertOutcome::Duplicate)
            }
            Err(source) => Err(MongoDaoError::InsertUser { username, source }),
        }
    }

    async fn insert_match(&self, game: MatchEntity) -> MongoResult<InsertOutcome> {
        let title = game.id.clone();
        let document: MongoMatchDocument = game.into();

        match self.game_collection().await.insert_one(&document).await {
            Ok(_) => {
                debug!(%title, "inserted match");
                Ok(InsertOutcome::Inserted)
            }
            Err(err) if is_duplicate_key(&err) => Ok(InsertOutcome::Duplicate),
            Err(source) => Err(MongoDaoError::InsertMatch { title, source }),
        }
    }

    async fn find_match(&self, title: String) -> MongoResult<Option<MatchEntity>> {
        let document = self
            .game_collection()
            .await
            .find_one(doc! {"_id": title.as_str()})
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: GAME_COLLECTION_NAME,
                source,
            })?;

        Ok(document.map(Into::into))
    }

    async fn try_join_match(
        &self,
        title: String,
        player: String,
    ) -> MongoResult<Option<MatchEntity>> {
        // The guard and the mutation run as one server-side operation, so two racing joins
        // can never push the roster past MAX_PLAYERS.
        let document = self
            .game_collection()
            .await
            .find_one_and_update(join_guard(&title, &player), join_update(&player))
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::JoinMatch {
                title: title.clone(),
                player: player.clone(),
                source,
            })?;

        Ok(document.map(Into::into))
    }

    async fn shutdown(&self) {
        let client = {
            let guard = self.inner.state.read().await;
            guard.client.clone()
        };
        client.shutdown().await;
        info!("MongoDB client shut down");
    }
}

impl GameStore for MongoGameStore {
    fn find_one(
        &self,
        collection: StoreCollection,
        filter: Filter,
    ) -> BoxFuture<'static, StorageResult<Option<Record>>> {
        let store = self.clone();
        Box::pin(async move { store.find_one(collection, filter).await.map_err(Into::into) })
    }

    fn find_many(
        &self,
        collection: StoreCollection,
        filter: Filter,
    ) -> BoxFuture<'static, StorageResult<Vec<Record>>> {
        let store = self.clone();
        Box::pin(async move { store.find_many(collection, filter).await.map_err(Into::into) })
    }

    fn insert_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<InsertOutcome>> {
        let store = self.clone();
        Box::pin(async move { store.insert_user(user).await.map_err(Into::into) })
    }

    fn insert_match(&self, game: MatchEntity) -> BoxFuture<'static, StorageResult<InsertOutcome>> {
        let store = self.clone();
        Box::pin(async move { store.insert_match(game).await.map_err(Into::into) })
    }

    fn find_match(&self, title: String) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_match(title).await.map_err(Into::into) })
    }

    fn try_join_match(
        &self,
        title: String,
        player: String,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.try_join_match(title, player).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }

    fn shutdown(&self) -> BoxFuture<'static, ()> {
        let store = self.clone();
        Box::pin(async move { store.shutdown().await })
    }
}
