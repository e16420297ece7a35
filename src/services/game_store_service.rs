//! Account and match operations exposed to the game server.
//!
//! Each call borrows the shared backend from [`SharedState`] for a single store operation.
//! Lookups only fail with infrastructure errors; mutating operations report expected
//! failures as [`DomainError`] so callers can turn any result into an [`Outcome`].
//!
//! [`Outcome`]: crate::error::Outcome

use tracing::{debug, info, warn};
use validator::Validate;

use crate::{
    dao::{
        game_store::InsertOutcome,
        models::{Collection, Filter, MatchEntity, Record, UserEntity},
        storage::StorageError,
    },
    dto::requests::{CreateAccountRequest, CreateMatchRequest, JoinMatchRequest},
    error::{
        ACCOUNT_EXISTS_MESSAGE, CREATE_ACCOUNT_FAILED_MESSAGE, CREATE_MATCH_FAILED_MESSAGE,
        DomainError, GameStoreError, JOIN_FAILED_MESSAGE, MATCH_EXISTS_MESSAGE,
        MATCH_FULL_MESSAGE, MATCH_MISSING_MESSAGE,
    },
    services::credentials,
    state::SharedState,
};

/// Conditional join attempts before giving up on a contended match.
const JOIN_ATTEMPTS: u32 = 3;

/// How a successful join came about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinStatus {
    /// The player took a free seat; carries the updated match.
    Joined(MatchEntity),
    /// The player was already on the roster; nothing was written.
    AlreadyJoined(MatchEntity),
}

/// First document of `collection` matching `filter`.
pub async fn lookup_one(
    state: &SharedState,
    collection: Collection,
    filter: Filter,
) -> Result<Option<Record>, GameStoreError> {
    let store = state.require_game_store().await?;
    Ok(store.find_one(collection, filter).await?)
}

/// Every document of `collection` matching `filter`, possibly none.
pub async fn lookup_many(
    state: &SharedState,
    collection: Collection,
    filter: Filter,
) -> Result<Vec<Record>, GameStoreError> {
    let store = state.require_game_store().await?;
    Ok(store.find_many(collection, filter).await?)
}

/// First account registered under `username`.
pub async fn find_user(
    state: &SharedState,
    username: &str,
) -> Result<Option<UserEntity>, GameStoreError> {
    let record = lookup_one(state, Collection::Users, Filter::by_username(username)).await?;
    Ok(record.and_then(Record::into_user))
}

/// Match stored under `title`.
pub async fn find_match(
    state: &SharedState,
    title: &str,
) -> Result<Option<MatchEntity>, GameStoreError> {
    let store = state.require_game_store().await?;
    Ok(store.find_match(title.to_owned()).await?)
}

/// Every stored match.
pub async fn list_matches(state: &SharedState) -> Result<Vec<MatchEntity>, GameStoreError> {
    let records = lookup_many(state, Collection::Games, Filter::new()).await?;
    Ok(records.into_iter().filter_map(Record::into_match).collect())
}

/// Register an account, storing only a salted SHA-256 digest of the password.
///
/// No uniqueness check is made here; duplicate usernames are stored unless the backend
/// rejects them.
///
/// The username must be 1 to 64 characters and the password 1 to 256; anything else is
/// [`DomainError::InvalidInput`] and the store is never touched.
pub async fn create_account(
    state: &SharedState,
    request: CreateAccountRequest,
) -> Result<UserEntity, GameStoreError> {
    request.validate().map_err(DomainError::from)?;
    let store = state.require_game_store().await?;

    let CreateAccountRequest { username, password } = request;
    let user = credentials::new_account(username, &password);

    match store.insert_user(user.clone()).await {
        Ok(InsertOutcome::Inserted) => {
            info!(username = %user.username, "account created");
            Ok(user)
        }
        Ok(InsertOutcome::Duplicate) => {
            warn!(username = %user.username, "account insert rejected as duplicate");
            Err(DomainError::Conflict(ACCOUNT_EXISTS_MESSAGE.into()).into())
        }
        Err(err) => {
            warn!(username = %user.username, error = %err, "failed to insert account");
            Err(write_failure(err, CREATE_ACCOUNT_FAILED_MESSAGE))
        }
    }
}

/// Check `password` against the account stored under `username`.
///
/// Returns `false` for unknown users.
pub async fn verify_credentials(
    state: &SharedState,
    username: &str,
    password: &str,
) -> Result<bool, GameStoreError> {
    let user = find_user(state, username).await?;
    Ok(user.is_some_and(|user| credentials::verify_password(&user, password)))
}

/// Create an empty, closed match keyed by its title.
///
/// The title must be 1 to 128 characters, otherwise [`DomainError::InvalidInput`] is returned.
pub async fn create_match(
    state: &SharedState,
    request: CreateMatchRequest,
) -> Result<MatchEntity, GameStoreError> {
    request.validate().map_err(DomainError::from)?;
    let store = state.require_game_store().await?;

    let game = MatchEntity::new(request.title);
    match store.insert_match(game.clone()).await {
        Ok(InsertOutcome::Inserted) => {
            info!(title = %game.id, "match created");
            Ok(game)
        }
        Ok(InsertOutcome::Duplicate) => {
            warn!(title = %game.id, "match title already taken");
            Err(DomainError::Conflict(MATCH_EXISTS_MESSAGE.into()).into())
        }
        Err(err) => {
            warn!(title = %game.id, error = %err, "failed to insert match");
            Err(write_failure(err, CREATE_MATCH_FAILED_MESSAGE))
        }
    }
}

/// Add `player` to a match.
///
/// Rules are applied in order and the first that holds decides: unreachable store, missing
/// match, full match, player already present (success, no write), otherwise a single
/// conditional update that can never push the roster past two players.
///
/// The title must be 1 to 128 characters and the player name 1 to 64; anything else is
/// [`DomainError::InvalidInput`] and the store is never touched.
pub async fn join_match(
    state: &SharedState,
    request: JoinMatchRequest,
) -> Result<JoinStatus, GameStoreError> {
    request.validate().map_err(DomainError::from)?;
    let store = state.require_game_store().await?;
    let JoinMatchRequest { title, player } = request;

    for attempt in 1..=JOIN_ATTEMPTS {
        match store.try_join_match(title.clone(), player.clone()).await {
            Ok(Some(game)) => {
                info!(%title, %player, players = game.num_players, "player joined match");
                return Ok(JoinStatus::Joined(game));
            }
            Ok(None) => {}
            Err(err) => {
                warn!(%title, %player, error = %err, "failed to update match roster");
                return Err(write_failure(err, JOIN_FAILED_MESSAGE));
            }
        }

        // The guard refused the update: reload and find out which rule rejected it.
        let Some(game) = store.find_match(title.clone()).await? else {
            return Err(DomainError::NotFound(MATCH_MISSING_MESSAGE.into()).into());
        };
        if game.is_full() {
            return Err(DomainError::Conflict(MATCH_FULL_MESSAGE.into()).into());
        }
        if game.has_player(&player) {
            debug!(%title, %player, "player already in match");
            return Ok(JoinStatus::AlreadyJoined(game));
        }
        debug!(%title, %player, attempt, "match changed during join; retrying");
    }

    warn!(%title, %player, "giving up on contended match");
    Err(DomainError::Transient(JOIN_FAILED_MESSAGE.into()).into())
}

/// Unreachable backends stay infrastructure failures; anything else is a failed write.
fn write_failure(err: StorageError, message: &str) -> GameStoreError {
    if err.is_unavailable() {
        GameStoreError::Infrastructure(err)
    } else {
        DomainError::Transient(message.into()).into()
    }
}

#[cfg(all(test, feature = "memory-store"))]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        dao::{
            game_store::{GameStore, memory::MemoryGameStore},
            storage::StorageResult,
        },
        error::{Outcome, UNREACHABLE_MESSAGE},
        state::AppState,
    };

    fn setup() -> (SharedState, MemoryGameStore) {
        let store = MemoryGameStore::new();
        let state = AppState::with_store(Arc::new(store.clone()));
        (state, store)
    }

    /// Backend whose conditional join is always refused while the match stays joinable,
    /// as if another writer kept winning the race.
    #[derive(Clone, Default)]
    struct ContendedStore {
        inner: MemoryGameStore,
        join_calls: Arc<AtomicU32>,
    }

    impl GameStore for ContendedStore {
        fn find_one(
            &self,
            collection: Collection,
            filter: Filter,
        ) -> BoxFuture<'static, StorageResult<Option<Record>>> {
            self.inner.find_one(collection, filter)
        }

        fn find_many(
            &self,
            collection: Collection,
            filter: Filter,
        ) -> BoxFuture<'static, StorageResult<Vec<Record>>> {
            GameStore::find_many(&self.inner, collection, filter)
        }

        fn insert_user(
            &self,
            user: UserEntity,
        ) -> BoxFuture<'static, StorageResult<InsertOutcome>> {
            GameStore::insert_user(&self.inner, user)
        }

        fn insert_match(
            &self,
            game: MatchEntity,
        ) -> BoxFuture<'static, StorageResult<InsertOutcome>> {
            GameStore::insert_match(&self.inner, game)
        }

        fn find_match(
            &self,
            title: String,
        ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
            GameStore::find_match(&self.inner, title)
        }

        fn try_join_match(
            &self,
            _title: String,
            _player: String,
        ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
            self.join_calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(None) })
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.health_check()
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.try_reconnect()
        }

        fn shutdown(&self) -> BoxFuture<'static, ()> {
            self.inner.shutdown()
        }
    }

    fn account(username: &str, password: &str) -> CreateAccountRequest {
        CreateAccountRequest {
            username: username.into(),
            password: password.into(),
        }
    }

    fn new_match(title: &str) -> CreateMatchRequest {
        CreateMatchRequest {
            title: title.into(),
        }
    }

    fn join(title: &str, player: &str) -> JoinMatchRequest {
        JoinMatchRequest {
            title: title.into(),
            player: player.into(),
        }
    }

    #[tokio::test]
    async fn account_stores_salted_digest() {
        let (state, _) = setup();
        create_account(&state, account("alice", "hunter2"))
            .await
            .unwrap();

        let stored = find_user(&state, "alice").await.unwrap().unwrap();
        assert_eq!(
            stored.password,
            credentials::hash_password(&stored.salt, "hunter2")
        );
        assert_ne!(stored.password, "hunter2");
        assert_ne!(stored.salt, "hunter2");
        assert!(verify_credentials(&state, "alice", "hunter2").await.unwrap());
        assert!(!verify_credentials(&state, "alice", "nope").await.unwrap());
        assert!(!verify_credentials(&state, "bob", "hunter2").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_accounts_get_distinct_salts() {
        let (state, _) = setup();
        create_account(&state, account("alice", "same")).await.unwrap();
        create_account(&state, account("alice", "same")).await.unwrap();

        let users: Vec<UserEntity> =
            lookup_many(&state, Collection::Users, Filter::by_username("alice"))
                .await
                .unwrap()
                .into_iter()
                .filter_map(Record::into_user)
                .collect();

        assert_eq!(users.len(), 2);
        assert_ne!(users[0].salt, users[1].salt);
        assert_ne!(users[0].password, users[1].password);
    }

    #[tokio::test]
    async fn created_match_is_empty() {
        let (state, _) = setup();
        create_match(&state, new_match("arena")).await.unwrap();

        let record = lookup_one(&state, Collection::Games, Filter::by_id("arena"))
            .await
            .unwrap()
            .and_then(Record::into_match)
            .unwrap();

        assert_eq!(record.num_players, 0);
        assert!(record.players.is_empty());
        assert!(!record.open);
    }

    #[tokio::test]
    async fn duplicate_match_title_is_a_conflict() {
        let (state, _) = setup();
        create_match(&state, new_match("arena")).await.unwrap();

        let outcome: Outcome = create_match(&state, new_match("arena")).await.into();
        assert_eq!(outcome, Outcome::failed(MATCH_EXISTS_MESSAGE));
    }

    #[tokio::test]
    async fn first_join_takes_a_seat() {
        let (state, _) = setup();
        create_match(&state, new_match("arena")).await.unwrap();

        let game = match join_match(&state, join("arena", "alice")).await.unwrap() {
            JoinStatus::Joined(game) => game,
            other => panic!("expected a fresh join, got {other:?}"),
        };
        assert_eq!(game.num_players, 1);
        assert_eq!(game.players, vec!["alice".to_owned()]);
    }

    #[tokio::test]
    async fn rejoining_is_idempotent() {
        let (state, _) = setup();
        create_match(&state, new_match("arena")).await.unwrap();
        join_match(&state, join("arena", "alice")).await.unwrap();

        let outcome: Outcome = join_match(&state, join("arena", "alice")).await.into();
        assert_eq!(outcome, Outcome::ok());

        let game = find_match(&state, "arena").await.unwrap().unwrap();
        assert_eq!(game.num_players, 1);
        assert_eq!(game.players, vec!["alice".to_owned()]);
    }

    #[tokio::test]
    async fn full_match_rejects_newcomers() {
        let (state, _) = setup();
        create_match(&state, new_match("arena")).await.unwrap();
        join_match(&state, join("arena", "alice")).await.unwrap();
        join_match(&state, join("arena", "bob")).await.unwrap();

        let outcome: Outcome = join_match(&state, join("arena", "carol")).await.into();
        assert_eq!(outcome, Outcome::failed("Match is full."));
    }

    #[tokio::test]
    async fn fullness_is_checked_before_membership() {
        let (state, store) = setup();
        store.put_match(MatchEntity {
            id: "arena".into(),
            open: false,
            num_players: 2,
            players: vec!["alice".into(), "bob".into()],
        });

        let outcome: Outcome = join_match(&state, join("arena", "alice")).await.into();
        assert_eq!(outcome, Outcome::failed(MATCH_FULL_MESSAGE));
    }

    #[tokio::test]
    async fn unknown_match_is_reported() {
        let (state, _) = setup();
        let outcome: Outcome = join_match(&state, join("nowhere", "alice")).await.into();
        assert_eq!(outcome, Outcome::failed("Match does not exist."));
    }

    #[tokio::test]
    async fn unreachable_store_is_an_infrastructure_error() {
        let (state, store) = setup();
        store.set_online(false);

        let err = join_match(&state, join("arena", "alice")).await.unwrap_err();
        assert!(err.is_infrastructure());
        assert_eq!(err.user_message(), UNREACHABLE_MESSAGE);

        let err = lookup_one(&state, Collection::Games, Filter::new())
            .await
            .unwrap_err();
        assert!(err.is_infrastructure());
    }

    #[tokio::test]
    async fn degraded_state_rejects_every_operation() {
        let state = AppState::new();
        let outcome: Outcome = create_account(&state, account("alice", "pw")).await.into();
        assert_eq!(outcome, Outcome::failed(UNREACHABLE_MESSAGE));
        assert!(matches!(
            list_matches(&state).await,
            Err(GameStoreError::Degraded)
        ));
    }

    #[tokio::test]
    async fn invalid_arguments_never_reach_the_store() {
        let (state, _) = setup();
        let err = create_match(&state, new_match("")).await.unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::InvalidInput(_))));
        assert!(list_matches(&state).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_never_overfill() {
        for round in 0..50 {
            let (state, _) = setup();
            let title = format!("arena-{round}");
            create_match(&state, new_match(&title)).await.unwrap();
            join_match(&state, join(&title, "alice")).await.unwrap();

            let first = tokio::spawn({
                let state = state.clone();
                let request = join(&title, "bob");
                async move { join_match(&state, request).await }
            });
            let second = tokio::spawn({
                let state = state.clone();
                let request = join(&title, "carol");
                async move { join_match(&state, request).await }
            });

            let results = [first.await.unwrap(), second.await.unwrap()];
            let joined = results.iter().filter(|result| result.is_ok()).count();
            assert_eq!(joined, 1, "round {round}: {results:?}");

            let game = find_match(&state, &title).await.unwrap().unwrap();
            assert_eq!(game.num_players, 2);
            assert_eq!(game.players.len(), 2);
        }
    }

    #[tokio::test]
    async fn rejected_account_write_is_transient() {
        let (state, store) = setup();
        store.set_rejecting_writes(true);

        let err = create_account(&state, account("alice", "pw")).await.unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::Transient(_))));
        assert_eq!(
            Outcome::from(Err::<(), _>(err)),
            Outcome::failed(CREATE_ACCOUNT_FAILED_MESSAGE)
        );
        assert!(find_user(&state, "alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejected_match_write_is_transient() {
        let (state, store) = setup();
        store.set_rejecting_writes(true);

        let outcome: Outcome = create_match(&state, new_match("arena")).await.into();
        assert_eq!(outcome, Outcome::failed(CREATE_MATCH_FAILED_MESSAGE));
        assert!(list_matches(&state).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_join_write_is_transient() {
        let (state, store) = setup();
        create_match(&state, new_match("arena")).await.unwrap();
        store.set_rejecting_writes(true);

        let outcome: Outcome = join_match(&state, join("arena", "alice")).await.into();
        assert_eq!(outcome, Outcome::failed(JOIN_FAILED_MESSAGE));

        let game = find_match(&state, "arena").await.unwrap().unwrap();
        assert_eq!(game.num_players, 0);
        assert!(game.players.is_empty());
    }

    #[tokio::test]
    async fn endlessly_contended_join_gives_up() {
        let store = ContendedStore::default();
        store.inner.put_match(MatchEntity::new("arena"));
        let state = AppState::with_store(Arc::new(store.clone()));

        let err = join_match(&state, join("arena", "alice")).await.unwrap_err();
        assert!(matches!(
            err.domain(),
            Some(DomainError::Transient(message)) if message == JOIN_FAILED_MESSAGE
        ));
        assert_eq!(store.join_calls.load(Ordering::SeqCst), JOIN_ATTEMPTS);
    }

    #[tokio::test]
    async fn length_limits_are_inclusive() {
        let (state, _) = setup();

        create_account(&state, account(&"u".repeat(64), &"p".repeat(256)))
            .await
            .unwrap();
        let err = create_account(&state, account(&"u".repeat(65), "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::InvalidInput(_))));
        let err = create_account(&state, account("alice", &"p".repeat(257)))
            .await
            .unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::InvalidInput(_))));

        let title = "t".repeat(128);
        create_match(&state, new_match(&title)).await.unwrap();
        let err = create_match(&state, new_match(&"t".repeat(129)))
            .await
            .unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::InvalidInput(_))));

        join_match(&state, join(&title, &"a".repeat(64))).await.unwrap();
        let err = join_match(&state, join(&title, &"a".repeat(65)))
            .await
            .unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::InvalidInput(_))));
        assert_eq!(find_match(&state, &title).await.unwrap().unwrap().num_players, 1);
    }
}
