use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Maximum number of players a match accepts.
pub const MAX_PLAYERS: i32 = 2;

/// Logical collections exposed by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Player accounts.
    Users,
    /// Matches, keyed by their title.
    Games,
}

impl Collection {
    /// Name of the collection in the backing database.
    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Games => "games",
        }
    }
}

/// Registered player account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    /// Case-sensitive login name.
    pub username: String,
    /// Hex encoded SHA-256 digest of `salt + password`.
    pub password: String,
    /// Per-account random salt.
    pub salt: String,
}

/// Two-player match identified by its title.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntity {
    /// Match title, used as the primary key.
    pub id: String,
    /// Owned by callers outside this crate; always created as `false`.
    pub open: bool,
    /// Number of joined players, never above [`MAX_PLAYERS`].
    pub num_players: i32,
    /// Joined player names in join order.
    pub players: Vec<String>,
}

impl MatchEntity {
    /// Fresh, empty match.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: title.into(),
            open: false,
            num_players: 0,
            players: Vec::new(),
        }
    }

    /// Whether no further player can join.
    pub fn is_full(&self) -> bool {
        self.num_players >= MAX_PLAYERS
    }

    /// Whether `player` already appears in the roster.
    pub fn has_player(&self, player: &str) -> bool {
        self.players.iter().any(|name| name == player)
    }
}

/// Document returned by the generic lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Record {
    /// Document from [`Collection::Users`].
    User(UserEntity),
    /// Document from [`Collection::Games`].
    Match(MatchEntity),
}

impl Record {
    /// Borrow the user document, if this is one.
    pub fn as_user(&self) -> Option<&UserEntity> {
        match self {
            Record::User(user) => Some(user),
            Record::Match(_) => None,
        }
    }

    /// Borrow the match document, if this is one.
    pub fn as_match(&self) -> Option<&MatchEntity> {
        match self {
            Record::Match(game) => Some(game),
            Record::User(_) => None,
        }
    }

    /// Take the user document, if this is one.
    pub fn into_user(self) -> Option<UserEntity> {
        match self {
            Record::User(user) => Some(user),
            Record::Match(_) => None,
        }
    }

    /// Take the match document, if this is one.
    pub fn into_match(self) -> Option<MatchEntity> {
        match self {
            Record::Match(game) => Some(game),
            Record::User(_) => None,
        }
    }
}

/// Scalar value a filter field must equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// String comparison.
    Str(String),
    /// Integer comparison.
    Int(i64),
    /// Boolean comparison.
    Bool(bool),
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Str(value.to_owned())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Str(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Int(value.into())
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

/// Equality filter: every listed field must match its value.
///
/// Field names are the stored document names (`_id`, `numPlayers`, ...). An empty filter
/// matches every document. A scalar value matches an array field when any element equals it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(IndexMap<String, FilterValue>);

impl Filter {
    /// Empty filter matching everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter selecting a match by title.
    pub fn by_id(title: impl Into<String>) -> Self {
        Self::new().with("_id", FilterValue::Str(title.into()))
    }

    /// Filter selecting users by name.
    pub fn by_username(username: impl Into<String>) -> Self {
        Self::new().with("username", FilterValue::Str(username.into()))
    }

    /// Add an equality condition, replacing any previous condition on the same field.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Iterate the conditions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.0.iter().map(|(field, value)| (field.as_str(), value))
    }

    /// Whether the filter has no conditions.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
