use mongodb::error::{Error as MongoError, ErrorKind, WriteError, WriteFailure};
use thiserror::Error;

/// Convenient result alias returning [`MongoDaoError`] failures.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Server error code for a unique index violation.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Failures that can occur while interacting with MongoDB.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// Connection string could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// Offending URI.
        uri: String,
        /// Driver failure.
        #[source]
        source: MongoError,
    },
    /// Client could not be built from the parsed options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Driver failure.
        #[source]
        source: MongoError,
    },
    /// Server never answered the initial ping.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Number of pings sent.
        attempts: u32,
        /// Last driver failure.
        #[source]
        source: MongoError,
    },
    /// Periodic ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Driver failure.
        #[source]
        source: MongoError,
    },
    /// Index creation failed.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Collection name.
        collection: &'static str,
        /// Indexed field list.
        index: &'static str,
        /// Driver failure.
        #[source]
        source: MongoError,
    },
    /// Query against a collection failed.
    #[error("failed to query collection `{collection}`")]
    Query {
        /// Collection name.
        collection: &'static str,
        /// Driver failure.
        #[source]
        source: MongoError,
    },
    /// User insert failed.
    #[error("failed to insert user `{username}`")]
    InsertUser {
        /// Rejected username.
        username: String,
        /// Driver failure.
        #[source]
        source: MongoError,
    },
    /// Match insert failed.
    #[error("failed to insert match `{title}`")]
    InsertMatch {
        /// Rejected match title.
        title: String,
        /// Driver failure.
        #[source]
        source: MongoError,
    },
    /// Conditional join update failed.
    #[error("failed to add `{player}` to match `{title}`")]
    JoinMatch {
        /// Match title.
        title: String,
        /// Joining player.
        player: String,
        /// Driver failure.
        #[source]
        source: MongoError,
    },
}

impl MongoDaoError {
    /// Whether the failure means MongoDB could not be reached.
    pub fn is_connectivity(&self) -> bool {
        match self {
            MongoDaoError::InvalidUri { .. }
            | MongoDaoError::ClientConstruction { .. }
            | MongoDaoError::InitialPing { .. }
            | MongoDaoError::HealthPing { .. } => true,
            MongoDaoError::EnsureIndex { source, .. }
            | MongoDaoError::Query { source, .. }
            | MongoDaoError::InsertUser { source, .. }
            | MongoDaoError::InsertMatch { source, .. }
            | MongoDaoError::JoinMatch { source, .. } => is_connectivity_error(source),
        }
    }
}

/// Server selection, socket and pool failures mean the server is out of reach.
pub fn is_connectivity_error(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::ConnectionPoolCleared { .. }
    )
}

/// Whether the write was rejected by a unique index.
pub fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(WriteError {
            code: DUPLICATE_KEY_CODE,
            ..
        }))
    )
}
