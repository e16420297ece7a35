use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::dao::storage::StorageError;

/// Message reported whenever the store cannot be reached.
pub const UNREACHABLE_MESSAGE: &str = "Could not connect to database, try again.";
/// Message for a join against an unknown match.
pub const MATCH_MISSING_MESSAGE: &str = "Match does not exist.";
/// Message for a join against a match with no free seat.
pub const MATCH_FULL_MESSAGE: &str = "Match is full.";
/// Message for a failed join update.
pub const JOIN_FAILED_MESSAGE: &str = "Could not update database. Try again";
/// Message for a match title that is already taken.
pub const MATCH_EXISTS_MESSAGE: &str = "Match already exists.";
/// Message for a failed match insert.
pub const CREATE_MATCH_FAILED_MESSAGE: &str = "Could not create match. Try again";
/// Message for a username rejected by the backend as a duplicate.
pub const ACCOUNT_EXISTS_MESSAGE: &str = "Account already exists.";
/// Message for a failed account insert.
pub const CREATE_ACCOUNT_FAILED_MESSAGE: &str = "Could not create account. Try again";

/// Expected, business-level failures. The display text is the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Target document does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Request collides with current data (full match, duplicate key).
    #[error("{0}")]
    Conflict(String),
    /// Write failed; retrying may succeed.
    #[error("{0}")]
    Transient(String),
    /// Arguments rejected before reaching the store.
    #[error("{0}")]
    InvalidInput(String),
}

impl From<ValidationErrors> for DomainError {
    fn from(err: ValidationErrors) -> Self {
        DomainError::InvalidInput(format!("Invalid input: {err}"))
    }
}

/// Errors returned by the store façade.
#[derive(Debug, Error)]
pub enum GameStoreError {
    /// Storage backend failed or could not be reached.
    #[error("storage infrastructure failure")]
    Infrastructure(#[source] StorageError),
    /// No storage backend is installed (degraded mode).
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Expected business-level failure.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl GameStoreError {
    /// Whether the caller should treat this as an outage rather than a rejected request.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            GameStoreError::Infrastructure(_) | GameStoreError::Degraded
        )
    }

    /// Business-level failure, if this is one.
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            GameStoreError::Domain(err) => Some(err),
            _ => None,
        }
    }

    /// Text suitable for showing to the player.
    pub fn user_message(&self) -> String {
        match self {
            GameStoreError::Infrastructure(_) | GameStoreError::Degraded => {
                UNREACHABLE_MESSAGE.to_owned()
            }
            GameStoreError::Domain(err) => err.to_string(),
        }
    }
}

impl From<StorageError> for GameStoreError {
    fn from(err: StorageError) -> Self {
        GameStoreError::Infrastructure(err)
    }
}

/// Uniform `(success, message)` result of a mutating operation.
///
/// Successful operations carry no message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// Whether the operation took effect (or was already in effect).
    pub success: bool,
    /// Reason for a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Outcome {
    /// Successful outcome.
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// Failed outcome carrying `message`.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

impl<T> From<Result<T, GameStoreError>> for Outcome {
    fn from(result: Result<T, GameStoreError>) -> Self {
        match result {
            Ok(_) => Outcome::ok(),
            Err(err) => Outcome::failed(err.user_message()),
        }
    }
}
