mod config;
/// Client bootstrap and first-ping backoff.
pub mod connection;
mod error;
mod models;
/// [`MongoGameStore`] implementation.
pub mod store;

pub use config::MongoConfig;
pub use connection::ConnectRetry;
pub use error::{MongoDaoError, MongoResult};
pub use store::MongoGameStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        if err.is_connectivity() {
            StorageError::unavailable(err.to_string(), err)
        } else {
            StorageError::operation(err.to_string(), err)
        }
    }
}
