use mongodb::options::ClientOptions;

use super::{
    connection::ConnectRetry,
    error::{MongoDaoError, MongoResult},
};

/// Database used when none is configured.
pub const DEFAULT_DATABASE: &str = "tictactoe";

/// Parsed driver options plus the target database name.
#[derive(Clone)]
pub struct MongoConfig {
    /// Driver options parsed from the connection string.
    pub options: ClientOptions,
    /// Database holding the `users` and `games` collections.
    pub database_name: String,
    /// Backoff for the first ping of every new client.
    pub retry: ConnectRetry,
}

impl MongoConfig {
    /// Parse `uri` and pick `db_name`, defaulting to [`DEFAULT_DATABASE`].
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> MongoResult<Self> {
        let database_name = db_name.unwrap_or(DEFAULT_DATABASE).to_owned();
        let options =
            ClientOptions::parse(uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: uri.to_owned(),
                    source,
                })?;

        Ok(Self {
            options,
            database_name,
            retry: ConnectRetry::default(),
        })
    }

    /// Replace the number of pings sent before a new client is abandoned.
    pub fn with_connect_attempts(mut self, attempts: u32) -> Self {
        self.retry.attempts = attempts;
        self
    }
}
