use std::time::Duration;

use mongodb::{Client, Database, bson::doc};
use tokio::time::sleep;
use tracing::debug;

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
};

/// Backoff applied while waiting for the first ping of a new client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectRetry {
    /// Pings sent before giving up; at least one is always sent.
    pub attempts: u32,
    /// Pause after the first failed ping.
    pub initial_delay: Duration,
    /// Ceiling for the doubling pause.
    pub max_delay: Duration,
}

impl Default for ConnectRetry {
    fn default() -> Self {
        Self {
            attempts: 10,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl ConnectRetry {
    /// Pauses taken between consecutive pings, one fewer than the attempts.
    fn delays(self) -> impl Iterator<Item = Duration> {
        let max_delay = self.max_delay;
        std::iter::successors(Some(self.initial_delay.min(max_delay)), move |delay| {
            Some((*delay * 2).min(max_delay))
        })
        .take(self.attempts.saturating_sub(1) as usize)
    }
}

/// Build the shared client for `config` and wait until the server answers a ping.
pub async fn open_client(config: &MongoConfig) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(config.options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(&config.database_name);

    let mut delays = config.retry.delays();
    let mut attempts = 0;

    loop {
        attempts += 1;
        let err = match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => return Ok((client, database)),
            Err(err) => err,
        };
        let Some(delay) = delays.next() else {
            return Err(MongoDaoError::InitialPing {
                attempts,
                source: err,
            });
        };
        debug!(attempts, ?delay, error = %err, "MongoDB ping failed; retrying");
        sleep(delay).await;
    }
}
