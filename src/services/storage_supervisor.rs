use std::{future::Future, sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::sleep};
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    dao::{
        game_store::{self, GameStore},
        storage::StorageError,
    },
    state::SharedState,
};

/// Timing knobs of the supervisor loop.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorSettings {
    /// First backoff delay after a failure.
    pub initial_delay: Duration,
    /// Backoff ceiling.
    pub max_delay: Duration,
    /// Pause between health checks of a healthy store.
    pub health_poll_interval: Duration,
    /// Reconnect attempts after a failed health check before reconnecting from scratch.
    pub max_reconnect_attempts: u32,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_secs(10),
            health_poll_interval: Duration::from_secs(5),
            max_reconnect_attempts: 3,
        }
    }
}

/// Spawn the supervisor for the backend selected by `config`.
pub fn spawn(state: SharedState, config: AppConfig) -> JoinHandle<()> {
    let config = Arc::new(config);
    tokio::spawn(run(state, move || {
        let config = Arc::clone(&config);
        async move { game_store::connect(&config).await }
    }))
}

/// Reconnect to the storage backend and keep the shared state in degraded mode when it is unavailable.
pub async fn run<F, Fut>(state: SharedState, connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn GameStore>, StorageError>> + Send,
{
    run_with(state, SupervisorSettings::default(), connect).await
}

/// [`run`] with explicit timings.
pub async fn run_with<F, Fut>(state: SharedState, settings: SupervisorSettings, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn GameStore>, StorageError>> + Send,
{
    let mut delay = settings.initial_delay;

    loop {
        match connect().await {
            Ok(store) => {
                state.install_game_store(store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                delay = settings.initial_delay;

                loop {
                    match store.health_check().await {
                        Ok(()) => {
                            if state.is_degraded() {
                                info!("storage healthy again; leaving degraded mode");
                                state.update_degraded(false);
                            }
                            sleep(settings.health_poll_interval).await;
                        }
                        Err(err) => {
                            warn!(error = %err, "storage health check failed");
                            if reconnect(&state, store.as_ref(), &settings).await {
                                state.update_degraded(false);
                                sleep(settings.health_poll_interval).await;
                                continue;
                            }
                            warn!("exhausted storage reconnect attempts; staying in degraded mode");
                            break;
                        }
                    }
                }

                state.clear_game_store().await;
                store.shutdown().await;
                sleep(delay).await;
                delay = (delay * 2).min(settings.max_delay);
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(settings.max_delay);
            }
        }
    }
}

/// Retry the store's own reconnect, entering degraded mode after the first failure.
async fn reconnect(
    state: &SharedState,
    store: &dyn GameStore,
    settings: &SupervisorSettings,
) -> bool {
    let mut reconnect_delay = settings.initial_delay;

    for attempt in 0..settings.max_reconnect_attempts {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnection succeeded after health check failure");
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(
                        attempt, error = %err,
                        "storage reconnect first attempt failed; entering degraded mode"
                    );
                    state.update_degraded(true);
                } else {
                    warn!(attempt, error = %err, "storage reconnect attempt failed");
                }
                sleep(reconnect_delay).await;
                reconnect_delay = (reconnect_delay * 2).min(settings.max_delay);
            }
        }
    }

    false
}
