//! Data-access layer for a two-player game backend: accounts with salted password digests,
//! matches, and race-free match joining over MongoDB or an in-memory store.

pub mod config;
/// Persistence models and backends.
pub mod dao;
/// Operation arguments.
pub mod dto;
/// Error tiers and the uniform operation outcome.
pub mod error;
/// Store façade and connection supervision.
pub mod services;
/// Shared application state.
pub mod state;
pub mod telemetry;

pub use config::AppConfig;
pub use error::{DomainError, GameStoreError, Outcome};
pub use state::{AppState, SharedState};
