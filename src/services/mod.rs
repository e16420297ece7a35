/// Password salting and hashing.
pub mod credentials;
/// Account and match operations.
pub mod game_store_service;
/// Storage connection lifecycle and degraded mode.
pub mod storage_supervisor;
