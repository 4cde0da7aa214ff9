/// Persisted model definitions.
pub mod models;
/// Persistence gateway for sessions, leaderboard archives and question sets.
pub mod session_store;
/// Storage abstraction layer errors.
pub mod storage;
