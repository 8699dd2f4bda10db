/// Game record and alias storage backends.
pub mod game_store;
/// Persisted model definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
