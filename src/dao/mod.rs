/// Database model definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
/// Timer and record persistence backends.
pub mod timer_store;
