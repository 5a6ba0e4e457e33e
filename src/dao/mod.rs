/// Database model definitions.
pub mod models;
/// Remote participant table backends and their shared abstraction.
pub mod participant_table;
/// Storage abstraction layer for database operations.
pub mod storage;
