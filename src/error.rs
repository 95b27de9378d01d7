use thiserror::Error;

/// Main error type for Kintree
#[derive(Error, Debug)]
pub enum KintreeError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Person record not found
    #[error("Person not found: {0}")]
    PersonNotFound(i64),

    /// Parent-child relation not found
    #[error("Relation not found: parent {parent_id}, child {child_id}")]
    RelationNotFound { parent_id: i64, child_id: i64 },

    /// Parent-child relation already recorded
    #[error("Relation already exists: parent {parent_id}, child {child_id}")]
    RelationExists { parent_id: i64, child_id: i64 },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using KintreeError
pub type Result<T> = std::result::Result<T, KintreeError>;
