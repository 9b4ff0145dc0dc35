use thiserror::Error;
use tiberius::error::Error as SqlError;

#[derive(Error, Debug)]
pub enum TempDbError {
    #[error("Could not connect to database engine: {0}")]
    Connect(#[source] SqlError),

    #[error("LocalDB instance '{instance}' is unavailable: {message}")]
    LocalDbInstance { instance: String, message: String },

    #[error("SQL statement failed: {0}")]
    Statement(#[source] SqlError),

    #[error("Could not close database session: {0}")]
    Close(#[source] SqlError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid connection string: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, TempDbError>;
