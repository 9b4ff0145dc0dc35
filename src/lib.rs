pub mod connection_string;
pub mod database;
pub mod error;
pub mod localdb;
pub mod session;
pub mod sqlite;
pub mod temp;

pub use database::Database;
pub use error::{Result, TempDbError};
pub use localdb::LocalDbDatabase;
pub use sqlite::SqliteDatabase;
pub use temp::{TempDb, TempLocalDb, TempSqliteDb};
