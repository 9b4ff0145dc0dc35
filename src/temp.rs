//! Scoped databases: created on construction, dropped when the scope ends.
use std::ops::Deref;

use tracing::error;

use crate::database::Database;
use crate::error::Result;
use crate::localdb::LocalDbDatabase;
use crate::sqlite::SqliteDatabase;

/// Owns a [`Database`], creating it in [`TempDb::new`] and dropping it exactly
/// once, either through [`TempDb::close`] or when the value goes out of scope.
///
/// Prefer `close` where a failed drop should fail the caller: `Drop` cannot
/// return errors, so there a failure is only logged.
#[derive(Debug)]
pub struct TempDb<D: Database> {
    database: D,
    released: bool,
}

impl<D: Database> TempDb<D> {
    /// Take ownership of `database` and create it. If creation fails the
    /// database is not considered acquired and will not be dropped.
    pub fn new(mut database: D) -> Result<Self> {
        database.create_database()?;
        Ok(TempDb {
            database,
            released: false,
        })
    }

    pub fn connection_string(&self) -> String {
        self.database.connection_string()
    }

    pub fn database(&self) -> &D {
        &self.database
    }

    /// Drop the database now, returning any error from the engine.
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.database.drop_database()
    }
}

impl<D: Database> Drop for TempDb<D> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            error!(error = %e, "Failed to drop temporary database");
        }
    }
}

/// A LocalDB database on the default instance, named `database_name`.
#[derive(Debug)]
pub struct TempLocalDb(TempDb<LocalDbDatabase>);

impl TempLocalDb {
    pub fn new(database_name: &str) -> Result<Self> {
        Ok(TempLocalDb(TempDb::new(LocalDbDatabase::new(database_name)?)?))
    }

    pub fn close(self) -> Result<()> {
        self.0.close()
    }
}

impl Deref for TempLocalDb {
    type Target = TempDb<LocalDbDatabase>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A SQLite database stored in `<database_name>.db` in the current directory.
#[derive(Debug)]
pub struct TempSqliteDb(TempDb<SqliteDatabase>);

impl TempSqliteDb {
    pub fn new(database_name: &str) -> Result<Self> {
        Ok(TempSqliteDb(TempDb::new(SqliteDatabase::new(database_name)?)?))
    }

    pub fn close(self) -> Result<()> {
        self.0.close()
    }
}

impl Deref for TempSqliteDb {
    type Target = TempDb<SqliteDatabase>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
