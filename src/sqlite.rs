use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{debug, info};

use crate::connection_string::ConnectionString;
use crate::database::{remove_file_if_exists, resolve_file_name, Database};
use crate::error::{Result, TempDbError};

/// Extension of SQLite database files.
pub const FILE_EXTENSION: &str = "db";

/// Files SQLite may leave next to the main database file.
const SIDECAR_SUFFIXES: [&str; 3] = ["-wal", "-shm", "-journal"];

/// A file-backed SQLite database. SQLite has no server, so creating and
/// dropping is a matter of initializing and deleting files.
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    database_name: String,
    file_name: PathBuf,
}

impl SqliteDatabase {
    /// A database stored in `<name>.db` in the current directory.
    pub fn new(database_name: &str) -> Result<Self> {
        Self::with_file_name(database_name, format!("{}.{}", database_name, FILE_EXTENSION))
    }

    /// Relative file names are resolved against the current directory now.
    /// The path must be valid UTF-8 so the connection string names the same file.
    pub fn with_file_name(database_name: &str, file_name: impl AsRef<Path>) -> Result<Self> {
        let file_name = resolve_file_name(file_name)?;
        if file_name.to_str().is_none() {
            return Err(TempDbError::Parse(format!(
                "SQLite file name is not valid UTF-8: {}",
                file_name.display()
            )));
        }
        Ok(SqliteDatabase {
            database_name: database_name.to_string(),
            file_name,
        })
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// Absolute path of the database file.
    pub fn file_name(&self) -> &Path {
        &self.file_name
    }

    /// Open a connection to this database.
    pub fn connect(&self) -> Result<Connection> {
        init_connection(&self.file_name)
    }

    fn sidecar_files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        SIDECAR_SUFFIXES.iter().map(move |suffix| {
            let mut name = self.file_name.clone().into_os_string();
            name.push(suffix);
            PathBuf::from(name)
        })
    }
}

impl Database for SqliteDatabase {
    fn create_database(&mut self) -> Result<()> {
        self.drop_database()?;

        debug!(database = %self.database_name, file = %self.file_name.display(), "Creating database");
        let conn = init_connection(&self.file_name)?;
        conn.close().map_err(|(_, e)| TempDbError::Sqlite(e))?;
        info!(database = %self.database_name, "Created SQLite database");
        Ok(())
    }

    fn drop_database(&mut self) -> Result<()> {
        debug!(database = %self.database_name, "Dropping database");
        remove_file_if_exists(&self.file_name);
        for sidecar in self.sidecar_files() {
            remove_file_if_exists(&sidecar);
        }
        info!(database = %self.database_name, "Dropped SQLite database");
        Ok(())
    }

    fn connection_string(&self) -> String {
        ConnectionString::new()
            .data_source(self.file_name.to_string_lossy())
            .to_string()
    }
}

/// Open a connection from a `Data Source=<path>` connection string.
pub fn open(connection_string: &str) -> Result<Connection> {
    let parsed: ConnectionString = connection_string.parse()?;
    let path = parsed.get_data_source().ok_or_else(|| {
        TempDbError::Parse("SQLite connection string has no Data Source".to_string())
    })?;
    init_connection(Path::new(path))
}

// Writing the journal mode materializes the file on disk.
fn init_connection(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    conn.execute_batch("PRAGMA synchronous=NORMAL;")?;
    Ok(conn)
}
