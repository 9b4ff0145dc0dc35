use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::connection_string::ConnectionString;
use crate::database::{remove_file_if_exists, resolve_file_name, Database};
use crate::error::Result;
use crate::session::{SqlSession, LOCALDB_LOCATOR};

/// The LocalDB instance used when none is given.
pub const DEFAULT_INSTANCE_NAME: &str = "MSSQLLocalDB";

/// Catalog used for administrative connections.
pub const MASTER_DATABASE: &str = "master";

/// Extension of SQL Server primary data files.
pub const FILE_EXTENSION: &str = "mdf";

/// A SQL Server LocalDB database backed by a single data file.
///
/// Constructing one does no I/O; the database only exists between
/// [`Database::create_database`] and [`Database::drop_database`].
///
/// The database name is interpolated into administrative SQL as-is, so it must
/// be a safe identifier.
#[derive(Debug, Clone)]
pub struct LocalDbDatabase {
    database_name: String,
    file_name: PathBuf,
    instance_name: String,
}

impl LocalDbDatabase {
    /// A database on the default instance, stored in `<name>.mdf` in the current directory.
    pub fn new(database_name: &str) -> Result<Self> {
        Self::with_options(database_name, None, None)
    }

    /// A database on the default instance with an explicit data file.
    pub fn with_file_name(database_name: &str, file_name: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(database_name, Some(file_name.as_ref()), None)
    }

    /// Relative file names are resolved against the current directory now,
    /// not when the database is created.
    pub fn with_options(
        database_name: &str,
        file_name: Option<&Path>,
        instance_name: Option<&str>,
    ) -> Result<Self> {
        let file_name = match file_name {
            Some(path) => resolve_file_name(path)?,
            None => resolve_file_name(format!("{}.{}", database_name, FILE_EXTENSION))?,
        };
        Ok(LocalDbDatabase {
            database_name: database_name.to_string(),
            file_name,
            instance_name: instance_name.unwrap_or(DEFAULT_INSTANCE_NAME).to_string(),
        })
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    /// Absolute path of the data file.
    pub fn file_name(&self) -> &Path {
        &self.file_name
    }

    /// Connection string to the instance's `master` database.
    pub fn master_connection_string(&self) -> String {
        self.build_connection_string(MASTER_DATABASE)
    }

    fn build_connection_string(&self, catalog: &str) -> String {
        ConnectionString::new()
            .data_source(format!("{}\\{}", LOCALDB_LOCATOR, self.instance_name))
            .initial_catalog(catalog)
            .integrated_security(true)
            .to_string()
    }

    fn execute_on_master(&self, sql: &str) -> Result<()> {
        let mut session = SqlSession::connect(&self.master_connection_string())?;
        let result = session.execute(sql);
        let closed = session.close();
        settle_statement(result, closed)
    }
}

/// Combine a statement result with closing its session. A statement error wins;
/// once the statement has run, a failed close only gets logged, so a created
/// database is still reported as created.
fn settle_statement(result: Result<()>, closed: Result<()>) -> Result<()> {
    result?;
    if let Err(e) = closed {
        warn!(error = %e, "Ignoring failure to close admin session");
    }
    Ok(())
}

impl Database for LocalDbDatabase {
    fn create_database(&mut self) -> Result<()> {
        self.drop_database()?;

        debug!(database = %self.database_name, file = %self.file_name.display(), "Creating database");
        self.execute_on_master(&create_database_sql(&self.database_name, &self.file_name))?;
        info!(database = %self.database_name, instance = %self.instance_name, "Created LocalDB database");
        Ok(())
    }

    fn drop_database(&mut self) -> Result<()> {
        debug!(database = %self.database_name, "Dropping database");
        self.execute_on_master(&drop_database_sql(&self.database_name))?;
        remove_file_if_exists(&self.file_name);
        info!(database = %self.database_name, instance = %self.instance_name, "Dropped LocalDB database");
        Ok(())
    }

    fn connection_string(&self) -> String {
        self.build_connection_string(&self.database_name)
    }
}

pub(crate) fn create_database_sql(database_name: &str, file_name: &Path) -> String {
    format!(
        "CREATE DATABASE [{name}] ON PRIMARY (NAME=[{name}], FILENAME = '{file}')",
        name = database_name,
        file = file_name.display()
    )
}

/// Force other sessions off with an immediate rollback so they cannot block the drop.
pub(crate) fn drop_database_sql(database_name: &str) -> String {
    format!(
        "IF EXISTS(SELECT * FROM sys.databases where name = '{name}')\n\
         BEGIN\n    \
             ALTER DATABASE [{name}] SET SINGLE_USER WITH ROLLBACK IMMEDIATE;\n    \
             DROP DATABASE [{name}]\n\
         END",
        name = database_name
    )
}
