use std::path::{Path, PathBuf};

use crate::error::Result;

/// How to create and drop one database. Each engine (LocalDB, SQLite, ...)
/// implements this with its own administrative commands.
pub trait Database {
    /// Create the database, replacing anything left behind under the same name.
    fn create_database(&mut self) -> Result<()>;

    /// Drop the database and delete its backing files. Succeeds when there is
    /// nothing to drop.
    fn drop_database(&mut self) -> Result<()>;

    /// Connection string for this database (not the engine's admin database).
    fn connection_string(&self) -> String;
}

impl<D: Database + ?Sized> Database for Box<D> {
    fn create_database(&mut self) -> Result<()> {
        (**self).create_database()
    }

    fn drop_database(&mut self) -> Result<()> {
        (**self).drop_database()
    }

    fn connection_string(&self) -> String {
        (**self).connection_string()
    }
}

/// Resolve a backing file name against the current directory, once.
/// Absolute paths are returned unchanged.
pub(crate) fn resolve_file_name(file_name: impl AsRef<Path>) -> Result<PathBuf> {
    let file_name = file_name.as_ref();
    if file_name.is_absolute() {
        return Ok(file_name.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(file_name))
}

/// Remove a file if it is there. Any failure is ignored: the engine's own drop
/// is authoritative and the file may be briefly locked or already gone.
pub(crate) fn remove_file_if_exists(path: &Path) {
    if path.exists() {
        let _ = std::fs::remove_file(path);
    }
}
