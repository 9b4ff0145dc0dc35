#![allow(dead_code)]

use std::cell::Cell;
use std::fmt;
use std::io;
use std::rc::Rc;

use tempdb::{Database, Result, TempDbError};

/// Install a test-writer subscriber so `tracing` output shows up under `--nocapture`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Create a table, insert one row and count it through `conn`.
pub fn assert_usable_sqlite(conn: &rusqlite::Connection) {
    conn.execute_batch("CREATE TABLE Person (Name varchar(32) not null);")
        .unwrap();
    conn.execute("INSERT INTO Person (Name) VALUES ('Bob')", [])
        .unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM Person", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

pub const MOCK_CONNECTION_STRING: &str = "MockConnectionString";

/// Shared call counters, readable after the mock has been moved into a `TempDb`.
#[derive(Clone, Default)]
pub struct CallCounts {
    creates: Rc<Cell<usize>>,
    drops: Rc<Cell<usize>>,
}

impl CallCounts {
    pub fn creates(&self) -> usize {
        self.creates.get()
    }

    pub fn drops(&self) -> usize {
        self.drops.get()
    }
}

impl fmt::Debug for CallCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallCounts")
            .field("creates", &self.creates())
            .field("drops", &self.drops())
            .finish()
    }
}

/// A `Database` that records calls instead of touching an engine.
#[derive(Debug)]
pub struct MockDatabase {
    counts: CallCounts,
    fail_create: bool,
    fail_drop: bool,
}

impl MockDatabase {
    pub fn new() -> (MockDatabase, CallCounts) {
        let counts = CallCounts::default();
        let mock = MockDatabase {
            counts: counts.clone(),
            fail_create: false,
            fail_drop: false,
        };
        (mock, counts)
    }

    pub fn failing_create() -> (MockDatabase, CallCounts) {
        let (mut mock, counts) = Self::new();
        mock.fail_create = true;
        (mock, counts)
    }

    pub fn failing_drop() -> (MockDatabase, CallCounts) {
        let (mut mock, counts) = Self::new();
        mock.fail_drop = true;
        (mock, counts)
    }
}

impl Database for MockDatabase {
    fn create_database(&mut self) -> Result<()> {
        self.counts.creates.set(self.counts.creates() + 1);
        if self.fail_create {
            return Err(TempDbError::Io(io::Error::new(
                io::ErrorKind::Other,
                "create failed",
            )));
        }
        Ok(())
    }

    fn drop_database(&mut self) -> Result<()> {
        self.counts.drops.set(self.counts.drops() + 1);
        if self.fail_drop {
            return Err(TempDbError::Io(io::Error::new(
                io::ErrorKind::Other,
                "drop failed",
            )));
        }
        Ok(())
    }

    fn connection_string(&self) -> String {
        MOCK_CONNECTION_STRING.to_string()
    }
}
