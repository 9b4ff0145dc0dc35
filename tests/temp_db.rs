mod common;

use std::panic::{self, AssertUnwindSafe};

use common::{MockDatabase, MOCK_CONNECTION_STRING};
use tempdb::{Database, TempDb};

#[test]
fn creates_db_during_construction() {
    let (mock, counts) = MockDatabase::new();

    let _temp = TempDb::new(mock).unwrap();

    assert_eq!(counts.creates(), 1);
    assert_eq!(counts.drops(), 0);
}

#[test]
fn drops_database_when_closed() {
    let (mock, counts) = MockDatabase::new();
    let temp = TempDb::new(mock).unwrap();

    assert_eq!(counts.creates(), 1);
    assert_eq!(counts.drops(), 0);

    temp.close().unwrap();

    assert_eq!(counts.creates(), 1);
    assert_eq!(counts.drops(), 1);
}

#[test]
fn drops_database_when_out_of_scope() {
    let (mock, counts) = MockDatabase::new();
    {
        let _temp = TempDb::new(mock).unwrap();
        assert_eq!(counts.drops(), 0);
    }
    assert_eq!(counts.drops(), 1);
}

#[test]
fn drops_database_when_test_body_panics() {
    let (mock, counts) = MockDatabase::new();

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let _temp = TempDb::new(mock).unwrap();
        panic!("test body failed");
    }));

    assert!(result.is_err());
    assert_eq!(counts.drops(), 1);
}

#[test]
fn failed_create_is_never_dropped() {
    let (mock, counts) = MockDatabase::failing_create();

    let result = TempDb::new(mock);

    assert!(result.is_err());
    let err_msg = format!("{}", result.unwrap_err());
    assert!(err_msg.contains("create failed"), "Error: {}", err_msg);
    assert_eq!(counts.creates(), 1);
    assert_eq!(counts.drops(), 0);
}

#[test]
fn close_propagates_drop_failure() {
    let (mock, counts) = MockDatabase::failing_drop();
    let temp = TempDb::new(mock).unwrap();

    let result = temp.close();

    assert!(result.is_err());
    assert_eq!(counts.drops(), 1);
}

#[test]
fn drop_failure_out_of_scope_does_not_panic() {
    common::init_tracing();
    let (mock, counts) = MockDatabase::failing_drop();
    {
        let _temp = TempDb::new(mock).unwrap();
    }
    assert_eq!(counts.drops(), 1);
}

#[test]
fn connection_string_returns_database_connection_string() {
    let (mock, _counts) = MockDatabase::new();
    let temp = TempDb::new(mock).unwrap();

    assert_eq!(temp.connection_string(), MOCK_CONNECTION_STRING);
    assert_eq!(temp.connection_string(), temp.database().connection_string());
}

#[test]
fn wraps_boxed_database() {
    let (mock, counts) = MockDatabase::new();
    let boxed: Box<dyn Database> = Box::new(mock);

    let temp = TempDb::new(boxed).unwrap();
    assert_eq!(temp.connection_string(), MOCK_CONNECTION_STRING);
    drop(temp);

    assert_eq!(counts.creates(), 1);
    assert_eq!(counts.drops(), 1);
}
