//! Error handling tests for the client surface
//!
//! These tests verify that misuse and backend failures come back as typed
//! [`JdbcError`] values instead of panics, and that each failure lands in the
//! right category.
//!
//! Focus areas:
//! 1. Operations on closed connections, statements and cursors
//! 2. Argument validation (indexes, sizes, flags)
//! 3. Capability checks (scroll types, concurrency, holdability)
//! 4. Syntax and backend failures
//! 5. Batch failures with partial results
//! 6. Unsupported features

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use super::test_utils::TestDb;
use crate::backend::{Backend, BackendError};
use crate::connection::{Connection, ConnectionKind, DocumentDatabase, TinkerpopGraph};
use crate::constants::*;
use crate::error::{sql_state, JdbcError};
use crate::memory::MemoryBackend;
use crate::models::TxMode;

// ============================================================================
// CLOSED OBJECTS
// ============================================================================

#[test]
fn test_closed_connection_rejects_operations() {
    let db = TestDb::document();
    db.connection.close().unwrap();
    // Closing twice is a no-op
    db.connection.close().unwrap();

    assert!(db.connection.is_closed());
    assert!(matches!(db.connection.create_statement(), Err(JdbcError::Closed(_))));
    assert!(matches!(
        db.connection.prepare_statement("SELECT FROM Item"),
        Err(JdbcError::Closed(_))
    ));
    assert!(matches!(db.connection.get_auto_commit(), Err(JdbcError::Closed(_))));
    assert!(matches!(db.connection.set_auto_commit(false), Err(JdbcError::Closed(_))));
    assert!(matches!(db.connection.commit(), Err(JdbcError::Closed(_))));
    assert!(matches!(db.connection.rollback(), Err(JdbcError::Closed(_))));
    assert!(matches!(db.connection.is_read_only(), Err(JdbcError::Closed(_))));
    assert!(matches!(db.connection.get_catalog(), Err(JdbcError::Closed(_))));
    assert!(matches!(db.connection.get_metadata(), Err(JdbcError::Closed(_))));
    assert!(!db.connection.is_valid(0).unwrap());
}

#[test]
fn test_closed_statement_rejects_operations() {
    let db = TestDb::with_items(1);
    let statement = db.connection.create_statement().unwrap();
    statement.close().unwrap();
    statement.close().unwrap();

    assert!(statement.is_closed());
    let err = statement.execute("SELECT FROM Item").unwrap_err();
    assert!(matches!(err, JdbcError::Closed(_)));
    assert!(err.to_string().contains("SELECT FROM Item"));

    assert!(matches!(statement.execute_query("SELECT FROM Item"), Err(JdbcError::Closed(_))));
    assert!(matches!(statement.execute_update("DELETE FROM Item"), Err(JdbcError::Closed(_))));
    assert!(matches!(statement.add_batch("DELETE FROM Item"), Err(JdbcError::Closed(_))));
    assert!(matches!(statement.clear_batch(), Err(JdbcError::Closed(_))));
    assert!(matches!(statement.execute_batch(), Err(JdbcError::Closed(_))));
    assert!(matches!(statement.get_result_set(), Err(JdbcError::Closed(_))));
    assert!(matches!(statement.get_update_count(), Err(JdbcError::Closed(_))));
    assert!(matches!(statement.get_connection(), Err(JdbcError::Closed(_))));
    assert!(matches!(statement.get_max_rows(), Err(JdbcError::Closed(_))));
    assert!(matches!(statement.set_max_rows(1), Err(JdbcError::Closed(_))));
    assert!(matches!(statement.get_fetch_size(), Err(JdbcError::Closed(_))));
    assert!(matches!(statement.get_result_set_type(), Err(JdbcError::Closed(_))));
}

#[test]
fn test_closing_statement_closes_its_stored_cursor() {
    let db = TestDb::with_items(2);
    let statement = db.connection.create_statement().unwrap();
    assert!(statement.execute("SELECT FROM Item").unwrap());
    let mut rs = statement.get_result_set().unwrap().unwrap();
    statement.close().unwrap();

    // A cursor already handed out stays readable
    assert!(rs.next().unwrap());
    assert!(rs.get_statement().unwrap().is_some());
}

#[test]
fn test_closed_prepared_statement_rejects_operations() {
    let db = TestDb::with_items(1);
    let prepared = db
        .connection
        .prepare_statement("SELECT FROM Item WHERE intKey = ?")
        .unwrap();
    prepared.set_int(1, 1).unwrap();
    prepared.close().unwrap();

    assert!(prepared.parameters().unwrap().is_empty());
    assert!(matches!(prepared.set_int(1, 1), Err(JdbcError::Closed(_))));
    assert!(matches!(prepared.clear_parameters(), Err(JdbcError::Closed(_))));
    assert!(matches!(prepared.execute(), Err(JdbcError::Closed(_))));
    assert!(matches!(prepared.execute_query(), Err(JdbcError::Closed(_))));
    assert!(matches!(prepared.execute_update(), Err(JdbcError::Closed(_))));
    assert!(matches!(prepared.add_batch(), Err(JdbcError::Closed(_))));
    assert!(matches!(prepared.get_metadata(), Err(JdbcError::Closed(_))));
}

#[test]
fn test_closing_a_prepared_statement_closes_its_metadata() {
    let db = TestDb::with_items(2);
    let prepared = db.connection.prepare_statement("SELECT FROM Item").unwrap();
    assert!(prepared.execute().unwrap());
    let meta = prepared.get_metadata().unwrap().unwrap();
    assert_eq!(meta.get_column_name(2).unwrap(), "intKey");

    prepared.close().unwrap();
    assert!(matches!(prepared.get_metadata(), Err(JdbcError::Closed(_))));
    assert!(matches!(meta.get_column_name(2), Err(JdbcError::Closed(_))));
}

#[test]
fn test_closed_cursor_rejects_navigation() {
    let db = TestDb::with_items(1);
    let mut rs = db
        .connection
        .create_statement()
        .unwrap()
        .execute_query("SELECT FROM Item")
        .unwrap();
    rs.close();

    let err = rs.next().unwrap_err();
    assert!(matches!(err, JdbcError::Closed(_)));
    assert_eq!(err.sql_state(), sql_state::GENERAL_ERROR);
    assert!(matches!(rs.get_metadata(), Err(JdbcError::Closed(_))));
    assert!(matches!(rs.find_column("name"), Err(JdbcError::Closed(_))));
}

// ============================================================================
// ARGUMENT VALIDATION
// ============================================================================

#[test]
fn test_empty_command_text() {
    let db = TestDb::document();
    let statement = db.connection.create_statement().unwrap();
    assert!(matches!(statement.execute(""), Err(JdbcError::Argument(_))));
    assert!(matches!(statement.execute_query("   "), Err(JdbcError::Argument(_))));
    assert!(matches!(statement.add_batch(""), Err(JdbcError::Argument(_))));
    assert!(matches!(db.connection.prepare_statement(""), Err(JdbcError::Argument(_))));
}

#[test]
fn test_query_as_update_is_rejected() {
    let db = TestDb::with_items(1);
    let statement = db.connection.create_statement().unwrap();
    let err = statement.execute_update("SELECT FROM Item").unwrap_err();
    assert!(matches!(err, JdbcError::Argument(_)));
    assert!(err.to_string().contains("SELECT FROM Item"));
    assert_eq!(statement.get_update_count().unwrap(), NO_UPDATE_RESULT);
}

#[test]
fn test_update_as_query_is_rejected() {
    let db = TestDb::with_items(1);
    let prepared = db
        .connection
        .prepare_statement("DELETE FROM Item WHERE intKey = ?")
        .unwrap();
    prepared.set_int(1, 1).unwrap();
    assert!(matches!(prepared.execute_query(), Err(JdbcError::Argument(_))));

    // The plain statement sends mutations through the query path and the
    // backend refuses them
    let statement = db.connection.create_statement().unwrap();
    assert!(matches!(
        statement.execute_query("DELETE FROM Item"),
        Err(JdbcError::Backend { .. })
    ));
    assert_eq!(db.count_items(), 1);
}

#[test]
fn test_parameter_index_below_one() {
    let db = TestDb::with_items(1);
    let prepared = db
        .connection
        .prepare_statement("SELECT FROM Item WHERE intKey = ?")
        .unwrap();
    let err = prepared.set_string(0, "x").unwrap_err();
    assert!(matches!(err, JdbcError::Argument(_)));
    assert!(matches!(prepared.set_null(-3), Err(JdbcError::Argument(_))));
}

#[test]
fn test_missing_parameter_value() {
    let db = TestDb::with_items(1);
    let prepared = db
        .connection
        .prepare_statement("SELECT FROM Item WHERE intKey = ? AND name = ?")
        .unwrap();
    prepared.set_int(1, 1).unwrap();
    assert!(matches!(
        prepared.execute_query(),
        Err(JdbcError::Backend {
            source: BackendError::Operation(_),
            ..
        })
    ));
}

#[test]
fn test_negative_sizes() {
    let db = TestDb::document();
    let statement = db.connection.create_statement().unwrap();
    assert!(matches!(statement.set_max_rows(-1), Err(JdbcError::Argument(_))));
    assert!(matches!(statement.set_fetch_size(-1), Err(JdbcError::Argument(_))));
    assert!(matches!(db.connection.is_valid(-1), Err(JdbcError::Argument(_))));
}

#[test]
fn test_unknown_codes() {
    let db = TestDb::document();
    assert!(matches!(
        db.connection.create_statement_with(42, CONCUR_READ_ONLY),
        Err(JdbcError::Argument(_))
    ));
    assert!(matches!(
        db.connection.create_statement_with(TYPE_FORWARD_ONLY, 42),
        Err(JdbcError::Argument(_))
    ));
    assert!(matches!(
        db.connection.set_transaction_isolation(3),
        Err(JdbcError::Argument(_))
    ));
    let statement = db.connection.create_statement().unwrap();
    assert!(matches!(statement.set_fetch_direction(7), Err(JdbcError::Argument(_))));
    assert!(matches!(
        statement.execute_update_with_keys("CREATE CLASS Item", 99),
        Err(JdbcError::Argument(_))
    ));
}

#[test]
fn test_missing_open_arguments() {
    let backend = Arc::new(MemoryBackend::new());
    for (url, user, password) in [("", "admin", "admin"), ("memory:x", "", "admin"), ("memory:x", "admin", "")] {
        let result = Connection::open(ConnectionKind::Document, backend.clone(), url, user, password);
        assert!(matches!(result, Err(JdbcError::Argument(_))), "{url:?} {user:?} {password:?}");
    }
}

#[test]
fn test_closed_memory_handle_is_forgotten() {
    let backend = MemoryBackend::new();
    let handle = backend.open("memory:forgotten", "admin", "admin").unwrap();
    backend.begin(&handle, TxMode::Optimistic).unwrap();
    backend.command(&handle, "CREATE CLASS Item", &[]).unwrap();

    backend.close(&handle).unwrap();
    assert!(backend.is_closed(&handle));
    assert!(matches!(backend.commit(&handle), Err(BackendError::Closed(_))));
    assert!(matches!(backend.begin(&handle, TxMode::Optimistic), Err(BackendError::Closed(_))));
    assert!(matches!(backend.class_names(&handle), Err(BackendError::Closed(_))));
    // Closing again is a no-op
    backend.close(&handle).unwrap();

    let reopened = backend.open("memory:forgotten", "admin", "admin").unwrap();
    assert!(backend.class_names(&reopened).unwrap().is_empty());
}

#[test]
fn test_commit_with_autocommit_enabled() {
    let db = TestDb::document();
    assert!(matches!(db.connection.commit(), Err(JdbcError::Argument(_))));
    assert!(matches!(db.connection.rollback(), Err(JdbcError::Argument(_))));
}

#[test]
fn test_nested_transaction_scope() {
    let db = TestDb::document();
    db.connection.set_auto_commit(false).unwrap();
    let err = db.connection.transaction().unwrap_err();
    assert_eq!(
        err,
        JdbcError::Argument("A transaction scope requires autocommit to be enabled".to_string())
    );
}

// ============================================================================
// CAPABILITIES
// ============================================================================

#[test]
fn test_unsupported_cursor_configurations() {
    let db = TestDb::with_items(1);

    let sensitive = db
        .connection
        .create_statement_with(TYPE_SCROLL_SENSITIVE, CONCUR_READ_ONLY)
        .unwrap();
    let err = sensitive.execute_query("SELECT FROM Item").unwrap_err();
    assert!(matches!(err, JdbcError::Capability(_)));
    assert!(err.to_string().contains("document"));

    let updatable = db
        .connection
        .create_statement_with(TYPE_FORWARD_ONLY, CONCUR_UPDATABLE)
        .unwrap();
    assert!(matches!(
        updatable.execute_query("SELECT FROM Item"),
        Err(JdbcError::Capability(_))
    ));

    let closing = db
        .connection
        .create_statement_with_holdability(
            TYPE_SCROLL_INSENSITIVE,
            CONCUR_READ_ONLY,
            CLOSE_CURSORS_AT_COMMIT,
        )
        .unwrap();
    assert!(matches!(
        closing.execute_query("SELECT FROM Item"),
        Err(JdbcError::Capability(_))
    ));
}

#[test]
fn test_reverse_direction_on_forward_only_statement() {
    let db = TestDb::with_items(1);
    let statement = db.connection.create_statement().unwrap();
    statement.set_fetch_direction(FETCH_REVERSE).unwrap();
    assert!(matches!(
        statement.execute_query("SELECT FROM Item"),
        Err(JdbcError::Capability(_))
    ));
}

// ============================================================================
// SYNTAX AND BACKEND FAILURES
// ============================================================================

#[test]
fn test_syntax_error() {
    let db = TestDb::document();
    let statement = db.connection.create_statement().unwrap();
    let err = statement.execute("FROB Item").unwrap_err();
    assert!(matches!(
        err,
        JdbcError::Syntax {
            source: BackendError::Parse(_),
            ..
        }
    ));
    assert_eq!(err.sql_state(), sql_state::SYNTAX_ERROR);
    assert!(err.to_string().contains("FROB Item"));

    assert!(matches!(
        statement.execute_query("SELECT FROM Item WHERE name = 'open"),
        Err(JdbcError::Syntax { .. })
    ));
}

#[test]
fn test_unknown_class() {
    let db = TestDb::document();
    let statement = db.connection.create_statement().unwrap();
    assert!(matches!(
        statement.execute_query("SELECT FROM Missing"),
        Err(JdbcError::Backend {
            source: BackendError::NotFound(_),
            ..
        })
    ));
}

#[test]
fn test_duplicate_class() {
    let db = TestDb::with_items(0);
    let statement = db.connection.create_statement().unwrap();
    let err = statement.execute_update("CREATE CLASS Item").unwrap_err();
    assert!(matches!(err, JdbcError::Backend { .. }));
    assert_eq!(err.sql_state(), sql_state::GENERAL_ERROR);
}

#[test]
fn test_unique_index_violation() {
    let db = TestDb::with_items(2);
    let statement = db.connection.create_statement().unwrap();
    statement
        .execute_update("CREATE INDEX Item.intKey UNIQUE")
        .unwrap();
    assert!(matches!(
        statement.execute_update("INSERT INTO Item SET intKey = 1, name = 'dup'"),
        Err(JdbcError::Backend { .. })
    ));
    assert_eq!(db.count_items(), 2);
}

#[test]
fn test_declared_property_conversion_failure() {
    let db = TestDb::with_items(0);
    let statement = db.connection.create_statement().unwrap();
    assert!(matches!(
        statement.execute_update("INSERT INTO Item SET intKey = 'abc'"),
        Err(JdbcError::Backend { .. })
    ));
}

#[test]
fn test_read_only_connection_rejects_mutations() {
    let db = TestDb::with_items(1);
    db.connection.set_read_only(true).unwrap();
    let statement = db.connection.create_statement().unwrap();

    assert!(statement.is_read_only());
    assert!(matches!(
        statement.execute_update("DELETE FROM Item"),
        Err(JdbcError::Argument(_))
    ));
    assert!(matches!(statement.execute("DELETE FROM Item"), Err(JdbcError::Argument(_))));
    assert!(matches!(statement.add_batch("DELETE FROM Item"), Err(JdbcError::Argument(_))));

    let prepared = db
        .connection
        .prepare_statement("DELETE FROM Item WHERE intKey = ?")
        .unwrap();
    prepared.set_int(1, 1).unwrap();
    assert!(matches!(prepared.execute_update(), Err(JdbcError::Argument(_))));

    // Queries still run
    let mut rs = statement.execute_query("SELECT FROM Item").unwrap();
    assert!(rs.next().unwrap());
    assert_eq!(db.count_items(), 1);
}

// ============================================================================
// BATCHES
// ============================================================================

#[test]
fn test_queries_cannot_be_batched() {
    let db = TestDb::with_items(1);
    let statement = db.connection.create_statement().unwrap();
    assert!(matches!(statement.add_batch("SELECT FROM Item"), Err(JdbcError::Argument(_))));

    let prepared = db
        .connection
        .prepare_statement("SELECT FROM Item WHERE intKey = ?")
        .unwrap();
    prepared.set_int(1, 1).unwrap();
    assert!(matches!(prepared.add_batch(), Err(JdbcError::Argument(_))));
}

#[test]
fn test_batch_failure_reports_partial_counts() {
    let db = TestDb::with_items(0);
    let statement = db.connection.create_statement().unwrap();
    statement
        .add_batch("INSERT INTO Item SET intKey = 1")
        .unwrap();
    statement
        .add_batch("INSERT INTO Item SET intKey = 2")
        .unwrap();
    statement.add_batch("UPDATE Missing SET a = 1").unwrap();
    statement
        .add_batch("INSERT INTO Item SET intKey = 3")
        .unwrap();

    match statement.execute_batch().unwrap_err() {
        JdbcError::Batch { message, partial } => {
            assert_eq!(partial, vec![1, 1]);
            assert!(message.contains("Batch entry 2"));
        }
        other => panic!("expected a batch error, got {other:?}"),
    }
    assert_eq!(db.count_items(), 2);

    // The queue was consumed
    assert!(statement.execute_batch().unwrap().is_empty());
}

// ============================================================================
// UNSUPPORTED FEATURES
// ============================================================================

#[test]
fn test_unsupported_connection_features() {
    let db = TestDb::document();
    let c = &db.connection;

    let unsupported: Vec<crate::error::Result<()>> = vec![
        c.prepare_call("x").map(|_| ()),
        c.native_sql("x").map(|_| ()),
        c.set_savepoint(None),
        c.release_savepoint("s"),
        c.rollback_to_savepoint("s"),
        c.set_catalog("other"),
        c.get_type_map(),
        c.set_type_map(),
        c.get_client_info("x").map(|_| ()),
        c.set_client_info("x", "y"),
        c.get_warnings(),
        c.clear_warnings(),
        c.create_blob().map(|_| ()),
        c.create_clob().map(|_| ()),
        c.create_array_of("x"),
        c.create_struct("x"),
        c.set_holdability(CLOSE_CURSORS_AT_COMMIT),
        c.set_transaction_isolation(TRANSACTION_SERIALIZABLE),
        c.prepare_statement_with_column_indexes("x", &[1]).map(|_| ()),
        c.prepare_statement_with_column_names("x", &["a"]).map(|_| ()),
        c.prepare_statement_with_keys("INSERT INTO Item SET a = 1", RETURN_GENERATED_KEYS)
            .map(|_| ()),
    ];
    for (i, result) in unsupported.into_iter().enumerate() {
        let err = result.unwrap_err();
        assert!(matches!(err, JdbcError::FeatureNotSupported(_)), "entry {i}: {err:?}");
        assert_eq!(err.sql_state(), sql_state::FEATURE_NOT_SUPPORTED);
    }
}

#[test]
fn test_unsupported_statement_features() {
    let db = TestDb::document();
    let statement = db.connection.create_statement().unwrap();

    assert!(matches!(statement.cancel(), Err(JdbcError::FeatureNotSupported(_))));
    assert!(matches!(statement.set_cursor_name("c"), Err(JdbcError::FeatureNotSupported(_))));
    assert!(matches!(
        statement.set_escape_processing(true),
        Err(JdbcError::FeatureNotSupported(_))
    ));
    assert!(matches!(statement.set_query_timeout(5), Err(JdbcError::FeatureNotSupported(_))));
    assert!(matches!(statement.set_max_field_size(5), Err(JdbcError::FeatureNotSupported(_))));
    assert!(matches!(statement.set_poolable(true), Err(JdbcError::FeatureNotSupported(_))));
    assert!(matches!(statement.get_generated_keys(), Err(JdbcError::FeatureNotSupported(_))));
    assert!(matches!(
        statement.execute_with_keys("CREATE CLASS Item", RETURN_GENERATED_KEYS),
        Err(JdbcError::FeatureNotSupported(_))
    ));

    // Their harmless counterparts succeed
    statement.set_poolable(false).unwrap();
    assert!(!statement.is_poolable().unwrap());
    assert_eq!(statement.get_query_timeout().unwrap(), 0);
    assert_eq!(statement.get_max_field_size().unwrap(), 0);
    assert!(statement.get_warnings().unwrap().is_none());
    statement.clear_warnings().unwrap();
}

#[test]
fn test_unsupported_prepared_setters() {
    let db = TestDb::with_items(0);
    let prepared = db
        .connection
        .prepare_statement("INSERT INTO Item SET name = ?")
        .unwrap();

    assert!(matches!(prepared.set_bytes(1, b"x"), Err(JdbcError::FeatureNotSupported(_))));
    assert!(matches!(prepared.set_blob(1, b"x"), Err(JdbcError::FeatureNotSupported(_))));
    assert!(matches!(prepared.set_clob(1, "x"), Err(JdbcError::FeatureNotSupported(_))));
    assert!(matches!(prepared.set_url(1, "x"), Err(JdbcError::FeatureNotSupported(_))));
    assert!(matches!(prepared.set_array(1, &[]), Err(JdbcError::FeatureNotSupported(_))));
    let mut reader: &[u8] = b"abc";
    assert!(matches!(
        prepared.set_binary_stream(1, &mut reader),
        Err(JdbcError::FeatureNotSupported(_))
    ));
    assert!(matches!(
        prepared.get_parameter_metadata(),
        Err(JdbcError::FeatureNotSupported(_))
    ));
    assert!(prepared.parameters().unwrap().is_empty());
}

// ============================================================================
// UNWRAPPING
// ============================================================================

#[test]
fn test_unwrap_to_unrelated_type() {
    let db = TestDb::document();
    assert!(db.connection.unwrap::<DocumentDatabase>().is_ok());
    assert!(!db.connection.is_wrapper_for::<TinkerpopGraph>());

    let err = db.connection.unwrap::<TinkerpopGraph>().unwrap_err();
    assert!(matches!(err, JdbcError::Unwrap(_)));
    assert!(err.to_string().contains("document"));
}
