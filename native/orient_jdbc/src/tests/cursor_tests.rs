//! Cursor tests: navigation, direction handling, field access and result
//! metadata, run against the in-memory engine.

#![allow(clippy::unwrap_used)]

use bytes::Bytes;
use rust_decimal::Decimal;
use std::str::FromStr;
use time::macros::datetime;

use super::test_utils::TestDb;
use crate::constants::*;
use crate::cursor::ResultSet;
use crate::error::JdbcError;
use crate::models::{Record, Rid, Value};
use crate::types::{FieldType, SqlType};

fn scrollable(db: &TestDb, sql: &str) -> ResultSet {
    db.connection
        .create_statement_with(TYPE_SCROLL_INSENSITIVE, CONCUR_READ_ONLY)
        .unwrap()
        .execute_query(sql)
        .unwrap()
}

fn forward_only(db: &TestDb, sql: &str) -> ResultSet {
    db.connection
        .create_statement()
        .unwrap()
        .execute_query(sql)
        .unwrap()
}

mod navigation {
    use super::*;

    #[test]
    fn test_forward_walk_ends_after_last() {
        let db = TestDb::with_items(3);
        let mut rs = forward_only(&db, "SELECT FROM Item ORDER BY intKey");

        assert!(rs.is_before_first().unwrap());
        for expected in 1..=3 {
            assert!(rs.next().unwrap());
            assert_eq!(rs.get_int("intKey").unwrap(), expected);
            assert_eq!(rs.get_row().unwrap(), expected);
        }
        assert!(!rs.next().unwrap());
        assert!(rs.is_after_last().unwrap());
        assert_eq!(rs.get_row().unwrap(), 0);

        // Clamped at the sentinel
        assert!(!rs.next().unwrap());
        assert!(rs.is_after_last().unwrap());
    }

    #[test]
    fn test_reverse_walk_visits_rows_backwards() {
        let db = TestDb::with_items(3);
        let mut rs = scrollable(&db, "SELECT FROM Item ORDER BY intKey");
        rs.set_fetch_direction(FETCH_REVERSE).unwrap();
        rs.before_first().unwrap();
        assert!(rs.is_before_first().unwrap());

        for expected in [3, 2, 1] {
            assert!(rs.next().unwrap());
            assert_eq!(rs.get_int("intKey").unwrap(), expected);
        }
        assert!(!rs.next().unwrap());
        assert!(rs.is_after_last().unwrap());
        assert!(!rs.is_before_first().unwrap());
    }

    #[test]
    fn test_reverse_first_and_last_swap() {
        let db = TestDb::with_items(4);
        let mut rs = scrollable(&db, "SELECT FROM Item ORDER BY intKey");
        rs.set_fetch_direction(FETCH_REVERSE).unwrap();

        assert!(rs.first().unwrap());
        assert_eq!(rs.get_int("intKey").unwrap(), 4);
        assert!(rs.is_first().unwrap());

        assert!(rs.last().unwrap());
        assert_eq!(rs.get_int("intKey").unwrap(), 1);
        assert!(rs.is_last().unwrap());

        rs.after_last().unwrap();
        assert!(rs.is_after_last().unwrap());
        assert!(rs.previous().unwrap());
        assert_eq!(rs.get_int("intKey").unwrap(), 1);
    }

    #[test]
    fn test_absolute_positions() {
        let db = TestDb::with_items(3);
        let mut rs = scrollable(&db, "SELECT FROM Item ORDER BY intKey");

        assert!(rs.absolute(1).unwrap());
        assert_eq!(rs.get_row().unwrap(), 1);
        assert!(rs.absolute(-1).unwrap());
        assert_eq!(rs.get_row().unwrap(), 3);
        assert!(rs.absolute(-3).unwrap());
        assert_eq!(rs.get_row().unwrap(), 1);

        assert!(!rs.absolute(0).unwrap());
        assert!(rs.is_before_first().unwrap());
        assert!(!rs.absolute(4).unwrap());
        assert!(rs.is_after_last().unwrap());
        assert!(!rs.absolute(-4).unwrap());
        assert!(rs.is_before_first().unwrap());
    }

    #[test]
    fn test_relative_moves_clamp() {
        let db = TestDb::with_items(3);
        let mut rs = scrollable(&db, "SELECT FROM Item ORDER BY intKey");

        assert!(rs.first().unwrap());
        assert!(rs.relative(2).unwrap());
        assert_eq!(rs.get_int("intKey").unwrap(), 3);
        assert!(!rs.relative(1).unwrap());
        assert!(rs.is_after_last().unwrap());
        assert!(!rs.relative(-10).unwrap());
        assert!(rs.is_before_first().unwrap());
        assert!(rs.relative(1).unwrap());
        assert!(rs.is_first().unwrap());
    }

    #[test]
    fn test_previous_from_before_first_stays_put() {
        let db = TestDb::with_items(2);
        let mut rs = scrollable(&db, "SELECT FROM Item");
        assert!(!rs.previous().unwrap());
        assert!(rs.is_before_first().unwrap());
    }

    #[test]
    fn test_forward_only_rejects_scrolling() {
        let db = TestDb::with_items(2);
        let mut rs = forward_only(&db, "SELECT FROM Item");

        assert!(matches!(rs.first(), Err(JdbcError::Capability(_))));
        assert!(matches!(rs.last(), Err(JdbcError::Capability(_))));
        assert!(matches!(rs.previous(), Err(JdbcError::Capability(_))));
        assert!(matches!(rs.absolute(1), Err(JdbcError::Capability(_))));
        assert!(matches!(rs.relative(1), Err(JdbcError::Capability(_))));
        assert!(matches!(rs.before_first(), Err(JdbcError::Capability(_))));
        assert!(matches!(rs.after_last(), Err(JdbcError::Capability(_))));
        assert!(matches!(
            rs.set_fetch_direction(FETCH_REVERSE),
            Err(JdbcError::Capability(_))
        ));

        // Plain forward iteration still works
        assert!(rs.next().unwrap());
    }

    #[test]
    fn test_empty_cursor_flags() {
        let db = TestDb::with_items(2);
        let mut rs = scrollable(&db, "SELECT FROM Item WHERE intKey > 100");

        assert_eq!(rs.row_count(), 0);
        assert!(rs.column_names().is_empty());
        assert!(!rs.is_first().unwrap());
        assert!(!rs.is_last().unwrap());
        assert!(!rs.first().unwrap());
        assert!(!rs.next().unwrap());
        assert!(rs.is_after_last().unwrap());
    }

    #[test]
    fn test_fetch_size_truncates_visible_rows() {
        let db = TestDb::with_items(5);
        let mut rs = scrollable(&db, "SELECT FROM Item ORDER BY intKey");
        assert_eq!(rs.get_fetch_size().unwrap(), 5);

        rs.set_fetch_size(2).unwrap();
        assert_eq!(rs.row_count(), 2);
        assert!(rs.last().unwrap());
        assert_eq!(rs.get_int("intKey").unwrap(), 2);
        assert!(!rs.next().unwrap());

        // Larger sizes do not bring rows back
        rs.set_fetch_size(10).unwrap();
        assert_eq!(rs.row_count(), 2);

        assert!(matches!(rs.set_fetch_size(-1), Err(JdbcError::Argument(_))));
    }

    #[test]
    fn test_closed_cursor_rejects_operations() {
        let db = TestDb::with_items(1);
        let mut rs = forward_only(&db, "SELECT FROM Item");
        rs.close();
        rs.close();

        assert!(rs.is_closed());
        assert!(matches!(rs.next(), Err(JdbcError::Closed(_))));
        assert!(matches!(rs.get_row(), Err(JdbcError::Closed(_))));
        assert!(matches!(rs.get_string("name"), Err(JdbcError::Closed(_))));
    }
}

mod field_access {
    use super::*;

    #[test]
    fn test_rid_column_is_synthesized_first() {
        let db = TestDb::with_items(1);
        let mut rs = forward_only(&db, "SELECT FROM Item");
        assert_eq!(rs.column_names(), ["@rid", "intKey", "name"]);

        assert!(rs.next().unwrap());
        let rid = rs.get_rid("@rid").unwrap();
        assert!(rid.is_persistent());
        assert_eq!(rs.get_string(1).unwrap(), Some(rid.to_string()));
        assert_eq!(rs.get_object("@rid").unwrap(), Value::Link(rid));
    }

    #[test]
    fn test_find_column_searches_every_field() {
        let db = TestDb::with_items(1);
        let rs = forward_only(&db, "SELECT FROM Item");
        assert_eq!(rs.find_column("@rid").unwrap(), 1);
        assert_eq!(rs.find_column("name").unwrap(), 3);
        assert!(matches!(rs.find_column("missing"), Err(JdbcError::Argument(_))));
    }

    #[test]
    fn test_index_accessors_validate_bounds() {
        let db = TestDb::with_items(1);
        let mut rs = forward_only(&db, "SELECT FROM Item");
        assert!(rs.next().unwrap());

        assert_eq!(rs.get_int(2).unwrap(), 1);
        assert_eq!(rs.get_string(3).unwrap(), Some("item1".to_string()));
        assert!(matches!(rs.get_int(0), Err(JdbcError::Argument(_))));
        assert!(matches!(rs.get_int(4), Err(JdbcError::Argument(_))));
    }

    #[test]
    fn test_reading_off_row_is_an_error() {
        let db = TestDb::with_items(1);
        let mut rs = forward_only(&db, "SELECT FROM Item");
        assert!(matches!(rs.get_string("name"), Err(JdbcError::Argument(_))));
    }

    #[test]
    fn test_numeric_accessors_on_null_return_zero() {
        let db = TestDb::document();
        db.backend
            .insert_record(&db.database, Record::new("Sparse").with("a", Value::Null).with("b", 5))
            .unwrap();
        let mut rs = forward_only(&db, "SELECT FROM Sparse");
        assert!(rs.next().unwrap());

        assert_eq!(rs.get_int("a").unwrap(), 0);
        assert!(rs.was_null().unwrap());
        assert_eq!(rs.get_double("a").unwrap(), 0.0);
        assert_eq!(rs.get_string("a").unwrap(), None);
        assert_eq!(rs.get_long("b").unwrap(), 5);
        assert!(!rs.was_null().unwrap());

        // Fields absent from the record read as null
        assert_eq!(rs.get_short("missing").unwrap(), 0);
        assert!(rs.was_null().unwrap());
    }

    #[test]
    fn test_conversion_failures() {
        let db = TestDb::with_items(1);
        let mut rs = forward_only(&db, "SELECT FROM Item");
        assert!(rs.next().unwrap());
        assert!(matches!(rs.get_int("name"), Err(JdbcError::Conversion(_))));
        assert!(matches!(rs.get_bytes("name"), Err(JdbcError::Conversion(_))));
    }

    #[test]
    fn test_typed_values() {
        let db = TestDb::document();
        db.backend
            .insert_record(
                &db.database,
                Record::new("Typed")
                    .with("flag", true)
                    .with("ratio", 2.5f64)
                    .with("amount", Value::Decimal(Decimal::from_str("10.5").unwrap()))
                    .with("stamp", Value::DateTime(datetime!(2024-01-02 03:04:05)))
                    .with("small", Value::Short(7)),
            )
            .unwrap();
        let mut rs = forward_only(&db, "SELECT FROM Typed");
        assert!(rs.next().unwrap());

        assert!(rs.get_boolean("flag").unwrap());
        assert_eq!(rs.get_float("ratio").unwrap(), 2.5);
        assert_eq!(rs.get_byte("small").unwrap(), 7);
        assert_eq!(
            rs.get_decimal("amount").unwrap(),
            Some(Decimal::from_str("10.5").unwrap())
        );
        assert_eq!(
            rs.get_decimal_with_scale("amount", 3).unwrap().map(|d| d.to_string()),
            Some("10.500".to_string())
        );
        assert_eq!(
            rs.get_timestamp("stamp").unwrap(),
            Some(datetime!(2024-01-02 03:04:05))
        );
        assert_eq!(
            rs.get_date("stamp").unwrap(),
            Some(datetime!(2024-01-02 03:04:05).date())
        );
        assert_eq!(
            rs.get_time("stamp").unwrap(),
            Some(datetime!(2024-01-02 03:04:05).time())
        );
    }

    #[test]
    fn test_binary_access() {
        let db = TestDb::document();
        db.backend
            .insert_record(
                &db.database,
                Record::new("Doc")
                    .with("single", Value::Blob(Bytes::from_static(b"abc")))
                    .with(
                        "chunks",
                        Value::List(vec![
                            Value::Blob(Bytes::from_static(b"12")),
                            Value::Blob(Bytes::from_static(b"34")),
                        ]),
                    )
                    .with("text", "plain"),
            )
            .unwrap();
        let mut rs = forward_only(&db, "SELECT FROM Doc");
        assert!(rs.next().unwrap());

        assert_eq!(rs.get_bytes("single").unwrap(), Some(Bytes::from_static(b"abc")));
        let blob = rs.get_blob("chunks").unwrap().unwrap();
        assert_eq!(blob.chunk_count(), 2);
        assert_eq!(blob.to_bytes(), Bytes::from_static(b"1234"));
        assert_eq!(rs.get_bytes("chunks").unwrap(), Some(Bytes::from_static(b"1234")));
        assert!(rs.get_blob("text").unwrap().is_none());
    }

    #[test]
    fn test_updates_are_unsupported() {
        let db = TestDb::with_items(1);
        let mut rs = scrollable(&db, "SELECT FROM Item");
        assert!(rs.next().unwrap());

        assert!(matches!(rs.update_null("name"), Err(JdbcError::FeatureNotSupported(_))));
        assert!(matches!(rs.update_row(), Err(JdbcError::FeatureNotSupported(_))));
        assert!(matches!(rs.insert_row(), Err(JdbcError::FeatureNotSupported(_))));
        assert!(matches!(rs.get_array(1), Err(JdbcError::FeatureNotSupported(_))));
        assert!(!rs.row_updated().unwrap());
        assert!(!rs.row_inserted().unwrap());
        assert!(!rs.row_deleted().unwrap());
    }
}

mod row_operations {
    use super::*;

    #[test]
    fn test_refresh_row_reloads_the_record() {
        let db = TestDb::with_items(1);
        let mut rs = scrollable(&db, "SELECT FROM Item");
        assert!(rs.next().unwrap());
        assert_eq!(rs.get_string("name").unwrap(), Some("item1".to_string()));

        db.connection
            .create_statement()
            .unwrap()
            .execute_update("UPDATE Item SET name = 'renamed'")
            .unwrap();
        assert_eq!(rs.get_string("name").unwrap(), Some("item1".to_string()));

        rs.refresh_row().unwrap();
        assert_eq!(rs.get_string("name").unwrap(), Some("renamed".to_string()));
    }

    #[test]
    fn test_refresh_row_on_deleted_record() {
        let db = TestDb::with_items(1);
        let mut rs = scrollable(&db, "SELECT FROM Item");
        assert!(rs.next().unwrap());
        db.connection
            .create_statement()
            .unwrap()
            .execute_update("DELETE FROM Item")
            .unwrap();

        assert!(matches!(rs.refresh_row(), Err(JdbcError::Backend { .. })));
    }

    #[test]
    fn test_delete_row_removes_the_backend_record() {
        let db = TestDb::with_items(2);
        let mut rs = forward_only(&db, "SELECT FROM Item ORDER BY intKey");
        assert!(matches!(rs.delete_row(), Err(JdbcError::Argument(_))));

        assert!(rs.next().unwrap());
        let rid = rs.get_rid("@rid").unwrap();
        rs.delete_row().unwrap();

        // The snapshot keeps the row
        assert_eq!(rs.get_rid("@rid").unwrap(), rid);
        assert_eq!(db.count_items(), 1);
    }

    #[test]
    fn test_unwrap_record_and_statement_link() {
        let db = TestDb::with_items(1);
        let statement = db.connection.create_statement().unwrap();
        let mut rs = statement.execute_query("SELECT FROM Item").unwrap();

        assert!(rs.unwrap_record().unwrap().is_none());
        assert!(rs.next().unwrap());
        let record = rs.unwrap_record().unwrap().unwrap();
        assert_eq!(record.class_name(), Some("Item"));

        let owner = rs.get_statement().unwrap().unwrap();
        assert_eq!(owner.id(), statement.id());
        assert!(!rs.get_cursor_name().unwrap().is_empty());
    }
}

mod result_metadata {
    use super::*;

    #[test]
    fn test_undeclared_types_are_inferred_per_row() {
        let db = TestDb::document();
        db.backend
            .insert_record(
                &db.database,
                Record::new("Doc")
                    .with("ratio", 1.25f64)
                    .with("payload", Value::Blob(Bytes::from_static(b"x")))
                    .with(
                        "parts",
                        Value::List(vec![
                            Value::Blob(Bytes::from_static(b"a")),
                            Value::Blob(Bytes::from_static(b"b")),
                        ]),
                    )
                    .with_typed("label", "x", FieldType::String),
            )
            .unwrap();
        let mut rs = forward_only(&db, "SELECT FROM Doc");

        let meta = rs.get_metadata().unwrap();
        assert_eq!(meta.get_column_count().unwrap(), 5);
        assert_eq!(meta.get_column_type(2).unwrap(), SqlType::JavaObject.code());

        // The same view now reads the positioned record
        assert!(rs.next().unwrap());
        assert_eq!(meta.get_column_name(2).unwrap(), "ratio");
        assert_eq!(meta.get_column_type(2).unwrap(), SqlType::Decimal.code());
        assert_eq!(meta.get_column_type(3).unwrap(), SqlType::Binary.code());
        assert_eq!(meta.get_column_type(4).unwrap(), SqlType::Blob.code());
        assert_eq!(meta.get_column_type(5).unwrap(), SqlType::Varchar.code());
        assert_eq!(meta.get_column_type_name(5).unwrap(), Some("STRING".to_string()));
        assert_eq!(meta.get_column_type_name(2).unwrap(), None);
        assert_eq!(meta.get_column_class_name(2).unwrap(), Some("f64"));
        assert_eq!(meta.get_table_name(2).unwrap(), "Doc");
        assert_eq!(meta.get_schema_name(2).unwrap(), db.database);
        assert_eq!(meta.is_nullable(1).unwrap(), COLUMN_NULLABLE_UNKNOWN);
        assert!(meta.is_case_sensitive(5).unwrap());
        assert!(meta.is_read_only(1).unwrap());
        assert_eq!(meta.get_column_label(3).unwrap(), "payload");
        assert_eq!(meta.get_catalog_name(2).unwrap(), "");
        assert_eq!(meta.get_precision(2).unwrap(), 0);
        assert_eq!(meta.get_scale(2).unwrap(), 0);
        assert!(!meta.is_auto_increment(2).unwrap());
        assert!(!meta.is_currency(2).unwrap());
        assert!(meta.is_searchable(2).unwrap());
        assert!(!meta.is_writable(2).unwrap());
        assert!(!meta.is_definitely_writable(2).unwrap());
    }

    #[test]
    fn test_metadata_follows_the_cursor_position() {
        let db = TestDb::document();
        db.backend
            .insert_record(&db.database, Record::new("Mixed").with("v", 1.5f64))
            .unwrap();
        db.backend
            .insert_record(
                &db.database,
                Record::new("Mixed").with("v", Value::Blob(Bytes::from_static(b"x"))),
            )
            .unwrap();
        let mut rs = scrollable(&db, "SELECT FROM Mixed");
        let meta = rs.get_metadata().unwrap();

        assert_eq!(meta.get_column_type(2).unwrap(), SqlType::JavaObject.code());
        assert!(rs.next().unwrap());
        assert_eq!(meta.get_column_type(2).unwrap(), SqlType::Decimal.code());
        assert!(rs.next().unwrap());
        assert_eq!(meta.get_column_type(2).unwrap(), SqlType::Binary.code());
        assert!(rs.first().unwrap());
        assert_eq!(meta.get_column_type(2).unwrap(), SqlType::Decimal.code());
        assert_eq!(meta.get_column_class_name(2).unwrap(), Some("f64"));
    }

    #[test]
    fn test_metadata_taken_before_next_sees_declared_type() {
        let db = TestDb::with_items(2);
        let mut rs = forward_only(&db, "SELECT FROM Item");
        let meta = rs.get_metadata().unwrap();
        assert!(rs.next().unwrap());
        assert_eq!(meta.get_column_type(2).unwrap(), SqlType::Integer.code());
        assert_eq!(meta.get_column_type_name(2).unwrap(), Some("INTEGER".to_string()));
    }

    #[test]
    fn test_metadata_fails_once_the_cursor_closes() {
        let db = TestDb::with_items(1);
        let mut rs = forward_only(&db, "SELECT FROM Item");
        let meta = rs.get_metadata().unwrap();
        assert!(rs.next().unwrap());
        rs.close();

        assert!(matches!(meta.get_column_type(2), Err(JdbcError::Closed(_))));
        assert!(matches!(meta.get_column_count(), Err(JdbcError::Closed(_))));
        assert!(matches!(meta.get_column_name(1), Err(JdbcError::Closed(_))));
        assert!(matches!(meta.is_signed(2), Err(JdbcError::Closed(_))));

        // Dropping a cursor closes its views as well
        let dropped = forward_only(&db, "SELECT FROM Item").get_metadata().unwrap();
        assert!(matches!(dropped.get_column_name(1), Err(JdbcError::Closed(_))));
    }

    #[test]
    fn test_column_index_is_validated() {
        let db = TestDb::with_items(1);
        let rs = forward_only(&db, "SELECT FROM Item");
        let meta = rs.get_metadata().unwrap();
        assert!(matches!(meta.get_column_type(0), Err(JdbcError::Argument(_))));
        assert!(matches!(meta.get_column_name(4), Err(JdbcError::Argument(_))));
        assert!(matches!(
            meta.get_column_display_size(1),
            Err(JdbcError::FeatureNotSupported(_))
        ));
    }

    #[test]
    fn test_declared_numeric_is_signed() {
        let db = TestDb::with_items(1);
        let mut rs = forward_only(&db, "SELECT FROM Item");
        assert!(rs.next().unwrap());
        let meta = rs.get_metadata().unwrap();
        assert!(meta.is_signed(2).unwrap());
        assert!(!meta.is_signed(3).unwrap());
        assert_eq!(meta.get_column_type(2).unwrap(), SqlType::Integer.code());
        assert_eq!(
            meta.get_column_class_name(1).unwrap(),
            Value::Link(Rid::new(0, 0)).type_name()
        );
    }
}
