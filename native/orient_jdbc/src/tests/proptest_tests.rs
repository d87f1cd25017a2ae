//! Property-based tests using proptest
//!
//! These tests verify invariants that should hold for all inputs: cursor
//! navigation laws over arbitrary row counts, parameter padding, and the
//! command classifiers never panicking.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;

use super::test_utils::TestDb;
use crate::constants::*;
use crate::cursor::ResultSet;
use crate::models::Record;
use crate::query::CompiledCommand;
use crate::utils::{detect_query_type, is_query_text, like_matches, QueryType};

/// Database with `rows` `Item` records numbered from 0, and a scrollable
/// cursor over them in insertion order.
fn scrollable_items(rows: usize, direction: i32) -> (TestDb, ResultSet) {
    let db = TestDb::document();
    for i in 0..rows {
        db.backend
            .insert_record(&db.database, Record::new("Item").with("n", i as i64))
            .unwrap();
    }
    let statement = db
        .connection
        .create_statement_with(TYPE_SCROLL_INSENSITIVE, CONCUR_READ_ONLY)
        .unwrap();
    statement.set_fetch_direction(direction).unwrap();
    let query = if rows == 0 {
        // An empty class still has to exist for the query to resolve
        db.backend
            .insert_record(&db.database, Record::new("Empty"))
            .unwrap();
        "SELECT FROM Empty WHERE n = 1"
    } else {
        "SELECT FROM Item ORDER BY n"
    };
    let rs = statement.execute_query(query).unwrap();
    (db, rs)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Property: before_first then N next() calls visit every row in fetch
    /// order, and one more next() lands after the last row
    #[test]
    fn navigation_visits_rows_in_fetch_order(rows in 0usize..25, reverse in any::<bool>()) {
        let direction = if reverse { FETCH_REVERSE } else { FETCH_FORWARD };
        let (_db, mut rs) = scrollable_items(rows, direction);
        rs.before_first().unwrap();

        let mut seen = Vec::new();
        for _ in 0..rows {
            prop_assert!(rs.next().unwrap());
            seen.push(rs.get_long("n").unwrap());
        }
        let mut expected: Vec<i64> = (0..rows as i64).collect();
        if reverse {
            expected.reverse();
        }
        prop_assert_eq!(seen, expected);

        prop_assert!(!rs.next().unwrap());
        prop_assert!(rs.is_after_last().unwrap());
        prop_assert_eq!(rs.get_row().unwrap(), 0);
    }

    /// Property: absolute(1) is the first row, absolute(-1) the last one and
    /// absolute(0) the before-first position
    #[test]
    fn absolute_boundaries(rows in 0usize..25) {
        let (_db, mut rs) = scrollable_items(rows, FETCH_FORWARD);

        prop_assert_eq!(rs.absolute(1).unwrap(), rows > 0);
        if rows > 0 {
            prop_assert_eq!(rs.get_row().unwrap(), 1);
        }
        prop_assert_eq!(rs.absolute(-1).unwrap(), rows > 0);
        if rows > 0 {
            prop_assert_eq!(rs.get_row().unwrap(), rows as i32);
        }
        prop_assert!(!rs.absolute(0).unwrap());
        prop_assert!(rs.is_before_first().unwrap());
    }

    /// Property: the position never leaves [before-first, after-last],
    /// whatever the sequence of relative moves
    #[test]
    fn relative_moves_stay_in_bounds(rows in 0usize..15, moves in prop::collection::vec(-20i32..20, 0..30)) {
        let (_db, mut rs) = scrollable_items(rows, FETCH_FORWARD);
        for step in moves {
            let on_row = rs.relative(step).unwrap();
            let row = rs.get_row().unwrap();
            prop_assert_eq!(on_row, row > 0);
            prop_assert!(row >= 0 && row <= rows as i32);
        }
    }

    /// Property: binding index k leaves exactly max(k) slots, padding the
    /// unbound ones with null
    #[test]
    fn parameter_binding_pads_with_null(indexes in prop::collection::vec(1i32..12, 1..8)) {
        let db = TestDb::document();
        let prepared = db.connection.prepare_statement("SELECT FROM Item WHERE n = ?").unwrap();
        for &index in &indexes {
            prepared.set_int(index, index).unwrap();
        }

        let params = prepared.parameters().unwrap();
        let highest = *indexes.iter().max().unwrap();
        prop_assert_eq!(params.len(), highest as usize);
        for (slot, value) in params.iter().enumerate() {
            let index = slot as i32 + 1;
            if indexes.contains(&index) {
                let expected = index.to_string();
                prop_assert_eq!(value.as_deref(), Some(expected.as_str()));
            } else {
                prop_assert!(value.is_none());
            }
        }

        prepared.clear_parameters().unwrap();
        prop_assert!(prepared.parameters().unwrap().is_empty());
    }

    /// Property: max_rows caps the cursor at min(rows, max)
    #[test]
    fn max_rows_caps_row_count(rows in 1usize..30, max in 0i32..40) {
        let db = TestDb::document();
        for i in 0..rows {
            db.backend
                .insert_record(&db.database, Record::new("Item").with("n", i as i64))
                .unwrap();
        }
        let statement = db.connection.create_statement().unwrap();
        statement.set_max_rows(max).unwrap();
        let rs = statement.execute_query("SELECT FROM Item").unwrap();

        let expected = if max == NO_LIMIT { rows } else { rows.min(max as usize) };
        prop_assert_eq!(rs.row_count(), expected as i32);
    }

    /// Property: the classifiers never panic for any valid UTF-8 string
    #[test]
    fn classifiers_never_panic(sql in ".*") {
        let _ = detect_query_type(&sql);
        let _ = is_query_text(&sql);
        let _ = CompiledCommand::compile(&sql, "Statement.executeEmptyString");
    }

    /// Property: SELECT text always compiles to the query form
    #[test]
    fn select_compiles_to_query(
        whitespace in r"[ \t\n\r]*",
        rest in "[^;]*"
    ) {
        let sql = format!("{whitespace}SELECT {rest}");
        prop_assert!(is_query_text(&sql), "SELECT should be a query: {}", sql);
        prop_assert_eq!(detect_query_type(&sql), QueryType::Select);
        let compiled = CompiledCommand::compile(&sql, "Statement.executeEmptyString").unwrap();
        prop_assert!(compiled.is_query());
    }

    /// Property: keyword case does not change the classification
    #[test]
    fn classification_is_case_insensitive(
        keyword in prop::sample::select(vec!["select", "insert", "update", "delete", "create"]),
        upper in any::<bool>()
    ) {
        let word = if upper { keyword.to_uppercase() } else { keyword.to_string() };
        let sql = format!("{word} something");
        prop_assert_eq!(detect_query_type(&sql), detect_query_type(&keyword.to_uppercase()));
        prop_assert_eq!(is_query_text(&sql), keyword == "select");
    }

    /// Property: a pattern made only of % matches everything, and every
    /// string matches itself when it holds no wildcard
    #[test]
    fn like_patterns(text in "[a-zA-Z0-9 ]{0,20}") {
        prop_assert!(like_matches(&text, "%"));
        prop_assert!(like_matches(&text, &text));
        let prefixed = format!("{text}%");
        prop_assert!(like_matches(&text, &prefixed));
    }

    /// Property: the in-memory command parser never panics
    #[test]
    fn memory_parser_never_panics(sql in ".{0,80}") {
        let db = TestDb::document();
        let statement = db.connection.create_statement().unwrap();
        let _ = statement.execute(&sql);
    }
}
