#![no_main]
//! Structured command fuzzing
//!
//! Builds command-language inputs from structured pieces and runs them through
//! a connection on the in-memory engine. Statement execution, the command
//! parser and cursor construction must report failures as errors, never
//! panic.

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use orient_jdbc::memory::MemoryBackend;
use orient_jdbc::{Connection, ConnectionKind};

#[derive(Debug, Arbitrary)]
struct CommandInput<'a> {
    leading_whitespace: Option<&'a str>,
    keyword: Keyword,
    body: &'a str,
    params: Vec<Option<&'a str>>,
    scrollable: bool,
    max_rows: u8,
}

#[derive(Debug, Arbitrary)]
enum Keyword {
    Select,
    SelectCount,
    Insert,
    Update,
    Delete,
    CreateClass,
    CreateProperty,
    CreateIndex,
    Drop,
    /// Random bytes as keyword
    Random(u8, u8, u8, u8),
}

impl Keyword {
    fn text(&self) -> String {
        match self {
            Keyword::Select => "SELECT FROM".to_string(),
            Keyword::SelectCount => "SELECT count(*) FROM".to_string(),
            Keyword::Insert => "INSERT INTO".to_string(),
            Keyword::Update => "UPDATE".to_string(),
            Keyword::Delete => "DELETE FROM".to_string(),
            Keyword::CreateClass => "CREATE CLASS".to_string(),
            Keyword::CreateProperty => "CREATE PROPERTY".to_string(),
            Keyword::CreateIndex => "CREATE INDEX".to_string(),
            Keyword::Drop => "DROP CLASS".to_string(),
            Keyword::Random(a, b, c, d) => [a, b, c, d].iter().map(|b| char::from(**b)).collect(),
        }
    }
}

fuzz_target!(|input: CommandInput| {
    let backend = Arc::new(MemoryBackend::new());
    let Ok(connection) = Connection::open(
        ConnectionKind::Document,
        backend,
        "memory:fuzz",
        "admin",
        "admin",
    ) else {
        return;
    };

    // Seed a class so that many generated commands resolve
    if let Ok(seed) = connection.create_statement() {
        let _ = seed.execute_update("CREATE CLASS Item");
        let _ = seed.execute_update("INSERT INTO Item SET intKey = 1, name = 'one'");
    }

    let mut sql = String::new();
    if let Some(ws) = input.leading_whitespace {
        sql.push_str(ws);
    }
    sql.push_str(&input.keyword.text());
    sql.push(' ');
    sql.push_str(input.body);

    let statement = if input.scrollable {
        connection.prepare_statement_with(
            &sql,
            orient_jdbc::TYPE_SCROLL_INSENSITIVE,
            orient_jdbc::CONCUR_READ_ONLY,
        )
    } else {
        connection.prepare_statement(&sql)
    };
    let Ok(prepared) = statement else {
        return;
    };
    let _ = prepared.set_max_rows(i32::from(input.max_rows));
    for (i, param) in (1..).zip(&input.params) {
        let _ = match param {
            Some(text) => prepared.set_string(i, text),
            None => prepared.set_null(i),
        };
    }

    if let Ok(true) = prepared.execute() {
        if let Ok(Some(mut rs)) = prepared.get_result_set() {
            let _ = rs.get_metadata();
            while let Ok(true) = rs.next() {
                for column in 1..=rs.column_names().len() as i32 {
                    let _ = rs.get_object(column);
                    let _ = rs.get_string(column);
                }
            }
        }
    }
    let _ = connection.close();
});
