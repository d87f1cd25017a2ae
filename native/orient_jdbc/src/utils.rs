/// Utility functions and helpers for OrientJdbc
///
/// This module provides commonly used helper functions for locking and
/// command classification.
use std::sync::{Arc, Mutex, MutexGuard};

use crate::constants::SELECT_KEYWORD;
use crate::error::{message, JdbcError, Result};

/// Safely lock a mutex with proper error handling
///
/// Returns a descriptive error message if the mutex is poisoned.
pub fn safe_lock<'a, T>(mutex: &'a Mutex<T>, context: &str) -> Result<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|e| JdbcError::LockPoisoned(message("Lock.poisoned", &[&context, &e])))
}

/// Safely lock an Arc<Mutex<T>> with proper error handling
///
/// Returns a descriptive error message if the mutex is poisoned.
pub fn safe_lock_arc<'a, T>(
    arc_mutex: &'a Arc<Mutex<T>>,
    context: &str,
) -> Result<MutexGuard<'a, T>> {
    arc_mutex.lock().map_err(|e| {
        JdbcError::LockPoisoned(message("Lock.poisoned", &[&format!("{context} (arc)"), &e]))
    })
}

/// Command type enumeration used for logging and batch validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Drop,
    Alter,
    Other,
}

/// Detect the command type from its text
///
/// Examines the first keyword to categorize the command.
pub fn detect_query_type(query: &str) -> QueryType {
    let keyword = query
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_uppercase();

    match keyword.as_str() {
        "SELECT" => QueryType::Select,
        "INSERT" => QueryType::Insert,
        "UPDATE" => QueryType::Update,
        "DELETE" => QueryType::Delete,
        "CREATE" => QueryType::Create,
        "DROP" => QueryType::Drop,
        "ALTER" => QueryType::Alter,
        _ => QueryType::Other,
    }
}

/// True when the command text begins with the query keyword.
///
/// Leading whitespace is skipped and the comparison ignores ASCII case. No
/// allocation: the keyword is compared byte by byte.
#[inline]
pub fn is_query_text(sql: &str) -> bool {
    let trimmed = sql.trim_start().as_bytes();
    let keyword = SELECT_KEYWORD.as_bytes();

    trimmed.len() >= keyword.len()
        && trimmed[..keyword.len()].eq_ignore_ascii_case(keyword)
        && trimmed
            .get(keyword.len())
            .is_none_or(|b| !b.is_ascii_alphanumeric() && *b != b'_')
}

/// True when the text is empty or only whitespace.
pub fn is_blank(sql: &str) -> bool {
    sql.trim().is_empty()
}

/// SQL `LIKE` with `%` and `_` wildcards, case-sensitive.
pub fn like_matches(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((bp, bt)) = backtrack {
            p = bp + 1;
            t = bt + 1;
            backtrack = Some((bp, bt + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}
