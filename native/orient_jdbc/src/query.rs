/// Command compilation
///
/// Text commands are compiled into one of two executable forms: a query,
/// run through the backend's query path and always producing records, or a
/// mutation, run through the command path and producing records, a single
/// record or a count.
use std::fmt;

use tracing::debug;

use crate::error::{JdbcError, Result};
use crate::utils::{detect_query_type, is_blank, is_query_text, QueryType};

/// A compiled command ready for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledCommand {
    Query(String),
    Mutation(String),
}

impl CompiledCommand {
    /// Compile command text.
    ///
    /// Text starting with the query keyword becomes a query; everything else
    /// is a mutation. Blank text is rejected.
    ///
    /// # Arguments
    /// - `sql`: command text
    /// - `empty_key`: catalog key used for the blank-text error
    pub fn compile(sql: &str, empty_key: &str) -> Result<Self> {
        if is_blank(sql) {
            return Err(JdbcError::argument(empty_key, &[]));
        }

        let compiled = if is_query_text(sql) {
            CompiledCommand::Query(sql.to_string())
        } else {
            CompiledCommand::Mutation(sql.to_string())
        };
        debug!(kind = ?compiled.query_type(), "compiled command");
        Ok(compiled)
    }

    pub fn text(&self) -> &str {
        match self {
            CompiledCommand::Query(text) | CompiledCommand::Mutation(text) => text,
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self, CompiledCommand::Query(_))
    }

    /// Leading keyword classification of the command text.
    pub fn query_type(&self) -> QueryType {
        detect_query_type(self.text())
    }
}

impl fmt::Display for CompiledCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}
