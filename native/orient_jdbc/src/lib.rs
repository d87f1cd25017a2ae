//! `OrientJdbc`: relational-style client adapter for `OrientDB`-style databases
//!
//! This is the root module of the adapter. It exposes connections, statements,
//! prepared statements, scrollable cursors and metadata over a pluggable
//! document/graph storage engine reached through the [`backend::Backend`]
//! trait. An in-process engine ([`memory::MemoryBackend`]) is registered
//! under the `memory` URL prefix.
pub mod backend;
pub mod batch;
pub mod blob;
pub mod capability;
pub mod connection;
pub mod constants;
pub mod cursor;
pub mod decode;
pub mod driver;
pub mod error;
pub mod memory;
pub mod metadata;
pub mod models;
pub mod prepared;
pub mod query;
pub mod statement;
pub mod transaction;
pub mod types;
pub mod utils;

// Re-export the client-facing surface
pub use connection::{Connection, ConnectionKind};
pub use constants::*;
pub use cursor::ResultSet;
pub use driver::{DataSource, Driver, Properties};
pub use error::{JdbcError, Result};
pub use metadata::{DatabaseMetaData, ResultSetMetaData};
pub use models::*;
pub use prepared::PreparedStatement;
pub use statement::Statement;
pub use utils::{detect_query_type, is_query_text, QueryType};

#[cfg(test)]
mod tests;
