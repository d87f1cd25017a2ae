/// Global constants and registries for OrientJdbc
///
/// This module holds the integer codes shared with relational client code,
/// the fixed product/driver identification strings, connection property keys
/// and the process-wide backend engine registry.
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::backend::Backend;
use crate::memory::MemoryBackend;

/// Prefix every driver URL must start with.
pub const URL_PREFIX: &str = "jdbc:orient:";

/// Name of the synthetic identity column prepended to query cursors.
pub const RID_COLUMN_NAME: &str = "@rid";

/// Keyword that marks a command as a query.
pub const SELECT_KEYWORD: &str = "SELECT";

/// First valid column / parameter index.
pub const MIN_COLUMN_INDEX: i32 = 1;

pub const DATABASE_PRODUCT_NAME: &str = "OrientDB";
pub const DRIVER_NAME: &str = "OrientDB JDBC Driver";
pub const DRIVER_MAJOR_VERSION: i32 = 1;
pub const DRIVER_MINOR_VERSION: i32 = 0;
pub const JDBC_MAJOR_VERSION: i32 = 4;
pub const JDBC_MINOR_VERSION: i32 = 0;

/// Update count reported when the last execution produced a cursor or nothing.
pub const NO_UPDATE_RESULT: i32 = -1;

/// "No limit" value for fetch size, max rows, max field size and query timeout.
pub const NO_LIMIT: i32 = 0;

// Result set scroll types
pub const TYPE_FORWARD_ONLY: i32 = 1003;
pub const TYPE_SCROLL_INSENSITIVE: i32 = 1004;
pub const TYPE_SCROLL_SENSITIVE: i32 = 1005;

// Result set concurrency
pub const CONCUR_READ_ONLY: i32 = 1007;
pub const CONCUR_UPDATABLE: i32 = 1008;

// Result set holdability
pub const HOLD_CURSORS_OVER_COMMIT: i32 = 1;
pub const CLOSE_CURSORS_AT_COMMIT: i32 = 2;

// Fetch directions
pub const FETCH_FORWARD: i32 = 1000;
pub const FETCH_REVERSE: i32 = 1001;
pub const FETCH_UNKNOWN: i32 = 1002;

// Transaction isolation levels
pub const TRANSACTION_NONE: i32 = 0;
pub const TRANSACTION_READ_UNCOMMITTED: i32 = 1;
pub const TRANSACTION_READ_COMMITTED: i32 = 2;
pub const TRANSACTION_REPEATABLE_READ: i32 = 4;
pub const TRANSACTION_SERIALIZABLE: i32 = 8;

// Generated keys flags
pub const RETURN_GENERATED_KEYS: i32 = 1;
pub const NO_GENERATED_KEYS: i32 = 2;

// Column nullability
pub const COLUMN_NO_NULLS: i32 = 0;
pub const COLUMN_NULLABLE: i32 = 1;
pub const COLUMN_NULLABLE_UNKNOWN: i32 = 2;

/// Connection property keys understood by the driver.
pub mod property {
    pub const USER: &str = "user";
    pub const PASSWORD: &str = "password";
    pub const CONNECTION_TYPE: &str = "type";
}

/// Legal values of the `type` connection property.
pub mod connection_type {
    pub const DOCUMENT: &str = "doc";
    pub const NATIVE_GRAPH: &str = "ngraph";
    pub const OBJECT: &str = "obj";
    pub const TINKERPOP_GRAPH: &str = "tgraph";

    /// All legal values, in the order they are listed in error messages.
    pub const ALL: [&str; 4] = [DOCUMENT, NATIVE_GRAPH, OBJECT, TINKERPOP_GRAPH];
}

/// Engine name the in-memory backend is registered under.
pub const MEMORY_ENGINE: &str = "memory";

// Global registry of storage engines - Maps the engine prefix of a URL
// (`jdbc:orient:<engine>:<database>`) to the backend that serves it
lazy_static! {
    pub static ref ENGINE_REGISTRY: Mutex<HashMap<String, Arc<dyn Backend>>> = {
        let mut engines: HashMap<String, Arc<dyn Backend>> = HashMap::new();
        engines.insert(MEMORY_ENGINE.to_string(), Arc::new(MemoryBackend::new()));
        Mutex::new(engines)
    };
}
