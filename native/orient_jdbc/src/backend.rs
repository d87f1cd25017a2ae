/// Backend collaborator contract
///
/// The storage/query engine is external to this crate. Connections reach it
/// only through the [`Backend`] trait, passing the [`DbHandle`] explicitly on
/// every call.
use thiserror::Error;

use crate::models::{CommandOutcome, DbHandle, IndexInfo, Record, Rid, TxMode};

/// Failures reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The command text could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    Operation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database handle {0} is closed")]
    Closed(String),
}

/// Abstract storage engine.
///
/// Implementations must be shareable across threads; a single handle is
/// still used by one caller at a time.
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// Open a database and return a handle to it.
    ///
    /// # Arguments
    /// - `url`: engine-specific location, without the driver prefix
    /// - `user`, `password`: credentials
    fn open(&self, url: &str, user: &str, password: &str) -> Result<DbHandle, BackendError>;

    fn is_closed(&self, handle: &DbHandle) -> bool;

    fn close(&self, handle: &DbHandle) -> Result<(), BackendError>;

    /// Execute a command, substituting positional parameters.
    fn command(
        &self,
        handle: &DbHandle,
        text: &str,
        params: &[Option<String>],
    ) -> Result<CommandOutcome, BackendError>;

    /// Execute a query and return its records.
    fn query(
        &self,
        handle: &DbHandle,
        text: &str,
        params: &[Option<String>],
    ) -> Result<Vec<Record>, BackendError>;

    fn begin(&self, handle: &DbHandle, mode: TxMode) -> Result<(), BackendError>;

    fn commit(&self, handle: &DbHandle) -> Result<(), BackendError>;

    fn rollback(&self, handle: &DbHandle) -> Result<(), BackendError>;

    /// Indexes defined on a record class.
    fn class_indexes(&self, handle: &DbHandle, class_name: &str)
        -> Result<Vec<IndexInfo>, BackendError>;

    /// Names of the record classes defined in the database.
    fn class_names(&self, handle: &DbHandle) -> Result<Vec<String>, BackendError>;

    /// Load the current version of a record.
    fn load(&self, handle: &DbHandle, rid: Rid) -> Result<Option<Record>, BackendError>;

    fn delete(&self, handle: &DbHandle, rid: Rid) -> Result<(), BackendError>;

    /// Engine version string reported through metadata.
    fn version(&self) -> String;
}
