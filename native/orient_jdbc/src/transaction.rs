/// Transaction management for OrientJdbc connections.
///
/// This module holds the autocommit state machine:
/// - **Auto**: every command is applied immediately
/// - **Manual**: an explicit backend transaction is open
///
/// Leaving Auto begins an optimistic backend transaction; returning to Auto
/// commits whatever is pending. `commit` and `rollback` are only legal in
/// Manual and re-open a fresh transaction so the connection stays in Manual.
///
/// [`TransactionScope`] wraps a Manual section in an RAII guard that rolls
/// back on drop unless it was committed.
use tracing::{info, warn};

use crate::connection::{Connection, DatabaseBinding};
use crate::error::{JdbcError, Result};

/// Autocommit mode of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoCommitState {
    #[default]
    Auto,
    Manual,
}

impl AutoCommitState {
    pub fn is_enabled(self) -> bool {
        self == AutoCommitState::Auto
    }

    /// Apply an autocommit change and return the new state.
    ///
    /// # Arguments
    /// - `enabled`: requested autocommit flag
    /// - `binding`: database the transaction boundaries are applied to
    pub fn switch(self, enabled: bool, binding: &dyn DatabaseBinding) -> Result<Self> {
        match (self, enabled) {
            (AutoCommitState::Auto, false) => {
                binding.begin()?;
                info!(database = %binding.handle().database, "autocommit disabled, transaction started");
                Ok(AutoCommitState::Manual)
            }
            (AutoCommitState::Manual, true) => {
                binding.commit()?;
                info!(database = %binding.handle().database, "autocommit enabled, pending transaction committed");
                Ok(AutoCommitState::Auto)
            }
            (state, _) => Ok(state),
        }
    }

    /// Commit the open transaction and start the next one.
    pub fn commit(self, binding: &dyn DatabaseBinding) -> Result<()> {
        if self.is_enabled() {
            return Err(JdbcError::argument("Connection.commitOnEnabledAutoCommit", &[]));
        }
        binding.commit()?;
        binding.begin()?;
        info!(database = %binding.handle().database, "transaction committed");
        Ok(())
    }

    /// Roll back the open transaction and start the next one.
    pub fn rollback(self, binding: &dyn DatabaseBinding) -> Result<()> {
        if self.is_enabled() {
            return Err(JdbcError::argument("Connection.rollbackOnEnabledAutoCommit", &[]));
        }
        binding.rollback()?;
        binding.begin()?;
        info!(database = %binding.handle().database, "transaction rolled back");
        Ok(())
    }
}

/// RAII guard for a manual transaction section.
///
/// Created from a connection in autocommit mode. The guard switches the
/// connection to manual mode; `commit` and `rollback` consume it and restore
/// autocommit. Dropping an unfinished guard rolls back.
///
/// # Usage
///
/// ```ignore
/// let scope = connection.transaction()?;
/// scope.connection().create_statement()?.execute_update("INSERT INTO Item SET a = 1")?;
/// scope.commit()?;
/// ```
#[derive(Debug)]
pub struct TransactionScope<'a> {
    connection: &'a Connection,
    finished: bool,
}

impl<'a> TransactionScope<'a> {
    /// Begin a scope; fails if the connection is already in manual mode.
    pub fn begin(connection: &'a Connection) -> Result<Self> {
        if !connection.get_auto_commit()? {
            return Err(JdbcError::argument(
                "Connection.transactionScopeInManualMode",
                &[],
            ));
        }
        connection.set_auto_commit(false)?;
        Ok(TransactionScope {
            connection,
            finished: false,
        })
    }

    pub fn connection(&self) -> &Connection {
        self.connection
    }

    /// Commit the pending work and restore autocommit.
    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        // Switching back to Auto commits what is pending
        self.connection.set_auto_commit(true)
    }

    /// Discard the pending work and restore autocommit.
    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.connection.rollback()?;
        self.connection.set_auto_commit(true)
    }
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        if self.finished || self.connection.is_closed() {
            return;
        }
        warn!(connection = %self.connection.id(), "transaction scope dropped without commit, rolling back");
        if let Err(e) = self
            .connection
            .rollback()
            .and_then(|()| self.connection.set_auto_commit(true))
        {
            warn!(connection = %self.connection.id(), error = %e, "rollback on drop failed");
        }
    }
}
