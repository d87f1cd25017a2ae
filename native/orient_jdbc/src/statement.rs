/// Statement execution
///
/// A [`Statement`] compiles command text, runs it on its connection's backend
/// and keeps the outcome: either a cursor (consumed by
/// [`Statement::get_result_set`]) or an update count. Statements created on
/// a read-only connection reject every command that is not a query.
///
/// Lifecycle is one-way: once closed, every operation fails with a closed
/// object error naming the command when one is at hand.
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::batch::{execute_entries, update_count, BatchEntry, BatchQueue};
use crate::capability::{Concurrency, FetchDirection, Holdability, ScrollType};
use crate::connection::{check_generated_keys_flag, Connection};
use crate::constants::{NO_LIMIT, NO_UPDATE_RESULT};
use crate::cursor::{cap_rows, CursorConfig, ResultSet};
use crate::error::{JdbcError, Result};
use crate::models::{CommandOutcome, Record};
use crate::query::CompiledCommand;
use crate::utils::{is_query_text, safe_lock};

#[derive(Debug)]
pub(crate) struct StatementState {
    pub(crate) closed: bool,
    pub(crate) command: Option<CompiledCommand>,
    pub(crate) scroll: ScrollType,
    pub(crate) concurrency: Concurrency,
    pub(crate) holdability: Holdability,
    pub(crate) fetch_direction: FetchDirection,
    pub(crate) fetch_size: i32,
    pub(crate) max_rows: i32,
    pub(crate) update_count: i32,
    pub(crate) result_set: Option<ResultSet>,
    pub(crate) batch: BatchQueue,
}

#[derive(Debug)]
pub(crate) struct StatementInner {
    id: String,
    connection: Connection,
    read_only: bool,
    state: Mutex<StatementState>,
}

/// A command executor bound to one connection.
///
/// Cloning yields another handle to the same statement.
#[derive(Debug, Clone)]
pub struct Statement {
    inner: Arc<StatementInner>,
}

impl Statement {
    pub(crate) fn new(
        connection: Connection,
        read_only: bool,
        scroll: ScrollType,
        concurrency: Concurrency,
        holdability: Holdability,
    ) -> Self {
        let id = Uuid::new_v4().to_string();
        debug!(statement = %id, connection = %connection.id(), read_only, "statement created");
        Statement {
            inner: Arc::new(StatementInner {
                id,
                connection,
                read_only,
                state: Mutex::new(StatementState {
                    closed: false,
                    command: None,
                    scroll,
                    concurrency,
                    holdability,
                    fetch_direction: FetchDirection::default(),
                    fetch_size: NO_LIMIT,
                    max_rows: NO_LIMIT,
                    update_count: NO_UPDATE_RESULT,
                    result_set: None,
                    batch: BatchQueue::default(),
                }),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<StatementInner>) -> Self {
        Statement { inner }
    }

    /// Unique id of this statement, used in logs.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub(crate) fn lock(&self, context: &str) -> Result<MutexGuard<'_, StatementState>> {
        safe_lock(&self.inner.state, context)
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.inner.connection
    }

    pub fn is_read_only(&self) -> bool {
        self.inner.read_only
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().map_or(true, |state| state.closed)
    }

    /// Close the statement and any cursor it still holds. Idempotent.
    pub fn close(&self) -> Result<()> {
        let mut state = self.lock("Statement::close")?;
        if state.closed {
            return Ok(());
        }
        if let Some(mut result_set) = state.result_set.take() {
            result_set.close();
        }
        state.closed = true;
        state.command = None;
        state.update_count = NO_UPDATE_RESULT;
        state.batch.clear();
        debug!(statement = %self.inner.id, "statement closed");
        Ok(())
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Check open and read-only constraints, then compile `sql`.
    fn compile_checked(
        &self,
        state: &StatementState,
        sql: &str,
        closed_key: &str,
    ) -> Result<CompiledCommand> {
        if state.closed {
            return Err(JdbcError::closed(closed_key, &[&sql]));
        }
        if self.inner.read_only && !is_query_text(sql) {
            return Err(JdbcError::argument(
                "Statement.executeUpdateOnReadOnlyConnection",
                &[&sql],
            ));
        }
        CompiledCommand::compile(sql, "Statement.executeEmptyString")
    }

    fn cursor_config(state: &StatementState) -> CursorConfig {
        CursorConfig {
            scroll: state.scroll,
            concurrency: state.concurrency,
            holdability: state.holdability,
            direction: state.fetch_direction,
        }
    }

    /// Build a cursor owned by this statement over `records`.
    pub(crate) fn build_result_set(
        &self,
        state: &StatementState,
        records: Vec<Record>,
    ) -> Result<ResultSet> {
        ResultSet::new(
            self.inner.connection.clone(),
            Arc::downgrade(&self.inner),
            cap_rows(records, state.max_rows),
            Self::cursor_config(state),
            true,
        )
    }

    /// Run a compiled command through the backend command path and record
    /// its outcome.
    ///
    /// Returns true when the outcome is a cursor.
    pub(crate) fn run_command(
        &self,
        state: &mut StatementState,
        command: CompiledCommand,
        params: &[Option<String>],
    ) -> Result<bool> {
        let connection = &self.inner.connection;
        debug!(statement = %self.inner.id, kind = ?command.query_type(), "executing command");

        if let Some(mut previous) = state.result_set.take() {
            previous.close();
        }
        let outcome = connection
            .backend()
            .command(connection.handle(), command.text(), params)
            .map_err(|e| {
                warn!(statement = %self.inner.id, error = %e, "command failed");
                JdbcError::from_backend(command.text(), e)
            });
        state.command = Some(command);

        match outcome? {
            CommandOutcome::Records(records) => {
                let result_set = self.build_result_set(state, records)?;
                state.result_set = Some(result_set);
                state.update_count = NO_UPDATE_RESULT;
                Ok(true)
            }
            CommandOutcome::Record(_) => {
                state.update_count = 1;
                Ok(false)
            }
            CommandOutcome::Count(n) => {
                state.update_count = n;
                Ok(false)
            }
        }
    }

    /// Run a query through the backend query path.
    pub(crate) fn run_query(
        &self,
        state: &mut StatementState,
        command: CompiledCommand,
        params: &[Option<String>],
    ) -> Result<ResultSet> {
        let connection = &self.inner.connection;
        debug!(statement = %self.inner.id, "executing query");

        if let Some(mut previous) = state.result_set.take() {
            previous.close();
        }
        let records = connection
            .backend()
            .query(connection.handle(), command.text(), params)
            .map_err(|e| {
                warn!(statement = %self.inner.id, error = %e, "query failed");
                JdbcError::from_backend(command.text(), e)
            });
        state.command = Some(command);
        state.update_count = NO_UPDATE_RESULT;
        self.build_result_set(state, records?)
    }

    /// Run an update through the backend command path and return its count.
    pub(crate) fn run_update(
        &self,
        state: &mut StatementState,
        command: CompiledCommand,
        params: &[Option<String>],
    ) -> Result<i32> {
        let connection = &self.inner.connection;
        debug!(statement = %self.inner.id, kind = ?command.query_type(), "executing update");

        if let Some(mut previous) = state.result_set.take() {
            previous.close();
        }
        let outcome = connection
            .backend()
            .command(connection.handle(), command.text(), params)
            .map_err(|e| {
                warn!(statement = %self.inner.id, error = %e, "update failed");
                JdbcError::from_backend(command.text(), e)
            });
        let result = outcome.and_then(|o| update_count(command.text(), o));
        state.command = Some(command);
        state.update_count = *result.as_ref().unwrap_or(&NO_UPDATE_RESULT);
        result
    }

    /// Execute any command.
    ///
    /// Returns true when the command produced a cursor, available through
    /// [`Statement::get_result_set`]; false when it produced an update count.
    pub fn execute(&self, sql: &str) -> Result<bool> {
        let mut state = self.lock("Statement::execute")?;
        let command =
            self.compile_checked(&state, sql, "Statement.executeStatementOnClosedObject")?;
        self.run_command(&mut state, command, &[])
    }

    /// Execute a query and hand its cursor to the caller.
    pub fn execute_query(&self, sql: &str) -> Result<ResultSet> {
        let mut state = self.lock("Statement::execute_query")?;
        let command = self.compile_checked(&state, sql, "Statement.executeQueryOnClosedObject")?;
        self.run_query(&mut state, command, &[])
    }

    /// Execute a mutation and return its update count.
    pub fn execute_update(&self, sql: &str) -> Result<i32> {
        let mut state = self.lock("Statement::execute_update")?;
        let command =
            self.compile_checked(&state, sql, "Statement.executeStatementOnClosedObject")?;
        self.run_update(&mut state, command, &[])
    }

    /// [`Statement::execute_update`] with a generated-keys flag; only
    /// `NO_GENERATED_KEYS` is accepted.
    pub fn execute_update_with_keys(&self, sql: &str, generated_keys: i32) -> Result<i32> {
        if self.is_closed() {
            return Err(JdbcError::closed(
                "Statement.executeStatementOnClosedObject",
                &[&sql],
            ));
        }
        check_generated_keys_flag(generated_keys)?;
        self.execute_update(sql)
    }

    /// [`Statement::execute`] with a generated-keys flag.
    pub fn execute_with_keys(&self, sql: &str, generated_keys: i32) -> Result<bool> {
        if self.is_closed() {
            return Err(JdbcError::closed(
                "Statement.executeStatementOnClosedObject",
                &[&sql],
            ));
        }
        check_generated_keys_flag(generated_keys)?;
        self.execute(sql)
    }

    // ========================================================================
    // Batch
    // ========================================================================

    /// Queue a mutation for [`Statement::execute_batch`].
    pub fn add_batch(&self, sql: &str) -> Result<()> {
        let mut state = self.lock("Statement::add_batch")?;
        if state.closed {
            return Err(JdbcError::closed(
                "Statement.addStatementToBatchOnClosedObject",
                &[&sql],
            ));
        }
        if self.inner.read_only {
            return Err(JdbcError::argument(
                "Statement.addStatementToBatchOnReadOnlyConnection",
                &[&sql],
            ));
        }
        if is_query_text(sql) {
            return Err(JdbcError::argument("Statement.addQueryToBatch", &[&sql]));
        }
        let command = CompiledCommand::compile(sql, "Statement.addEmptyStringToBatch")?;
        state.batch.push(BatchEntry {
            command,
            params: Vec::new(),
        });
        Ok(())
    }

    pub fn clear_batch(&self) -> Result<()> {
        let mut state = self.lock("Statement::clear_batch")?;
        if state.closed {
            return Err(JdbcError::closed("Statement.clearBatchOnClosedObject", &[]));
        }
        state.batch.clear();
        Ok(())
    }

    /// Run every queued entry in order and empty the queue.
    pub fn execute_batch(&self) -> Result<Vec<i32>> {
        let mut state = self.lock("Statement::execute_batch")?;
        if state.closed {
            return Err(JdbcError::closed("Statement.executeBatchOnClosedObject", &[]));
        }
        if self.inner.read_only {
            return Err(JdbcError::argument(
                "Statement.addStatementToBatchOnReadOnlyConnection",
                &[&"batch"],
            ));
        }
        if let Some(mut previous) = state.result_set.take() {
            previous.close();
        }
        state.update_count = NO_UPDATE_RESULT;

        let entries = state.batch.take();
        debug!(statement = %self.inner.id, entries = entries.len(), "executing batch");
        let connection = &self.inner.connection;
        execute_entries(connection.backend().as_ref(), connection.handle(), &entries)
    }

    // ========================================================================
    // Results
    // ========================================================================

    /// Hand over the cursor produced by the last execution. A second call
    /// returns `None`.
    pub fn get_result_set(&self) -> Result<Option<ResultSet>> {
        let mut state = self.lock("Statement::get_result_set")?;
        if state.closed {
            return Err(JdbcError::closed("Statement.getResultSetFromClosedObject", &[]));
        }
        Ok(state.result_set.take())
    }

    /// Update count of the last execution, or `NO_UPDATE_RESULT`.
    pub fn get_update_count(&self) -> Result<i32> {
        let state = self.lock("Statement::get_update_count")?;
        if state.closed {
            return Err(JdbcError::closed("Statement.getUpdateCountFromClosedObject", &[]));
        }
        Ok(state.update_count)
    }

    /// Only one result is ever produced.
    pub fn get_more_results(&self) -> Result<bool> {
        Ok(false)
    }

    pub fn get_generated_keys(&self) -> Result<ResultSet> {
        Err(JdbcError::unsupported("Statement::get_generated_keys"))
    }

    pub fn get_connection(&self) -> Result<Connection> {
        let state = self.lock("Statement::get_connection")?;
        if state.closed {
            return Err(JdbcError::closed("Statement.getConnectionFromClosedObject", &[]));
        }
        Ok(self.inner.connection.clone())
    }

    /// Last compiled command, if any.
    pub fn get_command(&self) -> Result<Option<CompiledCommand>> {
        Ok(self.lock("Statement::get_command")?.command.clone())
    }

    // ========================================================================
    // Settings
    // ========================================================================

    fn read_setting<T>(
        &self,
        what: &str,
        read: impl FnOnce(&StatementState) -> T,
    ) -> Result<T> {
        let state = self.lock("Statement::read_setting")?;
        if state.closed {
            return Err(JdbcError::closed("Statement.getSettingFromClosedObject", &[&what]));
        }
        Ok(read(&state))
    }

    fn write_setting(&self, what: &str, write: impl FnOnce(&mut StatementState)) -> Result<()> {
        let mut state = self.lock("Statement::write_setting")?;
        if state.closed {
            return Err(JdbcError::closed("Statement.settingOnClosedObject", &[&what]));
        }
        write(&mut state);
        Ok(())
    }

    pub fn get_result_set_type(&self) -> Result<i32> {
        self.read_setting("result set type", |s| s.scroll.code())
    }

    pub fn get_result_set_concurrency(&self) -> Result<i32> {
        self.read_setting("result set concurrency", |s| s.concurrency.code())
    }

    pub fn get_result_set_holdability(&self) -> Result<i32> {
        self.read_setting("result set holdability", |s| s.holdability.code())
    }

    pub fn get_fetch_direction(&self) -> Result<i32> {
        self.read_setting("fetch direction", |s| s.fetch_direction.code())
    }

    /// Preferred direction for cursors built by later executions.
    pub fn set_fetch_direction(&self, direction: i32) -> Result<()> {
        let direction = FetchDirection::from_code(direction)?;
        self.write_setting("the fetch direction", |s| s.fetch_direction = direction)
    }

    pub fn get_fetch_size(&self) -> Result<i32> {
        self.read_setting("fetch size", |s| s.fetch_size)
    }

    pub fn set_fetch_size(&self, rows: i32) -> Result<()> {
        if rows < 0 {
            return Err(JdbcError::argument("ResultSet.badFetchSize", &[&rows]));
        }
        self.write_setting("the fetch size", |s| s.fetch_size = rows)
    }

    pub fn get_max_rows(&self) -> Result<i32> {
        let state = self.lock("Statement::get_max_rows")?;
        if state.closed {
            return Err(JdbcError::closed("Statement.getMaxRowsFromClosedObject", &[]));
        }
        Ok(state.max_rows)
    }

    /// Cap the rows materialized by later executions; `NO_LIMIT` removes the cap.
    pub fn set_max_rows(&self, max: i32) -> Result<()> {
        if max < 0 {
            return Err(JdbcError::argument("ResultSet.badMaxRows", &[&max]));
        }
        self.write_setting("the max rows", |s| s.max_rows = max)
    }

    pub fn get_max_field_size(&self) -> Result<i32> {
        let state = self.lock("Statement::get_max_field_size")?;
        if state.closed {
            return Err(JdbcError::closed("Statement.getMaxFieldSizeFromClosedObject", &[]));
        }
        Ok(NO_LIMIT)
    }

    pub fn set_max_field_size(&self, _max: i32) -> Result<()> {
        Err(JdbcError::unsupported("Statement::set_max_field_size"))
    }

    pub fn get_query_timeout(&self) -> Result<i32> {
        let state = self.lock("Statement::get_query_timeout")?;
        if state.closed {
            return Err(JdbcError::closed("Statement.getQueryTimeoutFromClosedObject", &[]));
        }
        Ok(NO_LIMIT)
    }

    pub fn set_query_timeout(&self, _seconds: i32) -> Result<()> {
        Err(JdbcError::unsupported("Statement::set_query_timeout"))
    }

    pub fn is_poolable(&self) -> Result<bool> {
        let state = self.lock("Statement::is_poolable")?;
        if state.closed {
            return Err(JdbcError::closed("Statement.getPoolableFromClosedObject", &[]));
        }
        Ok(false)
    }

    /// Pooling is never offered; only `false` is accepted.
    pub fn set_poolable(&self, poolable: bool) -> Result<()> {
        if poolable {
            Err(JdbcError::unsupported("Statement::set_poolable"))
        } else {
            Ok(())
        }
    }

    pub fn cancel(&self) -> Result<()> {
        Err(JdbcError::unsupported("Statement::cancel"))
    }

    pub fn set_cursor_name(&self, _name: &str) -> Result<()> {
        Err(JdbcError::unsupported("Statement::set_cursor_name"))
    }

    pub fn set_escape_processing(&self, _enable: bool) -> Result<()> {
        Err(JdbcError::unsupported("Statement::set_escape_processing"))
    }

    /// Warnings are never produced.
    pub fn get_warnings(&self) -> Result<Option<String>> {
        Ok(None)
    }

    pub fn clear_warnings(&self) -> Result<()> {
        Ok(())
    }
}
