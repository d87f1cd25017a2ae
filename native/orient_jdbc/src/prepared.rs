/// Prepared statements with positional parameters
///
/// A [`PreparedStatement`] compiles its command once and binds values to
/// `?` placeholders by 1-based index. Every value is serialized to its
/// textual form when bound; the backend receives the list of texts, with
/// `None` for SQL null.
///
/// All statement-level settings (max rows, fetch size, result set access,
/// close state) are shared with the wrapped [`Statement`], reachable through
/// `Deref`.
use std::ops::Deref;
use std::sync::Mutex;

use rust_decimal::Decimal;
use time::{Date, PrimitiveDateTime, Time};
use tracing::debug;

use crate::batch::BatchEntry;
use crate::constants::MIN_COLUMN_INDEX;
use crate::cursor::ResultSet;
use crate::decode::{format_date_parameter, format_decimal, format_time_parameter, format_timestamp};
use crate::error::{JdbcError, Result};
use crate::metadata::ResultSetMetaData;
use crate::models::Value;
use crate::query::CompiledCommand;
use crate::statement::Statement;
use crate::utils::safe_lock;

#[derive(Debug)]
struct PreparedState {
    command: CompiledCommand,
    params: Vec<Option<String>>,
}

/// A precompiled command with bound parameters.
#[derive(Debug)]
pub struct PreparedStatement {
    statement: Statement,
    state: Mutex<PreparedState>,
}

impl Deref for PreparedStatement {
    type Target = Statement;

    fn deref(&self) -> &Statement {
        &self.statement
    }
}

impl PreparedStatement {
    pub(crate) fn new(statement: Statement, sql: &str) -> Result<Self> {
        let command = CompiledCommand::compile(sql, "PreparedStatement.compileEmptyString")?;
        debug!(statement = %statement.id(), "statement prepared");
        Ok(PreparedStatement {
            statement,
            state: Mutex::new(PreparedState {
                command,
                params: Vec::new(),
            }),
        })
    }

    /// Compiled form of the prepared command.
    pub fn command(&self) -> Result<CompiledCommand> {
        Ok(safe_lock(&self.state, "PreparedStatement::command")?.command.clone())
    }

    /// Currently bound parameter texts; `None` marks a null or unset slot.
    pub fn parameters(&self) -> Result<Vec<Option<String>>> {
        Ok(safe_lock(&self.state, "PreparedStatement::parameters")?.params.clone())
    }

    fn snapshot(&self, context: &str) -> Result<(CompiledCommand, Vec<Option<String>>)> {
        let state = safe_lock(&self.state, context)?;
        Ok((state.command.clone(), state.params.clone()))
    }

    /// Close the statement and drop every bound parameter.
    pub fn close(&self) -> Result<()> {
        safe_lock(&self.state, "PreparedStatement::close")?.params.clear();
        self.statement.close()
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Execute the prepared command.
    ///
    /// A query stores its cursor for [`Statement::get_result_set`] and returns
    /// true; a mutation runs as an update and returns false.
    pub fn execute(&self) -> Result<bool> {
        let (command, params) = self.snapshot("PreparedStatement::execute")?;
        let mut state = self.statement.lock("PreparedStatement::execute")?;
        self.check_executable(state.closed, &command, "Statement.executeStatementOnClosedObject")?;

        if command.is_query() {
            let result_set = self.statement.run_query(&mut state, command, &params)?;
            state.result_set = Some(result_set);
            Ok(true)
        } else {
            self.statement.run_update(&mut state, command, &params)?;
            Ok(false)
        }
    }

    /// Execute the prepared query and hand its cursor to the caller.
    pub fn execute_query(&self) -> Result<ResultSet> {
        let (command, params) = self.snapshot("PreparedStatement::execute_query")?;
        let mut state = self.statement.lock("PreparedStatement::execute_query")?;
        self.check_executable(state.closed, &command, "Statement.executeQueryOnClosedObject")?;
        if !command.is_query() {
            return Err(JdbcError::argument(
                "Statement.executeUpdateAsQuery",
                &[&command.text()],
            ));
        }
        self.statement.run_query(&mut state, command, &params)
    }

    /// Execute the prepared mutation and return its update count.
    pub fn execute_update(&self) -> Result<i32> {
        let (command, params) = self.snapshot("PreparedStatement::execute_update")?;
        let mut state = self.statement.lock("PreparedStatement::execute_update")?;
        self.check_executable(state.closed, &command, "Statement.executeStatementOnClosedObject")?;
        self.statement.run_update(&mut state, command, &params)
    }

    fn check_executable(&self, closed: bool, command: &CompiledCommand, closed_key: &str) -> Result<()> {
        if closed {
            return Err(JdbcError::closed(closed_key, &[&command.text()]));
        }
        if self.statement.is_read_only() && !command.is_query() {
            return Err(JdbcError::argument(
                "Statement.executeUpdateOnReadOnlyConnection",
                &[&command.text()],
            ));
        }
        Ok(())
    }

    /// Snapshot the bound parameters into the batch and clear them.
    pub fn add_batch(&self) -> Result<()> {
        let mut prepared = safe_lock(&self.state, "PreparedStatement::add_batch")?;
        let mut state = self.statement.lock("PreparedStatement::add_batch")?;
        let text = prepared.command.text().to_string();
        if state.closed {
            return Err(JdbcError::closed(
                "PreparedStatement.addBatchParametersOnClosedObject",
                &[],
            ));
        }
        if self.statement.is_read_only() {
            return Err(JdbcError::argument(
                "Statement.addStatementToBatchOnReadOnlyConnection",
                &[&text],
            ));
        }
        if prepared.command.is_query() {
            return Err(JdbcError::argument("Statement.addQueryToBatch", &[&text]));
        }

        let params = std::mem::take(&mut prepared.params);
        state.batch.push(BatchEntry {
            command: prepared.command.clone(),
            params,
        });
        Ok(())
    }

    /// Run the prepared mutation once per batched parameter snapshot.
    pub fn execute_batch(&self) -> Result<Vec<i32>> {
        self.statement.execute_batch()
    }

    /// Metadata of the cursor produced by the last execution, if still held.
    pub fn get_metadata(&self) -> Result<Option<ResultSetMetaData>> {
        let state = self.statement.lock("PreparedStatement::get_metadata")?;
        if state.closed {
            return Err(JdbcError::closed("PreparedStatement.getMetaDataFromClosedObject", &[]));
        }
        state.result_set.as_ref().map(ResultSet::get_metadata).transpose()
    }

    pub fn get_parameter_metadata(&self) -> Result<ResultSetMetaData> {
        Err(JdbcError::unsupported("PreparedStatement::get_parameter_metadata"))
    }

    // ========================================================================
    // Parameter binding
    // ========================================================================

    /// Store `value` at `index - 1`, padding with nulls as needed.
    fn bind(&self, index: i32, value: Option<String>) -> Result<()> {
        if self.statement.is_closed() {
            return Err(JdbcError::closed(
                "PreparedStatement.setParameterOnClosedObject",
                &[&index],
            ));
        }
        if index < MIN_COLUMN_INDEX {
            return Err(JdbcError::argument(
                "PreparedStatement.parameterIndexLessThanMin",
                &[&MIN_COLUMN_INDEX, &index],
            ));
        }

        let mut state = safe_lock(&self.state, "PreparedStatement::bind")?;
        let slot = (index - MIN_COLUMN_INDEX) as usize;
        if state.params.len() <= slot {
            state.params.resize(slot + 1, None);
        }
        state.params[slot] = value;
        Ok(())
    }

    pub fn clear_parameters(&self) -> Result<()> {
        if self.statement.is_closed() {
            return Err(JdbcError::closed(
                "PreparedStatement.clearParameterOnClosedObject",
                &[],
            ));
        }
        safe_lock(&self.state, "PreparedStatement::clear_parameters")?.params.clear();
        Ok(())
    }

    pub fn set_null(&self, index: i32) -> Result<()> {
        self.bind(index, None)
    }

    pub fn set_boolean(&self, index: i32, value: bool) -> Result<()> {
        self.bind(index, Some(value.to_string()))
    }

    pub fn set_byte(&self, index: i32, value: i8) -> Result<()> {
        self.bind(index, Some(value.to_string()))
    }

    pub fn set_short(&self, index: i32, value: i16) -> Result<()> {
        self.bind(index, Some(value.to_string()))
    }

    pub fn set_int(&self, index: i32, value: i32) -> Result<()> {
        self.bind(index, Some(value.to_string()))
    }

    pub fn set_long(&self, index: i32, value: i64) -> Result<()> {
        self.bind(index, Some(value.to_string()))
    }

    pub fn set_float(&self, index: i32, value: f32) -> Result<()> {
        self.bind(index, Some(value.to_string()))
    }

    pub fn set_double(&self, index: i32, value: f64) -> Result<()> {
        self.bind(index, Some(value.to_string()))
    }

    /// Bind a decimal in plain (non-exponent) form.
    pub fn set_decimal(&self, index: i32, value: Decimal) -> Result<()> {
        self.bind(index, Some(format_decimal(value)))
    }

    pub fn set_string(&self, index: i32, value: &str) -> Result<()> {
        self.bind(index, Some(value.to_string()))
    }

    /// Bind a date as a midnight timestamp, `yyyy-MM-dd 00:00:00`.
    pub fn set_date(&self, index: i32, value: Date) -> Result<()> {
        self.bind(index, Some(format_date_parameter(value)))
    }

    pub fn set_time(&self, index: i32, value: Time) -> Result<()> {
        self.bind(index, Some(format_time_parameter(value)))
    }

    pub fn set_timestamp(&self, index: i32, value: PrimitiveDateTime) -> Result<()> {
        self.bind(index, Some(format_timestamp(value)))
    }

    /// Bind any scalar value by its textual form. Binary and nested values
    /// are rejected.
    pub fn set_object(&self, index: i32, value: &Value) -> Result<()> {
        match value {
            Value::Null => self.bind(index, None),
            Value::Binary(_) | Value::Blob(_) => {
                Err(JdbcError::unsupported("PreparedStatement::set_object(binary)"))
            }
            Value::Embedded(_) | Value::List(_) | Value::Set(_) | Value::Map(_) => {
                Err(JdbcError::unsupported("PreparedStatement::set_object(collection)"))
            }
            other => self.bind(index, Some(other.to_string())),
        }
    }

    pub fn set_bytes(&self, _index: i32, _value: &[u8]) -> Result<()> {
        Err(JdbcError::unsupported("PreparedStatement::set_bytes"))
    }

    pub fn set_blob(&self, _index: i32, _value: &[u8]) -> Result<()> {
        Err(JdbcError::unsupported("PreparedStatement::set_blob"))
    }

    pub fn set_binary_stream(&self, _index: i32, _value: &mut dyn std::io::Read) -> Result<()> {
        Err(JdbcError::unsupported("PreparedStatement::set_binary_stream"))
    }

    pub fn set_ascii_stream(&self, _index: i32, _value: &mut dyn std::io::Read) -> Result<()> {
        Err(JdbcError::unsupported("PreparedStatement::set_ascii_stream"))
    }

    pub fn set_character_stream(&self, _index: i32, _value: &mut dyn std::io::Read) -> Result<()> {
        Err(JdbcError::unsupported("PreparedStatement::set_character_stream"))
    }

    pub fn set_clob(&self, _index: i32, _value: &str) -> Result<()> {
        Err(JdbcError::unsupported("PreparedStatement::set_clob"))
    }

    pub fn set_array(&self, _index: i32, _value: &[Value]) -> Result<()> {
        Err(JdbcError::unsupported("PreparedStatement::set_array"))
    }

    pub fn set_url(&self, _index: i32, _value: &str) -> Result<()> {
        Err(JdbcError::unsupported("PreparedStatement::set_url"))
    }
}
