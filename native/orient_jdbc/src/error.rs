/// Error types and the diagnostics catalog
///
/// Every failure raised by this crate is a [`JdbcError`]. Messages are resolved
/// from a static catalog keyed by symbolic names (for example
/// `Statement.executeEmptyString`) with positional `{0}`, `{1}` placeholders.
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt::Display;
use thiserror::Error;

use crate::backend::BackendError;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, JdbcError>;

/// X/Open SQL state codes.
pub mod sql_state {
    pub const SUCCESS: &str = "00000";
    pub const DISCONNECT_ERROR: &str = "01002";
    pub const FEATURE_NOT_SUPPORTED: &str = "0A000";
    pub const SYNTAX_ERROR: &str = "42000";
    pub const GENERAL_ERROR: &str = "HY000";
}

/// Errors raised by connections, statements, cursors and metadata.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JdbcError {
    /// Operation invoked on a closed connection, statement or cursor.
    #[error("{0}")]
    Closed(String),

    /// Requested scroll type / concurrency / holdability / isolation is not
    /// available, or a navigation call is illegal for the cursor's type.
    #[error("{0}")]
    Capability(String),

    /// Out-of-domain argument: column index, fetch size, parameter index, ...
    #[error("{0}")]
    Argument(String),

    #[error("{0}")]
    FeatureNotSupported(String),

    /// The backend could not parse the command text.
    #[error("{message}")]
    Syntax {
        message: String,
        #[source]
        source: BackendError,
    },

    /// A batched execution failed; `partial` holds the update counts of the
    /// entries that completed before the failure.
    #[error("{message}")]
    Batch { message: String, partial: Vec<i32> },

    #[error("{0}")]
    Unwrap(String),

    #[error("{0}")]
    WrongConnectionType(String),

    /// Operational failure reported by the backend.
    #[error("{message}")]
    Backend {
        message: String,
        #[source]
        source: BackendError,
    },

    /// A stored value cannot be coerced to the requested client type.
    #[error("{0}")]
    Conversion(String),

    #[error("{0}")]
    LockPoisoned(String),
}

impl JdbcError {
    pub fn closed(key: &str, args: &[&dyn Display]) -> Self {
        JdbcError::Closed(message(key, args))
    }

    pub fn capability(key: &str, args: &[&dyn Display]) -> Self {
        JdbcError::Capability(message(key, args))
    }

    pub fn argument(key: &str, args: &[&dyn Display]) -> Self {
        JdbcError::Argument(message(key, args))
    }

    /// Feature-not-supported error naming the offending operation.
    pub fn unsupported(operation: &str) -> Self {
        JdbcError::FeatureNotSupported(message("Feature.notSupported", &[&operation]))
    }

    pub fn conversion(key: &str, args: &[&dyn Display]) -> Self {
        JdbcError::Conversion(message(key, args))
    }

    /// Wrap a backend failure raised while running `command`.
    ///
    /// Parse failures become [`JdbcError::Syntax`]; every other failure
    /// becomes [`JdbcError::Backend`].
    pub fn from_backend(command: &str, source: BackendError) -> Self {
        match source {
            BackendError::Parse(_) => JdbcError::Syntax {
                message: message("Statement.syntaxError", &[&command, &source]),
                source,
            },
            _ => JdbcError::Backend {
                message: message("Backend.operationFailed", &[&command, &source]),
                source,
            },
        }
    }

    /// X/Open SQL state for this error.
    pub fn sql_state(&self) -> &'static str {
        match self {
            JdbcError::FeatureNotSupported(_) => sql_state::FEATURE_NOT_SUPPORTED,
            JdbcError::Syntax { .. } => sql_state::SYNTAX_ERROR,
            _ => sql_state::GENERAL_ERROR,
        }
    }
}

static CATALOG: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        // Generic
        ("Feature.notSupported", "{0} is not supported"),
        ("Backend.operationFailed", "The backend failed to execute \"{0}\": {1}"),
        ("Lock.poisoned", "Mutex poisoned in {0}: {1}"),
        // Driver
        ("Driver.emptyUrl", "The database URL cannot be an empty string"),
        ("Driver.unknownEngine", "No storage engine is registered for \"{0}\""),
        ("Driver.malformedUrl", "Malformed database URL \"{0}\": expected {1}<engine>:<database>"),
        // Connection
        ("Connection.emptyArgument", "The {0} cannot be an empty string"),
        ("Connection.wrongType", "Wrong connection type \"{0}\". Legal values are: {1}"),
        ("Connection.openFailed", "Unable to open \"{0}\": {1}"),
        ("Connection.commitOnClosedObject", "Cannot commit: the connection is closed"),
        ("Connection.commitOnEnabledAutoCommit", "Cannot commit: autocommit is enabled"),
        ("Connection.rollbackOnClosedObject", "Cannot roll back: the connection is closed"),
        ("Connection.rollbackOnEnabledAutoCommit", "Cannot roll back: autocommit is enabled"),
        ("Connection.setAutoCommitOnClosedObject", "Cannot change the autocommit mode: the connection is closed"),
        ("Connection.getAutoCommitFlagFromClosedObject", "Cannot read the autocommit mode: the connection is closed"),
        ("Connection.setReadOnlyFlagOnClosedObject", "Cannot change the read-only flag: the connection is closed"),
        ("Connection.getReadOnlyFlagFromClosedObject", "Cannot read the read-only flag: the connection is closed"),
        ("Connection.getCatalogFromClosedObject", "Cannot read the catalog: the connection is closed"),
        ("Connection.getTransactionIsolationFromClosedObject", "Cannot read the transaction isolation: the connection is closed"),
        ("Connection.getDatabaseMetaDataFromClosedObject", "Cannot read the database metadata: the connection is closed"),
        ("Connection.statementCreationOnClosedObject", "Cannot create a statement: the connection is closed"),
        ("Connection.preparedStatementCreationOnClosedObject", "Cannot prepare \"{0}\": the connection is closed"),
        ("Connection.badTimeout", "The validity timeout must not be negative (found {0})"),
        ("Connection.badIsolationLevel", "Unknown transaction isolation level {0}"),
        ("Connection.transactionScopeInManualMode", "A transaction scope requires autocommit to be enabled"),
        ("Wrapper.wrongInterface", "The {0} connection does not wrap a {1}"),
        // Capability matrix
        ("Capability.badType", "Unknown result set type {0}"),
        ("Capability.badConcurrency", "Unknown result set concurrency {0}"),
        ("Capability.badHoldability", "Unknown result set holdability {0}"),
        ("Capability.badFetchDirection", "Unknown fetch direction {0}"),
        // Statement
        ("Statement.executeStatementOnClosedObject", "Cannot execute \"{0}\": the statement is closed"),
        ("Statement.executeQueryOnClosedObject", "Cannot execute the query \"{0}\": the statement is closed"),
        ("Statement.executeBatchOnClosedObject", "Cannot execute the batch: the statement is closed"),
        ("Statement.executeEmptyString", "Cannot execute an empty command"),
        ("Statement.executeUpdateOnReadOnlyConnection", "Cannot execute \"{0}\" on a read-only connection"),
        ("Statement.executeQueryAsUpdate", "The query \"{0}\" returned records and cannot be executed as an update"),
        ("Statement.executeUpdateAsQuery", "The command \"{0}\" does not return records and cannot be executed as a query"),
        ("Statement.syntaxError", "Syntax error in \"{0}\": {1}"),
        ("Statement.batchFailed", "Batch entry {0} failed: {1}"),
        ("Statement.addStatementToBatchOnClosedObject", "Cannot add \"{0}\" to the batch: the statement is closed"),
        ("Statement.addStatementToBatchOnReadOnlyConnection", "Cannot add \"{0}\" to the batch of a read-only connection"),
        ("Statement.addQueryToBatch", "Queries cannot be batched: \"{0}\""),
        ("Statement.addEmptyStringToBatch", "Cannot add an empty command to the batch"),
        ("Statement.clearBatchOnClosedObject", "Cannot clear the batch: the statement is closed"),
        ("Statement.getResultSetFromClosedObject", "Cannot read the result set: the statement is closed"),
        ("Statement.getUpdateCountFromClosedObject", "Cannot read the update count: the statement is closed"),
        ("Statement.getConnectionFromClosedObject", "Cannot read the connection: the statement is closed"),
        ("Statement.getMaxRowsFromClosedObject", "Cannot read the max rows: the statement is closed"),
        ("Statement.getMaxFieldSizeFromClosedObject", "Cannot read the max field size: the statement is closed"),
        ("Statement.getQueryTimeoutFromClosedObject", "Cannot read the query timeout: the statement is closed"),
        ("Statement.getPoolableFromClosedObject", "Cannot read the poolable flag: the statement is closed"),
        ("Statement.getSettingFromClosedObject", "Cannot read the {0}: the statement is closed"),
        ("Statement.settingOnClosedObject", "Cannot change {0}: the statement is closed"),
        ("Statement.badGeneratedKeysFlag", "Unknown generated keys flag {0}"),
        // Prepared statement
        ("PreparedStatement.compileEmptyString", "Cannot prepare an empty command"),
        ("PreparedStatement.parameterIndexLessThanMin", "The parameter index must be at least {0} (found {1})"),
        ("PreparedStatement.setParameterOnClosedObject", "Cannot set parameter {0}: the statement is closed"),
        ("PreparedStatement.clearParameterOnClosedObject", "Cannot clear the parameters: the statement is closed"),
        ("PreparedStatement.getMetaDataFromClosedObject", "Cannot read the metadata: the statement is closed"),
        ("PreparedStatement.addBatchParametersOnClosedObject", "Cannot add the parameters to the batch: the statement is closed"),
        // Result set
        ("ResultSet.unsupportedType", "Result set type {0} is not supported by the {1} connection"),
        ("ResultSet.unsupportedConcurrency", "Result set concurrency {0} is not supported by the {1} connection"),
        ("ResultSet.unsupportedHoldability", "Result set holdability {0} is not supported by the {1} connection"),
        ("ResultSet.operationOnClosedObject", "Cannot {0}: the result set is closed"),
        ("ResultSet.getItemByLabelFromClosedObject", "Cannot read \"{1}\" as {0}: the result set is closed"),
        ("ResultSet.getItem", "Cannot read \"{0}\" as {1} at row {2}: {3}"),
        ("ResultSet.noCurrentRow", "Cannot read \"{0}\": the cursor is not positioned on a row"),
        ("ResultSet.moveWhenForwardOnly", "Cannot {0} on a forward-only result set"),
        ("ResultSet.incompatibleFetchDirection", "Fetch direction {0} is not allowed on a forward-only result set"),
        ("ResultSet.badFetchSize", "The fetch size must not be negative (found {0})"),
        ("ResultSet.badMaxRows", "The max rows must not be negative (found {0})"),
        ("ResultSet.columnIndexLessThanMin", "The column index must be at least 1 (found {0})"),
        ("ResultSet.columnIndexGreaterThanMax", "The column index must be at most {0} (found {1})"),
        ("ResultSet.missingColumnLabel", "No column is labelled \"{0}\""),
        ("ResultSet.refreshMissingRow", "Cannot refresh row {0}: the record no longer exists"),
        ("ResultSet.noRowToDelete", "Cannot delete: the cursor is not positioned on a row"),
        // Blob
        ("Blob.positionLessThanMin", "The blob position must be at least 1 (found {0})"),
        ("Blob.positionOutOfRange", "Blob position {0} is out of range"),
        // Metadata
        ("Metadata.badIsolationLevel", "Unknown transaction isolation level {0}"),
    ])
});

/// Resolve a catalog key into a message, substituting positional arguments.
///
/// The template is scanned once from left to right, so placeholder text
/// inside an argument is never substituted again. A missing key renders as
/// `!key!`; a placeholder without a matching argument is kept as written.
pub fn message(key: &str, args: &[&dyn Display]) -> String {
    let Some(template) = CATALOG.get(key) else {
        return format!("!{key}!");
    };

    let mut rendered = String::with_capacity(template.len());
    let mut rest: &str = template;
    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let placeholder = after.find('}').and_then(|close| {
            after[..close]
                .parse::<usize>()
                .ok()
                .and_then(|index| args.get(index))
                .map(|arg| (close, arg))
        });
        match placeholder {
            Some((close, arg)) => {
                rendered.push_str(&arg.to_string());
                rest = &after[close + 1..];
            }
            None => {
                rendered.push('{');
                rest = after;
            }
        }
    }
    rendered.push_str(rest);
    rendered
}
