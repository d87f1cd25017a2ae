/// Connection lifecycle management for OrientJdbc
///
/// A [`Connection`] owns exactly one backend database handle, bound through
/// one of four variants:
/// - **document**: plain document store (default)
/// - **native graph**: the backend's own graph layer
/// - **object**: legacy object-mapped database
/// - **tinkerpop graph**: third-party graph library wrapping a raw document
///   database
///
/// Statements and cursors only see the [`DatabaseBinding`] trait; the
/// concrete variant is reachable through [`Connection::unwrap`].
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::Backend;
use crate::capability::{Concurrency, Holdability, IsolationLevel, ScrollType};
use crate::constants::{
    connection_type, NO_GENERATED_KEYS, RETURN_GENERATED_KEYS, TRANSACTION_READ_COMMITTED,
};
use crate::error::{message, JdbcError, Result};
use crate::metadata::DatabaseMetaData;
use crate::models::{DbHandle, TxMode};
use crate::prepared::PreparedStatement;
use crate::statement::Statement;
use crate::transaction::{AutoCommitState, TransactionScope};
use crate::utils::safe_lock_arc;

/// Backend binding variant selected by the `type` connection property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionKind {
    Document,
    NativeGraph,
    Object,
    TinkerpopGraph,
}

impl ConnectionKind {
    /// Value of the `type` property selecting this variant.
    pub fn property_value(self) -> &'static str {
        match self {
            ConnectionKind::Document => connection_type::DOCUMENT,
            ConnectionKind::NativeGraph => connection_type::NATIVE_GRAPH,
            ConnectionKind::Object => connection_type::OBJECT,
            ConnectionKind::TinkerpopGraph => connection_type::TINKERPOP_GRAPH,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ConnectionKind::Document => "document",
            ConnectionKind::NativeGraph => "native graph",
            ConnectionKind::Object => "object",
            ConnectionKind::TinkerpopGraph => "tinkerpop graph",
        }
    }

    pub fn is_graph(self) -> bool {
        matches!(
            self,
            ConnectionKind::NativeGraph | ConnectionKind::TinkerpopGraph
        )
    }
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Capability set every connection variant provides.
///
/// Transaction primitives default to the plain backend calls in optimistic
/// mode; variants override them where their library differs.
pub trait DatabaseBinding: Send + Sync + fmt::Debug {
    fn kind(&self) -> ConnectionKind;

    fn backend(&self) -> &Arc<dyn Backend>;

    fn handle(&self) -> &DbHandle;

    fn is_closed(&self) -> bool {
        self.backend().is_closed(self.handle())
    }

    fn begin(&self) -> Result<()> {
        self.backend()
            .begin(self.handle(), TxMode::Optimistic)
            .map_err(|e| JdbcError::from_backend("BEGIN", e))
    }

    fn commit(&self) -> Result<()> {
        self.backend()
            .commit(self.handle())
            .map_err(|e| JdbcError::from_backend("COMMIT", e))
    }

    fn rollback(&self) -> Result<()> {
        self.backend()
            .rollback(self.handle())
            .map_err(|e| JdbcError::from_backend("ROLLBACK", e))
    }

    fn close(&self) -> Result<()> {
        self.backend()
            .close(self.handle())
            .map_err(|e| JdbcError::from_backend("CLOSE", e))
    }

    /// Objects this binding can be unwrapped into, most specific first.
    fn wrapped(&self) -> Vec<&dyn Any>;
}

fn require_non_empty(value: &str, what: &str) -> Result<()> {
    if value.is_empty() {
        Err(JdbcError::argument("Connection.emptyArgument", &[&what]))
    } else {
        Ok(())
    }
}

/// Plain document database: the raw handle every variant builds on.
#[derive(Debug, Clone)]
pub struct DocumentDatabase {
    backend: Arc<dyn Backend>,
    handle: DbHandle,
}

impl DocumentDatabase {
    /// Open a document database.
    ///
    /// # Arguments
    /// - `backend`: engine serving the URL
    /// - `url`: engine-relative database URL
    /// - `user`, `password`: credentials; all three must be non-empty
    pub fn open(backend: Arc<dyn Backend>, url: &str, user: &str, password: &str) -> Result<Self> {
        Self::open_as(backend, url, user, password, "URL of the document database")
    }

    fn open_as(
        backend: Arc<dyn Backend>,
        url: &str,
        user: &str,
        password: &str,
        url_description: &str,
    ) -> Result<Self> {
        require_non_empty(url, url_description)?;
        require_non_empty(user, "username")?;
        require_non_empty(password, "password")?;

        let handle = backend.open(url, user, password).map_err(|e| {
            warn!(url, error = %e, "failed to open database");
            JdbcError::Backend {
                message: message("Connection.openFailed", &[&url, &e]),
                source: e,
            }
        })?;
        Ok(DocumentDatabase { backend, handle })
    }

    /// Database name.
    pub fn name(&self) -> &str {
        &self.handle.database
    }

    pub fn url(&self) -> &str {
        &self.handle.url
    }

    pub fn user(&self) -> &str {
        &self.handle.user
    }
}

impl DatabaseBinding for DocumentDatabase {
    fn kind(&self) -> ConnectionKind {
        ConnectionKind::Document
    }

    fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    fn handle(&self) -> &DbHandle {
        &self.handle
    }

    fn wrapped(&self) -> Vec<&dyn Any> {
        vec![self as &dyn Any]
    }
}

macro_rules! wrapping_variant {
    ($(#[$meta:meta])* $name:ident, $description:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            raw: DocumentDatabase,
        }

        impl $name {
            pub fn open(
                backend: Arc<dyn Backend>,
                url: &str,
                user: &str,
                password: &str,
            ) -> Result<Self> {
                Ok($name {
                    raw: DocumentDatabase::open_as(backend, url, user, password, $description)?,
                })
            }

            /// The underlying document database.
            pub fn raw_database(&self) -> &DocumentDatabase {
                &self.raw
            }
        }
    };
}

wrapping_variant!(
    /// The backend's own graph layer over a document database.
    NativeGraphDatabase,
    "URL of the graph database"
);

wrapping_variant!(
    /// Legacy object-mapped database.
    ObjectDatabase,
    "URL of the object database"
);

wrapping_variant!(
    /// Third-party graph library handle. Its raw graph is the document
    /// database the connection actually runs commands on.
    TinkerpopGraph,
    "URL of the tinkerpop graph database"
);

impl TinkerpopGraph {
    /// Raw document database behind the graph.
    pub fn raw_graph(&self) -> &DocumentDatabase {
        &self.raw
    }
}

macro_rules! delegate_binding {
    ($name:ident, $kind:expr) => {
        impl DatabaseBinding for $name {
            fn kind(&self) -> ConnectionKind {
                $kind
            }

            fn backend(&self) -> &Arc<dyn Backend> {
                &self.raw.backend
            }

            fn handle(&self) -> &DbHandle {
                &self.raw.handle
            }

            fn wrapped(&self) -> Vec<&dyn Any> {
                vec![self as &dyn Any, &self.raw as &dyn Any]
            }
        }
    };
}

delegate_binding!(NativeGraphDatabase, ConnectionKind::NativeGraph);
delegate_binding!(ObjectDatabase, ConnectionKind::Object);
delegate_binding!(TinkerpopGraph, ConnectionKind::TinkerpopGraph);

#[derive(Debug, Default)]
struct ConnectionState {
    auto_commit: AutoCommitState,
    read_only: bool,
    holdability: Holdability,
    closed: bool,
}

#[derive(Debug)]
struct ConnectionInner {
    id: String,
    binding: Box<dyn DatabaseBinding>,
    state: Arc<Mutex<ConnectionState>>,
}

/// A client connection over one backend database handle.
///
/// Cloning is cheap and yields another reference to the same connection.
#[derive(Debug, Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    /// Open a connection of the given variant.
    ///
    /// # Arguments
    /// - `kind`: binding variant
    /// - `backend`: engine serving the URL
    /// - `url`: engine-relative database URL
    /// - `user`, `password`: credentials
    pub fn open(
        kind: ConnectionKind,
        backend: Arc<dyn Backend>,
        url: &str,
        user: &str,
        password: &str,
    ) -> Result<Self> {
        let binding: Box<dyn DatabaseBinding> = match kind {
            ConnectionKind::Document => {
                Box::new(DocumentDatabase::open(backend, url, user, password)?)
            }
            ConnectionKind::NativeGraph => {
                Box::new(NativeGraphDatabase::open(backend, url, user, password)?)
            }
            ConnectionKind::Object => Box::new(ObjectDatabase::open(backend, url, user, password)?),
            ConnectionKind::TinkerpopGraph => {
                Box::new(TinkerpopGraph::open(backend, url, user, password)?)
            }
        };
        Ok(Self::from_binding(binding))
    }

    /// Wrap an already opened binding.
    pub fn from_binding(binding: Box<dyn DatabaseBinding>) -> Self {
        let id = Uuid::new_v4().to_string();
        info!(
            connection = %id,
            kind = %binding.kind(),
            database = %binding.handle().database,
            "connection opened"
        );
        Connection {
            inner: Arc::new(ConnectionInner {
                id,
                binding,
                state: Arc::new(Mutex::new(ConnectionState::default())),
            }),
        }
    }

    /// Unique id of this connection, used in logs.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> ConnectionKind {
        self.inner.binding.kind()
    }

    pub(crate) fn binding(&self) -> &dyn DatabaseBinding {
        self.inner.binding.as_ref()
    }

    pub(crate) fn backend(&self) -> &Arc<dyn Backend> {
        self.inner.binding.backend()
    }

    pub(crate) fn handle(&self) -> &DbHandle {
        self.inner.binding.handle()
    }

    fn with_state<T>(
        &self,
        context: &str,
        closed_key: &str,
        f: impl FnOnce(&mut ConnectionState) -> Result<T>,
    ) -> Result<T> {
        let mut state = safe_lock_arc(&self.inner.state, context)?;
        if state.closed || self.inner.binding.is_closed() {
            return Err(JdbcError::closed(closed_key, &[]));
        }
        f(&mut state)
    }

    /// True once closed here or when the backend reports the handle closed.
    pub fn is_closed(&self) -> bool {
        match self.inner.state.lock() {
            Ok(state) => state.closed || self.inner.binding.is_closed(),
            Err(_) => true,
        }
    }

    /// Close the connection and release the backend handle. Idempotent.
    pub fn close(&self) -> Result<()> {
        let mut state = safe_lock_arc(&self.inner.state, "Connection::close")?;
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        self.inner.binding.close()?;
        info!(connection = %self.inner.id, "connection closed");
        Ok(())
    }

    // ========================================================================
    // Statement factories
    // ========================================================================

    pub fn create_statement(&self) -> Result<Statement> {
        self.new_statement(
            ScrollType::default(),
            Concurrency::default(),
            Holdability::default(),
        )
    }

    /// Create a statement with the given result set type and concurrency codes.
    pub fn create_statement_with(&self, scroll_type: i32, concurrency: i32) -> Result<Statement> {
        self.new_statement(
            ScrollType::from_code(scroll_type)?,
            Concurrency::from_code(concurrency)?,
            Holdability::default(),
        )
    }

    pub fn create_statement_with_holdability(
        &self,
        scroll_type: i32,
        concurrency: i32,
        holdability: i32,
    ) -> Result<Statement> {
        self.new_statement(
            ScrollType::from_code(scroll_type)?,
            Concurrency::from_code(concurrency)?,
            Holdability::from_code(holdability)?,
        )
    }

    fn new_statement(
        &self,
        scroll: ScrollType,
        concurrency: Concurrency,
        holdability: Holdability,
    ) -> Result<Statement> {
        let read_only = self.with_state(
            "Connection::create_statement",
            "Connection.statementCreationOnClosedObject",
            |state| Ok(state.read_only),
        )?;
        Ok(Statement::new(
            self.clone(),
            read_only,
            scroll,
            concurrency,
            holdability,
        ))
    }

    /// Prepare a command for repeated execution with positional parameters.
    pub fn prepare_statement(&self, sql: &str) -> Result<PreparedStatement> {
        self.new_prepared(
            sql,
            ScrollType::default(),
            Concurrency::default(),
            Holdability::default(),
        )
    }

    pub fn prepare_statement_with(
        &self,
        sql: &str,
        scroll_type: i32,
        concurrency: i32,
    ) -> Result<PreparedStatement> {
        self.new_prepared(
            sql,
            ScrollType::from_code(scroll_type)?,
            Concurrency::from_code(concurrency)?,
            Holdability::default(),
        )
    }

    pub fn prepare_statement_with_holdability(
        &self,
        sql: &str,
        scroll_type: i32,
        concurrency: i32,
        holdability: i32,
    ) -> Result<PreparedStatement> {
        self.new_prepared(
            sql,
            ScrollType::from_code(scroll_type)?,
            Concurrency::from_code(concurrency)?,
            Holdability::from_code(holdability)?,
        )
    }

    /// Prepare a command with a generated-keys flag.
    ///
    /// Only `NO_GENERATED_KEYS` is accepted; `RETURN_GENERATED_KEYS` is
    /// unsupported and any other value is an argument error.
    pub fn prepare_statement_with_keys(
        &self,
        sql: &str,
        generated_keys: i32,
    ) -> Result<PreparedStatement> {
        check_generated_keys_flag(generated_keys)?;
        self.prepare_statement(sql)
    }

    pub fn prepare_statement_with_column_indexes(
        &self,
        _sql: &str,
        _column_indexes: &[i32],
    ) -> Result<PreparedStatement> {
        Err(JdbcError::unsupported("Connection::prepare_statement_with_column_indexes"))
    }

    pub fn prepare_statement_with_column_names(
        &self,
        _sql: &str,
        _column_names: &[&str],
    ) -> Result<PreparedStatement> {
        Err(JdbcError::unsupported("Connection::prepare_statement_with_column_names"))
    }

    fn new_prepared(
        &self,
        sql: &str,
        scroll: ScrollType,
        concurrency: Concurrency,
        holdability: Holdability,
    ) -> Result<PreparedStatement> {
        let read_only = {
            let state = safe_lock_arc(&self.inner.state, "Connection::prepare_statement")?;
            if state.closed || self.inner.binding.is_closed() {
                return Err(JdbcError::closed(
                    "Connection.preparedStatementCreationOnClosedObject",
                    &[&sql],
                ));
            }
            state.read_only
        };
        let statement = Statement::new(self.clone(), read_only, scroll, concurrency, holdability);
        PreparedStatement::new(statement, sql)
    }

    pub fn prepare_call(&self, _sql: &str) -> Result<Statement> {
        Err(JdbcError::unsupported("Connection::prepare_call"))
    }

    pub fn native_sql(&self, _sql: &str) -> Result<String> {
        Err(JdbcError::unsupported("Connection::native_sql"))
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Switch autocommit on or off.
    ///
    /// Disabling begins a backend transaction; re-enabling commits the
    /// pending one first.
    pub fn set_auto_commit(&self, enabled: bool) -> Result<()> {
        let binding = self.inner.binding.as_ref();
        self.with_state(
            "Connection::set_auto_commit",
            "Connection.setAutoCommitOnClosedObject",
            |state| {
                state.auto_commit = state.auto_commit.switch(enabled, binding)?;
                Ok(())
            },
        )
    }

    pub fn get_auto_commit(&self) -> Result<bool> {
        self.with_state(
            "Connection::get_auto_commit",
            "Connection.getAutoCommitFlagFromClosedObject",
            |state| Ok(state.auto_commit.is_enabled()),
        )
    }

    /// Commit the pending transaction. Only legal with autocommit disabled.
    pub fn commit(&self) -> Result<()> {
        let binding = self.inner.binding.as_ref();
        self.with_state(
            "Connection::commit",
            "Connection.commitOnClosedObject",
            |state| state.auto_commit.commit(binding),
        )
    }

    /// Roll back the pending transaction. Only legal with autocommit disabled.
    pub fn rollback(&self) -> Result<()> {
        let binding = self.inner.binding.as_ref();
        self.with_state(
            "Connection::rollback",
            "Connection.rollbackOnClosedObject",
            |state| state.auto_commit.rollback(binding),
        )
    }

    /// Run a manual transaction section guarded by [`TransactionScope`].
    pub fn transaction(&self) -> Result<TransactionScope<'_>> {
        TransactionScope::begin(self)
    }

    pub fn get_transaction_isolation(&self) -> Result<i32> {
        self.with_state(
            "Connection::get_transaction_isolation",
            "Connection.getTransactionIsolationFromClosedObject",
            |_| Ok(TRANSACTION_READ_COMMITTED),
        )
    }

    /// Only read-committed is accepted, as a no-op.
    pub fn set_transaction_isolation(&self, level: i32) -> Result<()> {
        let level = IsolationLevel::from_code(level)
            .map_err(|_| JdbcError::argument("Connection.badIsolationLevel", &[&level]))?;
        if level == IsolationLevel::ReadCommitted {
            Ok(())
        } else {
            Err(JdbcError::unsupported("Connection::set_transaction_isolation"))
        }
    }

    pub fn set_savepoint(&self, _name: Option<&str>) -> Result<()> {
        Err(JdbcError::unsupported("Connection::set_savepoint"))
    }

    pub fn release_savepoint(&self, _name: &str) -> Result<()> {
        Err(JdbcError::unsupported("Connection::release_savepoint"))
    }

    pub fn rollback_to_savepoint(&self, _name: &str) -> Result<()> {
        Err(JdbcError::unsupported("Connection::rollback_to_savepoint"))
    }

    // ========================================================================
    // Flags and properties
    // ========================================================================

    pub fn set_read_only(&self, read_only: bool) -> Result<()> {
        self.with_state(
            "Connection::set_read_only",
            "Connection.setReadOnlyFlagOnClosedObject",
            |state| {
                state.read_only = read_only;
                Ok(())
            },
        )
    }

    pub fn is_read_only(&self) -> Result<bool> {
        self.with_state(
            "Connection::is_read_only",
            "Connection.getReadOnlyFlagFromClosedObject",
            |state| Ok(state.read_only),
        )
    }

    /// Database name.
    pub fn get_catalog(&self) -> Result<String> {
        self.with_state(
            "Connection::get_catalog",
            "Connection.getCatalogFromClosedObject",
            |_| Ok(self.handle().database.clone()),
        )
    }

    pub fn set_catalog(&self, _catalog: &str) -> Result<()> {
        Err(JdbcError::unsupported("Connection::set_catalog"))
    }

    /// Engine-relative URL the database was opened with.
    pub fn get_url(&self) -> &str {
        &self.handle().url
    }

    pub fn get_holdability(&self) -> Result<i32> {
        let state = safe_lock_arc(&self.inner.state, "Connection::get_holdability")?;
        Ok(state.holdability.code())
    }

    /// Only the default (hold over commit) is accepted.
    pub fn set_holdability(&self, holdability: i32) -> Result<()> {
        match Holdability::from_code(holdability)? {
            Holdability::HoldOverCommit => Ok(()),
            Holdability::CloseAtCommit => Err(JdbcError::unsupported("Connection::set_holdability")),
        }
    }

    /// Negative timeouts are rejected; otherwise true while open.
    pub fn is_valid(&self, timeout: i32) -> Result<bool> {
        if timeout < 0 {
            return Err(JdbcError::argument("Connection.badTimeout", &[&timeout]));
        }
        Ok(!self.is_closed())
    }

    pub fn get_metadata(&self) -> Result<DatabaseMetaData> {
        self.with_state(
            "Connection::get_metadata",
            "Connection.getDatabaseMetaDataFromClosedObject",
            |_| Ok(()),
        )?;
        Ok(DatabaseMetaData::new(self.clone()))
    }

    pub fn get_type_map(&self) -> Result<()> {
        Err(JdbcError::unsupported("Connection::get_type_map"))
    }

    pub fn set_type_map(&self) -> Result<()> {
        Err(JdbcError::unsupported("Connection::set_type_map"))
    }

    pub fn get_client_info(&self, _name: &str) -> Result<String> {
        Err(JdbcError::unsupported("Connection::get_client_info"))
    }

    pub fn set_client_info(&self, _name: &str, _value: &str) -> Result<()> {
        Err(JdbcError::unsupported("Connection::set_client_info"))
    }

    pub fn get_warnings(&self) -> Result<()> {
        Err(JdbcError::unsupported("Connection::get_warnings"))
    }

    pub fn clear_warnings(&self) -> Result<()> {
        Err(JdbcError::unsupported("Connection::clear_warnings"))
    }

    pub fn create_blob(&self) -> Result<crate::blob::Blob> {
        Err(JdbcError::unsupported("Connection::create_blob"))
    }

    pub fn create_clob(&self) -> Result<String> {
        Err(JdbcError::unsupported("Connection::create_clob"))
    }

    pub fn create_array_of(&self, _type_name: &str) -> Result<()> {
        Err(JdbcError::unsupported("Connection::create_array_of"))
    }

    pub fn create_struct(&self, _type_name: &str) -> Result<()> {
        Err(JdbcError::unsupported("Connection::create_struct"))
    }

    // ========================================================================
    // Wrapper
    // ========================================================================

    /// Access the variant's database object as `T`.
    pub fn unwrap<T: Any>(&self) -> Result<&T> {
        self.inner
            .binding
            .wrapped()
            .into_iter()
            .find_map(|candidate| candidate.downcast_ref::<T>())
            .ok_or_else(|| {
                JdbcError::Unwrap(message(
                    "Wrapper.wrongInterface",
                    &[&self.kind(), &std::any::type_name::<T>()],
                ))
            })
    }

    pub fn is_wrapper_for<T: Any>(&self) -> bool {
        self.inner
            .binding
            .wrapped()
            .into_iter()
            .any(|candidate| candidate.is::<T>())
    }
}

/// Validate a generated-keys flag.
pub(crate) fn check_generated_keys_flag(flag: i32) -> Result<()> {
    match flag {
        NO_GENERATED_KEYS => Ok(()),
        RETURN_GENERATED_KEYS => Err(JdbcError::unsupported("RETURN_GENERATED_KEYS")),
        other => Err(JdbcError::argument(
            "Statement.badGeneratedKeysFlag",
            &[&other],
        )),
    }
}
