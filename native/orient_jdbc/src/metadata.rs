/// Result set and database metadata
///
/// [`ResultSetMetaData`] describes the columns of a cursor. It is row
/// dependent: types are read from the record the cursor is positioned on at
/// each call, falling back to inference for undeclared fields.
///
/// [`DatabaseMetaData`] exposes the fixed product/driver identification, the
/// capability matrix and the schema introspection rows (tables, table types,
/// primary keys) built from backend index metadata.
use std::sync::{Arc, Mutex, MutexGuard};

use crate::capability::{
    supports_concurrency, supports_holdability, supports_isolation_level, supports_scroll_type,
    Concurrency, Holdability, IsolationLevel, ScrollType,
};
use crate::connection::Connection;
use crate::constants::{
    COLUMN_NULLABLE_UNKNOWN, DATABASE_PRODUCT_NAME, DRIVER_MAJOR_VERSION, DRIVER_MINOR_VERSION,
    DRIVER_NAME, HOLD_CURSORS_OVER_COMMIT, JDBC_MAJOR_VERSION, JDBC_MINOR_VERSION,
    TRANSACTION_READ_COMMITTED,
};
use crate::cursor::{column_label, resolve_field, CursorRows, ResultSet};
use crate::driver::Driver;
use crate::error::{JdbcError, Result};
use crate::models::{IndexKind, Record, Value};
use crate::types::{column_sql_type, FieldType, SqlType};
use crate::utils::like_matches;

/// Row-dependent column description of a result set.
///
/// A view over the cursor it was taken from: every call reads the record the
/// cursor is positioned on at that moment, and fails once the cursor closes.
#[derive(Debug, Clone)]
pub struct ResultSetMetaData {
    field_names: Arc<[String]>,
    rows: Arc<Mutex<CursorRows>>,
}

impl ResultSetMetaData {
    pub(crate) fn new(field_names: Arc<[String]>, rows: Arc<Mutex<CursorRows>>) -> Self {
        ResultSetMetaData { field_names, rows }
    }

    fn rows(&self, operation: &str) -> Result<MutexGuard<'_, CursorRows>> {
        CursorRows::open(&self.rows, operation)
    }

    fn name_at(&self, column: i32) -> Result<&str> {
        column_label(&self.field_names, column)
    }

    /// Field value of the current record, `None` when off-row.
    fn value_at(&self, column: i32, operation: &str) -> Result<Option<Value>> {
        let rows = self.rows(operation)?;
        let name = self.name_at(column)?;
        Ok(rows.current().map(|record| resolve_field(record, name)))
    }

    /// Declared type of the field in the current record.
    fn declared_type(&self, column: i32, operation: &str) -> Result<Option<FieldType>> {
        let rows = self.rows(operation)?;
        let name = self.name_at(column)?;
        Ok(rows.current().and_then(|record| record.field_type(name)))
    }

    /// Validate the column of an open cursor.
    fn check_column(&self, column: i32, operation: &str) -> Result<()> {
        self.rows(operation)?;
        self.name_at(column).map(|_| ())
    }

    pub fn get_column_count(&self) -> Result<i32> {
        self.rows("read the column count")?;
        Ok(i32::try_from(self.field_names.len()).unwrap_or(i32::MAX))
    }

    pub fn get_column_name(&self, column: i32) -> Result<String> {
        self.rows("read the column name")?;
        self.name_at(column).map(str::to_string)
    }

    pub fn get_column_label(&self, column: i32) -> Result<String> {
        self.get_column_name(column)
    }

    /// Column type code of the field in the current row.
    ///
    /// Without a current row the generic object type is reported.
    pub fn get_column_type(&self, column: i32) -> Result<i32> {
        let rows = self.rows("read the column type")?;
        let name = self.name_at(column)?;
        let Some(record) = rows.current() else {
            return Ok(SqlType::JavaObject.code());
        };
        let value = resolve_field(record, name);
        Ok(column_sql_type(record.field_type(name), &value).code())
    }

    /// Declared backend type name of the field, if any.
    pub fn get_column_type_name(&self, column: i32) -> Result<Option<String>> {
        Ok(self
            .declared_type(column, "read the column type name")?
            .map(|field_type| field_type.name().to_string()))
    }

    /// Runtime type name of the value in the current row.
    pub fn get_column_class_name(&self, column: i32) -> Result<Option<&'static str>> {
        Ok(self
            .value_at(column, "read the column class name")?
            .and_then(|value| value.type_name()))
    }

    /// Always empty: the backend has no catalogs.
    pub fn get_catalog_name(&self, column: i32) -> Result<String> {
        self.check_column(column, "read the catalog name")?;
        Ok(String::new())
    }

    /// Database of the current record.
    pub fn get_schema_name(&self, column: i32) -> Result<String> {
        let rows = self.rows("read the schema name")?;
        self.name_at(column)?;
        Ok(rows
            .current()
            .map(|record| record.database_name().to_string())
            .unwrap_or_default())
    }

    /// Class of the current record.
    pub fn get_table_name(&self, column: i32) -> Result<String> {
        let rows = self.rows("read the table name")?;
        self.name_at(column)?;
        Ok(rows
            .current()
            .and_then(Record::class_name)
            .map(str::to_string)
            .unwrap_or_default())
    }

    pub fn get_precision(&self, column: i32) -> Result<i32> {
        self.check_column(column, "read the precision")?;
        Ok(0)
    }

    pub fn get_scale(&self, column: i32) -> Result<i32> {
        self.check_column(column, "read the scale")?;
        Ok(0)
    }

    pub fn get_column_display_size(&self, _column: i32) -> Result<i32> {
        Err(JdbcError::unsupported("ResultSetMetaData::get_column_display_size"))
    }

    pub fn is_nullable(&self, column: i32) -> Result<i32> {
        self.check_column(column, "read the nullability")?;
        Ok(COLUMN_NULLABLE_UNKNOWN)
    }

    /// True when the current value is text.
    pub fn is_case_sensitive(&self, column: i32) -> Result<bool> {
        Ok(matches!(
            self.value_at(column, "read the case sensitivity")?,
            Some(Value::String(_))
        ))
    }

    /// True when the declared type of the field is numeric.
    pub fn is_signed(&self, column: i32) -> Result<bool> {
        Ok(self
            .declared_type(column, "read the signedness")?
            .is_some_and(|field_type| field_type.is_numeric()))
    }

    pub fn is_auto_increment(&self, column: i32) -> Result<bool> {
        self.check_column(column, "read the auto-increment flag")?;
        Ok(false)
    }

    pub fn is_currency(&self, column: i32) -> Result<bool> {
        self.check_column(column, "read the currency flag")?;
        Ok(false)
    }

    pub fn is_searchable(&self, column: i32) -> Result<bool> {
        self.check_column(column, "read the searchable flag")?;
        Ok(true)
    }

    pub fn is_read_only(&self, column: i32) -> Result<bool> {
        self.check_column(column, "read the read-only flag")?;
        Ok(true)
    }

    pub fn is_writable(&self, column: i32) -> Result<bool> {
        self.check_column(column, "read the writable flag")?;
        Ok(false)
    }

    pub fn is_definitely_writable(&self, column: i32) -> Result<bool> {
        self.check_column(column, "read the writable flag")?;
        Ok(false)
    }
}

/// Database-wide metadata of a connection.
#[derive(Debug, Clone)]
pub struct DatabaseMetaData {
    connection: Connection,
}

impl DatabaseMetaData {
    pub(crate) fn new(connection: Connection) -> Self {
        DatabaseMetaData { connection }
    }

    pub fn get_connection(&self) -> &Connection {
        &self.connection
    }

    // ========================================================================
    // Identification
    // ========================================================================

    pub fn get_database_product_name(&self) -> &'static str {
        DATABASE_PRODUCT_NAME
    }

    pub fn get_database_product_version(&self) -> String {
        self.connection.backend().version()
    }

    pub fn get_driver_name(&self) -> &'static str {
        DRIVER_NAME
    }

    pub fn get_driver_version(&self) -> String {
        Driver::version()
    }

    pub fn get_driver_major_version(&self) -> i32 {
        DRIVER_MAJOR_VERSION
    }

    pub fn get_driver_minor_version(&self) -> i32 {
        DRIVER_MINOR_VERSION
    }

    pub fn get_jdbc_major_version(&self) -> i32 {
        JDBC_MAJOR_VERSION
    }

    pub fn get_jdbc_minor_version(&self) -> i32 {
        JDBC_MINOR_VERSION
    }

    pub fn get_url(&self) -> &str {
        self.connection.get_url()
    }

    pub fn get_user_name(&self) -> &str {
        &self.connection.handle().user
    }

    /// `graph` for the graph variants, `database` otherwise.
    pub fn get_schema_term(&self) -> &'static str {
        if self.connection.kind().is_graph() {
            "graph"
        } else {
            "database"
        }
    }

    pub fn get_default_transaction_isolation(&self) -> i32 {
        TRANSACTION_READ_COMMITTED
    }

    pub fn get_result_set_holdability(&self) -> i32 {
        HOLD_CURSORS_OVER_COMMIT
    }

    pub fn is_read_only(&self) -> Result<bool> {
        self.connection.is_read_only()
    }

    // ========================================================================
    // Capabilities
    // ========================================================================

    pub fn supports_transactions(&self) -> bool {
        true
    }

    pub fn supports_batch_updates(&self) -> bool {
        true
    }

    pub fn supports_savepoints(&self) -> bool {
        false
    }

    pub fn supports_get_generated_keys(&self) -> bool {
        false
    }

    pub fn supports_stored_procedures(&self) -> bool {
        false
    }

    pub fn supports_transaction_isolation_level(&self, level: i32) -> Result<bool> {
        let level = IsolationLevel::from_code(level)
            .map_err(|_| JdbcError::argument("Metadata.badIsolationLevel", &[&level]))?;
        Ok(supports_isolation_level(level))
    }

    pub fn supports_result_set_type(&self, scroll_type: i32) -> Result<bool> {
        Ok(supports_scroll_type(ScrollType::from_code(scroll_type)?))
    }

    pub fn supports_result_set_concurrency(&self, scroll_type: i32, concurrency: i32) -> Result<bool> {
        Ok(supports_concurrency(
            ScrollType::from_code(scroll_type)?,
            Concurrency::from_code(concurrency)?,
        ))
    }

    pub fn supports_result_set_holdability(&self, holdability: i32) -> Result<bool> {
        Ok(supports_holdability(Holdability::from_code(holdability)?))
    }

    // ========================================================================
    // Schema rows
    // ========================================================================

    fn rows(&self, records: Vec<Record>) -> Result<ResultSet> {
        ResultSet::detached(self.connection.clone(), records)
    }

    fn row(&self) -> Record {
        Record::anonymous().with_database(self.connection.handle().database.clone())
    }

    /// One row per key field of every unique index of `table`.
    ///
    /// Columns: TABLE_CAT, TABLE_SCHEMA, TABLE_NAME, COLUMN_NAME, KEY_SEQ,
    /// PK_NAME.
    pub fn get_primary_keys(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
    ) -> Result<ResultSet> {
        let indexes = self
            .connection
            .backend()
            .class_indexes(self.connection.handle(), table)
            .map_err(|e| JdbcError::from_backend("getPrimaryKeys", e))?;

        let mut records = Vec::new();
        for index in indexes.iter().filter(|i| i.kind == IndexKind::Unique) {
            for (seq, field) in (1..).zip(index.fields.iter()) {
                records.push(
                    self.row()
                        .with("TABLE_CAT", catalog)
                        .with("TABLE_SCHEMA", schema)
                        .with("TABLE_NAME", table)
                        .with("COLUMN_NAME", field.as_str())
                        .with_typed("KEY_SEQ", Value::Int(seq), FieldType::Integer)
                        .with("PK_NAME", index.name.as_str()),
                );
            }
        }
        self.rows(records)
    }

    /// The single table type, `TABLE`.
    pub fn get_table_types(&self) -> Result<ResultSet> {
        let records = vec![self.row().with("TABLE_TYPE", "TABLE")];
        self.rows(records)
    }

    /// One row per record class whose name matches `table_pattern`.
    ///
    /// Columns: TABLE_CAT, TABLE_SCHEM, TABLE_NAME, TABLE_TYPE, REMARKS.
    /// A `types` filter without `TABLE` yields no rows.
    pub fn get_tables(
        &self,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        table_pattern: Option<&str>,
        types: Option<&[&str]>,
    ) -> Result<ResultSet> {
        if types.is_some_and(|t| !t.iter().any(|ty| ty.eq_ignore_ascii_case("TABLE"))) {
            return self.rows(Vec::new());
        }
        let mut classes = self
            .connection
            .backend()
            .class_names(self.connection.handle())
            .map_err(|e| JdbcError::from_backend("getTables", e))?;
        classes.sort();

        let records = classes
            .iter()
            .filter(|name| table_pattern.is_none_or(|pattern| like_matches(name, pattern)))
            .map(|name| {
                self.row()
                    .with("TABLE_CAT", catalog)
                    .with("TABLE_SCHEM", schema_pattern)
                    .with("TABLE_NAME", name.as_str())
                    .with("TABLE_TYPE", "TABLE")
                    .with("REMARKS", Value::Null)
            })
            .collect();
        self.rows(records)
    }

    pub fn get_columns(&self, _table_pattern: &str) -> Result<ResultSet> {
        Err(JdbcError::unsupported("DatabaseMetaData::get_columns"))
    }

    pub fn get_index_info(&self, _table: &str) -> Result<ResultSet> {
        Err(JdbcError::unsupported("DatabaseMetaData::get_index_info"))
    }

    pub fn get_imported_keys(&self, _table: &str) -> Result<ResultSet> {
        Err(JdbcError::unsupported("DatabaseMetaData::get_imported_keys"))
    }
}
