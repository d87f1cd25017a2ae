/// Result set cursors
///
/// A [`ResultSet`] materializes the records returned by one execution into a
/// fixed snapshot and walks it with a position in `[-1, row_count]`:
/// - `-1` and `row_count` are the two sentinel positions outside the rows
/// - under forward direction `-1` is before-first and `row_count` after-last
/// - under reverse direction the meaning of the sentinels swaps
///
/// Field accessors coerce the stored value to the requested client type and
/// remember the label they read for [`ResultSet::was_null`].
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use bytes::Bytes;
use rust_decimal::Decimal;
use time::{Date, PrimitiveDateTime, Time};
use tracing::debug;
use uuid::Uuid;

use crate::blob::Blob;
use crate::capability::{validate_cursor_config, Concurrency, FetchDirection, Holdability, ScrollType};
use crate::connection::Connection;
use crate::constants::{MIN_COLUMN_INDEX, NO_LIMIT, RID_COLUMN_NAME};
use crate::error::{message, JdbcError, Result};
use crate::metadata::ResultSetMetaData;
use crate::models::{Record, Rid, Value};
use crate::statement::{Statement, StatementInner};
use crate::types::{coerce, FieldType};
use crate::utils::safe_lock_arc;

/// Sentinel position before the first row (forward direction).
const BEFORE_FIRST: i32 = -1;

/// Scroll type, concurrency, holdability and direction a cursor is built with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorConfig {
    pub scroll: ScrollType,
    pub concurrency: Concurrency,
    pub holdability: Holdability,
    pub direction: FetchDirection,
}

/// A column reference: a 1-based index or a label.
pub trait ColumnIndex {
    fn resolve(&self, result_set: &ResultSet) -> Result<String>;
}

impl ColumnIndex for i32 {
    fn resolve(&self, result_set: &ResultSet) -> Result<String> {
        result_set.label_at(*self).map(str::to_string)
    }
}

impl ColumnIndex for &str {
    fn resolve(&self, _result_set: &ResultSet) -> Result<String> {
        Ok((*self).to_string())
    }
}

impl ColumnIndex for String {
    fn resolve(&self, _result_set: &ResultSet) -> Result<String> {
        Ok(self.clone())
    }
}

/// Value of `label` in `record`, synthesizing the row-id column from the
/// record identity when no real field carries it.
pub(crate) fn resolve_field(record: &Record, label: &str) -> Value {
    match record.field(label) {
        Some(value) => value.clone(),
        None if label == RID_COLUMN_NAME => Value::Link(record.identity()),
        None => Value::Null,
    }
}

/// Label of a 1-based column index in `field_names`.
pub(crate) fn column_label(field_names: &[String], index: i32) -> Result<&str> {
    if index < MIN_COLUMN_INDEX {
        return Err(JdbcError::argument("ResultSet.columnIndexLessThanMin", &[&index]));
    }
    usize::try_from(index - 1)
        .ok()
        .and_then(|i| field_names.get(i))
        .map(String::as_str)
        .ok_or_else(|| {
            JdbcError::argument(
                "ResultSet.columnIndexGreaterThanMax",
                &[&field_names.len(), &index],
            )
        })
}

/// Records and position of a cursor, shared with its metadata views.
#[derive(Debug)]
pub(crate) struct CursorRows {
    records: Vec<Record>,
    cursor: i32,
    row_count: i32,
    closed: bool,
}

impl CursorRows {
    /// Lock the rows, failing when the cursor is closed.
    ///
    /// # Arguments
    /// - `rows`: shared rows of a cursor
    /// - `operation`: what the caller is about to do, for the error message
    pub(crate) fn open<'a>(
        rows: &'a Arc<Mutex<CursorRows>>,
        operation: &str,
    ) -> Result<MutexGuard<'a, CursorRows>> {
        let guard = safe_lock_arc(rows, "ResultSet rows")?;
        if guard.closed {
            return Err(JdbcError::closed("ResultSet.operationOnClosedObject", &[&operation]));
        }
        Ok(guard)
    }

    fn on_row(&self) -> bool {
        self.cursor >= 0 && self.cursor < self.row_count
    }

    /// The record at the current position.
    pub(crate) fn current(&self) -> Option<&Record> {
        if !self.on_row() {
            return None;
        }
        usize::try_from(self.cursor)
            .ok()
            .and_then(|i| self.records.get(i))
    }

    /// Position on a row index with wrap-around for negative indexes.
    ///
    /// Indexes at or past the end land on `row_count`; negative indexes count
    /// from the end and land on `-1` when they overshoot the start.
    fn move_to_absolute(&mut self, index: i32) -> bool {
        if index >= self.row_count {
            self.cursor = self.row_count;
            false
        } else if index >= 0 {
            self.cursor = index;
            true
        } else {
            let rotated = self.row_count.saturating_add(index);
            if rotated < 0 {
                self.cursor = BEFORE_FIRST;
                false
            } else {
                self.cursor = rotated;
                true
            }
        }
    }

    /// Position on a row index, clamping to the nearest sentinel.
    fn move_clamped(&mut self, index: i32) -> bool {
        if index < 0 {
            self.cursor = BEFORE_FIRST;
            false
        } else {
            self.move_to_absolute(index)
        }
    }
}

/// Navigable snapshot of the records produced by one execution.
///
/// Dropping a cursor closes it, which also invalidates the
/// [`ResultSetMetaData`] views taken from it.
#[derive(Debug)]
pub struct ResultSet {
    id: String,
    connection: Connection,
    statement: Weak<StatementInner>,
    field_names: Arc<[String]>,
    rows: Arc<Mutex<CursorRows>>,
    config: CursorConfig,
    fetch_size: i32,
    last_label: Option<String>,
}

impl ResultSet {
    /// Build a cursor over `records`.
    ///
    /// # Arguments
    /// - `connection`: connection the records were read through
    /// - `statement`: producing statement, if any
    /// - `records`: the snapshot, already capped to the row limit
    /// - `config`: requested cursor configuration, validated here
    /// - `include_rid`: prepend the row-id column when the first record
    ///   does not carry one
    pub(crate) fn new(
        connection: Connection,
        statement: Weak<StatementInner>,
        records: Vec<Record>,
        config: CursorConfig,
        include_rid: bool,
    ) -> Result<Self> {
        validate_cursor_config(
            config.scroll,
            config.concurrency,
            config.holdability,
            connection.kind().name(),
        )?;
        if config.direction == FetchDirection::Reverse && config.scroll == ScrollType::ForwardOnly {
            return Err(JdbcError::capability(
                "ResultSet.incompatibleFetchDirection",
                &[&config.direction.code()],
            ));
        }

        let mut field_names: Vec<String> = records
            .first()
            .map(|first| first.field_names().into_iter().map(str::to_string).collect())
            .unwrap_or_default();
        if include_rid
            && !records.is_empty()
            && !field_names.iter().any(|name| name == RID_COLUMN_NAME)
        {
            field_names.insert(0, RID_COLUMN_NAME.to_string());
        }

        let row_count = i32::try_from(records.len()).unwrap_or(i32::MAX);
        let cursor = match config.direction {
            FetchDirection::Forward => BEFORE_FIRST,
            FetchDirection::Reverse => row_count,
        };
        let id = Uuid::new_v4().to_string();
        debug!(result_set = %id, rows = row_count, columns = field_names.len(), "result set opened");

        Ok(ResultSet {
            id,
            connection,
            statement,
            field_names: field_names.into(),
            rows: Arc::new(Mutex::new(CursorRows {
                records,
                cursor,
                row_count,
                closed: false,
            })),
            config,
            fetch_size: row_count,
            last_label: None,
        })
    }

    /// Cursor over metadata rows: no statement and no row-id column.
    pub(crate) fn detached(connection: Connection, records: Vec<Record>) -> Result<Self> {
        Self::new(
            connection,
            Weak::new(),
            records,
            CursorConfig::default(),
            false,
        )
    }

    fn open_rows(&self, operation: &str) -> Result<MutexGuard<'_, CursorRows>> {
        CursorRows::open(&self.rows, operation)
    }

    fn scrollable_rows(&self, operation: &str) -> Result<MutexGuard<'_, CursorRows>> {
        let rows = self.open_rows(operation)?;
        if self.config.scroll == ScrollType::ForwardOnly {
            Err(JdbcError::capability("ResultSet.moveWhenForwardOnly", &[&operation]))
        } else {
            Ok(rows)
        }
    }

    fn is_reverse(&self) -> bool {
        self.config.direction == FetchDirection::Reverse
    }

    /// 1-based number of the current position, for error messages.
    fn row_number(&self) -> i32 {
        self.rows.lock().map_or(0, |rows| rows.cursor + 1)
    }

    /// Release the snapshot. Idempotent.
    pub fn close(&mut self) {
        let Ok(mut rows) = safe_lock_arc(&self.rows, "ResultSet::close") else {
            return;
        };
        if !rows.closed {
            rows.records.clear();
            rows.row_count = 0;
            rows.cursor = BEFORE_FIRST;
            rows.closed = true;
            self.statement = Weak::new();
            debug!(result_set = %self.id, "result set closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.rows.lock().map_or(true, |rows| rows.closed)
    }

    /// Number of visible rows.
    pub fn row_count(&self) -> i32 {
        self.rows.lock().map_or(0, |rows| rows.row_count)
    }

    /// Column labels, in order.
    pub fn column_names(&self) -> &[String] {
        &self.field_names
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Advance one row in the fetch direction.
    pub fn next(&mut self) -> Result<bool> {
        let step = if self.is_reverse() { -1 } else { 1 };
        let mut rows = self.open_rows("move to the next row")?;
        let target = rows.cursor.saturating_add(step);
        Ok(rows.move_clamped(target))
    }

    /// Step back one row against the fetch direction.
    pub fn previous(&mut self) -> Result<bool> {
        let step = if self.is_reverse() { 1 } else { -1 };
        let mut rows = self.scrollable_rows("move to the previous row")?;
        let target = rows.cursor.saturating_add(step);
        Ok(rows.move_clamped(target))
    }

    pub fn first(&mut self) -> Result<bool> {
        let reverse = self.is_reverse();
        let mut rows = self.scrollable_rows("move to the first row")?;
        let index = if reverse { rows.row_count - 1 } else { 0 };
        Ok(rows.move_clamped(index))
    }

    pub fn last(&mut self) -> Result<bool> {
        let reverse = self.is_reverse();
        let mut rows = self.scrollable_rows("move to the last row")?;
        let index = if reverse { 0 } else { rows.row_count - 1 };
        Ok(rows.move_clamped(index))
    }

    /// Move to a 1-based row; negative rows count from the end and `0` moves
    /// before the first row.
    pub fn absolute(&mut self, row: i32) -> Result<bool> {
        let mut rows = self.scrollable_rows("move to an absolute position")?;
        Ok(match row {
            0 => {
                rows.cursor = BEFORE_FIRST;
                false
            }
            r if r > 0 => rows.move_to_absolute(r - 1),
            r => rows.move_to_absolute(r),
        })
    }

    /// Move `rows` rows in the fetch direction, clamping at the sentinels.
    pub fn relative(&mut self, rows: i32) -> Result<bool> {
        let reverse = self.is_reverse();
        let mut state = self.scrollable_rows("move to a relative position")?;
        let target = if reverse {
            state.cursor.saturating_sub(rows)
        } else {
            state.cursor.saturating_add(rows)
        };
        Ok(state.move_clamped(target))
    }

    pub fn before_first(&mut self) -> Result<()> {
        let reverse = self.is_reverse();
        let mut rows = self.scrollable_rows("move before the first row")?;
        rows.cursor = if reverse { rows.row_count } else { BEFORE_FIRST };
        Ok(())
    }

    pub fn after_last(&mut self) -> Result<()> {
        let reverse = self.is_reverse();
        let mut rows = self.scrollable_rows("move after the last row")?;
        rows.cursor = if reverse { BEFORE_FIRST } else { rows.row_count };
        Ok(())
    }

    pub fn is_before_first(&self) -> Result<bool> {
        let rows = self.open_rows("read the before-first flag")?;
        Ok(if self.is_reverse() {
            rows.cursor == rows.row_count
        } else {
            rows.cursor == BEFORE_FIRST
        })
    }

    pub fn is_after_last(&self) -> Result<bool> {
        let rows = self.open_rows("read the after-last flag")?;
        Ok(if self.is_reverse() {
            rows.cursor == BEFORE_FIRST
        } else {
            rows.cursor == rows.row_count
        })
    }

    pub fn is_first(&self) -> Result<bool> {
        let rows = self.open_rows("read the first-row flag")?;
        let first = if self.is_reverse() { rows.row_count - 1 } else { 0 };
        Ok(rows.row_count > 0 && rows.cursor == first)
    }

    pub fn is_last(&self) -> Result<bool> {
        let rows = self.open_rows("read the last-row flag")?;
        let last = if self.is_reverse() { 0 } else { rows.row_count - 1 };
        Ok(rows.row_count > 0 && rows.cursor == last)
    }

    /// 1-based number of the current row, or 0 when outside the rows.
    pub fn get_row(&self) -> Result<i32> {
        let rows = self.open_rows("read the row number")?;
        Ok(if rows.on_row() { rows.cursor + 1 } else { 0 })
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    pub fn get_type(&self) -> Result<i32> {
        self.open_rows("read the result set type")?;
        Ok(self.config.scroll.code())
    }

    pub fn get_concurrency(&self) -> Result<i32> {
        self.open_rows("read the concurrency")?;
        Ok(self.config.concurrency.code())
    }

    pub fn get_holdability(&self) -> Result<i32> {
        self.open_rows("read the holdability")?;
        Ok(self.config.holdability.code())
    }

    pub fn get_fetch_direction(&self) -> Result<i32> {
        self.open_rows("read the fetch direction")?;
        Ok(self.config.direction.code())
    }

    /// Change the fetch direction. Reverse requires a scrollable cursor.
    pub fn set_fetch_direction(&mut self, direction: i32) -> Result<()> {
        self.open_rows("change the fetch direction")?;
        let direction = FetchDirection::from_code(direction)?;
        if direction == FetchDirection::Reverse && self.config.scroll == ScrollType::ForwardOnly {
            return Err(JdbcError::capability(
                "ResultSet.incompatibleFetchDirection",
                &[&direction.code()],
            ));
        }
        self.config.direction = direction;
        Ok(())
    }

    pub fn get_fetch_size(&self) -> Result<i32> {
        self.open_rows("read the fetch size")?;
        Ok(self.fetch_size)
    }

    /// Set the fetch size.
    ///
    /// A positive size smaller than the current row count truncates the
    /// visible rows to that size.
    pub fn set_fetch_size(&mut self, size: i32) -> Result<()> {
        let mut rows = CursorRows::open(&self.rows, "change the fetch size")?;
        if size < 0 {
            return Err(JdbcError::argument("ResultSet.badFetchSize", &[&size]));
        }
        self.fetch_size = size;
        if size > NO_LIMIT && size < rows.row_count {
            rows.row_count = size;
            rows.cursor = rows.cursor.min(size);
        }
        Ok(())
    }

    /// Statement that produced this cursor, while it is still alive.
    pub fn get_statement(&self) -> Result<Option<Statement>> {
        self.open_rows("read the statement")?;
        Ok(self.statement.upgrade().map(Statement::from_inner))
    }

    pub fn get_cursor_name(&self) -> Result<String> {
        self.open_rows("read the cursor name")?;
        Ok(self.id.clone())
    }

    /// Live metadata view: column types follow the current row, and the
    /// view fails once this cursor is closed.
    pub fn get_metadata(&self) -> Result<ResultSetMetaData> {
        self.open_rows("read the metadata")?;
        Ok(ResultSetMetaData::new(
            Arc::clone(&self.field_names),
            Arc::clone(&self.rows),
        ))
    }

    pub fn get_warnings(&self) -> Result<Option<String>> {
        self.open_rows("read the warnings")?;
        Ok(None)
    }

    pub fn clear_warnings(&self) -> Result<()> {
        Ok(())
    }

    // ========================================================================
    // Columns and records
    // ========================================================================

    /// Label of a 1-based column index.
    pub fn label_at(&self, index: i32) -> Result<&str> {
        column_label(&self.field_names, index)
    }

    /// 1-based index of the column with the given label.
    pub fn find_column(&self, label: &str) -> Result<i32> {
        self.open_rows("find a column")?;
        self.field_names
            .iter()
            .position(|name| name == label)
            .and_then(|i| i32::try_from(i + 1).ok())
            .ok_or_else(|| JdbcError::argument("ResultSet.missingColumnLabel", &[&label]))
    }

    /// The record the cursor is positioned on.
    pub fn unwrap_record(&self) -> Result<Option<Record>> {
        let rows = self.open_rows("unwrap the current record")?;
        Ok(rows.current().cloned())
    }

    /// Reload the current record from the backend.
    pub fn refresh_row(&mut self) -> Result<()> {
        let (row, rid) = {
            let rows = self.scrollable_rows("refresh the row")?;
            let rid = rows
                .current()
                .map(Record::identity)
                .ok_or_else(|| JdbcError::argument("ResultSet.noCurrentRow", &[&"refresh"]))?;
            (rows.cursor + 1, rid)
        };

        let fresh = self
            .connection
            .backend()
            .load(self.connection.handle(), rid)
            .map_err(|e| JdbcError::from_backend("LOAD", e))?
            .ok_or_else(|| JdbcError::Backend {
                message: message("ResultSet.refreshMissingRow", &[&row]),
                source: crate::backend::BackendError::NotFound(rid.to_string()),
            })?;

        let mut rows = self.open_rows("refresh the row")?;
        if let Some(slot) = usize::try_from(row - 1)
            .ok()
            .and_then(|i| rows.records.get_mut(i))
        {
            *slot = fresh;
        }
        Ok(())
    }

    /// Delete the current record in the backend. The snapshot keeps the row.
    pub fn delete_row(&mut self) -> Result<()> {
        let rid = self
            .open_rows("delete the row")?
            .current()
            .map(Record::identity)
            .ok_or_else(|| JdbcError::argument("ResultSet.noRowToDelete", &[]))?;
        self.connection
            .backend()
            .delete(self.connection.handle(), rid)
            .map_err(|e| JdbcError::from_backend("DELETE", e))?;
        debug!(result_set = %self.id, %rid, "row deleted");
        Ok(())
    }

    pub fn row_updated(&self) -> Result<bool> {
        self.open_rows("read the row-updated flag")?;
        Ok(false)
    }

    pub fn row_inserted(&self) -> Result<bool> {
        self.open_rows("read the row-inserted flag")?;
        Ok(false)
    }

    pub fn row_deleted(&self) -> Result<bool> {
        self.open_rows("read the row-deleted flag")?;
        Ok(false)
    }

    // ========================================================================
    // Field accessors
    // ========================================================================

    /// Resolve a column, check the cursor is open and remember the label.
    fn begin_read<C: ColumnIndex>(&mut self, column: C, type_name: &str) -> Result<String> {
        let label = column.resolve(self)?;
        if self.is_closed() {
            return Err(JdbcError::closed(
                "ResultSet.getItemByLabelFromClosedObject",
                &[&type_name, &label],
            ));
        }
        self.last_label = Some(label.clone());
        Ok(label)
    }

    fn raw_value(&self, label: &str) -> Result<Value> {
        safe_lock_arc(&self.rows, "ResultSet::raw_value")?
            .current()
            .map(|record| resolve_field(record, label))
            .ok_or_else(|| JdbcError::argument("ResultSet.noCurrentRow", &[&label]))
    }

    fn coerced<C: ColumnIndex>(&mut self, column: C, target: FieldType, type_name: &str) -> Result<Value> {
        let label = self.begin_read(column, type_name)?;
        let value = self.raw_value(&label)?;
        coerce(&value, target).ok_or_else(|| {
            JdbcError::conversion(
                "ResultSet.getItem",
                &[&label, &type_name, &self.row_number(), &format!("cannot convert {value}")],
            )
        })
    }

    /// True when the last column read held null.
    pub fn was_null(&self) -> Result<bool> {
        let rows = self.open_rows("read the was-null flag")?;
        let Some(label) = &self.last_label else {
            return Ok(false);
        };
        Ok(rows
            .current()
            .is_none_or(|record| resolve_field(record, label).is_null()))
    }

    pub fn get_string<C: ColumnIndex>(&mut self, column: C) -> Result<Option<String>> {
        Ok(match self.coerced(column, FieldType::String, "String")? {
            Value::String(v) => Some(v),
            _ => None,
        })
    }

    pub fn get_boolean<C: ColumnIndex>(&mut self, column: C) -> Result<bool> {
        Ok(matches!(
            self.coerced(column, FieldType::Boolean, "bool")?,
            Value::Bool(true)
        ))
    }

    pub fn get_byte<C: ColumnIndex>(&mut self, column: C) -> Result<i8> {
        Ok(match self.coerced(column, FieldType::Byte, "i8")? {
            Value::Byte(v) => v,
            _ => 0,
        })
    }

    pub fn get_short<C: ColumnIndex>(&mut self, column: C) -> Result<i16> {
        Ok(match self.coerced(column, FieldType::Short, "i16")? {
            Value::Short(v) => v,
            _ => 0,
        })
    }

    pub fn get_int<C: ColumnIndex>(&mut self, column: C) -> Result<i32> {
        Ok(match self.coerced(column, FieldType::Integer, "i32")? {
            Value::Int(v) => v,
            _ => 0,
        })
    }

    pub fn get_long<C: ColumnIndex>(&mut self, column: C) -> Result<i64> {
        Ok(match self.coerced(column, FieldType::Long, "i64")? {
            Value::Long(v) => v,
            _ => 0,
        })
    }

    pub fn get_float<C: ColumnIndex>(&mut self, column: C) -> Result<f32> {
        Ok(match self.coerced(column, FieldType::Float, "f32")? {
            Value::Float(v) => v,
            _ => 0.0,
        })
    }

    pub fn get_double<C: ColumnIndex>(&mut self, column: C) -> Result<f64> {
        Ok(match self.coerced(column, FieldType::Double, "f64")? {
            Value::Double(v) => v,
            _ => 0.0,
        })
    }

    pub fn get_decimal<C: ColumnIndex>(&mut self, column: C) -> Result<Option<Decimal>> {
        Ok(match self.coerced(column, FieldType::Decimal, "Decimal")? {
            Value::Decimal(v) => Some(v),
            _ => None,
        })
    }

    /// Decimal value rescaled to `scale` fractional digits.
    pub fn get_decimal_with_scale<C: ColumnIndex>(
        &mut self,
        column: C,
        scale: u32,
    ) -> Result<Option<Decimal>> {
        Ok(self.get_decimal(column)?.map(|mut value| {
            if value.scale() != scale {
                value.rescale(scale);
            }
            value
        }))
    }

    pub fn get_date<C: ColumnIndex>(&mut self, column: C) -> Result<Option<Date>> {
        Ok(match self.coerced(column, FieldType::Date, "Date")? {
            Value::Date(v) => Some(v),
            _ => None,
        })
    }

    pub fn get_time<C: ColumnIndex>(&mut self, column: C) -> Result<Option<Time>> {
        Ok(match self.coerced(column, FieldType::DateTime, "Time")? {
            Value::DateTime(v) => Some(v.time()),
            _ => None,
        })
    }

    pub fn get_timestamp<C: ColumnIndex>(&mut self, column: C) -> Result<Option<PrimitiveDateTime>> {
        Ok(match self.coerced(column, FieldType::DateTime, "PrimitiveDateTime")? {
            Value::DateTime(v) => Some(v),
            _ => None,
        })
    }

    /// Raw bytes of a binary field or binary record.
    pub fn get_bytes<C: ColumnIndex>(&mut self, column: C) -> Result<Option<Bytes>> {
        let label = self.begin_read(column, "Bytes")?;
        match self.raw_value(&label)? {
            Value::Null => Ok(None),
            Value::Blob(data) | Value::Binary(data) => Ok(Some(data)),
            other => match Blob::from_value(&other) {
                Some(blob) => Ok(Some(blob.to_bytes())),
                None => Err(JdbcError::conversion(
                    "ResultSet.getItem",
                    &[&label, &"Bytes", &self.row_number(), &format!("cannot convert {other}")],
                )),
            },
        }
    }

    /// Blob view over a binary record or a list of binary records; `None`
    /// for any other shape.
    pub fn get_blob<C: ColumnIndex>(&mut self, column: C) -> Result<Option<Blob>> {
        let label = self.begin_read(column, "Blob")?;
        Ok(Blob::from_value(&self.raw_value(&label)?))
    }

    /// The stored value as-is.
    pub fn get_object<C: ColumnIndex>(&mut self, column: C) -> Result<Value> {
        let label = self.begin_read(column, "Value")?;
        self.raw_value(&label)
    }

    /// Record identity held by the column, falling back to the current
    /// record's own identity.
    pub fn get_rid<C: ColumnIndex>(&mut self, column: C) -> Result<Rid> {
        let label = self.begin_read(column, "Rid")?;
        let fallback = safe_lock_arc(&self.rows, "ResultSet::get_rid")?
            .current()
            .map(Record::identity)
            .ok_or_else(|| JdbcError::argument("ResultSet.noCurrentRow", &[&label]))?;
        Ok(match self.raw_value(&label)? {
            Value::Link(rid) => rid,
            Value::String(text) => Rid::parse(&text).unwrap_or(fallback),
            _ => fallback,
        })
    }

    pub fn get_array<C: ColumnIndex>(&mut self, _column: C) -> Result<Vec<Value>> {
        Err(JdbcError::unsupported("ResultSet::get_array"))
    }

    pub fn get_character_stream<C: ColumnIndex>(&mut self, _column: C) -> Result<String> {
        Err(JdbcError::unsupported("ResultSet::get_character_stream"))
    }

    pub fn get_clob<C: ColumnIndex>(&mut self, _column: C) -> Result<String> {
        Err(JdbcError::unsupported("ResultSet::get_clob"))
    }

    pub fn get_ref<C: ColumnIndex>(&mut self, _column: C) -> Result<Rid> {
        Err(JdbcError::unsupported("ResultSet::get_ref"))
    }

    // ========================================================================
    // Updates (read-only cursor)
    // ========================================================================

    pub fn update_value<C: ColumnIndex>(&mut self, _column: C, _value: Value) -> Result<()> {
        Err(JdbcError::unsupported("ResultSet::update_value"))
    }

    pub fn update_null<C: ColumnIndex>(&mut self, _column: C) -> Result<()> {
        Err(JdbcError::unsupported("ResultSet::update_null"))
    }

    pub fn update_row(&mut self) -> Result<()> {
        Err(JdbcError::unsupported("ResultSet::update_row"))
    }

    pub fn insert_row(&mut self) -> Result<()> {
        Err(JdbcError::unsupported("ResultSet::insert_row"))
    }

    pub fn move_to_insert_row(&mut self) -> Result<()> {
        Err(JdbcError::unsupported("ResultSet::move_to_insert_row"))
    }

    pub fn move_to_current_row(&mut self) -> Result<()> {
        Err(JdbcError::unsupported("ResultSet::move_to_current_row"))
    }

    pub fn cancel_row_updates(&mut self) -> Result<()> {
        Err(JdbcError::unsupported("ResultSet::cancel_row_updates"))
    }
}

impl Drop for ResultSet {
    fn drop(&mut self) {
        self.close();
    }
}

/// Keep only the first `max_rows` records; `NO_LIMIT` keeps all.
pub(crate) fn cap_rows(mut records: Vec<Record>, max_rows: i32) -> Vec<Record> {
    if let Ok(limit) = usize::try_from(max_rows) {
        if max_rows > NO_LIMIT && records.len() > limit {
            records.truncate(limit);
        }
    }
    records
}
