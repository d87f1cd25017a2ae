/// In-process storage engine
///
/// A small, fully in-memory implementation of [`Backend`]. Databases are keyed
/// by name and shared by every handle opened on them. It understands a compact
/// command language:
///
/// - `CREATE CLASS <name>`, `DROP CLASS <name>`
/// - `CREATE PROPERTY <class>.<field> <TYPE>`
/// - `CREATE INDEX <class>.<field> UNIQUE|NOTUNIQUE`,
///   `CREATE INDEX <name> ON <class> (<field>, ...) UNIQUE|NOTUNIQUE`
/// - `INSERT INTO <class> SET f = v, ...` or `INSERT INTO <class> (f, ...) VALUES (v, ...)`
/// - `SELECT [* | count(*) | f, ...] FROM <class> | #c:p [WHERE ...] [ORDER BY f [ASC|DESC]] [LIMIT n]`
/// - `UPDATE <class> SET f = v, ... [WHERE ...]`
/// - `DELETE FROM <class> [WHERE ...]`
///
/// Conditions combine `=`, `<>`, `!=`, `<`, `<=`, `>`, `>=`, `LIKE`,
/// `IS [NOT] NULL` with `AND`, `OR`, `NOT` and parentheses. `?` binds the next
/// positional parameter. Parameters arrive as text; declared properties
/// coerce them on write and comparisons coerce across numeric/text forms.
///
/// A handle inside a transaction works on a private copy of the database taken
/// at `begin`. Its writes are logged and replayed onto the shared database on
/// `commit`; `rollback` discards the copy. Other handles never see uncommitted
/// work.
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::backend::{Backend, BackendError};
use crate::constants::{MEMORY_ENGINE, RID_COLUMN_NAME};
use crate::models::{CommandOutcome, DbHandle, IndexInfo, IndexKind, Record, Rid, TxMode, Value};
use crate::types::{coerce, FieldType};
use crate::utils::like_matches;

fn lock<'a, T>(mutex: &'a Mutex<T>, context: &str) -> Result<MutexGuard<'a, T>, BackendError> {
    mutex
        .lock()
        .map_err(|e| BackendError::Operation(format!("Mutex poisoned in {context}: {e}")))
}

#[derive(Debug, Clone)]
struct ClassData {
    name: String,
    cluster: i32,
    next_position: i64,
    properties: BTreeMap<String, FieldType>,
    indexes: Vec<IndexInfo>,
    records: BTreeMap<i64, Record>,
}

#[derive(Debug, Clone, Default)]
struct MemoryDatabase {
    name: String,
    /// Keyed by lower-cased class name
    classes: BTreeMap<String, ClassData>,
    next_cluster: i32,
}

/// A write made inside a transaction, replayed on commit.
#[derive(Debug, Clone)]
enum PendingWrite {
    Command {
        text: String,
        params: Vec<Option<String>>,
    },
    Delete(Rid),
}

#[derive(Debug)]
struct PendingTransaction {
    working: MemoryDatabase,
    writes: Vec<PendingWrite>,
}

#[derive(Debug)]
struct HandleState {
    database: Arc<Mutex<MemoryDatabase>>,
    transaction: Option<PendingTransaction>,
}

impl HandleState {
    /// Run `f` against the transaction's working copy, or the shared
    /// database when no transaction is open.
    fn with_database<R>(
        &mut self,
        context: &str,
        f: impl FnOnce(&mut MemoryDatabase) -> Result<R, BackendError>,
    ) -> Result<R, BackendError> {
        match self.transaction.as_mut() {
            Some(transaction) => f(&mut transaction.working),
            None => f(&mut *lock(&self.database, context)?),
        }
    }

    fn log(&mut self, write: PendingWrite) {
        if let Some(transaction) = self.transaction.as_mut() {
            transaction.writes.push(write);
        }
    }
}

fn live_state<'a>(
    handles: &'a mut HashMap<String, HandleState>,
    handle: &DbHandle,
) -> Result<&'a mut HandleState, BackendError> {
    handles
        .get_mut(&handle.id)
        .ok_or_else(|| BackendError::Closed(handle.id.clone()))
}

/// Shared in-memory engine.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    databases: Mutex<HashMap<String, Arc<Mutex<MemoryDatabase>>>>,
    handles: Mutex<HashMap<String, HandleState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend::default()
    }

    /// Store a record directly, creating its class if needed.
    ///
    /// Used to seed data the command language cannot express (binary
    /// records, embedded documents, typed fields).
    pub fn insert_record(&self, database: &str, record: Record) -> Result<Record, BackendError> {
        let db = self.database(database)?;
        let mut db = lock(&db, "MemoryBackend::insert_record")?;
        let class_name = record.class_name().unwrap_or("O").to_string();
        db.ensure_class(&class_name);
        db.store_new(&class_name, record)
    }

    /// Remove a database and everything in it.
    pub fn drop_database(&self, database: &str) -> Result<(), BackendError> {
        lock(&self.databases, "MemoryBackend::drop_database")?.remove(database);
        Ok(())
    }

    fn database(&self, name: &str) -> Result<Arc<Mutex<MemoryDatabase>>, BackendError> {
        let mut databases = lock(&self.databases, "MemoryBackend::database")?;
        let db = databases
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(MemoryDatabase {
                    name: name.to_string(),
                    ..MemoryDatabase::default()
                }))
            })
            .clone();
        Ok(db)
    }

    /// Run `f` against the database as `handle` currently sees it.
    fn with_handle<R>(
        &self,
        handle: &DbHandle,
        context: &str,
        f: impl FnOnce(&mut MemoryDatabase) -> Result<R, BackendError>,
    ) -> Result<R, BackendError> {
        let mut handles = lock(&self.handles, context)?;
        live_state(&mut handles, handle)?.with_database(context, f)
    }
}

/// Extract the database name from `memory:<name>` (or a bare name).
fn database_name(url: &str) -> &str {
    url.strip_prefix(MEMORY_ENGINE)
        .and_then(|rest| rest.strip_prefix(':'))
        .unwrap_or(url)
}

impl Backend for MemoryBackend {
    fn open(&self, url: &str, user: &str, _password: &str) -> Result<DbHandle, BackendError> {
        let name = database_name(url);
        if name.is_empty() {
            return Err(BackendError::Operation(format!(
                "Invalid memory database URL \"{url}\""
            )));
        }

        let database = self.database(name)?;
        let handle = DbHandle {
            id: uuid::Uuid::new_v4().to_string(),
            url: url.to_string(),
            database: name.to_string(),
            user: user.to_string(),
        };

        lock(&self.handles, "MemoryBackend::open")?.insert(
            handle.id.clone(),
            HandleState {
                database,
                transaction: None,
            },
        );
        debug!(handle = %handle.id, database = name, "memory database opened");
        Ok(handle)
    }

    fn is_closed(&self, handle: &DbHandle) -> bool {
        match self.handles.lock() {
            Ok(handles) => !handles.contains_key(&handle.id),
            Err(_) => true,
        }
    }

    fn close(&self, handle: &DbHandle) -> Result<(), BackendError> {
        // Pending work is discarded, as on a dropped connection
        if let Some(state) = lock(&self.handles, "MemoryBackend::close")?.remove(&handle.id) {
            debug!(
                handle = %handle.id,
                discarded = state.transaction.map_or(0, |t| t.writes.len()),
                "memory database closed"
            );
        }
        Ok(())
    }

    fn command(
        &self,
        handle: &DbHandle,
        text: &str,
        params: &[Option<String>],
    ) -> Result<CommandOutcome, BackendError> {
        let command = parse(text, params)?;
        let writes = !matches!(command, Command::Select { .. });
        let mut handles = lock(&self.handles, "MemoryBackend::command")?;
        let state = live_state(&mut handles, handle)?;
        let outcome = state.with_database("MemoryBackend::command", |db| db.execute(command))?;
        if writes {
            state.log(PendingWrite::Command {
                text: text.to_string(),
                params: params.to_vec(),
            });
        }
        Ok(outcome)
    }

    fn query(
        &self,
        handle: &DbHandle,
        text: &str,
        params: &[Option<String>],
    ) -> Result<Vec<Record>, BackendError> {
        let command = parse(text, params)?;
        if !matches!(command, Command::Select { .. }) {
            return Err(BackendError::Operation(format!(
                "Only SELECT can be run as a query: \"{text}\""
            )));
        }
        let outcome = self.with_handle(handle, "MemoryBackend::query", |db| db.execute(command))?;
        match outcome {
            CommandOutcome::Records(records) => Ok(records),
            CommandOutcome::Record(record) => Ok(vec![record]),
            CommandOutcome::Count(_) => Ok(Vec::new()),
        }
    }

    fn begin(&self, handle: &DbHandle, _mode: TxMode) -> Result<(), BackendError> {
        let mut handles = lock(&self.handles, "MemoryBackend::begin")?;
        let state = live_state(&mut handles, handle)?;
        if state.transaction.is_none() {
            let working = lock(&state.database, "MemoryBackend::begin database")?.clone();
            state.transaction = Some(PendingTransaction {
                working,
                writes: Vec::new(),
            });
        }
        Ok(())
    }

    fn commit(&self, handle: &DbHandle) -> Result<(), BackendError> {
        let mut handles = lock(&self.handles, "MemoryBackend::commit")?;
        let state = live_state(&mut handles, handle)?;
        let Some(transaction) = state.transaction.as_ref() else {
            return Ok(());
        };

        // A failed replay leaves both the shared database and the
        // transaction untouched
        let mut shared = lock(&state.database, "MemoryBackend::commit database")?;
        let mut published = shared.clone();
        for write in &transaction.writes {
            published.replay(write)?;
        }
        *shared = published;
        drop(shared);

        let committed = state.transaction.take().map_or(0, |t| t.writes.len());
        debug!(handle = %handle.id, writes = committed, "memory transaction committed");
        Ok(())
    }

    fn rollback(&self, handle: &DbHandle) -> Result<(), BackendError> {
        let mut handles = lock(&self.handles, "MemoryBackend::rollback")?;
        live_state(&mut handles, handle)?.transaction = None;
        Ok(())
    }

    fn class_indexes(
        &self,
        handle: &DbHandle,
        class_name: &str,
    ) -> Result<Vec<IndexInfo>, BackendError> {
        self.with_handle(handle, "MemoryBackend::class_indexes", |db| {
            Ok(db
                .class(class_name)
                .map(|class| class.indexes.clone())
                .unwrap_or_default())
        })
    }

    fn class_names(&self, handle: &DbHandle) -> Result<Vec<String>, BackendError> {
        self.with_handle(handle, "MemoryBackend::class_names", |db| {
            Ok(db.classes.values().map(|class| class.name.clone()).collect())
        })
    }

    fn load(&self, handle: &DbHandle, rid: Rid) -> Result<Option<Record>, BackendError> {
        self.with_handle(handle, "MemoryBackend::load", |db| {
            Ok(db
                .classes
                .values()
                .find(|class| class.cluster == rid.cluster)
                .and_then(|class| class.records.get(&rid.position))
                .map(|record| record.clone().with_database(db.name.clone())))
        })
    }

    fn delete(&self, handle: &DbHandle, rid: Rid) -> Result<(), BackendError> {
        let mut handles = lock(&self.handles, "MemoryBackend::delete")?;
        let state = live_state(&mut handles, handle)?;
        state.with_database("MemoryBackend::delete", |db| db.delete_record(rid))?;
        state.log(PendingWrite::Delete(rid));
        Ok(())
    }

    fn version(&self) -> String {
        format!("{MEMORY_ENGINE} {}", env!("CARGO_PKG_VERSION"))
    }
}

// ============================================================================
// EXECUTION
// ============================================================================

impl MemoryDatabase {
    fn class(&self, name: &str) -> Option<&ClassData> {
        self.classes.get(&name.to_ascii_lowercase())
    }

    fn class_mut(&mut self, name: &str) -> Result<&mut ClassData, BackendError> {
        self.classes
            .get_mut(&name.to_ascii_lowercase())
            .ok_or_else(|| BackendError::NotFound(format!("class {name}")))
    }

    fn ensure_class(&mut self, name: &str) -> i32 {
        if let Some(class) = self.class(name) {
            return class.cluster;
        }
        let cluster = self.next_cluster;
        self.next_cluster += 1;
        self.classes.insert(
            name.to_ascii_lowercase(),
            ClassData {
                name: name.to_string(),
                cluster,
                next_position: 0,
                properties: BTreeMap::new(),
                indexes: Vec::new(),
                records: BTreeMap::new(),
            },
        );
        cluster
    }

    fn execute(&mut self, command: Command) -> Result<CommandOutcome, BackendError> {
        match command {
            Command::CreateClass { name } => {
                if self.class(&name).is_some() {
                    return Err(BackendError::Operation(format!(
                        "Class {name} already exists"
                    )));
                }
                Ok(CommandOutcome::Count(self.ensure_class(&name)))
            }
            Command::DropClass { name } => match self.classes.remove(&name.to_ascii_lowercase()) {
                Some(_) => Ok(CommandOutcome::Count(1)),
                None => Err(BackendError::NotFound(format!("class {name}"))),
            },
            Command::CreateProperty { class, field, ty } => {
                let class = self.class_mut(&class)?;
                class.properties.insert(field, ty);
                Ok(CommandOutcome::Count(count(class.properties.len())))
            }
            Command::CreateIndex {
                name,
                class,
                fields,
                kind,
            } => {
                let class_data = self.class_mut(&class)?;
                let index = IndexInfo {
                    name,
                    class_name: class_data.name.clone(),
                    kind,
                    fields,
                };
                check_unique(class_data, &index, None)?;
                let indexed = class_data.records.len();
                class_data.indexes.push(index);
                Ok(CommandOutcome::Count(count(indexed)))
            }
            Command::Insert { class, fields } => {
                self.ensure_class(&class);
                let mut record = Record::new(class.clone());
                for (name, value) in fields {
                    record.set(&name, value);
                }
                self.store_new(&class, record).map(CommandOutcome::Record)
            }
            Command::Select {
                projection,
                target,
                filter,
                order,
                limit,
            } => self.select(projection, target, filter.as_ref(), order, limit),
            Command::Update {
                class,
                assignments,
                filter,
            } => {
                let class_data = self.class_mut(&class)?;
                let positions: Vec<i64> = class_data
                    .records
                    .iter()
                    .filter(|(_, r)| filter.as_ref().is_none_or(|c| c.matches(r)))
                    .map(|(p, _)| *p)
                    .collect();

                for position in &positions {
                    let Some(current) = class_data.records.get(position) else {
                        continue;
                    };
                    let mut updated = current.clone();
                    for (name, value) in &assignments {
                        updated.set(name, value.clone());
                    }
                    let updated = apply_properties(&class_data.properties, updated)?;
                    check_all_unique(class_data, &updated)?;
                    class_data.records.insert(*position, updated);
                }
                Ok(CommandOutcome::Count(count(positions.len())))
            }
            Command::Delete { class, filter } => {
                let class_data = self.class_mut(&class)?;
                let before = class_data.records.len();
                class_data
                    .records
                    .retain(|_, r| !filter.as_ref().is_none_or(|c| c.matches(r)));
                Ok(CommandOutcome::Count(count(before - class_data.records.len())))
            }
        }
    }

    fn delete_record(&mut self, rid: Rid) -> Result<(), BackendError> {
        let removed = self
            .classes
            .values_mut()
            .find(|class| class.cluster == rid.cluster)
            .and_then(|class| class.records.remove(&rid.position));
        match removed {
            Some(_) => Ok(()),
            None => Err(BackendError::NotFound(rid.to_string())),
        }
    }

    /// Apply a write logged by a transaction.
    fn replay(&mut self, write: &PendingWrite) -> Result<(), BackendError> {
        match write {
            PendingWrite::Command { text, params } => {
                self.execute(parse(text, params)?)?;
                Ok(())
            }
            PendingWrite::Delete(rid) => self.delete_record(*rid),
        }
    }

    fn store_new(&mut self, class: &str, record: Record) -> Result<Record, BackendError> {
        let database = self.name.clone();
        let class_data = self.class_mut(class)?;
        let rid = Rid::new(class_data.cluster, class_data.next_position);
        let mut record = apply_properties(&class_data.properties, record)?;
        record.set_identity(rid);
        check_all_unique(class_data, &record)?;
        class_data.next_position += 1;
        class_data.records.insert(rid.position, record.clone());
        Ok(record.with_database(database))
    }

    fn select(
        &self,
        projection: Projection,
        target: Target,
        filter: Option<&Condition>,
        order: Option<(String, bool)>,
        limit: Option<usize>,
    ) -> Result<CommandOutcome, BackendError> {
        let mut matched: Vec<Record> = match target {
            Target::Class(name) => {
                let class = self
                    .class(&name)
                    .ok_or_else(|| BackendError::NotFound(format!("class {name}")))?;
                class
                    .records
                    .values()
                    .filter(|r| filter.is_none_or(|c| c.matches(r)))
                    .cloned()
                    .collect()
            }
            Target::Record(rid) => self
                .classes
                .values()
                .find(|class| class.cluster == rid.cluster)
                .and_then(|class| class.records.get(&rid.position))
                .filter(|r| filter.is_none_or(|c| c.matches(r)))
                .cloned()
                .into_iter()
                .collect(),
        };

        if let Some((field, ascending)) = order {
            matched.sort_by(|a, b| {
                let ordering = compare(&resolve(a, &field), &resolve(b, &field))
                    .unwrap_or(Ordering::Equal);
                if ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }
        if let Some(limit) = limit {
            matched.truncate(limit);
        }

        let records = match projection {
            Projection::All => matched,
            Projection::Count => {
                let total = i64::try_from(matched.len()).unwrap_or(i64::MAX);
                vec![Record::anonymous().with("count", total)]
            }
            Projection::Fields(fields) => matched
                .iter()
                .map(|source| {
                    let mut projected = Record::anonymous().with_rid(source.identity());
                    for field in &fields {
                        match source.field_type(field) {
                            Some(ty) => projected.set_typed(field, resolve(source, field), ty),
                            None => projected.set(field, resolve(source, field)),
                        }
                    }
                    projected
                })
                .collect(),
        };

        Ok(CommandOutcome::Records(
            records
                .into_iter()
                .map(|r| r.with_database(self.name.clone()))
                .collect(),
        ))
    }
}

fn count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Coerce declared properties and tag them with their type.
fn apply_properties(
    properties: &BTreeMap<String, FieldType>,
    mut record: Record,
) -> Result<Record, BackendError> {
    for (name, ty) in properties {
        let Some(value) = record.field(name).cloned() else {
            continue;
        };
        let converted = coerce(&value, *ty).ok_or_else(|| {
            BackendError::Operation(format!("Cannot convert {value} of field {name} to {ty}"))
        })?;
        record.set_typed(name, converted, *ty);
    }
    Ok(record)
}

fn check_all_unique(class: &ClassData, record: &Record) -> Result<(), BackendError> {
    for index in &class.indexes {
        check_unique(class, index, Some(record))?;
    }
    Ok(())
}

/// Enforce a unique index, either for one candidate record or across the
/// whole class when `candidate` is `None`.
fn check_unique(
    class: &ClassData,
    index: &IndexInfo,
    candidate: Option<&Record>,
) -> Result<(), BackendError> {
    if index.kind != IndexKind::Unique {
        return Ok(());
    }
    let key = |r: &Record| -> Option<Vec<String>> {
        let values: Vec<Value> = index.fields.iter().map(|f| resolve(r, f)).collect();
        if values.iter().any(Value::is_null) {
            None
        } else {
            Some(values.iter().map(ToString::to_string).collect())
        }
    };

    match candidate {
        Some(record) => {
            let Some(candidate_key) = key(record) else {
                return Ok(());
            };
            let clash = class.records.values().any(|other| {
                other.identity() != record.identity() && key(other).as_ref() == Some(&candidate_key)
            });
            if clash {
                return Err(BackendError::Operation(format!(
                    "Found duplicated key {candidate_key:?} in index {}",
                    index.name
                )));
            }
        }
        None => {
            let mut seen = Vec::new();
            for record in class.records.values() {
                if let Some(k) = key(record) {
                    if seen.contains(&k) {
                        return Err(BackendError::Operation(format!(
                            "Found duplicated key {k:?} in index {}",
                            index.name
                        )));
                    }
                    seen.push(k);
                }
            }
        }
    }
    Ok(())
}

/// Read a field, resolving the `@rid` and `@class` pseudo-fields.
fn resolve(record: &Record, field: &str) -> Value {
    if let Some(value) = record.field(field) {
        return value.clone();
    }
    if field.eq_ignore_ascii_case(RID_COLUMN_NAME) {
        return Value::Link(record.identity());
    }
    if field.eq_ignore_ascii_case("@class") {
        return record.class_name().map_or(Value::Null, Value::from);
    }
    Value::Null
}

/// Compare two values, coercing between numeric, textual, temporal and
/// identity forms. `None` when the values are not comparable.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    use Value::{Bool, Date, DateTime, Link, Null, String as Text};

    match (left, right) {
        (Null, _) | (_, Null) => None,
        (Text(a), Text(b)) => Some(a.cmp(b)),
        (Bool(a), Bool(b)) => Some(a.cmp(b)),
        (Link(a), Link(b)) => Some(a.cmp(b)),
        (Link(a), Text(b)) => Rid::parse(b).map(|b| a.cmp(&b)),
        (Text(a), Link(b)) => Rid::parse(a).map(|a| a.cmp(b)),
        (Date(_) | DateTime(_), _) | (_, Date(_) | DateTime(_)) => {
            let a = coerce(left, FieldType::DateTime)?;
            let b = coerce(right, FieldType::DateTime)?;
            match (a, b) {
                (DateTime(a), DateTime(b)) => Some(a.cmp(&b)),
                _ => None,
            }
        }
        (Bool(_), Text(_)) | (Text(_), Bool(_)) => {
            let a = coerce(left, FieldType::Boolean)?;
            let b = coerce(right, FieldType::Boolean)?;
            match (a, b) {
                (Bool(a), Bool(b)) => Some(a.cmp(&b)),
                _ => None,
            }
        }
        _ => {
            if let (Some(Value::Long(a)), Some(Value::Long(b))) = (
                integral(left).and_then(|v| coerce(&v, FieldType::Long)),
                integral(right).and_then(|v| coerce(&v, FieldType::Long)),
            ) {
                return Some(a.cmp(&b));
            }
            match (coerce(left, FieldType::Double)?, coerce(right, FieldType::Double)?) {
                (Value::Double(a), Value::Double(b)) => a.partial_cmp(&b),
                _ => None,
            }
        }
    }
}

/// The value itself when it is (or parses as) an integer.
fn integral(value: &Value) -> Option<Value> {
    match value {
        Value::Byte(_) | Value::Short(_) | Value::Int(_) | Value::Long(_) => Some(value.clone()),
        Value::String(s) if s.trim().parse::<i64>().is_ok() => Some(value.clone()),
        _ => None,
    }
}


// ============================================================================
// PARSING
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Str(String),
    Number(String),
    Rid(Rid),
    Param,
    Symbol(&'static str),
}

#[derive(Debug)]
enum Command {
    CreateClass {
        name: String,
    },
    DropClass {
        name: String,
    },
    CreateProperty {
        class: String,
        field: String,
        ty: FieldType,
    },
    CreateIndex {
        name: String,
        class: String,
        fields: Vec<String>,
        kind: IndexKind,
    },
    Insert {
        class: String,
        fields: Vec<(String, Value)>,
    },
    Select {
        projection: Projection,
        target: Target,
        filter: Option<Condition>,
        order: Option<(String, bool)>,
        limit: Option<usize>,
    },
    Update {
        class: String,
        assignments: Vec<(String, Value)>,
        filter: Option<Condition>,
    },
    Delete {
        class: String,
        filter: Option<Condition>,
    },
}

#[derive(Debug)]
enum Projection {
    All,
    Count,
    Fields(Vec<String>),
}

#[derive(Debug)]
enum Target {
    Class(String),
    Record(Rid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

#[derive(Debug)]
enum Condition {
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    IsNull {
        field: String,
        negated: bool,
    },
}

impl Condition {
    fn matches(&self, record: &Record) -> bool {
        match self {
            Condition::And(a, b) => a.matches(record) && b.matches(record),
            Condition::Or(a, b) => a.matches(record) || b.matches(record),
            Condition::Not(inner) => !inner.matches(record),
            Condition::IsNull { field, negated } => resolve(record, field).is_null() != *negated,
            Condition::Compare { field, op, value } => {
                let actual = resolve(record, field);
                if *op == CompareOp::Like {
                    return match (&actual, value) {
                        (Value::Null, _) | (_, Value::Null) => false,
                        (a, Value::String(pattern)) => like_matches(&a.to_string(), pattern),
                        _ => false,
                    };
                }
                let Some(ordering) = compare(&actual, value) else {
                    return false;
                };
                match op {
                    CompareOp::Eq => ordering == Ordering::Equal,
                    CompareOp::Ne => ordering != Ordering::Equal,
                    CompareOp::Lt => ordering == Ordering::Less,
                    CompareOp::Le => ordering != Ordering::Greater,
                    CompareOp::Gt => ordering == Ordering::Greater,
                    CompareOp::Ge => ordering != Ordering::Less,
                    CompareOp::Like => false,
                }
            }
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, BackendError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() || c == ';' {
            i += 1;
        } else if c.is_alphabetic() || c == '_' || c == '@' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '@')
            {
                i += 1;
            }
            tokens.push(Token::Word(chars[start..i].iter().collect()));
        } else if c.is_ascii_digit() {
            let start = i;
            let mut seen_dot = false;
            while i < chars.len() {
                if chars[i].is_ascii_digit() {
                    i += 1;
                } else if chars[i] == '.'
                    && !seen_dot
                    && chars.get(i + 1).is_some_and(char::is_ascii_digit)
                {
                    seen_dot = true;
                    i += 1;
                } else {
                    break;
                }
            }
            tokens.push(Token::Number(chars[start..i].iter().collect()));
        } else if c == '\'' || c == '"' {
            let quote = c;
            let mut value = String::new();
            i += 1;
            loop {
                match chars.get(i) {
                    None => {
                        return Err(BackendError::Parse(format!(
                            "unterminated string literal in \"{text}\""
                        )))
                    }
                    Some('\\') => {
                        if let Some(escaped) = chars.get(i + 1) {
                            value.push(*escaped);
                        }
                        i += 2;
                    }
                    Some(ch) if *ch == quote => {
                        if chars.get(i + 1) == Some(&quote) {
                            value.push(quote);
                            i += 2;
                        } else {
                            i += 1;
                            break;
                        }
                    }
                    Some(ch) => {
                        value.push(*ch);
                        i += 1;
                    }
                }
            }
            tokens.push(Token::Str(value));
        } else if c == '#' {
            let start = i;
            i += 1;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == ':' || chars[i] == '-')
            {
                i += 1;
            }
            let literal: String = chars[start..i].iter().collect();
            let rid = Rid::parse(&literal)
                .ok_or_else(|| BackendError::Parse(format!("invalid record id \"{literal}\"")))?;
            tokens.push(Token::Rid(rid));
        } else if c == '?' {
            tokens.push(Token::Param);
            i += 1;
        } else {
            let two: String = chars[i..chars.len().min(i + 2)].iter().collect();
            let symbol = match two.as_str() {
                "<=" => Some("<="),
                ">=" => Some(">="),
                "<>" => Some("<>"),
                "!=" => Some("!="),
                _ => None,
            };
            if let Some(symbol) = symbol {
                tokens.push(Token::Symbol(symbol));
                i += 2;
                continue;
            }
            let symbol = match c {
                '=' => "=",
                '<' => "<",
                '>' => ">",
                ',' => ",",
                '(' => "(",
                ')' => ")",
                '*' => "*",
                '.' => ".",
                '-' => "-",
                other => {
                    return Err(BackendError::Parse(format!(
                        "unexpected character '{other}' in \"{text}\""
                    )))
                }
            };
            tokens.push(Token::Symbol(symbol));
            i += 1;
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    params: &'a [Option<String>],
    next_param: usize,
}

fn parse(text: &str, params: &[Option<String>]) -> Result<Command, BackendError> {
    let mut parser = Parser {
        text,
        tokens: tokenize(text)?,
        pos: 0,
        params,
        next_param: 0,
    };
    let command = parser.command()?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(command)
}

impl Parser<'_> {
    fn error(&self, what: &str) -> BackendError {
        BackendError::Parse(format!("{what} at token {} of \"{}\"", self.pos + 1, self.text))
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword))
    }

    fn keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), BackendError> {
        if self.keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {keyword}")))
        }
    }

    fn symbol(&mut self, symbol: &str) -> bool {
        if matches!(self.peek(), Some(Token::Symbol(s)) if *s == symbol) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, symbol: &str) -> Result<(), BackendError> {
        if self.symbol(symbol) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{symbol}'")))
        }
    }

    fn identifier(&mut self) -> Result<String, BackendError> {
        match self.advance() {
            Some(Token::Word(w)) => Ok(w),
            _ => Err(self.error("expected an identifier")),
        }
    }

    fn number(&mut self) -> Result<usize, BackendError> {
        match self.advance() {
            Some(Token::Number(n)) => n.parse().map_err(|_| self.error("expected an integer")),
            _ => Err(self.error("expected an integer")),
        }
    }

    fn literal(&mut self) -> Result<Value, BackendError> {
        let negative = self.symbol("-");
        match self.advance() {
            Some(Token::Number(n)) => {
                let text = if negative { format!("-{n}") } else { n };
                if let Ok(v) = text.parse::<i32>() {
                    Ok(Value::Int(v))
                } else if let Ok(v) = text.parse::<i64>() {
                    Ok(Value::Long(v))
                } else {
                    text.parse::<f64>()
                        .map(Value::Double)
                        .map_err(|_| self.error("invalid number"))
                }
            }
            _ if negative => Err(self.error("expected a number after '-'")),
            Some(Token::Str(s)) => Ok(Value::String(s)),
            Some(Token::Rid(rid)) => Ok(Value::Link(rid)),
            Some(Token::Param) => {
                let index = self.next_param;
                self.next_param += 1;
                match self.params.get(index) {
                    Some(Some(text)) => Ok(Value::String(text.clone())),
                    Some(None) => Ok(Value::Null),
                    None => Err(BackendError::Operation(format!(
                        "missing value for parameter {} of \"{}\"",
                        index + 1,
                        self.text
                    ))),
                }
            }
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("null") => Ok(Value::Null),
            _ => Err(self.error("expected a value")),
        }
    }

    fn command(&mut self) -> Result<Command, BackendError> {
        if self.keyword("SELECT") {
            self.select()
        } else if self.keyword("INSERT") {
            self.insert()
        } else if self.keyword("UPDATE") {
            self.update()
        } else if self.keyword("DELETE") {
            self.expect_keyword("FROM")?;
            let class = self.identifier()?;
            let filter = self.where_clause()?;
            Ok(Command::Delete { class, filter })
        } else if self.keyword("CREATE") {
            self.create()
        } else if self.keyword("DROP") {
            self.expect_keyword("CLASS")?;
            Ok(Command::DropClass {
                name: self.identifier()?,
            })
        } else {
            Err(self.error("unknown command"))
        }
    }

    fn create(&mut self) -> Result<Command, BackendError> {
        if self.keyword("CLASS") {
            let name = self.identifier()?;
            if self.keyword("EXTENDS") {
                self.identifier()?;
            }
            return Ok(Command::CreateClass { name });
        }
        if self.keyword("PROPERTY") {
            let class = self.identifier()?;
            self.expect_symbol(".")?;
            let field = self.identifier()?;
            let type_name = self.identifier()?;
            let ty = FieldType::from_name(&type_name)
                .ok_or_else(|| self.error(&format!("unknown type {type_name}")))?;
            return Ok(Command::CreateProperty { class, field, ty });
        }
        if self.keyword("INDEX") {
            let first = self.identifier()?;
            let (name, class, fields) = if self.symbol(".") {
                let field = self.identifier()?;
                (format!("{first}.{field}"), first, vec![field])
            } else {
                self.expect_keyword("ON")?;
                let class = self.identifier()?;
                self.expect_symbol("(")?;
                let mut fields = vec![self.identifier()?];
                while self.symbol(",") {
                    fields.push(self.identifier()?);
                }
                self.expect_symbol(")")?;
                (first, class, fields)
            };
            let kind = if self.keyword("UNIQUE") {
                IndexKind::Unique
            } else if self.keyword("NOTUNIQUE") {
                IndexKind::NotUnique
            } else if self.keyword("FULLTEXT") {
                IndexKind::FullText
            } else {
                return Err(self.error("expected UNIQUE, NOTUNIQUE or FULLTEXT"));
            };
            return Ok(Command::CreateIndex {
                name,
                class,
                fields,
                kind,
            });
        }
        Err(self.error("expected CLASS, PROPERTY or INDEX"))
    }

    fn select(&mut self) -> Result<Command, BackendError> {
        let projection = if self.peek_keyword("FROM") {
            Projection::All
        } else if self.symbol("*") {
            Projection::All
        } else if self.peek_keyword("count")
            && matches!(self.tokens.get(self.pos + 1), Some(Token::Symbol("(")))
        {
            self.pos += 1;
            self.expect_symbol("(")?;
            self.expect_symbol("*")?;
            self.expect_symbol(")")?;
            Projection::Count
        } else {
            let mut fields = vec![self.identifier()?];
            while self.symbol(",") {
                fields.push(self.identifier()?);
            }
            Projection::Fields(fields)
        };

        self.expect_keyword("FROM")?;
        let target = match self.advance() {
            Some(Token::Word(class)) => Target::Class(class),
            Some(Token::Rid(rid)) => Target::Record(rid),
            _ => return Err(self.error("expected a class name or record id")),
        };
        let filter = self.where_clause()?;

        let order = if self.keyword("ORDER") {
            self.expect_keyword("BY")?;
            let field = self.identifier()?;
            let ascending = if self.keyword("DESC") {
                false
            } else {
                self.keyword("ASC");
                true
            };
            Some((field, ascending))
        } else {
            None
        };

        let limit = if self.keyword("LIMIT") {
            Some(self.number()?)
        } else {
            None
        };

        Ok(Command::Select {
            projection,
            target,
            filter,
            order,
            limit,
        })
    }

    fn insert(&mut self) -> Result<Command, BackendError> {
        self.expect_keyword("INTO")?;
        let class = self.identifier()?;

        if self.keyword("SET") {
            let fields = self.assignments()?;
            return Ok(Command::Insert { class, fields });
        }

        self.expect_symbol("(")?;
        let mut names = vec![self.identifier()?];
        while self.symbol(",") {
            names.push(self.identifier()?);
        }
        self.expect_symbol(")")?;
        self.expect_keyword("VALUES")?;
        self.expect_symbol("(")?;
        let mut values = vec![self.literal()?];
        while self.symbol(",") {
            values.push(self.literal()?);
        }
        self.expect_symbol(")")?;

        if names.len() != values.len() {
            return Err(self.error("field and value counts differ"));
        }
        Ok(Command::Insert {
            class,
            fields: names.into_iter().zip(values).collect(),
        })
    }

    fn update(&mut self) -> Result<Command, BackendError> {
        let class = self.identifier()?;
        self.expect_keyword("SET")?;
        let assignments = self.assignments()?;
        let filter = self.where_clause()?;
        Ok(Command::Update {
            class,
            assignments,
            filter,
        })
    }

    fn assignments(&mut self) -> Result<Vec<(String, Value)>, BackendError> {
        let mut assignments = Vec::new();
        loop {
            let field = self.identifier()?;
            self.expect_symbol("=")?;
            assignments.push((field, self.literal()?));
            if !self.symbol(",") {
                break;
            }
        }
        Ok(assignments)
    }

    fn where_clause(&mut self) -> Result<Option<Condition>, BackendError> {
        if self.keyword("WHERE") {
            self.or_condition().map(Some)
        } else {
            Ok(None)
        }
    }

    fn or_condition(&mut self) -> Result<Condition, BackendError> {
        let mut left = self.and_condition()?;
        while self.keyword("OR") {
            let right = self.and_condition()?;
            left = Condition::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_condition(&mut self) -> Result<Condition, BackendError> {
        let mut left = self.predicate()?;
        while self.keyword("AND") {
            let right = self.predicate()?;
            left = Condition::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn predicate(&mut self) -> Result<Condition, BackendError> {
        if self.keyword("NOT") {
            return Ok(Condition::Not(Box::new(self.predicate()?)));
        }
        if self.symbol("(") {
            let inner = self.or_condition()?;
            self.expect_symbol(")")?;
            return Ok(inner);
        }

        let field = self.identifier()?;
        if self.keyword("IS") {
            let negated = self.keyword("NOT");
            self.expect_keyword("NULL")?;
            return Ok(Condition::IsNull { field, negated });
        }

        let op = match self.advance() {
            Some(Token::Symbol("=")) => CompareOp::Eq,
            Some(Token::Symbol("<>" | "!=")) => CompareOp::Ne,
            Some(Token::Symbol("<")) => CompareOp::Lt,
            Some(Token::Symbol("<=")) => CompareOp::Le,
            Some(Token::Symbol(">")) => CompareOp::Gt,
            Some(Token::Symbol(">=")) => CompareOp::Ge,
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("LIKE") => CompareOp::Like,
            _ => return Err(self.error("expected a comparison operator")),
        };
        let value = self.literal()?;
        Ok(Condition::Compare { field, op, value })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn tokenize_rejects_unterminated_strings() {
        assert!(matches!(tokenize("SELECT FROM Item WHERE a = 'x"), Err(BackendError::Parse(_))));
    }

    #[test]
    fn parse_rejects_unknown_keywords() {
        assert!(matches!(parse("FROB Item", &[]), Err(BackendError::Parse(_))));
        assert!(matches!(parse("SELECT FROM", &[]), Err(BackendError::Parse(_))));
    }

    #[test]
    fn parameters_bind_in_order() {
        let command = parse(
            "INSERT INTO Item SET a = ?, b = ?",
            &[Some("1".to_string()), None],
        )
        .unwrap();
        match command {
            Command::Insert { fields, .. } => {
                assert_eq!(fields[0].1, Value::String("1".to_string()));
                assert_eq!(fields[1].1, Value::Null);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn numeric_text_compares_numerically() {
        assert_eq!(
            compare(&Value::Int(11), &Value::String("10".to_string())),
            Some(Ordering::Greater)
        );
        assert_eq!(compare(&Value::Int(2), &Value::Double(2.5)), Some(Ordering::Less));
        assert_eq!(compare(&Value::Null, &Value::Int(1)), None);
    }
}
