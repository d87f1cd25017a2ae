/// Data structures exchanged with the backend
///
/// This module defines the record model the client layer walks: dynamically
/// typed values, durable record identities, semi-structured records and the
/// raw outcomes a backend command can produce.
use bytes::Bytes;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;
use time::{Date, PrimitiveDateTime};

use crate::decode::{format_date, format_timestamp};
use crate::types::FieldType;

/// Durable record identity, rendered as `#cluster:position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rid {
    pub cluster: i32,
    pub position: i64,
}

impl Rid {
    /// Identity of a record that has not been stored yet.
    pub const NEW: Rid = Rid {
        cluster: -1,
        position: -1,
    };

    pub fn new(cluster: i32, position: i64) -> Self {
        Rid { cluster, position }
    }

    pub fn is_persistent(&self) -> bool {
        self.cluster >= 0 && self.position >= 0
    }

    /// Parse the `#cluster:position` form.
    pub fn parse(text: &str) -> Option<Rid> {
        let (cluster, position) = text.strip_prefix('#')?.split_once(':')?;
        Some(Rid {
            cluster: cluster.parse().ok()?,
            position: position.parse().ok()?,
        })
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.cluster, self.position)
    }
}

/// A dynamically typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    String(String),
    Date(Date),
    DateTime(PrimitiveDateTime),
    /// Inline byte array stored inside the record.
    Binary(Bytes),
    /// Standalone binary record referenced by the field.
    Blob(Bytes),
    Link(Rid),
    Embedded(Box<Record>),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the concrete runtime type held by this value.
    pub fn type_name(&self) -> Option<&'static str> {
        let name = match self {
            Value::Null => return None,
            Value::Bool(_) => "bool",
            Value::Byte(_) => "i8",
            Value::Short(_) => "i16",
            Value::Int(_) => "i32",
            Value::Long(_) => "i64",
            Value::Float(_) => "f32",
            Value::Double(_) => "f64",
            Value::Decimal(_) => "rust_decimal::Decimal",
            Value::String(_) => "String",
            Value::Date(_) => "time::Date",
            Value::DateTime(_) => "time::PrimitiveDateTime",
            Value::Binary(_) => "bytes::Bytes",
            Value::Blob(_) => "orient_jdbc::Blob",
            Value::Link(_) => "orient_jdbc::Rid",
            Value::Embedded(_) => "orient_jdbc::Record",
            Value::List(_) => "Vec",
            Value::Set(_) => "Set",
            Value::Map(_) => "BTreeMap",
        };
        Some(name)
    }

    /// True for a non-empty list whose items are all binary records.
    pub fn is_blob_list(&self) -> bool {
        match self {
            Value::List(items) => {
                !items.is_empty() && items.iter().all(|v| matches!(v, Value::Blob(_)))
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Byte(v) => write!(f, "{v}"),
            Value::Short(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
            Value::Date(v) => write!(f, "{}", format_date(*v)),
            Value::DateTime(v) => write!(f, "{}", format_timestamp(*v)),
            Value::Binary(v) | Value::Blob(v) => write!(f, "{v:?}"),
            Value::Link(rid) => write!(f, "{rid}"),
            Value::Embedded(record) => write!(f, "{record}"),
            Value::List(items) | Value::Set(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, item)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}={item}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        })*
    };
}

value_from! {
    bool => Bool,
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    Decimal => Decimal,
    String => String,
    Date => Date,
    PrimitiveDateTime => DateTime,
    Rid => Link,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Embedded(Box::new(v))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// One named field of a record, with its optional declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: Value,
    pub declared: Option<FieldType>,
}

/// A semi-structured record: ordered named fields plus a durable identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    rid: Rid,
    class_name: Option<String>,
    database: String,
    fields: Vec<Field>,
}

impl Record {
    /// Create an empty record of the given class.
    pub fn new(class_name: impl Into<String>) -> Self {
        Record {
            rid: Rid::NEW,
            class_name: Some(class_name.into()),
            database: String::new(),
            fields: Vec::new(),
        }
    }

    /// Create an empty record not bound to any class (projections, metadata rows).
    pub fn anonymous() -> Self {
        Record {
            rid: Rid::NEW,
            class_name: None,
            database: String::new(),
            fields: Vec::new(),
        }
    }

    pub fn with_rid(mut self, rid: Rid) -> Self {
        self.rid = rid;
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Builder form of [`Record::set_typed`].
    pub fn with_typed(mut self, name: &str, value: impl Into<Value>, declared: FieldType) -> Self {
        self.set_typed(name, value, declared);
        self
    }

    /// Set an untyped field, keeping any type already declared for it.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.value = value,
            None => self.fields.push(Field {
                name: name.to_string(),
                value,
                declared: None,
            }),
        }
    }

    /// Set a field together with its declared type.
    pub fn set_typed(&mut self, name: &str, value: impl Into<Value>, declared: FieldType) {
        let value = value.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => {
                field.value = value;
                field.declared = Some(declared);
            }
            None => self.fields.push(Field {
                name: name.to_string(),
                value,
                declared: Some(declared),
            }),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.fields.iter().position(|f| f.name == name)?;
        Some(self.fields.remove(index).value)
    }

    pub fn identity(&self) -> Rid {
        self.rid
    }

    pub fn set_identity(&mut self, rid: Rid) {
        self.rid = rid;
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }

    /// Field names in insertion order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Value of the named field; `None` when the record has no such field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    /// Declared type of the named field, if any.
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .and_then(|f| f.declared)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(class) = &self.class_name {
            write!(f, "{class}")?;
        }
        if self.rid.is_persistent() {
            write!(f, "{}", self.rid)?;
        }
        write!(f, "{{")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}:{}", field.name, field.value)?;
        }
        write!(f, "}}")
    }
}

/// Raw outcome of a backend command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Records(Vec<Record>),
    Record(Record),
    Count(i32),
}

/// Kind of a backend index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Unique,
    NotUnique,
    FullText,
}

/// Index descriptor returned by schema introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub name: String,
    pub class_name: String,
    pub kind: IndexKind,
    /// Key field names in key order.
    pub fields: Vec<String>,
}

/// Transaction mode requested on `begin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxMode {
    #[default]
    Optimistic,
    Pessimistic,
}

/// Opaque handle to one open backend database.
///
/// Every backend call takes the handle explicitly; there is no ambient
/// "current database".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DbHandle {
    /// Unique handle id
    pub id: String,
    /// URL the handle was opened with (without the driver prefix)
    pub url: String,
    /// Database name
    pub database: String,
    /// Authenticated user
    pub user: String,
}
