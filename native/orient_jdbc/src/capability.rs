/// Capability matrix
///
/// Pure predicates deciding which combinations of scroll type, concurrency,
/// holdability and isolation level the backend can honor. The backend takes
/// no read locks and keeps no live cursors, so only read-only, non-sensitive
/// cursors held over commit and isolation up to read-committed are available.
///
/// Integer codes coming from callers are turned into the typed enums below via
/// `from_code`, which fails with an argument error for out-of-domain values.
use crate::constants::*;
use crate::error::{JdbcError, Result};

/// Cursor scroll type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScrollType {
    #[default]
    ForwardOnly,
    ScrollInsensitive,
    ScrollSensitive,
}

impl ScrollType {
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            TYPE_FORWARD_ONLY => Ok(ScrollType::ForwardOnly),
            TYPE_SCROLL_INSENSITIVE => Ok(ScrollType::ScrollInsensitive),
            TYPE_SCROLL_SENSITIVE => Ok(ScrollType::ScrollSensitive),
            other => Err(JdbcError::argument("Capability.badType", &[&other])),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            ScrollType::ForwardOnly => TYPE_FORWARD_ONLY,
            ScrollType::ScrollInsensitive => TYPE_SCROLL_INSENSITIVE,
            ScrollType::ScrollSensitive => TYPE_SCROLL_SENSITIVE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Concurrency {
    #[default]
    ReadOnly,
    Updatable,
}

impl Concurrency {
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            CONCUR_READ_ONLY => Ok(Concurrency::ReadOnly),
            CONCUR_UPDATABLE => Ok(Concurrency::Updatable),
            other => Err(JdbcError::argument("Capability.badConcurrency", &[&other])),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Concurrency::ReadOnly => CONCUR_READ_ONLY,
            Concurrency::Updatable => CONCUR_UPDATABLE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Holdability {
    #[default]
    HoldOverCommit,
    CloseAtCommit,
}

impl Holdability {
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            HOLD_CURSORS_OVER_COMMIT => Ok(Holdability::HoldOverCommit),
            CLOSE_CURSORS_AT_COMMIT => Ok(Holdability::CloseAtCommit),
            other => Err(JdbcError::argument("Capability.badHoldability", &[&other])),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Holdability::HoldOverCommit => HOLD_CURSORS_OVER_COMMIT,
            Holdability::CloseAtCommit => CLOSE_CURSORS_AT_COMMIT,
        }
    }
}

/// Transaction isolation level, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IsolationLevel {
    None,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            TRANSACTION_NONE => Ok(IsolationLevel::None),
            TRANSACTION_READ_UNCOMMITTED => Ok(IsolationLevel::ReadUncommitted),
            TRANSACTION_READ_COMMITTED => Ok(IsolationLevel::ReadCommitted),
            TRANSACTION_REPEATABLE_READ => Ok(IsolationLevel::RepeatableRead),
            TRANSACTION_SERIALIZABLE => Ok(IsolationLevel::Serializable),
            other => Err(JdbcError::argument("Connection.badIsolationLevel", &[&other])),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            IsolationLevel::None => TRANSACTION_NONE,
            IsolationLevel::ReadUncommitted => TRANSACTION_READ_UNCOMMITTED,
            IsolationLevel::ReadCommitted => TRANSACTION_READ_COMMITTED,
            IsolationLevel::RepeatableRead => TRANSACTION_REPEATABLE_READ,
            IsolationLevel::Serializable => TRANSACTION_SERIALIZABLE,
        }
    }
}

/// Preferred direction in which a cursor is walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FetchDirection {
    #[default]
    Forward,
    Reverse,
}

impl FetchDirection {
    /// Decode a fetch direction code. `FETCH_UNKNOWN` maps to the default.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            FETCH_FORWARD | FETCH_UNKNOWN => Ok(FetchDirection::Forward),
            FETCH_REVERSE => Ok(FetchDirection::Reverse),
            other => Err(JdbcError::argument("Capability.badFetchDirection", &[&other])),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            FetchDirection::Forward => FETCH_FORWARD,
            FetchDirection::Reverse => FETCH_REVERSE,
        }
    }
}

pub fn supports_scroll_type(scroll: ScrollType) -> bool {
    match scroll {
        ScrollType::ForwardOnly | ScrollType::ScrollInsensitive => true,
        ScrollType::ScrollSensitive => false,
    }
}

/// Read-only concurrency is available for every supported scroll type;
/// updatable cursors never are.
pub fn supports_concurrency(scroll: ScrollType, concurrency: Concurrency) -> bool {
    match concurrency {
        Concurrency::ReadOnly => supports_scroll_type(scroll),
        Concurrency::Updatable => false,
    }
}

pub fn supports_holdability(holdability: Holdability) -> bool {
    matches!(holdability, Holdability::HoldOverCommit)
}

pub fn supports_isolation_level(level: IsolationLevel) -> bool {
    matches!(level, IsolationLevel::None | IsolationLevel::ReadCommitted)
}

/// Validate a requested cursor configuration, failing on the first
/// unsupported component.
///
/// # Arguments
/// - `scroll`, `concurrency`, `holdability`: the requested configuration
/// - `connection_kind`: variant name used in the error message
pub fn validate_cursor_config(
    scroll: ScrollType,
    concurrency: Concurrency,
    holdability: Holdability,
    connection_kind: &str,
) -> Result<()> {
    if !supports_scroll_type(scroll) {
        return Err(JdbcError::capability(
            "ResultSet.unsupportedType",
            &[&scroll.code(), &connection_kind],
        ));
    }
    if !supports_concurrency(scroll, concurrency) {
        return Err(JdbcError::capability(
            "ResultSet.unsupportedConcurrency",
            &[&concurrency.code(), &connection_kind],
        ));
    }
    if !supports_holdability(holdability) {
        return Err(JdbcError::capability(
            "ResultSet.unsupportedHoldability",
            &[&holdability.code(), &connection_kind],
        ));
    }
    Ok(())
}
