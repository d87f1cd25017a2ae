/// Decoding and encoding helpers
///
/// This module converts client inputs into the forms the rest of the crate
/// works with: connection type properties into variants, typed parameter
/// values into their textual wire form, and date/time text back into values.
use rust_decimal::Decimal;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime, Time};

use crate::connection::ConnectionKind;
use crate::constants::connection_type;
use crate::error::{JdbcError, Result};

/// Decode the `type` connection property into a connection variant.
///
/// A missing property selects the document store. Unknown values fail with a
/// wrong-connection-type error listing the legal values.
pub fn decode_connection_kind(value: Option<&str>) -> Result<ConnectionKind> {
    match value {
        None | Some(connection_type::DOCUMENT) => Ok(ConnectionKind::Document),
        Some(connection_type::NATIVE_GRAPH) => Ok(ConnectionKind::NativeGraph),
        Some(connection_type::OBJECT) => Ok(ConnectionKind::Object),
        Some(connection_type::TINKERPOP_GRAPH) => Ok(ConnectionKind::TinkerpopGraph),
        Some(other) => Err(JdbcError::WrongConnectionType(crate::error::message(
            "Connection.wrongType",
            &[&other, &connection_type::ALL.join(", ")],
        ))),
    }
}

/// Format a timestamp as `yyyy-MM-dd HH:mm:ss`.
pub fn format_timestamp(value: PrimitiveDateTime) -> String {
    value
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .unwrap_or_else(|_| format!("{} {}", value.date(), value.time()))
}

/// Format a date with the timestamp pattern, at midnight.
pub fn format_date_parameter(value: Date) -> String {
    format_timestamp(value.midnight())
}

/// Format a time of day as the time part of the timestamp pattern (`HH:mm:ss`).
pub fn format_time_parameter(value: Time) -> String {
    value
        .format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| value.to_string())
}

/// Format a date as `yyyy-MM-dd`.
pub fn format_date(value: Date) -> String {
    value
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| value.to_string())
}

/// Plain (non-exponent) decimal form.
pub fn format_decimal(value: Decimal) -> String {
    value.to_string()
}

pub fn parse_timestamp(text: &str) -> Option<PrimitiveDateTime> {
    PrimitiveDateTime::parse(
        text,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    )
    .ok()
}

pub fn parse_date(text: &str) -> Option<Date> {
    Date::parse(text, format_description!("[year]-[month]-[day]")).ok()
}
