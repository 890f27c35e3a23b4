use chrono::{DateTime, FixedOffset, SecondsFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::errors::RelayError;

/// Every spelling of the call SID a caller may send, canonical first.
pub const CALL_SID_KEYS: &[&str] = &["callSid", "callId", "call_sid", "call_id"];

/// Canonical key paired with the other spellings accepted for it.
pub type FieldAliases = (&'static str, &'static [&'static str]);

static E164_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+[0-9]{8,15}$").unwrap());

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .unwrap()
});

/// Trims a caller-supplied value and rejects it when missing or blank.
pub fn require(field: &str, value: Option<String>) -> Result<String, RelayError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        Some(_) => Err(RelayError::validation(field, "must not be empty")),
        None => Err(RelayError::validation(field, "is required")),
    }
}

/// Blank optional values count as absent.
pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Rewrites an argument object so each field appears once under its
/// canonical key. The first non-blank string wins, canonical spelling first.
/// Non-object values pass through untouched.
pub fn collapse_aliases(value: Value, fields: &[FieldAliases]) -> Value {
    let mut map = match value {
        Value::Object(map) => map,
        other => return other,
    };
    for (canonical, aliases) in fields {
        collapse_field(&mut map, canonical, aliases);
    }
    Value::Object(map)
}

fn collapse_field(map: &mut Map<String, Value>, canonical: &str, aliases: &[&str]) {
    let mut chosen: Option<Value> = None;
    for key in std::iter::once(canonical).chain(aliases.iter().copied()) {
        let Some(value) = map.remove(key) else {
            continue;
        };
        if chosen.as_ref().is_some_and(is_filled) {
            continue;
        }
        // blank or mistyped values are kept so validation can name them
        if is_filled(&value) || (chosen.is_none() && !value.is_null()) {
            chosen = Some(value);
        }
    }
    if let Some(value) = chosen {
        map.insert(canonical.to_string(), value);
    }
}

fn is_filled(value: &Value) -> bool {
    matches!(value, Value::String(s) if !s.trim().is_empty())
}

/// Parses an RFC 3339 timestamp. A bare local time without offset is rejected.
pub fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<FixedOffset>, RelayError> {
    DateTime::parse_from_rfc3339(value.trim()).map_err(|_| {
        RelayError::validation(
            field,
            format!("`{value}` is not an ISO 8601 timestamp with a timezone offset (e.g. 2025-07-05T11:00:00+10:00)"),
        )
    })
}

/// Wire form of a timestamp: seconds precision, offset kept, `Z` for UTC.
pub fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn validate_phone(field: &str, value: &str) -> Result<(), RelayError> {
    if E164_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(RelayError::validation(
            field,
            format!("`{value}` is not an E.164 phone number (+ followed by 8-15 digits)"),
        ))
    }
}

pub fn validate_email(field: &str, value: &str) -> Result<(), RelayError> {
    if value.len() <= 254 && EMAIL_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(RelayError::validation(
            field,
            format!("`{value}` is not a valid email address"),
        ))
    }
}
