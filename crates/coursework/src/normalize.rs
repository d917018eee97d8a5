//! Coercion of loosely shaped caller input into the values the record
//! backend stores.
//!
//! Integer-like input follows leading-integer parsing: surrounding
//! whitespace is ignored, an optional sign and the leading run of ASCII
//! digits are read, and anything after them is dropped (`"42abc"` is 42,
//! `"abc"` has no value).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical timestamp layout written to date fields.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

const NAIVE_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("invalid record id: {0:?}")]
    InvalidId(String),
    #[error("invalid date for {field}: {value:?}")]
    InvalidDate { field: &'static str, value: String },
}

/// A number supplied either as a JSON number or as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntInput {
    Number(i64),
    Text(String),
}

pub type IdInput = IntInput;

impl IntInput {
    pub fn coerce(&self) -> Option<i64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(raw) => parse_leading_int(raw),
        }
    }

    /// Like `coerce`, but a zero number or an empty string count as no value.
    /// The text `"0"` still yields 0.
    pub fn coerce_truthy(&self) -> Option<i64> {
        match self {
            Self::Number(0) => None,
            Self::Text(raw) if raw.is_empty() => None,
            other => other.coerce(),
        }
    }
}

impl From<i64> for IntInput {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for IntInput {
    fn from(value: i32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<u32> for IntInput {
    fn from(value: u32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<&str> for IntInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for IntInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for IntInput {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

/// Linked record as the UI holds it, e.g. `{"Id": 3, "Name": "Algebra"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceObject {
    #[serde(rename = "Id", default)]
    pub id: Option<IntInput>,
}

/// Input for a reference field, resolved with the precedence
/// structured object, then numeric string, then raw number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReferenceInput {
    Reference(ReferenceObject),
    Text(String),
    Number(i64),
}

impl ReferenceInput {
    pub fn linked(id: i64) -> Self {
        Self::Reference(ReferenceObject {
            id: Some(IntInput::Number(id)),
        })
    }

    /// Target id, or `None` when nothing usable (including 0) was supplied.
    pub fn resolve(&self) -> Option<i64> {
        let resolved = match self {
            Self::Reference(object) => object.id.as_ref().and_then(IntInput::coerce),
            Self::Text(raw) => parse_leading_int(raw),
            Self::Number(value) => Some(*value),
        };
        resolved.filter(|id| *id != 0)
    }
}

impl From<i64> for ReferenceInput {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for ReferenceInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Date input: free text as the UI sends it, or an already typed timestamp.
/// JSON numbers are read as milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "DateInputWire")]
pub enum DateInput {
    Text(String),
    Timestamp(DateTime<Utc>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DateInputWire {
    Text(String),
    EpochMillis(i64),
}

impl TryFrom<DateInputWire> for DateInput {
    type Error = String;

    fn try_from(wire: DateInputWire) -> Result<Self, Self::Error> {
        match wire {
            DateInputWire::Text(raw) => Ok(Self::Text(raw)),
            DateInputWire::EpochMillis(millis) => DateTime::<Utc>::from_timestamp_millis(millis)
                .map(Self::Timestamp)
                .ok_or_else(|| format!("timestamp out of range: {millis}")),
        }
    }
}

impl From<String> for DateInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for DateInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for DateInput {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<NaiveDate> for DateInput {
    fn from(value: NaiveDate) -> Self {
        Self::Timestamp(value.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
    }
}

pub fn coerce_id(input: &IdInput) -> Result<i64, InputError> {
    input.coerce().ok_or_else(|| {
        InputError::InvalidId(match input {
            IntInput::Number(value) => value.to_string(),
            IntInput::Text(raw) => raw.clone(),
        })
    })
}

/// Canonical timestamp for `input`; empty text means no date.
pub fn normalize_date(field: &'static str, input: &DateInput) -> Result<Option<String>, InputError> {
    let timestamp = match input {
        DateInput::Timestamp(value) => *value,
        DateInput::Text(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            parse_timestamp(trimmed).ok_or_else(|| InputError::InvalidDate {
                field,
                value: raw.clone(),
            })?
        }
    };

    Ok(Some(format_timestamp(timestamp)))
}

pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    // Offset-less values are taken as UTC.
    for format in NAIVE_DATE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .bytes()
        .position(|byte| !byte.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude = digits[..end].parse::<i64>().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Text that is present and non-empty.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::{
        DateInput, InputError, IntInput, ReferenceInput, ReferenceObject, coerce_id,
        normalize_date, parse_leading_int,
    };

    #[test]
    fn leading_int_parsing_matches_loose_numeric_input() {
        assert_eq!(parse_leading_int("42"), Some(42));
        assert_eq!(parse_leading_int("  42  "), Some(42));
        assert_eq!(parse_leading_int("42abc"), Some(42));
        assert_eq!(parse_leading_int("4.9"), Some(4));
        assert_eq!(parse_leading_int("-7"), Some(-7));
        assert_eq!(parse_leading_int("+8"), Some(8));
        assert_eq!(parse_leading_int("abc"), None);
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("-"), None);
    }

    #[test]
    fn numeric_string_ids_coerce_like_numbers() {
        assert_eq!(coerce_id(&IntInput::from("42")), Ok(42));
        assert_eq!(coerce_id(&IntInput::from(42_i64)), Ok(42));
        assert_eq!(
            coerce_id(&IntInput::from("latest")),
            Err(InputError::InvalidId("latest".to_string()))
        );
    }

    #[test]
    fn truthy_coercion_drops_zero_numbers_and_empty_text() {
        assert_eq!(IntInput::Number(0).coerce_truthy(), None);
        assert_eq!(IntInput::Text(String::new()).coerce_truthy(), None);
        assert_eq!(IntInput::Text("0".to_string()).coerce_truthy(), Some(0));
        assert_eq!(IntInput::Text("91".to_string()).coerce_truthy(), Some(91));
        assert_eq!(IntInput::Text("A+".to_string()).coerce_truthy(), None);
    }

    #[test]
    fn references_resolve_by_precedence() {
        let structured: ReferenceInput =
            serde_json::from_str(r#"{"Id": 5, "Name": "Physics"}"#).expect("object decodes");
        assert_eq!(structured.resolve(), Some(5));

        let structured_text = ReferenceInput::Reference(ReferenceObject {
            id: Some(IntInput::Text("12".to_string())),
        });
        assert_eq!(structured_text.resolve(), Some(12));

        let text: ReferenceInput = serde_json::from_str(r#""9""#).expect("string decodes");
        assert_eq!(text.resolve(), Some(9));

        let number: ReferenceInput = serde_json::from_str("3").expect("number decodes");
        assert_eq!(number.resolve(), Some(3));
    }

    #[test]
    fn unusable_references_resolve_to_none() {
        let missing_id: ReferenceInput =
            serde_json::from_str(r#"{"Name": "Physics"}"#).expect("object decodes");
        assert_eq!(missing_id.resolve(), None);
        assert_eq!(ReferenceInput::from("none").resolve(), None);
        assert_eq!(ReferenceInput::from(0_i64).resolve(), None);
        assert_eq!(ReferenceInput::linked(0).resolve(), None);
    }

    #[test]
    fn dates_normalize_to_canonical_utc_timestamps() {
        assert_eq!(
            normalize_date("due_date_c", &DateInput::from("2026-03-01")),
            Ok(Some("2026-03-01T00:00:00.000Z".to_string()))
        );
        assert_eq!(
            normalize_date("due_date_c", &DateInput::from("2026-03-01T10:30:00+02:00")),
            Ok(Some("2026-03-01T08:30:00.000Z".to_string()))
        );
        assert_eq!(
            normalize_date("due_date_c", &DateInput::from("2026-03-01T10:30")),
            Ok(Some("2026-03-01T10:30:00.000Z".to_string()))
        );
        assert_eq!(
            normalize_date("date_c", &DateInput::from("2026-03-01T10:30:05.25Z")),
            Ok(Some("2026-03-01T10:30:05.250Z".to_string()))
        );

        let typed = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).single().expect("valid");
        assert_eq!(
            normalize_date("date_c", &DateInput::from(typed)),
            Ok(Some("2026-01-02T03:04:05.000Z".to_string()))
        );

        let day = NaiveDate::from_ymd_opt(2026, 5, 6).expect("valid date");
        assert_eq!(
            normalize_date("date_c", &DateInput::from(day)),
            Ok(Some("2026-05-06T00:00:00.000Z".to_string()))
        );
    }

    #[test]
    fn empty_dates_are_absent_and_garbage_is_rejected() {
        assert_eq!(normalize_date("date_c", &DateInput::from("   ")), Ok(None));
        assert_eq!(
            normalize_date("date_c", &DateInput::from("next tuesday")),
            Err(InputError::InvalidDate {
                field: "date_c",
                value: "next tuesday".to_string(),
            })
        );
    }

    #[test]
    fn numeric_dates_are_epoch_millis() {
        let input: DateInput = serde_json::from_value(serde_json::json!(1_772_323_200_000_i64))
            .expect("epoch millis decode");
        assert_eq!(
            normalize_date("date_c", &input),
            Ok(Some("2026-03-01T00:00:00.000Z".to_string()))
        );

        let text: DateInput =
            serde_json::from_value(serde_json::json!("2026-03-01")).expect("text decodes");
        assert_eq!(text, DateInput::from("2026-03-01"));

        assert!(serde_json::from_value::<DateInput>(serde_json::json!(i64::MAX)).is_err());
    }
}
