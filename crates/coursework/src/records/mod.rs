pub mod assignment;
pub mod study_session;

use std::fmt;
use std::str::FromStr;

use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{FieldSelector, RecordPayload};
use crate::normalize::{InputError, ReferenceInput, parse_leading_int};

pub use assignment::{Assignment, AssignmentDraft, AssignmentPatch, Assignments};
pub use study_session::{StudySession, StudySessionDraft, StudySessionPatch, StudySessions};

pub const ID_FIELD: &str = "Id";
pub const NAME_FIELD: &str = "Name";
pub const TAGS_FIELD: &str = "Tags";
pub const COURSE_FIELD: &str = "course_id_c";

/// A backend collection together with its field schema and the mapping from
/// caller input to write payloads.
pub trait RecordKind: Send + Sync + 'static {
    type Record: DeserializeOwned + Send;
    type Draft: Sync;
    type Patch: Sync;

    /// Backend collection name.
    const TABLE: &'static str;
    /// Human readable name used in log lines.
    const LABEL: &'static str;

    fn fields() -> Vec<FieldSelector>;

    fn create_payload(draft: &Self::Draft) -> Result<RecordPayload, InputError>;

    /// Payload holding `Id` plus only the fields present in `patch`.
    fn update_payload(id: i64, patch: &Self::Patch) -> Result<RecordPayload, InputError>;
}

/// Field selection shared by both kinds: name, tags and the course link
/// resolved to the course's display name.
pub(crate) fn common_fields() -> Vec<FieldSelector> {
    vec![
        FieldSelector::plain(NAME_FIELD),
        FieldSelector::plain(TAGS_FIELD),
        FieldSelector::reference(COURSE_FIELD, NAME_FIELD),
    ]
}

pub(crate) fn reference_value(input: Option<&ReferenceInput>) -> Value {
    input
        .and_then(ReferenceInput::resolve)
        .map_or(Value::Null, Value::from)
}

pub(crate) fn optional_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, Value::from)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

impl Serialize for Priority {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// Course link on a fetched record. The backend sends `{Id, Name}` when the
/// reference is resolved and a bare id otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CourseRefWire")]
pub struct CourseRef {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CourseRefWire {
    Linked {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Name", default)]
        name: Option<String>,
    },
    Id(i64),
    Text(String),
}

impl TryFrom<CourseRefWire> for CourseRef {
    type Error = String;

    fn try_from(wire: CourseRefWire) -> Result<Self, Self::Error> {
        match wire {
            CourseRefWire::Linked { id, name } => Ok(Self { id, name }),
            CourseRefWire::Id(id) => Ok(Self { id, name: None }),
            CourseRefWire::Text(raw) => parse_leading_int(&raw)
                .map(|id| Self { id, name: None })
                .ok_or_else(|| format!("invalid course reference: {raw:?}")),
        }
    }
}

/// Deserializes a field that may be absent (`None`), explicitly null
/// (`Some(None)`) or set (`Some(Some(_))`). Pair with `#[serde(default)]`.
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Blank priorities from form input mean "not chosen".
pub(crate) fn blank_priority<'de, D>(deserializer: D) -> Result<Option<Priority>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw.parse().map(Some).map_err(D::Error::custom),
        _ => Ok(None),
    }
}

/// Patch form of `blank_priority`: a blank value clears the field.
pub(crate) fn present_priority<'de, D>(
    deserializer: D,
) -> Result<Option<Option<Priority>>, D::Error>
where
    D: Deserializer<'de>,
{
    blank_priority(deserializer).map(Some)
}
