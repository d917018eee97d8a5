use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    COURSE_FIELD, CourseRef, ID_FIELD, NAME_FIELD, RecordKind, TAGS_FIELD, common_fields,
    optional_text, present, reference_value,
};
use crate::client::{FieldSelector, RecordPayload};
use crate::normalize::{DateInput, InputError, IntInput, ReferenceInput, non_empty, normalize_date};

pub const TABLE: &str = "study_session_c";
pub const DATE_FIELD: &str = "date_c";
pub const DURATION_FIELD: &str = "duration_c";
pub const TOPIC_FIELD: &str = "topic_c";
pub const COMPLETED_FIELD: &str = "completed_c";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySession {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Tags", default)]
    pub tags: Option<String>,
    #[serde(rename = "course_id_c", default)]
    pub course: Option<CourseRef>,
    #[serde(rename = "date_c", default)]
    pub date: Option<String>,
    /// Minutes.
    #[serde(rename = "duration_c", default)]
    pub duration: Option<i64>,
    #[serde(rename = "topic_c", default)]
    pub topic: Option<String>,
    #[serde(rename = "completed_c", default)]
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudySessionDraft {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Tags", default)]
    pub tags: Option<String>,
    #[serde(rename = "course_id_c", default)]
    pub course: Option<ReferenceInput>,
    #[serde(rename = "date_c", default)]
    pub date: Option<DateInput>,
    #[serde(rename = "duration_c", default)]
    pub duration: Option<IntInput>,
    #[serde(rename = "topic_c", default)]
    pub topic: Option<String>,
    #[serde(rename = "completed_c", default)]
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudySessionPatch {
    #[serde(rename = "Name", default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(rename = "Tags", default, deserialize_with = "present")]
    pub tags: Option<Option<String>>,
    #[serde(rename = "course_id_c", default, deserialize_with = "present")]
    pub course: Option<Option<ReferenceInput>>,
    #[serde(rename = "date_c", default, deserialize_with = "present")]
    pub date: Option<Option<DateInput>>,
    #[serde(rename = "duration_c", default, deserialize_with = "present")]
    pub duration: Option<Option<IntInput>>,
    #[serde(rename = "topic_c", default, deserialize_with = "present")]
    pub topic: Option<Option<String>>,
    #[serde(rename = "completed_c", default, deserialize_with = "present")]
    pub completed: Option<Option<bool>>,
}

impl StudySessionPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(Some(completed)),
            ..Self::default()
        }
    }
}

/// The `study_session_c` collection.
pub struct StudySessions;

fn duration_value(input: Option<&IntInput>) -> Value {
    Value::from(input.and_then(IntInput::coerce).unwrap_or(0))
}

impl RecordKind for StudySessions {
    type Record = StudySession;
    type Draft = StudySessionDraft;
    type Patch = StudySessionPatch;

    const TABLE: &'static str = TABLE;
    const LABEL: &'static str = "study session";

    fn fields() -> Vec<FieldSelector> {
        let mut fields = common_fields();
        fields.extend(
            [DATE_FIELD, DURATION_FIELD, TOPIC_FIELD, COMPLETED_FIELD]
                .into_iter()
                .map(FieldSelector::plain),
        );
        fields
    }

    fn create_payload(draft: &StudySessionDraft) -> Result<RecordPayload, InputError> {
        let date = match &draft.date {
            Some(input) => normalize_date(DATE_FIELD, input)?,
            None => None,
        };

        let mut payload = RecordPayload::new();
        if let Some(name) = non_empty(&draft.name).or(draft.topic.as_deref()) {
            payload.insert(NAME_FIELD.to_string(), Value::from(name));
        }
        payload.insert(
            TAGS_FIELD.to_string(),
            Value::from(non_empty(&draft.tags).unwrap_or("")),
        );
        payload.insert(
            COURSE_FIELD.to_string(),
            reference_value(draft.course.as_ref()),
        );
        payload.insert(DATE_FIELD.to_string(), optional_text(date.as_deref()));
        payload.insert(
            DURATION_FIELD.to_string(),
            duration_value(draft.duration.as_ref()),
        );
        payload.insert(
            TOPIC_FIELD.to_string(),
            Value::from(non_empty(&draft.topic).unwrap_or("")),
        );
        payload.insert(
            COMPLETED_FIELD.to_string(),
            Value::from(draft.completed.unwrap_or(false)),
        );

        Ok(payload)
    }

    fn update_payload(id: i64, patch: &StudySessionPatch) -> Result<RecordPayload, InputError> {
        let mut payload = RecordPayload::new();
        payload.insert(ID_FIELD.to_string(), Value::from(id));

        if let Some(name) = &patch.name {
            payload.insert(NAME_FIELD.to_string(), optional_text(name.as_deref()));
        }
        if let Some(tags) = &patch.tags {
            payload.insert(TAGS_FIELD.to_string(), optional_text(tags.as_deref()));
        }
        if let Some(course) = &patch.course {
            payload.insert(COURSE_FIELD.to_string(), reference_value(course.as_ref()));
        }
        if let Some(date) = &patch.date {
            let normalized = match date {
                Some(input) => normalize_date(DATE_FIELD, input)?,
                None => None,
            };
            payload.insert(DATE_FIELD.to_string(), optional_text(normalized.as_deref()));
        }
        if let Some(duration) = &patch.duration {
            payload.insert(DURATION_FIELD.to_string(), duration_value(duration.as_ref()));
        }
        if let Some(topic) = &patch.topic {
            payload.insert(TOPIC_FIELD.to_string(), optional_text(topic.as_deref()));
        }
        if let Some(completed) = patch.completed {
            payload.insert(
                COMPLETED_FIELD.to_string(),
                completed.map_or(Value::Null, Value::from),
            );
        }

        Ok(payload)
    }
}
