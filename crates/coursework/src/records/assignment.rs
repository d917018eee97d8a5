use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    COURSE_FIELD, CourseRef, ID_FIELD, NAME_FIELD, Priority, RecordKind, TAGS_FIELD,
    blank_priority, common_fields, optional_text, present, present_priority, reference_value,
};
use crate::client::{FieldSelector, RecordPayload};
use crate::normalize::{DateInput, InputError, IntInput, ReferenceInput, non_empty, normalize_date};

pub const TABLE: &str = "assignment_c";
pub const TITLE_FIELD: &str = "title_c";
pub const DESCRIPTION_FIELD: &str = "description_c";
pub const DUE_DATE_FIELD: &str = "due_date_c";
pub const PRIORITY_FIELD: &str = "priority_c";
pub const STATUS_FIELD: &str = "status_c";
pub const GRADE_FIELD: &str = "grade_c";
pub const CATEGORY_FIELD: &str = "category_c";

pub const DEFAULT_STATUS: &str = "pending";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Tags", default)]
    pub tags: Option<String>,
    #[serde(rename = "course_id_c", default)]
    pub course: Option<CourseRef>,
    #[serde(rename = "title_c", default)]
    pub title: Option<String>,
    #[serde(rename = "description_c", default)]
    pub description: Option<String>,
    #[serde(rename = "due_date_c", default)]
    pub due_date: Option<String>,
    #[serde(rename = "priority_c", default)]
    pub priority: Option<Priority>,
    #[serde(rename = "status_c", default)]
    pub status: Option<String>,
    #[serde(rename = "grade_c", default)]
    pub grade: Option<i64>,
    #[serde(rename = "category_c", default)]
    pub category: Option<String>,
}

/// Caller input for a new assignment. Omitted fields receive defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignmentDraft {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Tags", default)]
    pub tags: Option<String>,
    #[serde(rename = "course_id_c", default)]
    pub course: Option<ReferenceInput>,
    #[serde(rename = "title_c", default)]
    pub title: Option<String>,
    #[serde(rename = "description_c", default)]
    pub description: Option<String>,
    #[serde(rename = "due_date_c", default)]
    pub due_date: Option<DateInput>,
    #[serde(rename = "priority_c", default, deserialize_with = "blank_priority")]
    pub priority: Option<Priority>,
    #[serde(rename = "status_c", default)]
    pub status: Option<String>,
    #[serde(rename = "grade_c", default)]
    pub grade: Option<IntInput>,
    #[serde(rename = "category_c", default)]
    pub category: Option<String>,
}

/// Partial update. The outer `Option` tells whether the field was supplied,
/// the inner one whether it was set to null.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignmentPatch {
    #[serde(rename = "Name", default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(rename = "Tags", default, deserialize_with = "present")]
    pub tags: Option<Option<String>>,
    #[serde(rename = "course_id_c", default, deserialize_with = "present")]
    pub course: Option<Option<ReferenceInput>>,
    #[serde(rename = "title_c", default, deserialize_with = "present")]
    pub title: Option<Option<String>>,
    #[serde(rename = "description_c", default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(rename = "due_date_c", default, deserialize_with = "present")]
    pub due_date: Option<Option<DateInput>>,
    #[serde(rename = "priority_c", default, deserialize_with = "present_priority")]
    pub priority: Option<Option<Priority>>,
    #[serde(rename = "status_c", default, deserialize_with = "present")]
    pub status: Option<Option<String>>,
    #[serde(rename = "grade_c", default, deserialize_with = "present")]
    pub grade: Option<Option<IntInput>>,
    #[serde(rename = "category_c", default, deserialize_with = "present")]
    pub category: Option<Option<String>>,
}

impl AssignmentPatch {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(Some(status.into())),
            ..Self::default()
        }
    }
}

/// The `assignment_c` collection.
pub struct Assignments;

impl RecordKind for Assignments {
    type Record = Assignment;
    type Draft = AssignmentDraft;
    type Patch = AssignmentPatch;

    const TABLE: &'static str = TABLE;
    const LABEL: &'static str = "assignment";

    fn fields() -> Vec<FieldSelector> {
        let mut fields = common_fields();
        fields.extend(
            [
                TITLE_FIELD,
                DESCRIPTION_FIELD,
                DUE_DATE_FIELD,
                PRIORITY_FIELD,
                STATUS_FIELD,
                GRADE_FIELD,
                CATEGORY_FIELD,
            ]
            .into_iter()
            .map(FieldSelector::plain),
        );
        fields
    }

    fn create_payload(draft: &AssignmentDraft) -> Result<RecordPayload, InputError> {
        let due_date = match &draft.due_date {
            Some(input) => normalize_date(DUE_DATE_FIELD, input)?,
            None => None,
        };

        let mut payload = RecordPayload::new();
        // Name and title stand in for each other; when both are missing
        // neither key is written.
        if let Some(name) = non_empty(&draft.name).or(draft.title.as_deref()) {
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
        if let Some(title) = non_empty(&draft.title).or(draft.name.as_deref()) {
            payload.insert(TITLE_FIELD.to_string(), Value::from(title));
        }
        payload.insert(
            DESCRIPTION_FIELD.to_string(),
            Value::from(non_empty(&draft.description).unwrap_or("")),
        );
        payload.insert(DUE_DATE_FIELD.to_string(), optional_text(due_date.as_deref()));
        payload.insert(
            PRIORITY_FIELD.to_string(),
            Value::from(draft.priority.unwrap_or_default().as_str()),
        );
        payload.insert(
            STATUS_FIELD.to_string(),
            Value::from(non_empty(&draft.status).unwrap_or(DEFAULT_STATUS)),
        );
        payload.insert(
            GRADE_FIELD.to_string(),
            draft
                .grade
                .as_ref()
                .and_then(IntInput::coerce_truthy)
                .map_or(Value::Null, Value::from),
        );
        payload.insert(
            CATEGORY_FIELD.to_string(),
            Value::from(non_empty(&draft.category).unwrap_or("")),
        );

        Ok(payload)
    }

    fn update_payload(id: i64, patch: &AssignmentPatch) -> Result<RecordPayload, InputError> {
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
        if let Some(title) = &patch.title {
            payload.insert(TITLE_FIELD.to_string(), optional_text(title.as_deref()));
        }
        if let Some(description) = &patch.description {
            payload.insert(
                DESCRIPTION_FIELD.to_string(),
                optional_text(description.as_deref()),
            );
        }
        if let Some(due_date) = &patch.due_date {
            let normalized = match due_date {
                Some(input) => normalize_date(DUE_DATE_FIELD, input)?,
                None => None,
            };
            payload.insert(DUE_DATE_FIELD.to_string(), optional_text(normalized.as_deref()));
        }
        if let Some(priority) = &patch.priority {
            payload.insert(
                PRIORITY_FIELD.to_string(),
                optional_text(priority.map(Priority::as_str)),
            );
        }
        if let Some(status) = &patch.status {
            payload.insert(STATUS_FIELD.to_string(), optional_text(status.as_deref()));
        }
        if let Some(grade) = &patch.grade {
            payload.insert(
                GRADE_FIELD.to_string(),
                grade
                    .as_ref()
                    .and_then(IntInput::coerce_truthy)
                    .map_or(Value::Null, Value::from),
            );
        }
        if let Some(category) = &patch.category {
            payload.insert(CATEGORY_FIELD.to_string(), optional_text(category.as_deref()));
        }

        Ok(payload)
    }
}
