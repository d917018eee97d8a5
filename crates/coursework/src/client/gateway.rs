use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub type RecordClientFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, RecordClientError>> + Send + 'a>>;

/// A single payload row, keyed by backend field name.
pub type RecordPayload = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOperation {
    Fetch,
    GetById,
    Create,
    Update,
    Delete,
}

impl RecordOperation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::GetById => "get_by_id",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for RecordOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldName {
    #[serde(rename = "Name")]
    pub name: String,
}

/// One entry of a read field selection. Reference fields carry a
/// sub-selection naming the linked record's display field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSelector {
    pub field: FieldName,
    #[serde(
        rename = "referenceField",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub reference_field: Option<ReferenceSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSelector {
    pub field: FieldName,
}

impl FieldSelector {
    pub fn plain(name: &str) -> Self {
        Self {
            field: FieldName {
                name: name.to_string(),
            },
            reference_field: None,
        }
    }

    pub fn reference(name: &str, display_field: &str) -> Self {
        Self {
            field: FieldName {
                name: name.to_string(),
            },
            reference_field: Some(ReferenceSelector {
                field: FieldName {
                    name: display_field.to_string(),
                },
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchParams {
    pub fields: Vec<FieldSelector>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteParams {
    pub records: Vec<RecordPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteParams {
    #[serde(rename = "RecordIds")]
    pub record_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub results: Option<Vec<BatchItemResult>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchItemResult {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<FieldError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(rename = "fieldLabel", default)]
    pub field_label: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.field_label.as_deref().unwrap_or("field");
        let message = self.message.as_deref().unwrap_or("invalid value");
        write!(f, "{label}: {message}")
    }
}

#[derive(Debug, Error)]
pub enum RecordClientError {
    #[error("record backend request timed out during {operation}")]
    Timeout { operation: RecordOperation },
    #[error("record backend unavailable during {operation}: {message}")]
    Transport {
        operation: RecordOperation,
        message: String,
    },
    #[error("record backend rejected {operation}: status={status}")]
    Rejected {
        operation: RecordOperation,
        status: u16,
        message: Option<String>,
    },
    #[error("record backend returned an invalid payload for {operation}: {message}")]
    InvalidPayload {
        operation: RecordOperation,
        message: String,
    },
}

impl RecordClientError {
    /// Message suitable for showing to an end user, when the backend sent one.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// Remote record collection access. Implementations own transport and
/// authentication; callers pass the collection name on every call.
pub trait RecordClient: Send + Sync {
    fn fetch_records<'a>(
        &'a self,
        table: &'a str,
        params: FetchParams,
    ) -> RecordClientFuture<'a, FetchResponse>;

    fn get_record_by_id<'a>(
        &'a self,
        table: &'a str,
        id: i64,
        params: FetchParams,
    ) -> RecordClientFuture<'a, RecordResponse>;

    fn create_records<'a>(
        &'a self,
        table: &'a str,
        params: WriteParams,
    ) -> RecordClientFuture<'a, BatchResponse>;

    fn update_records<'a>(
        &'a self,
        table: &'a str,
        params: WriteParams,
    ) -> RecordClientFuture<'a, BatchResponse>;

    fn delete_records<'a>(
        &'a self,
        table: &'a str,
        params: DeleteParams,
    ) -> RecordClientFuture<'a, BatchResponse>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{BatchResponse, DeleteParams, FieldError, FieldSelector};

    #[test]
    fn reference_selector_serializes_with_display_field() {
        let selector = FieldSelector::reference("course_id_c", "Name");
        assert_eq!(
            serde_json::to_value(selector).expect("selector should serialize"),
            json!({
                "field": { "Name": "course_id_c" },
                "referenceField": { "field": { "Name": "Name" } }
            })
        );

        let plain = FieldSelector::plain("title_c");
        assert_eq!(
            serde_json::to_value(plain).expect("selector should serialize"),
            json!({ "field": { "Name": "title_c" } })
        );
    }

    #[test]
    fn delete_params_use_record_ids_key() {
        let params = DeleteParams {
            record_ids: vec![7],
        };
        assert_eq!(
            serde_json::to_value(params).expect("params should serialize"),
            json!({ "RecordIds": [7] })
        );
    }

    #[test]
    fn batch_response_tolerates_missing_optional_parts() {
        let parsed: BatchResponse = serde_json::from_value(json!({
            "success": true,
            "results": [
                { "success": false, "errors": [{ "fieldLabel": "Title", "message": "required" }] },
                { "success": true, "data": { "Id": 3 } }
            ]
        }))
        .expect("batch response should decode");

        let results = parsed.results.expect("results should be present");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].errors[0].to_string(), "Title: required");
        assert!(results[1].errors.is_empty());
        assert_eq!(parsed.message, None);
    }

    #[test]
    fn field_error_display_falls_back_for_missing_parts() {
        let error = FieldError::default();
        assert_eq!(error.to_string(), "field: invalid value");
    }
}
