use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};

use crate::client::{
    BatchItemResult, BatchResponse, DeleteParams, FetchParams, FieldError, RecordClient,
    RecordClientError, RecordOperation, WriteParams,
};
use crate::normalize::{IdInput, InputError, coerce_id};
use crate::notify::Notifier;
use crate::records::{Assignments, RecordKind, StudySessions};

pub type AssignmentAccess = RecordAccess<Assignments>;
pub type StudySessionAccess = RecordAccess<StudySessions>;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("invalid input: {0}")]
    Input(#[from] InputError),
    #[error(transparent)]
    Client(#[from] RecordClientError),
    #[error("{table} {operation} was rejected: {}", .message.as_deref().unwrap_or("no message"))]
    Rejected {
        table: &'static str,
        operation: RecordOperation,
        message: Option<String>,
    },
    #[error("failed to decode {table} record: {message}")]
    Decode {
        table: &'static str,
        message: String,
    },
}

impl AccessError {
    /// Messages worth showing to the end user. Decode failures and transport
    /// faults without a backend message have none.
    pub fn notices(&self) -> Vec<String> {
        match self {
            Self::Input(err) => vec![err.to_string()],
            Self::Client(err) => err.user_message().map(ToString::to_string).into_iter().collect(),
            Self::Rejected { message, .. } => message.iter().cloned().collect(),
            Self::Decode { .. } => Vec::new(),
        }
    }
}

/// One record of a batch the backend refused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFailure {
    pub message: Option<String>,
    pub errors: Vec<FieldError>,
}

impl RecordFailure {
    /// One notice per field error, then the record message.
    pub fn notices(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(ToString::to_string)
            .chain(self.message.iter().cloned())
            .collect()
    }
}

impl fmt::Display for RecordFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let notices = self.notices();
        if notices.is_empty() {
            f.write_str("record failed without details")
        } else {
            f.write_str(&notices.join("; "))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<RecordFailure>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted: usize,
    pub failed: Vec<RecordFailure>,
}

/// Create/read/update/delete access to one record kind.
///
/// The `try_*` methods return typed results and never notify. The plain
/// methods log, render notices through the notifier and fall back to an
/// empty value, so callers never see an error from them.
pub struct RecordAccess<K: RecordKind> {
    client: Arc<dyn RecordClient>,
    notifier: Arc<dyn Notifier>,
    kind: PhantomData<fn() -> K>,
}

impl<K: RecordKind> Clone for RecordAccess<K> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            notifier: Arc::clone(&self.notifier),
            kind: PhantomData,
        }
    }
}

impl<K: RecordKind> RecordAccess<K> {
    pub fn new(client: Arc<dyn RecordClient>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            client,
            notifier,
            kind: PhantomData,
        }
    }

    fn fetch_params() -> FetchParams {
        FetchParams {
            fields: K::fields(),
        }
    }

    pub async fn try_list_all(&self) -> Result<Vec<K::Record>, AccessError> {
        let response = self
            .client
            .fetch_records(K::TABLE, Self::fetch_params())
            .await?;
        if !response.success {
            return Err(rejected::<K>(RecordOperation::Fetch, response.message));
        }

        let mut records = Vec::new();
        for (index, row) in response.data.unwrap_or_default().into_iter().enumerate() {
            match decode::<K>(row) {
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!(table = K::TABLE, index, error = %err, "skipping unreadable row");
                }
            }
        }
        Ok(records)
    }

    pub async fn try_get_by_id(
        &self,
        id: impl Into<IdInput>,
    ) -> Result<Option<K::Record>, AccessError> {
        let id = coerce_id(&id.into())?;
        let response = self
            .client
            .get_record_by_id(K::TABLE, id, Self::fetch_params())
            .await?;
        if !response.success {
            return Err(rejected::<K>(RecordOperation::GetById, response.message));
        }

        match response.data {
            None | Some(Value::Null) => Ok(None),
            Some(data) => decode::<K>(data).map(Some),
        }
    }

    pub async fn try_create(
        &self,
        draft: &K::Draft,
    ) -> Result<BatchOutcome<K::Record>, AccessError> {
        let params = WriteParams {
            records: vec![K::create_payload(draft)?],
        };
        let response = self.client.create_records(K::TABLE, params).await?;
        batch_outcome::<K>(RecordOperation::Create, response)
    }

    pub async fn try_update(
        &self,
        id: impl Into<IdInput>,
        patch: &K::Patch,
    ) -> Result<BatchOutcome<K::Record>, AccessError> {
        let id = coerce_id(&id.into())?;
        let params = WriteParams {
            records: vec![K::update_payload(id, patch)?],
        };
        let response = self.client.update_records(K::TABLE, params).await?;
        batch_outcome::<K>(RecordOperation::Update, response)
    }

    pub async fn try_delete(&self, id: impl Into<IdInput>) -> Result<DeleteOutcome, AccessError> {
        let id = coerce_id(&id.into())?;
        let params = DeleteParams {
            record_ids: vec![id],
        };
        let response = self.client.delete_records(K::TABLE, params).await?;
        if !response.success {
            return Err(rejected::<K>(RecordOperation::Delete, response.message));
        }

        let mut outcome = DeleteOutcome::default();
        for result in response.results.unwrap_or_default() {
            if result.success {
                outcome.deleted += 1;
            } else {
                outcome.failed.push(failure(result));
            }
        }
        Ok(outcome)
    }

    /// All records of the kind; empty on failure. Rows that do not decode
    /// are skipped.
    pub async fn list_all(&self) -> Vec<K::Record> {
        self.try_list_all()
            .await
            .unwrap_or_else(|err| self.report(RecordOperation::Fetch, &err, Vec::new()))
    }

    pub async fn get_by_id(&self, id: impl Into<IdInput>) -> Option<K::Record> {
        self.try_get_by_id(id)
            .await
            .unwrap_or_else(|err| self.report(RecordOperation::GetById, &err, None))
    }

    /// Creates one record and returns it as stored, or `None` when the
    /// backend refused it.
    pub async fn create(&self, draft: &K::Draft) -> Option<K::Record> {
        match self.try_create(draft).await {
            Ok(outcome) => self.first_success(RecordOperation::Create, outcome),
            Err(err) => self.report(RecordOperation::Create, &err, None),
        }
    }

    pub async fn update(&self, id: impl Into<IdInput>, patch: &K::Patch) -> Option<K::Record> {
        match self.try_update(id, patch).await {
            Ok(outcome) => self.first_success(RecordOperation::Update, outcome),
            Err(err) => self.report(RecordOperation::Update, &err, None),
        }
    }

    /// `true` when at least one record was removed.
    pub async fn delete(&self, id: impl Into<IdInput>) -> bool {
        match self.try_delete(id).await {
            Ok(outcome) => {
                self.log_failures(RecordOperation::Delete, &outcome.failed);
                // Delete failures only carry a record message worth showing.
                for message in outcome.failed.iter().filter_map(|f| f.message.as_deref()) {
                    self.notifier.error(message);
                }
                outcome.deleted > 0
            }
            Err(err) => self.report(RecordOperation::Delete, &err, false),
        }
    }

    // With more than one record per batch, failures next to a success are
    // still reported but the first success wins.
    fn first_success(
        &self,
        operation: RecordOperation,
        outcome: BatchOutcome<K::Record>,
    ) -> Option<K::Record> {
        self.log_failures(operation, &outcome.failed);
        for notice in outcome.failed.iter().flat_map(RecordFailure::notices) {
            self.notifier.error(&notice);
        }
        outcome.succeeded.into_iter().next()
    }

    fn log_failures(&self, operation: RecordOperation, failed: &[RecordFailure]) {
        if failed.is_empty() {
            return;
        }
        let details = failed
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" | ");
        error!(
            table = K::TABLE,
            %operation,
            failed = failed.len(),
            %details,
            "failed to {operation} {} records",
            K::LABEL
        );
    }

    fn report<T>(&self, operation: RecordOperation, err: &AccessError, sentinel: T) -> T {
        error!(
            table = K::TABLE,
            %operation,
            error = %err,
            "{} {operation} failed",
            K::LABEL
        );
        for notice in err.notices() {
            self.notifier.error(&notice);
        }
        sentinel
    }
}

fn rejected<K: RecordKind>(operation: RecordOperation, message: Option<String>) -> AccessError {
    AccessError::Rejected {
        table: K::TABLE,
        operation,
        message,
    }
}

fn decode<K: RecordKind>(data: Value) -> Result<K::Record, AccessError> {
    serde_json::from_value(data).map_err(|err| AccessError::Decode {
        table: K::TABLE,
        message: err.to_string(),
    })
}

fn failure(result: BatchItemResult) -> RecordFailure {
    RecordFailure {
        message: result.message,
        errors: result.errors,
    }
}

fn batch_outcome<K: RecordKind>(
    operation: RecordOperation,
    response: BatchResponse,
) -> Result<BatchOutcome<K::Record>, AccessError> {
    if !response.success {
        return Err(rejected::<K>(operation, response.message));
    }

    let mut outcome = BatchOutcome::default();
    for result in response.results.unwrap_or_default() {
        if !result.success {
            outcome.failed.push(failure(result));
            continue;
        }
        match result.data {
            None | Some(Value::Null) => {}
            Some(data) => match serde_json::from_value::<K::Record>(data) {
                Ok(record) => outcome.succeeded.push(record),
                // Stored by the backend but outside the typed record shape.
                Err(err) => outcome.failed.push(RecordFailure {
                    message: Some(format!(
                        "{} was saved but could not be read back: {err}",
                        K::LABEL
                    )),
                    errors: Vec::new(),
                }),
            },
        }
    }
    Ok(outcome)
}
