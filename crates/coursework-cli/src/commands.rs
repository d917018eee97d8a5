use coursework::records::RecordKind;
use coursework::{Notifier, RecordAccess};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;

use crate::cli::Command;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("payload does not match the {collection} fields: {message}")]
    InvalidPayload {
        collection: &'static str,
        message: String,
    },
    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Prints notices on stderr, one per line.
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn error(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

/// Runs `command` and returns the JSON to print, or `None` when the
/// operation fell back to its empty result.
pub async fn run_command<K>(
    access: &RecordAccess<K>,
    command: Command,
) -> Result<Option<Value>, CommandError>
where
    K: RecordKind,
    K::Record: Serialize,
    K::Draft: DeserializeOwned,
    K::Patch: DeserializeOwned,
{
    let output = match command {
        Command::List => Some(serde_json::to_value(access.list_all().await)?),
        Command::Get { id } => encode(access.get_by_id(id.as_str()).await)?,
        Command::Create { payload } => {
            let draft = decode_payload::<K, K::Draft>(payload)?;
            encode(access.create(&draft).await)?
        }
        Command::Update { id, payload } => {
            let patch = decode_payload::<K, K::Patch>(payload)?;
            encode(access.update(id.as_str(), &patch).await)?
        }
        Command::Delete { id } => access
            .delete(id.as_str())
            .await
            .then(|| json!({ "deleted": id })),
    };

    Ok(output)
}

fn encode<T: Serialize>(record: Option<T>) -> Result<Option<Value>, CommandError> {
    record
        .map(|record| serde_json::to_value(record).map_err(CommandError::from))
        .transpose()
}

fn decode_payload<K: RecordKind, T: DeserializeOwned>(payload: Value) -> Result<T, CommandError> {
    serde_json::from_value(payload).map_err(|err| CommandError::InvalidPayload {
        collection: K::LABEL,
        message: err.to_string(),
    })
}
