use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Assignments,
    Sessions,
}

impl Collection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assignments => "assignments",
            Self::Sessions => "sessions",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List,
    Get { id: String },
    Create { payload: Value },
    Update { id: String, payload: Value },
    Delete { id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CliOptions {
    pub collection: Collection,
    pub command: Command,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("missing collection (expected assignments or sessions)")]
    MissingCollection,
    #[error("unknown collection: {0}")]
    UnknownCollection(String),
    #[error("missing command (expected list, get, create, update or delete)")]
    MissingCommand,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("missing value for {command}: {what}")]
    MissingValue {
        command: &'static str,
        what: &'static str,
    },
    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),
    #[error("JSON payload must be an object")]
    PayloadNotObject,
    #[error("help requested")]
    HelpRequested,
}

impl CliOptions {
    pub fn parse<I>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let args = args.into_iter().collect::<Vec<_>>();
        if args.iter().any(|arg| arg == "--help" || arg == "-h") {
            return Err(CliError::HelpRequested);
        }

        let mut iter = args.into_iter();
        let collection = parse_collection(&iter.next().ok_or(CliError::MissingCollection)?)?;
        let command_name = iter.next().ok_or(CliError::MissingCommand)?;

        let command = match command_name.as_str() {
            "list" => Command::List,
            "get" => Command::Get {
                id: required(&mut iter, "get", "ID")?,
            },
            "create" => Command::Create {
                payload: parse_payload(&required(&mut iter, "create", "JSON")?)?,
            },
            "update" => Command::Update {
                id: required(&mut iter, "update", "ID")?,
                payload: parse_payload(&required(&mut iter, "update", "JSON")?)?,
            },
            "delete" => Command::Delete {
                id: required(&mut iter, "delete", "ID")?,
            },
            unknown => return Err(CliError::UnknownCommand(unknown.to_string())),
        };

        if let Some(extra) = iter.next() {
            return Err(CliError::UnexpectedArgument(extra));
        }

        Ok(Self {
            collection,
            command,
        })
    }
}

fn parse_collection(value: &str) -> Result<Collection, CliError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "assignments" | "assignment" => Ok(Collection::Assignments),
        "sessions" | "session" | "study-sessions" => Ok(Collection::Sessions),
        _ => Err(CliError::UnknownCollection(value.to_string())),
    }
}

fn required(
    iter: &mut impl Iterator<Item = String>,
    command: &'static str,
    what: &'static str,
) -> Result<String, CliError> {
    iter.next()
        .ok_or(CliError::MissingValue { command, what })
}

fn parse_payload(raw: &str) -> Result<Value, CliError> {
    let payload = serde_json::from_str::<Value>(raw)
        .map_err(|err| CliError::InvalidJson(err.to_string()))?;
    if !payload.is_object() {
        return Err(CliError::PayloadNotObject);
    }
    Ok(payload)
}
