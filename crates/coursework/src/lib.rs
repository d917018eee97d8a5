//! Typed access to the `assignment_c` and `study_session_c` record
//! collections of a remote record backend.

pub mod access;
pub mod client;
pub mod config;
mod config_env;
pub mod normalize;
pub mod notify;
pub mod records;

pub use access::{
    AccessError, AssignmentAccess, BatchOutcome, DeleteOutcome, RecordAccess, RecordFailure,
    StudySessionAccess,
};
pub use client::{HttpRecordClient, RecordClient, RecordClientError};
pub use config::{ConfigError, RecordClientConfig, load_dotenv};
pub use notify::{CollectingNotifier, Notifier, TracingNotifier};
