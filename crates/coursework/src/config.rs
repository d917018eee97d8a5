use std::env;

use thiserror::Error;

use crate::config_env::{first_trimmed_env, parse_optional_u64_env, require_non_empty_env};

pub const DEFAULT_API_URL: &str = "https://api.apper.io";

const PROJECT_ID_KEYS: &[&str] = &["APPER_PROJECT_ID", "VITE_APPER_PROJECT_ID"];
const PUBLIC_KEY_KEYS: &[&str] = &["APPER_PUBLIC_KEY", "VITE_APPER_PUBLIC_KEY"];
const API_URL_KEY: &str = "APPER_API_URL";
const TIMEOUT_MS_KEY: &str = "APPER_TIMEOUT_MS";

#[derive(Debug, Clone)]
pub struct RecordClientConfig {
    pub project_id: String,
    pub public_key: String,
    pub api_url: String,
    /// No client-side timeout when unset.
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    MissingVar(String),
    #[error("invalid integer in env var {key}: {value}")]
    ParseInt { key: String, value: String },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to build record http client: {0}")]
    HttpClient(String),
    #[error("failed to load .env file: {0}")]
    Dotenv(String),
}

/// Loads `.env` from the working directory or its parents. A missing file is
/// not an error; a malformed one is.
pub fn load_dotenv() -> Result<(), ConfigError> {
    dotenv_outcome(dotenvy::dotenv().map(|_| ()))
}

fn dotenv_outcome(result: Result<(), dotenvy::Error>) -> Result<(), ConfigError> {
    match result {
        Ok(()) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(ConfigError::Dotenv(err.to_string())),
    }
}

impl RecordClientConfig {
    pub fn new(project_id: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            public_key: public_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout_ms: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to
    /// its raw value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let project_id = require_non_empty_env(&lookup, PROJECT_ID_KEYS)?;
        let public_key = require_non_empty_env(&lookup, PUBLIC_KEY_KEYS)?;
        let api_url = match first_trimmed_env(&lookup, &[API_URL_KEY]) {
            Some(raw) => parse_api_url(&raw)?,
            None => DEFAULT_API_URL.to_string(),
        };

        Ok(Self {
            project_id,
            public_key,
            api_url,
            timeout_ms: parse_optional_u64_env(&lookup, TIMEOUT_MS_KEY)?,
        })
    }

    pub fn with_api_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.api_url = parse_api_url(raw)?;
        Ok(self)
    }
}

fn parse_api_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(ConfigError::InvalidConfiguration(format!(
            "{API_URL_KEY} must start with http:// or https://"
        )));
    }
    Ok(trimmed.to_string())
}
