use crate::config::ConfigError;

pub(crate) fn optional_trimmed_env<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// First non-empty value among `keys`, in order.
pub(crate) fn first_trimmed_env<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter().find_map(|key| optional_trimmed_env(lookup, key))
}

pub(crate) fn require_non_empty_env<F>(lookup: &F, keys: &[&str]) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    first_trimmed_env(lookup, keys)
        .ok_or_else(|| ConfigError::MissingVar(keys.first().copied().unwrap_or("").to_string()))
}

pub(crate) fn parse_optional_u64_env<F>(lookup: &F, key: &str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match optional_trimmed_env(lookup, key) {
        Some(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::ParseInt {
                key: key.to_string(),
                value,
            }),
        None => Ok(None),
    }
}
