use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use quill_core::config::DEFAULT_MAX_FILE_SIZE;
use quill_core::PublishConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Runtime configuration, read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    /// Public host name, shown in hints to scp users
    pub domain: String,
    pub publish: PublishConfig,
    pub session_timeout: Duration,
    pub log_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_path = PathBuf::from(value_or_default(&lookup, "QUILL_DB_PATH", "quill.db"));
        let domain = value_or_default(&lookup, "QUILL_DOMAIN", "quill.local");

        let max_file_size = parse_positive(
            &lookup,
            "QUILL_MAX_FILE_SIZE",
            &DEFAULT_MAX_FILE_SIZE.to_string(),
        )?;
        let session_timeout_secs = parse_positive(&lookup, "QUILL_SESSION_TIMEOUT_SECS", "300")?;

        let mut publish = PublishConfig::default().with_max_file_size(max_file_size);
        if let Some(extensions) = optional_trimmed(&lookup, "QUILL_ALLOWED_EXTENSIONS") {
            publish = publish.with_extension_list(&extensions);
        }

        Ok(Self {
            db_path,
            domain,
            publish,
            session_timeout: Duration::from_secs(session_timeout_secs),
            log_file: optional_trimmed(&lookup, "QUILL_LOG_FILE").map(PathBuf::from),
        })
    }
}

fn parse_positive(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: &str,
) -> Result<u64, ConfigError> {
    let value = value_or_default(lookup, name, default)
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(format!("{name} must be a positive integer")))?;
    if value == 0 {
        return Err(ConfigError::Invalid(format!("{name} must be >= 1")));
    }
    Ok(value)
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    quill_core::util::normalize_text_option(lookup(name))
}
