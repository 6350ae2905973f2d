//! Runtime configuration
//!
//! Values come from the process environment (after `.env` is loaded) and,
//! as a fallback, from an uncommitted `gymlog.secrets` key/value file.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

/// Path of the SQLite database
pub const DATABASE_ENV: &str = "GYMLOG_DATABASE";
pub const SECRETS_FILE: &str = "gymlog.secrets";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required env var: {0}")]
    MissingEnv(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    file_values: HashMap<String, String>,
}

impl Config {
    /// Load `.env` into the environment and read the secrets file if present
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_file(Path::new(SECRETS_FILE))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let file_values: HashMap<_, _> = parse_key_values(&content).into_iter().collect();
        debug!(path = %path.display(), keys = file_values.len(), "loaded secrets file");
        Ok(Self { file_values })
    }

    /// Environment first, then the secrets file
    pub fn get(&self, key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.file_values.get(key).cloned())
    }

    pub fn require(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingEnv(key.to_string()))
    }
}

/// Parse `KEY=value` / `KEY: value` lines. Blank lines and `#` comments
/// are skipped, wrapping quotes are stripped.
pub fn parse_key_values(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let split = line.find(['=', ':'])?;
            let key = line[..split].trim_end();
            if key.is_empty() || !key.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_') {
                return None;
            }
            let raw = line[split + 1..].trim();
            let value = raw.strip_prefix(['"', '\'']).unwrap_or(raw);
            let value = value.strip_suffix(['"', '\'']).unwrap_or(value);
            if value.is_empty() {
                return None;
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}
