use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid limit {rule}: {value} (expected -1 or a non-negative integer)")]
    InvalidLimit { rule: String, value: i64 },

    #[error("invalid max criteria value for {rule}: {value}")]
    InvalidMax { rule: String, value: i64 },

    #[error("unknown output format: {0}")]
    UnknownOutputFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
