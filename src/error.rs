use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Malformed document {path}: {reason}")]
    MalformedDocument { path: PathBuf, reason: String },

    #[error("Malformed include list at '{key}': {reason}")]
    MalformedInclude { key: String, reason: String },

    #[error("Failed to include {path} at '{key}': {source}")]
    Include {
        key: String,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("Could not connect to any of [{endpoints}]: {reason}")]
    Connect { endpoints: String, reason: String },

    #[error("Failed to write '{key}': {reason}")]
    Write { key: String, reason: String },

    #[error("Unknown settings in {path}: {}", .keys.join(", "))]
    UnknownSettings { path: PathBuf, keys: Vec<String> },

    #[error("Failed to parse {path}: {source}")]
    SettingsParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Settings error: {0}")]
    Settings(#[from] confique::Error),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}
