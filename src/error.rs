//! Error types surfaced by the client.
//!
//! `LoadError`, `ConfigError` and `ExecutionError` reach the user through the
//! error panel. `StorageError` is only ever logged.

use thiserror::Error;

/// Catalog fetch failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Failed to connect to server: {0}")]
    Transport(String),

    #[error("Failed to load scripts: {0}")]
    Server(String),

    #[error("Failed to load scripts: malformed response ({0})")]
    Decode(String),
}

/// Per-script configuration fetch failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to load script configuration for {script}: {message}")]
    Transport { script: String, message: String },

    #[error("Failed to load script: {message}")]
    Server { script: String, message: String },

    #[error("Failed to load script configuration for {script}: malformed response ({message})")]
    Decode { script: String, message: String },
}

/// Submission failures. A server-reported `error` field is shown verbatim.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("Failed to execute script: {0}")]
    Transport(String),

    #[error("{0}")]
    Server(String),

    #[error("Failed to execute script: malformed response ({0})")]
    Decode(String),

    #[error("Failed to execute script: execution worker stopped unexpectedly")]
    WorkerLost,
}

impl ExecutionError {
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Durable storage failures. Swallowed by `PersistentList`.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Rejected controller transitions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("an execution is already in progress")]
    Busy,

    #[error("no script is selected")]
    NoScript,
}
