use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubsnapError {
    #[error("{0}")]
    Message(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },
}

impl HubsnapError {
    pub fn message<T: Into<String>>(message: T) -> Self {
        HubsnapError::Message(message.into())
    }

    /// True when a git failure was caused by the remote refusing access.
    pub fn is_access_denied(&self) -> bool {
        match self {
            HubsnapError::Git { stderr, .. } => stderr.contains("403"),
            HubsnapError::Http(err) => err
                .status()
                .is_some_and(|status| status == reqwest::StatusCode::FORBIDDEN),
            _ => false,
        }
    }
}
