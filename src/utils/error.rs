use std::time::Duration;
use thiserror::Error;

use crate::utils::BackendKind;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Process error: {0}")]
    Process(String),
}

/// Generation backend failures. Both variants are fatal to a run.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("{backend} backend unavailable: {reason}")]
    Unavailable { backend: BackendKind, reason: String },

    #[error("{backend} backend timed out after {}s", .after.as_secs())]
    Timeout { backend: BackendKind, after: Duration },
}

impl BackendError {
    pub fn backend(&self) -> BackendKind {
        match self {
            BackendError::Unavailable { backend, .. } => *backend,
            BackendError::Timeout { backend, .. } => *backend,
        }
    }
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("webhook returned HTTP {0}")]
    Status(u16),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        DeliveryError::Http(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
