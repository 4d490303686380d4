use shared::{domain::EventId, error::ValidationError};
use thiserror::Error;

use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status { status: u16, message: Option<String> },
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid event form: {0}")]
    Validation(#[from] ValidationError),
    #[error("local store failure: {0}")]
    Store(#[from] StoreError),
    #[error("event {0} is not in the current list")]
    UnknownEvent(EventId),
    #[error("no event is being edited")]
    NoActiveEdit,
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Text shown to the user: the server's own explanation when it sent one,
    /// otherwise the low-level failure, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        let message = match self {
            ClientError::Status {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            ClientError::Status { status, .. } => {
                format!("Request failed with status code {status}")
            }
            other => other.to_string(),
        };

        if message.trim().is_empty() {
            fallback.to_string()
        } else {
            message
        }
    }
}
