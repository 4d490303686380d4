use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error payload returned by the events API on non-2xx responses.
///
/// The backend is inconsistent about which key it fills, so both are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorBody {
    /// `message` wins over `error`; blank strings count as absent.
    pub fn reason(&self) -> Option<&str> {
        self.message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| self.error.as_deref().filter(|e| !e.trim().is_empty()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate { value: String },
    #[error("invalid time '{value}': expected HH:MM")]
    InvalidTime { value: String },
    #[error("invalid registration link '{value}': {reason}")]
    InvalidLink { value: String, reason: String },
    #[error("unknown event field '{0}'")]
    UnknownField(String),
}
