use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure captured on a single upload item.
///
/// These never escape the coordinator's commands. They are stored on the
/// item that failed and surface through `has_error` and the item list.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum UploadError {
    /// File rejected before dispatch (empty name, over the size limit).
    #[error("validation failed: {0}")]
    Validation(String),
    /// Network or backend failure while sending.
    #[error("transport error{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Transport {
        /// HTTP status when the backend answered
        status: Option<u16>,
        message: String,
    },
    /// Credentials rejected or unavailable. Callers may prompt for a new login.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    /// Transfer discarded before it completed.
    #[error("upload canceled")]
    Canceled,
}

impl UploadError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    #[must_use]
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated(_))
    }
}
