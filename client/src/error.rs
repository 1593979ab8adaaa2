use kernel::{ItemId, UploadStatus};
use thiserror::Error;

/// Misuse of the client API. Per-file failures are never reported this way,
/// they live on the item as [`kernel::UploadError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("invalid backend url '{uri}': {reason}")]
    InvalidUrl { uri: String, reason: String },
    #[error("uploads must be started from within a Tokio runtime")]
    NoRuntime,
    #[error("no upload item with id {0}")]
    UnknownItem(ItemId),
    #[error("cannot {action} item {id} while it is {status}")]
    InvalidState {
        id: ItemId,
        status: UploadStatus,
        action: &'static str,
    },
}
