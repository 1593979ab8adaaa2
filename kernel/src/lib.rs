#![warn(clippy::unwrap_in_result)]
#![warn(clippy::unwrap_used)]

//! Domain model shared by the upload client and the command line tool.

pub mod aggregate;
mod error;
mod file;
mod item;

pub use aggregate::{OverallStatus, Tally};
pub use error::UploadError;
pub use file::{FileSource, UploadFile};
pub use item::{Completion, ItemId, MAX_IN_FLIGHT_PROGRESS, UploadItem, UploadStatus};
