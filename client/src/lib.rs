//! Concurrent multi-file upload client.
//!
//! [`Coordinator`] tracks a list of files, pushes them through a
//! [`Transport`] with bounded concurrency and exposes the aggregated state
//! of the session.

pub mod auth;
pub mod config;
mod coordinator;
mod error;
mod registry;
pub mod resource;
pub mod transport;

pub use auth::{Anonymous, AuthProvider, StaticToken};
pub use config::UploadOptions;
pub use coordinator::{Coordinator, ItemHandle, PROGRESS_STEP};
pub use error::ClientError;
pub use registry::Snapshot;
pub use transport::{HttpTransport, ProgressFn, Transport};
