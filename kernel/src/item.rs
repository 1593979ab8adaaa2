use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{UploadError, UploadFile};

/// Highest progress an item may report before the backend confirms it.
/// Only a completed item is at exactly 1.0.
pub const MAX_IN_FLIGHT_PROGRESS: f64 = 0.99;

/// Stable identifier of an upload item, unique within a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(Uuid);

impl ItemId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Idle,
    Uploading,
    Uploaded,
    Error,
    Canceled,
}

impl UploadStatus {
    /// Uploaded and canceled items never change again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Uploaded | Self::Canceled)
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Uploaded => "uploaded",
            Self::Error => "error",
            Self::Canceled => "canceled",
        };
        f.write_str(s)
    }
}

/// Metadata recorded when the backend accepted a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Identifier assigned by the backend, if it returned one
    pub file_id: Option<i64>,
    /// Entity tag from the response headers
    pub etag: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl Completion {
    #[must_use]
    pub fn now(file_id: Option<i64>, etag: Option<String>) -> Self {
        Self {
            file_id,
            etag,
            uploaded_at: Utc::now(),
        }
    }
}

/// One file's upload lifecycle.
///
/// Fields are read-only outside of this crate; all changes go through the
/// transition methods, which keep these invariants:
///
/// * `progress` is 1.0 iff `status` is [`UploadStatus::Uploaded`]
/// * `error` is set iff `status` is [`UploadStatus::Error`]
/// * `completion` is set iff `status` is [`UploadStatus::Uploaded`]
/// * uploaded and canceled items are frozen
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadItem {
    id: ItemId,
    file: UploadFile,
    bucket: Option<String>,
    status: UploadStatus,
    progress: f64,
    error: Option<UploadError>,
    completion: Option<Completion>,
}

impl UploadItem {
    #[must_use]
    pub fn new(file: UploadFile) -> Self {
        Self {
            id: ItemId::new(),
            file,
            bucket: None,
            status: UploadStatus::Idle,
            progress: 0.0,
            error: None,
            completion: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> ItemId {
        self.id
    }

    #[must_use]
    pub fn file(&self) -> &UploadFile {
        &self.file
    }

    /// Target bucket, assigned when the item is dispatched.
    #[must_use]
    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    #[must_use]
    pub fn status(&self) -> UploadStatus {
        self.status
    }

    #[must_use]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    #[must_use]
    pub fn error(&self) -> Option<&UploadError> {
        self.error.as_ref()
    }

    #[must_use]
    pub fn completion(&self) -> Option<&Completion> {
        self.completion.as_ref()
    }

    /// `Idle → Uploading`.
    pub fn start(&mut self, bucket: impl Into<String>) -> bool {
        if self.status != UploadStatus::Idle {
            return false;
        }
        self.bucket = Some(bucket.into());
        self.status = UploadStatus::Uploading;
        self.progress = 0.0;
        true
    }

    /// Applies a progress report. Ignored unless uploading or when it would
    /// move progress backwards.
    pub fn report_progress(&mut self, fraction: f64) -> bool {
        if self.status != UploadStatus::Uploading || fraction.is_nan() {
            return false;
        }
        let fraction = fraction.clamp(0.0, MAX_IN_FLIGHT_PROGRESS);
        if fraction <= self.progress {
            return false;
        }
        self.progress = fraction;
        true
    }

    /// `Uploading → Uploaded`.
    pub fn complete(&mut self, completion: Completion) -> bool {
        if self.status != UploadStatus::Uploading {
            return false;
        }
        self.status = UploadStatus::Uploaded;
        self.progress = 1.0;
        self.completion = Some(completion);
        true
    }

    /// `Idle | Uploading → Error`. Progress keeps its last value.
    pub fn fail(&mut self, error: UploadError) -> bool {
        if !matches!(self.status, UploadStatus::Idle | UploadStatus::Uploading) {
            return false;
        }
        self.status = UploadStatus::Error;
        self.error = Some(error);
        true
    }

    /// `Idle | Uploading | Error → Canceled`.
    pub fn cancel(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = UploadStatus::Canceled;
        self.error = None;
        true
    }

    /// `Error → Idle`, so the item is picked up by the next upload.
    pub fn reset(&mut self) -> bool {
        if self.status != UploadStatus::Error {
            return false;
        }
        self.status = UploadStatus::Idle;
        self.progress = 0.0;
        self.error = None;
        self.bucket = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn idle() -> UploadItem {
        UploadItem::new(UploadFile::from_bytes("f1", &b"f1"[..]))
    }

    #[fixture]
    fn uploading() -> UploadItem {
        let mut item = idle();
        item.start("b1");
        item
    }

    #[rstest]
    fn new_item_is_idle(idle: UploadItem) {
        // Arrange

        // Act

        // Assert
        assert_eq!(idle.status(), UploadStatus::Idle);
        assert_eq!(idle.progress(), 0.0);
        assert!(idle.bucket().is_none());
        assert!(idle.error().is_none());
    }

    #[rstest]
    fn start_assigns_bucket(mut idle: UploadItem) {
        // Arrange

        // Act
        let applied = idle.start("b1");

        // Assert
        assert!(applied);
        assert_eq!(idle.status(), UploadStatus::Uploading);
        assert_eq!(idle.bucket(), Some("b1"));
    }

    #[rstest]
    fn start_twice_ignored(mut uploading: UploadItem) {
        // Arrange

        // Act
        let applied = uploading.start("b2");

        // Assert
        assert!(!applied);
        assert_eq!(uploading.bucket(), Some("b1"));
    }

    #[rstest]
    #[case(0.3, 0.3)]
    #[case(-1.0, 0.0)]
    #[case(1.0, MAX_IN_FLIGHT_PROGRESS)]
    #[case(7.0, MAX_IN_FLIGHT_PROGRESS)]
    fn progress_clamped(mut uploading: UploadItem, #[case] reported: f64, #[case] expected: f64) {
        // Arrange

        // Act
        uploading.report_progress(reported);

        // Assert
        assert_eq!(uploading.progress(), expected);
        assert_eq!(uploading.status(), UploadStatus::Uploading);
    }

    #[rstest]
    fn progress_never_decreases(mut uploading: UploadItem) {
        // Arrange
        uploading.report_progress(0.6);

        // Act
        let applied = uploading.report_progress(0.2);

        // Assert
        assert!(!applied);
        assert_eq!(uploading.progress(), 0.6);
    }

    #[rstest]
    fn progress_ignored_when_idle(mut idle: UploadItem) {
        // Arrange

        // Act
        let applied = idle.report_progress(0.5);

        // Assert
        assert!(!applied);
        assert_eq!(idle.progress(), 0.0);
    }

    #[rstest]
    fn complete_sets_full_progress(mut uploading: UploadItem) {
        // Arrange
        uploading.report_progress(0.4);

        // Act
        let applied = uploading.complete(Completion::now(Some(7), None));

        // Assert
        assert!(applied);
        assert_eq!(uploading.status(), UploadStatus::Uploaded);
        assert_eq!(uploading.progress(), 1.0);
        assert_eq!(uploading.completion().and_then(|c| c.file_id), Some(7));
    }

    #[rstest]
    fn uploaded_is_frozen(mut uploading: UploadItem) {
        // Arrange
        uploading.complete(Completion::now(None, None));
        let before = uploading.clone();

        // Act
        let changed = [
            uploading.report_progress(0.5),
            uploading.fail(UploadError::Canceled),
            uploading.cancel(),
            uploading.reset(),
            uploading.complete(Completion::now(Some(1), None)),
        ];

        // Assert
        assert_eq!(changed, [false; 5]);
        assert_eq!(uploading, before);
    }

    #[rstest]
    fn fail_keeps_last_progress(mut uploading: UploadItem) {
        // Arrange
        uploading.report_progress(0.25);

        // Act
        let applied = uploading.fail(UploadError::transport(Some(500), "boom"));

        // Assert
        assert!(applied);
        assert_eq!(uploading.status(), UploadStatus::Error);
        assert_eq!(uploading.progress(), 0.25);
        assert!(uploading.error().is_some());
        assert!(uploading.completion().is_none());
    }

    #[rstest]
    fn idle_item_can_fail_validation(mut idle: UploadItem) {
        // Arrange

        // Act
        let applied = idle.fail(UploadError::validation("too big"));

        // Assert
        assert!(applied);
        assert_eq!(idle.status(), UploadStatus::Error);
    }

    #[rstest]
    fn reset_returns_errored_item_to_idle(mut uploading: UploadItem) {
        // Arrange
        uploading.report_progress(0.5);
        uploading.fail(UploadError::transport(None, "reset by peer"));

        // Act
        let applied = uploading.reset();

        // Assert
        assert!(applied);
        assert_eq!(uploading.status(), UploadStatus::Idle);
        assert_eq!(uploading.progress(), 0.0);
        assert!(uploading.error().is_none());
        assert!(uploading.bucket().is_none());
    }

    #[rstest]
    fn reset_ignored_unless_error(mut uploading: UploadItem) {
        // Arrange

        // Act
        let applied = uploading.reset();

        // Assert
        assert!(!applied);
        assert_eq!(uploading.status(), UploadStatus::Uploading);
    }

    #[rstest]
    fn cancel_clears_error(mut uploading: UploadItem) {
        // Arrange
        uploading.fail(UploadError::transport(None, "x"));

        // Act
        let applied = uploading.cancel();

        // Assert
        assert!(applied);
        assert_eq!(uploading.status(), UploadStatus::Canceled);
        assert!(uploading.error().is_none());
        assert!(!uploading.cancel());
        assert!(!uploading.reset());
    }

    #[test]
    fn ids_are_unique() {
        // Arrange
        let a = ItemId::new();

        // Act
        let b = ItemId::new();

        // Assert
        assert_ne!(a, b);
    }
}
