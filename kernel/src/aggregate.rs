//! Views derived from an item list. Nothing here is stored; every value is
//! recomputed from the items it is given.

use std::fmt;

use serde::Serialize;

use crate::{UploadItem, UploadStatus};

/// Status of a whole upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Idle,
    Uploading,
    Uploaded,
    Error,
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Uploaded => "uploaded",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Any uploading item wins, then any error. A list is uploaded only when
/// every item is. Everything else, including the empty list, is idle.
#[must_use]
pub fn overall_status(items: &[UploadItem]) -> OverallStatus {
    if items.is_empty() {
        return OverallStatus::Idle;
    }
    let tally = Tally::from_items(items);
    if tally.uploading > 0 {
        OverallStatus::Uploading
    } else if tally.error > 0 {
        OverallStatus::Error
    } else if tally.uploaded == items.len() {
        OverallStatus::Uploaded
    } else {
        OverallStatus::Idle
    }
}

/// Arithmetic mean of item progress, 0 for an empty list.
///
/// Failed and canceled items count with the last progress they reached.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn overall_progress(items: &[UploadItem]) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    let sum: f64 = items.iter().map(UploadItem::progress).sum();
    sum / items.len() as f64
}

#[must_use]
pub fn is_uploaded(items: &[UploadItem]) -> bool {
    overall_status(items) == OverallStatus::Uploaded
}

#[must_use]
pub fn is_uploading(items: &[UploadItem]) -> bool {
    overall_status(items) == OverallStatus::Uploading
}

#[must_use]
pub fn has_error(items: &[UploadItem]) -> bool {
    overall_status(items) == OverallStatus::Error
}

/// Number of items in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub idle: usize,
    pub uploading: usize,
    pub uploaded: usize,
    pub error: usize,
    pub canceled: usize,
}

impl Tally {
    #[must_use]
    pub fn from_items(items: &[UploadItem]) -> Self {
        items.iter().fold(Self::default(), |mut t, item| {
            match item.status() {
                UploadStatus::Idle => t.idle += 1,
                UploadStatus::Uploading => t.uploading += 1,
                UploadStatus::Uploaded => t.uploaded += 1,
                UploadStatus::Error => t.error += 1,
                UploadStatus::Canceled => t.canceled += 1,
            }
            t
        })
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.idle + self.uploading + self.uploaded + self.error + self.canceled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Completion, UploadError, UploadFile};
    use rstest::rstest;

    fn item(status: UploadStatus, progress: f64) -> UploadItem {
        let mut item = UploadItem::new(UploadFile::from_bytes("f", &b"f"[..]));
        if status == UploadStatus::Idle {
            return item;
        }
        item.start("b");
        item.report_progress(progress);
        match status {
            UploadStatus::Uploaded => {
                item.complete(Completion::now(None, None));
            }
            UploadStatus::Error => {
                item.fail(UploadError::transport(None, "x"));
            }
            UploadStatus::Canceled => {
                item.cancel();
            }
            UploadStatus::Idle | UploadStatus::Uploading => {}
        }
        item
    }

    #[rstest]
    #[case(vec![], OverallStatus::Idle)]
    #[case(vec![UploadStatus::Idle, UploadStatus::Idle], OverallStatus::Idle)]
    #[case(vec![UploadStatus::Uploaded, UploadStatus::Uploading], OverallStatus::Uploading)]
    #[case(vec![UploadStatus::Error, UploadStatus::Uploading], OverallStatus::Uploading)]
    #[case(vec![UploadStatus::Error, UploadStatus::Uploaded], OverallStatus::Error)]
    #[case(vec![UploadStatus::Uploaded, UploadStatus::Uploaded], OverallStatus::Uploaded)]
    #[case(vec![UploadStatus::Uploaded, UploadStatus::Idle], OverallStatus::Idle)]
    #[case(vec![UploadStatus::Uploaded, UploadStatus::Canceled], OverallStatus::Idle)]
    fn overall_status_cases(#[case] statuses: Vec<UploadStatus>, #[case] expected: OverallStatus) {
        // Arrange
        let items: Vec<UploadItem> = statuses.into_iter().map(|s| item(s, 0.5)).collect();

        // Act
        let actual = overall_status(&items);

        // Assert
        assert_eq!(actual, expected);
        assert_eq!(is_uploaded(&items), expected == OverallStatus::Uploaded);
        assert_eq!(is_uploading(&items), expected == OverallStatus::Uploading);
        assert_eq!(has_error(&items), expected == OverallStatus::Error);
    }

    #[test]
    fn progress_of_empty_list_is_zero() {
        // Arrange

        // Act
        let p = overall_progress(&[]);

        // Assert
        assert_eq!(p, 0.0);
    }

    #[test]
    fn progress_is_mean_with_last_known_failed_value() {
        // Arrange
        let items = vec![
            item(UploadStatus::Uploaded, 0.0),
            item(UploadStatus::Error, 0.5),
            item(UploadStatus::Uploading, 0.25),
            item(UploadStatus::Idle, 0.0),
        ];

        // Act
        let p = overall_progress(&items);

        // Assert
        assert!((p - 0.4375).abs() < f64::EPSILON);
    }

    #[test]
    fn tally_counts_every_status() {
        // Arrange
        let items = vec![
            item(UploadStatus::Idle, 0.0),
            item(UploadStatus::Uploading, 0.1),
            item(UploadStatus::Uploaded, 0.0),
            item(UploadStatus::Error, 0.0),
            item(UploadStatus::Canceled, 0.0),
            item(UploadStatus::Canceled, 0.0),
        ];

        // Act
        let t = Tally::from_items(&items);

        // Assert
        assert_eq!(
            t,
            Tally {
                idle: 1,
                uploading: 1,
                uploaded: 1,
                error: 1,
                canceled: 2,
            }
        );
        assert_eq!(t.total(), 6);
    }
}
