use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::Serialize;

/// Where the payload of an upload comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Streamed from disk when the transfer starts
    Path(PathBuf),
    /// Already in memory
    Bytes(Bytes),
}

/// Payload handle for one upload. The coordinator never looks inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadFile {
    /// File name used as the object name inside the bucket
    pub name: String,
    /// Payload size in bytes
    pub size: u64,
    /// Optional MIME type sent along with the body
    pub content_type: Option<String>,
    #[serde(skip)]
    pub source: FileSource,
}

impl UploadFile {
    /// Creates a handle over a file on disk. Reads metadata only.
    pub async fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let meta = tokio::fs::metadata(path).await?;
        if !meta.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a file", path.display()),
            ));
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_owned();
        Ok(Self {
            name,
            size: meta.len(),
            content_type: None,
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            size: data.len() as u64,
            content_type: None,
            source: FileSource::Bytes(data),
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_sets_size() {
        // Arrange

        // Act
        let f = UploadFile::from_bytes("a.txt", &b"hello"[..]).with_content_type("text/plain");

        // Assert
        assert_eq!(f.name, "a.txt");
        assert_eq!(f.size, 5);
        assert_eq!(f.content_type.as_deref(), Some("text/plain"));
        assert_eq!(f.source, FileSource::Bytes(Bytes::from_static(b"hello")));
    }

    #[tokio::test]
    async fn from_path_reads_metadata() {
        // Arrange
        let path = std::env::temp_dir().join(format!("kernel_file_{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, b"12345678").await.unwrap();

        // Act
        let f = UploadFile::from_path(&path).await;

        // Assert
        tokio::fs::remove_file(&path).await.unwrap_or_default();
        let f = f.unwrap();
        assert_eq!(f.size, 8);
        assert_eq!(f.source, FileSource::Path(path.clone()));
        assert_eq!(f.name, path.file_name().unwrap().to_str().unwrap());
    }

    #[tokio::test]
    async fn from_path_rejects_directory() {
        // Arrange
        let dir = std::env::temp_dir();

        // Act
        let f = UploadFile::from_path(&dir).await;

        // Assert
        assert_eq!(f.unwrap_err().kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn from_path_missing_file() {
        // Arrange
        let path = std::env::temp_dir().join(format!("kernel_missing_{}", uuid::Uuid::new_v4()));

        // Act
        let f = UploadFile::from_path(&path).await;

        // Assert
        assert!(f.is_err());
    }
}
