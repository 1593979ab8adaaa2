use std::env;
use std::str::FromStr;

pub const DEFAULT_BUCKET: &str = "default";
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

const BUCKET_VAR: &str = "MUPLOAD_DEFAULT_BUCKET";
const MAX_CONCURRENCY_VAR: &str = "MUPLOAD_MAX_CONCURRENCY";
const MAX_FILE_SIZE_VAR: &str = "MUPLOAD_MAX_FILE_SIZE";
const CHUNK_SIZE_VAR: &str = "MUPLOAD_CHUNK_SIZE";

/// Tunables of an upload session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// Bucket used when `upload` is called without one
    pub default_bucket: String,
    /// Number of transfers allowed to run at the same time
    pub max_concurrency: usize,
    /// Files larger than this are rejected before dispatch
    pub max_file_size: Option<u64>,
    /// Size of body chunks, and so the granularity of progress reports
    pub chunk_size: usize,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            default_bucket: String::from(DEFAULT_BUCKET),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_file_size: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl UploadOptions {
    /// Reads options from `MUPLOAD_*` environment variables. Missing or
    /// unparsable values fall back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_bucket: env::var(BUCKET_VAR)
                .ok()
                .filter(|b| !b.trim().is_empty())
                .unwrap_or(defaults.default_bucket),
            max_concurrency: parse_var(MAX_CONCURRENCY_VAR).unwrap_or(defaults.max_concurrency),
            max_file_size: parse_var(MAX_FILE_SIZE_VAR).or(defaults.max_file_size),
            chunk_size: parse_var(CHUNK_SIZE_VAR).unwrap_or(defaults.chunk_size),
        }
        .normalized()
    }

    #[must_use]
    pub fn with_default_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.default_bucket = bucket.into();
        self
    }

    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self.normalized()
    }

    #[must_use]
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = Some(max_file_size);
        self
    }

    /// Zero limits would stall every transfer.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.max_concurrency = self.max_concurrency.max(1);
        self.chunk_size = self.chunk_size.max(1);
        self
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("ignoring {name}: cannot parse '{raw}'");
            None
        }
    }
}
