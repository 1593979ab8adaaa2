use async_trait::async_trait;
use kernel::UploadError;

/// Supplies credentials for each transfer.
///
/// Implementations own refresh. The coordinator asks for a token right before
/// every send and treats a failure here as that item's failure.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn access_token(&self) -> Result<Option<String>, UploadError>;
}

/// No credentials at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

#[async_trait]
impl AuthProvider for Anonymous {
    async fn access_token(&self) -> Result<Option<String>, UploadError> {
        Ok(None)
    }
}

/// A bearer token fixed for the lifetime of the session.
#[derive(Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticToken").field("token", &"***").finish()
    }
}

#[async_trait]
impl AuthProvider for StaticToken {
    async fn access_token(&self) -> Result<Option<String>, UploadError> {
        if self.token.is_empty() {
            return Err(UploadError::unauthenticated("empty access token"));
        }
        Ok(Some(self.token.clone()))
    }
}
