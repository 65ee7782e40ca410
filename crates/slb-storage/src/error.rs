use thiserror::Error;

/// Failures reported by a [`crate::ShareService`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("authorization failed (403 Forbidden): {0}")]
    Forbidden(String),

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("HTTP {status} ({}): {message}", .code.as_deref().unwrap_or("no error code"))]
    Http { status: u16, code: Option<String>, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("could not decode service response: {0}")]
    Decode(String),
}

impl StorageError {
    pub fn http(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Http { status, code: Some(code.into()), message: message.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
