use palisade_core::Error as CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsrfError {
    #[error("CSRF token missing")]
    MissingToken,

    #[error("CSRF token mismatch")]
    TokenMismatch,

    #[error("Invalid secret: {0}")]
    InvalidSecret(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl CsrfError {
    /// Whether this error rejects the request rather than signalling a
    /// server-side problem.
    pub fn is_rejection(&self) -> bool {
        matches!(self, CsrfError::MissingToken | CsrfError::TokenMismatch)
    }
}

impl From<CsrfError> for CoreError {
    fn from(err: CsrfError) -> Self {
        if err.is_rejection() {
            CoreError::Forbidden(err.to_string())
        } else {
            CoreError::Internal(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, CsrfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_become_forbidden() {
        let err: CoreError = CsrfError::MissingToken.into();
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.to_string(), "Forbidden: CSRF token missing");

        let err: CoreError = CsrfError::TokenMismatch.into();
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn test_setup_errors_are_internal() {
        let err: CoreError = CsrfError::Config("bad ttl".into()).into();
        assert_eq!(err.status_code(), 500);
        assert!(!CsrfError::InvalidSecret("short".into()).is_rejection());
    }
}
