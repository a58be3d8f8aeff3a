// Error types for Palisade

use crate::HttpResponse;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status code this error is surfaced as
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Forbidden(_) => 403,
            Error::BadRequest(_) | Error::Deserialization(_) => 400,
            Error::Serialization(_) | Error::Internal(_) | Error::Io(_) => 500,
        }
    }

    /// Whether this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Render the error as a plain-text response.
    ///
    /// Server errors get a generic body so internal detail is not leaked.
    pub fn into_response(self) -> HttpResponse {
        let status = self.status_code();
        let body = if self.is_client_error() {
            self.to_string()
        } else {
            "Internal Server Error".to_string()
        };

        HttpResponse::new(status)
            .content_type("text/plain; charset=utf-8")
            .with_body(body.into_bytes())
    }
}
