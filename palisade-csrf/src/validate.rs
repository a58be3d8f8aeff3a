use crate::FORM_FIELD_NAME;
use crate::config::CsrfConfig;
use crate::error::CsrfError;
use crate::secret::Secret;
use crate::token::{SessionId, TokenDeriver};
use chrono::{DateTime, Utc};
use palisade_core::HttpRequest;
use subtle::Choice;
use tracing::trace;

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Neither the header nor the form body carried a token
    MissingToken,
    /// A token was submitted but does not belong to this session
    TokenMismatch,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::MissingToken => "missing_token",
            Rejection::TokenMismatch => "token_mismatch",
        }
    }
}

impl From<Rejection> for CsrfError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::MissingToken => CsrfError::MissingToken,
            Rejection::TokenMismatch => CsrfError::TokenMismatch,
        }
    }
}

/// Outcome of validating one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(Rejection),
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Verdict::Accept => None,
            Verdict::Reject(rejection) => Some(*rejection),
        }
    }
}

/// Decides whether an incoming request carries the token of its session.
///
/// Only POST requests that belong to a session are checked. The token is
/// looked up in the configured header first, then in the `csrf_token`
/// field of the form body.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    deriver: TokenDeriver,
    header_name: Option<String>,
    exempt_paths: Vec<String>,
}

impl RequestValidator {
    /// Validator reading the token from the form body only
    pub fn new(deriver: TokenDeriver) -> Self {
        Self {
            deriver,
            header_name: None,
            exempt_paths: Vec::new(),
        }
    }

    pub fn from_config(config: &CsrfConfig) -> Self {
        Self {
            deriver: config.deriver(),
            header_name: config.header_name.clone(),
            exempt_paths: config.exempt_paths.clone(),
        }
    }

    /// Also accept the token from this request header
    pub fn with_header(mut self, name: impl Into<String>) -> Self {
        self.header_name = Some(name.into());
        self
    }

    /// Skip validation for paths starting with any of these prefixes
    pub fn with_exempt_paths(mut self, paths: Vec<String>) -> Self {
        self.exempt_paths = paths;
        self
    }

    /// Whether a request is subject to validation at all, given that it
    /// belongs to a session.
    pub fn needs_protection(&self, request: &HttpRequest) -> bool {
        request.is_method("POST")
            && !self
                .exempt_paths
                .iter()
                .any(|prefix| request.path.starts_with(prefix.as_str()))
    }

    pub fn validate(&self, request: &HttpRequest, session: Option<&SessionId>, secret: &Secret) -> Verdict {
        self.validate_at(request, session, secret, Utc::now())
    }

    /// [`validate`](Self::validate) against an explicit clock
    pub fn validate_at(
        &self,
        request: &HttpRequest,
        session: Option<&SessionId>,
        secret: &Secret,
        now: DateTime<Utc>,
    ) -> Verdict {
        if !self.needs_protection(request) {
            return Verdict::Accept;
        }
        let Some(session) = session else {
            return Verdict::Accept;
        };

        let Some(submitted) = self.submitted_token(request) else {
            return Verdict::Reject(Rejection::MissingToken);
        };

        // Check every candidate so timing does not depend on which matched.
        let matched = self
            .deriver
            .accepted_at(session, secret, now)
            .iter()
            .fold(Choice::from(0), |acc, expected| {
                acc | expected.ct_matches(&submitted)
            });

        if bool::from(matched) {
            Verdict::Accept
        } else {
            Verdict::Reject(Rejection::TokenMismatch)
        }
    }

    /// Token submitted with the request, header first.
    ///
    /// A body that cannot be parsed counts as carrying no token.
    pub fn submitted_token(&self, request: &HttpRequest) -> Option<String> {
        let from_header = self
            .header_name
            .as_deref()
            .and_then(|name| request.header(name))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        if from_header.is_some() {
            return from_header;
        }

        match request.form_field(FORM_FIELD_NAME) {
            Ok(field) => field,
            Err(err) => {
                trace!(error = %err, "Unreadable form body");
                None
            }
        }
    }
}
