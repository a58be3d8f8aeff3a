use crate::config::CsrfConfig;
use crate::gate::ContentGate;
use crate::inject::FormInjector;
use crate::secret::{Secret, SecretStore};
use crate::session::{CookieSession, SessionSource};
use crate::token::{SessionId, Token, TokenDeriver};
use crate::validate::{RequestValidator, Verdict};
use async_trait::async_trait;
use palisade_core::{Error, HttpRequest, HttpResponse, Middleware, Next};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, trace};

/// CSRF protection middleware.
///
/// Inbound, POST requests that belong to a session must carry the
/// session's token or are refused with 403. Outbound, HTML responses to
/// requests with a session get the token injected into their POST forms.
///
/// Register it inside any compression middleware so bodies are rewritten
/// before they are encoded.
#[derive(Clone)]
pub struct CsrfMiddleware {
    secrets: SecretStore,
    validator: RequestValidator,
    gate: ContentGate,
    injector: FormInjector,
    deriver: TokenDeriver,
    sessions: Arc<dyn SessionSource>,
}

impl CsrfMiddleware {
    /// Create new CSRF middleware
    pub fn new(config: CsrfConfig, sessions: impl SessionSource + 'static) -> Self {
        Self {
            validator: RequestValidator::from_config(&config),
            gate: config.gate(),
            injector: FormInjector::new(),
            deriver: config.deriver(),
            secrets: SecretStore::new(config.secret),
            sessions: Arc::new(sessions),
        }
    }

    /// Middleware reading the session id from the `sessionid` cookie
    pub fn with_cookie_session(config: CsrfConfig) -> Self {
        Self::new(config, CookieSession::default())
    }

    /// Handle to the secret, for rotation. Shared with every clone.
    pub fn secrets(&self) -> &SecretStore {
        &self.secrets
    }

    /// Validate a request outside of a middleware chain
    pub fn check_request(&self, request: &HttpRequest) -> Verdict {
        let session = self.sessions.session_id(request);
        let secret = self.secrets.load();
        self.validator.validate(request, session.as_ref(), &secret)
    }

    /// Inject tokens into a response outside of a middleware chain
    pub fn protect_response(&self, request: &HttpRequest, response: HttpResponse) -> HttpResponse {
        let session = self.sessions.session_id(request);
        let secret = self.secrets.load();
        self.rewrite_response(response, session.as_ref(), &secret)
    }

    /// Token of the request's session, e.g. for an AJAX header
    pub fn token_for(&self, request: &HttpRequest) -> Option<Token> {
        let session = self.sessions.session_id(request)?;
        Some(self.deriver.derive(&session, &self.secrets.load()))
    }

    fn rewrite_response(
        &self,
        mut response: HttpResponse,
        session: Option<&SessionId>,
        secret: &Secret,
    ) -> HttpResponse {
        let Some(session) = session else {
            return response;
        };
        if response.body.is_empty() {
            return response;
        }
        if !response
            .get_content_type()
            .is_some_and(|ct| self.gate.applies(ct))
        {
            return response;
        }
        if let Some(encoding) = response.header("Content-Encoding")
            && !encoding.trim().eq_ignore_ascii_case("identity")
        {
            trace!(encoding = %encoding, "Skipping encoded response body");
            return response;
        }

        let token = self.deriver.derive(session, secret);
        let rewrite = self.injector.rewrite(&response.body, &token);
        let report = rewrite.report;
        let rewritten = match rewrite.body {
            Cow::Owned(body) => Some(body),
            Cow::Borrowed(_) => None,
        };

        if report.unparseable > 0 || report.forms_injected > 0 {
            debug!(
                forms_injected = report.forms_injected,
                already_present = report.already_present,
                unparseable = report.unparseable,
                "Injected CSRF tokens into response"
            );
        }

        if let Some(body) = rewritten {
            response.body = body;
        }
        response
    }
}

#[async_trait]
impl Middleware for CsrfMiddleware {
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        let session = self.sessions.session_id(&req);
        let secret = self.secrets.load();

        if let Verdict::Reject(rejection) = self.validator.validate(&req, session.as_ref(), &secret) {
            debug!(
                method = %req.method,
                path = %req.path,
                reason = rejection.as_str(),
                "CSRF validation failed"
            );
            return Err(crate::CsrfError::from(rejection).into());
        }

        let response = next(req).await?;
        Ok(self.rewrite_response(response, session.as_ref(), &secret))
    }
}
