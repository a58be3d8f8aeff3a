//! Where the current session id comes from.
//!
//! Session management itself lives elsewhere; the middleware only needs a
//! way to read the id of the session a request belongs to.

use crate::token::SessionId;
use palisade_core::HttpRequest;

/// Supplies the session id for a request, if it has one.
pub trait SessionSource: Send + Sync {
    fn session_id(&self, request: &HttpRequest) -> Option<SessionId>;
}

impl<F> SessionSource for F
where
    F: Fn(&HttpRequest) -> Option<SessionId> + Send + Sync,
{
    fn session_id(&self, request: &HttpRequest) -> Option<SessionId> {
        self(request)
    }
}

/// Reads the session id from a cookie.
#[derive(Debug, Clone)]
pub struct CookieSession {
    cookie_name: String,
}

impl CookieSession {
    pub const DEFAULT_COOKIE: &'static str = "sessionid";

    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }
}

impl Default for CookieSession {
    fn default() -> Self {
        Self::new(Self::DEFAULT_COOKIE)
    }
}

impl SessionSource for CookieSession {
    fn session_id(&self, request: &HttpRequest) -> Option<SessionId> {
        request.cookie(&self.cookie_name).and_then(SessionId::new)
    }
}

/// Reads the session id from a request header, e.g. one set by an
/// upstream gateway.
#[derive(Debug, Clone)]
pub struct HeaderSession {
    header_name: String,
}

impl HeaderSession {
    pub fn new(header_name: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
        }
    }
}

impl SessionSource for HeaderSession {
    fn session_id(&self, request: &HttpRequest) -> Option<SessionId> {
        request
            .header(&self.header_name)
            .map(str::trim)
            .and_then(SessionId::new)
    }
}
