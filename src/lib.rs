// Palisade - session-bound CSRF protection for HTTP applications
//
// The core crate provides the request/response abstraction and middleware
// chain; the csrf crate derives tokens, injects them into outgoing forms and
// validates them on incoming POST requests.

// Re-export core functionality
pub use palisade_core::*;

// Re-export optional crates
#[cfg(feature = "csrf")]
pub use palisade_csrf;

// Needed to implement `Middleware` outside this crate
pub use async_trait::async_trait;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Error,
        HandlerFn,
        HttpRequest,
        HttpResponse,
        Middleware,
        MiddlewareChain,
        Next,
        async_trait,
        handler,
        logging::LogConfig,
    };

    #[cfg(feature = "csrf")]
    pub use palisade_csrf::{
        CookieSession,
        CsrfConfig,
        CsrfMiddleware,
        FORM_FIELD_NAME,
        SessionId,
        SessionSource,
        Verdict,
    };
}
