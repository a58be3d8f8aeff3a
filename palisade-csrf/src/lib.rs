//! # Palisade CSRF Protection
//!
//! Session-bound Cross-Site Request Forgery protection as middleware.
//!
//! ## Features
//!
//! - ✅ **Session-bound Tokens** - HMAC-SHA256 of the session id, nothing stored
//! - ✅ **Form Injection** - POST forms in HTML responses get a hidden field
//! - ✅ **Request Validation** - constant-time comparison, 403 on failure
//! - ✅ **Header Submission** - `X-CSRF-Token` for AJAX clients
//! - ✅ **Optional Expiry** - time-boxed tokens with a grace window
//! - ✅ **Secret Rotation** - swap the key without restarting
//!
//! ## Quick Start
//!
//! ```rust
//! use palisade_csrf::{CsrfConfig, CsrfMiddleware};
//! use std::time::Duration;
//!
//! let secret = CsrfConfig::generate_secret();
//! let config = CsrfConfig::new(secret.as_slice())
//!     .unwrap()
//!     .with_token_ttl(Duration::from_secs(3600))
//!     .with_exempt_paths(vec!["/webhooks/".to_string()]);
//!
//! // Session id read from the `sessionid` cookie
//! let csrf = CsrfMiddleware::with_cookie_session(config);
//! ```
//!
//! ## Token Round Trip
//!
//! ```rust
//! use palisade_core::{HttpRequest, HttpResponse};
//! use palisade_csrf::{CsrfConfig, CsrfMiddleware, FORM_FIELD_NAME};
//!
//! let csrf = CsrfMiddleware::with_cookie_session(CsrfConfig::default());
//! let page = HttpRequest::new("GET", "/profile").with_header("Cookie", "sessionid=abc");
//!
//! let response = csrf.protect_response(
//!     &page,
//!     HttpResponse::html(r#"<form method="post"><input name="bio"></form>"#),
//! );
//! assert!(response.body_text().contains(FORM_FIELD_NAME));
//!
//! let token = csrf.token_for(&page).unwrap();
//! let submit = HttpRequest::new("POST", "/profile")
//!     .with_header("Cookie", "sessionid=abc")
//!     .with_form(&vec![("bio", "hi"), (FORM_FIELD_NAME, token.as_str())])
//!     .unwrap();
//! assert!(csrf.check_request(&submit).is_accept());
//! ```
//!
//! ## Usage in a Middleware Chain
//!
//! ```rust
//! use palisade_core::{handler, HttpRequest, HttpResponse, MiddlewareChain};
//! use palisade_csrf::{CsrfConfig, CsrfMiddleware};
//!
//! # tokio_test::block_on(async {
//! let chain = MiddlewareChain::new()
//!     .with(CsrfMiddleware::with_cookie_session(CsrfConfig::default()));
//!
//! // A POST without a token is refused before the handler runs
//! let request = HttpRequest::new("POST", "/transfer").with_header("Cookie", "sessionid=abc");
//! let response = chain
//!     .respond(request, handler(|_req| async { Ok(HttpResponse::ok()) }))
//!     .await;
//! assert_eq!(response.status, 403);
//! # });
//! ```

pub mod config;
pub mod error;
pub mod gate;
pub mod inject;
pub mod middleware;
pub mod secret;
pub mod session;
pub mod token;
pub mod validate;

pub use config::{CsrfConfig, CsrfSettings};
pub use error::{CsrfError, Result};
pub use gate::ContentGate;
pub use inject::{FormInjector, InjectionReport, Rewrite};
pub use middleware::CsrfMiddleware;
pub use secret::{Secret, SecretStore};
pub use session::{CookieSession, HeaderSession, SessionSource};
pub use token::{SessionId, Token, TokenDeriver};
pub use validate::{Rejection, RequestValidator, Verdict};

/// Name of the form field carrying the token, written by the injector and
/// read by the validator.
pub const FORM_FIELD_NAME: &str = "csrf_token";
