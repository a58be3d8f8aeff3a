//! # Palisade Core
//!
//! The request/response abstraction and middleware plumbing Palisade's
//! protections plug into. A host server converts its own request type into
//! [`HttpRequest`], runs a [`MiddlewareChain`] around its handler, and
//! writes the resulting [`HttpResponse`] back out.
//!
//! ```rust
//! use palisade_core::{handler, HttpRequest, HttpResponse, MiddlewareChain};
//!
//! # tokio_test::block_on(async {
//! let chain = MiddlewareChain::new();
//! let response = chain
//!     .respond(
//!         HttpRequest::new("GET", "/"),
//!         handler(|_req| async { Ok(HttpResponse::html("<p>hello</p>")) }),
//!     )
//!     .await;
//! assert_eq!(response.status, 200);
//! # });
//! ```

pub mod error;
pub mod form;
pub mod http;
pub mod logging;
pub mod middleware;

pub use error::Error;
pub use http::{HttpRequest, HttpResponse};
pub use middleware::{HandlerFn, Middleware, MiddlewareChain, Next, ResponseFuture, handler};
