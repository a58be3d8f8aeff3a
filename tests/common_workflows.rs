//! Integration tests for common Palisade workflows.
//!
//! A small application behind the facade crate: a page with a POST form,
//! a handler accepting the submission, and the CSRF middleware in between.

use palisade::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const SECRET: &[u8; 32] = b"workflow_secret_0123456789abcdef";

fn app(submissions: Arc<AtomicUsize>) -> HandlerFn {
    handler(move |req: HttpRequest| {
        let submissions = submissions.clone();
        async move {
            if req.is_method("POST") {
                submissions.fetch_add(1, Ordering::SeqCst);
                return HttpResponse::ok().with_json(&serde_json::json!({"saved": true}));
            }
            Ok(HttpResponse::html(concat!(
                "<html><body>",
                "<form method=\"post\" action=\"/comments\">",
                "<textarea name=\"text\"></textarea>",
                "</form></body></html>"
            )))
        }
    })
}

fn chain() -> MiddlewareChain {
    MiddlewareChain::new()
        .with(CsrfMiddleware::with_cookie_session(CsrfConfig::new(*SECRET).unwrap()))
}

fn logged_in(method: &str, path: &str) -> HttpRequest {
    HttpRequest::new(method, path).with_header("Cookie", "sessionid=u-1001; theme=dark")
}

fn extract_token(html: &str) -> String {
    let marker = format!("name=\"{}\" value=\"", FORM_FIELD_NAME);
    let start = html.find(&marker).expect("token field") + marker.len();
    html[start..start + 43].to_string()
}

#[tokio::test]
async fn test_render_then_submit() {
    let submissions = Arc::new(AtomicUsize::new(0));
    let chain = chain();

    let page = chain.respond(logged_in("GET", "/comments"), app(submissions.clone())).await;
    assert_eq!(page.status, 200);
    let token = extract_token(&page.body_text());

    let post = logged_in("POST", "/comments")
        .with_form(&vec![("text", "first!"), (FORM_FIELD_NAME, token.as_str())])
        .unwrap();
    let response = chain.respond(post, app(submissions.clone())).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.get_content_type(), Some("application/json"));
    assert_eq!(submissions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_forged_submission_refused() {
    let submissions = Arc::new(AtomicUsize::new(0));
    let chain = chain();

    let page = chain.respond(logged_in("GET", "/comments"), app(submissions.clone())).await;
    let mut token = extract_token(&page.body_text());
    let first = if token.starts_with('A') { "B" } else { "A" };
    token.replace_range(..1, first);

    let post = logged_in("POST", "/comments")
        .with_form(&vec![("text", "spam"), (FORM_FIELD_NAME, token.as_str())])
        .unwrap();
    let response = chain.respond(post, app(submissions.clone())).await;

    assert_eq!(response.status, 403);
    assert_eq!(response.body_text(), "Forbidden: CSRF token mismatch");
    assert_eq!(submissions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_anonymous_visitors_pass_through() {
    let submissions = Arc::new(AtomicUsize::new(0));
    let chain = chain();

    let page = chain
        .respond(HttpRequest::new("GET", "/comments"), app(submissions.clone()))
        .await;
    assert!(!page.body_text().contains(FORM_FIELD_NAME));

    let post = HttpRequest::new("POST", "/comments")
        .with_form(&vec![("text", "hello")])
        .unwrap();
    let response = chain.respond(post, app(submissions.clone())).await;
    assert_eq!(response.status, 200);
    assert_eq!(submissions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_custom_middleware_alongside_csrf() {
    struct PoweredBy;

    #[async_trait]
    impl Middleware for PoweredBy {
        async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
            Ok(next(req).await?.with_header("X-Powered-By", "palisade"))
        }
    }

    let chain = MiddlewareChain::new()
        .with(PoweredBy)
        .with(CsrfMiddleware::with_cookie_session(CsrfConfig::new(*SECRET).unwrap()));

    let page = chain
        .respond(logged_in("GET", "/comments"), app(Arc::new(AtomicUsize::new(0))))
        .await;
    assert_eq!(page.header("X-Powered-By"), Some("palisade"));
    assert!(page.body_text().contains(FORM_FIELD_NAME));

    // Rejections still pass back through outer middleware as errors.
    let refused = chain
        .respond(logged_in("POST", "/comments"), app(Arc::new(AtomicUsize::new(0))))
        .await;
    assert_eq!(refused.status, 403);
    assert_eq!(refused.header("X-Powered-By"), None);
}
