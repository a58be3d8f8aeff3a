// HTTP request and response types

use crate::form;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// HTTP request wrapper
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub path_params: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: HashMap::new(),
            body: Vec::new(),
            path_params: HashMap::new(),
            query_params: HashMap::new(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Build a urlencoded form submission.
    pub fn with_form<T: Serialize + ?Sized>(mut self, form: &T) -> Result<Self, crate::Error> {
        self.body = serde_urlencoded::to_string(form)
            .map_err(|e| crate::Error::Serialization(e.to_string()))?
            .into_bytes();
        self.headers.insert(
            "Content-Type".to_string(),
            form::URLENCODED.to_string(),
        );
        Ok(self)
    }

    /// Check the request method, ignoring ASCII case.
    pub fn is_method(&self, method: &str) -> bool {
        self.method.eq_ignore_ascii_case(method)
    }

    /// Get a header by name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        header_lookup(&self.headers, name)
    }

    /// Get the declared Content-Type
    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// Get a cookie value from the Cookie header
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.header("Cookie")?.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim().trim_matches('"'))
        })
    }

    /// Read a submitted form field.
    ///
    /// Multipart bodies are searched for a text part with this name;
    /// anything else is parsed as `application/x-www-form-urlencoded`.
    /// Returns `Ok(None)` when the field is not present.
    pub fn form_field(&self, name: &str) -> Result<Option<String>, crate::Error> {
        match self.content_type() {
            Some(ct) if form::is_multipart(ct) => {
                let parser = form::MultipartParser::from_content_type(ct)?;
                Ok(parser.text_field(&self.body, name))
            }
            _ => form::form_value(&self.body, name),
        }
    }

    /// Parse the request body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, crate::Error> {
        serde_json::from_slice(&self.body).map_err(|e| crate::Error::Deserialization(e.to_string()))
    }

    /// Get a path parameter by name
    pub fn param(&self, name: &str) -> Option<&String> {
        self.path_params.get(name)
    }

    /// Get a query parameter by name
    pub fn query(&self, name: &str) -> Option<&String> {
        self.query_params.get(name)
    }
}

/// HTTP response wrapper
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn bad_request() -> Self {
        Self::new(400)
    }

    pub fn forbidden() -> Self {
        Self::new(403)
    }

    pub fn internal_server_error() -> Self {
        Self::new(500)
    }

    /// HTML response with `text/html; charset=utf-8`
    pub fn html(body: impl Into<String>) -> Self {
        Self::ok()
            .content_type("text/html; charset=utf-8")
            .with_body(body.into().into_bytes())
    }

    /// Plain-text response with `text/plain; charset=utf-8`
    pub fn text(body: impl Into<String>) -> Self {
        Self::ok()
            .content_type("text/plain; charset=utf-8")
            .with_body(body.into().into_bytes())
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self, crate::Error> {
        self.body =
            serde_json::to_vec(value).map_err(|e| crate::Error::Serialization(e.to_string()))?;
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn content_type(self, value: impl Into<String>) -> Self {
        self.with_header("Content-Type", value)
    }

    /// Get a header by name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        header_lookup(&self.headers, name)
    }

    /// Get the declared Content-Type
    pub fn get_content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// Body as UTF-8 text, lossy
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn header_lookup<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    // Exact match first; header maps are usually built with canonical casing.
    if let Some(value) = headers.get(name) {
        return Some(value.as_str());
    }
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = HttpRequest::new("GET", "/").with_header("x-csrf-token", "abc");
        assert_eq!(req.header("X-CSRF-Token"), Some("abc"));
        assert_eq!(req.header("missing"), None);
    }

    #[test]
    fn test_cookie_parsing() {
        let req = HttpRequest::new("GET", "/")
            .with_header("Cookie", "theme=dark; sessionid=s3ss10n ; other=\"quoted\"");
        assert_eq!(req.cookie("sessionid"), Some("s3ss10n"));
        assert_eq!(req.cookie("other"), Some("quoted"));
        assert_eq!(req.cookie("session"), None);
    }

    #[test]
    fn test_is_method() {
        let req = HttpRequest::new("post", "/");
        assert!(req.is_method("POST"));
        assert!(!req.is_method("GET"));
    }

    #[test]
    fn test_form_field_urlencoded() {
        let req = HttpRequest::new("POST", "/submit")
            .with_form(&vec![("name", "alice"), ("csrf_token", "t0k")])
            .unwrap();
        assert_eq!(req.form_field("csrf_token").unwrap().as_deref(), Some("t0k"));
        assert_eq!(req.form_field("missing").unwrap(), None);
    }

    #[test]
    fn test_form_field_multipart() {
        let body = "--XyZ\r\n\
                    Content-Disposition: form-data; name=\"csrf_token\"\r\n\
                    \r\n\
                    t0k\r\n\
                    --XyZ--\r\n";
        let req = HttpRequest::new("POST", "/upload")
            .with_header("Content-Type", "multipart/form-data; boundary=XyZ")
            .with_body(body);
        assert_eq!(req.form_field("csrf_token").unwrap().as_deref(), Some("t0k"));
    }

    #[test]
    fn test_html_response() {
        let response = HttpResponse::html("<h1>Hi</h1>");
        assert_eq!(response.status, 200);
        assert_eq!(
            response.get_content_type(),
            Some("text/html; charset=utf-8")
        );
        assert_eq!(response.body_text(), "<h1>Hi</h1>");
    }
}
