//! Fuzz target for submitted-token extraction.
//!
//! Tests urlencoded and multipart body parsing and full request validation
//! with arbitrary input.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use palisade_core::HttpRequest;
use palisade_csrf::{RequestValidator, Secret, SessionId, TokenDeriver, FORM_FIELD_NAME};

/// Arbitrary POST submission for fuzzing.
#[derive(Debug, Arbitrary)]
struct FuzzSubmission {
    content_type: Option<String>,
    header_token: Option<String>,
    body: Vec<u8>,
}

fuzz_target!(|data: FuzzSubmission| {
    let mut request = HttpRequest::new("POST", "/submit").with_body(data.body);
    if let Some(ct) = data.content_type {
        request = request.with_header("Content-Type", ct);
    }
    if let Some(token) = data.header_token {
        request = request.with_header("X-CSRF-Token", token);
    }

    // Parsing must not panic, whatever the body
    let _ = request.form_field(FORM_FIELD_NAME);

    let Ok(secret) = Secret::new([3u8; 32]) else {
        return;
    };
    let Some(session) = SessionId::new("fuzz") else {
        return;
    };
    let validator = RequestValidator::new(TokenDeriver::new()).with_header("X-CSRF-Token");

    // Without a real token, arbitrary input must never be accepted
    assert!(!validator.validate(&request, Some(&session), &secret).is_accept());
});
