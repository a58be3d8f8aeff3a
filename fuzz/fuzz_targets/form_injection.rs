//! Fuzz target for response body rewriting.
//!
//! Arbitrary markup must never panic the injector, and the output must be
//! the input plus whole hidden fields.

#![no_main]

use libfuzzer_sys::fuzz_target;

use palisade_csrf::{FormInjector, Secret, SessionId, TokenDeriver};
use std::borrow::Cow;

fuzz_target!(|body: &[u8]| {
    let Ok(secret) = Secret::new([7u8; 32]) else {
        return;
    };
    let Some(session) = SessionId::new("fuzz") else {
        return;
    };
    let token = TokenDeriver::new().derive(&session, &secret);
    let field_len = FormInjector::hidden_input(&token).len();

    let injector = FormInjector::new();
    let rewrite = injector.rewrite(body, &token);
    let report = rewrite.report;

    assert_eq!(
        rewrite.body.len(),
        body.len() + report.forms_injected * field_len
    );
    if report.forms_injected == 0 {
        assert!(matches!(rewrite.body, Cow::Borrowed(_)));
    }

    // Rewriting again injects nothing new
    let again = injector.rewrite(&rewrite.body, &token);
    assert_eq!(again.report.forms_injected, 0);
    assert_eq!(again.body.as_ref(), rewrite.body.as_ref());
});
