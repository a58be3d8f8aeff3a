//! Hidden-field injection into POST forms.
//!
//! The scanner walks the body once, tag by tag, without building a
//! document tree. It understands just enough markup to find `<form ...>`
//! openings reliably:
//!
//! - attribute values are quote-aware, so a `>` inside a value does not end
//!   the tag and a `<form` inside a value is not a form;
//! - comments and the contents of `<script>`, `<style>`, `<textarea>` and
//!   `<title>` are skipped;
//! - a tag that never closes runs to the end of the body, as it does in a
//!   browser, so scanning stops there and the rest is copied unchanged.
//!
//! Everything outside the inserted fields is copied byte for byte.

use crate::FORM_FIELD_NAME;
use crate::token::Token;
use memchr::{memchr, memmem};
use std::borrow::Cow;
use tracing::trace;

/// What a rewrite did to a body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InjectionReport {
    /// POST forms that received a hidden field
    pub forms_injected: usize,
    /// POST forms that already started with the hidden field
    pub already_present: usize,
    /// Form tags that could not be parsed and were left untouched
    pub unparseable: usize,
}

impl InjectionReport {
    pub fn is_unchanged(&self) -> bool {
        self.forms_injected == 0
    }
}

/// A rewritten body plus what happened to it.
#[derive(Debug)]
pub struct Rewrite<'a> {
    /// Borrowed when no form was injected
    pub body: Cow<'a, [u8]>,
    pub report: InjectionReport,
}

/// Inserts the token field right after every POST form's opening tag.
///
/// Injection is idempotent: a form whose first child tag is already an
/// `<input>` named [`FORM_FIELD_NAME`] is not injected again.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormInjector;

enum Markup {
    Comment,
    RawText(&'static [u8]),
    Form,
    Tag,
    Text,
}

impl FormInjector {
    pub fn new() -> Self {
        Self
    }

    /// The markup inserted into each POST form
    pub fn hidden_input(token: &Token) -> String {
        format!(
            r#"<input type="hidden" name="{}" value="{}" />"#,
            FORM_FIELD_NAME, token
        )
    }

    /// Body with the token injected into every POST form
    pub fn inject<'a>(&self, body: &'a [u8], token: &Token) -> Cow<'a, [u8]> {
        self.rewrite(body, token).body
    }

    /// Like [`inject`](Self::inject), also reporting what was changed
    pub fn rewrite<'a>(&self, body: &'a [u8], token: &Token) -> Rewrite<'a> {
        let field = Self::hidden_input(token);
        let mut report = InjectionReport::default();
        let mut out: Option<Vec<u8>> = None;
        let mut copied = 0;
        let mut pos = 0;

        while let Some(offset) = memchr(b'<', &body[pos..]) {
            let lt = pos + offset;

            match classify(&body[lt..]) {
                // From `lt + 2` so `<!-->` and `<!--->` close themselves
                Markup::Comment => match memmem::find(&body[lt + 2..], b"-->") {
                    Some(end) => pos = lt + 2 + end + 3,
                    None => break,
                },
                Markup::RawText(name) => {
                    let Some(gt) = tag_end(body, lt + 1 + name.len()) else {
                        break;
                    };
                    match closing_tag(body, gt + 1, name) {
                        Some(close) => pos = close,
                        None => break,
                    }
                }
                Markup::Form => {
                    let attrs_start = lt + "<form".len();
                    match tag_end(body, attrs_start) {
                        Some(gt) => {
                            let after = gt + 1;
                            if is_post(&body[attrs_start..gt]) {
                                if starts_with_token_field(&body[after..]) {
                                    report.already_present += 1;
                                } else {
                                    let buf = out.get_or_insert_with(|| {
                                        Vec::with_capacity(body.len() + field.len())
                                    });
                                    buf.extend_from_slice(&body[copied..after]);
                                    buf.extend_from_slice(field.as_bytes());
                                    copied = after;
                                    report.forms_injected += 1;
                                }
                            }
                            pos = after;
                        }
                        None => {
                            trace!(offset = lt, "Unterminated form tag, leaving remainder as is");
                            report.unparseable += 1;
                            break;
                        }
                    }
                }
                Markup::Tag => match tag_end(body, lt + 1) {
                    Some(gt) => pos = gt + 1,
                    None => break,
                },
                Markup::Text => pos = lt + 1,
            }
        }

        let body = match out {
            Some(mut buf) => {
                buf.extend_from_slice(&body[copied..]);
                Cow::Owned(buf)
            }
            None => Cow::Borrowed(body),
        };

        Rewrite { body, report }
    }
}

/// Classify the markup starting at a `<`.
fn classify(rest: &[u8]) -> Markup {
    if rest.starts_with(b"<!--") {
        Markup::Comment
    } else if opens_element(rest, b"script") {
        Markup::RawText(b"script")
    } else if opens_element(rest, b"style") {
        Markup::RawText(b"style")
    } else if opens_element(rest, b"textarea") {
        Markup::RawText(b"textarea")
    } else if opens_element(rest, b"title") {
        Markup::RawText(b"title")
    } else if opens_element(rest, b"form") {
        Markup::Form
    } else {
        match rest.get(1) {
            Some(b) if b.is_ascii_alphabetic() => Markup::Tag,
            Some(b'/') | Some(b'!') | Some(b'?') => Markup::Tag,
            _ => Markup::Text,
        }
    }
}

/// `<name` followed by a tag delimiter or end of input.
fn opens_element(rest: &[u8], name: &[u8]) -> bool {
    starts_with_ignore_case(&rest[1..], name) && is_name_end(rest.get(1 + name.len()))
}

fn is_name_end(byte: Option<&u8>) -> bool {
    match byte {
        None => true,
        Some(b) => b.is_ascii_whitespace() || *b == b'>' || *b == b'/',
    }
}

fn starts_with_ignore_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack[..needle.len()].eq_ignore_ascii_case(needle)
}

/// Index of the `>` closing the tag whose attributes start at `from`.
///
/// Quotes only open a value directly after `=`, as in HTML, so stray
/// apostrophes in unquoted values do not swallow the tag. `None` when the
/// input ends first.
fn tag_end(body: &[u8], from: usize) -> Option<usize> {
    let mut i = from;
    let mut expect_value = false;

    while let Some(&byte) = body.get(i) {
        match byte {
            b'>' => return Some(i),
            b'"' | b'\'' if expect_value => {
                let close = memchr(byte, &body[i + 1..])?;
                i += close + 2;
                expect_value = false;
            }
            b'=' => {
                expect_value = true;
                i += 1;
            }
            b if b.is_ascii_whitespace() => i += 1,
            _ => {
                expect_value = false;
                i += 1;
            }
        }
    }

    None
}

/// Start of the `</name` that ends a raw text element.
fn closing_tag(body: &[u8], from: usize, name: &[u8]) -> Option<usize> {
    let mut pos = from;
    while let Some(offset) = memchr(b'<', &body[pos..]) {
        let lt = pos + offset;
        let rest = &body[lt + 1..];
        if rest.first() == Some(&b'/')
            && starts_with_ignore_case(&rest[1..], name)
            && is_name_end(rest.get(1 + name.len()))
        {
            return Some(lt);
        }
        pos = lt + 1;
    }
    None
}

fn is_post(attrs: &[u8]) -> bool {
    attribute(attrs, b"method").is_some_and(|method| method.trim_ascii().eq_ignore_ascii_case(b"post"))
}

/// Whether the first tag in `rest` is `<input ... name="csrf_token">`.
fn starts_with_token_field(rest: &[u8]) -> bool {
    let rest = rest.trim_ascii_start();
    if !rest.starts_with(b"<") || !opens_element(rest, b"input") {
        return false;
    }
    let attrs_start = "<input".len();
    tag_end(rest, attrs_start)
        .and_then(|gt| attribute(&rest[attrs_start..gt], b"name"))
        .is_some_and(|name| name == FORM_FIELD_NAME.as_bytes())
}

/// Value of the first attribute called `name` (ASCII case-insensitive).
///
/// Attributes without a value yield an empty slice. An unterminated quoted
/// value runs to the end of the input.
fn attribute<'a>(attrs: &'a [u8], name: &[u8]) -> Option<&'a [u8]> {
    let len = attrs.len();
    let is_space = |b: u8| b.is_ascii_whitespace();
    let mut i = 0;

    while i < len {
        while i < len && (is_space(attrs[i]) || attrs[i] == b'/') {
            i += 1;
        }
        if i >= len {
            break;
        }

        // The first character always belongs to the name, even if it is '='.
        let name_start = i;
        i += 1;
        while i < len && !is_space(attrs[i]) && attrs[i] != b'=' && attrs[i] != b'/' {
            i += 1;
        }
        let attr_name = &attrs[name_start..i];

        while i < len && is_space(attrs[i]) {
            i += 1;
        }

        let value: &[u8] = if i < len && attrs[i] == b'=' {
            i += 1;
            while i < len && is_space(attrs[i]) {
                i += 1;
            }
            match attrs.get(i) {
                Some(&quote) if quote == b'"' || quote == b'\'' => {
                    let start = i + 1;
                    let end = memchr(quote, &attrs[start..]).map_or(len, |o| start + o);
                    i = (end + 1).min(len);
                    &attrs[start..end]
                }
                _ => {
                    let start = i;
                    while i < len && !is_space(attrs[i]) {
                        i += 1;
                    }
                    &attrs[start..i]
                }
            }
        } else {
            &[]
        };

        if attr_name.eq_ignore_ascii_case(name) {
            return Some(value);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::Secret;
    use crate::token::{SessionId, TokenDeriver};

    fn token() -> Token {
        TokenDeriver::new().derive(
            &SessionId::new("session-1").unwrap(),
            &Secret::new(*b"test_secret_key_32_bytes_long!!!").unwrap(),
        )
    }

    fn inject(body: &str) -> (String, InjectionReport) {
        let rewrite = FormInjector::new().rewrite(body.as_bytes(), &token());
        (
            String::from_utf8(rewrite.body.into_owned()).unwrap(),
            rewrite.report,
        )
    }

    #[test]
    fn test_post_form_injected_get_form_untouched() {
        let field = FormInjector::hidden_input(&token());
        let (out, report) = inject(r#"<form method="POST"></form><form method="GET"></form>"#);

        assert_eq!(
            out,
            format!(r#"<form method="POST">{}</form><form method="GET"></form>"#, field)
        );
        assert_eq!(report.forms_injected, 1);
    }

    #[test]
    fn test_hidden_input_markup() {
        let token = token();
        assert_eq!(
            FormInjector::hidden_input(&token),
            format!(r#"<input type="hidden" name="csrf_token" value="{}" />"#, token)
        );
    }

    #[test]
    fn test_method_variants() {
        for tag in [
            "<form method=post>",
            "<FORM METHOD='Post'>",
            "<form action=\"/x\" method = \" post \">",
            "<form\n  method=\"post\"\n  class=\"big\">",
            "<Form method=\"pOsT\"/>",
        ] {
            let (out, report) = inject(tag);
            assert_eq!(report.forms_injected, 1, "expected injection for {tag}");
            assert!(out.starts_with(tag));
        }
    }

    #[test]
    fn test_forms_not_posting_are_untouched() {
        for body in [
            "<form></form>",
            "<form action=\"/search\"></form>",
            "<form method=\"get\"></form>",
            "<form method></form>",
            "<form method=\"\"></form>",
            "<form data-method=\"post\"></form>",
            "<form method=\"postal\"></form>",
        ] {
            let rewrite = FormInjector::new().rewrite(body.as_bytes(), &token());
            assert!(matches!(rewrite.body, Cow::Borrowed(_)), "{body}");
            assert!(rewrite.report.is_unchanged());
        }
    }

    #[test]
    fn test_first_method_attribute_wins() {
        let (_, report) = inject(r#"<form method="get" method="post">"#);
        assert_eq!(report.forms_injected, 0);
        let (_, report) = inject(r#"<form method="post" method="get">"#);
        assert_eq!(report.forms_injected, 1);
    }

    #[test]
    fn test_similar_tags_ignored() {
        let body = "<formula method=post></formula><forms method=post>";
        let (out, report) = inject(body);
        assert_eq!(out, body);
        assert_eq!(report.forms_injected, 0);
    }

    #[test]
    fn test_gt_inside_quoted_attribute() {
        let field = FormInjector::hidden_input(&token());
        let (out, _) = inject(r#"<form data-x="a>b" method="post"><p>"#);
        assert_eq!(out, format!(r#"<form data-x="a>b" method="post">{}<p>"#, field));
    }

    #[test]
    fn test_form_inside_attribute_value_ignored() {
        let body = r#"<a title="<form method=post>">link</a>"#;
        let (out, report) = inject(body);
        assert_eq!(out, body);
        assert_eq!(report.forms_injected, 0);
    }

    #[test]
    fn test_comments_and_scripts_skipped() {
        let body = concat!(
            "<!-- <form method=post> -->",
            "<script>var s = '<form method=\"post\">';</script>",
            "<STYLE>/* <form method=post> */</STYLE>",
            "<form method=post></form>"
        );
        let (out, report) = inject(body);
        assert_eq!(report.forms_injected, 1);
        assert_eq!(out.matches("csrf_token").count(), 1);
        assert!(out.contains("<form method=post><input"));
    }

    #[test]
    fn test_textarea_and_title_text_skipped() {
        let body = concat!(
            "<TITLE>Edit <form method=post></title>",
            "<form method=post><textarea name=html><form method=\"post\">x</form></textarea></form>"
        );
        let (out, report) = inject(body);
        assert_eq!(report.forms_injected, 1);
        assert_eq!(out.matches("csrf_token").count(), 1);
        assert!(out.contains("<form method=post><input"));
        assert!(out.contains("<textarea name=html><form method=\"post\">x</form></textarea>"));
    }

    #[test]
    fn test_unclosed_textarea_stops_scan() {
        let body = "<textarea><form method=post>";
        let (out, report) = inject(body);
        assert_eq!(out, body);
        assert!(report.is_unchanged());
    }

    #[test]
    fn test_empty_comment_forms() {
        for comment in ["<!-->", "<!--->", "<!---->"] {
            let body = format!("{comment}<form method=post></form>");
            let (out, report) = inject(&body);
            assert_eq!(report.forms_injected, 1, "after {comment}");
            assert!(out.starts_with(&format!("{comment}<form method=post><input")));
        }

        let (_, report) = inject("<!-- --><form method=post> -->");
        assert_eq!(report.forms_injected, 1);
    }

    #[test]
    fn test_unterminated_form_tag_left_intact() {
        let field = FormInjector::hidden_input(&token());
        let body = r#"<form method="post" class="oops></form>"#;
        let (out, report) = inject(body);
        assert_eq!(out, body);
        assert_eq!(report.unparseable, 1);

        let body = "<form method=post";
        let (out, report) = inject(body);
        assert_eq!(out, body);
        assert_eq!(report.unparseable, 1);

        // Everything after the open quote belongs to the broken tag.
        let body = r#"<form method=post><p><form class="x><form method=post></p>"#;
        let (out, report) = inject(body);
        assert_eq!(report.unparseable, 1);
        assert_eq!(report.forms_injected, 1);
        assert_eq!(
            out,
            format!(r#"<form method=post>{}<p><form class="x><form method=post></p>"#, field)
        );
    }

    #[test]
    fn test_broken_tag_before_form_is_idempotent() {
        let body = r#"<form method=post a="x <form method=post>tail"#;
        let once = FormInjector::new().rewrite(body.as_bytes(), &token());
        assert_eq!(once.report.unparseable, 1);
        assert!(once.report.is_unchanged());

        let again = FormInjector::new().rewrite(&once.body, &token());
        assert_eq!(again.body.as_ref(), body.as_bytes());
    }

    #[test]
    fn test_unterminated_comment_stops_scan() {
        let body = "<form method=post><!-- <form method=post>";
        let (out, report) = inject(body);
        assert_eq!(report.forms_injected, 1);
        assert_eq!(out.matches("csrf_token").count(), 1);
    }

    #[test]
    fn test_injection_is_idempotent() {
        let body = r#"<html><form method="post">
  <input name="q"></form><form method="post"></form></html>"#;
        let once = FormInjector::new().inject(body.as_bytes(), &token()).into_owned();
        let rewrite = FormInjector::new().rewrite(&once, &token());

        assert_eq!(rewrite.report.forms_injected, 0);
        assert_eq!(rewrite.report.already_present, 2);
        assert_eq!(rewrite.body.as_ref(), once.as_slice());
    }

    #[test]
    fn test_existing_field_after_whitespace_detected() {
        let body = "<form method=post>\n    <INPUT type=hidden NAME=csrf_token value=abc></form>";
        let (out, report) = inject(body);
        assert_eq!(out, body);
        assert_eq!(report.already_present, 1);
    }

    #[test]
    fn test_other_content_byte_identical() {
        let prefix = "<!doctype html><html><head><title>Ünïcödé & <b>bold</b></title></head><body>";
        let suffix = "<p>2 < 3 && 5 > 4</p></body></html>";
        let body = format!("{prefix}<form method=post>{suffix}");
        let field = FormInjector::hidden_input(&token());

        let (out, _) = inject(&body);
        assert_eq!(out, format!("{prefix}<form method=post>{field}{suffix}"));
        assert_eq!(out.len(), body.len() + field.len());
    }

    #[test]
    fn test_non_utf8_body() {
        let mut body = vec![0xff, 0xfe, b'<'];
        body.extend_from_slice(b"form method=post>");
        body.push(0x80);
        let out = FormInjector::new().inject(&body, &token());
        assert!(out.starts_with(&[0xff, 0xfe]));
        assert!(out.ends_with(&[0x80]));
        assert_eq!(
            out.len(),
            body.len() + FormInjector::hidden_input(&token()).len()
        );
    }

    #[test]
    fn test_attribute_parser() {
        let attrs = br#" action="/a b" method='post' disabled data-x=1/"#;
        assert_eq!(attribute(attrs, b"action"), Some(&b"/a b"[..]));
        assert_eq!(attribute(attrs, b"METHOD"), Some(&b"post"[..]));
        assert_eq!(attribute(attrs, b"disabled"), Some(&b""[..]));
        assert_eq!(attribute(attrs, b"data-x"), Some(&b"1/"[..]));
        assert_eq!(attribute(attrs, b"missing"), None);
        assert_eq!(attribute(b"=odd method=post", b"method"), Some(&b"post"[..]));
    }

    #[test]
    fn test_tag_end_respects_quotes() {
        assert_eq!(tag_end(br#"<a href="x>y">"#, 2), Some(13));
        assert_eq!(tag_end(b"<img alt=don't>", 4), Some(14));
        assert_eq!(tag_end(br#"<a href="x>"#, 2), None);
    }
}
