//! Form body parsing: urlencoded and multipart text fields

use crate::Error;
use memchr::memmem;
use std::collections::HashMap;

/// Media type of urlencoded form submissions.
pub const URLENCODED: &str = "application/x-www-form-urlencoded";

/// Media type of multipart form submissions.
pub const MULTIPART: &str = "multipart/form-data";

/// Whether a Content-Type declares a multipart form body.
pub fn is_multipart(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|base| base.trim().eq_ignore_ascii_case(MULTIPART))
}

/// Parse URL-encoded form data into a HashMap
pub fn parse_form_map(body: &[u8]) -> Result<HashMap<String, String>, Error> {
    let form_data: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
        .map_err(|e| Error::BadRequest(format!("Failed to parse form data: {}", e)))?;

    Ok(form_data.into_iter().collect())
}

/// First value of a URL-encoded form field
pub fn form_value(body: &[u8], name: &str) -> Result<Option<String>, Error> {
    let form_data: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
        .map_err(|e| Error::BadRequest(format!("Failed to parse form data: {}", e)))?;

    Ok(form_data
        .into_iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value))
}

/// Multipart form data reader for text fields
pub struct MultipartParser {
    boundary: String,
}

impl MultipartParser {
    /// Create a new multipart parser from Content-Type header
    pub fn from_content_type(content_type: &str) -> Result<Self, Error> {
        // "multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxkTrZu0gW"
        let boundary = content_type
            .split(';')
            .find_map(|part| {
                let (key, value) = part.trim().split_once('=')?;
                key.trim()
                    .eq_ignore_ascii_case("boundary")
                    .then(|| value.trim().trim_matches('"').to_string())
            })
            .filter(|boundary| !boundary.is_empty())
            .ok_or_else(|| Error::BadRequest("Missing boundary in Content-Type".to_string()))?;

        Ok(Self { boundary })
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value of the first non-file part named `name`.
    ///
    /// Returns `None` if no such part exists or its value is not UTF-8.
    pub fn text_field(&self, body: &[u8], name: &str) -> Option<String> {
        let delimiter = format!("--{}", self.boundary);
        let finder = memmem::Finder::new(delimiter.as_bytes());
        let positions: Vec<usize> = finder.find_iter(body).collect();

        positions.windows(2).find_map(|pair| {
            let part = &body[pair[0] + delimiter.len()..pair[1]];
            let (field, value) = split_part(part)?;
            if field.name != name || field.is_file {
                return None;
            }
            String::from_utf8(value.to_vec()).ok()
        })
    }
}

struct PartHeaders {
    name: String,
    is_file: bool,
}

fn split_part(part: &[u8]) -> Option<(PartHeaders, &[u8])> {
    let part = strip_line_break_prefix(part);
    let (head_end, body_start) = match memmem::find(part, b"\r\n\r\n") {
        Some(pos) => (pos, pos + 4),
        None => {
            let pos = memmem::find(part, b"\n\n")?;
            (pos, pos + 2)
        }
    };

    let head = std::str::from_utf8(&part[..head_end]).ok()?;
    let headers = parse_disposition(head)?;
    Some((headers, strip_line_break_suffix(&part[body_start..])))
}

fn parse_disposition(head: &str) -> Option<PartHeaders> {
    let line = head.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case("content-disposition")
            .then_some(value)
    })?;

    let mut name = None;
    let mut is_file = false;
    for param in line.split(';').skip(1) {
        let Some((key, value)) = param.trim().split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"');
        match key.trim().to_ascii_lowercase().as_str() {
            "name" => name = Some(value.to_string()),
            "filename" => is_file = true,
            _ => {}
        }
    }

    Some(PartHeaders {
        name: name?,
        is_file,
    })
}

fn strip_line_break_prefix(bytes: &[u8]) -> &[u8] {
    bytes
        .strip_prefix(b"\r\n")
        .or_else(|| bytes.strip_prefix(b"\n"))
        .unwrap_or(bytes)
}

fn strip_line_break_suffix(bytes: &[u8]) -> &[u8] {
    bytes
        .strip_suffix(b"\r\n")
        .or_else(|| bytes.strip_suffix(b"\n"))
        .unwrap_or(bytes)
}
