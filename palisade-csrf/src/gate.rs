/// Media types forms can be rendered into.
pub const DEFAULT_CONTENT_TYPES: &[&str] = &[
    "text/html",
    "application/xhtml+xml",
    "application/xml+xhtml",
];

/// Decides whether a response body may be rewritten, based on its declared
/// content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentGate {
    allowed: Vec<String>,
}

impl ContentGate {
    pub fn new() -> Self {
        Self::with_types(DEFAULT_CONTENT_TYPES.iter().copied())
    }

    /// Gate over a custom allow-set of base media types
    pub fn with_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: types
                .into_iter()
                .map(|t| t.as_ref().trim().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Whether bodies of this content type are rewritten.
    ///
    /// Parameters such as `charset` are ignored.
    pub fn applies(&self, content_type: &str) -> bool {
        let base = content_type.split(';').next().unwrap_or_default().trim();
        self.allowed
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(base))
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }
}

impl Default for ContentGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_family_applies() {
        let gate = ContentGate::new();
        assert!(gate.applies("text/html"));
        assert!(gate.applies("text/html; charset=utf-8"));
        assert!(gate.applies("TEXT/HTML"));
        assert!(gate.applies("application/xml+xhtml"));
        assert!(gate.applies("application/xhtml+xml"));
    }

    #[test]
    fn test_other_types_rejected() {
        let gate = ContentGate::new();
        assert!(!gate.applies("application/json"));
        assert!(!gate.applies("image/png"));
        assert!(!gate.applies("text/plain"));
        assert!(!gate.applies("application/octet-stream"));
        assert!(!gate.applies(""));
    }

    #[test]
    fn test_custom_types() {
        let gate = ContentGate::with_types(["Text/Vnd.Custom-Html "]);
        assert!(gate.applies("text/vnd.custom-html; charset=utf-8"));
        assert!(!gate.applies("text/html"));
        assert_eq!(gate.allowed(), &["text/vnd.custom-html".to_string()]);
    }
}
