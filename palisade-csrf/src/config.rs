use crate::error::{CsrfError, Result};
use crate::gate::{ContentGate, DEFAULT_CONTENT_TYPES};
use crate::secret::Secret;
use crate::token::TokenDeriver;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use zeroize::Zeroizing;

/// Environment variable holding the secret (raw or `base64:`-prefixed)
pub const ENV_SECRET: &str = "PALISADE_CSRF_SECRET";
/// Environment variable holding the token TTL in seconds
pub const ENV_TOKEN_TTL: &str = "PALISADE_CSRF_TOKEN_TTL";
/// Environment variable naming the token header; empty disables it
pub const ENV_HEADER: &str = "PALISADE_CSRF_HEADER";
/// Environment variable listing exempt path prefixes, comma separated
pub const ENV_EXEMPT_PATHS: &str = "PALISADE_CSRF_EXEMPT_PATHS";

/// Default header a token may be submitted in
pub const DEFAULT_HEADER_NAME: &str = "X-CSRF-Token";

/// CSRF protection configuration
#[derive(Debug, Clone)]
pub struct CsrfConfig {
    /// Secret key for token signing (at least 32 bytes)
    pub secret: Secret,

    /// Token validity window; `None` keeps tokens valid for the whole session
    pub token_ttl: Option<Duration>,

    /// Header checked before the form body; `None` reads the body only
    pub header_name: Option<String>,

    /// Response content types that get tokens injected
    pub content_types: Vec<String>,

    /// Paths to exclude from CSRF protection
    pub exempt_paths: Vec<String>,
}

impl CsrfConfig {
    /// Create a new CSRF configuration
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self> {
        Ok(Self::from_secret(Secret::new(secret)?))
    }

    pub fn from_secret(secret: Secret) -> Self {
        Self {
            secret,
            token_ttl: None,
            header_name: Some(DEFAULT_HEADER_NAME.to_string()),
            content_types: DEFAULT_CONTENT_TYPES.iter().map(|t| t.to_string()).collect(),
            exempt_paths: Vec::new(),
        }
    }

    /// Generate a secret key, wiped from memory when dropped
    pub fn generate_secret() -> Zeroizing<Vec<u8>> {
        Secret::generate().into_bytes()
    }

    /// Time-box tokens to windows of this length
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = Some(ttl);
        self
    }

    /// Set header name
    pub fn with_header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = Some(name.into());
        self
    }

    /// Only read tokens from the form body
    pub fn without_header(mut self) -> Self {
        self.header_name = None;
        self
    }

    /// Replace the content types eligible for injection
    pub fn with_content_types(mut self, types: Vec<String>) -> Self {
        self.content_types = types;
        self
    }

    /// Add excluded paths
    pub fn with_exempt_paths(mut self, paths: Vec<String>) -> Self {
        self.exempt_paths = paths;
        self
    }

    /// Token deriver matching this configuration
    pub fn deriver(&self) -> TokenDeriver {
        match self.token_ttl {
            Some(ttl) => TokenDeriver::windowed(ttl),
            None => TokenDeriver::new(),
        }
    }

    pub fn gate(&self) -> ContentGate {
        ContentGate::with_types(&self.content_types)
    }

    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup using the `PALISADE_CSRF_*` names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(ENV_SECRET)
            .ok_or_else(|| CsrfError::Config(format!("{} is not set", ENV_SECRET)))?;
        let mut config = Self::from_secret(Secret::parse(&secret)?);

        if let Some(ttl) = lookup(ENV_TOKEN_TTL) {
            config.token_ttl = Some(parse_ttl(&ttl)?);
        }

        if let Some(header) = lookup(ENV_HEADER) {
            let header = header.trim();
            config.header_name = (!header.is_empty()).then(|| header.to_string());
        }

        if let Some(paths) = lookup(ENV_EXEMPT_PATHS) {
            config.exempt_paths = paths
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(config)
    }

    /// Load from a `.toml` or `.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| CsrfError::Config("No file extension found".to_string()))?;

        let settings: CsrfSettings = match ext.as_str() {
            "toml" => toml::from_str(&content)
                .map_err(|e| CsrfError::Config(format!("TOML parse error: {}", e)))?,
            "json" => serde_json::from_str(&content)
                .map_err(|e| CsrfError::Config(format!("JSON parse error: {}", e)))?,
            other => {
                return Err(CsrfError::Config(format!("Unsupported format: {}", other)));
            }
        };

        settings.into_config()
    }
}

impl Default for CsrfConfig {
    /// Configuration with a freshly generated secret. Tokens do not survive
    /// a restart.
    fn default() -> Self {
        Self::from_secret(Secret::generate())
    }
}

fn parse_ttl(raw: &str) -> Result<Duration> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| CsrfError::Config(format!("Invalid token TTL: {:?}", raw)))?;
    if secs == 0 {
        return Err(CsrfError::Config("Token TTL must be positive".to_string()));
    }
    Ok(Duration::from_secs(secs))
}

/// File representation of [`CsrfConfig`].
///
/// ```toml
/// secret = "base64:..."
/// token_ttl_secs = 3600
/// header_name = "X-CSRF-Token"
/// exempt_paths = ["/webhooks/"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CsrfSettings {
    pub secret: String,
    pub token_ttl_secs: Option<u64>,
    /// Absent keeps the default header; an empty string disables it
    pub header_name: Option<String>,
    pub content_types: Option<Vec<String>>,
    pub exempt_paths: Vec<String>,
}

impl CsrfSettings {
    pub fn into_config(self) -> Result<CsrfConfig> {
        let mut config = CsrfConfig::from_secret(Secret::parse(&self.secret)?);

        if let Some(secs) = self.token_ttl_secs {
            config.token_ttl = Some(parse_ttl(&secs.to_string())?);
        }
        if let Some(header) = self.header_name {
            config.header_name = (!header.trim().is_empty()).then(|| header.trim().to_string());
        }
        if let Some(types) = self.content_types {
            config.content_types = types;
        }
        config.exempt_paths = self.exempt_paths;

        Ok(config)
    }
}
