use crate::secret::Secret;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::time::Duration;
use subtle::{Choice, ConstantTimeEq};

type HmacSha256 = Hmac<Sha256>;

/// Length of an encoded token: base64url (no padding) of a SHA-256 MAC.
pub const TOKEN_LEN: usize = 43;

/// Non-empty session identifier handed over by the session subsystem.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Returns `None` for an empty identifier: no session, nothing to bind.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        (!id.is_empty()).then_some(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Session ids are bearer credentials.
        f.write_str("SessionId(..)")
    }
}

/// Token bound to a session.
///
/// Only contains `[A-Za-z0-9_-]`, so it embeds in HTML attributes and
/// urlencoded bodies as-is.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against a submitted value without an early exit on the
    /// first differing byte.
    pub fn ct_matches(&self, submitted: &str) -> Choice {
        self.0.as_bytes().ct_eq(submitted.as_bytes())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(..)")
    }
}

/// Derives session tokens from a session id and the server secret.
///
/// Without a TTL the token is a pure function of `(session, secret)` and
/// stays valid for the whole session. With a TTL, the index of the current
/// time window is mixed in; [`accepted_at`](Self::accepted_at) yields the
/// current and the previous window's token, so an issued token lives at
/// least one and at most two windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenDeriver {
    window_secs: Option<u64>,
}

impl TokenDeriver {
    /// Deriver without expiry
    pub fn new() -> Self {
        Self::default()
    }

    /// Deriver with time-boxed tokens. Windows shorter than a second are
    /// rounded up to one second.
    pub fn windowed(ttl: Duration) -> Self {
        Self {
            window_secs: Some(ttl.as_secs().max(1)),
        }
    }

    pub fn window(&self) -> Option<Duration> {
        self.window_secs.map(Duration::from_secs)
    }

    /// Token for this session at the current time
    pub fn derive(&self, session: &SessionId, secret: &Secret) -> Token {
        self.derive_at(session, secret, Utc::now())
    }

    /// Token for this session at `now`
    pub fn derive_at(&self, session: &SessionId, secret: &Secret, now: DateTime<Utc>) -> Token {
        Self::sign(session, secret, self.window_index(now))
    }

    /// Every token a submission may carry at `now`: the current one first,
    /// then the previous window's token when windowed.
    pub fn accepted_at(&self, session: &SessionId, secret: &Secret, now: DateTime<Utc>) -> Vec<Token> {
        match self.window_index(now) {
            None => vec![Self::sign(session, secret, None)],
            Some(window) => {
                let mut tokens = vec![Self::sign(session, secret, Some(window))];
                if let Some(previous) = window.checked_sub(1) {
                    tokens.push(Self::sign(session, secret, Some(previous)));
                }
                tokens
            }
        }
    }

    fn window_index(&self, now: DateTime<Utc>) -> Option<u64> {
        self.window_secs
            .map(|secs| (now.timestamp().max(0) as u64) / secs)
    }

    /// HMAC-SHA256 over the session id, plus the window index if any
    fn sign(session: &SessionId, secret: &Secret, window: Option<u64>) -> Token {
        let mut mac = HmacSha256::new_from_slice(secret.expose())
            .expect("HMAC can take key of any size");
        mac.update(session.as_str().as_bytes());
        if let Some(window) = window {
            mac.update(&[0]);
            mac.update(&window.to_be_bytes());
        }
        Token(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }
}
