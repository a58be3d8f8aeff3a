//! Server secret and its atomically swappable snapshot.

use crate::error::{CsrfError, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use parking_lot::RwLock;
use rand::RngCore;
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Minimum secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Prefix marking base64-encoded key material in configuration values.
pub const BASE64_PREFIX: &str = "base64:";

/// Key material that tokens are derived with.
///
/// Zeroized on drop. `Debug` never prints the bytes.
#[derive(Clone)]
pub struct Secret(Zeroizing<Vec<u8>>);

impl Secret {
    /// Wrap raw key bytes; at least [`MIN_SECRET_LEN`] bytes are required.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = Zeroizing::new(bytes.into());
        if bytes.len() < MIN_SECRET_LEN {
            return Err(CsrfError::InvalidSecret(format!(
                "Secret key must be at least {} bytes, got {}",
                MIN_SECRET_LEN,
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }

    /// Generate a random secret
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new(vec![0u8; MIN_SECRET_LEN]);
        rand::thread_rng().fill_bytes(bytes.as_mut_slice());
        Self(bytes)
    }

    /// Parse a configured secret.
    ///
    /// `base64:<data>` is decoded; any other value is used as raw UTF-8 bytes.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.strip_prefix(BASE64_PREFIX) {
            Some(encoded) => Self::new(STANDARD.decode(encoded.trim())?),
            None => Self::new(raw.as_bytes()),
        }
    }

    pub(crate) fn expose(&self) -> &[u8] {
        &self.0
    }

    pub(crate) fn into_bytes(self) -> Zeroizing<Vec<u8>> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

/// Shared handle to the current secret.
///
/// Readers take an `Arc` snapshot and keep using it for the rest of the
/// request; [`rotate`](Self::rotate) swaps the pointer without disturbing
/// snapshots already handed out. Clones share the same slot.
#[derive(Clone)]
pub struct SecretStore {
    current: Arc<RwLock<Arc<Secret>>>,
}

impl SecretStore {
    pub fn new(secret: Secret) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(secret))),
        }
    }

    /// Current secret snapshot
    #[inline]
    pub fn load(&self) -> Arc<Secret> {
        self.current.read().clone()
    }

    /// Publish a new secret and return the one it replaced.
    ///
    /// Tokens derived with the previous secret stop validating.
    pub fn rotate(&self, secret: Secret) -> Arc<Secret> {
        std::mem::replace(&mut *self.current.write(), Arc::new(secret))
    }
}

impl fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretStore").finish_non_exhaustive()
    }
}
