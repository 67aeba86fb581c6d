//! Shared key material.

use zeroize::Zeroizing;

use crate::base32::{self, Whitespace};
use crate::error::{OtpError, Result};

/// Secret shared between the issuer and the authenticator.
///
/// Bytes are wiped on drop and never shown by [`Debug`].
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Zeroizing<Vec<u8>>);

impl Secret {
    /// Create a secret from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::InvalidSecret`] if `bytes` is empty.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(OtpError::InvalidSecret);
        }

        Ok(Self(Zeroizing::new(bytes)))
    }

    /// Decode a user supplied Base32 secret.
    ///
    /// Case, padding and embedded whitespace are tolerated.
    pub fn from_base32(encoded: &str) -> Result<Self> {
        let bytes = base32::decode_with(encoded, Whitespace::Ignore)?;
        Self::from_bytes(bytes)
    }

    /// Generate `length` random bytes.
    pub fn generate(length: usize) -> Result<Self> {
        base32::random_secret(length)
    }

    /// Unpadded Base32 form, as used in URIs.
    pub fn to_base32(&self) -> String {
        base32::encode(&self.0, false)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`, kept for API symmetry with [`len`](Self::len).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for Secret {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
