//! RFC 4648 Base32 codec for secrets.

use base32::Alphabet;
use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::{OtpError, Result};
use crate::secret::Secret;

/// Number of random bytes in a generated secret (160 bits, the SHA1 block
/// output size recommended by RFC 4226).
pub const DEFAULT_SECRET_LENGTH: usize = 20;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// How [`decode_with`] treats whitespace inside the input.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Whitespace {
    /// Drop spaces, tabs and newlines, so `JBSW Y3DP` is accepted.
    #[default]
    Ignore,
    /// Treat whitespace as an invalid character.
    Reject,
}

/// Encode bytes to Base32.
///
/// With `padding`, output is filled with `=` up to a multiple of 8
/// characters.
pub fn encode(bytes: &[u8], padding: bool) -> String {
    base32::encode(Alphabet::Rfc4648 { padding }, bytes)
}

/// Decode Base32, ignoring whitespace.
pub fn decode(encoded: &str) -> Result<Vec<u8>> {
    decode_with(encoded, Whitespace::default())
}

/// Decode Base32.
///
/// Input is case-insensitive and trailing `=` padding is optional.
///
/// # Errors
///
/// Returns [`OtpError::InvalidEncoding`] on a character outside the
/// alphabet, a `=` that is not trailing, or a length no byte sequence
/// encodes to.
pub fn decode_with(encoded: &str, whitespace: Whitespace) -> Result<Vec<u8>> {
    let mut clean = String::with_capacity(encoded.len());
    for c in encoded.chars() {
        if c.is_whitespace() {
            match whitespace {
                Whitespace::Ignore => continue,
                Whitespace::Reject => return Err(OtpError::InvalidEncoding),
            }
        }
        clean.push(c.to_ascii_uppercase());
    }

    let unpadded = clean.trim_end_matches('=');
    if !unpadded.bytes().all(|b| ALPHABET.contains(&b)) {
        return Err(OtpError::InvalidEncoding);
    }

    // 1, 3 and 6 trailing characters cannot hold a whole byte.
    if matches!(unpadded.len() % 8, 1 | 3 | 6) {
        return Err(OtpError::InvalidEncoding);
    }

    base32::decode(Alphabet::Rfc4648 { padding: false }, unpadded)
        .ok_or(OtpError::InvalidEncoding)
}

/// Fill `byte_length` bytes from the operating system CSPRNG.
///
/// # Errors
///
/// Returns [`OtpError::InvalidSecret`] if `byte_length` is zero.
pub fn random_secret(byte_length: usize) -> Result<Secret> {
    if byte_length == 0 {
        return Err(OtpError::InvalidSecret);
    }

    let mut bytes = vec![0u8; byte_length];
    OsRng.try_fill_bytes(&mut bytes)?;
    Secret::from_bytes(bytes)
}
