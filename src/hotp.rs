//! HMAC-based one-time passwords (RFC 4226).

use crate::algorithm::Algorithm;
use crate::error::{OtpError, Result};

/// Smallest accepted code length.
pub const MIN_DIGITS: u32 = 1;
/// Largest code length a 31-bit truncated value can fill.
pub const MAX_DIGITS: u32 = 10;
/// Code length used when none is given.
pub const DEFAULT_DIGITS: u32 = 6;
/// Largest look-around accepted by [`delta`], in counters on each side.
pub const MAX_WINDOW: u64 = 100;

/// Generate the code for `counter`.
///
/// # Errors
///
/// Returns [`OtpError::InvalidDigits`] if `digits` is outside 1..=10 and
/// [`OtpError::InvalidSecret`] if `secret` is empty.
pub fn generate(
    secret: impl AsRef<[u8]>,
    counter: u64,
    algorithm: Algorithm,
    digits: u32,
) -> Result<String> {
    check_digits(digits)?;
    let secret = secret.as_ref();
    if secret.is_empty() {
        return Err(OtpError::InvalidSecret);
    }

    let digest = algorithm.hmac(secret, &counter.to_be_bytes())?;
    let code = truncate(&digest) % 10u64.pow(digits);

    Ok(format!("{:0>width$}", code, width = digits as usize))
}

/// Check `candidate` against the counters `counter - window ..= counter +
/// window`.
///
/// Returns the offset of the matching counter, nearest first. Counters
/// outside the `u64` range are skipped.
///
/// # Errors
///
/// Returns [`OtpError::InvalidWindow`] if `window` exceeds [`MAX_WINDOW`].
pub fn delta(
    candidate: &str,
    secret: impl AsRef<[u8]>,
    counter: u64,
    algorithm: Algorithm,
    digits: u32,
    window: u64,
) -> Result<Option<i64>> {
    if window > MAX_WINDOW {
        return Err(OtpError::InvalidWindow(window));
    }
    let secret = secret.as_ref();

    for distance in 0..=window as i64 {
        let offsets = if distance == 0 {
            [Some(0), None]
        } else {
            [Some(-distance), Some(distance)]
        };
        let counters = offsets.map(|offset| {
            offset.and_then(|offset| {
                counter
                    .checked_add_signed(offset)
                    .map(|shifted| (offset, shifted))
            })
        });

        if counters.iter().all(Option::is_none) {
            break;
        }

        for (offset, candidate_counter) in counters.into_iter().flatten() {
            let expected =
                generate(secret, candidate_counter, algorithm, digits)?;
            if constant_time_eq::constant_time_eq(
                expected.as_bytes(),
                candidate.as_bytes(),
            ) {
                return Ok(Some(offset));
            }
        }
    }

    Ok(None)
}

/// Whether `candidate` matches a counter within `window` of `counter`.
pub fn validate(
    candidate: &str,
    secret: impl AsRef<[u8]>,
    counter: u64,
    algorithm: Algorithm,
    digits: u32,
    window: u64,
) -> Result<bool> {
    Ok(delta(candidate, secret, counter, algorithm, digits, window)?.is_some())
}

pub(crate) fn check_digits(digits: u32) -> Result<()> {
    if (MIN_DIGITS..=MAX_DIGITS).contains(&digits) {
        Ok(())
    } else {
        Err(OtpError::InvalidDigits(digits))
    }
}

/// Dynamic truncation.
fn truncate(digest: &[u8]) -> u64 {
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary_code = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);

    binary_code as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"12345678901234567890";

    #[test]
    fn test_rfc4226_vectors() {
        let expected = [
            "755224", "287082", "359152", "969429", "338314", "254676",
            "287922", "162583", "399871", "520489",
        ];

        for (counter, code) in expected.iter().enumerate() {
            assert_eq!(
                generate(SECRET, counter as u64, Algorithm::Sha1, 6).unwrap(),
                *code
            );
        }
    }

    #[test]
    fn test_rfc4226_truncation_example() {
        // Section 5.4 worked example.
        let digest = [
            0x1f, 0x86, 0x98, 0x69, 0x0e, 0x02, 0xca, 0x16, 0x61, 0x85, 0x50,
            0xef, 0x7f, 0x19, 0xda, 0x8e, 0x94, 0x5b, 0x55, 0x5a,
        ];
        assert_eq!(truncate(&digest), 0x50ef7f19);
        assert_eq!(truncate(&digest) % 1_000_000, 872921);
    }

    #[test]
    fn test_code_shape() {
        for algorithm in Algorithm::ALL {
            for digits in MIN_DIGITS..=MAX_DIGITS {
                for counter in [0, 1, 42, u32::MAX as u64, u64::MAX] {
                    let code =
                        generate(SECRET, counter, algorithm, digits).unwrap();
                    assert_eq!(code.len(), digits as usize);
                    assert!(code.chars().all(|c| c.is_ascii_digit()));
                }
            }
        }
    }

    #[test]
    fn test_idempotent() {
        let first = generate(SECRET, 7, Algorithm::Sha512, 8).unwrap();
        let second = generate(SECRET, 7, Algorithm::Sha512, 8).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ten_digits_is_not_truncated() {
        // 31-bit values are always below 10^10.
        let code = generate(SECRET, 0, Algorithm::Sha1, 10).unwrap();
        assert_eq!(code, "1284755224");
    }

    #[test]
    fn test_invalid_digits() {
        assert!(matches!(
            generate(SECRET, 0, Algorithm::Sha1, 0),
            Err(OtpError::InvalidDigits(0))
        ));
        assert!(matches!(
            generate(SECRET, 0, Algorithm::Sha1, 11),
            Err(OtpError::InvalidDigits(11))
        ));
    }

    #[test]
    fn test_empty_secret() {
        assert!(matches!(
            generate(b"", 0, Algorithm::Sha1, 6),
            Err(OtpError::InvalidSecret)
        ));
    }

    #[test]
    fn test_delta_nearest_first() {
        let code = generate(SECRET, 5, Algorithm::Sha1, 6).unwrap();

        let at = |counter, window| {
            delta(&code, SECRET, counter, Algorithm::Sha1, 6, window).unwrap()
        };

        assert_eq!(at(5, 0), Some(0));
        assert_eq!(at(4, 2), Some(1));
        assert_eq!(at(7, 2), Some(-2));
        assert_eq!(at(8, 2), None);
        assert!(!validate("000000", SECRET, 5, Algorithm::Sha1, 6, 0).unwrap());
    }

    #[test]
    fn test_delta_at_range_edges() {
        let at = |code: u64, counter, window| {
            let code = generate(SECRET, code, Algorithm::Sha1, 10).unwrap();
            delta(&code, SECRET, counter, Algorithm::Sha1, 10, window).unwrap()
        };

        assert_eq!(at(0, 0, 3), Some(0));
        assert_eq!(at(u64::MAX, u64::MAX - 1, 1), Some(1));
        assert_eq!(
            at(u64::MAX - MAX_WINDOW, u64::MAX, MAX_WINDOW),
            Some(-(MAX_WINDOW as i64))
        );
        assert_eq!(at(MAX_WINDOW, 0, MAX_WINDOW), Some(MAX_WINDOW as i64));
    }

    #[test]
    fn test_delta_rejects_large_window() {
        let code = generate(SECRET, 0, Algorithm::Sha1, 6).unwrap();

        for window in [MAX_WINDOW + 1, u64::MAX] {
            assert!(matches!(
                delta(&code, SECRET, 0, Algorithm::Sha1, 6, window),
                Err(OtpError::InvalidWindow(w)) if w == window
            ));
        }
        assert!(matches!(
            validate(&code, SECRET, 0, Algorithm::Sha1, 6, u64::MAX),
            Err(OtpError::InvalidWindow(_))
        ));
    }
}
