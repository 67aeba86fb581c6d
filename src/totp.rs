//! Time-based one-time passwords (RFC 6238).
//!
//! Every function takes the Unix time in seconds from the caller, so results
//! only depend on their arguments.

use crate::algorithm::Algorithm;
use crate::error::{OtpError, Result};
use crate::hotp;

/// Seconds a code stays valid when no period is given.
pub const DEFAULT_PERIOD: u64 = 30;
/// Counters accepted on each side of the current one.
pub const DEFAULT_WINDOW: u64 = 1;

/// Counter for `time`, i.e. `floor(time / period)`.
///
/// # Errors
///
/// Returns [`OtpError::InvalidPeriod`] if `period` is 0.
pub fn counter_from_time(time: u64, period: u64) -> Result<u64> {
    if period == 0 {
        return Err(OtpError::InvalidPeriod(period));
    }

    Ok(time / period)
}

/// Generate the code valid at `time`.
pub fn generate(
    secret: impl AsRef<[u8]>,
    time: u64,
    period: u64,
    algorithm: Algorithm,
    digits: u32,
) -> Result<String> {
    let counter = counter_from_time(time, period)?;
    hotp::generate(secret, counter, algorithm, digits)
}

/// Seconds until the code valid at `time` expires.
pub fn remaining_seconds(time: u64, period: u64) -> Result<u64> {
    if period == 0 {
        return Err(OtpError::InvalidPeriod(period));
    }

    Ok(period - time % period)
}

/// Offset, in periods, between `time` and the step `candidate` was
/// generated for, if it lies within `window` steps.
pub fn delta(
    candidate: &str,
    secret: impl AsRef<[u8]>,
    time: u64,
    period: u64,
    algorithm: Algorithm,
    digits: u32,
    window: u64,
) -> Result<Option<i64>> {
    let counter = counter_from_time(time, period)?;
    hotp::delta(candidate, secret, counter, algorithm, digits, window)
}

/// Accept `candidate` if it matches any step in `[counter - window, counter
/// + window]` around `time`, to tolerate clock skew.
pub fn validate(
    candidate: &str,
    secret: impl AsRef<[u8]>,
    time: u64,
    period: u64,
    algorithm: Algorithm,
    digits: u32,
    window: u64,
) -> Result<bool> {
    Ok(delta(candidate, secret, time, period, algorithm, digits, window)?
        .is_some())
}
