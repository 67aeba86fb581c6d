//! Strongly typed OTP credential.

use std::fmt;
use std::str::FromStr;

use crate::algorithm::Algorithm;
use crate::error::{OtpError, Result};
use crate::secret::Secret;
use crate::{hotp, totp, uri};

/// Which counter drives the codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Counter derived from the clock, every `period` seconds.
    Totp { period: u64 },
    /// Explicit, caller-managed counter.
    Hotp { counter: u64 },
}

impl Kind {
    /// Name used as the URI host.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Totp { .. } => "totp",
            Self::Hotp { .. } => "hotp",
        }
    }
}

impl Default for Kind {
    fn default() -> Self {
        Self::Totp {
            period: totp::DEFAULT_PERIOD,
        }
    }
}

/// A complete, validated credential.
///
/// Built with [`Configuration::builder`], parsed from an `otpauth://` URI
/// with [`FromStr`], and written back as one with [`Display`](fmt::Display).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    issuer: String,
    label: String,
    secret: Secret,
    algorithm: Algorithm,
    digits: u32,
    kind: Kind,
}

impl Configuration {
    /// Create a new [`ConfigurationBuilder`].
    pub fn builder() -> ConfigurationBuilder<Missing> {
        ConfigurationBuilder::new()
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// TOTP period, `None` for HOTP.
    pub fn period(&self) -> Option<u64> {
        match self.kind {
            Kind::Totp { period } => Some(period),
            Kind::Hotp { .. } => None,
        }
    }

    /// HOTP counter, `None` for TOTP.
    pub fn counter(&self) -> Option<u64> {
        match self.kind {
            Kind::Hotp { counter } => Some(counter),
            Kind::Totp { .. } => None,
        }
    }

    /// Generate the current code. `time` is ignored for HOTP.
    pub fn generate(&self, time: u64) -> Result<String> {
        match self.kind {
            Kind::Totp { period } => totp::generate(
                &self.secret,
                time,
                period,
                self.algorithm,
                self.digits,
            ),
            Kind::Hotp { counter } => hotp::generate(
                &self.secret,
                counter,
                self.algorithm,
                self.digits,
            ),
        }
    }

    /// Seconds left before the TOTP code rolls over, `None` for HOTP.
    pub fn remaining_seconds(&self, time: u64) -> Option<u64> {
        self.period()
            .and_then(|period| totp::remaining_seconds(time, period).ok())
    }

    /// Offset of the step or counter `candidate` matches, within `window`.
    pub fn delta(
        &self,
        candidate: &str,
        time: u64,
        window: u64,
    ) -> Result<Option<i64>> {
        match self.kind {
            Kind::Totp { period } => totp::delta(
                candidate,
                &self.secret,
                time,
                period,
                self.algorithm,
                self.digits,
                window,
            ),
            Kind::Hotp { counter } => hotp::delta(
                candidate,
                &self.secret,
                counter,
                self.algorithm,
                self.digits,
                window,
            ),
        }
    }

    /// Whether `candidate` is accepted within `window`.
    pub fn validate(
        &self,
        candidate: &str,
        time: u64,
        window: u64,
    ) -> Result<bool> {
        Ok(self.delta(candidate, time, window)?.is_some())
    }

    /// Provisioning URI for authenticator apps.
    pub fn to_uri(&self) -> String {
        uri::encode(self)
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&uri::encode(self))
    }
}

impl FromStr for Configuration {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self> {
        uri::decode(s)
    }
}

/// Value is missing on [`ConfigurationBuilder`].
#[derive(Debug, Clone)]
pub struct Missing;

/// Value is present on [`ConfigurationBuilder`].
#[derive(Debug, Clone)]
pub struct Present<T>(pub T);

/// [`Configuration`] builder. A secret is required before building.
#[derive(Debug, Clone)]
pub struct ConfigurationBuilder<S> {
    issuer: String,
    label: String,
    secret: S,
    algorithm: Algorithm,
    digits: u32,
    kind: Kind,
}

impl ConfigurationBuilder<Missing> {
    /// Create a new [`ConfigurationBuilder`] with default parameters.
    pub fn new() -> Self {
        Self {
            issuer: String::default(),
            label: String::default(),
            secret: Missing,
            algorithm: Algorithm::default(),
            digits: hotp::DEFAULT_DIGITS,
            kind: Kind::default(),
        }
    }

    /// Update `secret` field on [`ConfigurationBuilder`].
    pub fn secret(
        self,
        secret: Secret,
    ) -> ConfigurationBuilder<Present<Secret>> {
        ConfigurationBuilder {
            issuer: self.issuer,
            label: self.label,
            secret: Present(secret),
            algorithm: self.algorithm,
            digits: self.digits,
            kind: self.kind,
        }
    }
}

impl Default for ConfigurationBuilder<Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ConfigurationBuilder<S> {
    /// Update `issuer` field on [`ConfigurationBuilder`].
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Update `label` field on [`ConfigurationBuilder`].
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Update `algorithm` field on [`ConfigurationBuilder`].
    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Update `digits` field on [`ConfigurationBuilder`].
    pub fn digits(mut self, digits: u32) -> Self {
        self.digits = digits;
        self
    }

    /// Switch to TOTP with the given period.
    pub fn totp(mut self, period: u64) -> Self {
        self.kind = Kind::Totp { period };
        self
    }

    /// Switch to HOTP starting at `counter`.
    pub fn hotp(mut self, counter: u64) -> Self {
        self.kind = Kind::Hotp { counter };
        self
    }
}

impl ConfigurationBuilder<Present<Secret>> {
    /// Build a [`Configuration`].
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::InvalidDigits`] or [`OtpError::InvalidPeriod`]
    /// when a parameter is outside what the engine accepts.
    pub fn build(self) -> Result<Configuration> {
        hotp::check_digits(self.digits)?;
        if let Kind::Totp { period: 0 } = self.kind {
            return Err(OtpError::InvalidPeriod(0));
        }

        Ok(Configuration {
            issuer: self.issuer,
            label: self.label,
            secret: self.secret.0,
            algorithm: self.algorithm,
            digits: self.digits,
            kind: self.kind,
        })
    }
}
