//! Configuration manager for otpgen.
//!
//! Holds the defaults applied to form fields the user left out.

use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::algorithm::Algorithm;
use crate::base32::DEFAULT_SECRET_LENGTH;
use crate::error::Result;
use crate::{hotp, totp};

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_ISSUER: &str = "ACME";
const DEFAULT_LABEL: &str = "Alice";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    /// Provider shown when the form has no issuer.
    #[validate(length(min = 1, message = "Issuer must not be empty."))]
    pub issuer: String,
    /// Account shown when the form has no label.
    #[validate(length(min = 1, message = "Label must not be empty."))]
    pub label: String,
    /// HMAC algorithm.
    pub algorithm: Algorithm,
    /// Number of digits for the code.
    #[validate(range(
        min = 1,
        max = 10,
        message = "Digits must be between 1 and 10."
    ))]
    pub digits: u32,
    /// Window for code usage, in seconds.
    #[validate(range(min = 1, message = "Period must be greater than 0."))]
    pub period: u64,
    /// Bytes of randomness in generated secrets.
    #[validate(range(
        min = 1,
        message = "Secret length must be greater than 0."
    ))]
    pub secret_length: usize,
    /// Steps accepted on each side when verifying a code.
    #[validate(range(max = 100, message = "Window must be at most 100."))]
    pub window: u64,
    #[serde(skip)]
    path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.into(),
            label: DEFAULT_LABEL.into(),
            algorithm: Algorithm::default(),
            digits: hotp::DEFAULT_DIGITS,
            period: totp::DEFAULT_PERIOD,
            secret_length: DEFAULT_SECRET_LENGTH,
            window: totp::DEFAULT_WINDOW,
            path: PathBuf::new(),
        }
    }
}

impl Settings {
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    ///
    /// A missing or unreadable file falls back to the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::Validation`](crate::error::OtpError::Validation)
    /// when the file holds values the engine would reject.
    pub fn read(self) -> Result<Arc<Self>> {
        let file_path = if self.path.is_file() {
            self.path.clone()
        } else {
            Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        let settings = match File::open(&file_path) {
            Ok(file) => match serde_yaml::from_reader::<_, Settings>(file) {
                Ok(settings) => {
                    tracing::debug!(
                        path = %file_path.display(),
                        "settings loaded"
                    );
                    settings
                },
                Err(err) => self.error(err),
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(
                    path = %file_path.display(),
                    "no settings file, using defaults"
                );
                Self::default()
            },
            Err(err) => self.error(err),
        };

        settings.validate()?;

        Ok(Arc::new(Settings {
            path: file_path,
            ..settings
        }))
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(
            error = %err,
            path = %self.path.display(),
            "settings file unusable, using defaults"
        );
        Self::default()
    }
}
