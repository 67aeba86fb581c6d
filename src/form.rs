//! Raw form input and its validation into a [`Configuration`].
//!
//! Fields arrive as optional strings, the way a web form or a query string
//! carries them. Validation reports every invalid field at once so each one
//! can be highlighted.

use std::borrow::Cow;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use validator::{ValidationError, ValidationErrors};

use crate::algorithm::Algorithm;
use crate::config::Settings;
use crate::credential::{Configuration, Kind};
use crate::error::Result;
use crate::{hotp, uri};
use crate::secret::Secret;

/// Unvalidated credential parameters.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    pub issuer: Option<String>,
    pub label: Option<String>,
    pub secret: Option<String>,
    pub digits: Option<String>,
    pub period: Option<String>,
    #[serde(alias = "hashing_algorithm")]
    pub algorithm: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub counter: Option<String>,
}

impl Form {
    /// Parse `application/x-www-form-urlencoded` text such as
    /// `issuer=ACME&digits=8`. A leading `?` is allowed.
    ///
    /// The first occurrence of a key wins and unknown keys are ignored.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut form = Self::default();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                "issuer" => &mut form.issuer,
                "label" => &mut form.label,
                "secret" => &mut form.secret,
                "digits" => &mut form.digits,
                "period" => &mut form.period,
                "algorithm" | "hashing_algorithm" => &mut form.algorithm,
                "type" => &mut form.kind,
                "counter" => &mut form.counter,
                _ => continue,
            };

            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }

        form
    }

    /// Write the form back as a query string, skipping absent fields.
    pub fn to_query(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        let fields = [
            ("issuer", &self.issuer),
            ("label", &self.label),
            ("secret", &self.secret),
            ("digits", &self.digits),
            ("period", &self.period),
            ("hashing_algorithm", &self.algorithm),
            ("type", &self.kind),
            ("counter", &self.counter),
        ];

        for (key, value) in fields {
            if let Some(value) = value {
                serializer.append_pair(key, value);
            }
        }

        serializer.finish()
    }

    /// Validate every field and build a [`Configuration`].
    ///
    /// Absent fields take their value from `settings`; empty numeric and
    /// algorithm fields count as absent. An absent or empty secret is
    /// replaced by a random one. Issuer and label, when given, must not be
    /// blank.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::Validation`](crate::error::OtpError::Validation)
    /// listing every invalid field.
    pub fn validate(&self, settings: &Settings) -> Result<Configuration> {
        let mut errors = ValidationErrors::new();

        let issuer =
            required(&mut errors, "issuer", &self.issuer, &settings.issuer);
        let label =
            required(&mut errors, "label", &self.label, &settings.label);

        let secret = match present(&self.secret) {
            Some(encoded) => Secret::from_base32(encoded)
                .map_err(|_| {
                    errors.add(
                        "secret",
                        invalid(
                            "invalid_base32",
                            "Secret must be Base32 (A-Z, 2-7).".into(),
                        ),
                    )
                })
                .ok(),
            None => Some(Secret::generate(settings.secret_length)?),
        };

        let digits = number::<u32>(
            &mut errors,
            "digits",
            &self.digits,
            settings.digits,
        )
        .filter(|digits| {
            let valid = (hotp::MIN_DIGITS..=hotp::MAX_DIGITS).contains(digits);
            if !valid {
                errors.add(
                    "digits",
                    invalid(
                        "out_of_range",
                        "Digits must be between 1 and 10.".into(),
                    ),
                );
            }
            valid
        });

        let algorithm = match present(&self.algorithm) {
            Some(name) => Algorithm::from_str(name)
                .map_err(|_| {
                    errors.add(
                        "algorithm",
                        invalid(
                            "unsupported_algorithm",
                            format!(
                                "Algorithm must be one of {}.",
                                published_names()
                            )
                            .into(),
                        ),
                    )
                })
                .ok(),
            None => Some(settings.algorithm),
        };

        let kind = match present(&self.kind) {
            None | Some("totp") => number::<u64>(
                &mut errors,
                "period",
                &self.period,
                settings.period,
            )
            .filter(|period| {
                if *period == 0 {
                    errors.add(
                        "period",
                        invalid(
                            "out_of_range",
                            "Period must be greater than 0.".into(),
                        ),
                    );
                }
                *period > 0
            })
            .map(|period| Kind::Totp { period }),
            Some("hotp") => {
                number::<u64>(&mut errors, "counter", &self.counter, 0)
                    .map(|counter| Kind::Hotp { counter })
            },
            Some(_) => {
                errors.add(
                    "type",
                    invalid(
                        "unsupported_type",
                        "Type must be `totp` or `hotp`.".into(),
                    ),
                );
                None
            },
        };

        match (issuer, label, secret, digits, algorithm, kind) {
            (
                Some(issuer),
                Some(label),
                Some(secret),
                Some(digits),
                Some(algorithm),
                Some(kind),
            ) if errors.is_empty() => {
                let builder = Configuration::builder()
                    .issuer(issuer)
                    .label(label)
                    .secret(secret)
                    .algorithm(algorithm)
                    .digits(digits);
                let builder = match kind {
                    Kind::Totp { period } => builder.totp(period),
                    Kind::Hotp { counter } => builder.hotp(counter),
                };

                builder.build()
            },
            _ => Err(errors.into()),
        }
    }
}

impl From<&Configuration> for Form {
    fn from(config: &Configuration) -> Self {
        Self {
            issuer: Some(config.issuer().to_owned()),
            label: Some(config.label().to_owned()),
            secret: Some(config.secret().to_base32()),
            digits: Some(config.digits().to_string()),
            period: config.period().map(|period| period.to_string()),
            algorithm: Some(config.algorithm().to_string()),
            kind: Some(config.kind().as_str().to_owned()),
            counter: config.counter().map(|counter| counter.to_string()),
        }
    }
}

/// Non-empty value of an optional field.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

fn required(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: &Option<String>,
    default: &str,
) -> Option<String> {
    match value {
        None => Some(default.to_owned()),
        Some(value) if value.trim().is_empty() => {
            errors.add(
                field,
                invalid(
                    "required",
                    format!("{} must not be empty.", capitalize(field)).into(),
                ),
            );
            None
        },
        Some(value) => Some(value.trim().to_owned()),
    }
}

fn number<T: FromStr>(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: &Option<String>,
    default: T,
) -> Option<T> {
    match present(value) {
        None => Some(default),
        Some(value) => match uri::parse_integer::<T>(value.trim()) {
            Some(number) => Some(number),
            None => {
                let message = format!(
                    "{} must be a positive integer.",
                    capitalize(field)
                );
                errors.add(field, invalid("not_a_number", message.into()));
                None
            },
        },
    }
}

fn invalid(code: &'static str, message: Cow<'static, str>) -> ValidationError {
    ValidationError::new(code).with_message(message)
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn published_names() -> String {
    Algorithm::ALL
        .iter()
        .map(Algorithm::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
