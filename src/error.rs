//! Error handler for otpgen.

use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

pub type Result<T> = std::result::Result<T, OtpError>;

/// Enum representing every failure the engine can report.
#[derive(Debug, Error)]
pub enum OtpError {
    #[error("invalid base32 encoding")]
    InvalidEncoding,

    #[error("secret must not be empty")]
    InvalidSecret,

    #[error("unsupported algorithm {0:?}")]
    UnsupportedAlgorithm(String),

    #[error("digits must be between 1 and 10, got {0}")]
    InvalidDigits(u32),

    #[error("period must be greater than 0, got {0}")]
    InvalidPeriod(u64),

    #[error("window must be at most 100, got {0}")]
    InvalidWindow(u64),

    #[error("malformed otpauth uri, {0}")]
    MalformedUri(String),

    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error("random source failure: {0}")]
    Random(#[from] rand::Error),
}

impl OtpError {
    /// Flatten validation errors into a list keyed by field.
    ///
    /// Any other error kind yields an empty list.
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            OtpError::Validation(errors) => parse_validation_errors(errors),
            _ => Vec::new(),
        }
    }
}

/// A single invalid field, ready to be shown next to a form input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub code: String,
    pub message: String,
}

fn parse_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, issues)| {
            issues.iter().map(move |issue| FieldError {
                field: field.to_string(),
                code: issue.code.to_string(),
                message: issue
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| issue.code.to_string()),
            })
        })
        .collect();

    // `field_errors` is backed by a hash map.
    fields.sort_by(|a, b| a.field.cmp(&b.field));
    fields
}
