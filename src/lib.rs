//! otpgen derives HOTP (RFC 4226) and TOTP (RFC 6238) codes and encodes
//! credentials as `otpauth://` provisioning URIs.
//!
//! ```
//! use otpgen::{Configuration, Form, Settings};
//!
//! let form =
//!     Form::from_query("issuer=ACME&label=Alice&secret=JBSWY3DPEHPK3PXP");
//! let config = form.validate(&Settings::default()).unwrap();
//!
//! assert_eq!(config.generate(59).unwrap().len(), 6);
//! assert_eq!(
//!     config.to_uri(),
//!     "otpauth://totp/ACME:Alice?issuer=ACME&secret=JBSWY3DPEHPK3PXP"
//! );
//! ```
#![forbid(unsafe_code)]
#![deny(unused_mut)]

pub mod algorithm;
pub mod base32;
pub mod config;
pub mod credential;
pub mod error;
pub mod form;
pub mod hotp;
pub mod secret;
pub mod telemetry;
pub mod totp;
pub mod uri;

pub use algorithm::Algorithm;
pub use config::Settings;
pub use credential::{Configuration, Kind};
pub use error::{FieldError, OtpError, Result};
pub use form::Form;
pub use secret::Secret;
