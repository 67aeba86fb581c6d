//! `otpauth://` provisioning URI codec, following the key URI format most
//! authenticator apps understand:
//!
//! `otpauth://totp/ACME:alice?issuer=ACME&secret=JBSWY3DPEHPK3PXP&digits=8`

use std::collections::HashMap;
use std::str::FromStr;

use url::Url;

use crate::algorithm::Algorithm;
use crate::credential::{Configuration, Kind};
use crate::error::{OtpError, Result};
use crate::secret::Secret;
use crate::{hotp, totp};

const SCHEME: &str = "otpauth";

/// Write `config` as a provisioning URI.
///
/// `issuer` and `secret` are always present. `algorithm`, `digits` and
/// `period` are left out when they hold their default value; HOTP URIs
/// always carry `counter`.
pub fn encode(config: &Configuration) -> String {
    let issuer = config.issuer();
    let label = strip_issuer(config.label(), issuer);

    let path = if issuer.is_empty() {
        urlencoding::encode(label).into_owned()
    } else {
        format!(
            "{}:{}",
            urlencoding::encode(issuer),
            urlencoding::encode(label)
        )
    };

    let mut params = vec![
        format!("issuer={}", urlencoding::encode(issuer)),
        format!("secret={}", config.secret().to_base32()),
    ];

    if config.algorithm() != Algorithm::default() {
        params.push(format!("algorithm={}", config.algorithm()));
    }

    if config.digits() != hotp::DEFAULT_DIGITS {
        params.push(format!("digits={}", config.digits()));
    }

    match config.kind() {
        Kind::Totp { period } if period != totp::DEFAULT_PERIOD => {
            params.push(format!("period={period}"));
        },
        Kind::Totp { .. } => {},
        Kind::Hotp { counter } => params.push(format!("counter={counter}")),
    }

    format!(
        "{SCHEME}://{}/{path}?{}",
        config.kind().as_str(),
        params.join("&")
    )
}

/// Parse a provisioning URI.
///
/// Unknown parameters are ignored and empty values count as absent.
///
/// # Errors
///
/// Returns [`OtpError::MalformedUri`] on a wrong scheme or type, a missing
/// or invalid secret, out of range `digits`/`period`/`counter`, or an HOTP
/// URI without `counter`. Returns [`OtpError::UnsupportedAlgorithm`] on an
/// unknown `algorithm`.
pub fn decode(uri: &str) -> Result<Configuration> {
    let url = Url::parse(uri).map_err(|err| malformed(err.to_string()))?;

    if url.scheme() != SCHEME {
        return Err(malformed(format!(
            "expected scheme `{SCHEME}`, got `{}`",
            url.scheme()
        )));
    }

    let mut params: HashMap<String, String> = HashMap::new();
    for (key, value) in url.query_pairs() {
        if value.is_empty() {
            continue;
        }
        params
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }

    let kind = match url.host_str() {
        Some("totp") => Kind::Totp {
            period: match params.get("period") {
                Some(period) => parse_integer::<u64>(period)
                    .filter(|period| *period > 0)
                    .ok_or_else(|| {
                        malformed(format!("invalid period `{period}`"))
                    })?,
                None => totp::DEFAULT_PERIOD,
            },
        },
        Some("hotp") => Kind::Hotp {
            counter: match params.get("counter") {
                Some(counter) => parse_integer::<u64>(counter).ok_or_else(|| {
                    malformed(format!("invalid counter `{counter}`"))
                })?,
                None => return Err(malformed("missing counter")),
            },
        },
        other => {
            return Err(malformed(format!(
                "unknown type `{}`",
                other.unwrap_or_default()
            )));
        },
    };

    let secret = params
        .get("secret")
        .ok_or_else(|| malformed("missing secret"))?;
    let secret = Secret::from_base32(secret)
        .map_err(|_| malformed("secret is not valid base32"))?;

    let algorithm = params
        .get("algorithm")
        .map(|name| Algorithm::from_str_loose(name))
        .transpose()?
        .unwrap_or_default();

    let digits = match params.get("digits") {
        Some(digits) => parse_integer::<u32>(digits)
            .filter(|digits| {
                (hotp::MIN_DIGITS..=hotp::MAX_DIGITS).contains(digits)
            })
            .ok_or_else(|| malformed(format!("invalid digits `{digits}`")))?,
        None => hotp::DEFAULT_DIGITS,
    };

    let (issuer, label) = split_label(raw_path(uri), params.get("issuer"))?;

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
}

/// Parse a plain unsigned decimal. Signs, spaces and empty text are refused.
pub(crate) fn parse_integer<T: FromStr>(value: &str) -> Option<T> {
    if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }

    value.parse().ok()
}

fn malformed(reason: impl Into<String>) -> OtpError {
    OtpError::MalformedUri(reason.into())
}

/// Still-encoded label segment, between `otpauth://{type}/` and the query.
///
/// [`Url::path`] resolves `.` and `..` segments, which would drop such labels.
fn raw_path(uri: &str) -> &str {
    let rest = uri.trim().split_once("://").map_or("", |(_, rest)| rest);
    let rest = rest.split(['?', '#']).next().unwrap_or_default();

    rest.split_once('/').map_or("", |(_, path)| path)
}

fn percent_decode(text: &str) -> Result<String> {
    urlencoding::decode(text)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| malformed("label is not valid utf-8"))
}

/// Remove an `"{issuer}:"` prefix so it is not written twice.
fn strip_issuer<'a>(label: &'a str, issuer: &str) -> &'a str {
    if issuer.is_empty() {
        return label;
    }

    label
        .strip_prefix(issuer)
        .and_then(|rest| rest.strip_prefix(':'))
        .map(str::trim_start)
        .unwrap_or(label)
}

/// Split an encoded path into issuer and label. The `issuer` parameter wins
/// over the path prefix.
///
/// Only a literal `:` separates the issuer; an escaped `%3A` belongs to the
/// text around it.
fn split_label(
    path: &str,
    issuer: Option<&String>,
) -> Result<(String, String)> {
    let decoded = percent_decode(path)?;
    if let Some(issuer) = issuer {
        let label = strip_issuer(&decoded, issuer);
        if label.len() != decoded.len() {
            return Ok((issuer.clone(), label.to_owned()));
        }
    }

    let (prefix, label) = match path.split_once(':') {
        Some((prefix, label)) => (
            Some(percent_decode(prefix)?),
            percent_decode(label)?.trim_start().to_owned(),
        ),
        None => (None, decoded),
    };

    let issuer = issuer.cloned().or(prefix).unwrap_or_default();

    Ok((issuer, label))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> Secret {
        Secret::from_base32("JBSWY3DPEHPK3PXP").unwrap()
    }

    fn acme() -> Configuration {
        credential("ACME", "Alice")
    }

    fn credential(issuer: &str, label: &str) -> Configuration {
        Configuration::builder()
            .issuer(issuer)
            .label(label)
            .secret(secret())
            .build()
            .unwrap()
    }

    #[test]
    fn test_encode_defaults() {
        assert_eq!(
            encode(&acme()),
            "otpauth://totp/ACME:Alice?issuer=ACME&secret=JBSWY3DPEHPK3PXP"
        );
    }

    #[test]
    fn test_encode_all_parameters() {
        let config = Configuration::builder()
            .issuer("ACME Co")
            .label("alice@example.com")
            .secret(secret())
            .algorithm(Algorithm::Sha3_256)
            .digits(8)
            .totp(60)
            .build()
            .unwrap();

        assert_eq!(
            encode(&config),
            "otpauth://totp/ACME%20Co:alice%40example.com?issuer=ACME%20Co\
             &secret=JBSWY3DPEHPK3PXP&algorithm=SHA3-256&digits=8&period=60"
        );
    }

    #[test]
    fn test_encode_hotp_has_counter() {
        let config = Configuration::builder()
            .issuer("ACME")
            .label("Alice")
            .secret(secret())
            .hotp(0)
            .build()
            .unwrap();

        assert_eq!(
            encode(&config),
            "otpauth://hotp/ACME:Alice?issuer=ACME&secret=JBSWY3DPEHPK3PXP\
             &counter=0"
        );
    }

    #[test]
    fn test_encode_does_not_duplicate_issuer() {
        assert_eq!(encode(&credential("ACME", "ACME:Alice")), encode(&acme()));
    }

    #[test]
    fn test_encode_without_issuer() {
        let config = credential("", "Alice");

        assert_eq!(
            encode(&config),
            "otpauth://totp/Alice?issuer=&secret=JBSWY3DPEHPK3PXP"
        );
        assert_eq!(decode(&encode(&config)).unwrap(), config);
    }

    #[test]
    fn test_decode_defaults() {
        let config =
            decode("otpauth://totp/ACME:Alice?secret=JBSWY3DPEHPK3PXP")
                .unwrap();

        assert_eq!(config, acme());
    }

    #[test]
    fn test_decode_full() {
        let config = decode(
            "otpauth://hotp/Example%20Inc:j%C3%B6rg%40example.com?\
             secret=jbswy3dpehpk3pxp&issuer=Example%20Inc&algorithm=sha512\
             &digits=8&counter=42&image=https%3A%2F%2Fexample.com%2Flogo.png",
        )
        .unwrap();

        assert_eq!(config.issuer(), "Example Inc");
        assert_eq!(config.label(), "jörg@example.com");
        assert_eq!(config.secret(), &secret());
        assert_eq!(config.algorithm(), Algorithm::Sha512);
        assert_eq!(config.digits(), 8);
        assert_eq!(config.kind(), Kind::Hotp { counter: 42 });
    }

    #[test]
    fn test_decode_issuer_sources() {
        let config =
            decode("otpauth://totp/Alice?secret=JBSWY3DPEHPK3PXP").unwrap();
        assert_eq!((config.issuer(), config.label()), ("", "Alice"));

        let config =
            decode("otpauth://totp/ACME:%20Alice?secret=JBSWY3DPEHPK3PXP")
                .unwrap();
        assert_eq!((config.issuer(), config.label()), ("ACME", "Alice"));

        let config = decode(
            "otpauth://totp/Other:Alice?secret=JBSWY3DPEHPK3PXP&issuer=ACME",
        )
        .unwrap();
        assert_eq!((config.issuer(), config.label()), ("ACME", "Alice"));

        // Issuer containing the separator.
        let config = decode(
            "otpauth://totp/A%3AB:Alice?secret=JBSWY3DPEHPK3PXP&issuer=A%3AB",
        )
        .unwrap();
        assert_eq!((config.issuer(), config.label()), ("A:B", "Alice"));

        // Escaped separator with a matching issuer parameter.
        let config = decode(
            "otpauth://totp/ACME%3AAlice?secret=JBSWY3DPEHPK3PXP&issuer=ACME",
        )
        .unwrap();
        assert_eq!((config.issuer(), config.label()), ("ACME", "Alice"));
    }

    #[test]
    fn test_decode_escaped_colon_is_not_a_separator() {
        let config = credential("", "a:b");
        let uri = encode(&config);

        assert_eq!(uri, "otpauth://totp/a%3Ab?issuer=&secret=JBSWY3DPEHPK3PXP");
        let decoded = decode(&uri).unwrap();
        assert_eq!((decoded.issuer(), decoded.label()), ("", "a:b"));
    }

    #[test]
    fn test_decode_keeps_dot_labels() {
        for label in [".", ".."] {
            let config = credential("", label);
            let decoded = decode(&encode(&config)).unwrap();
            assert_eq!((decoded.issuer(), decoded.label()), ("", label));
        }

        let decoded =
            decode("otpauth://totp/ACME:..?secret=JBSWY3DPEHPK3PXP#top")
                .unwrap();
        assert_eq!((decoded.issuer(), decoded.label()), ("ACME", ".."));
    }

    #[test]
    fn test_decode_empty_values_are_defaults() {
        let config = decode(
            "otpauth://totp/ACME:Alice?secret=JBSWY3DPEHPK3PXP&issuer=ACME\
             &digits=&period=&algorithm=",
        )
        .unwrap();

        assert_eq!(config, acme());
    }

    #[test]
    fn test_decode_first_occurrence_wins() {
        let config = decode(
            "otpauth://totp/ACME:Alice?secret=JBSWY3DPEHPK3PXP&digits=7\
             &digits=8",
        )
        .unwrap();

        assert_eq!(config.digits(), 7);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let cases = [
            "http://totp/ACME:Alice?secret=JBSWY3DPEHPK3PXP",
            "not a uri",
            "otpauth://motp/ACME:Alice?secret=JBSWY3DPEHPK3PXP",
            "otpauth://totp/ACME:Alice",
            "otpauth://totp/ACME:Alice?secret=",
            "otpauth://totp/ACME:Alice?secret=JBSWY3DPEHPK3PX1",
            "otpauth://totp/ACME:Alice?secret=JBSWY3DPEHPK3PXP&digits=0",
            "otpauth://totp/ACME:Alice?secret=JBSWY3DPEHPK3PXP&digits=11",
            "otpauth://totp/ACME:Alice?secret=JBSWY3DPEHPK3PXP&digits=six",
            "otpauth://totp/ACME:Alice?secret=JBSWY3DPEHPK3PXP&period=0",
            "otpauth://totp/ACME:Alice?secret=JBSWY3DPEHPK3PXP&period=-30",
            "otpauth://hotp/ACME:Alice?secret=JBSWY3DPEHPK3PXP",
            "otpauth://hotp/ACME:Alice?secret=JBSWY3DPEHPK3PXP&counter=-1",
        ];

        for uri in cases {
            assert!(
                matches!(decode(uri), Err(OtpError::MalformedUri(_))),
                "accepted {uri}"
            );
        }
    }

    #[test]
    fn test_decode_rejects_signed_numbers() {
        let cases = [
            "otpauth://totp/ACME:Alice?secret=JBSWY3DPEHPK3PXP&digits=%2B8",
            "otpauth://totp/ACME:Alice?secret=JBSWY3DPEHPK3PXP&period=%2B30",
            "otpauth://totp/ACME:Alice?secret=JBSWY3DPEHPK3PXP&digits=%208",
            "otpauth://hotp/ACME:Alice?secret=JBSWY3DPEHPK3PXP&counter=%2B1",
        ];

        for uri in cases {
            assert!(
                matches!(decode(uri), Err(OtpError::MalformedUri(_))),
                "accepted {uri}"
            );
        }
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer::<u32>("8"), Some(8));
        assert_eq!(parse_integer::<u32>("008"), Some(8));
        assert_eq!(parse_integer::<u64>(&u64::MAX.to_string()), Some(u64::MAX));
        assert_eq!(parse_integer::<u32>(""), None);
        assert_eq!(parse_integer::<u32>("+8"), None);
        assert_eq!(parse_integer::<u32>("-8"), None);
        assert_eq!(parse_integer::<u32>(" 8"), None);
        assert_eq!(parse_integer::<u32>("99999999999"), None);
    }

    #[test]
    fn test_decode_unknown_algorithm() {
        assert!(matches!(
            decode(
                "otpauth://totp/ACME:Alice?secret=JBSWY3DPEHPK3PXP\
                 &algorithm=MD5"
            ),
            Err(OtpError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_roundtrip() {
        let labels = [
            ("ACME", "Alice"),
            ("ACME Co", "alice@example.com"),
            ("Ünïcödé & Sons", "björk+otp@example.com"),
            ("", "no issuer"),
            ("", "a:b"),
            ("", "."),
            ("100%", "50/50?#"),
        ];

        for (issuer, label) in labels {
            for algorithm in Algorithm::ALL {
                for digits in [1, 6, 8, 10] {
                    for kind in [
                        Kind::Totp { period: 30 },
                        Kind::Totp { period: 1 },
                        Kind::Hotp { counter: 0 },
                        Kind::Hotp { counter: u64::MAX },
                    ] {
                        let builder = Configuration::builder()
                            .issuer(issuer)
                            .label(label)
                            .secret(secret())
                            .algorithm(algorithm)
                            .digits(digits);
                        let config = match kind {
                            Kind::Totp { period } => builder.totp(period),
                            Kind::Hotp { counter } => builder.hotp(counter),
                        }
                        .build()
                        .unwrap();

                        let uri = config.to_uri();
                        assert_eq!(decode(&uri).unwrap(), config, "{uri}");
                    }
                }
            }
        }
    }
}
