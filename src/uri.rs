//! Parsing of `otpauth://totp/<label>?secret=..&digits=..&issuer=..` URIs.

use std::{borrow::Cow, str::FromStr};

use crate::{OtpError, DIGITS_DEFAULT};

const URI_SCHEME: &str = "otpauth";
const TOTP_TYPE: &str = "totp";

const URI_SECRET_QUERY: &str = "secret";
const URI_DIGITS_QUERY: &str = "digits";
const URI_ISSUER_QUERY: &str = "issuer";

/// The entry data carried by an otpauth URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUri {
    pub secret: String,
    pub digits: u32,
    pub issuer: Option<String>,
    pub label: String,
}

/// Returns the single value of `key`, `None` when absent, or an error when
/// the parameter is repeated.
fn single_query_value(uri: &url::Url, key: &'static str) -> Result<Option<String>, OtpError> {
    let mut values = uri
        .query_pairs()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v);

    let first = values.next();
    if values.next().is_some() {
        return Err(OtpError::UriDuplicateParameter(key.into()));
    }

    Ok(first.map(Cow::into_owned))
}

/// Parses and validates an otpauth URI.
///
/// Rules are checked in order and the first violation is reported: the
/// scheme, the `totp` type, then that `secret`, `digits` and `issuer` each
/// appear at most once. The secret must be present and non-empty.
pub fn parse(uri: &str) -> Result<ParsedUri, OtpError> {
    let uri = url::Url::parse(uri).map_err(OtpError::UriParseError)?;

    if uri.scheme() != URI_SCHEME {
        return Err(OtpError::InvalidUriScheme(uri.scheme().into()));
    }

    let otp_type = uri.host_str();
    if otp_type != Some(TOTP_TYPE) {
        return Err(OtpError::InvalidUriType(
            otp_type.unwrap_or("None").into(),
            TOTP_TYPE.into(),
        ));
    }

    let secret = match single_query_value(&uri, URI_SECRET_QUERY)? {
        Some(secret) if !secret.is_empty() => secret,
        _ => return Err(OtpError::UriMissingSecret),
    };
    let digits = single_query_value(&uri, URI_DIGITS_QUERY)?;
    let issuer = single_query_value(&uri, URI_ISSUER_QUERY)?;

    let digits = match digits {
        Some(digits) => u32::from_str(&digits)
            .map_err(|e| OtpError::IntegerParseError(e, URI_DIGITS_QUERY.into()))?,
        None => DIGITS_DEFAULT,
    };

    let label = uri.path().strip_prefix('/').unwrap_or(uri.path()).to_string();

    Ok(ParsedUri {
        secret,
        digits,
        issuer,
        label,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{parse, ParsedUri};
    use crate::OtpError;

    #[test]
    fn parses_all_fields() {
        let parsed = parse(
            "otpauth://totp/Example:alice?secret=JBSWY3DPEHPK3PXP&digits=8&issuer=Example",
        )
        .unwrap();

        assert_eq!(
            ParsedUri {
                secret: "JBSWY3DPEHPK3PXP".into(),
                digits: 8,
                issuer: Some("Example".into()),
                label: "Example:alice".into(),
            },
            parsed
        );
    }

    #[test]
    fn defaults_when_optional_fields_absent() {
        let parsed = parse("otpauth://totp/alice?secret=JBSWY3DPEHPK3PXP").unwrap();

        assert_eq!(6, parsed.digits);
        assert_eq!(None, parsed.issuer);
        assert_eq!("alice", parsed.label);
    }

    #[test]
    fn issuer_is_percent_decoded() {
        let parsed = parse(
            "otpauth://totp/ACME%20Co:john.doe@email.com?secret=HXDMVJECJJWSRB3HWIZR4IFUGFTMXBOZ&issuer=ACME+Co",
        )
        .unwrap();

        assert_eq!(Some("ACME Co".to_string()), parsed.issuer);
        assert_eq!("ACME%20Co:john.doe@email.com", parsed.label);
    }

    #[test]
    fn invalid_scheme() {
        let err = parse("otphttp://totp/x?secret=AAAA").unwrap_err();
        assert!(matches!(err, OtpError::InvalidUriScheme(s) if s == "otphttp"));
    }

    #[test]
    fn invalid_type() {
        let err = parse("otpauth://hotp/x?secret=AAAA").unwrap_err();
        assert!(matches!(err, OtpError::InvalidUriType(found, _) if found == "hotp"));
    }

    #[rstest]
    #[case("otpauth://totp/x")]
    #[case("otpauth://totp/x?secret=")]
    #[case("otpauth://totp/x?digits=6")]
    fn missing_secret(#[case] uri: &str) {
        assert!(matches!(parse(uri), Err(OtpError::UriMissingSecret)));
    }

    #[rstest]
    #[case("otpauth://totp/x?secret=AAAA&secret=BBBB", "secret")]
    #[case("otpauth://totp/x?secret=AAAA&digits=6&digits=8", "digits")]
    #[case("otpauth://totp/x?secret=AAAA&issuer=a&issuer=b", "issuer")]
    fn duplicate_parameter(#[case] uri: &str, #[case] key: &str) {
        let err = parse(uri).unwrap_err();
        assert!(matches!(err, OtpError::UriDuplicateParameter(k) if k == key));
    }

    #[rstest]
    #[case("otphttp://hotp/x", "scheme")]
    #[case("otpauth://hotp/x?secret=A&secret=B", "type")]
    #[case("otpauth://totp/x?digits=6&digits=8", "secret")]
    #[case("otpauth://totp/x?secret=A&issuer=a&issuer=b&digits=6&digits=8", "digits")]
    fn first_violation_wins(#[case] uri: &str, #[case] rule: &str) {
        let err = parse(uri).unwrap_err();
        let reported = match err {
            OtpError::InvalidUriScheme(_) => "scheme",
            OtpError::InvalidUriType(..) => "type",
            OtpError::UriMissingSecret => "secret",
            OtpError::UriDuplicateParameter(k) => return assert_eq!(rule, k),
            other => panic!("unexpected error {other:?}"),
        };
        assert_eq!(rule, reported);
    }

    #[test]
    fn non_numeric_digits() {
        let err = parse("otpauth://totp/x?secret=AAAA&digits=six").unwrap_err();
        assert!(matches!(err, OtpError::IntegerParseError(_, field) if field == "digits"));
    }

    #[test]
    fn unparseable_uri() {
        assert!(matches!(parse("not a uri"), Err(OtpError::UriParseError(_))));
    }
}
