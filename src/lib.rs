//! Time-based one-time passwords whose shared keys are kept in `pass(1)`.
//!
//! Entries live under `2fa/<identifier>/code` in the password store. The
//! [`service::TokenService`] ties together the store, the secret codec and the
//! token engine.

pub mod clipboard;
pub mod config;
pub mod hotp;
pub mod secret;
pub mod service;
pub mod store;
pub mod totp;
pub mod uri;

use core::num;
use std::fmt::Display;

/// Token length used when neither the entry nor the URI specifies one.
pub const DIGITS_DEFAULT: u32 = 6;

/// A failure reported by the external password store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{backend_name} returned an error:\n{message}")]
pub struct BackendError {
    pub backend_name: String,
    pub message: String,
}

impl BackendError {
    pub fn new(backend_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            backend_name: backend_name.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("Secret decode error: {0}")]
    SecretDecode(data_encoding::DecodeError),
    #[error("The key entered was empty")]
    EmptySecret,
    #[error("Invalid token length {0}, it must be a positive integer")]
    InvalidDigits(u32),
    #[error("Invalid digest")]
    InvalidDigest(Vec<u8>),
    #[error("Invalid HMAC key length")]
    InvalidKeyLength,
    #[error("The provided URI scheme is not valid, found {0}. Expected: otpauth")]
    InvalidUriScheme(String),
    #[error("The provided URI is not from valid, found {0}. Expected: {1}")]
    InvalidUriType(String, String),
    #[error("Could not parse the URI: {0}")]
    UriParseError(url::ParseError),
    #[error("Could not retrieve the secret from the URI")]
    UriMissingSecret,
    #[error("The URI query parameter `{0}` appears more than once")]
    UriDuplicateParameter(String),
    #[error("Could not parse an integer. Failed parsing: {1}")]
    IntegerParseError(num::ParseIntError, String),
    #[error("Malformed digits line in entry: {0}")]
    MalformedDigitsLine(String),
    #[error("The clock offset moves the time before the UNIX epoch")]
    ClockOutOfRange,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl OtpError {
    /// Whether the error was caused by malformed user input, which the
    /// interactive layer may recover from by asking again.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::SecretDecode(_)
                | Self::EmptySecret
                | Self::InvalidDigits(_)
                | Self::InvalidUriScheme(_)
                | Self::InvalidUriType(..)
                | Self::UriParseError(_)
                | Self::UriMissingSecret
                | Self::UriDuplicateParameter(_)
                | Self::IntegerParseError(..)
                | Self::MalformedDigitsLine(_)
        )
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum OtpHashAlgorithm {
    #[default]
    SHA1,
    SHA256,
    SHA512,
}

/// A generated code together with the length it must be displayed with.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct OtpCode {
    code: u32,
    digits: u32,
}

impl Display for OtpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:0padding$}",
            self.code,
            padding = (self.digits as usize)
        )
    }
}
