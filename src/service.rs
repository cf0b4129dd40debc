use std::{
    fmt::Display,
    time::{SystemTime, UNIX_EPOCH},
};

use log::{info, warn};

use crate::{
    clipboard::Clipboard,
    secret,
    store::EntryStore,
    totp::{self, Totp},
    uri::{self, ParsedUri},
    OtpError,
};

/// A token ready to be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub code: String,
    /// Seconds until the code rolls over
    pub remaining_seconds: u64,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.code)
    }
}

/// Entry points behind each command. Holds no state between calls.
pub struct TokenService<S, C> {
    store: S,
    clipboard: C,
}

impl<S: EntryStore, C: Clipboard> TokenService<S, C> {
    pub fn new(store: S, clipboard: C) -> Self {
        Self { store, clipboard }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Generates the current token for `identifier`, copying it unless
    /// `copy` is false.
    pub fn show(
        &self,
        identifier: &str,
        offset_seconds: f64,
        copy: bool,
    ) -> Result<Token, OtpError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| OtpError::ClockOutOfRange)?;

        self.show_at(identifier, now.as_secs(), offset_seconds, copy)
    }

    /// [`TokenService::show`] with an explicit UNIX time.
    pub fn show_at(
        &self,
        identifier: &str,
        seconds_since_epoch: u64,
        offset_seconds: f64,
        copy: bool,
    ) -> Result<Token, OtpError> {
        let record = self.store.read(identifier)?;
        let secret = secret::validate(&record.secret)?;

        let mut totp = Totp::new(secret);
        totp.with_digits(record.digits);

        let shifted = totp::shift_clock(seconds_since_epoch, offset_seconds)?;
        let token = Token {
            code: totp.generate(shifted)?.to_string(),
            remaining_seconds: totp.remaining_seconds(shifted),
        };

        if copy {
            if let Err(e) = self.clipboard.copy(&token.code) {
                warn!("could not copy the token: {e}");
            }
        }

        Ok(token)
    }

    /// Stores a secret typed in by the user. Validation errors are reported
    /// without writing, so the caller may ask again.
    pub fn add_interactive(
        &self,
        identifier: &str,
        digits: u32,
        raw_secret: &str,
    ) -> Result<(), OtpError> {
        if digits == 0 {
            return Err(OtpError::InvalidDigits(digits));
        }
        let secret = secret::validate(raw_secret)?;

        self.store.write(identifier, digits, &secret)
    }

    /// Stores the entry described by an otpauth URI.
    pub fn add_from_uri(&self, identifier: &str, uri: &str) -> Result<ParsedUri, OtpError> {
        let parsed = uri::parse(uri)?;
        if parsed.digits == 0 {
            return Err(OtpError::InvalidDigits(parsed.digits));
        }
        secret::validate(&parsed.secret)?;

        self.store.write(identifier, parsed.digits, &parsed.secret)?;
        info!(
            "added {identifier} from URI for {} ({})",
            parsed.label,
            parsed.issuer.as_deref().unwrap_or("no issuer")
        );

        Ok(parsed)
    }

    pub fn remove(&self, identifier: &str) -> Result<(), OtpError> {
        self.store.remove(identifier)
    }
}
