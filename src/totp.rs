use crate::{hotp::Hotp, OtpCode, OtpError, OtpHashAlgorithm};

/// Length of a time step in seconds.
pub const DEFAULT_PERIOD: u64 = 30;

/// Whole seconds of `floor(seconds_since_epoch + offset_seconds)`.
///
/// Fails with [`OtpError::ClockOutOfRange`] when the result lands before the
/// UNIX epoch or the offset is not a finite number.
pub fn shift_clock(seconds_since_epoch: u64, offset_seconds: f64) -> Result<u64, OtpError> {
    // The clock is whole, so only the offset needs flooring
    let whole = offset_seconds.floor();
    if !(i64::MIN as f64..i64::MAX as f64).contains(&whole) {
        return Err(OtpError::ClockOutOfRange);
    }

    seconds_since_epoch
        .checked_add_signed(whole as i64)
        .ok_or(OtpError::ClockOutOfRange)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Totp {
    pub(crate) hotp: Hotp,
    pub(crate) period: u64,
}

impl Totp {
    /// Creates the config for the [Time-based One-time Password Algorithm](http://en.wikipedia.org/wiki/Time-based_One-time_Password_Algorithm)
    /// (TOTP) given an RFC4648 base32 encoded, padded secret.
    ///
    /// Obs.: This method defaults to the SHA1 hash, a 6-digit code and a period of 30 seconds
    pub fn new(secret: String) -> Self {
        Self {
            hotp: Hotp::new(secret),
            period: DEFAULT_PERIOD,
        }
    }

    ///  Sets hashing algorithm
    pub fn with_algorithm(&mut self, algorithm: OtpHashAlgorithm) -> &mut Self {
        self.hotp.with_algorithm(algorithm);

        self
    }

    ///  Sets the number of digits to generate
    pub fn with_digits(&mut self, digits: u32) -> &mut Self {
        self.hotp.with_digits(digits);

        self
    }

    /// Generates a Totp from the provided seconds since the UNIX epoch
    /// truncated to the specified number of digits
    pub fn generate(&self, seconds_since_epoch: u64) -> Result<OtpCode, OtpError> {
        self.hotp.generate(seconds_since_epoch / self.period)
    }

    /// Same as [`Totp::generate`] with the clock shifted by `offset_seconds`,
    /// which may be negative or fractional.
    pub fn generate_with_offset(
        &self,
        seconds_since_epoch: u64,
        offset_seconds: f64,
    ) -> Result<OtpCode, OtpError> {
        self.generate(shift_clock(seconds_since_epoch, offset_seconds)?)
    }

    /// Seconds until the code generated at `seconds_since_epoch` expires
    pub fn remaining_seconds(&self, seconds_since_epoch: u64) -> u64 {
        self.period - seconds_since_epoch % self.period
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use crate::{
        secret::normalize,
        totp::{shift_clock, Totp},
        OtpError, OtpHashAlgorithm,
    };

    #[fixture]
    pub fn sha1_secret() -> String {
        normalize("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ")
    }

    #[fixture]
    pub fn sha256_secret() -> String {
        normalize("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQGEZA")
    }

    #[fixture]
    pub fn sha512_secret() -> String {
        normalize("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQGEZDGNA")
    }

    #[rstest]
    #[case(sha1_secret(), OtpHashAlgorithm::SHA1, 59, "94287082")]
    #[case(sha256_secret(), OtpHashAlgorithm::SHA256, 59, "46119246")]
    #[case(sha512_secret(), OtpHashAlgorithm::SHA512, 59, "90693936")]
    #[case(sha1_secret(), OtpHashAlgorithm::SHA1, 1111111109, "07081804")]
    #[case(sha256_secret(), OtpHashAlgorithm::SHA256, 1111111109, "68084774")]
    #[case(sha512_secret(), OtpHashAlgorithm::SHA512, 1111111109, "25091201")]
    #[case(sha1_secret(), OtpHashAlgorithm::SHA1, 1111111111, "14050471")]
    #[case(sha256_secret(), OtpHashAlgorithm::SHA256, 1111111111, "67062674")]
    #[case(sha512_secret(), OtpHashAlgorithm::SHA512, 1111111111, "99943326")]
    #[case(sha1_secret(), OtpHashAlgorithm::SHA1, 1234567890, "89005924")]
    #[case(sha256_secret(), OtpHashAlgorithm::SHA256, 1234567890, "91819424")]
    #[case(sha512_secret(), OtpHashAlgorithm::SHA512, 1234567890, "93441116")]
    #[case(sha1_secret(), OtpHashAlgorithm::SHA1, 2000000000, "69279037")]
    #[case(sha256_secret(), OtpHashAlgorithm::SHA256, 2000000000, "90698825")]
    #[case(sha512_secret(), OtpHashAlgorithm::SHA512, 2000000000, "38618901")]
    #[case(sha1_secret(), OtpHashAlgorithm::SHA1, 20000000000, "65353130")]
    #[case(sha256_secret(), OtpHashAlgorithm::SHA256, 20000000000, "77737706")]
    #[case(sha512_secret(), OtpHashAlgorithm::SHA512, 20000000000, "47863826")]
    #[case(sha1_secret(), OtpHashAlgorithm::SHA1, 20000000000, "353130")]
    #[case(sha256_secret(), OtpHashAlgorithm::SHA256, 20000000000, "737706")]
    #[case(sha512_secret(), OtpHashAlgorithm::SHA512, 20000000000, "863826")]
    #[case(sha1_secret(), OtpHashAlgorithm::SHA1, 1111111109, "081804")]
    fn totp_test(
        #[case] secret: String,
        #[case] hash: OtpHashAlgorithm,
        #[case] timestamp: u64,
        #[case] expected: &str,
    ) {
        let mut totp_base = Totp::new(secret);
        totp_base
            .with_algorithm(hash)
            .with_digits(expected.len() as u32);

        let generated_otp = totp_base.generate(timestamp).unwrap();
        assert_eq!(expected, generated_otp.to_string());
    }

    #[rstest]
    #[case(1111111109, 2.0, 1111111111)]
    #[case(1111111141, -32.0, 1111111109)]
    #[case(59, 0.0, 59)]
    #[case(1111111108, 1.5, 1111111109)]
    #[case(1111111110, -0.5, 1111111109)]
    #[case(89, 0.999, 89)]
    fn offset_shifts_clock(#[case] now: u64, #[case] offset: f64, #[case] effective: u64) {
        let mut totp = Totp::new(sha1_secret());
        totp.with_digits(8);

        assert_eq!(effective, shift_clock(now, offset).unwrap());
        assert_eq!(
            totp.generate(effective).unwrap(),
            totp.generate_with_offset(now, offset).unwrap()
        );
    }

    #[rstest]
    #[case(10, -11.0)]
    #[case(10, -10.5)]
    #[case(0, -0.25)]
    #[case(10, f64::NAN)]
    #[case(10, f64::INFINITY)]
    #[case(10, 1e30)]
    fn offset_out_of_range_is_rejected(#[case] now: u64, #[case] offset: f64) {
        let totp = Totp::new(sha1_secret());

        assert!(matches!(
            totp.generate_with_offset(now, offset),
            Err(OtpError::ClockOutOfRange)
        ));
    }

    #[rstest]
    #[case(0, 30)]
    #[case(59, 1)]
    #[case(61, 29)]
    fn remaining_seconds(#[case] now: u64, #[case] expected: u64) {
        assert_eq!(expected, Totp::new(sha1_secret()).remaining_seconds(now));
    }
}
