use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use crate::{secret, OtpCode, OtpError, OtpHashAlgorithm, DIGITS_DEFAULT};

/// The [HMAC-based One-time Password Algorithm](http://en.wikipedia.org/wiki/HMAC-based_One-time_Password_Algorithm)
/// (HOTP) over a base32 encoded secret.
#[derive(Debug, Clone, PartialEq)]
pub struct Hotp {
    pub(crate) secret: String,
    pub(crate) algorithm: OtpHashAlgorithm,
    // How many digits to generate
    pub(crate) digits: u32,
}

impl Hotp {
    /// Creates the config given an RFC4648 base32 encoded, padded secret.
    ///
    /// Obs.: This method defaults to the SHA1 hash and a 6-digit code.
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            algorithm: OtpHashAlgorithm::SHA1,
            digits: DIGITS_DEFAULT,
        }
    }

    ///  Sets hashing algorithm
    pub fn with_algorithm(&mut self, algorithm: OtpHashAlgorithm) -> &mut Self {
        self.algorithm = algorithm;

        self
    }

    ///  Sets the number of digits to generate
    pub fn with_digits(&mut self, digits: u32) -> &mut Self {
        self.digits = digits;

        self
    }

    /// Generates a HOTP from the provided counter
    /// truncated to the specified number of digits
    pub fn generate(&self, counter: u64) -> Result<OtpCode, OtpError> {
        if self.digits == 0 {
            return Err(OtpError::InvalidDigits(self.digits));
        }

        let decoded = secret::decode(self.secret.as_str())?;
        let digest = calc_digest(decoded.as_slice(), self.algorithm, counter)?;

        let code = encode_digest_truncated(digest.as_ref(), self.digits)?;

        Ok(OtpCode {
            code,
            digits: self.digits,
        })
    }
}

/// Calculates the HMAC digest of the big-endian counter.
fn calc_digest(
    decoded_secret: &[u8],
    algorithm: OtpHashAlgorithm,
    data: u64,
) -> Result<Vec<u8>, OtpError> {
    let data = data.to_be_bytes();

    let digest = match algorithm {
        OtpHashAlgorithm::SHA1 => {
            let mut mac = Hmac::<Sha1>::new_from_slice(decoded_secret)
                .map_err(|_| OtpError::InvalidKeyLength)?;
            mac.update(&data);
            mac.finalize().into_bytes().to_vec()
        }
        OtpHashAlgorithm::SHA256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(decoded_secret)
                .map_err(|_| OtpError::InvalidKeyLength)?;
            mac.update(&data);
            mac.finalize().into_bytes().to_vec()
        }
        OtpHashAlgorithm::SHA512 => {
            let mut mac = Hmac::<Sha512>::new_from_slice(decoded_secret)
                .map_err(|_| OtpError::InvalidKeyLength)?;
            mac.update(&data);
            mac.finalize().into_bytes().to_vec()
        }
    };

    Ok(digest)
}

/// Encodes the HMAC digest into a truncated integer.
fn encode_digest_truncated(digest: &[u8], target_digits_count: u32) -> Result<u32, OtpError> {
    // While sometimes this is a hardcoded 19
    // the last byte tells us the offset for any algorithm
    let offset = match digest.last() {
        Some(x) => *x & 0xf,
        None => return Err(OtpError::InvalidDigest(Vec::from(digest))),
    } as usize;

    // Gets the 4 bytes that will compose the code
    let code_bytes: [u8; 4] = match digest.get(offset..offset + 4).map(<[u8; 4]>::try_from) {
        Some(Ok(x)) => x,
        _ => return Err(OtpError::InvalidDigest(Vec::from(digest))),
    };

    let code = u64::from(u32::from_be_bytes(code_bytes) & 0x7fffffff);

    // Past 9 digits the modulus no longer fits, the code is then only padded
    let code = match 10u64.checked_pow(target_digits_count) {
        Some(truncation_factor) => code % truncation_factor,
        None => code,
    };

    Ok(code as u32)
}
