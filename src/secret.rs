//! Normalization and decoding of user supplied base32 secrets.

use std::sync::OnceLock;

use data_encoding::{Encoding, BASE32};

use crate::OtpError;

const BLOCK_LEN: usize = 8;
const PADDING: char = '=';

/// RFC4648 base32 with padding, accepting lowercase input and
/// non-canonical trailing bits.
fn base32_lenient() -> &'static Encoding {
    static ENCODING: OnceLock<Encoding> = OnceLock::new();

    ENCODING.get_or_init(|| {
        let mut spec = BASE32.specification();
        spec.check_trailing_bits = false;
        spec.translate.from.push_str("abcdefghijklmnopqrstuvwxyz");
        spec.translate.to.push_str("ABCDEFGHIJKLMNOPQRSTUVWXYZ");
        spec.encoding()
            .expect("base32 specification derived from BASE32 is valid")
    })
}

/// Strips every whitespace character and pads with `=` up to the next
/// multiple of 8 characters.
///
/// Case and alphabet are left untouched, [`decode`] is what rejects
/// invalid input. Already padded input comes back unchanged.
pub fn normalize(raw: &str) -> String {
    let mut secret: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    let remainder = secret.len() % BLOCK_LEN;
    if remainder != 0 {
        secret.extend(std::iter::repeat(PADDING).take(BLOCK_LEN - remainder));
    }

    secret
}

/// Decodes a normalized secret into the raw HMAC key.
pub fn decode(secret: &str) -> Result<Vec<u8>, OtpError> {
    base32_lenient()
        .decode(secret.as_bytes())
        .map_err(OtpError::SecretDecode)
}

/// Normalizes `raw` and checks that it is a non-empty, decodable secret.
///
/// Returns the normalized form.
pub fn validate(raw: &str) -> Result<String, OtpError> {
    let secret = normalize(raw);
    if secret.is_empty() {
        return Err(OtpError::EmptySecret);
    }

    decode(&secret)?;

    Ok(secret)
}
