//! Secret generation and base32 text encoding.

use base32::Alphabet;
use ring::rand::{SecureRandom, SystemRandom};

use crate::{HotpError, Result};

/// Length of secrets recommended by RFC 4226 for HMAC-SHA1 (160 bits).
pub const RECOMMENDED_SECRET_LEN: usize = 20;

/// Generates `len` random bytes from the operating system's CSPRNG.
///
/// # Errors
///
/// Returns [`HotpError::EmptySecret`] for `len == 0` and [`HotpError::Entropy`] if the system
/// generator fails.
pub fn generate_secret(len: usize) -> Result<Vec<u8>> {
    if len == 0 {
        return Err(HotpError::EmptySecret);
    }
    let mut secret = vec![0; len];
    SystemRandom::new()
        .fill(&mut secret)
        .map_err(|_| HotpError::Entropy)?;
    Ok(secret)
}

/// Encodes a secret as RFC 4648 base32 without padding.
pub fn encode_secret(secret: &[u8]) -> String {
    base32::encode(Alphabet::Rfc4648 { padding: false }, secret)
}

/// Decodes base32 text as typed by a person: case, spaces, and `=` padding are ignored.
///
/// # Errors
///
/// Returns [`HotpError::EmptySecret`] if nothing remains after cleaning and
/// [`HotpError::SecretEncoding`] if the text is not base32.
pub fn decode_secret(text: &str) -> Result<Vec<u8>> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if cleaned.is_empty() {
        return Err(HotpError::EmptySecret);
    }
    match base32::decode(Alphabet::Rfc4648 { padding: false }, &cleaned) {
        Some(secret) if !secret.is_empty() => Ok(secret),
        _ => Err(HotpError::SecretEncoding),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc_secret_encoding() {
        assert_eq!(
            encode_secret(b"12345678901234567890"),
            "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ"
        );
        assert_eq!(
            decode_secret("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ").unwrap(),
            b"12345678901234567890"
        );
    }

    #[test]
    fn decode_is_forgiving() {
        assert_eq!(
            decode_secret("gezd gnbv gy3t qojq gezd gnbv gy3t qojq").unwrap(),
            b"12345678901234567890"
        );
        // "foo" is padded in RFC 4648 test vectors
        assert_eq!(decode_secret("MZXW6===").unwrap(), b"foo");
        assert_eq!(decode_secret("MZXW6").unwrap(), b"foo");
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_eq!(decode_secret("not base32!"), Err(HotpError::SecretEncoding));
        assert_eq!(decode_secret("   "), Err(HotpError::EmptySecret));
        assert_eq!(decode_secret("===="), Err(HotpError::EmptySecret));
    }

    #[test]
    fn generated_secrets() {
        let a = generate_secret(RECOMMENDED_SECRET_LEN).unwrap();
        let b = generate_secret(RECOMMENDED_SECRET_LEN).unwrap();
        assert_eq!(a.len(), RECOMMENDED_SECRET_LEN);
        assert_ne!(a, b);
        assert_eq!(decode_secret(&encode_secret(&a)).unwrap(), a);
        assert_eq!(generate_secret(0), Err(HotpError::EmptySecret));
    }
}
