//! HMAC-based one-time passwords ([RFC 4226][4226]) with look-ahead resynchronization.
//!
//! The crate is split into two layers. The pure functions [`raw_hotp`], [`hotp`], and
//! [`validate`] compute and check a single code without any state. The [`Hotp`] session owns a
//! secret and a moving counter, and advances (or resynchronizes) that counter when a submitted
//! code is accepted.
//!
//! ```rust
//! use hotp_session::{Digits, Hotp};
//!
//! let mut server = Hotp::new(b"12345678901234567890", 0, Digits::SIX)?;
//! assert_eq!(server.calculate()?, "755224");
//! assert!(server.validate("755224")?);
//! assert_eq!(server.counter(), 1);
//! # Ok::<(), hotp_session::HotpError>(())
//! ```
//!
//! [4226]: https://datatracker.ietf.org/doc/html/rfc4226

pub mod digest;
pub mod length;
pub mod secret;
pub mod session;
pub mod uri;

pub use digest::{Algorithm, Digest, HmacDigest};
pub use length::{format, Digits};
pub use secret::{decode_secret, encode_secret, generate_secret};
pub use session::{Hotp, MAX_LOOK_AHEAD};
pub use uri::{parse_provisioning_uri, provisioning_uri, Issuer, Provisioning};

/// Synchronized moving counter.
///
/// [RFC 4226][4226] describes an "8-byte synchronized moving counter." To allow for more
/// sophisticated forms of counters, the `Counter` and [`CounterBytes`] traits are exposed.
///
/// `Counter` is implemented for `u64` directly and for every [`CounterBytes`] type, whose eight
/// bytes are read as a big-endian integer.
///
/// [4226]: https://datatracker.ietf.org/doc/html/rfc4226
pub trait Counter {
    /// The counter value as an eight-byte, big-endian, unsigned integer.
    fn value(&self) -> u64;
}

/// Raw synchronized moving counter.
///
/// See the documentation for [`Counter`] for more information.
pub trait CounterBytes {
    /// The counter value as an array of bytes.
    fn value(&self) -> [u8; 8];
}

impl CounterBytes for [u8; 8] {
    fn value(&self) -> [u8; 8] {
        *self
    }
}

impl<T: CounterBytes> Counter for T {
    fn value(&self) -> u64 {
        u64::from_be_bytes(CounterBytes::value(self))
    }
}

impl Counter for u64 {
    fn value(&self) -> u64 {
        *self
    }
}

/// Shared secret.
///
/// As per [RFC 4226][4226], "each HOTP generator has a different and unique secret." Any byte
/// string may serve as a secret as long as it is non-empty. The RFC recommends at least 160
/// bits for HMAC-SHA1; that recommendation is left to the caller.
///
/// [4226]: https://datatracker.ietf.org/doc/html/rfc4226
pub trait Secret: AsRef<[u8]> {}
impl Secret for String {}
impl Secret for &'_ str {}
impl Secret for &'_ [u8] {}
impl Secret for Vec<u8> {}
impl<const N: usize> Secret for [u8; N] {}
impl<const N: usize> Secret for &'_ [u8; N] {}

/// A code submitted for validation.
///
/// Codes are always compared in their canonical form: decimal, left-padded with zeros to the
/// session's digit count. Integers and digit strings therefore compare equal whenever they
/// denote the same code (`42`, `"42"`, and `"000042"` are the same six-digit code). Leading
/// zeros beyond the digit count are dropped from strings, so `"0755224"` is the six-digit code
/// `755224`, just as the integer literal `0755224` is.
pub trait SubmittedCode {
    /// Canonical form of this code at the given length, or `None` if it can never match.
    fn canonical(&self, digits: Digits) -> Option<String>;
}

macro_rules! impl_submitted_code_unsigned {
    ($($t:ty),+) => ($(
        impl SubmittedCode for $t {
            fn canonical(&self, digits: Digits) -> Option<String> {
                Some(format!("{:0width$}", self, width = usize::from(digits.get())))
            }
        }
    )+)
}
impl_submitted_code_unsigned!(u32, u64);

macro_rules! impl_submitted_code_signed {
    ($($t:ty),+) => ($(
        impl SubmittedCode for $t {
            fn canonical(&self, digits: Digits) -> Option<String> {
                u64::try_from(*self).ok()?.canonical(digits)
            }
        }
    )+)
}
impl_submitted_code_signed!(i32, i64);

impl SubmittedCode for str {
    fn canonical(&self, digits: Digits) -> Option<String> {
        let code = self.trim();
        if code.is_empty() || !code.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let width = usize::from(digits.get());
        let excess = code.len().saturating_sub(width);
        let zeros = code.bytes().take(excess).take_while(|b| *b == b'0').count();
        Some(format!("{:0>width$}", &code[zeros..], width = width))
    }
}

impl SubmittedCode for String {
    fn canonical(&self, digits: Digits) -> Option<String> {
        self.as_str().canonical(digits)
    }
}

impl<T: SubmittedCode + ?Sized> SubmittedCode for &'_ T {
    fn canonical(&self, digits: Digits) -> Option<String> {
        (**self).canonical(digits)
    }
}

/// HOTP error type.
#[derive(Clone, Debug, Eq, Hash, PartialEq, thiserror::Error)]
pub enum HotpError {
    /// The requested look-ahead window exceeds [`MAX_LOOK_AHEAD`].
    #[error("look-ahead window of {0} exceeds the maximum of {max}", max = MAX_LOOK_AHEAD)]
    LookAheadWindow(u8),
    /// The named hash algorithm is not one of SHA1, SHA256, or SHA512.
    #[error("unsupported hash algorithm `{0}`")]
    UnsupportedAlgorithm(String),
    /// The digest could not supply four bytes at the truncation offset.
    ///
    /// This indicates an internal fault and is never produced by the supported algorithms.
    #[error("cannot truncate a {len}-byte digest at offset {offset}")]
    Truncation {
        /// Length of the offending digest.
        len: usize,
        /// Offset read from the digest's final nibble.
        offset: usize,
    },
    /// The provided secret was empty.
    #[error("secret must not be empty")]
    EmptySecret,
    /// The requested number of digits was outside of the range [1, 9].
    #[error("{0} digits is outside the supported range 1..=9")]
    Digits(u8),
    /// The text is not valid RFC 4648 base32.
    #[error("secret is not valid base32")]
    SecretEncoding,
    /// The system random number generator failed.
    #[error("system random number generator failed")]
    Entropy,
    /// An `otpauth://` URI could not be parsed.
    #[error("invalid otpauth URI: {0}")]
    Uri(String),
}

pub type Result<T> = core::result::Result<T, HotpError>;

/// Computes the "raw" HOTP value for the given secret and counter.
///
/// This is the dynamically truncated 31-bit integer of [RFC 4226 §5.3][53]; no reduction to a
/// number of digits is performed. For a formatted code, see [`hotp`].
///
/// # Errors
///
/// Returns [`HotpError::EmptySecret`] for a zero-length secret.
///
/// [53]: https://datatracker.ietf.org/doc/html/rfc4226#section-5.3
pub fn raw_hotp<S: Secret, C: Counter>(secret: S, counter: C, algorithm: Algorithm) -> Result<u32> {
    let key: &[u8] = secret.as_ref();
    if key.is_empty() {
        return Err(HotpError::EmptySecret);
    }
    digest::hmac(key, counter.value(), algorithm).truncate()
}

/// Computes an HOTP code of the desired length given a secret and counter value.
///
/// Unlike [`raw_hotp`], the value is reduced modulo 10<sup>digits</sup> and rendered in its
/// canonical zero-padded form.
///
/// ```rust
/// use hotp_session::{hotp, Algorithm, Digits};
///
/// let code = hotp(b"12345678901234567890", 4_u64, Digits::SEVEN, Algorithm::Sha1)?;
/// assert_eq!(code, "0338314");
/// # Ok::<(), hotp_session::HotpError>(())
/// ```
///
/// # Errors
///
/// Returns [`HotpError::EmptySecret`] for a zero-length secret.
pub fn hotp<S: Secret, C: Counter>(
    secret: S,
    counter: C,
    digits: Digits,
    algorithm: Algorithm,
) -> Result<String> {
    raw_hotp(secret, counter, algorithm).map(|value| format(value, digits))
}

/// Checks a submitted code against a single counter value without any state.
///
/// No look-ahead is performed; see [`Hotp::validate`] for the resynchronizing version.
///
/// # Errors
///
/// Returns [`HotpError::EmptySecret`] for a zero-length secret. A code that does not match is
/// `Ok(false)`, not an error.
pub fn validate<S: Secret, C: Counter, T: SubmittedCode>(
    secret: S,
    counter: C,
    digits: Digits,
    algorithm: Algorithm,
    code: T,
) -> Result<bool> {
    let expected = hotp(secret, counter, digits, algorithm)?;
    Ok(code
        .canonical(digits)
        .map_or(false, |submitted| submitted == expected))
}
