//! HOTP code lengths and canonical decimal formatting.

use core::fmt;

use crate::{HotpError, Result};

/// Number of decimal digits in a code.
///
/// [RFC 4226][4226] requires at least 6 digits and its Appendix E allows up to 9. This type
/// accepts anything from 1 to 9: the truncated value has 31 bits, so 10<sup>9</sup> is the
/// largest power of ten that still yields a meaningful reduction.
///
/// [4226]: https://datatracker.ietf.org/doc/html/rfc4226
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Digits(u8);

impl Digits {
    /// Shortest accepted code length.
    pub const MIN: u8 = 1;
    /// Longest accepted code length.
    pub const MAX: u8 = 9;

    /// Six digits, the RFC 4226 minimum and the usual default.
    pub const SIX: Self = Self(6);
    /// Seven digits.
    pub const SEVEN: Self = Self(7);
    /// Eight digits.
    pub const EIGHT: Self = Self(8);

    /// Validates a digit count.
    ///
    /// # Errors
    ///
    /// Returns [`HotpError::Digits`] unless `1 <= digits <= 9`.
    pub fn new(digits: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&digits) {
            Ok(Self(digits))
        } else {
            Err(HotpError::Digits(digits))
        }
    }

    /// The digit count as a plain integer.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// 10<sup>digits</sup>, the modulus applied to truncated values.
    pub fn modulus(self) -> u32 {
        10_u32.pow(self.0.into())
    }
}

impl Default for Digits {
    fn default() -> Self {
        Self::SIX
    }
}

impl TryFrom<u8> for Digits {
    type Error = HotpError;

    fn try_from(digits: u8) -> Result<Self> {
        Self::new(digits)
    }
}

impl From<Digits> for u8 {
    fn from(digits: Digits) -> Self {
        digits.0
    }
}

impl fmt::Display for Digits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Reduces a truncated value modulo 10<sup>digits</sup> and renders it zero-padded.
///
/// ```rust
/// use hotp_session::{format, Digits};
///
/// assert_eq!(format(82, Digits::SIX), "000082");
/// assert_eq!(format(1_234_567, Digits::SIX), "234567");
/// ```
pub fn format(truncated: u32, digits: Digits) -> String {
    format!(
        "{:0width$}",
        truncated % digits.modulus(),
        width = usize::from(digits.get())
    )
}
