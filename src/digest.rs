//! HMAC digest types and dynamic truncation.

use core::{fmt, str::FromStr};

use ring::hmac::{
    self, sign, Key as HmacKey, Tag, HMAC_SHA1_FOR_LEGACY_USE_ONLY as HMAC_SHA1, HMAC_SHA256,
    HMAC_SHA512,
};
use tracing::warn;

use crate::{HotpError, Result};

/// Keyed-hash algorithm used to derive HOTP digests.
///
/// [RFC 4226][4226] prescribes HMAC-SHA1. [RFC 6238][6238] extends the same construction to
/// HMAC-SHA256 and HMAC-SHA512, and authenticator apps accept all three for counter-based codes
/// too. The set is closed; dynamic truncation only depends on the digest length.
///
/// [4226]: https://datatracker.ietf.org/doc/html/rfc4226
/// [6238]: https://datatracker.ietf.org/doc/html/rfc6238
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Algorithm {
    /// HMAC-SHA1, 20-byte digests.
    #[default]
    Sha1,
    /// HMAC-SHA256, 32-byte digests.
    Sha256,
    /// HMAC-SHA512, 64-byte digests.
    Sha512,
}

impl Algorithm {
    /// Length in bytes of digests produced by this algorithm.
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha512 => 64,
        }
    }

    /// Name as written in `otpauth://` URIs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
        }
    }

    fn hmac(self) -> hmac::Algorithm {
        match self {
            Self::Sha1 => HMAC_SHA1,
            Self::Sha256 => HMAC_SHA256,
            Self::Sha512 => HMAC_SHA512,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses `sha1`, `SHA-256`, `Sha512`, and similar spellings.
impl FromStr for Algorithm {
    type Err = HotpError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        match normalized.as_str() {
            "SHA1" => Ok(Self::Sha1),
            "SHA256" => Ok(Self::Sha256),
            "SHA512" => Ok(Self::Sha512),
            _ => Err(HotpError::UnsupportedAlgorithm(s.to_owned())),
        }
    }
}

impl TryFrom<&str> for Algorithm {
    type Error = HotpError;

    fn try_from(s: &str) -> Result<Self> {
        s.parse()
    }
}

/// Trait enabling dynamic truncation of any digest.
///
/// The provided [`HmacDigest`] is what the rest of the crate uses. Raw byte arrays implement
/// `Digest` as well, which is convenient for checking the worked example of
/// [RFC 4226 §5.4][54].
///
/// [54]: https://datatracker.ietf.org/doc/html/rfc4226#section-5.4
pub trait Digest: AsRef<[u8]> {
    /// Dynamically truncate the digest to a 31-bit integer ([RFC 4226 §5.3][53]).
    ///
    /// The low nibble of the final byte selects a four-byte window, whose big-endian value has
    /// its top bit cleared. No reduction modulo a power of ten is performed here.
    ///
    /// # Errors
    ///
    /// Returns [`HotpError::Truncation`] when the digest is too short to supply four bytes at
    /// the selected offset. This cannot happen for any digest of 19 bytes or more, so it is
    /// never observed for the supported algorithms.
    ///
    /// [53]: https://datatracker.ietf.org/doc/html/rfc4226#section-5.3
    fn truncate(&self) -> Result<u32> {
        let digest = self.as_ref();
        let len = digest.len();
        // Dynamic truncation: the four lowest-order bits of the last byte give the offset
        let offset = digest.last().map_or(0, |last| usize::from(last & 0xf));
        let window = digest.get(offset..offset + 4).ok_or_else(|| {
            warn!(len, offset, "digest too short for dynamic truncation");
            HotpError::Truncation { len, offset }
        })?;
        let bytes = [
            // Strip leading bit to remove signed/unsigned ambiguity
            window[0] & 0x7f,
            window[1],
            window[2],
            window[3],
        ];
        Ok(u32::from_be_bytes(bytes))
    }
}

impl<const N: usize> Digest for [u8; N] {}

/// HMAC digest of a counter, tagged with the algorithm that produced it.
#[derive(Clone, Copy, Debug)]
pub struct HmacDigest {
    algorithm: Algorithm,
    tag: Tag,
}

impl HmacDigest {
    /// Algorithm that produced this digest.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

impl AsRef<[u8]> for HmacDigest {
    fn as_ref(&self) -> &[u8] {
        self.tag.as_ref()
    }
}

impl Digest for HmacDigest {}

/// Computes HMAC(`key`, big-endian `counter`) with the given algorithm.
///
/// Any key length is accepted here; rejecting empty secrets is left to the callers that own
/// them.
pub fn hmac(key: &[u8], counter: u64, algorithm: Algorithm) -> HmacDigest {
    let key = HmacKey::new(algorithm.hmac(), key);
    HmacDigest {
        algorithm,
        tag: sign(&key, &counter.to_be_bytes()),
    }
}
