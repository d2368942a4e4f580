//! Stateful HOTP verifier with counter resynchronization.

use core::fmt;

use tracing::{debug, trace};

use crate::{
    digest::Algorithm, hotp, length::Digits, secret::encode_secret, HotpError, Result, Secret,
    SubmittedCode,
};

/// Largest accepted look-ahead window.
pub const MAX_LOOK_AHEAD: u8 = 10;

/// An HOTP session: a secret bound to a moving counter.
///
/// The session owns its counter. Code generation never mutates it; a successful
/// [`validate`](Hotp::validate) does. Sessions are plain values with no interior mutability, so
/// sharing one between threads needs an external lock (for instance a `Mutex<Hotp>`) around
/// every `validate` call.
///
/// # Counter advance
///
/// The two ways a code can be accepted move the counter differently:
///
/// * a match at the current counter `c` advances the counter to `c + 1`;
/// * a match found by look-ahead at `c + i` (`1 <= i <= window`) sets the counter to exactly
///   `c + i`, *not* `c + i + 1`.
///
/// After a look-ahead match the stored counter is the one the client just used. Callers that
/// treat the counter as "next value the client will send" must increment it themselves (see
/// [`increment_counter`](Hotp::increment_counter)); otherwise the same code is accepted once
/// more at the current counter.
#[derive(Clone, Eq, PartialEq)]
pub struct Hotp {
    secret: Vec<u8>,
    counter: u64,
    digits: Digits,
    algorithm: Algorithm,
    look_ahead: u8,
}

impl Hotp {
    /// Creates a session using HMAC-SHA1 and no look-ahead.
    ///
    /// # Errors
    ///
    /// Returns [`HotpError::EmptySecret`] for a zero-length secret.
    pub fn new<S: Secret>(secret: S, counter: u64, digits: Digits) -> Result<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(HotpError::EmptySecret);
        }
        Ok(Self {
            secret: secret.to_vec(),
            counter,
            digits,
            algorithm: Algorithm::default(),
            look_ahead: 0,
        })
    }

    /// Builder form of [`set_algorithm`](Hotp::set_algorithm).
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Builder form of [`set_look_ahead_window`](Hotp::set_look_ahead_window).
    ///
    /// # Errors
    ///
    /// Returns [`HotpError::LookAheadWindow`] if `window` exceeds [`MAX_LOOK_AHEAD`].
    pub fn with_look_ahead_window(mut self, window: u8) -> Result<Self> {
        self.set_look_ahead_window(window)?;
        Ok(self)
    }

    /// Sets how many counter values past the current one [`validate`](Hotp::validate) probes.
    ///
    /// Zero disables resynchronization.
    ///
    /// # Errors
    ///
    /// Returns [`HotpError::LookAheadWindow`] if `window` exceeds [`MAX_LOOK_AHEAD`]; the
    /// previous window is kept.
    pub fn set_look_ahead_window(&mut self, window: u8) -> Result<()> {
        if window > MAX_LOOK_AHEAD {
            return Err(HotpError::LookAheadWindow(window));
        }
        self.look_ahead = window;
        Ok(())
    }

    /// Number of counter values probed past the current one.
    pub fn look_ahead_window(&self) -> u8 {
        self.look_ahead
    }

    /// Switches the hash algorithm. The counter is untouched.
    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        self.algorithm = algorithm;
    }

    /// Selects the hash algorithm by name, such as `"sha256"`.
    ///
    /// # Errors
    ///
    /// Returns [`HotpError::UnsupportedAlgorithm`] for anything but SHA1, SHA256, or SHA512;
    /// the current algorithm is kept.
    pub fn set_algorithm_name(&mut self, name: &str) -> Result<()> {
        self.algorithm = name.parse()?;
        Ok(())
    }

    /// Hash algorithm in use.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Length of generated codes, fixed for the session's lifetime.
    pub fn digits(&self) -> Digits {
        self.digits
    }

    /// Counter the next code will be derived from.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Overrides the counter, for instance after loading it from storage.
    pub fn set_counter(&mut self, counter: u64) {
        self.counter = counter;
    }

    /// Advances the counter by one, saturating at `u64::MAX`.
    pub fn increment_counter(&mut self) {
        self.counter = self.counter.saturating_add(1);
    }

    /// Raw secret bytes.
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// The secret as unpadded base32, the form authenticator apps expect.
    pub fn secret_base32(&self) -> String {
        encode_secret(&self.secret)
    }

    /// The code for the current counter. Does not advance the counter.
    ///
    /// # Errors
    ///
    /// Only an internal truncation fault, which the supported algorithms never produce.
    pub fn calculate(&self) -> Result<String> {
        self.code_at(self.counter)
    }

    fn code_at(&self, counter: u64) -> Result<String> {
        hotp(self.secret.as_slice(), counter, self.digits, self.algorithm)
    }

    /// Checks a submitted code, resynchronizing the counter if it is found within the
    /// look-ahead window.
    ///
    /// The current counter is tried first, then `counter + 1` through
    /// `counter + look_ahead_window` in order. See the [type-level docs](Hotp#counter-advance)
    /// for how each kind of match moves the counter. On `Ok(false)` the counter is unchanged.
    ///
    /// ```rust
    /// use hotp_session::{hotp, Algorithm, Digits, Hotp};
    ///
    /// let secret = b"12345678901234567890";
    /// let mut server = Hotp::new(secret, 0, Digits::SIX)?.with_look_ahead_window(5)?;
    ///
    /// // The client has generated three codes the server never saw.
    /// let code = hotp(secret, 3_u64, Digits::SIX, Algorithm::Sha1)?;
    /// assert!(server.validate(code.as_str())?);
    /// assert_eq!(server.counter(), 3);
    /// # Ok::<(), hotp_session::HotpError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Only an internal truncation fault. A code that does not match is `Ok(false)`.
    pub fn validate<C: SubmittedCode>(&mut self, code: C) -> Result<bool> {
        let Some(submitted) = code.canonical(self.digits) else {
            trace!(counter = self.counter, "rejected code that is not a decimal number");
            return Ok(false);
        };

        if self.code_at(self.counter)? == submitted {
            self.counter = self.counter.saturating_add(1);
            trace!(counter = self.counter, "code accepted at current counter");
            return Ok(true);
        }

        for step in 1..=u64::from(self.look_ahead) {
            let Some(candidate) = self.counter.checked_add(step) else {
                break;
            };
            if self.code_at(candidate)? == submitted {
                debug!(
                    from = self.counter,
                    to = candidate,
                    "counter resynchronized within look-ahead window"
                );
                self.counter = candidate;
                return Ok(true);
            }
        }

        trace!(
            counter = self.counter,
            window = self.look_ahead,
            "code rejected"
        );
        Ok(false)
    }
}

impl fmt::Debug for Hotp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hotp")
            .field("secret", &"<redacted>")
            .field("counter", &self.counter)
            .field("digits", &self.digits)
            .field("algorithm", &self.algorithm)
            .field("look_ahead", &self.look_ahead)
            .finish()
    }
}
