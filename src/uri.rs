//! `otpauth://hotp` provisioning URIs, in the Key URI format understood by authenticator apps.
//!
//! ```text
//! otpauth://hotp/ISSUER:LABEL?secret=BASE32&issuer=ISSUER&algorithm=SHA1&digits=6&counter=0
//! ```

use core::fmt;
use std::env;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use url::Url;

use crate::{
    digest::Algorithm,
    length::Digits,
    secret::decode_secret,
    session::Hotp,
    HotpError, Result,
};

/// Characters escaped in the issuer and label path segments. `:` separates the two, and `%`
/// must survive a decode on the way back.
const LABEL: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'/')
    .add(b':')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Display name of the service issuing the secret.
///
/// The issuer is passed explicitly wherever a URI is built. [`Issuer::from_env`] reads it from
/// the environment at call time for callers that want that.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Issuer(String);

impl Issuer {
    /// Environment variable read by [`Issuer::from_env`].
    pub const ENV_VAR: &'static str = "ISSUER";
    /// Issuer used when none is configured.
    pub const DEFAULT: &'static str = "hotp";

    /// Wraps a display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Reads `$ISSUER`, falling back to [`Issuer::DEFAULT`] when it is unset or empty.
    pub fn from_env() -> Self {
        Self::or_default(env::var(Self::ENV_VAR).ok())
    }

    fn or_default(name: Option<String>) -> Self {
        match name {
            Some(name) if !name.trim().is_empty() => Self(name),
            _ => Self::default(),
        }
    }

    /// The display name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Issuer {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl fmt::Display for Issuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn uri_error(message: impl fmt::Display) -> HotpError {
    HotpError::Uri(message.to_string())
}

/// Serializes a session's current state as a provisioning URI.
///
/// The label (typically an account name) is prefixed with the issuer, and the counter is the
/// session's current one, so a URI built right after a validation resumes in step.
///
/// # Errors
///
/// Returns [`HotpError::Uri`] if the label or issuer cannot form a URI path.
pub fn provisioning_uri(session: &Hotp, label: &str, issuer: &Issuer) -> Result<String> {
    let mut uri = Url::parse("otpauth://hotp/").map_err(uri_error)?;
    uri.set_path(&format!(
        "/{}:{}",
        utf8_percent_encode(issuer.as_str(), LABEL),
        utf8_percent_encode(label, LABEL)
    ));
    uri.query_pairs_mut()
        .append_pair("secret", &session.secret_base32())
        .append_pair("issuer", issuer.as_str())
        .append_pair("algorithm", session.algorithm().name())
        .append_pair("digits", &session.digits().to_string())
        .append_pair("counter", &session.counter().to_string());
    Ok(uri.into())
}

/// Session parameters read back from a provisioning URI.
#[derive(Clone, Eq, PartialEq)]
pub struct Provisioning {
    /// Issuer from the `issuer` parameter, or else from the label prefix.
    pub issuer: Option<Issuer>,
    /// Account name, without the issuer prefix.
    pub label: String,
    /// Decoded secret bytes.
    pub secret: Vec<u8>,
    /// Hash algorithm, SHA1 when absent.
    pub algorithm: Algorithm,
    /// Code length, 6 when absent.
    pub digits: Digits,
    /// Counter the client will use next.
    pub counter: u64,
}

impl Provisioning {
    /// Builds a session from these parameters, with no look-ahead.
    ///
    /// # Errors
    ///
    /// Returns [`HotpError::EmptySecret`] if the decoded secret is empty.
    pub fn into_session(self) -> Result<Hotp> {
        Ok(Hotp::new(self.secret, self.counter, self.digits)?.with_algorithm(self.algorithm))
    }
}

impl fmt::Debug for Provisioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provisioning")
            .field("issuer", &self.issuer)
            .field("label", &self.label)
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("digits", &self.digits)
            .field("counter", &self.counter)
            .finish()
    }
}

/// Parses an `otpauth://hotp/...` URI.
///
/// `secret` and `counter` are required. `algorithm` defaults to SHA1 and `digits` to 6. The
/// `issuer` parameter wins over an `ISSUER:` prefix on the label. Unknown parameters are
/// ignored.
///
/// # Errors
///
/// [`HotpError::Uri`] for a malformed or non-HOTP URI, plus whatever decoding the secret,
/// algorithm, or digit count reports.
pub fn parse_provisioning_uri(text: &str) -> Result<Provisioning> {
    let uri = Url::parse(text.trim()).map_err(uri_error)?;
    if uri.scheme() != "otpauth" {
        return Err(uri_error(format_args!(
            "expected scheme `otpauth`, got `{}`",
            uri.scheme()
        )));
    }
    match uri.host_str() {
        Some(kind) if kind.eq_ignore_ascii_case("hotp") => {}
        other => {
            return Err(uri_error(format_args!(
                "expected an hotp URI, got {:?}",
                other
            )))
        }
    }

    // Split before decoding so an escaped `:` stays inside its segment
    let path = uri.path();
    let path = path.strip_prefix('/').unwrap_or(path);
    let (path_issuer, label) = match path.split_once(':') {
        Some((issuer, label)) => (Some(decode_segment(issuer)?), decode_segment(label)?),
        None => (None, decode_segment(path)?),
    };

    let mut secret = None;
    let mut issuer = None;
    let mut algorithm = Algorithm::default();
    let mut digits = Digits::default();
    let mut counter = None;
    for (key, value) in uri.query_pairs() {
        match key.as_ref() {
            "secret" => secret = Some(decode_secret(&value)?),
            "issuer" => issuer = Some(value.into_owned()),
            "algorithm" => algorithm = value.parse()?,
            "digits" => {
                let n = value
                    .parse::<u8>()
                    .map_err(|e| uri_error(format_args!("digits: {}", e)))?;
                digits = Digits::new(n)?;
            }
            "counter" => {
                counter = Some(
                    value
                        .parse::<u64>()
                        .map_err(|e| uri_error(format_args!("counter: {}", e)))?,
                );
            }
            _ => {}
        }
    }

    Ok(Provisioning {
        issuer: issuer
            .or(path_issuer)
            .filter(|name| !name.is_empty())
            .map(Issuer),
        label,
        secret: secret.ok_or_else(|| uri_error("missing `secret` parameter"))?,
        algorithm,
        digits,
        counter: counter.ok_or_else(|| uri_error("missing `counter` parameter"))?,
    })
}

fn decode_segment(segment: &str) -> Result<String> {
    percent_decode_str(segment)
        .decode_utf8()
        .map(|decoded| decoded.trim().to_owned())
        .map_err(uri_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8; 20] = b"12345678901234567890";

    #[test]
    fn builds_key_uri() {
        let session = Hotp::new(SECRET, 0, Digits::SIX).unwrap();
        assert_eq!(
            provisioning_uri(&session, "alice", &Issuer::new("ACME")).unwrap(),
            "otpauth://hotp/ACME:alice?secret=GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ\
             &issuer=ACME&algorithm=SHA1&digits=6&counter=0"
        );
    }

    #[test]
    fn reflects_current_state() {
        let mut session = Hotp::new(SECRET, 0, Digits::EIGHT)
            .unwrap()
            .with_algorithm(Algorithm::Sha256);
        session.set_counter(41);
        let uri = provisioning_uri(&session, "bob", &Issuer::default()).unwrap();
        assert!(uri.starts_with("otpauth://hotp/hotp:bob?"));
        assert!(uri.contains("algorithm=SHA256"));
        assert!(uri.contains("digits=8"));
        assert!(uri.ends_with("counter=41"));
    }

    #[test]
    fn parses_what_it_builds() {
        let session = Hotp::new(SECRET, 7, Digits::SEVEN)
            .unwrap()
            .with_algorithm(Algorithm::Sha512);
        let uri = provisioning_uri(&session, "alice@example.com", &Issuer::new("ACME Co")).unwrap();
        let parsed = parse_provisioning_uri(&uri).unwrap();
        assert_eq!(parsed.issuer, Some(Issuer::new("ACME Co")));
        assert_eq!(parsed.label, "alice@example.com");
        assert_eq!(parsed.secret, SECRET);
        assert_eq!(parsed.algorithm, Algorithm::Sha512);
        assert_eq!(parsed.digits, Digits::SEVEN);
        assert_eq!(parsed.counter, 7);
        assert_eq!(parsed.into_session().unwrap(), session);
    }

    #[test]
    fn escapes_issuer_and_label() {
        let session = Hotp::new(SECRET, 0, Digits::SIX).unwrap();
        let issuer = Issuer::new("ACME:Labs");
        let uri = provisioning_uri(&session, "a%41b", &issuer).unwrap();
        assert!(uri.starts_with("otpauth://hotp/ACME%3ALabs:a%2541b?"));

        let parsed = parse_provisioning_uri(&uri).unwrap();
        assert_eq!(parsed.issuer, Some(issuer));
        assert_eq!(parsed.label, "a%41b");
    }

    #[test]
    fn escaped_colon_stays_in_label_prefix() {
        let parsed =
            parse_provisioning_uri("otpauth://hotp/ACME%3ALabs:a%3Ab?secret=MZXW6&counter=0")
                .unwrap();
        assert_eq!(parsed.issuer, Some(Issuer::new("ACME:Labs")));
        assert_eq!(parsed.label, "a:b");
    }

    #[test]
    fn parses_minimal_uri() {
        let parsed =
            parse_provisioning_uri("otpauth://hotp/alice?secret=GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ&counter=3")
                .unwrap();
        assert_eq!(parsed.issuer, None);
        assert_eq!(parsed.label, "alice");
        assert_eq!(parsed.algorithm, Algorithm::Sha1);
        assert_eq!(parsed.digits, Digits::SIX);
        assert_eq!(parsed.into_session().unwrap().calculate().unwrap(), "969429");
    }

    #[test]
    fn issuer_parameter_wins_over_prefix() {
        let parsed = parse_provisioning_uri(
            "otpauth://hotp/Old:alice?secret=MZXW6&issuer=New&counter=0",
        )
        .unwrap();
        assert_eq!(parsed.issuer, Some(Issuer::new("New")));
        assert_eq!(parsed.label, "alice");
    }

    #[test]
    fn rejects_bad_uris() {
        assert!(matches!(
            parse_provisioning_uri("otpauth://totp/alice?secret=MZXW6&counter=0"),
            Err(HotpError::Uri(_))
        ));
        assert!(matches!(
            parse_provisioning_uri("https://hotp/alice?secret=MZXW6&counter=0"),
            Err(HotpError::Uri(_))
        ));
        assert!(matches!(
            parse_provisioning_uri("otpauth://hotp/alice?counter=0"),
            Err(HotpError::Uri(_))
        ));
        assert!(matches!(
            parse_provisioning_uri("otpauth://hotp/alice?secret=MZXW6"),
            Err(HotpError::Uri(_))
        ));
        assert!(matches!(
            parse_provisioning_uri("otpauth://hotp/alice?secret=MZXW6&counter=-1"),
            Err(HotpError::Uri(_))
        ));
        assert_eq!(
            parse_provisioning_uri("otpauth://hotp/alice?secret=MZXW6&counter=0&algorithm=MD5")
                .unwrap_err(),
            HotpError::UnsupportedAlgorithm("MD5".into())
        );
        assert_eq!(
            parse_provisioning_uri("otpauth://hotp/alice?secret=MZXW6&counter=0&digits=12")
                .unwrap_err(),
            HotpError::Digits(12)
        );
        assert_eq!(
            parse_provisioning_uri("otpauth://hotp/alice?secret=1111&counter=0").unwrap_err(),
            HotpError::SecretEncoding
        );
    }

    #[test]
    fn issuer_fallback() {
        assert_eq!(Issuer::or_default(None).as_str(), "hotp");
        assert_eq!(Issuer::or_default(Some(String::new())).as_str(), "hotp");
        assert_eq!(Issuer::or_default(Some("ACME".into())).as_str(), "ACME");
    }

    #[test]
    fn issuer_from_env() {
        temp_env::with_var(Issuer::ENV_VAR, Some("Example Corp"), || {
            assert_eq!(Issuer::from_env(), Issuer::new("Example Corp"));
        });
        temp_env::with_var_unset(Issuer::ENV_VAR, || {
            assert_eq!(Issuer::from_env(), Issuer::default());
        });
    }
}
