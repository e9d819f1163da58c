//! JSON Web Token issue and verification.
//!
//! Only algorithms named in the configuration are accepted. The header
//! algorithm is checked against that allow-list before any signature work,
//! so a token signed with anything else is rejected as
//! [`JwtError::UnsupportedAlgorithm`] whether or not its signature is valid.
//!
//! Parsed claims are split into the registered half and a caller-chosen
//! private half, both decoded from the same JSON object.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use mockable::Clock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::macros::define_error;

/// Minimum HMAC secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

define_error! {
    /// Construction and verification failures.
    pub enum JwtError {
        /// The HMAC secret is shorter than [`MIN_SECRET_LEN`].
        SecretTooShort { min: usize, actual: usize } =>
            "jwt secret must be at least {min} bytes, got {actual}",
        /// No issuer configured.
        MissingIssuer => "jwt issuer is required",
        /// The allow-list is empty.
        NoAlgorithms => "at least one jwt algorithm must be allowed",
        /// An allowed asymmetric algorithm has no key configured.
        MissingKey { algorithm: String } => "no key configured for {algorithm}",
        /// A configured key could not be loaded.
        InvalidKey { message: String } => "jwt key is invalid: {message}",
        /// The algorithm is outside the allow-list or has no backend.
        UnsupportedAlgorithm { algorithm: String } => "algorithm {algorithm} is not allowed",
        /// MAC or signature mismatch.
        SignatureInvalid => "token signature is invalid",
        /// `exp` is at or before now.
        TokenExpired => "token has expired",
        /// Malformed segments, base64 or JSON.
        ParseFailed { message: String } => "token could not be parsed: {message}",
        /// Any other invalidity, such as `nbf` in the future.
        InvalidToken { message: String } => "token is invalid: {message}",
        /// Claims could not be encoded or signed.
        IssueFailed { message: String } => "token could not be issued: {message}",
    }
}

/// The closed set of algorithms that may appear in an allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JwtAlgorithm {
    /// HMAC with SHA-256.
    HS256,
    /// HMAC with SHA-384.
    HS384,
    /// HMAC with SHA-512.
    HS512,
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    RS256,
    /// RSASSA-PKCS1-v1_5 with SHA-384.
    RS384,
    /// RSASSA-PKCS1-v1_5 with SHA-512.
    RS512,
    /// ECDSA P-256 with SHA-256.
    ES256,
    /// ECDSA P-384 with SHA-384.
    ES384,
    /// ECDSA P-521 with SHA-512.
    ///
    /// Recognised but unbacked: `jsonwebtoken` has no P-521 keys, so
    /// [`Jwt::new`] rejects an allow-list naming it.
    ES512,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyFamily {
    Hmac,
    Rsa,
    Ec,
}

impl JwtAlgorithm {
    /// Header name of the algorithm.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::ES512 => "ES512",
        }
    }

    const fn family(self) -> KeyFamily {
        match self {
            Self::HS256 | Self::HS384 | Self::HS512 => KeyFamily::Hmac,
            Self::RS256 | Self::RS384 | Self::RS512 => KeyFamily::Rsa,
            Self::ES256 | Self::ES384 | Self::ES512 => KeyFamily::Ec,
        }
    }

    const fn backend(self) -> Option<Algorithm> {
        match self {
            Self::HS256 => Some(Algorithm::HS256),
            Self::HS384 => Some(Algorithm::HS384),
            Self::HS512 => Some(Algorithm::HS512),
            Self::RS256 => Some(Algorithm::RS256),
            Self::RS384 => Some(Algorithm::RS384),
            Self::RS512 => Some(Algorithm::RS512),
            Self::ES256 => Some(Algorithm::ES256),
            Self::ES384 => Some(Algorithm::ES384),
            Self::ES512 => None,
        }
    }
}

impl FromStr for JwtAlgorithm {
    type Err = JwtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            "RS256" => Ok(Self::RS256),
            "RS384" => Ok(Self::RS384),
            "RS512" => Ok(Self::RS512),
            "ES256" => Ok(Self::ES256),
            "ES384" => Ok(Self::ES384),
            "ES512" => Ok(Self::ES512),
            other => Err(JwtError::unsupported_algorithm(other)),
        }
    }
}

impl fmt::Display for JwtAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_algorithms() -> Vec<String> {
    vec![JwtAlgorithm::HS256.as_str().to_owned()]
}

/// `jwt.*` configuration.
///
/// The first entry of `algorithms` signs issued tokens; every entry is
/// accepted when parsing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JwtConfig {
    /// HMAC secret, at least [`MIN_SECRET_LEN`] bytes.
    #[serde(default)]
    pub secret: String,
    /// Required `iss` value.
    #[serde(default)]
    pub issuer: String,
    /// Required `aud` value, when set.
    #[serde(default)]
    pub audience: Option<String>,
    /// Allow-list of header algorithms.
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<String>,
    /// PEM private key for the RS family.
    #[serde(default)]
    pub rsa_private_key_file: Option<PathBuf>,
    /// PEM public key for the RS family.
    #[serde(default)]
    pub rsa_public_key_file: Option<PathBuf>,
    /// PEM private key for the ES family.
    #[serde(default)]
    pub ec_private_key_file: Option<PathBuf>,
    /// PEM public key for the ES family.
    #[serde(default)]
    pub ec_public_key_file: Option<PathBuf>,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: String::new(),
            audience: None,
            algorithms: default_algorithms(),
            rsa_private_key_file: None,
            rsa_public_key_file: None,
            ec_private_key_file: None,
            ec_public_key_file: None,
        }
    }
}

/// `aud` as either a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// A single audience.
    One(String),
    /// Several audiences.
    Many(Vec<String>),
}

impl Audience {
    /// Whether `audience` is listed.
    #[must_use]
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Self::One(value) => value == audience,
            Self::Many(values) => values.iter().any(|value| value == audience),
        }
    }
}

/// RFC 7519 registered claims.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredClaims {
    /// Issuer.
    pub iss: Option<String>,
    /// Subject.
    pub sub: Option<String>,
    /// Audience.
    pub aud: Option<Audience>,
    /// Expiry, seconds since the epoch.
    pub exp: Option<i64>,
    /// Issued-at, seconds since the epoch.
    pub iat: Option<i64>,
    /// Not-before, seconds since the epoch.
    pub nbf: Option<i64>,
}

/// Both halves of a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims<P> {
    /// Registered claims.
    pub registered: RegisteredClaims,
    /// Caller-chosen claims.
    pub private: P,
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Stateless token issuer and verifier.
pub struct Jwt {
    issuer: String,
    audience: Option<String>,
    allowed: Vec<JwtAlgorithm>,
    signing: JwtAlgorithm,
    hmac: KeyPair,
    rsa: Option<KeyPair>,
    ec: Option<KeyPair>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Jwt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jwt")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("allowed", &self.allowed)
            .field("signing", &self.signing)
            .finish_non_exhaustive()
    }
}

fn read_pem(path: Option<&PathBuf>, algorithm: JwtAlgorithm) -> Result<Vec<u8>, JwtError> {
    let path = path.ok_or_else(|| JwtError::missing_key(algorithm.as_str()))?;
    std::fs::read(path)
        .map_err(|error| JwtError::invalid_key(format!("{}: {error}", path.display())))
}

fn key_error(error: &jsonwebtoken::errors::Error) -> JwtError {
    JwtError::invalid_key(error.to_string())
}

impl Jwt {
    /// Validate `config` and load the keys its allow-list needs.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::SecretTooShort`], [`JwtError::MissingIssuer`],
    /// [`JwtError::NoAlgorithms`], [`JwtError::UnsupportedAlgorithm`] for a
    /// name outside the closed set, [`JwtError::MissingKey`] or
    /// [`JwtError::InvalidKey`] for asymmetric families.
    pub fn new(config: &JwtConfig, clock: Arc<dyn Clock>) -> Result<Self, JwtError> {
        if config.secret.len() < MIN_SECRET_LEN {
            return Err(JwtError::secret_too_short(MIN_SECRET_LEN, config.secret.len()));
        }
        if config.issuer.trim().is_empty() {
            return Err(JwtError::missing_issuer());
        }
        let allowed = config
            .algorithms
            .iter()
            .map(|name| name.trim().parse::<JwtAlgorithm>())
            .collect::<Result<Vec<_>, _>>()?;
        let Some(&signing) = allowed.first() else {
            return Err(JwtError::no_algorithms());
        };
        if let Some(unbacked) = allowed.iter().find(|alg| alg.backend().is_none()) {
            return Err(JwtError::unsupported_algorithm(unbacked.as_str()));
        }

        let hmac = KeyPair {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
        };
        let rsa = match allowed.iter().find(|alg| alg.family() == KeyFamily::Rsa) {
            Some(&alg) => {
                let private = read_pem(config.rsa_private_key_file.as_ref(), alg)?;
                let public = read_pem(config.rsa_public_key_file.as_ref(), alg)?;
                Some(KeyPair {
                    encoding: EncodingKey::from_rsa_pem(&private).map_err(|e| key_error(&e))?,
                    decoding: DecodingKey::from_rsa_pem(&public).map_err(|e| key_error(&e))?,
                })
            }
            None => None,
        };
        let ec = match allowed.iter().find(|alg| alg.family() == KeyFamily::Ec) {
            Some(&alg) => {
                let private = read_pem(config.ec_private_key_file.as_ref(), alg)?;
                let public = read_pem(config.ec_public_key_file.as_ref(), alg)?;
                Some(KeyPair {
                    encoding: EncodingKey::from_ec_pem(&private).map_err(|e| key_error(&e))?,
                    decoding: DecodingKey::from_ec_pem(&public).map_err(|e| key_error(&e))?,
                })
            }
            None => None,
        };

        Ok(Self {
            issuer: config.issuer.clone(),
            audience: config.audience.clone().filter(|aud| !aud.is_empty()),
            allowed,
            signing,
            hmac,
            rsa,
            ec,
            clock,
        })
    }

    /// Algorithm used to sign issued tokens.
    #[must_use]
    pub const fn signing_algorithm(&self) -> JwtAlgorithm {
        self.signing
    }

    fn keys(&self, algorithm: JwtAlgorithm) -> Result<&KeyPair, JwtError> {
        match algorithm.family() {
            KeyFamily::Hmac => Some(&self.hmac),
            KeyFamily::Rsa => self.rsa.as_ref(),
            KeyFamily::Ec => self.ec.as_ref(),
        }
        .ok_or_else(|| JwtError::unsupported_algorithm(algorithm.as_str()))
    }

    /// Issue a token for `subject` expiring at `expires_at`.
    ///
    /// `private` must serialise to a JSON object (or `null`); its keys are
    /// merged with `iss`, `sub`, `exp`, `iat`, `nbf` and, when configured,
    /// `aud`. Registered keys win on collision.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::IssueFailed`] when the claims cannot be encoded or
    /// signed.
    pub fn issue<P: Serialize + ?Sized>(
        &self,
        subject: &str,
        expires_at: DateTime<Utc>,
        private: &P,
    ) -> Result<String, JwtError> {
        let mut claims = match serde_json::to_value(private)
            .map_err(|error| JwtError::issue_failed(error.to_string()))?
        {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => {
                return Err(JwtError::issue_failed(
                    "private claims must serialise to a JSON object",
                ));
            }
        };
        let now = self.clock.utc().timestamp();
        claims.insert("iss".to_owned(), Value::from(self.issuer.clone()));
        claims.insert("sub".to_owned(), Value::from(subject));
        claims.insert("exp".to_owned(), Value::from(expires_at.timestamp()));
        claims.insert("iat".to_owned(), Value::from(now));
        claims.insert("nbf".to_owned(), Value::from(now));
        if let Some(audience) = &self.audience {
            claims.insert("aud".to_owned(), Value::from(audience.clone()));
        }

        let backend = self
            .signing
            .backend()
            .ok_or_else(|| JwtError::unsupported_algorithm(self.signing.as_str()))?;
        let key = self.keys(self.signing)?;
        encode(&Header::new(backend), &Value::Object(claims), &key.encoding)
            .map_err(|error| JwtError::issue_failed(error.to_string()))
    }

    /// Issue a token expiring `ttl` from now.
    ///
    /// # Errors
    ///
    /// As [`Jwt::issue`], plus [`JwtError::IssueFailed`] when `ttl` overflows.
    pub fn issue_with_ttl<P: Serialize + ?Sized>(
        &self,
        subject: &str,
        ttl: Duration,
        private: &P,
    ) -> Result<String, JwtError> {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| self.clock.utc().checked_add_signed(ttl))
            .ok_or_else(|| JwtError::issue_failed("ttl is out of range"))?;
        self.issue(subject, expires_at, private)
    }

    /// Verify `token` and decode both claim halves.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::UnsupportedAlgorithm`], [`JwtError::SignatureInvalid`],
    /// [`JwtError::TokenExpired`], [`JwtError::ParseFailed`] or
    /// [`JwtError::InvalidToken`].
    pub fn parse<P: DeserializeOwned>(&self, token: &str) -> Result<Claims<P>, JwtError> {
        let algorithm = self.header_algorithm(token)?;
        let backend = algorithm
            .backend()
            .ok_or_else(|| JwtError::unsupported_algorithm(algorithm.as_str()))?;
        let key = self.keys(algorithm)?;

        let mut validation = Validation::new(backend);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let raw = decode::<Value>(token, &key.decoding, &validation)
            .map_err(|error| classify_decode_error(&error))?
            .claims;
        let registered: RegisteredClaims = serde_json::from_value(raw.clone())
            .map_err(|error| JwtError::parse_failed(error.to_string()))?;
        self.check_registered(&registered)?;
        let private: P = serde_json::from_value(raw)
            .map_err(|error| JwtError::parse_failed(error.to_string()))?;
        Ok(Claims {
            registered,
            private,
        })
    }

    /// Verify `token` and issue a fresh one with the same subject and private
    /// claims, expiring at `expires_at`.
    ///
    /// # Errors
    ///
    /// Any [`Jwt::parse`] failure, [`JwtError::InvalidToken`] when the token
    /// has no subject, or an [`Jwt::issue`] failure.
    pub fn refresh<P>(&self, token: &str, expires_at: DateTime<Utc>) -> Result<String, JwtError>
    where
        P: Serialize + DeserializeOwned,
    {
        let claims = self.parse::<P>(token)?;
        let subject = claims
            .registered
            .sub
            .ok_or_else(|| JwtError::invalid_token("token has no subject"))?;
        self.issue(&subject, expires_at, &claims.private)
    }

    fn header_algorithm(&self, token: &str) -> Result<JwtAlgorithm, JwtError> {
        let mut segments = token.split('.');
        let (Some(header), Some(_), Some(_), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(JwtError::parse_failed("expected three dot-separated segments"));
        };
        let bytes = URL_SAFE_NO_PAD
            .decode(header.trim_end_matches('='))
            .map_err(|error| JwtError::parse_failed(error.to_string()))?;
        let header: Value = serde_json::from_slice(&bytes)
            .map_err(|error| JwtError::parse_failed(error.to_string()))?;
        let name = header
            .get("alg")
            .and_then(Value::as_str)
            .ok_or_else(|| JwtError::parse_failed("header has no alg"))?;
        let algorithm = name.parse::<JwtAlgorithm>()?;
        if self.allowed.contains(&algorithm) {
            Ok(algorithm)
        } else {
            Err(JwtError::unsupported_algorithm(name))
        }
    }

    fn check_registered(&self, claims: &RegisteredClaims) -> Result<(), JwtError> {
        let now = self.clock.utc().timestamp();
        let exp = claims
            .exp
            .ok_or_else(|| JwtError::invalid_token("token has no exp"))?;
        if exp <= now {
            return Err(JwtError::token_expired());
        }
        if let Some(nbf) = claims.nbf.filter(|nbf| *nbf > now) {
            return Err(JwtError::invalid_token(format!(
                "token is not valid before {nbf}"
            )));
        }
        if claims.iss.as_deref() != Some(self.issuer.as_str()) {
            return Err(JwtError::invalid_token("unexpected issuer"));
        }
        if let Some(expected) = &self.audience {
            let matches = claims
                .aud
                .as_ref()
                .is_some_and(|aud| aud.contains(expected));
            if !matches {
                return Err(JwtError::invalid_token("unexpected audience"));
            }
        }
        Ok(())
    }
}

fn classify_decode_error(error: &jsonwebtoken::errors::Error) -> JwtError {
    match error.kind() {
        ErrorKind::InvalidSignature => JwtError::signature_invalid(),
        ErrorKind::ExpiredSignature => JwtError::token_expired(),
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => JwtError::parse_failed(error.to_string()),
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            JwtError::unsupported_algorithm(error.to_string())
        }
        _ => JwtError::invalid_token(error.to_string()),
    }
}

#[cfg(test)]
#[path = "jwt_tests.rs"]
mod tests;
