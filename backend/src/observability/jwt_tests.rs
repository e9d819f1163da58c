//! Tests for token issue and verification.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Local, TimeZone, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use mockable::Clock;
use rstest::{fixture, rstest};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::*;

const SECRET: &str = "0123456789abcdef0123456789abcdef";

struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Role {
    role: String,
    tenant: u32,
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
        .single()
        .expect("valid fixture instant")
}

fn config() -> JwtConfig {
    JwtConfig {
        secret: SECRET.to_owned(),
        issuer: "member-service".to_owned(),
        algorithms: vec!["HS256".to_owned()],
        ..JwtConfig::default()
    }
}

fn build(config: &JwtConfig) -> Jwt {
    Jwt::new(config, Arc::new(FixtureClock { utc_now: now() })).expect("valid jwt config")
}

#[fixture]
fn jwt() -> Jwt {
    build(&config())
}

fn role() -> Role {
    Role {
        role: "admin".to_owned(),
        tenant: 7,
    }
}

fn sign_raw(claims: &Value, algorithm: Algorithm) -> String {
    encode(
        &Header::new(algorithm),
        claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("encode raw token")
}

#[rstest]
fn issued_token_parses_back_to_subject_and_private_claims(jwt: Jwt) {
    let token = jwt
        .issue("42", now() + chrono::Duration::hours(1), &role())
        .expect("issue");

    let claims = jwt.parse::<Role>(&token).expect("parse");

    assert_eq!(claims.private, role());
    assert_eq!(claims.registered.sub.as_deref(), Some("42"));
    assert_eq!(claims.registered.iss.as_deref(), Some("member-service"));
    assert_eq!(claims.registered.iat, Some(now().timestamp()));
}

#[rstest]
fn issue_with_ttl_sets_expiry_relative_to_clock(jwt: Jwt) {
    let token = jwt
        .issue_with_ttl("42", Duration::from_secs(600), &role())
        .expect("issue");

    let claims = jwt.parse::<Role>(&token).expect("parse");

    assert_eq!(claims.registered.exp, Some(now().timestamp() + 600));
}

#[rstest]
fn refresh_keeps_subject_and_payload_with_new_expiry(jwt: Jwt) {
    let token = jwt
        .issue("42", now() + chrono::Duration::minutes(5), &role())
        .expect("issue");
    let later = now() + chrono::Duration::days(1);

    let refreshed = jwt.refresh::<Role>(&token, later).expect("refresh");
    let claims = jwt.parse::<Role>(&refreshed).expect("parse refreshed");

    assert_eq!(claims.private, role());
    assert_eq!(claims.registered.sub.as_deref(), Some("42"));
    assert_eq!(claims.registered.exp, Some(later.timestamp()));
}

#[rstest]
fn token_signed_with_another_secret_fails_signature_check(jwt: Jwt) {
    let other = build(&JwtConfig {
        secret: "ffffffffffffffffffffffffffffffff".to_owned(),
        ..config()
    });
    let token = other
        .issue("42", now() + chrono::Duration::hours(1), &role())
        .expect("issue");

    assert_eq!(
        jwt.parse::<Role>(&token).expect_err("foreign signature"),
        JwtError::SignatureInvalid
    );
}

#[rstest]
#[case(0)]
#[case(-30)]
fn expiry_at_or_before_now_is_expired(jwt: Jwt, #[case] offset_secs: i64) {
    let token = jwt
        .issue("42", now() + chrono::Duration::seconds(offset_secs), &role())
        .expect("issue");

    assert_eq!(
        jwt.parse::<Role>(&token).expect_err("expired"),
        JwtError::TokenExpired
    );
}

#[rstest]
fn future_not_before_is_invalid(jwt: Jwt) {
    let token = sign_raw(
        &json!({
            "iss": "member-service",
            "sub": "42",
            "exp": now().timestamp() + 3600,
            "nbf": now().timestamp() + 60,
        }),
        Algorithm::HS256,
    );

    let err = jwt.parse::<Value>(&token).expect_err("not yet valid");

    assert!(matches!(err, JwtError::InvalidToken { .. }), "got {err:?}");
}

#[rstest]
fn missing_expiry_is_invalid(jwt: Jwt) {
    let token = sign_raw(
        &json!({ "iss": "member-service", "sub": "42" }),
        Algorithm::HS256,
    );

    let err = jwt.parse::<Value>(&token).expect_err("no exp");

    assert!(matches!(err, JwtError::InvalidToken { .. }), "got {err:?}");
}

#[rstest]
fn foreign_issuer_is_invalid(jwt: Jwt) {
    let token = sign_raw(
        &json!({ "iss": "someone-else", "sub": "42", "exp": now().timestamp() + 60 }),
        Algorithm::HS256,
    );

    let err = jwt.parse::<Value>(&token).expect_err("wrong issuer");

    assert!(matches!(err, JwtError::InvalidToken { .. }), "got {err:?}");
}

#[rstest]
fn algorithm_outside_allow_list_is_unsupported(jwt: Jwt) {
    let token = sign_raw(
        &json!({ "iss": "member-service", "sub": "42", "exp": now().timestamp() + 60 }),
        Algorithm::HS384,
    );

    assert_eq!(
        jwt.parse::<Value>(&token).expect_err("HS384 not allowed"),
        JwtError::unsupported_algorithm("HS384")
    );
}

#[rstest]
fn unsigned_token_is_unsupported(jwt: Jwt) {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        json!({ "iss": "member-service", "sub": "42", "exp": now().timestamp() + 60 })
            .to_string(),
    );
    let token = format!("{header}.{payload}.");

    assert_eq!(
        jwt.parse::<Value>(&token).expect_err("alg none"),
        JwtError::unsupported_algorithm("none")
    );
}

#[rstest]
#[case("")]
#[case("abc")]
#[case("a.b")]
#[case("%%%.e30.sig")]
#[case("e30.e30.sig")]
fn malformed_tokens_fail_to_parse(jwt: Jwt, #[case] token: &str) {
    let err = jwt.parse::<Value>(token).expect_err("malformed");

    assert!(matches!(err, JwtError::ParseFailed { .. }), "got {err:?}");
}

#[rstest]
fn configured_audience_is_issued_and_enforced() {
    let with_audience = build(&JwtConfig {
        audience: Some("members".to_owned()),
        ..config()
    });
    let token = with_audience
        .issue("42", now() + chrono::Duration::hours(1), &role())
        .expect("issue");
    let claims = with_audience.parse::<Role>(&token).expect("parse");
    assert_eq!(
        claims.registered.aud,
        Some(Audience::One("members".to_owned()))
    );

    let without = sign_raw(
        &json!({ "iss": "member-service", "sub": "42", "exp": now().timestamp() + 60 }),
        Algorithm::HS256,
    );
    let err = with_audience
        .parse::<Value>(&without)
        .expect_err("audience required");
    assert!(matches!(err, JwtError::InvalidToken { .. }), "got {err:?}");
}

#[rstest]
#[case::short_secret(
    JwtConfig { secret: "short".to_owned(), ..config() },
    JwtError::secret_too_short(MIN_SECRET_LEN, 5_usize),
)]
#[case::missing_issuer(
    JwtConfig { issuer: String::new(), ..config() },
    JwtError::missing_issuer(),
)]
#[case::empty_allow_list(
    JwtConfig { algorithms: Vec::new(), ..config() },
    JwtError::no_algorithms(),
)]
#[case::unknown_algorithm(
    JwtConfig { algorithms: vec!["PS256".to_owned()], ..config() },
    JwtError::unsupported_algorithm("PS256"),
)]
#[case::rsa_without_keys(
    JwtConfig { algorithms: vec!["RS256".to_owned()], ..config() },
    JwtError::missing_key("RS256"),
)]
fn invalid_configuration_is_rejected(#[case] config: JwtConfig, #[case] expected: JwtError) {
    let err = Jwt::new(&config, Arc::new(FixtureClock { utc_now: now() }))
        .expect_err("invalid config");

    assert_eq!(err, expected);
}

#[rstest]
#[case::sole_entry(vec!["ES512"])]
#[case::after_a_backed_algorithm(vec!["HS256", "ES512"])]
fn es512_is_rejected_at_construction(#[case] algorithms: Vec<&str>) {
    assert_eq!("ES512".parse::<JwtAlgorithm>(), Ok(JwtAlgorithm::ES512));
    let config = JwtConfig {
        algorithms: algorithms.into_iter().map(str::to_owned).collect(),
        ..config()
    };

    let err = Jwt::new(&config, Arc::new(FixtureClock { utc_now: now() }))
        .expect_err("no P-521 backend");

    assert_eq!(err, JwtError::unsupported_algorithm("ES512"));
}

#[test]
fn audience_matches_single_and_list_forms() {
    assert!(Audience::One("a".to_owned()).contains("a"));
    assert!(Audience::Many(vec!["a".to_owned(), "b".to_owned()]).contains("b"));
    assert!(!Audience::Many(Vec::new()).contains("a"));
}
