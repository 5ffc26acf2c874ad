use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Deserialize, Debug)]
struct ExpiryClaims {
    exp: Option<i64>,
}

/// Reads the `exp` claim of a JWT without verifying its signature. The client
/// never holds the signing key; the backend still validates every request.
/// Returns `None` for opaque tokens and JWTs without an expiry.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    let data = decode::<ExpiryClaims>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
    Utc.timestamp_opt(data.claims.exp?, 0).single()
}

pub fn is_token_expired(token: &str, now: DateTime<Utc>) -> bool {
    token_expiry(token).is_some_and(|expiry| expiry <= now)
}

#[cfg(test)]
pub(crate) fn make_jwt(exp: i64) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        exp: i64,
    }

    encode(
        &Header::default(),
        &Claims {
            sub: "admin@example.com",
            exp,
        },
        &EncodingKey::from_secret(b"backend_secret"),
    )
    .expect("encode test jwt")
}
