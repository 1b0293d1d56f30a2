use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed session lifetime. Tokens are stateless, so this is the only thing
/// bounding a session besides deletion of the user row.
pub const TOKEN_TTL_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User id the token was minted for.
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

/// Mints and verifies the signed session token (HS256 over the server secret).
/// No server-side session store and no revocation list: a token is good until
/// its expiry, or until the user row it references disappears.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Sign `{ sub, iat, exp }` with the fixed 30-day expiry.
    pub fn issue(&self, user_id: Uuid) -> anyhow::Result<String> {
        let exp = (Utc::now() + Duration::days(TOKEN_TTL_DAYS)).timestamp();
        self.issue_expiring_at(user_id, exp)
    }

    /// Sign a token with an explicit expiry. Used by `issue` and by tests that
    /// need an already-elapsed token.
    pub fn issue_expiring_at(&self, user_id: Uuid, exp: i64) -> anyhow::Result<String> {
        let claims = Claims { sub: user_id, iat: Utc::now().timestamp(), exp };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(token)
    }

    /// Decode and check signature + expiry. Structural problems and signature
    /// mismatches collapse to `Invalid`; only an elapsed expiry is `Expired`.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new("unit-test-secret")
    }

    #[test]
    fn issue_verify_round_trip() {
        let c = codec();
        let id = Uuid::new_v4();
        let token = c.issue(id).expect("issue");
        let claims = c.verify(&token).expect("verify");
        assert_eq!(claims.sub, id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let c = codec();
        let token = c.issue_expiring_at(Uuid::new_v4(), 1_000).expect("issue");
        assert_eq!(c.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn tampered_token_is_invalid() {
        let c = codec();
        let mut token = c.issue(Uuid::new_v4()).expect("issue");
        // flip a character in the payload segment
        let flipped = if token.as_bytes()[20] == b'A' { "B" } else { "A" };
        token.replace_range(20..21, flipped);
        assert_eq!(c.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn token_from_another_secret_is_invalid() {
        let other = TokenCodec::new("some-other-secret");
        let token = other.issue(Uuid::new_v4()).expect("issue");
        assert_eq!(codec().verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn garbage_is_invalid_not_a_panic() {
        assert_eq!(codec().verify(""), Err(TokenError::Invalid));
        assert_eq!(codec().verify("not.a.jwt"), Err(TokenError::Invalid));
    }
}
