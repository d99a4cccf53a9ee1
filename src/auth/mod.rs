use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config;

/// Discriminates the two token families. An access token presented where a
/// refresh token is expected (or vice versa) must be rejected even though
/// both are valid JWTs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub kind: TokenKind,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    TokenInvalid(String),
    WrongKind,
    MissingSecret,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::TokenInvalid(msg) => write!(f, "JWT validation error: {}", msg),
            JwtError::WrongKind => write!(f, "JWT has the wrong token kind"),
            JwtError::MissingSecret => write!(f, "JWT signing secret not configured"),
        }
    }
}

impl std::error::Error for JwtError {}

/// Self-contained access token: signature + expiry are its only validity.
pub fn generate_access_token(user_id: Uuid, email: &str) -> Result<String, JwtError> {
    let security = &config::config().security;
    let ttl = Duration::minutes(security.access_token_minutes);
    sign(
        Claims::new(user_id, Some(email.to_string()), TokenKind::Access, ttl),
        &security.access_token_secret,
    )
}

/// Refresh token plus the expiry instant the caller must persist alongside it.
/// The stored expiry is checked independently of the signature's own `exp`.
pub fn generate_refresh_token(user_id: Uuid) -> Result<(String, DateTime<Utc>), JwtError> {
    let security = &config::config().security;
    let ttl = Duration::days(security.refresh_token_days);
    let claims = Claims::new(user_id, None, TokenKind::Refresh, ttl);
    let expires_at = Utc::now() + ttl;
    let token = sign(claims, &security.refresh_token_secret)?;
    Ok((token, expires_at))
}

pub fn verify_access_token(token: &str) -> Result<Claims, JwtError> {
    verify(token, &config::config().security.access_token_secret, TokenKind::Access)
}

pub fn verify_refresh_token(token: &str) -> Result<Claims, JwtError> {
    verify(token, &config::config().security.refresh_token_secret, TokenKind::Refresh)
}

/// SHA-256 hex digest of a token string. Refresh tokens are stored as
/// fingerprints so a leaked table does not leak usable credentials.
pub fn token_fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl Claims {
    fn new(sub: Uuid, email: Option<String>, kind: TokenKind, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub,
            email,
            kind,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

fn sign(claims: Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

fn verify(token: &str, secret: &str, expected: TokenKind) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| JwtError::TokenInvalid(e.to_string()))?;

    if token_data.claims.kind != expected {
        return Err(JwtError::WrongKind);
    }

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    fn claims(kind: TokenKind, ttl: Duration) -> Claims {
        Claims::new(Uuid::new_v4(), Some("a@x.com".to_string()), kind, ttl)
    }

    #[test]
    fn round_trips_valid_access_token() {
        let c = claims(TokenKind::Access, Duration::minutes(15));
        let sub = c.sub;
        let token = sign(c, SECRET).unwrap();
        let decoded = verify(&token, SECRET, TokenKind::Access).unwrap();
        assert_eq!(decoded.sub, sub);
        assert_eq!(decoded.email.as_deref(), Some("a@x.com"));
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = sign(claims(TokenKind::Access, Duration::minutes(15)), SECRET).unwrap();
        assert!(matches!(
            verify(&token, "other-secret", TokenKind::Access),
            Err(JwtError::TokenInvalid(_))
        ));
    }

    #[test]
    fn rejects_expired_token() {
        // Past the default validation leeway (60s)
        let token = sign(claims(TokenKind::Access, Duration::minutes(-5)), SECRET).unwrap();
        assert!(matches!(
            verify(&token, SECRET, TokenKind::Access),
            Err(JwtError::TokenInvalid(_))
        ));
    }

    #[test]
    fn rejects_access_token_presented_as_refresh() {
        let token = sign(claims(TokenKind::Access, Duration::minutes(15)), SECRET).unwrap();
        assert!(matches!(
            verify(&token, SECRET, TokenKind::Refresh),
            Err(JwtError::WrongKind)
        ));
    }

    #[test]
    fn rejects_empty_secret() {
        assert!(matches!(
            sign(claims(TokenKind::Access, Duration::minutes(15)), ""),
            Err(JwtError::MissingSecret)
        ));
    }

    #[test]
    fn fingerprint_is_stable_and_token_specific() {
        let a = sign(claims(TokenKind::Refresh, Duration::days(7)), SECRET).unwrap();
        assert_eq!(token_fingerprint(&a), token_fingerprint(&a));
        assert_eq!(token_fingerprint(&a).len(), 64);

        let b = sign(claims(TokenKind::Refresh, Duration::days(7)), SECRET).unwrap();
        assert_ne!(token_fingerprint(&a), token_fingerprint(&b));
    }
}
