use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Value of the `iss` claim on every token this server issues.
pub const ISSUER: &str = "riley";

/// Default token lifetime.
pub const DEFAULT_TTL_HOURS: i64 = 24;

/// Why a token was rejected. Callers map all of these to 401 and never
/// echo the kind back to the client.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("token signature mismatch")]
    SignatureMismatch,

    #[error("token expired or not yet valid")]
    Expired,

    #[error("token subject missing or not numeric")]
    MissingSubject,

    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::SignatureMismatch,
            ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

/// Claims written into issued tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject id, as a decimal string
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Not before (Unix timestamp)
    pub nbf: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    pub iss: String,
}

/// Claims as read back from a presented token. `sub` is accepted as a
/// JSON number or a decimal string.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<SubjectClaim>,
    pub iat: Option<i64>,
    pub nbf: i64,
    pub exp: i64,
    pub iss: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SubjectClaim {
    Number(u64),
    Text(String),
}

impl TokenClaims {
    pub fn subject(&self) -> Result<u64, TokenError> {
        match &self.sub {
            Some(SubjectClaim::Number(id)) => Ok(*id),
            Some(SubjectClaim::Text(raw)) => raw.parse().map_err(|_| TokenError::MissingSubject),
            None => Err(TokenError::MissingSubject),
        }
    }
}

/// Load or generate the token signing key (256-bit random secret).
/// Key is stored as raw bytes in data_dir/token_secret.
pub fn load_or_generate_token_secret(data_dir: &str) -> Result<Vec<u8>, std::io::Error> {
    let key_path = Path::new(data_dir).join("token_secret");

    if key_path.exists() {
        let key = std::fs::read(&key_path)?;
        if key.len() == 32 {
            tracing::info!("Token signing key loaded from {}", key_path.display());
            return Ok(key);
        }
        // Invalid key file, regenerate
        tracing::warn!("Token key file has wrong size ({}), regenerating", key.len());
    }

    std::fs::create_dir_all(data_dir)?;
    let key: [u8; 32] = rand::rng().random();
    std::fs::write(&key_path, key)?;
    tracing::info!("Token signing key generated at {}", key_path.display());
    Ok(key.to_vec())
}

/// Configured secret if set, otherwise the one persisted under data_dir.
pub fn resolve_token_secret(configured: &str, data_dir: &str) -> Result<Vec<u8>, std::io::Error> {
    if configured.is_empty() {
        load_or_generate_token_secret(data_dir)
    } else {
        Ok(configured.as_bytes().to_vec())
    }
}

pub fn default_expiry() -> DateTime<Utc> {
    expiry_after(Duration::hours(DEFAULT_TTL_HOURS))
}

pub fn expiry_after(ttl: Duration) -> DateTime<Utc> {
    Utc::now() + ttl
}

/// Issue a signed HS256 token for `subject` valid until `expires_at`.
pub fn issue_token(
    subject: u64,
    expires_at: DateTime<Utc>,
    secret: &[u8],
) -> Result<String, TokenError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: subject.to_string(),
        iat: now,
        nbf: now,
        exp: expires_at.timestamp(),
        iss: ISSUER.to_string(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(TokenError::Signing)
}

/// Verify signature, issuer and the [nbf, exp) window.
pub fn validate_token(token: &str, secret: &[u8]) -> Result<TokenClaims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.validate_nbf = true;
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["exp", "nbf", "iss"]);

    let token_data = decode::<TokenClaims>(token, &DecodingKey::from_secret(secret), &validation)?;

    // jsonwebtoken accepts exp == now; the window is half-open.
    if token_data.claims.exp <= Utc::now().timestamp() {
        return Err(TokenError::Expired);
    }
    Ok(token_data.claims)
}

/// Validate the token and return its numeric subject.
pub fn extract_subject(token: &str, secret: &[u8]) -> Result<u64, TokenError> {
    validate_token(token, secret)?.subject()
}
