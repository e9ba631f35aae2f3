use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::auth::{AuthConfig, AuthError, AuthResult, TokenError};

/// Identity assertion carried inside a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SessionClaims {
    pub email: String,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct SignedSessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
}

impl JwtService {
    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        Self::new(config.jwt_secret.as_bytes(), config.token_ttl_secs)
    }

    pub fn new(secret: &[u8], token_ttl_secs: i64) -> AuthResult<Self> {
        let token_ttl = Duration::try_seconds(token_ttl_secs)
            .filter(|ttl| *ttl > Duration::zero())
            .ok_or_else(|| {
                AuthError::Config(format!("token lifetime {token_ttl_secs}s is out of range"))
            })?;
        let encoding_key = EncodingKey::from_secret(secret);
        let decoding_key = DecodingKey::from_secret(secret);

        // Expiry is checked by hand in `verify_at` against the caller's clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        Ok(Self {
            encoding_key,
            decoding_key,
            validation,
            token_ttl,
        })
    }

    pub fn issue(&self, email: &str, name: &str) -> AuthResult<SignedSessionToken> {
        self.issue_at(email, name, Utc::now())
    }

    pub fn issue_at(
        &self,
        email: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<SignedSessionToken> {
        let expires_at = now
            .checked_add_signed(self.token_ttl)
            .ok_or_else(|| AuthError::Config("token expiry is out of range".into()))?;
        let claims = SessionClaims {
            email: email.to_string(),
            name: name.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(SignedSessionToken { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)?;
        let claims = token_data.claims;
        if now.timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}
