use std::fmt;
use std::path::PathBuf;

use crate::auth::{AuthError, AuthResult};

pub const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;
pub const MAX_TOKEN_TTL_SECS: i64 = 30 * DEFAULT_TOKEN_TTL_SECS;
pub const DEFAULT_USERS_FILE: &str = "./users.json";

/// Argon2id cost parameters. Changing the defaults does not break existing
/// digests because every digest records the parameters it was produced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordConfig {
    pub m_cost_kib: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            m_cost_kib: 19 * 1024, // 19 MiB
            t_cost: 2,
            p_cost: 1,
        }
    }
}

/// Authentication configuration loaded from environment variables.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    pub users_file: PathBuf,
    pub password: PasswordConfig,
}

impl AuthConfig {
    pub fn from_env() -> AuthResult<Self> {
        let jwt_secret = std::env::var("AUTH_JWT_SECRET")
            .ok()
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AuthError::Config("AUTH_JWT_SECRET is required".into()))?;
        let token_ttl_secs =
            parse_token_ttl(std::env::var("AUTH_TOKEN_TTL_SECS").ok().as_deref())?;
        let users_file = std::env::var("AUTH_USERS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_USERS_FILE));

        let defaults = PasswordConfig::default();
        let password = PasswordConfig {
            m_cost_kib: env_u32("AUTH_ARGON2_M_COST_KIB").unwrap_or(defaults.m_cost_kib),
            t_cost: env_u32("AUTH_ARGON2_T_COST").unwrap_or(defaults.t_cost),
            p_cost: env_u32("AUTH_ARGON2_P_COST").unwrap_or(defaults.p_cost),
        };

        Ok(Self {
            jwt_secret,
            token_ttl_secs,
            users_file,
            password,
        })
    }

    pub fn with_users_file(mut self, users_file: impl Into<PathBuf>) -> Self {
        self.users_file = users_file.into();
        self
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("users_file", &self.users_file)
            .field("password", &self.password)
            .finish()
    }
}

/// Unset means the default one-day window. Anything that is not a whole
/// number of seconds in `1..=MAX_TOKEN_TTL_SECS` is rejected.
fn parse_token_ttl(raw: Option<&str>) -> AuthResult<i64> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_TOKEN_TTL_SECS);
    };
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|ttl| (1..=MAX_TOKEN_TTL_SECS).contains(ttl))
        .ok_or_else(|| {
            AuthError::Config(format!(
                "AUTH_TOKEN_TTL_SECS must be between 1 and {MAX_TOKEN_TTL_SECS}, got '{raw}'"
            ))
        })
}

fn env_u32(name: &str) -> Option<u32> {
    std::env::var(name).ok().and_then(|v| v.parse::<u32>().ok())
}
