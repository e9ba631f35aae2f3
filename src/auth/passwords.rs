use argon2::{
    Algorithm, Argon2, ParamsBuilder, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::RngCore;

use crate::auth::config::PasswordConfig;
use crate::auth::{AuthError, AuthResult};

const SALT_LEN: usize = 16;

/// Digest encodings this service can verify. New digests are always Argon2id;
/// bcrypt is accepted so account files written by the previous Node service
/// keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestScheme {
    Argon2,
    Bcrypt,
}

impl DigestScheme {
    pub fn detect(digest: &str) -> Option<Self> {
        if digest.starts_with("$argon2") {
            Some(DigestScheme::Argon2)
        } else if ["$2a$", "$2b$", "$2x$", "$2y$"]
            .iter()
            .any(|prefix| digest.starts_with(prefix))
        {
            Some(DigestScheme::Bcrypt)
        } else {
            None
        }
    }
}

#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
    dummy_digest: String,
}

impl PasswordService {
    pub fn with_config(config: PasswordConfig) -> AuthResult<Self> {
        let mut builder = ParamsBuilder::new();
        builder.m_cost(config.m_cost_kib);
        builder.t_cost(config.t_cost);
        builder.p_cost(config.p_cost);
        let params = builder.build().map_err(AuthError::from)?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut service = Self {
            argon2,
            dummy_digest: String::new(),
        };
        let mut filler = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut filler);
        service.dummy_digest = service.hash_bytes(&filler)?;
        Ok(service)
    }

    pub fn hash_password(&self, password: &str) -> AuthResult<String> {
        self.hash_bytes(password.as_bytes())
    }

    /// Returns `false` for a wrong password and for any digest that cannot be
    /// parsed; a broken record must never authenticate.
    pub fn verify_password(&self, password: &str, encoded: &str) -> bool {
        match DigestScheme::detect(encoded) {
            Some(DigestScheme::Argon2) => self.verify_argon2(password, encoded),
            Some(DigestScheme::Bcrypt) => match bcrypt::verify(password, encoded) {
                Ok(valid) => valid,
                Err(err) => {
                    log::debug!("rejecting unreadable bcrypt digest: {}", err);
                    false
                }
            },
            None => {
                log::debug!("rejecting digest with unknown scheme");
                false
            }
        }
    }

    /// Spend the same effort as a real verification. Used when no account
    /// matched so the response time does not reveal which emails exist.
    pub fn verify_dummy(&self, password: &str) {
        let _ = self.verify_argon2(password, &self.dummy_digest);
    }

    fn hash_bytes(&self, password: &[u8]) -> AuthResult<String> {
        let mut salt_bytes = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes).map_err(AuthError::from)?;
        let hash = self
            .argon2
            .hash_password(password, &salt)
            .map_err(AuthError::from)?
            .to_string();
        Ok(hash)
    }

    fn verify_argon2(&self, password: &str, encoded: &str) -> bool {
        let parsed = match PasswordHash::new(encoded) {
            Ok(parsed) => parsed,
            Err(err) => {
                log::debug!("rejecting unreadable argon2 digest: {}", err);
                return false;
            }
        };
        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => true,
            Err(argon2::password_hash::Error::Password) => false,
            Err(err) => {
                log::debug!("argon2 verification failed: {}", err);
                false
            }
        }
    }
}
