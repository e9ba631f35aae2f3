//! Register, login and token introspection on top of the credential store,
//! the password hasher and the token issuer.

use std::sync::Arc;

use crate::auth::jwt::SessionClaims;
use crate::auth::responses::SessionResponse;
use crate::auth::store::{Account, CredentialStore};
use crate::auth::{AuthConfig, AuthError, AuthResult, JwtService, PasswordService};

#[derive(Clone)]
pub struct AuthService {
    store: Arc<CredentialStore>,
    passwords: Arc<PasswordService>,
    tokens: Arc<JwtService>,
}

impl AuthService {
    pub fn new(config: &AuthConfig) -> AuthResult<Self> {
        let passwords = PasswordService::with_config(config.password)?;
        Ok(Self::from_parts(
            CredentialStore::new(config.users_file.clone()),
            passwords,
            JwtService::from_config(config)?,
        ))
    }

    pub fn from_parts(
        store: CredentialStore,
        passwords: PasswordService,
        tokens: JwtService,
    ) -> Self {
        Self {
            store: Arc::new(store),
            passwords: Arc::new(passwords),
            tokens: Arc::new(tokens),
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn tokens(&self) -> &JwtService {
        &self.tokens
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<SessionResponse> {
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AuthError::Validation("name, email and password are required"));
        }

        let mut tx = self.store.begin().await?;
        if tx.contains(email) {
            log::info!("registration rejected: identity already exists");
            return Err(AuthError::Conflict);
        }

        let passwords = Arc::clone(&self.passwords);
        let plaintext = password.to_owned();
        let digest =
            tokio::task::spawn_blocking(move || passwords.hash_password(&plaintext)).await??;

        tx.insert(Account {
            name: name.to_owned(),
            email: email.to_owned(),
            password: digest,
        });

        // Sign before persisting so a signing failure leaves no account behind.
        let signed = self.tokens.issue(email, name)?;
        tx.commit().await?;

        log::info!("registered account {}", email);
        Ok(SessionResponse {
            token: signed.token,
            name: name.to_owned(),
            email: email.to_owned(),
        })
    }

    /// Unknown identities and wrong passwords produce the same error.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<SessionResponse> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Validation("email and password are required"));
        }

        let account = self.store.load().await?.remove(email);

        let passwords = Arc::clone(&self.passwords);
        let plaintext = password.to_owned();
        let (account, verified) = tokio::task::spawn_blocking(move || match account {
            Some(account) => {
                let verified = passwords.verify_password(&plaintext, &account.password);
                (Some(account), verified)
            }
            None => {
                passwords.verify_dummy(&plaintext);
                (None, false)
            }
        })
        .await?;

        let account = match (account, verified) {
            (Some(account), true) => account,
            (Some(_), false) => {
                log::info!("login rejected for {}: password mismatch", email);
                return Err(AuthError::InvalidCredentials);
            }
            (None, _) => {
                log::info!("login rejected for {}: unknown identity", email);
                return Err(AuthError::InvalidCredentials);
            }
        };

        let signed = self.tokens.issue(&account.email, &account.name)?;
        log::info!("login succeeded for {}", email);

        Ok(SessionResponse {
            token: signed.token,
            name: account.name,
            email: account.email,
        })
    }

    /// Validate a presented token and hand back its claims. Every failure is
    /// reported as [`AuthError::Unauthenticated`].
    pub fn introspect(&self, token: Option<&str>) -> AuthResult<SessionClaims> {
        let token = match token.map(str::trim) {
            Some(token) if !token.is_empty() => token,
            _ => {
                log::debug!("introspection rejected: no token supplied");
                return Err(AuthError::Unauthenticated);
            }
        };

        self.tokens.verify(token).map_err(|err| {
            log::debug!("introspection rejected: {}", err);
            AuthError::from(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::config::{DEFAULT_TOKEN_TTL_SECS, PasswordConfig};
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> AuthService {
        let passwords = PasswordService::with_config(PasswordConfig {
            m_cost_kib: 8,
            t_cost: 1,
            p_cost: 1,
        })
        .expect("password service");
        AuthService::from_parts(
            CredentialStore::new(dir.path().join("users.json")),
            passwords,
            JwtService::new(b"service-test-secret", DEFAULT_TOKEN_TTL_SECS)
                .expect("jwt service"),
        )
    }

    #[tokio::test]
    async fn register_then_login_round_trip() {
        let dir = TempDir::new().expect("tempdir");
        let auth = service(&dir);

        let registered = auth
            .register("Ann", "ann@x.com", "pw123!")
            .await
            .expect("register");
        assert_eq!(registered.name, "Ann");
        assert_eq!(registered.email, "ann@x.com");

        let stored = auth.store().load().await.expect("load");
        assert_eq!(stored.len(), 1);
        assert_ne!(stored["ann@x.com"].password, "pw123!");

        let session = auth.login("ann@x.com", "pw123!").await.expect("login");
        assert_eq!(session.name, "Ann");
        assert_eq!(session.email, "ann@x.com");

        let claims = auth.introspect(Some(&registered.token)).expect("introspect");
        assert_eq!(claims.email, "ann@x.com");
        assert_eq!(claims.name, "Ann");
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts_and_keeps_digest() {
        let dir = TempDir::new().expect("tempdir");
        let auth = service(&dir);

        auth.register("Ann", "ann@x.com", "pw123!")
            .await
            .expect("register");
        let before = auth.store().load().await.expect("load")["ann@x.com"].clone();

        let err = auth
            .register("Ann2", "ann@x.com", "other")
            .await
            .expect_err("duplicate");
        assert!(matches!(err, AuthError::Conflict));

        let after = auth.store().load().await.expect("load")["ann@x.com"].clone();
        assert_eq!(before, after);
        assert!(auth.login("ann@x.com", "other").await.is_err());
    }

    #[tokio::test]
    async fn identity_is_case_sensitive() {
        let dir = TempDir::new().expect("tempdir");
        let auth = service(&dir);

        auth.register("Ann", "ann@x.com", "pw").await.expect("register");
        auth.register("Big Ann", "ANN@x.com", "pw")
            .await
            .expect("distinct identity");
        assert_eq!(auth.store().load().await.expect("load").len(), 2);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_identical() {
        let dir = TempDir::new().expect("tempdir");
        let auth = service(&dir);
        auth.register("Ann", "ann@x.com", "pw123!")
            .await
            .expect("register");

        let wrong = auth
            .login("ann@x.com", "wrong")
            .await
            .expect_err("wrong password");
        let unknown = auth
            .login("nobody@x.com", "pw123!")
            .await
            .expect_err("unknown user");

        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong.status(), unknown.status());
        assert_eq!(wrong.public_message(), unknown.public_message());
    }

    #[tokio::test]
    async fn blank_fields_are_rejected_without_side_effects() {
        let dir = TempDir::new().expect("tempdir");
        let auth = service(&dir);

        for (name, email, password) in [
            ("", "ann@x.com", "pw"),
            ("Ann", "", "pw"),
            ("Ann", "ann@x.com", ""),
        ] {
            let err = auth
                .register(name, email, password)
                .await
                .expect_err("validation");
            assert!(matches!(err, AuthError::Validation(_)));
        }
        assert!(!auth.store().path().exists());

        let err = auth.login("", "pw").await.expect_err("validation");
        assert!(matches!(err, AuthError::Validation(_)));
        let err = auth.login("ann@x.com", "").await.expect_err("validation");
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn introspection_rejects_missing_expired_and_forged_tokens() {
        let dir = TempDir::new().expect("tempdir");
        let auth = service(&dir);

        assert!(matches!(auth.introspect(None), Err(AuthError::Unauthenticated)));
        assert!(matches!(auth.introspect(Some("  ")), Err(AuthError::Unauthenticated)));
        assert!(matches!(
            auth.introspect(Some("garbage")),
            Err(AuthError::Unauthenticated)
        ));

        let stale = auth
            .tokens()
            .issue_at(
                "ann@x.com",
                "Ann",
                Utc::now() - Duration::seconds(DEFAULT_TOKEN_TTL_SECS + 5),
            )
            .expect("issue");
        assert!(matches!(
            auth.introspect(Some(&stale.token)),
            Err(AuthError::Unauthenticated)
        ));

        let forged = JwtService::new(b"not-our-key", DEFAULT_TOKEN_TTL_SECS)
            .expect("jwt service")
            .issue("ann@x.com", "Ann")
            .expect("issue");
        assert!(matches!(
            auth.introspect(Some(&forged.token)),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn whitespace_is_a_legitimate_value() {
        let dir = TempDir::new().expect("tempdir");
        let auth = service(&dir);

        auth.register("   ", "ann@x.com", "   ")
            .await
            .expect("whitespace fields are present");
        let session = auth.login("ann@x.com", "   ").await.expect("login");
        assert_eq!(session.name, "   ");
        assert!(matches!(
            auth.login("ann@x.com", "  ").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn legacy_bcrypt_accounts_with_whitespace_passwords_log_in() {
        let dir = TempDir::new().expect("tempdir");
        let auth = service(&dir);

        let mut accounts = crate::auth::store::AccountMap::new();
        accounts.insert(
            "bob@x.com".into(),
            Account {
                name: "Bob".into(),
                email: "bob@x.com".into(),
                password: bcrypt::hash("  ", 4).expect("bcrypt hash"),
            },
        );
        auth.store().save(accounts).await.expect("seed store");

        let session = auth.login("bob@x.com", "  ").await.expect("login");
        assert_eq!(session.name, "Bob");
    }

    #[tokio::test]
    async fn store_failure_aborts_registration() {
        let dir = TempDir::new().expect("tempdir");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").expect("write");
        let auth = AuthService::from_parts(
            CredentialStore::new(blocker.join("users.json")),
            PasswordService::with_config(PasswordConfig {
                m_cost_kib: 8,
                t_cost: 1,
                p_cost: 1,
            })
            .expect("password service"),
            JwtService::new(b"service-test-secret", DEFAULT_TOKEN_TTL_SECS)
                .expect("jwt service"),
        );

        let err = auth
            .register("Ann", "ann@x.com", "pw123!")
            .await
            .expect_err("store failure");
        assert!(matches!(err, AuthError::Store(_)));
        assert_eq!(err.public_message(), "internal server error");
        assert!(!err.public_message().contains("blocker"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registrations_for_one_identity_admit_exactly_one() {
        let dir = TempDir::new().expect("tempdir");
        let auth = service(&dir);

        let mut handles = Vec::new();
        for i in 0..8 {
            let auth = auth.clone();
            handles.push(tokio::spawn(async move {
                let name = format!("Ann{i}");
                let password = format!("pw{i}");
                auth.register(&name, "ann@x.com", &password).await
            }));
        }

        let mut winners = Vec::new();
        for handle in handles {
            match handle.await.expect("task") {
                Ok(session) => winners.push(session),
                Err(err) => assert!(matches!(err, AuthError::Conflict)),
            }
        }

        assert_eq!(winners.len(), 1);
        let stored = auth.store().load().await.expect("load");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored["ann@x.com"].name, winners[0].name);
    }
}
