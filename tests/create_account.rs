use auth_server::auth::config::DEFAULT_TOKEN_TTL_SECS;
use auth_server::auth::{AuthConfig, AuthError, AuthService, PasswordConfig};
use tempfile::TempDir;

fn config(users_file: &std::path::Path) -> AuthConfig {
    AuthConfig {
        jwt_secret: "cli-test-secret".into(),
        token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
        users_file: "./unused.json".into(),
        password: PasswordConfig {
            m_cost_kib: 8,
            t_cost: 1,
            p_cost: 1,
        },
    }
    .with_users_file(users_file)
}

#[tokio::test]
async fn accounts_created_offline_are_visible_to_the_server() {
    let dir = TempDir::new().expect("tempdir");
    let users_file = dir.path().join("accounts").join("users.json");

    let cli = AuthService::new(&config(&users_file)).expect("cli service");
    cli.register("Ann", "ann@x.com", "pw123!")
        .await
        .expect("register");
    assert!(users_file.exists());

    let server = AuthService::new(&config(&users_file)).expect("server service");
    let session = server.login("ann@x.com", "pw123!").await.expect("login");
    assert_eq!(session.name, "Ann");

    let err = cli
        .register("Ann again", "ann@x.com", "other")
        .await
        .expect_err("duplicate");
    assert!(matches!(err, AuthError::Conflict));
}
