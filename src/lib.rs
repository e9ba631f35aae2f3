#[macro_use]
extern crate rocket;

pub mod auth;
pub mod request_logger;
pub mod routes;

use crate::auth::{AuthConfig, AuthService};
use crate::request_logger::RequestLogger;
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_okapi::{
    openapi_get_routes,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};
use std::sync::Once;

static LOGGER: Once = Once::new();

pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![Method::Get, Method::Post, Method::Options]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .to_cors()
        .expect("Error creating CORS");

    rocket::build()
        .attach(RequestLogger)
        .attach(cors)
        .attach(AdHoc::try_on_ignite(
            "Auth Service",
            |rocket| async move {
                let config = match AuthConfig::from_env() {
                    Ok(config) => config,
                    Err(err) => {
                        log::error!("failed to load auth configuration: {}", err);
                        return Err(rocket);
                    }
                };
                log::info!("auth configuration: {:?}", config);

                match AuthService::new(&config) {
                    Ok(service) => {
                        log::info!(
                            "credential store at {}",
                            service.store().path().display()
                        );
                        Ok(rocket.manage(service))
                    }
                    Err(err) => {
                        log::error!("failed to initialize auth service: {}", err);
                        Err(rocket)
                    }
                }
            },
        ))
        .mount(
            "/",
            openapi_get_routes![
                routes::health::status,
                auth::routes::register,
                auth::routes::login,
                auth::routes::me,
            ],
        )
        .mount(
            "/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../openapi.json".to_owned(),
                ..Default::default()
            }),
        )
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket, Route};
    use tempfile::TempDir;

    use crate::auth::config::DEFAULT_TOKEN_TTL_SECS;
    use crate::auth::{AuthService, CredentialStore, JwtService, PasswordConfig, PasswordService};

    pub const TEST_JWT_SECRET: &[u8] = b"integration-test-secret";

    /// Auth service backed by a throwaway directory and a cheap hash cost.
    pub struct TestAuth {
        dir: TempDir,
        service: AuthService,
    }

    impl TestAuth {
        pub fn new() -> Self {
            let dir = TempDir::new().expect("temporary store directory");
            let passwords = PasswordService::with_config(PasswordConfig {
                m_cost_kib: 8,
                t_cost: 1,
                p_cost: 1,
            })
            .expect("password service");
            let service = AuthService::from_parts(
                CredentialStore::new(dir.path().join("users.json")),
                passwords,
                JwtService::new(TEST_JWT_SECRET, DEFAULT_TOKEN_TTL_SECS)
                    .expect("jwt service"),
            );
            Self { dir, service }
        }

        pub fn service(&self) -> AuthService {
            self.service.clone()
        }

        pub fn users_file(&self) -> std::path::PathBuf {
            self.dir.path().join("users.json")
        }
    }

    impl Default for TestAuth {
        fn default() -> Self {
            Self::new()
        }
    }

    /// Builder for constructing Rocket instances tailored for integration tests.
    #[derive(Default)]
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        auth: Option<AuthService>,
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging disabled.
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                mounts: Vec::new(),
                auth: None,
            }
        }

        pub fn mount_routes(mut self, routes: Vec<Route>) -> Self {
            self.mounts.push(("/".to_string(), routes));
            self
        }

        pub fn manage_auth(mut self, service: AuthService) -> Self {
            self.auth = Some(service);
            self
        }

        pub fn build(self) -> Rocket<Build> {
            let mut rocket = rocket::custom(self.figment);

            for (base, routes) in self.mounts {
                rocket = rocket.mount(base, routes);
            }

            if let Some(service) = self.auth {
                rocket = rocket.manage(service);
            }

            rocket
        }

        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }

        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }
}
