//! Authentication module: configuration, password hashing, session tokens,
//! the file-backed credential store, the service tying them together, and
//! the Rocket routes that expose it.

pub mod config;
pub mod error;
pub mod guards;
pub mod jwt;
pub mod passwords;
pub mod responses;
pub mod routes;
pub mod service;
pub mod store;

pub use config::{AuthConfig, PasswordConfig};
pub use error::{AuthError, AuthResult, StoreError, StoreResult, TokenError};
pub use guards::BearerToken;
pub use jwt::{JwtService, SessionClaims};
pub use passwords::PasswordService;
pub use service::AuthService;
pub use store::{Account, CredentialStore};
