use rocket::http::Status;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("user already exists")]
    Conflict,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("password hashing error: {0}")]
    PasswordHash(String),
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("background task failed: {0}")]
    Task(String),
}

impl AuthError {
    pub fn status(&self) -> Status {
        match self {
            AuthError::Validation(_) => Status::BadRequest,
            AuthError::Conflict => Status::Conflict,
            AuthError::InvalidCredentials | AuthError::Unauthenticated => Status::Unauthorized,
            AuthError::Store(_)
            | AuthError::Config(_)
            | AuthError::PasswordHash(_)
            | AuthError::Jwt(_)
            | AuthError::Task(_) => Status::InternalServerError,
        }
    }

    /// Text that is safe to hand back to a caller.
    ///
    /// Internal failures collapse into one generic message so file paths and
    /// library diagnostics stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Validation(_)
            | AuthError::Conflict
            | AuthError::InvalidCredentials
            | AuthError::Unauthenticated => self.to_string(),
            _ => "internal server error".to_string(),
        }
    }

    pub fn is_internal(&self) -> bool {
        self.status() == Status::InternalServerError
    }
}

impl From<argon2::Error> for AuthError {
    fn from(err: argon2::Error) -> Self {
        AuthError::PasswordHash(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AuthError::PasswordHash(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(err: tokio::task::JoinError) -> Self {
        AuthError::Task(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io failure: {0}")]
    IoFailure(#[from] std::io::Error),
    #[error("corrupt store document: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Reasons a presented token was rejected. Never leaves the service boundary;
/// callers only ever see [`AuthError::Unauthenticated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token malformed")]
    Malformed,
    #[error("token signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(_: TokenError) -> Self {
        AuthError::Unauthenticated
    }
}
