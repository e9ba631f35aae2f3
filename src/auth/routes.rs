use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{State, get, post};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;

use crate::auth::guards::BearerToken;
use crate::auth::jwt::SessionClaims;
use crate::auth::responses::{LoginRequest, RegisterRequest, SessionResponse};
use crate::auth::{AuthError, AuthService};

type AuthRouteResult<T> = Result<Json<T>, status::Custom<Json<AuthErrorResponse>>>;

#[derive(Debug, serde::Serialize, serde::Deserialize, JsonSchema)]
pub struct AuthErrorResponse {
    pub status: u16,
    pub message: String,
}

#[openapi(tag = "Auth")]
#[post("/register", data = "<payload>")]
pub async fn register(
    auth: &State<AuthService>,
    payload: Json<RegisterRequest>,
) -> AuthRouteResult<SessionResponse> {
    auth.register(&payload.name, &payload.email, &payload.password)
        .await
        .map(Json)
        .map_err(respond_error)
}

#[openapi(tag = "Auth")]
#[post("/login", data = "<payload>")]
pub async fn login(
    auth: &State<AuthService>,
    payload: Json<LoginRequest>,
) -> AuthRouteResult<SessionResponse> {
    auth.login(&payload.email, &payload.password)
        .await
        .map(Json)
        .map_err(respond_error)
}

#[openapi(tag = "Auth")]
#[get("/me")]
pub async fn me(auth: &State<AuthService>, token: BearerToken) -> AuthRouteResult<SessionClaims> {
    auth.introspect(token.as_deref())
        .map(Json)
        .map_err(respond_error)
}

fn respond_error(err: AuthError) -> status::Custom<Json<AuthErrorResponse>> {
    if err.is_internal() {
        log::error!("auth request failed: {}", err);
    } else {
        log::debug!("auth request rejected: {}", err);
    }

    let status = err.status();
    status::Custom(
        status,
        Json(AuthErrorResponse {
            status: status.code,
            message: err.public_message(),
        }),
    )
}
