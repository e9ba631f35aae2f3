//! Liveness endpoint polled by the frontend before it talks to the auth routes.

use rocket::serde::json::Json;
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

/// Basic response payload describing server health.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

#[openapi(tag = "Health")]
#[get("/status")]
pub fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
    })
}
