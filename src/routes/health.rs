//! Readiness probe for load balancers and deploy checks.

use rocket::serde::json::Json;
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Crate version, so a deploy can be confirmed from the probe alone.
    pub version: String,
}

/// Liveness/readiness check. Deliberately does not touch the database:
/// a degraded pool should surface as 500s on real routes, not flap the probe.
#[openapi(tag = "Health")]
#[get("/health")]
pub fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}
