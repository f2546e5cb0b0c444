use axum::response::Response;
use serde::Serialize;

use crate::utils::response::success;

pub mod birthday;
pub mod caller;
pub mod catalogue;
pub mod payments;
pub mod raffles;
pub mod redemptions;
pub mod tickets;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "venue-api",
    };

    success(payload, "Health check successful")
}
