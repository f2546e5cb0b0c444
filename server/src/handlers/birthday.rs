use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use crate::models::caller::Caller;
use crate::services::birthday::{ClaimBenefit, UpdateGuestLimit};
use crate::services::Engine;
use crate::store::Store;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

pub async fn claim_benefit<S: Store>(
    State(engine): State<Arc<Engine<S>>>,
    caller: Caller,
    Json(request): Json<ClaimBenefit>,
) -> Result<Response, AppError> {
    let payload = engine.birthdays.claim(&caller, request, Utc::now()).await?;
    Ok(created(payload, "Birthday benefit claimed"))
}

pub async fn update_guest_limit<S: Store>(
    State(engine): State<Arc<Engine<S>>>,
    caller: Caller,
    Path(benefit_id): Path<Uuid>,
    Json(body): Json<UpdateGuestLimit>,
) -> Result<Response, AppError> {
    let payload = engine
        .birthdays
        .update_guest_limit(&caller, benefit_id, body.guest_limit, Utc::now())
        .await?;
    Ok(success(payload, "Guest limit updated"))
}
