use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use crate::models::caller::Caller;
use crate::models::raffle::ConfigureRaffle;
use crate::services::Engine;
use crate::store::Store;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn configure_raffle<S: Store>(
    State(engine): State<Arc<Engine<S>>>,
    caller: Caller,
    Path(event_id): Path<Uuid>,
    Json(request): Json<ConfigureRaffle>,
) -> Result<Response, AppError> {
    let config = engine.raffles.configure(&caller, event_id, request).await?;
    Ok(success(config, "Raffle configured"))
}

pub async fn draw_raffle<S: Store>(
    State(engine): State<Arc<Engine<S>>>,
    caller: Caller,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    caller.require_staff("run raffle draws")?;
    let winners = engine.raffles.draw(event_id, Utc::now()).await?;
    Ok(success(winners, "Raffle winners"))
}
