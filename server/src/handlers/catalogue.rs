use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::caller::Caller;
use crate::models::redeemable::CreateRedeemable;
use crate::models::table::CreateTable;
use crate::models::tier::CreateTier;
use crate::services::Engine;
use crate::store::Store;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct TableAvailability {
    pub available: bool,
}

pub async fn create_tier<S: Store>(
    State(engine): State<Arc<Engine<S>>>,
    caller: Caller,
    Json(request): Json<CreateTier>,
) -> Result<Response, AppError> {
    let tier = engine.catalogue.create_tier(&caller, request, Utc::now()).await?;
    Ok(created(tier, "Tier created"))
}

pub async fn get_tier<S: Store>(
    State(engine): State<Arc<Engine<S>>>,
    Path(tier_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let tier = engine.catalogue.get_tier(tier_id).await?;
    Ok(success(tier, "Tier retrieved"))
}

pub async fn create_table<S: Store>(
    State(engine): State<Arc<Engine<S>>>,
    caller: Caller,
    Json(request): Json<CreateTable>,
) -> Result<Response, AppError> {
    let table = engine.catalogue.create_table(&caller, request, Utc::now()).await?;
    Ok(created(table, "Table placed"))
}

pub async fn update_table<S: Store>(
    State(engine): State<Arc<Engine<S>>>,
    caller: Caller,
    Path(table_id): Path<Uuid>,
    Json(body): Json<TableAvailability>,
) -> Result<Response, AppError> {
    let table = engine
        .catalogue
        .set_table_availability(&caller, table_id, body.available, Utc::now())
        .await?;
    Ok(success(table, "Table updated"))
}

pub async fn create_product<S: Store>(
    State(engine): State<Arc<Engine<S>>>,
    caller: Caller,
    Json(request): Json<CreateRedeemable>,
) -> Result<Response, AppError> {
    let item = engine
        .catalogue
        .create_redeemable(&caller, request, Utc::now())
        .await?;
    Ok(created(item, "Voucher created"))
}
