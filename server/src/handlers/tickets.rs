use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use crate::models::caller::Caller;
use crate::services::issuance::IssueRequest;
use crate::services::Engine;
use crate::store::Store;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

pub async fn issue_ticket<S: Store>(
    State(engine): State<Arc<Engine<S>>>,
    caller: Caller,
    Json(request): Json<IssueRequest>,
) -> Result<Response, AppError> {
    let receipt = engine.issuance.issue(&caller, request, Utc::now()).await?;
    Ok(created(receipt, "Ticket issued"))
}

pub async fn invalidate_ticket<S: Store>(
    State(engine): State<Arc<Engine<S>>>,
    caller: Caller,
    Path(ticket_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let ticket = engine
        .redemption
        .invalidate(&caller, ticket_id, Utc::now())
        .await?;
    Ok(success(ticket, "Ticket invalidated"))
}

pub async fn confirmation_sent<S: Store>(
    State(engine): State<Arc<Engine<S>>>,
    caller: Caller,
    Path(ticket_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let ticket = engine
        .redemption
        .mark_confirmation_sent(&caller, ticket_id, Utc::now())
        .await?;
    Ok(success(ticket, "Confirmation requested"))
}

pub async fn confirm_attendance<S: Store>(
    State(engine): State<Arc<Engine<S>>>,
    caller: Caller,
    Path(ticket_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let ticket = engine
        .redemption
        .confirm_attendance(&caller, ticket_id, Utc::now())
        .await?;
    Ok(success(ticket, "Attendance confirmed"))
}
