use std::sync::Arc;

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use chrono::Utc;

use crate::models::payment::PaymentCallback;
use crate::services::Engine;
use crate::store::Store;
use crate::utils::error::AppError;
use crate::utils::response::success;

/// Provider webhook. Failures answer with an error status so the provider
/// retries; replays are harmless.
pub async fn payment_webhook<S: Store>(
    State(engine): State<Arc<Engine<S>>>,
    Json(callback): Json<PaymentCallback>,
) -> Result<Response, AppError> {
    let ticket = engine
        .payments
        .handle_callback(&callback, Utc::now())
        .await?;
    Ok(success(ticket, "Callback processed"))
}
