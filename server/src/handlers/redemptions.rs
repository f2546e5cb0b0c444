use std::sync::Arc;

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use chrono::Utc;

use crate::models::caller::Caller;
use crate::services::redemption::ScanRequest;
use crate::services::Engine;
use crate::store::Store;
use crate::utils::error::AppError;
use crate::utils::response::success;

/// Scanner endpoint. A rejected code is still a 200 with `isValid: false`.
pub async fn scan<S: Store>(
    State(engine): State<Arc<Engine<S>>>,
    caller: Caller,
    Json(request): Json<ScanRequest>,
) -> Result<Response, AppError> {
    let result = engine
        .redemption
        .scan(&caller, &request.encoded_payload, Utc::now())
        .await?;
    let message = if result.is_valid {
        "Code accepted"
    } else {
        "Code rejected"
    };
    Ok(success(result, message))
}
