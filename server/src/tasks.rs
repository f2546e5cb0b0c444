//! Background sweepers.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error};

use crate::services::Engine;
use crate::store::Store;
use crate::utils::error::AppError;

/// One pass over every time-driven transition: lapsed payment holds, tickets
/// past their validity window and raffles whose draw date has arrived.
pub async fn run_sweep<S: Store>(engine: &Engine<S>) -> Result<(), AppError> {
    let now = Utc::now();

    let released = engine.payments.expire_unpaid_holds(now).await?;
    let expired = engine.redemption.expire_stale(now).await?;
    let drawn = engine.raffles.run_due_draws(now).await?;

    debug!(released, expired, drawn, "Sweep finished");
    Ok(())
}

pub fn spawn_sweeper<S: Store>(engine: Arc<Engine<S>>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            if let Err(e) = run_sweep(&engine).await {
                error!(error = ?e, "Sweep failed");
            }
        }
    })
}
