use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackStatus {
    Approved,
    Pending,
    Rejected,
    Cancelled,
}

impl CallbackStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CallbackStatus::Approved => "approved",
            CallbackStatus::Pending => "pending",
            CallbackStatus::Rejected => "rejected",
            CallbackStatus::Cancelled => "cancelled",
        }
    }
}

/// Webhook body delivered by the payment provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCallback {
    pub external_reference: String,
    pub status: CallbackStatus,
    /// Cumulative amount collected for the reference.
    #[serde(default)]
    pub amount_paid: Decimal,
}

/// Audit trail of every provider callback, applied or not.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLogEntry {
    pub id: Uuid,
    pub external_reference: String,
    pub status: String,
    pub amount_paid: Decimal,
    pub outcome: String,
    pub received_at: DateTime<Utc>,
}

impl PaymentLogEntry {
    pub fn new(callback: &PaymentCallback, outcome: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            external_reference: callback.external_reference.clone(),
            status: callback.status.as_str().to_string(),
            amount_paid: callback.amount_paid,
            outcome: outcome.into(),
            received_at: now,
        }
    }
}
