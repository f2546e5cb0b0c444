use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::error::AppError;

/// Decoded QR content: `{"type": "...", "id": "..."}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "kebab-case")]
pub enum QrPayload {
    Ticket(Uuid),
    Product(Uuid),
    BirthdayEntry(Uuid),
    BirthdayGift(Uuid),
    Reward(Uuid),
}

impl QrPayload {
    pub fn decode(encoded: &str) -> Result<Self, AppError> {
        serde_json::from_str(encoded.trim())
            .map_err(|_| AppError::InvalidCode("Unrecognised QR code".into()))
    }

    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
