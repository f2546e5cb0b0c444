use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "redeemable_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RedeemableKind {
    Product,
    Reward,
}

/// A one-shot voucher (bought product or loyalty reward). Unlike tickets it
/// has no counter, only `redeemed_at`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Redeemable {
    pub id: Uuid,
    pub kind: RedeemableKind,
    pub user_id: Uuid,
    pub name: String,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Redeemable {
    pub fn redeem(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        if let Some(at) = self.redeemed_at {
            return Err(AppError::AlreadyRedeemed(format!(
                "'{}' was already redeemed at {}",
                self.name,
                at.to_rfc3339()
            )));
        }
        self.redeemed_at = Some(now);
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRedeemable {
    pub kind: RedeemableKind,
    pub user_id: Uuid,
    pub name: String,
}

impl CreateRedeemable {
    pub fn into_redeemable(self, now: DateTime<Utc>) -> Redeemable {
        Redeemable {
            id: Uuid::new_v4(),
            kind: self.kind,
            user_id: self.user_id,
            name: self.name,
            redeemed_at: None,
            created_at: now,
        }
    }
}
