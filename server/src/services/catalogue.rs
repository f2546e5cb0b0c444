use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::models::caller::Caller;
use crate::models::redeemable::{CreateRedeemable, Redeemable};
use crate::models::table::{CreateTable, Table};
use crate::models::tier::{CreateTier, TicketTier};
use crate::store::{not_found, Store};
use crate::utils::error::AppError;

/// Staff-managed product definitions, venue tables and vouchers.
pub struct Catalogue<S> {
    store: Arc<S>,
}

impl<S> Clone for Catalogue<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> Catalogue<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    async fn require_event(&self, event_id: Uuid) -> Result<(), AppError> {
        self.store
            .get_event(event_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| not_found("Event", event_id))
    }

    pub async fn create_tier(
        &self,
        caller: &Caller,
        request: CreateTier,
        now: DateTime<Utc>,
    ) -> Result<TicketTier, AppError> {
        caller.require_staff("create tiers")?;
        self.require_event(request.event_id).await?;

        let tier = request.into_tier(now)?;
        self.store.insert_tier(&tier).await?;
        info!(tier_id = %tier.id, name = %tier.name, kind = ?tier.kind, stock = ?tier.remaining_quantity, "Tier created");
        Ok(tier)
    }

    pub async fn get_tier(&self, tier_id: Uuid) -> Result<TicketTier, AppError> {
        self.store
            .get_tier(tier_id)
            .await?
            .ok_or_else(|| not_found("Tier", tier_id))
    }

    pub async fn create_table(
        &self,
        caller: &Caller,
        request: CreateTable,
        now: DateTime<Utc>,
    ) -> Result<Table, AppError> {
        caller.require_staff("place tables")?;
        self.require_event(request.event_id).await?;

        let table = request.into_table(now);
        self.store.insert_table(&table).await?;
        info!(table_id = %table.id, number = table.number, "Table placed");
        Ok(table)
    }

    pub async fn set_table_availability(
        &self,
        caller: &Caller,
        table_id: Uuid,
        available: bool,
        now: DateTime<Utc>,
    ) -> Result<Table, AppError> {
        caller.require_staff("change table availability")?;
        self.store
            .update_table(table_id, &move |t: &mut Table| t.set_availability(available, now))
            .await
    }

    pub async fn create_redeemable(
        &self,
        caller: &Caller,
        request: CreateRedeemable,
        now: DateTime<Utc>,
    ) -> Result<Redeemable, AppError> {
        caller.require_staff("create vouchers")?;
        self.store
            .get_user(request.user_id)
            .await?
            .ok_or_else(|| not_found("User", request.user_id))?;

        let item = request.into_redeemable(now);
        self.store.insert_redeemable(&item).await?;
        info!(redeemable_id = %item.id, kind = ?item.kind, user_id = %item.user_id, "Voucher created");
        Ok(item)
    }
}
