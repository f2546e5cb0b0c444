use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::reservation::{Reservation, ReservationState};
use crate::models::tier::TicketTier;
use crate::store::{not_found, Store};
use crate::utils::error::AppError;

/// Owns the tier stock counters. Nothing else decrements or restores them.
pub struct InventoryLedger<S> {
    store: Arc<S>,
    hold: Duration,
}

impl<S> Clone for InventoryLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            hold: self.hold,
        }
    }
}

impl<S: Store> InventoryLedger<S> {
    /// `hold` is how long a held token lives when the caller gives no
    /// lifetime of its own.
    pub fn new(store: Arc<S>, hold: Duration) -> Self {
        Self { store, hold }
    }

    /// Takes stock for `requested` admissions on behalf of `holder_id`.
    ///
    /// The token always carries an expiry (`hold`, or the ledger default), so
    /// one that is never committed goes back to the pool on the next sweep.
    pub async fn reserve(
        &self,
        tier_id: Uuid,
        requested: i32,
        holder_id: Uuid,
        hold: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Result<Reservation, AppError> {
        let tier = self
            .store
            .get_tier(tier_id)
            .await?
            .ok_or_else(|| not_found("Tier", tier_id))?;
        let reservation = self.draft(&tier, requested, holder_id, hold, now)?;

        let tier = self.store.reserve_stock(&reservation, now).await?;

        info!(
            tier_id = %tier_id,
            reservation_id = %reservation.id,
            units = reservation.units,
            remaining = ?tier.remaining_quantity,
            "Stock reserved"
        );
        Ok(reservation)
    }

    /// Builds the token for a sale without touching the store.
    ///
    /// With `hold` the token waits for the payment provider and lapses after
    /// it; without one the sale is final and the token is born committed.
    /// Pass it to [`Store::issue_ticket`] to take the stock together with the
    /// ticket.
    pub fn sale_token(
        &self,
        tier: &TicketTier,
        requested: i32,
        holder_id: Uuid,
        hold: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Result<Reservation, AppError> {
        let mut reservation = self.draft(tier, requested, holder_id, hold, now)?;
        if hold.is_none() {
            reservation.state = ReservationState::Committed;
            reservation.expires_at = None;
            reservation.settled_at = Some(now);
        }
        Ok(reservation)
    }

    fn draft(
        &self,
        tier: &TicketTier,
        requested: i32,
        holder_id: Uuid,
        hold: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Result<Reservation, AppError> {
        if requested < 1 {
            return Err(AppError::ValidationError(
                "Quantity must be at least 1".into(),
            ));
        }
        Ok(Reservation {
            id: Uuid::new_v4(),
            tier_id: tier.id,
            holder_id,
            units: tier.units_for(requested),
            state: ReservationState::Held,
            expires_at: Some(now + hold.unwrap_or(self.hold)),
            created_at: now,
            settled_at: None,
        })
    }

    /// Makes the decrement final. `false` if the token was already settled.
    pub async fn commit(&self, reservation_id: Uuid, now: DateTime<Utc>) -> Result<bool, AppError> {
        self.settle(reservation_id, ReservationState::Committed, now).await
    }

    /// Gives the units back. `false` if the token was already settled.
    pub async fn release(&self, reservation_id: Uuid, now: DateTime<Utc>) -> Result<bool, AppError> {
        self.settle(reservation_id, ReservationState::Released, now).await
    }

    async fn settle(
        &self,
        reservation_id: Uuid,
        to: ReservationState,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        match self.store.settle_reservation(reservation_id, to, now).await? {
            Some(reservation) => {
                info!(
                    reservation_id = %reservation.id,
                    tier_id = %reservation.tier_id,
                    units = reservation.units,
                    state = ?reservation.state,
                    "Reservation settled"
                );
                Ok(true)
            }
            None => {
                debug!(reservation_id = %reservation_id, to = ?to, "Reservation already settled");
                Ok(false)
            }
        }
    }
}
