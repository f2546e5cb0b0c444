use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::payment::{CallbackStatus, PaymentCallback, PaymentLogEntry};
use crate::models::ticket::{Ticket, TicketStatus};
use crate::services::inventory::InventoryLedger;
use crate::store::Store;
use crate::utils::error::AppError;

/// The external reference handed to the provider is the ticket id.
fn ticket_for_reference(reference: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(reference.trim())
        .map_err(|_| AppError::NotFound(format!("Unknown payment reference '{}'", reference)))
}

/// Applies provider callbacks to tickets and settles their stock holds.
pub struct PaymentReconciler<S> {
    store: Arc<S>,
    inventory: InventoryLedger<S>,
}

impl<S> Clone for PaymentReconciler<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            inventory: self.inventory.clone(),
        }
    }
}

impl<S: Store> PaymentReconciler<S> {
    pub fn new(store: Arc<S>, inventory: InventoryLedger<S>) -> Self {
        Self { store, inventory }
    }

    /// Entry point for the webhook. Every callback lands in the payment log,
    /// including the ones that fail.
    pub async fn handle_callback(
        &self,
        callback: &PaymentCallback,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, AppError> {
        let result = match callback.status {
            CallbackStatus::Approved => self
                .on_payment_confirmed(&callback.external_reference, callback.amount_paid, now)
                .await
                .map(Some),
            CallbackStatus::Rejected | CallbackStatus::Cancelled => {
                self.on_payment_failed(&callback.external_reference, now).await
            }
            CallbackStatus::Pending => Ok(None),
        };

        let outcome = match &result {
            Ok(Some(ticket)) => ticket.status.as_str().to_string(),
            Ok(None) => "ignored".to_string(),
            Err(e) => e.code().to_string(),
        };
        self.store
            .record_payment(&PaymentLogEntry::new(callback, outcome, now))
            .await?;

        if let Err(e) = &result {
            warn!(
                reference = %callback.external_reference,
                status = callback.status.as_str(),
                code = e.code(),
                "Payment callback not applied"
            );
        }
        result
    }

    /// Credits the provider's cumulative amount. Replays are no-ops.
    pub async fn on_payment_confirmed(
        &self,
        external_reference: &str,
        amount_paid: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Ticket, AppError> {
        let ticket_id = ticket_for_reference(external_reference)?;
        let ticket = self
            .store
            .update_ticket(ticket_id, &move |t: &mut Ticket| t.apply_payment(amount_paid, now))
            .await?;

        if ticket.status != TicketStatus::PendingPayment {
            if let Some(reservation_id) = ticket.reservation_id {
                self.inventory.commit(reservation_id, now).await?;
            }
        }

        info!(
            ticket_id = %ticket.id,
            amount_paid = %ticket.amount_paid,
            balance_due = %ticket.balance_due(),
            status = %ticket.status,
            "Payment applied"
        );
        Ok(ticket)
    }

    /// Drops an unpaid ticket and gives its stock back. Paid tickets are
    /// left untouched.
    pub async fn on_payment_failed(
        &self,
        external_reference: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, AppError> {
        let ticket_id = ticket_for_reference(external_reference)?;
        let ticket = self.cancel_unpaid(ticket_id, now).await?;
        Ok(Some(ticket))
    }

    /// Sweeps payment holds past their deadline. Returns how many were released.
    pub async fn expire_unpaid_holds(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let mut released = 0;
        for reservation in self.store.lapsed_reservations(now).await? {
            match self.cancel_unpaid(reservation.holder_id, now).await {
                Ok(ticket) if ticket.status == TicketStatus::Invalidated => released += 1,
                Ok(_) => {}
                Err(AppError::NotFound(_)) => {
                    if self.inventory.release(reservation.id, now).await? {
                        released += 1;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        if released > 0 {
            warn!(count = released, "Released lapsed payment holds");
        }
        Ok(released)
    }

    /// Invalidates the ticket under its lock if still unpaid, then settles
    /// its reservation to match.
    async fn cancel_unpaid(&self, ticket_id: Uuid, now: DateTime<Utc>) -> Result<Ticket, AppError> {
        let ticket = self
            .store
            .update_ticket(ticket_id, &move |t: &mut Ticket| t.cancel_unpaid(now))
            .await?;

        if let Some(reservation_id) = ticket.reservation_id {
            match ticket.status {
                TicketStatus::Invalidated => {
                    self.inventory.release(reservation_id, now).await?;
                    info!(ticket_id = %ticket.id, "Unpaid ticket cancelled");
                }
                // A payment won the race.
                _ => {
                    self.inventory.commit(reservation_id, now).await?;
                }
            }
        }
        Ok(ticket)
    }
}
