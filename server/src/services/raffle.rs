//! Weighted prize draw over an event's committed tickets.
//!
//! The pool is the multiset of chance units held by eligible tickets. Prizes
//! are drawn top rank first, without replacement, and a winner's remaining
//! units leave the pool so nobody wins twice.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::RaffleWeights;
use crate::models::caller::Caller;
use crate::models::raffle::{ConfigureRaffle, RaffleConfig, RafflePrize, RaffleWinner};
use crate::models::ticket::{Ticket, TicketStatus};
use crate::store::{not_found, Store};
use crate::utils::error::AppError;

/// One eligible ticket and the chance units it contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolEntry {
    pub user_id: Uuid,
    pub ticket_id: Uuid,
    pub chances: u32,
}

/// Free entry unless money changed hands; a paid table outweighs a paid ticket.
pub fn chance_weight(ticket: &Ticket, weights: &RaffleWeights) -> u32 {
    if ticket.amount_paid.is_zero() {
        weights.free
    } else if ticket.table_id.is_some() {
        weights.vip
    } else {
        weights.paid
    }
}

/// Settled in full and not cancelled. Door scans play no part, so a deposit
/// ticket stays out until its balance is paid whether or not it was used.
pub fn is_eligible(ticket: &Ticket) -> bool {
    matches!(
        ticket.status,
        TicketStatus::Valid | TicketStatus::PartiallyUsed | TicketStatus::Used
    ) && ticket.balance_due().is_zero()
}

pub fn build_pool(
    tickets: &[Ticket],
    cutoff: DateTime<Utc>,
    weights: &RaffleWeights,
) -> Vec<PoolEntry> {
    tickets
        .iter()
        .filter(|t| is_eligible(t) && t.created_at < cutoff)
        .map(|t| PoolEntry {
            user_id: t.user_id,
            ticket_id: t.id,
            chances: chance_weight(t, weights),
        })
        .filter(|e| e.chances > 0)
        .collect()
}

/// Draws one winner per prize, in prize order, until the pool runs dry.
pub fn draw_winners<R: Rng>(
    rng: &mut R,
    mut pool: Vec<PoolEntry>,
    prizes: &[RafflePrize],
) -> Vec<(RafflePrize, PoolEntry)> {
    let mut winners = Vec::with_capacity(prizes.len());

    for prize in prizes {
        let total: u64 = pool.iter().map(|e| u64::from(e.chances)).sum();
        if total == 0 {
            break;
        }

        let mut ticket = rng.random_range(0..total);
        let Some(picked) = pool
            .iter()
            .find(|e| {
                let chances = u64::from(e.chances);
                if ticket < chances {
                    true
                } else {
                    ticket -= chances;
                    false
                }
            })
            .copied()
        else {
            break;
        };

        pool.retain(|e| e.user_id != picked.user_id);
        winners.push((*prize, picked));
    }

    winners
}

pub struct RaffleAllocator<S> {
    store: Arc<S>,
    weights: RaffleWeights,
}

impl<S> Clone for RaffleAllocator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            weights: self.weights,
        }
    }
}

impl<S: Store> RaffleAllocator<S> {
    pub fn new(store: Arc<S>, weights: RaffleWeights) -> Self {
        Self { store, weights }
    }

    pub async fn configure(
        &self,
        caller: &Caller,
        event_id: Uuid,
        request: ConfigureRaffle,
    ) -> Result<RaffleConfig, AppError> {
        caller.require_staff("configure raffles")?;
        self.store
            .get_event(event_id)
            .await?
            .ok_or_else(|| not_found("Event", event_id))?;

        let config = request.into_config(event_id)?;
        self.store.upsert_raffle(&config).await?;

        info!(
            event_id = %event_id,
            draw_date = %config.draw_date,
            winners = config.number_of_winners,
            "Raffle configured"
        );
        Ok(config)
    }

    /// Runs the draw once. Later calls return the stored winners.
    pub async fn draw(&self, event_id: Uuid, now: DateTime<Utc>) -> Result<Vec<RaffleWinner>, AppError> {
        let config = self
            .store
            .get_raffle(event_id)
            .await?
            .ok_or_else(|| not_found("Raffle", event_id))?;

        if config.drawn_at.is_some() {
            return self.store.get_winners(event_id).await;
        }
        if now < config.draw_date {
            return Err(AppError::OutOfWindow(format!(
                "The draw opens at {}",
                config.draw_date.to_rfc3339()
            )));
        }

        let tickets = self.store.event_tickets(event_id).await?;
        let pool = build_pool(&tickets, config.entry_cutoff, &self.weights);
        let entrants = pool.len();
        let drawn = draw_winners(&mut rand::rng(), pool, &config.prizes);

        let winners: Vec<RaffleWinner> = drawn
            .into_iter()
            .map(|(prize, entry)| RaffleWinner {
                event_id,
                rank: prize.rank,
                user_id: entry.user_id,
                product_id: prize.product_id,
                ticket_id: entry.ticket_id,
                drawn_at: now,
            })
            .collect();

        let stored = self.store.store_winners(event_id, &winners, now).await?;
        info!(
            event_id = %event_id,
            entrants,
            winners = stored.len(),
            "Raffle drawn"
        );
        Ok(stored)
    }

    /// Draws every raffle whose date has passed. Returns how many were drawn.
    pub async fn run_due_draws(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let mut drawn = 0;
        for event_id in self.store.due_raffles(now).await? {
            match self.draw(event_id, now).await {
                Ok(_) => drawn += 1,
                Err(e) => warn!(event_id = %event_id, error = %e, "Scheduled draw failed"),
            }
        }
        Ok(drawn)
    }
}
