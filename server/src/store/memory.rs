//! In-process store backed by `DashMap`s.
//!
//! Each key's shard lock is the single writer for that record. When two maps
//! are locked together the order is always table -> ticket, reservation ->
//! tier, raffle -> winners and benefit week -> benefit.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::{not_found, Mutation, Store};
use crate::models::birthday::{BenefitQr, BirthdayBenefit};
use crate::models::event::Event;
use crate::models::payment::PaymentLogEntry;
use crate::models::raffle::{RaffleConfig, RaffleWinner};
use crate::models::redeemable::Redeemable;
use crate::models::reservation::{Reservation, ReservationState};
use crate::models::table::Table;
use crate::models::ticket::{Ticket, TicketStatus};
use crate::models::tier::TicketTier;
use crate::models::user::User;
use crate::utils::error::AppError;

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    events: DashMap<Uuid, Event>,
    tiers: DashMap<Uuid, TicketTier>,
    reservations: DashMap<Uuid, Reservation>,
    tables: DashMap<Uuid, Table>,
    tickets: DashMap<Uuid, Ticket>,
    redeemables: DashMap<Uuid, Redeemable>,
    payments: DashMap<Uuid, PaymentLogEntry>,
    raffles: DashMap<Uuid, RaffleConfig>,
    winners: DashMap<Uuid, Vec<RaffleWinner>>,
    benefits: DashMap<Uuid, BirthdayBenefit>,
    benefit_weeks: DashMap<(Uuid, NaiveDate), Uuid>,
    benefit_qrs: DashMap<Uuid, (Uuid, BenefitQr)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback audit trail, newest last.
    pub fn payment_log(&self) -> Vec<PaymentLogEntry> {
        let mut entries: Vec<_> = self.payments.iter().map(|e| e.value().clone()).collect();
        entries.sort_by_key(|e| e.received_at);
        entries
    }
}

/// Applies `apply` to a copy under the entry lock and writes it back only on success.
fn mutate<T>(map: &DashMap<Uuid, T>, id: Uuid, what: &str, apply: Mutation<'_, T>) -> Result<T, AppError>
where
    T: Clone,
{
    let mut entry = map.get_mut(&id).ok_or_else(|| not_found(what, id))?;
    let mut draft = entry.value().clone();
    apply(&mut draft)?;
    *entry = draft.clone();
    Ok(draft)
}

fn insert_new<T>(map: &DashMap<Uuid, T>, id: Uuid, value: &T, what: &str) -> Result<(), AppError>
where
    T: Clone,
{
    match map.entry(id) {
        Entry::Occupied(_) => Err(AppError::ValidationError(format!(
            "{} '{}' already exists",
            what, id
        ))),
        Entry::Vacant(slot) => {
            slot.insert(value.clone());
            Ok(())
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        insert_new(&self.users, user.id, user, "User")
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn insert_event(&self, event: &Event) -> Result<(), AppError> {
        insert_new(&self.events, event.id, event, "Event")
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, AppError> {
        Ok(self.events.get(&id).map(|e| e.value().clone()))
    }

    async fn insert_tier(&self, tier: &TicketTier) -> Result<(), AppError> {
        insert_new(&self.tiers, tier.id, tier, "Tier")
    }

    async fn get_tier(&self, id: Uuid) -> Result<Option<TicketTier>, AppError> {
        Ok(self.tiers.get(&id).map(|t| t.value().clone()))
    }

    async fn reserve_stock(
        &self,
        reservation: &Reservation,
        now: DateTime<Utc>,
    ) -> Result<TicketTier, AppError> {
        let tier = {
            let mut tier = self
                .tiers
                .get_mut(&reservation.tier_id)
                .ok_or_else(|| not_found("Tier", reservation.tier_id))?;
            tier.take_stock(reservation.units, now)?;
            tier.value().clone()
        };

        // The tier lock is released first to keep the reservation -> tier order.
        if let Err(e) = insert_new(&self.reservations, reservation.id, reservation, "Reservation") {
            if let Some(mut tier) = self.tiers.get_mut(&reservation.tier_id) {
                tier.restore_stock(reservation.units, now);
            }
            return Err(e);
        }
        Ok(tier)
    }

    async fn get_reservation(&self, id: Uuid) -> Result<Option<Reservation>, AppError> {
        Ok(self.reservations.get(&id).map(|r| r.value().clone()))
    }

    async fn settle_reservation(
        &self,
        id: Uuid,
        to: ReservationState,
        now: DateTime<Utc>,
    ) -> Result<Option<Reservation>, AppError> {
        let mut reservation = self
            .reservations
            .get_mut(&id)
            .ok_or_else(|| not_found("Reservation", id))?;
        if !reservation.settle(to, now) {
            return Ok(None);
        }
        if to == ReservationState::Released {
            if let Some(mut tier) = self.tiers.get_mut(&reservation.tier_id) {
                tier.restore_stock(reservation.units, now);
            }
        }
        Ok(Some(reservation.value().clone()))
    }

    async fn lapsed_reservations(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>, AppError> {
        Ok(self
            .reservations
            .iter()
            .filter(|r| r.is_lapsed(now))
            .map(|r| r.value().clone())
            .collect())
    }

    async fn insert_table(&self, table: &Table) -> Result<(), AppError> {
        insert_new(&self.tables, table.id, table, "Table")
    }

    async fn get_table(&self, id: Uuid) -> Result<Option<Table>, AppError> {
        Ok(self.tables.get(&id).map(|t| t.value().clone()))
    }

    async fn update_table(&self, id: Uuid, apply: Mutation<'_, Table>) -> Result<Table, AppError> {
        mutate(&self.tables, id, "Table", apply)
    }

    async fn issue_ticket(
        &self,
        reservation: &Reservation,
        ticket: &Ticket,
        now: DateTime<Utc>,
    ) -> Result<TicketTier, AppError> {
        if self.tickets.contains_key(&ticket.id) {
            return Err(AppError::ValidationError(format!(
                "Ticket '{}' already exists",
                ticket.id
            )));
        }

        let tier = self.reserve_stock(reservation, now).await?;

        let written = match ticket.table_id {
            Some(table_id) => self
                .tables
                .get_mut(&table_id)
                .ok_or_else(|| not_found("Table", table_id))
                .and_then(|mut table| {
                    table.reserve_for(ticket.id, now)?;
                    self.tickets.insert(ticket.id, ticket.clone());
                    Ok(())
                }),
            None => {
                self.tickets.insert(ticket.id, ticket.clone());
                Ok(())
            }
        };

        if let Err(e) = written {
            // Undo the stock taken above; nothing else saw the ticket.
            if let Some((_, reservation)) = self.reservations.remove(&reservation.id) {
                if let Some(mut tier) = self.tiers.get_mut(&reservation.tier_id) {
                    tier.restore_stock(reservation.units, now);
                }
            }
            return Err(e);
        }
        Ok(tier)
    }

    async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>, AppError> {
        Ok(self.tickets.get(&id).map(|t| t.value().clone()))
    }

    async fn update_ticket(&self, id: Uuid, apply: Mutation<'_, Ticket>) -> Result<Ticket, AppError> {
        let table_id = self
            .tickets
            .get(&id)
            .ok_or_else(|| not_found("Ticket", id))?
            .table_id;
        let mut table = table_id.and_then(|table_id| self.tables.get_mut(&table_id));

        let ticket = mutate(&self.tickets, id, "Ticket", apply)?;
        if let Some(table) = table.as_mut() {
            table.sync_with(&ticket, ticket.updated_at);
        }
        Ok(ticket)
    }

    async fn event_tickets(&self, event_id: Uuid) -> Result<Vec<Ticket>, AppError> {
        Ok(self
            .tickets
            .iter()
            .filter(|t| t.event_id == event_id)
            .map(|t| t.value().clone())
            .collect())
    }

    async fn stale_tickets(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, AppError> {
        Ok(self
            .tickets
            .iter()
            .filter(|t| matches!(t.status, TicketStatus::Valid | TicketStatus::PartiallyUsed))
            .filter(|t| t.valid_until.is_some_and(|cutoff| cutoff <= now))
            .map(|t| t.id)
            .collect())
    }

    async fn insert_redeemable(&self, redeemable: &Redeemable) -> Result<(), AppError> {
        insert_new(&self.redeemables, redeemable.id, redeemable, "Redeemable")
    }

    async fn update_redeemable(
        &self,
        id: Uuid,
        apply: Mutation<'_, Redeemable>,
    ) -> Result<Redeemable, AppError> {
        mutate(&self.redeemables, id, "Redeemable", apply)
    }

    async fn record_payment(&self, entry: &PaymentLogEntry) -> Result<(), AppError> {
        self.payments.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn upsert_raffle(&self, config: &RaffleConfig) -> Result<(), AppError> {
        match self.raffles.entry(config.event_id) {
            Entry::Occupied(mut existing) => {
                if existing.get().drawn_at.is_some() {
                    return Err(AppError::ValidationError(
                        "Raffle has already been drawn".into(),
                    ));
                }
                existing.insert(config.clone());
            }
            Entry::Vacant(slot) => {
                slot.insert(config.clone());
            }
        }
        Ok(())
    }

    async fn get_raffle(&self, event_id: Uuid) -> Result<Option<RaffleConfig>, AppError> {
        Ok(self.raffles.get(&event_id).map(|r| r.value().clone()))
    }

    async fn due_raffles(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, AppError> {
        Ok(self
            .raffles
            .iter()
            .filter(|r| r.drawn_at.is_none() && r.draw_date <= now)
            .map(|r| r.event_id)
            .collect())
    }

    async fn get_winners(&self, event_id: Uuid) -> Result<Vec<RaffleWinner>, AppError> {
        Ok(self
            .winners
            .get(&event_id)
            .map(|w| w.value().clone())
            .unwrap_or_default())
    }

    async fn store_winners(
        &self,
        event_id: Uuid,
        winners: &[RaffleWinner],
        now: DateTime<Utc>,
    ) -> Result<Vec<RaffleWinner>, AppError> {
        let mut raffle = self
            .raffles
            .get_mut(&event_id)
            .ok_or_else(|| not_found("Raffle", event_id))?;
        if raffle.drawn_at.is_some() {
            return Ok(self
                .winners
                .get(&event_id)
                .map(|w| w.value().clone())
                .unwrap_or_default());
        }
        raffle.drawn_at = Some(now);
        self.winners.insert(event_id, winners.to_vec());
        Ok(winners.to_vec())
    }

    async fn insert_benefit(&self, benefit: &BirthdayBenefit) -> Result<(), AppError> {
        match self.benefit_weeks.entry((benefit.user_id, benefit.week_start)) {
            Entry::Occupied(_) => Err(AppError::AlreadyClaimed(
                "Birthday benefit already claimed for this week".into(),
            )),
            Entry::Vacant(slot) => {
                self.benefit_qrs
                    .insert(benefit.entry_qr_id, (benefit.id, BenefitQr::Entry));
                self.benefit_qrs
                    .insert(benefit.gift_qr_id, (benefit.id, BenefitQr::Gift));
                self.benefits.insert(benefit.id, benefit.clone());
                slot.insert(benefit.id);
                Ok(())
            }
        }
    }

    async fn get_benefit(&self, id: Uuid) -> Result<Option<BirthdayBenefit>, AppError> {
        Ok(self.benefits.get(&id).map(|b| b.value().clone()))
    }

    async fn benefit_for_qr(&self, qr_id: Uuid, qr: BenefitQr) -> Result<Option<Uuid>, AppError> {
        Ok(self
            .benefit_qrs
            .get(&qr_id)
            .and_then(|entry| {
                let (benefit_id, kind) = *entry.value();
                (kind == qr).then_some(benefit_id)
            }))
    }

    async fn update_benefit(
        &self,
        id: Uuid,
        apply: Mutation<'_, BirthdayBenefit>,
    ) -> Result<BirthdayBenefit, AppError> {
        mutate(&self.benefits, id, "Birthday benefit", apply)
    }
}
