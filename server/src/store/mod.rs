//! Persistence boundary.
//!
//! Every method is one atomic unit of work against shared state. Read-modify-write
//! operations take a closure that runs while the row is held exclusively; if the
//! closure fails nothing is written.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::birthday::{BenefitQr, BirthdayBenefit};
use crate::models::event::Event;
use crate::models::payment::PaymentLogEntry;
use crate::models::raffle::{RaffleConfig, RaffleWinner};
use crate::models::redeemable::Redeemable;
use crate::models::reservation::{Reservation, ReservationState};
use crate::models::table::Table;
use crate::models::ticket::Ticket;
use crate::models::tier::TicketTier;
use crate::models::user::User;
use crate::utils::error::AppError;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type Mutation<'a, T> = &'a (dyn Fn(&mut T) -> Result<(), AppError> + Send + Sync);

#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn insert_event(&self, event: &Event) -> Result<(), AppError>;
    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, AppError>;

    async fn insert_tier(&self, tier: &TicketTier) -> Result<(), AppError>;
    async fn get_tier(&self, id: Uuid) -> Result<Option<TicketTier>, AppError>;
    /// Compare-and-decrement of the tier's stock counter by `reservation.units`,
    /// recording the reservation in the same unit of work.
    async fn reserve_stock(
        &self,
        reservation: &Reservation,
        now: DateTime<Utc>,
    ) -> Result<TicketTier, AppError>;
    async fn get_reservation(&self, id: Uuid) -> Result<Option<Reservation>, AppError>;
    /// Moves a held reservation to `to`, giving the stock back when released.
    /// `None` when the reservation was already settled.
    async fn settle_reservation(
        &self,
        id: Uuid,
        to: ReservationState,
        now: DateTime<Utc>,
    ) -> Result<Option<Reservation>, AppError>;
    async fn lapsed_reservations(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>, AppError>;

    async fn insert_table(&self, table: &Table) -> Result<(), AppError>;
    async fn get_table(&self, id: Uuid) -> Result<Option<Table>, AppError>;
    async fn update_table(&self, id: Uuid, apply: Mutation<'_, Table>) -> Result<Table, AppError>;

    /// One sale as a single unit of work: takes stock for `reservation`,
    /// claims the ticket's table if it names one and inserts the ticket.
    /// Nothing is written unless every step succeeds.
    async fn issue_ticket(
        &self,
        reservation: &Reservation,
        ticket: &Ticket,
        now: DateTime<Utc>,
    ) -> Result<TicketTier, AppError>;
    async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>, AppError>;
    /// Serialised per ticket. A bound table is re-derived from the result.
    async fn update_ticket(&self, id: Uuid, apply: Mutation<'_, Ticket>) -> Result<Ticket, AppError>;
    async fn event_tickets(&self, event_id: Uuid) -> Result<Vec<Ticket>, AppError>;
    /// Valid or partially used tickets whose validity window has closed.
    async fn stale_tickets(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, AppError>;

    async fn insert_redeemable(&self, redeemable: &Redeemable) -> Result<(), AppError>;
    async fn update_redeemable(
        &self,
        id: Uuid,
        apply: Mutation<'_, Redeemable>,
    ) -> Result<Redeemable, AppError>;

    async fn record_payment(&self, entry: &PaymentLogEntry) -> Result<(), AppError>;

    /// Creates or replaces a raffle that has not been drawn yet.
    async fn upsert_raffle(&self, config: &RaffleConfig) -> Result<(), AppError>;
    async fn get_raffle(&self, event_id: Uuid) -> Result<Option<RaffleConfig>, AppError>;
    async fn due_raffles(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, AppError>;
    async fn get_winners(&self, event_id: Uuid) -> Result<Vec<RaffleWinner>, AppError>;
    /// First writer wins: later calls get the stored winners back.
    async fn store_winners(
        &self,
        event_id: Uuid,
        winners: &[RaffleWinner],
        now: DateTime<Utc>,
    ) -> Result<Vec<RaffleWinner>, AppError>;

    /// Fails with `ALREADY_CLAIMED` if the user already holds a benefit for that week.
    async fn insert_benefit(&self, benefit: &BirthdayBenefit) -> Result<(), AppError>;
    async fn get_benefit(&self, id: Uuid) -> Result<Option<BirthdayBenefit>, AppError>;
    async fn benefit_for_qr(&self, qr_id: Uuid, qr: BenefitQr) -> Result<Option<Uuid>, AppError>;
    async fn update_benefit(
        &self,
        id: Uuid,
        apply: Mutation<'_, BirthdayBenefit>,
    ) -> Result<BirthdayBenefit, AppError>;
}

pub(crate) fn not_found(what: &str, id: Uuid) -> AppError {
    AppError::NotFound(format!("{} '{}' was not found", what, id))
}
