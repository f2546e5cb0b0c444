//! PostgreSQL store.
//!
//! Counters are changed with guarded `UPDATE ... RETURNING` statements and
//! read-modify-write operations hold a `SELECT ... FOR UPDATE` row lock for
//! the length of one transaction, so any number of service instances can
//! share the same database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{not_found, Mutation, Store};
use crate::models::birthday::{BenefitQr, BirthdayBenefit};
use crate::models::event::Event;
use crate::models::payment::PaymentLogEntry;
use crate::models::raffle::{RaffleConfig, RafflePrize, RaffleWinner};
use crate::models::redeemable::Redeemable;
use crate::models::reservation::{Reservation, ReservationState};
use crate::models::table::{Table, TableStatus};
use crate::models::ticket::Ticket;
use crate::models::tier::TicketTier;
use crate::models::user::User;
use crate::utils::error::AppError;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn raffle_from_row(row: &PgRow, prizes: Vec<RafflePrize>) -> Result<RaffleConfig, sqlx::Error> {
    Ok(RaffleConfig {
        event_id: row.try_get("event_id")?,
        draw_date: row.try_get("draw_date")?,
        entry_cutoff: row.try_get("entry_cutoff")?,
        number_of_winners: row.try_get("number_of_winners")?,
        prizes,
        drawn_at: row.try_get("drawn_at")?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, birth_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.birth_date)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert_event(&self, event: &Event) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO events (id, title, location, start_time, end_time, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.location)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, AppError> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    async fn insert_tier(&self, tier: &TicketTier) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO ticket_tiers (
                id, event_id, name, price, original_price, remaining_quantity, kind,
                valid_until, allows_partial, partial_price, consumption_credit,
                birthday_offer, created_at, updated_at
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14)
            "#,
        )
        .bind(tier.id)
        .bind(tier.event_id)
        .bind(&tier.name)
        .bind(tier.price)
        .bind(tier.original_price)
        .bind(tier.remaining_quantity)
        .bind(tier.kind)
        .bind(tier.valid_until)
        .bind(tier.allows_partial)
        .bind(tier.partial_price)
        .bind(tier.consumption_credit)
        .bind(tier.birthday_offer)
        .bind(tier.created_at)
        .bind(tier.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_tier(&self, id: Uuid) -> Result<Option<TicketTier>, AppError> {
        let tier = sqlx::query_as::<_, TicketTier>("SELECT * FROM ticket_tiers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tier)
    }

    async fn reserve_stock(
        &self,
        reservation: &Reservation,
        now: DateTime<Utc>,
    ) -> Result<TicketTier, AppError> {
        let mut tx = self.pool.begin().await?;
        let tier = take_stock(&mut tx, reservation, now).await?;
        tx.commit().await?;
        Ok(tier)
    }

    async fn get_reservation(&self, id: Uuid) -> Result<Option<Reservation>, AppError> {
        let reservation =
            sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(reservation)
    }

    async fn settle_reservation(
        &self,
        id: Uuid,
        to: ReservationState,
        now: DateTime<Utc>,
    ) -> Result<Option<Reservation>, AppError> {
        let mut tx = self.pool.begin().await?;

        let settled = sqlx::query_as::<_, Reservation>(
            r#"
            UPDATE reservations
            SET state = $2, settled_at = $3
            WHERE id = $1 AND state = 'held'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(to)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(reservation) = settled else {
            let exists = sqlx::query("SELECT 1 FROM reservations WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .is_some();
            tx.commit().await?;
            return if exists {
                Ok(None)
            } else {
                Err(not_found("Reservation", id))
            };
        };

        if to == ReservationState::Released {
            sqlx::query(
                r#"
                UPDATE ticket_tiers
                SET remaining_quantity = remaining_quantity + $2, updated_at = $3
                WHERE id = $1
                "#,
            )
            .bind(reservation.tier_id)
            .bind(reservation.units)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(reservation))
    }

    async fn lapsed_reservations(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>, AppError> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE state = 'held' AND expires_at <= $1",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    async fn insert_table(&self, table: &Table) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO venue_tables (
                id, event_id, number, category, status, reservation_id, pos_x, pos_y,
                created_at, updated_at
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
            "#,
        )
        .bind(table.id)
        .bind(table.event_id)
        .bind(table.number)
        .bind(&table.category)
        .bind(table.status)
        .bind(table.reservation_id)
        .bind(table.pos_x)
        .bind(table.pos_y)
        .bind(table.created_at)
        .bind(table.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_table(&self, id: Uuid) -> Result<Option<Table>, AppError> {
        let table = sqlx::query_as::<_, Table>("SELECT * FROM venue_tables WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(table)
    }

    async fn update_table(&self, id: Uuid, apply: Mutation<'_, Table>) -> Result<Table, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut table =
            sqlx::query_as::<_, Table>("SELECT * FROM venue_tables WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| not_found("Table", id))?;

        apply(&mut table)?;

        sqlx::query(
            r#"
            UPDATE venue_tables
            SET status = $2, reservation_id = $3, number = $4, category = $5,
                pos_x = $6, pos_y = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(table.id)
        .bind(table.status)
        .bind(table.reservation_id)
        .bind(table.number)
        .bind(&table.category)
        .bind(table.pos_x)
        .bind(table.pos_y)
        .bind(table.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(table)
    }

    async fn issue_ticket(
        &self,
        reservation: &Reservation,
        ticket: &Ticket,
        now: DateTime<Utc>,
    ) -> Result<TicketTier, AppError> {
        let mut tx = self.pool.begin().await?;
        let tier = take_stock(&mut tx, reservation, now).await?;
        write_ticket(&mut tx, ticket, now).await?;
        tx.commit().await?;
        Ok(tier)
    }

    async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>, AppError> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ticket)
    }

    async fn update_ticket(&self, id: Uuid, apply: Mutation<'_, Ticket>) -> Result<Ticket, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| not_found("Ticket", id))?;

        // Dropping `tx` on error rolls back and releases the row lock.
        apply(&mut ticket)?;

        sqlx::query(
            r#"
            UPDATE tickets
            SET redeemed_count = $2, amount_paid = $3, status = $4,
                confirmation_sent_at = $5, confirmed_at = $6, validated_at = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(ticket.id)
        .bind(ticket.redeemed_count)
        .bind(ticket.amount_paid)
        .bind(ticket.status)
        .bind(ticket.confirmation_sent_at)
        .bind(ticket.confirmed_at)
        .bind(ticket.validated_at)
        .bind(ticket.updated_at)
        .execute(&mut *tx)
        .await?;

        if let Some(table_id) = ticket.table_id {
            let status = TableStatus::for_ticket(&ticket);
            let holder = status.holds_reservation().then_some(ticket.id);
            sqlx::query(
                r#"
                UPDATE venue_tables
                SET status = $3, reservation_id = $4, updated_at = $5
                WHERE id = $1 AND reservation_id = $2
                "#,
            )
            .bind(table_id)
            .bind(ticket.id)
            .bind(status)
            .bind(holder)
            .bind(ticket.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(ticket)
    }

    async fn event_tickets(&self, event_id: Uuid) -> Result<Vec<Ticket>, AppError> {
        let tickets = sqlx::query_as::<_, Ticket>(
            "SELECT * FROM tickets WHERE event_id = $1 ORDER BY created_at",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tickets)
    }

    async fn stale_tickets(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM tickets
            WHERE status IN ('valid', 'partially_used') AND valid_until <= $1
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn insert_redeemable(&self, redeemable: &Redeemable) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO redeemables (id, kind, user_id, name, redeemed_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(redeemable.id)
        .bind(redeemable.kind)
        .bind(redeemable.user_id)
        .bind(&redeemable.name)
        .bind(redeemable.redeemed_at)
        .bind(redeemable.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_redeemable(
        &self,
        id: Uuid,
        apply: Mutation<'_, Redeemable>,
    ) -> Result<Redeemable, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut redeemable =
            sqlx::query_as::<_, Redeemable>("SELECT * FROM redeemables WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| not_found("Redeemable", id))?;

        apply(&mut redeemable)?;

        sqlx::query("UPDATE redeemables SET redeemed_at = $2 WHERE id = $1")
            .bind(redeemable.id)
            .bind(redeemable.redeemed_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(redeemable)
    }

    async fn record_payment(&self, entry: &PaymentLogEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO payment_log (id, external_reference, status, amount_paid, outcome, received_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.external_reference)
        .bind(&entry.status)
        .bind(entry.amount_paid)
        .bind(&entry.outcome)
        .bind(entry.received_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_raffle(&self, config: &RaffleConfig) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let written = sqlx::query(
            r#"
            INSERT INTO raffles (event_id, draw_date, entry_cutoff, number_of_winners, drawn_at)
            VALUES ($1, $2, $3, $4, NULL)
            ON CONFLICT (event_id) DO UPDATE
            SET draw_date = EXCLUDED.draw_date,
                entry_cutoff = EXCLUDED.entry_cutoff,
                number_of_winners = EXCLUDED.number_of_winners
            WHERE raffles.drawn_at IS NULL
            "#,
        )
        .bind(config.event_id)
        .bind(config.draw_date)
        .bind(config.entry_cutoff)
        .bind(config.number_of_winners)
        .execute(&mut *tx)
        .await?;

        if written.rows_affected() == 0 {
            return Err(AppError::ValidationError(
                "Raffle has already been drawn".into(),
            ));
        }

        sqlx::query("DELETE FROM raffle_prizes WHERE event_id = $1")
            .bind(config.event_id)
            .execute(&mut *tx)
            .await?;

        for prize in &config.prizes {
            sqlx::query("INSERT INTO raffle_prizes (event_id, rank, product_id) VALUES ($1, $2, $3)")
                .bind(config.event_id)
                .bind(prize.rank)
                .bind(prize.product_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_raffle(&self, event_id: Uuid) -> Result<Option<RaffleConfig>, AppError> {
        let Some(row) = sqlx::query("SELECT * FROM raffles WHERE event_id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let prizes = sqlx::query(
            "SELECT rank, product_id FROM raffle_prizes WHERE event_id = $1 ORDER BY rank",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|r| -> Result<RafflePrize, sqlx::Error> {
            Ok(RafflePrize {
                rank: r.try_get("rank")?,
                product_id: r.try_get("product_id")?,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(Some(raffle_from_row(&row, prizes)?))
    }

    async fn due_raffles(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT event_id FROM raffles WHERE drawn_at IS NULL AND draw_date <= $1",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn get_winners(&self, event_id: Uuid) -> Result<Vec<RaffleWinner>, AppError> {
        let winners = sqlx::query_as::<_, RaffleWinner>(
            "SELECT * FROM raffle_winners WHERE event_id = $1 ORDER BY rank",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(winners)
    }

    async fn store_winners(
        &self,
        event_id: Uuid,
        winners: &[RaffleWinner],
        now: DateTime<Utc>,
    ) -> Result<Vec<RaffleWinner>, AppError> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query(
            "UPDATE raffles SET drawn_at = $2 WHERE event_id = $1 AND drawn_at IS NULL",
        )
        .bind(event_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            tx.commit().await?;
            return self.get_winners(event_id).await;
        }

        for winner in winners {
            sqlx::query(
                r#"
                INSERT INTO raffle_winners (event_id, rank, user_id, product_id, ticket_id, drawn_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(winner.event_id)
            .bind(winner.rank)
            .bind(winner.user_id)
            .bind(winner.product_id)
            .bind(winner.ticket_id)
            .bind(winner.drawn_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(winners.to_vec())
    }

    async fn insert_benefit(&self, benefit: &BirthdayBenefit) -> Result<(), AppError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO birthday_benefits (
                id, user_id, event_id, week_start, guest_limit, guests_entered,
                updates_remaining, entry_qr_id, gift_qr_id, entry_redeemed_at,
                gift_redeemed_at, expires_at, created_at, updated_at
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14)
            ON CONFLICT (user_id, week_start) DO NOTHING
            "#,
        )
        .bind(benefit.id)
        .bind(benefit.user_id)
        .bind(benefit.event_id)
        .bind(benefit.week_start)
        .bind(benefit.guest_limit)
        .bind(benefit.guests_entered)
        .bind(benefit.updates_remaining)
        .bind(benefit.entry_qr_id)
        .bind(benefit.gift_qr_id)
        .bind(benefit.entry_redeemed_at)
        .bind(benefit.gift_redeemed_at)
        .bind(benefit.expires_at)
        .bind(benefit.created_at)
        .bind(benefit.updated_at)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(AppError::AlreadyClaimed(
                "Birthday benefit already claimed for this week".into(),
            ));
        }
        Ok(())
    }

    async fn get_benefit(&self, id: Uuid) -> Result<Option<BirthdayBenefit>, AppError> {
        let benefit =
            sqlx::query_as::<_, BirthdayBenefit>("SELECT * FROM birthday_benefits WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(benefit)
    }

    async fn benefit_for_qr(&self, qr_id: Uuid, qr: BenefitQr) -> Result<Option<Uuid>, AppError> {
        let sql = match qr {
            BenefitQr::Entry => "SELECT id FROM birthday_benefits WHERE entry_qr_id = $1",
            BenefitQr::Gift => "SELECT id FROM birthday_benefits WHERE gift_qr_id = $1",
        };
        let id = sqlx::query_scalar::<_, Uuid>(sql)
            .bind(qr_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    async fn update_benefit(
        &self,
        id: Uuid,
        apply: Mutation<'_, BirthdayBenefit>,
    ) -> Result<BirthdayBenefit, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut benefit = sqlx::query_as::<_, BirthdayBenefit>(
            "SELECT * FROM birthday_benefits WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| not_found("Birthday benefit", id))?;

        apply(&mut benefit)?;

        sqlx::query(
            r#"
            UPDATE birthday_benefits
            SET guest_limit = $2, guests_entered = $3, updates_remaining = $4,
                entry_redeemed_at = $5, gift_redeemed_at = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(benefit.id)
        .bind(benefit.guest_limit)
        .bind(benefit.guests_entered)
        .bind(benefit.updates_remaining)
        .bind(benefit.entry_redeemed_at)
        .bind(benefit.gift_redeemed_at)
        .bind(benefit.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(benefit)
    }
}

/// Guarded decrement of the tier counter plus the reservation row, on the
/// caller's transaction.
async fn take_stock(
    conn: &mut PgConnection,
    reservation: &Reservation,
    now: DateTime<Utc>,
) -> Result<TicketTier, AppError> {
    let updated = sqlx::query_as::<_, TicketTier>(
        r#"
        UPDATE ticket_tiers
        SET remaining_quantity = remaining_quantity - $2, updated_at = $3
        WHERE id = $1
          AND (valid_until IS NULL OR valid_until > $3)
          AND (remaining_quantity IS NULL OR remaining_quantity >= $2)
        RETURNING *
        "#,
    )
    .bind(reservation.tier_id)
    .bind(reservation.units)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(tier) = updated else {
        // The guard refused; replay it on a snapshot to report why.
        let mut tier = sqlx::query_as::<_, TicketTier>("SELECT * FROM ticket_tiers WHERE id = $1")
            .bind(reservation.tier_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| not_found("Tier", reservation.tier_id))?;
        tier.take_stock(reservation.units, now)?;
        return Err(AppError::OutOfStock(format!(
            "Tier '{}' sold out while reserving",
            tier.name
        )));
    };

    sqlx::query(
        r#"
        INSERT INTO reservations (id, tier_id, holder_id, units, state, expires_at, created_at, settled_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(reservation.id)
    .bind(reservation.tier_id)
    .bind(reservation.holder_id)
    .bind(reservation.units)
    .bind(reservation.state)
    .bind(reservation.expires_at)
    .bind(reservation.created_at)
    .bind(reservation.settled_at)
    .execute(&mut *conn)
    .await?;

    Ok(tier)
}

/// Claims the ticket's table, if any, and inserts the ticket row.
async fn write_ticket(
    conn: &mut PgConnection,
    ticket: &Ticket,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if let Some(table_id) = ticket.table_id {
        let flipped = sqlx::query(
            r#"
            UPDATE venue_tables
            SET status = 'reserved', reservation_id = $2, updated_at = $3
            WHERE id = $1 AND status = 'available' AND reservation_id IS NULL
            "#,
        )
        .bind(table_id)
        .bind(ticket.id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if flipped.rows_affected() == 0 {
            let table = sqlx::query_as::<_, Table>("SELECT * FROM venue_tables WHERE id = $1")
                .bind(table_id)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or_else(|| not_found("Table", table_id))?;
            return Err(AppError::OutOfStock(format!(
                "Table {} is {}",
                table.number,
                table.status.as_str()
            )));
        }
    }

    sqlx::query(
        r#"
        INSERT INTO tickets (
            id, user_id, tier_id, event_id, promoter_id, table_id, reservation_id,
            quantity, redeemed_count, total_price, amount_due, amount_paid,
            payment_kind, status, origin, is_vip, special_instructions, valid_until,
            confirmation_sent_at, confirmed_at, validated_at, created_at, updated_at
        )
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21,$22,$23)
        "#,
    )
    .bind(ticket.id)
    .bind(ticket.user_id)
    .bind(ticket.tier_id)
    .bind(ticket.event_id)
    .bind(ticket.promoter_id)
    .bind(ticket.table_id)
    .bind(ticket.reservation_id)
    .bind(ticket.quantity)
    .bind(ticket.redeemed_count)
    .bind(ticket.total_price)
    .bind(ticket.amount_due)
    .bind(ticket.amount_paid)
    .bind(ticket.payment_kind)
    .bind(ticket.status)
    .bind(ticket.origin)
    .bind(ticket.is_vip)
    .bind(&ticket.special_instructions)
    .bind(ticket.valid_until)
    .bind(ticket.confirmation_sent_at)
    .bind(ticket.confirmed_at)
    .bind(ticket.validated_at)
    .bind(ticket.created_at)
    .bind(ticket.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
