use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::ticket::{Ticket, TicketStatus};
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "table_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Available,
    Reserved,
    Occupied,
    Unavailable,
}

impl TableStatus {
    /// Table status implied by the lifecycle of the ticket holding it.
    pub fn for_ticket(ticket: &Ticket) -> TableStatus {
        match ticket.status {
            TicketStatus::Invalidated | TicketStatus::Expired => TableStatus::Available,
            _ if ticket.redeemed_count > 0 => TableStatus::Occupied,
            _ => TableStatus::Reserved,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TableStatus::Available => "available",
            TableStatus::Reserved => "reserved",
            TableStatus::Occupied => "occupied",
            TableStatus::Unavailable => "unavailable",
        }
    }

    pub fn holds_reservation(self) -> bool {
        matches!(self, TableStatus::Reserved | TableStatus::Occupied)
    }
}

/// A physical table on the venue map. Once reserved, its status follows the
/// bound ticket and cannot be edited on its own.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: Uuid,
    pub event_id: Uuid,
    pub number: i32,
    pub category: String,
    pub status: TableStatus,
    pub reservation_id: Option<Uuid>,
    pub pos_x: f64,
    pub pos_y: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Table {
    pub fn reserve_for(&mut self, ticket_id: Uuid, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.status != TableStatus::Available || self.reservation_id.is_some() {
            return Err(AppError::OutOfStock(format!(
                "Table {} is {}",
                self.number,
                self.status.as_str()
            )));
        }
        self.status = TableStatus::Reserved;
        self.reservation_id = Some(ticket_id);
        self.updated_at = now;
        Ok(())
    }

    /// Re-derives status from the bound ticket. Ignores tickets that no longer hold the table.
    pub fn sync_with(&mut self, ticket: &Ticket, now: DateTime<Utc>) {
        if self.reservation_id != Some(ticket.id) {
            return;
        }
        self.status = TableStatus::for_ticket(ticket);
        if !self.status.holds_reservation() {
            self.reservation_id = None;
        }
        self.updated_at = now;
    }

    /// Staff toggle between available and unavailable for unbound tables.
    pub fn set_availability(&mut self, available: bool, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.reservation_id.is_some() {
            return Err(AppError::ValidationError(format!(
                "Table {} is bound to a reservation",
                self.number
            )));
        }
        self.status = if available {
            TableStatus::Available
        } else {
            TableStatus::Unavailable
        };
        self.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTable {
    pub event_id: Uuid,
    pub number: i32,
    pub category: String,
    #[serde(default)]
    pub pos_x: f64,
    #[serde(default)]
    pub pos_y: f64,
}

impl CreateTable {
    pub fn into_table(self, now: DateTime<Utc>) -> Table {
        Table {
            id: Uuid::new_v4(),
            event_id: self.event_id,
            number: self.number,
            category: self.category,
            status: TableStatus::Available,
            reservation_id: None,
            pos_x: self.pos_x,
            pos_y: self.pos_y,
            created_at: now,
            updated_at: now,
        }
    }
}
