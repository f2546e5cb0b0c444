use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    PendingPayment,
    PartiallyPaid,
    Valid,
    PartiallyUsed,
    Used,
    Invalidated,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Full,
    Deposit,
    Gift,
}

/// Sales channel a ticket was issued through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_origin", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketOrigin {
    SelfService,
    Invitation,
    Gift,
    ManualSale,
}

impl TicketOrigin {
    /// Gifted and invitation tickets bypass payment entirely.
    pub fn is_complimentary(self) -> bool {
        matches!(self, TicketOrigin::Invitation | TicketOrigin::Gift)
    }
}

/// Inputs to [`TicketStatus::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketTransition {
    /// A payment was credited; `fully_paid` once `amount_paid` covers the total.
    Settle { fully_paid: bool },
    /// One admission consumed; `remaining` admissions left afterwards.
    Redeem { remaining: i32 },
    Invalidate,
    Expire,
}

impl TicketStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TicketStatus::Used | TicketStatus::Invalidated | TicketStatus::Expired
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::PendingPayment => "pending_payment",
            TicketStatus::PartiallyPaid => "partially_paid",
            TicketStatus::Valid => "valid",
            TicketStatus::PartiallyUsed => "partially_used",
            TicketStatus::Used => "used",
            TicketStatus::Invalidated => "invalidated",
            TicketStatus::Expired => "expired",
        }
    }

    /// The single transition function of the ticket lifecycle.
    /// `None` means the transition is illegal from `self`.
    pub fn next(self, transition: TicketTransition) -> Option<TicketStatus> {
        use TicketStatus::*;
        use TicketTransition as T;

        match (self, transition) {
            (PendingPayment | PartiallyPaid, T::Settle { fully_paid: true }) => Some(Valid),
            (PendingPayment | PartiallyPaid, T::Settle { fully_paid: false }) => {
                Some(PartiallyPaid)
            }
            (PartiallyPaid | Valid | PartiallyUsed, T::Redeem { remaining }) if remaining > 0 => {
                Some(PartiallyUsed)
            }
            (PartiallyPaid | Valid | PartiallyUsed, T::Redeem { .. }) => Some(Used),
            (status, T::Invalidate) if !status.is_terminal() => Some(Invalidated),
            (Valid | PartiallyUsed, T::Expire) => Some(Expired),
            _ => None,
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tier_id: Uuid,
    pub event_id: Uuid,
    pub promoter_id: Option<Uuid>,
    pub table_id: Option<Uuid>,
    pub reservation_id: Option<Uuid>,
    pub quantity: i32,
    pub redeemed_count: i32,
    /// Full settlement amount for the whole purchase.
    pub total_price: Decimal,
    /// Amount charged up-front at issuance (deposit or full).
    pub amount_due: Decimal,
    pub amount_paid: Decimal,
    pub payment_kind: PaymentKind,
    pub status: TicketStatus,
    pub origin: TicketOrigin,
    pub is_vip: bool,
    pub special_instructions: Option<String>,
    pub valid_until: Option<DateTime<Utc>>,
    pub confirmation_sent_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub validated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn balance_due(&self) -> Decimal {
        (self.total_price - self.amount_paid).max(Decimal::ZERO)
    }

    pub fn remaining_admissions(&self) -> i32 {
        self.quantity - self.redeemed_count
    }

    fn is_past_validity(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_some_and(|cutoff| cutoff <= now)
    }

    fn transition(&mut self, transition: TicketTransition, now: DateTime<Utc>) -> Result<(), AppError> {
        let next = self.status.next(transition).ok_or_else(|| {
            AppError::ValidationError(format!(
                "Ticket {} cannot go from {} via {:?}",
                self.id, self.status, transition
            ))
        })?;
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Consumes one admission.
    pub fn redeem(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        match self.status {
            TicketStatus::Invalidated => {
                return Err(AppError::InvalidCode("Ticket has been invalidated".into()))
            }
            TicketStatus::Expired => return Err(AppError::InvalidCode("Ticket has expired".into())),
            TicketStatus::PendingPayment => {
                return Err(AppError::InvalidCode("Ticket payment is still pending".into()))
            }
            _ => {}
        }

        if self.redeemed_count >= self.quantity {
            return Err(AppError::AlreadyRedeemed(format!(
                "All {} admission(s) on this ticket were already used",
                self.quantity
            )));
        }

        if self.is_past_validity(now) {
            return Err(AppError::InvalidCode("Ticket has expired".into()));
        }

        let remaining = self.quantity - (self.redeemed_count + 1);
        self.transition(TicketTransition::Redeem { remaining }, now)?;
        self.redeemed_count += 1;
        self.validated_at.get_or_insert(now);
        Ok(())
    }

    /// Applies the provider's cumulative paid amount. Re-applying the same or
    /// a smaller amount leaves the ticket untouched.
    pub fn apply_payment(&mut self, reported: Decimal, now: DateTime<Utc>) -> Result<(), AppError> {
        if matches!(self.status, TicketStatus::Invalidated | TicketStatus::Expired) {
            return Err(AppError::PaymentMismatch(format!(
                "Ticket {} is {} and can no longer be paid",
                self.id, self.status
            )));
        }
        if reported > self.total_price {
            return Err(AppError::PaymentMismatch(format!(
                "Reported amount {} exceeds ticket total {}",
                reported, self.total_price
            )));
        }
        if reported <= self.amount_paid {
            return Ok(());
        }

        self.amount_paid = reported;
        self.updated_at = now;

        let fully_paid = self.amount_paid >= self.total_price;
        match self.status {
            TicketStatus::PendingPayment if !fully_paid && self.amount_paid < self.amount_due => {
                Ok(())
            }
            TicketStatus::PendingPayment | TicketStatus::PartiallyPaid => {
                self.transition(TicketTransition::Settle { fully_paid }, now)
            }
            _ => Ok(()),
        }
    }

    /// Staff action; legal from any non-terminal state.
    pub fn invalidate(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        self.transition(TicketTransition::Invalidate, now)
    }

    /// Drops a ticket whose payment never arrived. Paid tickets are left alone.
    pub fn cancel_unpaid(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.status == TicketStatus::PendingPayment {
            self.transition(TicketTransition::Invalidate, now)?;
        }
        Ok(())
    }

    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        if !self.is_past_validity(now) {
            return Err(AppError::ValidationError(format!(
                "Ticket {} is still within its validity window",
                self.id
            )));
        }
        self.transition(TicketTransition::Expire, now)
    }

    pub fn mark_confirmation_sent(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.status.is_terminal() {
            return Err(AppError::ValidationError(format!(
                "Ticket {} is {}",
                self.id, self.status
            )));
        }
        self.confirmation_sent_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Records the holder's intent to attend. Never touches `redeemed_count`.
    pub fn confirm_attendance(&mut self, user_id: Uuid, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.user_id != user_id {
            return Err(AppError::Forbidden(
                "Only the ticket holder can confirm attendance".into(),
            ));
        }
        if self.confirmation_sent_at.is_none() {
            return Err(AppError::ValidationError(
                "No attendance confirmation was requested for this ticket".into(),
            ));
        }
        if self.confirmed_at.is_some() {
            return Err(AppError::ValidationError(
                "Attendance was already confirmed".into(),
            ));
        }
        if self.status.is_terminal() || self.status == TicketStatus::PendingPayment {
            return Err(AppError::InvalidCode(format!("Ticket is {}", self.status)));
        }
        self.confirmed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}
