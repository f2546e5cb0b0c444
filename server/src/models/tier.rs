use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::ticket::PaymentKind;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "product_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductKind {
    Ticket,
    VipTable,
    Voucher,
}

/// A sellable product definition.
///
/// `remaining_quantity` is `None` for unlimited stock. It only ever changes
/// through [`TicketTier::take_stock`] and [`TicketTier::restore_stock`].
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TicketTier {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub original_price: Decimal,
    pub remaining_quantity: Option<i32>,
    pub kind: ProductKind,
    pub valid_until: Option<DateTime<Utc>>,
    pub allows_partial: bool,
    pub partial_price: Option<Decimal>,
    /// Bar credit included with each ticket; reported on every accepted scan.
    pub consumption_credit: Option<Decimal>,
    /// Listing flag for the birthday menu. Catalogue data only: the birthday
    /// flow does not sell tiers, so nothing in the engine branches on it.
    pub birthday_offer: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TicketTier {
    /// Stock units a request for `requested` admissions consumes. Tables are sold whole.
    pub fn units_for(&self, requested: i32) -> i32 {
        match self.kind {
            ProductKind::VipTable => 1,
            ProductKind::Ticket | ProductKind::Voucher => requested,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_some_and(|cutoff| cutoff <= now)
    }

    /// Guarded decrement. Leaves the tier untouched on error.
    pub fn take_stock(&mut self, units: i32, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.is_expired(now) {
            return Err(AppError::TierExpired(format!(
                "Tier '{}' is no longer on sale",
                self.name
            )));
        }

        if let Some(remaining) = self.remaining_quantity {
            if remaining < units {
                return Err(AppError::OutOfStock(format!(
                    "Tier '{}' has {} unit(s) left, {} requested",
                    self.name, remaining, units
                )));
            }
            self.remaining_quantity = Some(remaining - units);
        }

        self.updated_at = now;
        Ok(())
    }

    pub fn restore_stock(&mut self, units: i32, now: DateTime<Utc>) {
        if let Some(remaining) = self.remaining_quantity.as_mut() {
            *remaining += units;
            self.updated_at = now;
        }
    }

    /// Price charged per stock unit for the given payment kind.
    pub fn unit_price(&self, kind: PaymentKind) -> Result<Decimal, AppError> {
        match kind {
            PaymentKind::Full => Ok(self.price),
            PaymentKind::Deposit => match (self.allows_partial, self.partial_price) {
                (true, Some(partial)) => Ok(partial),
                _ => Err(AppError::PartialNotAllowed(format!(
                    "Tier '{}' does not accept deposits",
                    self.name
                ))),
            },
            PaymentKind::Gift => Ok(Decimal::ZERO),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTier {
    pub event_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub kind: ProductKind,
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub allows_partial: bool,
    pub partial_price: Option<Decimal>,
    pub consumption_credit: Option<Decimal>,
    #[serde(default)]
    pub birthday_offer: bool,
}

impl CreateTier {
    pub fn into_tier(self, now: DateTime<Utc>) -> Result<TicketTier, AppError> {
        if self.price.is_sign_negative() {
            return Err(AppError::ValidationError("Price cannot be negative".into()));
        }
        if self.quantity.is_some_and(|q| q < 0) {
            return Err(AppError::ValidationError(
                "Quantity cannot be negative".into(),
            ));
        }
        if self.allows_partial
            && !self
                .partial_price
                .is_some_and(|p| !p.is_sign_negative() && p <= self.price)
        {
            return Err(AppError::ValidationError(
                "Partial price must be set and not exceed the full price".into(),
            ));
        }

        Ok(TicketTier {
            id: Uuid::new_v4(),
            event_id: self.event_id,
            name: self.name,
            price: self.price,
            original_price: self.original_price.unwrap_or(self.price),
            remaining_quantity: self.quantity,
            kind: self.kind,
            valid_until: self.valid_until,
            allows_partial: self.allows_partial,
            partial_price: self.partial_price,
            consumption_credit: self.consumption_credit,
            birthday_offer: self.birthday_offer,
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn tier(kind: ProductKind, remaining: Option<i32>) -> TicketTier {
        let now = Utc::now();
        TicketTier {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            name: "General".into(),
            price: Decimal::from(100),
            original_price: Decimal::from(120),
            remaining_quantity: remaining,
            kind,
            valid_until: None,
            allows_partial: false,
            partial_price: None,
            consumption_credit: None,
            birthday_offer: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_take_stock_rejects_overdraw() {
        let mut t = tier(ProductKind::Ticket, Some(2));
        let err = t.take_stock(3, Utc::now()).unwrap_err();
        assert_eq!(err.code(), "OUT_OF_STOCK");
        assert_eq!(t.remaining_quantity, Some(2));

        t.take_stock(2, Utc::now()).unwrap();
        assert_eq!(t.remaining_quantity, Some(0));
    }

    #[test]
    fn test_expired_tier_rejects_even_with_stock() {
        let now = Utc::now();
        let mut t = tier(ProductKind::Ticket, Some(50));
        t.valid_until = Some(now - Duration::minutes(1));

        let err = t.take_stock(1, now).unwrap_err();
        assert_eq!(err.code(), "TIER_EXPIRED");
        assert_eq!(t.remaining_quantity, Some(50));
    }

    #[test]
    fn test_unlimited_stock_never_runs_out() {
        let mut t = tier(ProductKind::Voucher, None);
        t.take_stock(10_000, Utc::now()).unwrap();
        t.restore_stock(5, Utc::now());
        assert_eq!(t.remaining_quantity, None);
    }

    #[test]
    fn test_tables_are_sold_whole() {
        let t = tier(ProductKind::VipTable, Some(4));
        assert_eq!(t.units_for(8), 1);
        assert_eq!(tier(ProductKind::Ticket, None).units_for(8), 8);
    }

    #[test]
    fn test_deposit_requires_partial_eligibility() {
        let mut t = tier(ProductKind::Ticket, Some(1));
        assert_eq!(
            t.unit_price(PaymentKind::Deposit).unwrap_err().code(),
            "PARTIAL_NOT_ALLOWED"
        );

        t.allows_partial = true;
        t.partial_price = Some(Decimal::from(30));
        assert_eq!(t.unit_price(PaymentKind::Deposit).unwrap(), Decimal::from(30));
        assert_eq!(t.unit_price(PaymentKind::Gift).unwrap(), Decimal::ZERO);
    }
}
