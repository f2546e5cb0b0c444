use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::models::caller::{Caller, Role};
use crate::models::ticket::{PaymentKind, Ticket, TicketOrigin, TicketStatus};
use crate::models::tier::{ProductKind, TicketTier};
use crate::services::inventory::InventoryLedger;
use crate::store::{not_found, Store};
use crate::utils::error::AppError;

fn default_quantity() -> i32 {
    1
}

fn default_payment_kind() -> PaymentKind {
    PaymentKind::Full
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    pub origin: TicketOrigin,
    pub tier_id: Uuid,
    /// Recipient. Defaults to the caller.
    pub user_id: Option<Uuid>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default = "default_payment_kind")]
    pub payment_kind: PaymentKind,
    pub table_id: Option<Uuid>,
    pub special_instructions: Option<String>,
    #[serde(default)]
    pub is_vip_access: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueReceipt {
    pub ticket_id: Uuid,
    pub status: TicketStatus,
    pub amount_due: Decimal,
    /// Reference to hand to the payment provider while payment is pending.
    pub payment_reference: Option<String>,
}

/// Money and lifecycle figures for a new ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pricing {
    payment_kind: PaymentKind,
    total_price: Decimal,
    amount_due: Decimal,
    amount_paid: Decimal,
    status: TicketStatus,
    awaits_provider: bool,
}

fn price_order(
    tier: &TicketTier,
    origin: TicketOrigin,
    requested_kind: PaymentKind,
    units: i32,
) -> Result<Pricing, AppError> {
    let payment_kind = if origin.is_complimentary() {
        PaymentKind::Gift
    } else if requested_kind == PaymentKind::Gift {
        return Err(AppError::ValidationError(
            "Only invitations and gifts are issued free of charge".into(),
        ));
    } else {
        requested_kind
    };

    let units = Decimal::from(units);
    let amount_due = tier.unit_price(payment_kind)? * units;
    let total_price = match payment_kind {
        PaymentKind::Gift => Decimal::ZERO,
        PaymentKind::Full | PaymentKind::Deposit => tier.price * units,
    };

    // Self-service money goes through the provider; staff collect it at the counter.
    let awaits_provider = origin == TicketOrigin::SelfService && amount_due > Decimal::ZERO;
    let amount_paid = match origin {
        TicketOrigin::ManualSale => amount_due,
        _ => Decimal::ZERO,
    };
    let status = if awaits_provider {
        TicketStatus::PendingPayment
    } else if amount_paid >= total_price {
        TicketStatus::Valid
    } else {
        TicketStatus::PartiallyPaid
    };

    Ok(Pricing {
        payment_kind,
        total_price,
        amount_due,
        amount_paid,
        status,
        awaits_provider,
    })
}

/// Turns inventory into tickets for every sales channel.
pub struct IssuanceService<S> {
    store: Arc<S>,
    inventory: InventoryLedger<S>,
    payment_hold: Duration,
    max_per_order: i32,
}

impl<S> Clone for IssuanceService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            inventory: self.inventory.clone(),
            payment_hold: self.payment_hold,
            max_per_order: self.max_per_order,
        }
    }
}

impl<S: Store> IssuanceService<S> {
    pub fn new(
        store: Arc<S>,
        inventory: InventoryLedger<S>,
        payment_hold: Duration,
        max_per_order: i32,
    ) -> Self {
        Self {
            store,
            inventory,
            payment_hold,
            max_per_order,
        }
    }

    pub async fn issue(
        &self,
        caller: &Caller,
        request: IssueRequest,
        now: DateTime<Utc>,
    ) -> Result<IssueReceipt, AppError> {
        let origin = request.origin;
        if !caller.may_issue(origin) {
            return Err(AppError::Forbidden(format!(
                "{:?} callers cannot issue {:?} tickets",
                caller.role, origin
            )));
        }

        let user_id = request.user_id.unwrap_or(caller.user_id);
        if origin == TicketOrigin::SelfService && user_id != caller.user_id && !caller.is_staff() {
            return Err(AppError::Forbidden(
                "Self-service tickets can only be bought for yourself".into(),
            ));
        }

        if request.quantity < 1 {
            return Err(AppError::ValidationError(
                "Quantity must be at least 1".into(),
            ));
        }
        if origin == TicketOrigin::SelfService && request.quantity > self.max_per_order {
            return Err(AppError::ValidationError(format!(
                "At most {} tickets per order",
                self.max_per_order
            )));
        }

        let tier = self
            .store
            .get_tier(request.tier_id)
            .await?
            .ok_or_else(|| not_found("Tier", request.tier_id))?;
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| not_found("User", user_id))?;

        match (tier.kind, request.table_id) {
            (ProductKind::VipTable, None) => {
                return Err(AppError::ValidationError(
                    "A table must be chosen for VIP table tiers".into(),
                ))
            }
            (ProductKind::VipTable, Some(table_id)) => {
                let table = self
                    .store
                    .get_table(table_id)
                    .await?
                    .ok_or_else(|| not_found("Table", table_id))?;
                if table.event_id != tier.event_id {
                    return Err(AppError::ValidationError(format!(
                        "Table {} belongs to another event",
                        table.number
                    )));
                }
            }
            (_, Some(_)) => {
                return Err(AppError::ValidationError(
                    "Only VIP table tiers can reserve a table".into(),
                ))
            }
            (_, None) => {}
        }

        let pricing = price_order(
            &tier,
            origin,
            request.payment_kind,
            tier.units_for(request.quantity),
        )?;

        let ticket_id = Uuid::new_v4();
        let hold = pricing.awaits_provider.then_some(self.payment_hold);
        let reservation = self
            .inventory
            .sale_token(&tier, request.quantity, ticket_id, hold, now)?;

        let complimentary_extras = origin != TicketOrigin::SelfService;
        let ticket = Ticket {
            id: ticket_id,
            user_id,
            tier_id: tier.id,
            event_id: tier.event_id,
            promoter_id: (caller.role == Role::Promoter).then_some(caller.user_id),
            table_id: request.table_id,
            reservation_id: Some(reservation.id),
            quantity: request.quantity,
            redeemed_count: 0,
            total_price: pricing.total_price,
            amount_due: pricing.amount_due,
            amount_paid: pricing.amount_paid,
            payment_kind: pricing.payment_kind,
            status: pricing.status,
            origin,
            is_vip: tier.kind == ProductKind::VipTable
                || (complimentary_extras && request.is_vip_access),
            special_instructions: request
                .special_instructions
                .filter(|_| complimentary_extras),
            valid_until: tier.valid_until,
            confirmation_sent_at: None,
            confirmed_at: None,
            validated_at: None,
            created_at: now,
            updated_at: now,
        };

        let tier = self.store.issue_ticket(&reservation, &ticket, now).await?;

        info!(
            ticket_id = %ticket.id,
            user_id = %ticket.user_id,
            tier_id = %ticket.tier_id,
            origin = ?origin,
            quantity = ticket.quantity,
            status = %ticket.status,
            amount_due = %ticket.amount_due,
            remaining = ?tier.remaining_quantity,
            "Ticket issued"
        );

        Ok(IssueReceipt {
            ticket_id: ticket.id,
            status: ticket.status,
            amount_due: ticket.amount_due,
            payment_reference: pricing.awaits_provider.then(|| ticket.id.to_string()),
        })
    }
}
