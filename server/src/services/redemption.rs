use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::caller::Caller;
use crate::models::qr::QrPayload;
use crate::models::redeemable::{Redeemable, RedeemableKind};
use crate::models::ticket::Ticket;
use crate::services::birthday::BirthdayManager;
use crate::services::inventory::InventoryLedger;
use crate::store::Store;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub encoded_payload: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionDetails {
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    pub is_vip: bool,
    pub special_instructions: Option<String>,
    pub promoter_name: Option<String>,
    pub redeemed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admissions_left: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_size: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_due: Option<Decimal>,
    /// Bar credit bundled with the tier, shown so staff can load it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumption_credit: Option<Decimal>,
}

/// What the door scanner shows. Rejections are results, not errors.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionResult {
    pub is_valid: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<RedemptionDetails>,
}

impl RedemptionResult {
    fn accepted(message: impl Into<String>, details: RedemptionDetails) -> Self {
        Self {
            is_valid: true,
            message: message.into(),
            code: None,
            details: Some(details),
        }
    }

    fn rejected(error: &AppError) -> Self {
        Self {
            is_valid: false,
            message: error.public_message(),
            code: Some(error.code()),
            details: None,
        }
    }
}

/// Unknown ids read as a bad code at the door.
fn as_scan_error(error: AppError) -> AppError {
    match error {
        AppError::NotFound(_) => AppError::InvalidCode("Unknown code".into()),
        other => other,
    }
}

/// Door-side ticket lifecycle: scans plus the staff and holder transitions
/// that happen around them.
pub struct RedemptionService<S> {
    store: Arc<S>,
    inventory: InventoryLedger<S>,
    birthdays: BirthdayManager<S>,
}

impl<S> Clone for RedemptionService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            inventory: self.inventory.clone(),
            birthdays: self.birthdays.clone(),
        }
    }
}

impl<S: Store> RedemptionService<S> {
    pub fn new(store: Arc<S>, inventory: InventoryLedger<S>, birthdays: BirthdayManager<S>) -> Self {
        Self {
            store,
            inventory,
            birthdays,
        }
    }

    /// Validates and consumes one scanned QR code.
    pub async fn scan(
        &self,
        caller: &Caller,
        encoded: &str,
        now: DateTime<Utc>,
    ) -> Result<RedemptionResult, AppError> {
        caller.require_staff("scan codes")?;

        let outcome = match QrPayload::decode(encoded) {
            Ok(QrPayload::Ticket(id)) => self.redeem_ticket(id, now).await,
            Ok(QrPayload::Product(id)) => self.redeem_one_shot(id, RedeemableKind::Product, now).await,
            Ok(QrPayload::Reward(id)) => self.redeem_one_shot(id, RedeemableKind::Reward, now).await,
            Ok(QrPayload::BirthdayEntry(id)) => self.redeem_birthday_entry(id, now).await,
            Ok(QrPayload::BirthdayGift(id)) => self.redeem_birthday_gift(id, now).await,
            Err(e) => Err(e),
        };

        match outcome.map_err(as_scan_error) {
            Ok(result) => Ok(result),
            Err(e) if e.is_scan_rejection() => {
                info!(scanner = %caller.user_id, code = e.code(), reason = %e.public_message(), "Scan rejected");
                Ok(RedemptionResult::rejected(&e))
            }
            Err(e) => Err(e),
        }
    }

    async fn redeem_ticket(&self, id: Uuid, now: DateTime<Utc>) -> Result<RedemptionResult, AppError> {
        let ticket = self
            .store
            .update_ticket(id, &move |t: &mut Ticket| t.redeem(now))
            .await?;

        info!(
            ticket_id = %ticket.id,
            redeemed = ticket.redeemed_count,
            quantity = ticket.quantity,
            status = %ticket.status,
            "Ticket redeemed"
        );

        let details = self.ticket_details(&ticket, now).await?;
        let mut message = format!(
            "Admission {} of {}",
            ticket.redeemed_count, ticket.quantity
        );
        let balance = ticket.balance_due();
        if balance > Decimal::ZERO {
            message.push_str(&format!(", balance due {}", balance));
        }
        Ok(RedemptionResult::accepted(message, details))
    }

    async fn ticket_details(
        &self,
        ticket: &Ticket,
        now: DateTime<Utc>,
    ) -> Result<RedemptionDetails, AppError> {
        let client = self.store.get_user(ticket.user_id).await?;
        let tier = self.store.get_tier(ticket.tier_id).await?;
        let promoter = match ticket.promoter_id {
            Some(id) => self.store.get_user(id).await?,
            None => None,
        };

        Ok(RedemptionDetails {
            client_name: client.map(|u| u.name),
            consumption_credit: tier.as_ref().and_then(|t| t.consumption_credit),
            ticket_type: tier.map(|t| t.name),
            is_vip: ticket.is_vip,
            special_instructions: ticket.special_instructions.clone(),
            promoter_name: promoter.map(|u| u.name),
            redeemed_at: Some(now),
            admissions_left: Some(ticket.remaining_admissions()),
            balance_due: Some(ticket.balance_due()).filter(|b| !b.is_zero()),
            ..RedemptionDetails::default()
        })
    }

    async fn redeem_one_shot(
        &self,
        id: Uuid,
        kind: RedeemableKind,
        now: DateTime<Utc>,
    ) -> Result<RedemptionResult, AppError> {
        let item = self
            .store
            .update_redeemable(id, &move |r: &mut Redeemable| {
                if r.kind != kind {
                    return Err(AppError::InvalidCode("Unknown code".into()));
                }
                r.redeem(now)
            })
            .await?;

        info!(redeemable_id = %item.id, kind = ?item.kind, "Voucher redeemed");

        let client = self.store.get_user(item.user_id).await?;
        let details = RedemptionDetails {
            client_name: client.map(|u| u.name),
            product_name: Some(item.name.clone()),
            redeemed_at: item.redeemed_at,
            ..RedemptionDetails::default()
        };
        Ok(RedemptionResult::accepted(format!("'{}' redeemed", item.name), details))
    }

    async fn redeem_birthday_entry(
        &self,
        qr_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<RedemptionResult, AppError> {
        let benefit = self.birthdays.redeem_entry(qr_id, now).await?;
        let client = self.store.get_user(benefit.user_id).await?;
        let details = RedemptionDetails {
            client_name: client.map(|u| u.name),
            product_name: Some("Birthday entry".into()),
            redeemed_at: benefit.entry_redeemed_at,
            party_size: Some(benefit.party_size()),
            ..RedemptionDetails::default()
        };
        Ok(RedemptionResult::accepted(
            format!("Birthday party of {} admitted", benefit.party_size()),
            details,
        ))
    }

    async fn redeem_birthday_gift(
        &self,
        qr_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<RedemptionResult, AppError> {
        let benefit = self.birthdays.redeem_gift(qr_id, now).await?;
        let client = self.store.get_user(benefit.user_id).await?;
        let details = RedemptionDetails {
            client_name: client.map(|u| u.name),
            product_name: Some("Birthday gift".into()),
            redeemed_at: benefit.gift_redeemed_at,
            ..RedemptionDetails::default()
        };
        Ok(RedemptionResult::accepted("Birthday gift handed out", details))
    }

    /// Staff invalidation. A still-held payment hold goes back to stock and
    /// a bound table is freed by the store.
    pub async fn invalidate(
        &self,
        caller: &Caller,
        ticket_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Ticket, AppError> {
        caller.require_staff("invalidate tickets")?;

        let ticket = self
            .store
            .update_ticket(ticket_id, &move |t: &mut Ticket| t.invalidate(now))
            .await?;
        if let Some(reservation_id) = ticket.reservation_id {
            self.inventory.release(reservation_id, now).await?;
        }

        warn!(ticket_id = %ticket.id, by = %caller.user_id, "Ticket invalidated");
        Ok(ticket)
    }

    pub async fn mark_confirmation_sent(
        &self,
        caller: &Caller,
        ticket_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Ticket, AppError> {
        caller.require_staff("start confirmation campaigns")?;
        let ticket = self
            .store
            .update_ticket(ticket_id, &move |t: &mut Ticket| t.mark_confirmation_sent(now))
            .await?;
        debug!(ticket_id = %ticket.id, "Attendance confirmation requested");
        Ok(ticket)
    }

    pub async fn confirm_attendance(
        &self,
        caller: &Caller,
        ticket_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Ticket, AppError> {
        let user_id = caller.user_id;
        let ticket = self
            .store
            .update_ticket(ticket_id, &move |t: &mut Ticket| t.confirm_attendance(user_id, now))
            .await?;
        info!(ticket_id = %ticket.id, user_id = %user_id, "Attendance confirmed");
        Ok(ticket)
    }

    /// Persists `expired` on tickets whose validity window has closed.
    pub async fn expire_stale(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let mut expired = 0;
        for id in self.store.stale_tickets(now).await? {
            match self
                .store
                .update_ticket(id, &move |t: &mut Ticket| t.expire(now))
                .await
            {
                Ok(_) => expired += 1,
                // Redeemed or invalidated in the meantime.
                Err(AppError::ValidationError(_)) => {}
                Err(e) => return Err(e),
            }
        }
        if expired > 0 {
            info!(count = expired, "Expired stale tickets");
        }
        Ok(expired)
    }
}
