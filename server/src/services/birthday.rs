use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::models::birthday::{
    benefit_expiry, birthday_week_start, validate_guest_limit, BenefitPayload, BenefitQr,
    BirthdayBenefit,
};
use crate::models::caller::Caller;
use crate::store::{not_found, Store};
use crate::utils::error::AppError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimBenefit {
    pub event_id: Uuid,
    #[serde(default)]
    pub guest_limit: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGuestLimit {
    pub guest_limit: i32,
}

/// Monday of the birthday week that contains `event_date`, if any.
/// Neighbouring years are checked so weeks spanning New Year still match.
pub fn eligible_week(birth_date: NaiveDate, event_date: NaiveDate) -> Option<NaiveDate> {
    let year = event_date.year();
    [year - 1, year, year + 1]
        .into_iter()
        .filter_map(|y| birthday_week_start(birth_date, y))
        .find(|start| *start <= event_date && event_date < *start + Duration::days(7))
}

pub struct BirthdayManager<S> {
    store: Arc<S>,
    max_guests: i32,
    cutoff_hour: u32,
}

impl<S> Clone for BirthdayManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            max_guests: self.max_guests,
            cutoff_hour: self.cutoff_hour,
        }
    }
}

impl<S: Store> BirthdayManager<S> {
    pub fn new(store: Arc<S>, max_guests: i32, cutoff_hour: u32) -> Self {
        Self {
            store,
            max_guests,
            cutoff_hour,
        }
    }

    pub async fn claim(
        &self,
        caller: &Caller,
        request: ClaimBenefit,
        now: DateTime<Utc>,
    ) -> Result<BenefitPayload, AppError> {
        validate_guest_limit(request.guest_limit, self.max_guests)?;

        let user = self
            .store
            .get_user(caller.user_id)
            .await?
            .ok_or_else(|| not_found("User", caller.user_id))?;
        let event = self
            .store
            .get_event(request.event_id)
            .await?
            .ok_or_else(|| not_found("Event", request.event_id))?;

        let birth_date = user.birth_date.ok_or_else(|| {
            AppError::OutOfWindow("No birth date on file for this account".into())
        })?;
        let event_date = event.start_time.date_naive();
        let week_start = eligible_week(birth_date, event_date).ok_or_else(|| {
            AppError::OutOfWindow(format!(
                "'{}' is not in your birthday week",
                event.title
            ))
        })?;

        let expires_at = benefit_expiry(event_date, self.cutoff_hour).ok_or_else(|| {
            AppError::InternalServerError("Could not compute benefit expiry".into())
        })?;
        if expires_at <= now {
            return Err(AppError::OutOfWindow(format!(
                "'{}' is already over",
                event.title
            )));
        }

        let benefit = BirthdayBenefit::new(
            user.id,
            event.id,
            week_start,
            request.guest_limit,
            expires_at,
            now,
        );
        self.store.insert_benefit(&benefit).await?;

        info!(
            benefit_id = %benefit.id,
            user_id = %user.id,
            event_id = %event.id,
            guest_limit = benefit.guest_limit,
            "Birthday benefit claimed"
        );
        Ok(benefit.payload())
    }

    pub async fn update_guest_limit(
        &self,
        caller: &Caller,
        benefit_id: Uuid,
        new_limit: i32,
        now: DateTime<Utc>,
    ) -> Result<BenefitPayload, AppError> {
        let caller = *caller;
        let max_guests = self.max_guests;
        let benefit = self
            .store
            .update_benefit(benefit_id, &move |b: &mut BirthdayBenefit| {
                if b.user_id != caller.user_id && !caller.is_staff() {
                    return Err(AppError::Forbidden(
                        "Only the celebrant can change the guest list".into(),
                    ));
                }
                b.update_guest_limit(new_limit, max_guests, now)
            })
            .await?;

        info!(
            benefit_id = %benefit.id,
            guest_limit = benefit.guest_limit,
            updates_remaining = benefit.updates_remaining,
            "Birthday guest limit updated"
        );
        Ok(benefit.payload())
    }

    /// Admits the celebrant and all guests in one step.
    pub async fn redeem_entry(
        &self,
        qr_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<BirthdayBenefit, AppError> {
        let benefit_id = self.resolve(qr_id, BenefitQr::Entry).await?;
        let benefit = self
            .store
            .update_benefit(benefit_id, &move |b: &mut BirthdayBenefit| b.redeem_entry(now))
            .await?;
        info!(
            benefit_id = %benefit.id,
            guests_entered = benefit.guests_entered,
            "Birthday party admitted"
        );
        Ok(benefit)
    }

    pub async fn redeem_gift(
        &self,
        qr_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<BirthdayBenefit, AppError> {
        let benefit_id = self.resolve(qr_id, BenefitQr::Gift).await?;
        let benefit = self
            .store
            .update_benefit(benefit_id, &move |b: &mut BirthdayBenefit| b.redeem_gift(now))
            .await?;
        info!(benefit_id = %benefit.id, "Birthday gift handed out");
        Ok(benefit)
    }

    async fn resolve(&self, qr_id: Uuid, qr: BenefitQr) -> Result<Uuid, AppError> {
        self.store
            .benefit_for_qr(qr_id, qr)
            .await?
            .ok_or_else(|| AppError::InvalidCode("Unknown birthday code".into()))
    }
}
