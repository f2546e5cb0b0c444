use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::error::AppError;

/// Guest-limit edits allowed after the claim.
pub const GUEST_LIMIT_UPDATES: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenefitQr {
    Entry,
    Gift,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BirthdayBenefit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    /// Monday of the birthday week this benefit was claimed for.
    pub week_start: NaiveDate,
    pub guest_limit: i32,
    pub guests_entered: i32,
    pub updates_remaining: i32,
    pub entry_qr_id: Uuid,
    pub gift_qr_id: Uuid,
    pub entry_redeemed_at: Option<DateTime<Utc>>,
    pub gift_redeemed_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What the client app receives after a claim or an edit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenefitPayload {
    pub benefit_id: Uuid,
    pub entry_qr_id: Uuid,
    pub gift_qr_id: Uuid,
    pub guest_limit: i32,
    pub updates_remaining: i32,
    pub expires_at: DateTime<Utc>,
}

/// Monday of the week holding `birth_date`'s anniversary in `year`.
/// A 29 February birthday falls back to 28 February in common years.
pub fn birthday_week_start(birth_date: NaiveDate, year: i32) -> Option<NaiveDate> {
    let anniversary = NaiveDate::from_ymd_opt(year, birth_date.month(), birth_date.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, birth_date.month(), birth_date.day() - 1))?;
    let offset = anniversary.weekday().num_days_from_monday();
    Some(anniversary - Duration::days(i64::from(offset)))
}

/// The benefit lapses the morning after the event, at `cutoff_hour` UTC.
pub fn benefit_expiry(event_date: NaiveDate, cutoff_hour: u32) -> Option<DateTime<Utc>> {
    Some(event_date.succ_opt()?.and_hms_opt(cutoff_hour, 0, 0)?.and_utc())
}

pub fn validate_guest_limit(limit: i32, max: i32) -> Result<(), AppError> {
    if limit < 0 {
        return Err(AppError::NegativeGuests(
            "Guest limit cannot be negative".into(),
        ));
    }
    if limit > max {
        return Err(AppError::GuestLimitExceeded(format!(
            "At most {} guests are allowed",
            max
        )));
    }
    Ok(())
}

impl BirthdayBenefit {
    pub fn new(
        user_id: Uuid,
        event_id: Uuid,
        week_start: NaiveDate,
        guest_limit: i32,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            event_id,
            week_start,
            guest_limit,
            guests_entered: 0,
            updates_remaining: GUEST_LIMIT_UPDATES,
            entry_qr_id: Uuid::new_v4(),
            gift_qr_id: Uuid::new_v4(),
            entry_redeemed_at: None,
            gift_redeemed_at: None,
            expires_at,
            created_at: now,
            updated_at: now,
        }
    }

    /// The celebrant plus their guests.
    pub fn party_size(&self) -> i32 {
        1 + self.guest_limit
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn update_guest_limit(
        &mut self,
        new_limit: i32,
        max: i32,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        validate_guest_limit(new_limit, max)?;
        if self.updates_remaining <= 0 {
            return Err(AppError::GuestLimitExceeded(
                "The guest list can no longer be edited".into(),
            ));
        }
        if self.entry_redeemed_at.is_some() {
            return Err(AppError::ValidationError(
                "The party has already entered".into(),
            ));
        }
        if self.is_expired(now) {
            return Err(AppError::OutOfWindow("The birthday benefit has expired".into()));
        }

        self.guest_limit = new_limit;
        self.updates_remaining -= 1;
        self.updated_at = now;
        Ok(())
    }

    /// Admits the whole party in one step.
    pub fn redeem_entry(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.entry_redeemed_at.is_some() {
            return Err(AppError::AlreadyRedeemed(format!(
                "Birthday party of {} already entered",
                self.guests_entered
            )));
        }
        if self.is_expired(now) {
            return Err(AppError::InvalidCode("Birthday entry code has expired".into()));
        }

        self.guests_entered += self.party_size();
        self.entry_redeemed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn redeem_gift(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.gift_redeemed_at.is_some() {
            return Err(AppError::AlreadyRedeemed(
                "Birthday gift was already handed out".into(),
            ));
        }
        self.gift_redeemed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn payload(&self) -> BenefitPayload {
        BenefitPayload {
            benefit_id: self.id,
            entry_qr_id: self.entry_qr_id,
            gift_qr_id: self.gift_qr_id,
            guest_limit: self.guest_limit,
            updates_remaining: self.updates_remaining,
            expires_at: self.expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn benefit(now: DateTime<Utc>) -> BirthdayBenefit {
        BirthdayBenefit::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2026, 10, 12).unwrap(),
            3,
            now + Duration::hours(12),
            now,
        )
    }

    #[test]
    fn test_week_start_is_monday() {
        let birth = NaiveDate::from_ymd_opt(1990, 10, 15).unwrap();
        // 15 Oct 2026 is a Thursday
        assert_eq!(
            birthday_week_start(birth, 2026),
            NaiveDate::from_ymd_opt(2026, 10, 12)
        );
    }

    #[test]
    fn test_leap_day_birthday_in_common_year() {
        let birth = NaiveDate::from_ymd_opt(2000, 2, 29).unwrap();
        let start = birthday_week_start(birth, 2026).unwrap();
        assert!(start <= NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
        assert_eq!(start.weekday(), chrono::Weekday::Mon);
    }

    #[test]
    fn test_expiry_is_next_morning() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let expiry = benefit_expiry(date, 6).unwrap();
        assert_eq!(expiry.to_rfc3339(), "2026-10-18T06:00:00+00:00");
    }

    #[test]
    fn test_two_edits_then_locked() {
        let now = Utc::now();
        let mut b = benefit(now);

        b.update_guest_limit(5, 10, now).unwrap();
        b.update_guest_limit(4, 10, now).unwrap();
        assert_eq!(b.updates_remaining, 0);

        let err = b.update_guest_limit(2, 10, now).unwrap_err();
        assert_eq!(err.code(), "GUEST_LIMIT_EXCEEDED");
        assert_eq!(b.updates_remaining, 0);
        assert_eq!(b.guest_limit, 4);
    }

    #[test]
    fn test_negative_limit_rejected_without_spending_an_edit() {
        let now = Utc::now();
        let mut b = benefit(now);
        assert_eq!(
            b.update_guest_limit(-1, 10, now).unwrap_err().code(),
            "NEGATIVE_GUESTS"
        );
        assert_eq!(b.updates_remaining, GUEST_LIMIT_UPDATES);
    }

    #[test]
    fn test_entry_admits_whole_party_once() {
        let now = Utc::now();
        let mut b = benefit(now);
        b.redeem_entry(now).unwrap();
        assert_eq!(b.guests_entered, 4);
        assert_eq!(b.redeem_entry(now).unwrap_err().code(), "ALREADY_REDEEMED");
        assert_eq!(b.guests_entered, 4);
    }

    #[test]
    fn test_expiry_blocks_entry_but_not_gift() {
        let now = Utc::now();
        let mut b = benefit(now);
        let late = now + Duration::days(1);

        assert_eq!(b.redeem_entry(late).unwrap_err().code(), "INVALID_CODE");
        b.redeem_gift(late).unwrap();
        assert_eq!(b.redeem_gift(late).unwrap_err().code(), "ALREADY_REDEEMED");
    }
}
