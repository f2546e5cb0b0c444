use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reservation_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReservationState {
    Held,
    Committed,
    Released,
}

/// Inventory taken from a tier but not yet final. The stock counter is
/// already decremented while held; releasing gives the units back.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Uuid,
    pub tier_id: Uuid,
    /// Ticket the units were taken for.
    pub holder_id: Uuid,
    pub units: i32,
    pub state: ReservationState,
    /// `None` for holds that never time out (immediate sales).
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Reservation {
    /// Held -> `to`. Returns `false` if the token was already settled.
    pub fn settle(&mut self, to: ReservationState, now: DateTime<Utc>) -> bool {
        if self.state != ReservationState::Held || to == ReservationState::Held {
            return false;
        }
        self.state = to;
        self.settled_at = Some(now);
        true
    }

    pub fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.state == ReservationState::Held && self.expires_at.is_some_and(|at| at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_settle_is_one_shot() {
        let now = Utc::now();
        let mut res = Reservation {
            id: Uuid::new_v4(),
            tier_id: Uuid::new_v4(),
            holder_id: Uuid::new_v4(),
            units: 2,
            state: ReservationState::Held,
            expires_at: Some(now + Duration::minutes(15)),
            created_at: now,
            settled_at: None,
        };

        assert!(!res.is_lapsed(now));
        assert!(res.is_lapsed(now + Duration::minutes(15)));

        assert!(res.settle(ReservationState::Committed, now));
        assert!(!res.settle(ReservationState::Released, now));
        assert_eq!(res.state, ReservationState::Committed);
        assert!(!res.is_lapsed(now + Duration::hours(1)));
    }
}
