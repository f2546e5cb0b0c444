use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RafflePrize {
    /// 1 is the top prize.
    pub rank: i32,
    pub product_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaffleConfig {
    pub event_id: Uuid,
    pub draw_date: DateTime<Utc>,
    /// Only tickets bought before this instant take part.
    pub entry_cutoff: DateTime<Utc>,
    pub number_of_winners: i32,
    pub prizes: Vec<RafflePrize>,
    pub drawn_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RaffleWinner {
    pub event_id: Uuid,
    pub rank: i32,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub ticket_id: Uuid,
    pub drawn_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureRaffle {
    pub draw_date: DateTime<Utc>,
    pub entry_cutoff: Option<DateTime<Utc>>,
    pub number_of_winners: i32,
    pub prizes: Vec<RafflePrize>,
}

impl ConfigureRaffle {
    pub fn into_config(self, event_id: Uuid) -> Result<RaffleConfig, AppError> {
        if self.number_of_winners < 1 {
            return Err(AppError::ValidationError(
                "A raffle needs at least one winner".into(),
            ));
        }

        let mut prizes = self.prizes;
        prizes.sort_by_key(|p| p.rank);
        let ranks_ok = prizes.len() == self.number_of_winners as usize
            && prizes
                .iter()
                .enumerate()
                .all(|(i, p)| p.rank == i as i32 + 1);
        if !ranks_ok {
            return Err(AppError::ValidationError(format!(
                "Prize ranks must be exactly 1..={}",
                self.number_of_winners
            )));
        }

        let entry_cutoff = self.entry_cutoff.unwrap_or(self.draw_date);
        if entry_cutoff > self.draw_date {
            return Err(AppError::ValidationError(
                "Entry cutoff cannot be after the draw date".into(),
            ));
        }

        Ok(RaffleConfig {
            event_id,
            draw_date: self.draw_date,
            entry_cutoff,
            number_of_winners: self.number_of_winners,
            prizes,
            drawn_at: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prizes_are_ranked_and_complete() {
        let now = Utc::now();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let config = ConfigureRaffle {
            draw_date: now,
            entry_cutoff: None,
            number_of_winners: 2,
            prizes: vec![
                RafflePrize { rank: 2, product_id: b },
                RafflePrize { rank: 1, product_id: a },
            ],
        }
        .into_config(Uuid::new_v4())
        .unwrap();

        assert_eq!(config.prizes[0].product_id, a);
        assert_eq!(config.entry_cutoff, now);

        let gap = ConfigureRaffle {
            draw_date: now,
            entry_cutoff: None,
            number_of_winners: 2,
            prizes: vec![
                RafflePrize { rank: 1, product_id: a },
                RafflePrize { rank: 3, product_id: b },
            ],
        };
        assert!(gap.into_config(Uuid::new_v4()).is_err());
    }
}
