use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use chrono::Duration;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

/// Chance units per eligible ticket in a raffle pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaffleWeights {
    pub vip: u32,
    pub paid: u32,
    pub free: u32,
}

impl Default for RaffleWeights {
    fn default() -> Self {
        Self {
            vip: 3,
            paid: 2,
            free: 1,
        }
    }
}

/// Business knobs shared by the engine components.
#[derive(Debug, Clone)]
pub struct Policy {
    /// How long a pending payment keeps its stock held.
    pub payment_hold: Duration,
    pub max_tickets_per_order: i32,
    pub raffle_weights: RaffleWeights,
    pub birthday_max_guests: i32,
    /// UTC hour on the morning after the event when a birthday benefit lapses.
    pub birthday_cutoff_hour: u32,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            payment_hold: Duration::minutes(15),
            max_tickets_per_order: 10,
            raffle_weights: RaffleWeights::default(),
            birthday_max_guests: 10,
            birthday_cutoff_hour: 6,
        }
    }
}

pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub sweep_interval: std::time::Duration,
    pub policy: Policy,
}

/// Reads `key`, falling back to `default` when unset or unparsable.
fn parse_var<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Config: invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Policy::default();

        let policy = Policy {
            payment_hold: Duration::minutes(parse_var(
                "PAYMENT_HOLD_MINUTES",
                defaults.payment_hold.num_minutes(),
            )),
            max_tickets_per_order: parse_var(
                "MAX_TICKETS_PER_ORDER",
                defaults.max_tickets_per_order,
            ),
            raffle_weights: RaffleWeights {
                vip: parse_var("RAFFLE_WEIGHT_VIP", defaults.raffle_weights.vip),
                paid: parse_var("RAFFLE_WEIGHT_PAID", defaults.raffle_weights.paid),
                free: parse_var("RAFFLE_WEIGHT_FREE", defaults.raffle_weights.free),
            },
            birthday_max_guests: parse_var("BIRTHDAY_MAX_GUESTS", defaults.birthday_max_guests),
            birthday_cutoff_hour: parse_var("BIRTHDAY_CUTOFF_HOUR", defaults.birthday_cutoff_hour)
                .min(23),
        };

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/venue".to_string()),
            bind_addr: parse_var("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3001))),
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 5),
            sweep_interval: std::time::Duration::from_secs(
                parse_var("SWEEP_INTERVAL_SECS", 30u64).max(1),
            ),
            policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_values_fall_back() {
        std::env::set_var("RAFFLE_WEIGHT_TEST_ONLY", "three");
        assert_eq!(parse_var("RAFFLE_WEIGHT_TEST_ONLY", 3u32), 3);
        std::env::set_var("RAFFLE_WEIGHT_TEST_ONLY", " 7 ");
        assert_eq!(parse_var("RAFFLE_WEIGHT_TEST_ONLY", 3u32), 7);
        std::env::remove_var("RAFFLE_WEIGHT_TEST_ONLY");
    }

    #[test]
    fn test_default_policy() {
        let policy = Policy::default();
        assert_eq!(policy.raffle_weights, RaffleWeights { vip: 3, paid: 2, free: 1 });
        assert_eq!(policy.payment_hold, Duration::minutes(15));
    }
}
