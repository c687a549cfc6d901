//! Per-user poke counter. In memory only; counts are lost on restart.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

use crate::config::PokeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PokeRecord {
    pub last_poke: DateTime<Utc>,
    pub count: u32,
}

/// Counts consecutive pokes per user. A poke arriving more than
/// `reset_interval` after the previous one starts the count over at 1.
#[derive(Debug)]
pub struct PokeCounter {
    reset_interval: Duration,
    entries: Mutex<HashMap<String, PokeRecord>>,
}

impl PokeCounter {
    pub fn new(reset_interval: Duration) -> Self {
        Self {
            reset_interval,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &PokeConfig) -> Self {
        // config loading keeps the interval non-negative and well inside i64 millis
        let millis = (config.reset_interval_seconds * 1000.0).round() as i64;
        Self::new(Duration::try_milliseconds(millis).unwrap_or(Duration::MAX))
    }

    pub fn reset_interval(&self) -> Duration {
        self.reset_interval
    }

    /// Record a poke from `user` now and return the updated count.
    pub fn record(&self, user: &str) -> u32 {
        self.record_at(user, Utc::now())
    }

    pub fn record_at(&self, user: &str, now: DateTime<Utc>) -> u32 {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let count = match entries.get(user) {
            Some(prev) if now - prev.last_poke <= self.reset_interval => {
                prev.count.saturating_add(1)
            }
            _ => 1,
        };
        entries.insert(
            user.to_string(),
            PokeRecord {
                last_poke: now,
                count,
            },
        );
        count
    }

    pub fn get(&self, user: &str) -> Option<PokeRecord> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user)
            .copied()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_counts_within_interval() {
        let counter = PokeCounter::new(Duration::seconds(60));
        assert_eq!(counter.record_at("u1", at(0)), 1);
        assert_eq!(counter.record_at("u1", at(10)), 2);
        assert_eq!(counter.record_at("u1", at(70)), 3);
        assert_eq!(counter.get("u1").unwrap().last_poke, at(70));
    }

    #[test]
    fn test_resets_after_interval() {
        let counter = PokeCounter::new(Duration::seconds(60));
        assert_eq!(counter.record_at("u1", at(0)), 1);
        assert_eq!(counter.record_at("u1", at(5)), 2);
        assert_eq!(counter.record_at("u1", at(66)), 1);
        assert_eq!(counter.record_at("u1", at(67)), 2);
    }

    #[test]
    fn test_exactly_at_interval_still_counts() {
        let counter = PokeCounter::new(Duration::seconds(60));
        counter.record_at("u1", at(0));
        assert_eq!(counter.record_at("u1", at(60)), 2);
    }

    #[test]
    fn test_users_are_independent() {
        let counter = PokeCounter::new(Duration::seconds(60));
        counter.record_at("u1", at(0));
        counter.record_at("u1", at(1));
        assert_eq!(counter.record_at("u2", at(2)), 1);
        assert_eq!(counter.len(), 2);
    }

    #[test]
    fn test_sub_second_interval_from_config() {
        let config = PokeConfig {
            reset_interval_seconds: 0.4,
            ..PokeConfig::default()
        };
        let counter = PokeCounter::from_config(&config);
        assert_eq!(counter.reset_interval(), Duration::milliseconds(400));

        let ms = |offset: i64| DateTime::from_timestamp_millis(1_700_000_000_000 + offset).unwrap();
        assert_eq!(counter.record_at("u1", ms(0)), 1);
        assert_eq!(counter.record_at("u1", ms(300)), 2);
        assert_eq!(counter.record_at("u1", ms(801)), 1);
    }

    #[test]
    fn test_from_config_and_wall_clock() {
        let counter = PokeCounter::from_config(&PokeConfig::default());
        assert_eq!(counter.reset_interval(), Duration::seconds(60));
        assert!(counter.is_empty());
        assert_eq!(counter.record("u1"), 1);
        assert_eq!(counter.record("u1"), 2);
    }
}
