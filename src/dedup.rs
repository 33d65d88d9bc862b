//! `day_key → set of fingerprint` membership index, bounded to a rolling
//! 30-day retention window.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDate, Utc};

use crate::record::UsageRecord;
use crate::state::RecentHashes;

pub const RETENTION_DAYS: i64 = 30;

/// In-memory dedup index, rebuilt from [`RecentHashes`] at the start of a
/// run and serialized back at commit time.
#[derive(Debug, Default)]
pub struct DedupIndex {
    by_day: HashMap<String, HashSet<String>>,
}

impl DedupIndex {
    pub fn from_serialized(recent: &RecentHashes) -> Self {
        let by_day = recent
            .0
            .iter()
            .map(|(day, fingerprints)| (day.clone(), fingerprints.iter().cloned().collect()))
            .collect();
        Self { by_day }
    }

    pub fn contains(&self, day_key: &str, fingerprint: &str) -> bool {
        self.by_day
            .get(day_key)
            .map(|set| set.contains(fingerprint))
            .unwrap_or(false)
    }

    /// Returns `true` if the record was newly admitted (not a duplicate).
    pub fn insert(&mut self, record: &UsageRecord) -> bool {
        self.by_day
            .entry(record.day_key.clone())
            .or_default()
            .insert(record.fingerprint.clone())
    }

    /// Drop every `day_key` strictly older than `today - RETENTION_DAYS`.
    /// Caps index memory at roughly `RETENTION_DAYS * records_per_day`.
    pub fn prune_retention(&mut self, today: NaiveDate) {
        let cutoff = today - Duration::days(RETENTION_DAYS);
        self.by_day.retain(|day, _| match NaiveDate::parse_from_str(day, "%Y-%m-%d") {
            Ok(date) => date >= cutoff,
            // A malformed key is not something we want to keep around either.
            Err(_) => false,
        });
    }

    pub fn into_serialized(self) -> RecentHashes {
        let map = self
            .by_day
            .into_iter()
            .map(|(day, set)| (day, set.into_iter().collect()))
            .collect();
        RecentHashes(map)
    }
}

pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}
