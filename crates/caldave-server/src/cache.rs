//! Busy-interval cache.
//!
//! The cache holds one immutable [`CacheSnapshot`] behind an `Arc`. A sync
//! builds a complete new snapshot and swaps it in; readers clone the `Arc`
//! and keep a consistent view for as long as they need it.

use std::sync::Arc;

use caldave_core::BusyInterval;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::debug;

/// One generation of cached busy intervals.
#[derive(Debug, Clone, Default)]
pub struct CacheSnapshot {
    /// Intervals in arrival order.
    pub intervals: Vec<BusyInterval>,
    /// When this snapshot was stored; `None` for the initial empty cache.
    pub updated_at: Option<DateTime<Utc>>,
    /// Date range the intervals were fetched for.
    pub range: Option<(NaiveDate, NaiveDate)>,
}

impl CacheSnapshot {
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

/// Shared busy-interval cache.
#[derive(Debug, Clone, Default)]
pub struct BusyCache {
    current: Arc<RwLock<Arc<CacheSnapshot>>>,
}

impl BusyCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current snapshot.
    pub async fn snapshot(&self) -> Arc<CacheSnapshot> {
        Arc::clone(&*self.current.read().await)
    }

    /// Replaces the whole cache, returning the previous snapshot.
    pub async fn replace(
        &self,
        intervals: Vec<BusyInterval>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Arc<CacheSnapshot> {
        let next = Arc::new(CacheSnapshot {
            intervals,
            updated_at: Some(Utc::now()),
            range: Some((start, end)),
        });
        let count = next.len();
        let previous = std::mem::replace(&mut *self.current.write().await, next);
        debug!(count, %start, %end, previous = previous.len(), "busy cache replaced");
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(label: &str) -> BusyInterval {
        BusyInterval::new(
            DateTime::parse_from_rfc3339("2024-10-14T09:00:00Z").unwrap(),
            DateTime::parse_from_rfc3339("2024-10-14T10:00:00Z").unwrap(),
            "work",
            label,
        )
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, d).unwrap()
    }

    #[tokio::test]
    async fn starts_empty() {
        let cache = BusyCache::new();
        let snapshot = cache.snapshot().await;
        assert!(snapshot.is_empty());
        assert!(snapshot.updated_at.is_none());
        assert!(snapshot.range.is_none());
    }

    #[tokio::test]
    async fn replace_swaps_whole_snapshot() {
        let cache = BusyCache::new();
        cache.replace(vec![interval("a"), interval("b")], date(1), date(31)).await;

        let before = cache.snapshot().await;
        let previous = cache.replace(vec![interval("c")], date(14), date(14)).await;
        let after = cache.snapshot().await;

        // readers holding the old snapshot keep a consistent view
        assert_eq!(before.len(), 2);
        assert_eq!(previous.len(), 2);
        assert_eq!(after.len(), 1);
        assert_eq!(after.intervals[0].label, "c");
        assert_eq!(after.range, Some((date(14), date(14))));
        assert!(after.updated_at.is_some());
    }

    #[tokio::test]
    async fn clones_share_state() {
        let cache = BusyCache::new();
        let other = cache.clone();
        other.replace(vec![interval("x")], date(1), date(2)).await;
        assert_eq!(cache.snapshot().await.len(), 1);
    }
}
