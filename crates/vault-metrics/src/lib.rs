use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;
use vault_core::Channel;

/// Counts pages and records fetched during one export, per channel.
///
/// Shared by reference between the concurrently running channel loops.
pub struct FetchTracker {
    requests: AtomicUsize,
    records: AtomicUsize,
    channel_stats: Arc<RwLock<HashMap<Channel, ChannelStats>>>,
    started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub batches: usize,
    pub records: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSummary {
    pub total_requests: usize,
    pub total_records: usize,
    pub channels: HashMap<Channel, ChannelStats>,
    pub elapsed_ms: u64,
}

impl FetchTracker {
    pub fn new() -> Self {
        Self {
            requests: AtomicUsize::new(0),
            records: AtomicUsize::new(0),
            channel_stats: Arc::new(RwLock::new(HashMap::new())),
            started_at: Utc::now(),
        }
    }

    pub fn record_batch(&self, channel: Channel, records: usize) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.records.fetch_add(records, Ordering::Relaxed);

        let mut stats = self
            .channel_stats
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = stats.entry(channel).or_default();
        entry.batches += 1;
        entry.records += records;
        debug!(
            "{} batch #{}: {} records ({} total)",
            channel, entry.batches, records, entry.records
        );
    }

    /// Marks a channel whose loop stopped at the batch cap while more pages were on offer.
    pub fn mark_truncated(&self, channel: Channel) {
        let mut stats = self
            .channel_stats
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        stats.entry(channel).or_default().truncated = true;
    }

    pub fn channel_stats(&self, channel: Channel) -> ChannelStats {
        self.channel_stats
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&channel)
            .cloned()
            .unwrap_or_default()
    }

    pub fn get_summary(&self) -> FetchSummary {
        FetchSummary {
            total_requests: self.requests.load(Ordering::Relaxed),
            total_records: self.records.load(Ordering::Relaxed),
            channels: self
                .channel_stats
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone(),
            elapsed_ms: (Utc::now() - self.started_at).num_milliseconds().max(0) as u64,
        }
    }
}

impl Default for FetchTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_tracker() {
        let tracker = FetchTracker::new();

        tracker.record_batch(Channel::All, 500);
        tracker.record_batch(Channel::All, 10);
        tracker.record_batch(Channel::Email, 3);

        let summary = tracker.get_summary();
        assert_eq!(summary.total_requests, 3);
        assert_eq!(summary.total_records, 513);

        let all = tracker.channel_stats(Channel::All);
        assert_eq!(all.batches, 2);
        assert_eq!(all.records, 510);
        assert!(!all.truncated);
        assert_eq!(tracker.channel_stats(Channel::Email).records, 3);
    }

    #[test]
    fn test_truncation_flag() {
        let tracker = FetchTracker::new();
        tracker.mark_truncated(Channel::Email);

        assert!(tracker.channel_stats(Channel::Email).truncated);
        assert_eq!(tracker.channel_stats(Channel::All), ChannelStats::default());
    }
}
