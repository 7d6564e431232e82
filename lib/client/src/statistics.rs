use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Counters that describe the work done by a [FragmentClient](crate::FragmentClient) and the
/// iterators that use it.
#[derive(Debug, Default)]
pub struct ClientStatistics {
    matching_triples: AtomicU64,
    triples_received: AtomicU64,
    requests_by_batch_size: Mutex<BTreeMap<usize, u64>>,
}

impl ClientStatistics {
    /// Records triples that were joined with at least one input mapping.
    pub fn record_matching_triples(&self, count: usize) {
        self.matching_triples
            .fetch_add(to_u64(count), Ordering::Relaxed);
    }

    /// Records the data triples of a page that was received from the server. Pages are counted
    /// when they are fetched, even if no reader consumes their triples.
    pub fn record_triples_received(&self, count: usize) {
        self.triples_received
            .fetch_add(to_u64(count), Ordering::Relaxed);
    }

    /// Records a new fragment request restricted by `batch_size` mappings. Unrestricted requests
    /// have a batch size of zero.
    pub fn record_request(&self, batch_size: usize) {
        let mut requests = self
            .requests_by_batch_size
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *requests.entry(batch_size).or_default() += 1;
    }

    /// Returns a consistent copy of the current counters.
    pub fn snapshot(&self) -> StatisticsSnapshot {
        let requests_by_batch_size = self
            .requests_by_batch_size
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        StatisticsSnapshot {
            matching_triples: self.matching_triples.load(Ordering::Relaxed),
            triples_received: self.triples_received.load(Ordering::Relaxed),
            requests_by_batch_size,
        }
    }
}

fn to_u64(count: usize) -> u64 {
    u64::try_from(count).unwrap_or(u64::MAX)
}

/// A copy of the [ClientStatistics] at some point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatisticsSnapshot {
    /// The number of mappings emitted by the join iterators.
    pub matching_triples: u64,
    /// The number of data triples in all fetched pages.
    pub triples_received: u64,
    pub requests_by_batch_size: BTreeMap<usize, u64>,
}

impl StatisticsSnapshot {
    /// The number of fragments that were requested, regardless of their batch size.
    pub fn total_requests(&self) -> u64 {
        self.requests_by_batch_size.values().sum()
    }
}

impl Display for StatisticsSnapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Matching triples: {}", self.matching_triples)?;
        writeln!(f, "Triples received: {}", self.triples_received)?;
        writeln!(f, "Requests: {}", self.total_requests())?;
        for (batch_size, count) in &self.requests_by_batch_size {
            writeln!(f, "  batch size {batch_size}: {count}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_contains_recorded_counters() {
        let statistics = ClientStatistics::default();
        statistics.record_matching_triples(3);
        statistics.record_triples_received(10);
        statistics.record_request(0);
        statistics.record_request(30);
        statistics.record_request(30);

        let snapshot = statistics.snapshot();

        assert_eq!(snapshot.matching_triples, 3);
        assert_eq!(snapshot.triples_received, 10);
        assert_eq!(snapshot.requests_by_batch_size, BTreeMap::from([(0, 1), (30, 2)]));
        assert_eq!(snapshot.total_requests(), 3);
    }

    #[test]
    fn display_lists_histogram() {
        let statistics = ClientStatistics::default();
        statistics.record_request(2);

        let text = statistics.snapshot().to_string();

        assert!(text.contains("Requests: 1"));
        assert!(text.contains("batch size 2: 1"));
    }
}
