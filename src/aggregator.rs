use {
    crate::types::{partition_records, DnsEvent, TrafficPairCount, WireEvent},
    std::cmp::{Ordering, Reverse},
};

/// Default DNS feed capacity
pub const MAX_DNS_EVENTS: usize = 200;

/// Owns the traffic-pair table and the DNS feed.
///
/// Every mutation re-applies the canonical order, so the end state does not
/// depend on whether the REST seed or the first push message landed first.
pub struct ViewAggregator {
    /// Pair counts, ranked by total packets
    pair_counts: Vec<TrafficPairCount>,
    /// DNS feed, most recent first
    dns_events: Vec<DnsEvent>,
    /// Maximum number of DNS events to keep
    max_dns_events: usize,
    /// Set once `initialize` has run
    initialized: bool,
    /// Set once a push summary replaced the table
    pairs_from_push: bool,
}

impl ViewAggregator {
    pub fn new(max_dns_events: usize) -> Self {
        Self {
            pair_counts: Vec::new(),
            dns_events: Vec::with_capacity(max_dns_events),
            max_dns_events: max_dns_events.max(1),
            initialized: false,
            pairs_from_push: false,
        }
    }

    /// Wholesale replace the traffic table with a new summary.
    pub fn replace_pair_counts(&mut self, counts: Vec<TrafficPairCount>) {
        self.pair_counts = rank_pair_counts(counts);
        self.pairs_from_push = true;
    }

    /// Prepend a batch to the feed, re-sort, and keep the most recent entries.
    pub fn merge_dns_batch(&mut self, events: Vec<DnsEvent>) {
        if events.is_empty() {
            return;
        }
        let mut merged = events;
        merged.append(&mut self.dns_events);
        self.dns_events = cap_dns_events(sort_dns_events(merged), self.max_dns_events);
    }

    /// Single-event path; identical to a one-element batch.
    pub fn append_dns_event(&mut self, event: DnsEvent) {
        self.merge_dns_batch(vec![event]);
    }

    /// Seed both collections from the REST fetch.
    ///
    /// Runs once. A pair summary that already arrived over the push channel
    /// is newer than the seed and is kept; seeded DNS events are merged.
    pub fn initialize(&mut self, pair_counts: Vec<TrafficPairCount>, dns_events: Vec<DnsEvent>) {
        if self.initialized {
            log::warn!("View aggregator already initialized, ignoring seed");
            return;
        }
        self.initialized = true;

        if self.pairs_from_push {
            log::debug!("Skipping seeded pair counts: push summary already applied");
        } else {
            self.pair_counts = rank_pair_counts(pair_counts);
        }
        self.merge_dns_batch(dns_events);
    }

    pub fn pair_counts(&self) -> &[TrafficPairCount] {
        &self.pair_counts
    }

    pub fn dns_events(&self) -> &[DnsEvent] {
        &self.dns_events
    }

    pub fn max_dns_events(&self) -> usize {
        self.max_dns_events
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl Default for ViewAggregator {
    fn default() -> Self {
        Self::new(MAX_DNS_EVENTS)
    }
}

/// Initial view contents extracted from the REST event history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedData {
    pub pair_counts: Vec<TrafficPairCount>,
    /// Most recent first, at most `limit` entries
    pub dns_events: Vec<DnsEvent>,
}

impl SeedData {
    /// Last summary's counts plus the last `limit` DNS records, newest first.
    pub fn from_records(records: Vec<WireEvent>, limit: usize) -> Self {
        let (pair_counts, mut dns_events) = partition_records(records);
        let skip = dns_events.len().saturating_sub(limit);
        dns_events.drain(..skip);
        dns_events.reverse();

        Self {
            pair_counts: pair_counts.unwrap_or_default(),
            dns_events,
        }
    }
}

/// Rank pairs by total packets descending, then `internal->external` ascending.
pub fn rank_pair_counts(mut counts: Vec<TrafficPairCount>) -> Vec<TrafficPairCount> {
    counts.sort_by(compare_pairs);
    counts
}

fn compare_pairs(a: &TrafficPairCount, b: &TrafficPairCount) -> Ordering {
    b.total()
        .cmp(&a.total())
        .then_with(|| a.route().cmp(&b.route()))
}

/// Order DNS events most recent first.
///
/// Unparsable timestamps sort after every valid one; ties keep their input
/// order, so a newly merged batch stays ahead of equal-timestamp history.
pub fn sort_dns_events(mut events: Vec<DnsEvent>) -> Vec<DnsEvent> {
    events.sort_by_cached_key(|event| {
        let parsed = event.parsed_timestamp();
        (parsed.is_none(), Reverse(parsed))
    });
    events
}

fn cap_dns_events(mut events: Vec<DnsEvent>, max: usize) -> Vec<DnsEvent> {
    events.truncate(max);
    events
}
