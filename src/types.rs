//! Wire model shared by the REST history, the push channel and the views.
//!
//! Every payload carries a `kind` discriminant. Records the dashboard does not
//! render (e.g. `control`) deserialize to [`WireEvent::Other`] instead of
//! failing the surrounding snapshot or history list.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of an endpoint pair as reported by the monitor.
///
/// Anything other than `internal`/`external` is kept verbatim so the display
/// layer can fall back to the literal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PairCategory {
    Internal,
    External,
    Other(String),
}

impl From<String> for PairCategory {
    fn from(value: String) -> Self {
        match value.as_str() {
            "internal" => PairCategory::Internal,
            "external" => PairCategory::External,
            _ => PairCategory::Other(value),
        }
    }
}

impl From<PairCategory> for String {
    fn from(category: PairCategory) -> Self {
        category.to_string()
    }
}

impl fmt::Display for PairCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairCategory::Internal => write!(f, "internal"),
            PairCategory::External => write!(f, "external"),
            PairCategory::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// Aggregate packet flow between one classified pair of endpoints.
///
/// Identity is `(category, internal, external)`; packet counts are payload.
/// Instances are only ever replaced wholesale by a newer summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficPairCount {
    pub category: PairCategory,
    #[serde(default)]
    pub internal: String,
    #[serde(default)]
    pub external: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_domain: Option<String>,
    #[serde(default)]
    pub incoming: u64,
    #[serde(default)]
    pub outgoing: u64,
}

impl TrafficPairCount {
    pub fn total(&self) -> u64 {
        self.incoming.saturating_add(self.outgoing)
    }

    /// `"<internal>-><external>"`, the tie-break key of the ranking order.
    pub fn route(&self) -> String {
        format!("{}->{}", self.internal, self.external)
    }
}

/// Direction of a DNS transaction relative to the monitored network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DnsDirection {
    Inbound,
    Outbound,
    #[default]
    Unknown,
}

impl From<String> for DnsDirection {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "inbound" => DnsDirection::Inbound,
            "outbound" => DnsDirection::Outbound,
            _ => DnsDirection::Unknown,
        }
    }
}

impl From<DnsDirection> for String {
    fn from(direction: DnsDirection) -> Self {
        match direction {
            DnsDirection::Inbound => "inbound",
            DnsDirection::Outbound => "outbound",
            DnsDirection::Unknown => "unknown",
        }
        .to_string()
    }
}

/// One observed DNS transaction.
///
/// `timestamp` is the ISO-8601 string exactly as sent; it is the source of
/// truth for feed ordering and is parsed lazily.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsEvent {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub direction: DnsDirection,
    #[serde(default, rename = "sourceIp", skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    #[serde(default, rename = "destinationIp", skip_serializing_if = "Option::is_none")]
    pub destination_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DnsEvent {
    /// Parsed timestamp, `None` when the raw string is not RFC 3339.
    pub fn parsed_timestamp(&self) -> Option<chrono::DateTime<chrono::FixedOffset>> {
        chrono::DateTime::parse_from_rfc3339(self.timestamp.trim()).ok()
    }

    /// Normalized blocklist key for this event; empty when there is no domain.
    pub fn normalized_domain(&self) -> String {
        self.domain.as_deref().map(normalize_domain).unwrap_or_default()
    }
}

/// Full-replacement pair-count summary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairSummary {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub pair_counts: Option<Vec<TrafficPairCount>>,
}

/// Batch payload bundling summaries and DNS events.
///
/// Sub-records stay raw so one bad entry cannot reject the whole batch;
/// see [`parse_records`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
}

/// Any record the backend emits, discriminated by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum WireEvent {
    #[serde(rename = "snapshot")]
    Snapshot(Snapshot),
    #[serde(rename = "ip_pair_summary")]
    PairSummary(PairSummary),
    #[serde(rename = "dns")]
    Dns(DnsEvent),
    #[serde(other)]
    Other,
}

/// Parse raw records one at a time, skipping (and logging) malformed ones.
pub fn parse_records(items: Vec<serde_json::Value>) -> Vec<WireEvent> {
    let mut records = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<WireEvent>(item) {
            Ok(record) => records.push(record),
            Err(e) => log::warn!("⚠️  Skipping malformed record: {}", e),
        }
    }
    records
}

/// Split a heterogeneous record list into the last summary's pair counts and
/// every DNS event in the order given.
///
/// Summaries are full replacements, so earlier ones are discarded. A last
/// summary without a pair-count list yields `None`.
pub fn partition_records(records: Vec<WireEvent>) -> (Option<Vec<TrafficPairCount>>, Vec<DnsEvent>) {
    let mut latest_summary: Option<PairSummary> = None;
    let mut dns_events = Vec::new();

    for record in records {
        match record {
            WireEvent::PairSummary(summary) => latest_summary = Some(summary),
            WireEvent::Dns(event) => dns_events.push(event),
            WireEvent::Snapshot(_) | WireEvent::Other => {}
        }
    }

    (latest_summary.and_then(|s| s.pair_counts), dns_events)
}

/// Canonical blocklist key: trimmed and lower-cased.
pub fn normalize_domain(domain: &str) -> String {
    domain.trim().to_lowercase()
}
