//! Display rows for the traffic table and the DNS feed.
//!
//! Pure functions over stored records; nothing here touches view state.

use {
    crate::types::{normalize_domain, DnsDirection, DnsEvent, PairCategory, TrafficPairCount},
    chrono::{DateTime, Local, TimeZone},
};

const PLACEHOLDER: &str = "-";
const DEFAULT_ACTION: &str = "allow";

/// One row of the DNS feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRow {
    /// Stable display key
    pub id: String,
    pub time: String,
    pub domain: String,
    /// Normalized blocklist key, empty when the event carries no domain
    pub domain_key: String,
    pub direction: String,
    pub flow: String,
    pub action: String,
}

/// One row of the traffic table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairRow {
    pub id: String,
    pub category: String,
    pub internal: String,
    pub external: String,
    pub packets: String,
}

/// Project a DNS event using the local time zone.
pub fn to_dns_row(event: &DnsEvent) -> DnsRow {
    to_dns_row_in(event, &Local)
}

/// Project a DNS event, rendering time-of-day in `tz`.
pub fn to_dns_row_in<Tz>(event: &DnsEvent, tz: &Tz) -> DnsRow
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let raw = event.domain.as_deref().map(str::trim).unwrap_or("");
    let domain_key = normalize_domain(raw);
    let domain = if !raw.is_empty() {
        raw.to_string()
    } else if !domain_key.is_empty() {
        domain_key.clone()
    } else {
        PLACEHOLDER.to_string()
    };

    let identity = if raw.is_empty() {
        event.source_ip.as_deref().unwrap_or("")
    } else {
        raw
    };

    DnsRow {
        id: format!("{}-{}", event.timestamp, identity),
        time: format_time_of_day_in(&event.timestamp, tz),
        domain,
        domain_key,
        direction: direction_label(event.direction),
        flow: format!(
            "{} → {} ({})",
            event.source_ip.as_deref().unwrap_or(PLACEHOLDER),
            event.destination_ip.as_deref().unwrap_or(PLACEHOLDER),
            event.transport.as_deref().unwrap_or(""),
        ),
        action: action_label(event.action.as_deref(), event.reason.as_deref()),
    }
}

/// Project a pair count into a table row.
pub fn to_pair_row(pair: &TrafficPairCount) -> PairRow {
    PairRow {
        id: format!("{}|{}", pair.category, pair.route()),
        category: category_label(&pair.category),
        internal: if pair.internal.is_empty() {
            PLACEHOLDER.to_string()
        } else {
            pair.internal.clone()
        },
        external: external_label(&pair.external, pair.external_domain.as_deref()),
        packets: format!("{}/{}", pair.incoming, pair.outgoing),
    }
}

/// `HH:MM:SS` in local time, or the raw string when it does not parse.
pub fn format_time_of_day(timestamp: &str) -> String {
    format_time_of_day_in(timestamp, &Local)
}

fn format_time_of_day_in<Tz>(timestamp: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match DateTime::parse_from_rfc3339(timestamp.trim()) {
        Ok(dt) => dt.with_timezone(tz).format("%H:%M:%S").to_string(),
        Err(_) => timestamp.to_string(),
    }
}

fn category_label(category: &PairCategory) -> String {
    match category {
        PairCategory::Internal => "Internal".to_string(),
        PairCategory::External => "External".to_string(),
        PairCategory::Other(raw) if raw.is_empty() => PLACEHOLDER.to_string(),
        PairCategory::Other(raw) => raw.clone(),
    }
}

fn external_label(external: &str, domain: Option<&str>) -> String {
    if external.is_empty() {
        return PLACEHOLDER.to_string();
    }
    match domain.filter(|d| !d.is_empty()) {
        Some(domain) => format!("{} ({})", external, domain),
        None => external.to_string(),
    }
}

fn direction_label(direction: DnsDirection) -> String {
    match direction {
        DnsDirection::Inbound => "Inbound",
        DnsDirection::Outbound => "Outbound",
        DnsDirection::Unknown => "Unknown",
    }
    .to_string()
}

fn action_label(action: Option<&str>, reason: Option<&str>) -> String {
    let action = action.filter(|a| !a.is_empty()).unwrap_or(DEFAULT_ACTION);
    match reason.filter(|r| !r.is_empty()) {
        Some(reason) => format!("{} ({})", action, reason),
        None => action.to_string(),
    }
}
