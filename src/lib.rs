//! Real-time reconciliation layer for the network monitor dashboard.
//!
//! Push payloads and REST seed data flow into one state task; the terminal
//! UI reads the resulting views and drives the blocklist.

pub mod aggregator;
pub mod api;
pub mod blocklist;
pub mod config;
pub mod projection;
pub mod reconnect;
pub mod state;
pub mod stream;
pub mod types;
pub mod ui;

pub use aggregator::{SeedData, ViewAggregator, MAX_DNS_EVENTS};
pub use api::{ApiClient, ApiError};
pub use blocklist::{submit_block, BlockControl, BlocklistController, BlocklistStore, SubmitOutcome};
pub use config::{Config, ConfigError};
pub use state::{ChannelHandler, ConnectionStatus, LiveState, StateMessage};
pub use stream::{StreamError, StreamHandle, StreamHandler, StreamIngestor, StreamPayload};
