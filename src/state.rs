use {
    crate::{
        aggregator::{SeedData, ViewAggregator},
        stream::StreamHandler,
        types::{DnsEvent, TrafficPairCount},
    },
    async_trait::async_trait,
    std::sync::Arc,
    tokio::sync::{mpsc, RwLock},
};

/// Push-channel connectivity as shown in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    Live,
    #[default]
    Offline,
}

impl ConnectionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Live => "live",
            ConnectionStatus::Offline => "offline",
        }
    }
}

/// Message sent through the channel from the ingestor (and seed fetch) to
/// the state aggregator task
#[derive(Debug, Clone)]
pub enum StateMessage {
    Connected,
    Disconnected,
    Seed(SeedData),
    PairSummary(Vec<TrafficPairCount>),
    DnsBatch(Vec<DnsEvent>),
    DnsEvent(DnsEvent),
    Shutdown,
}

/// Live view state: both view collections plus the connectivity indicator.
///
/// Mutated only by `state_aggregator_task`; the UI takes read locks.
#[derive(Default)]
pub struct LiveState {
    views: ViewAggregator,
    status: ConnectionStatus,
    /// Messages applied since startup
    applied: u64,
}

impl LiveState {
    pub fn new(max_dns_events: usize) -> Self {
        Self {
            views: ViewAggregator::new(max_dns_events),
            status: ConnectionStatus::Offline,
            applied: 0,
        }
    }

    /// Apply one message. Returns false for `Shutdown`.
    pub fn apply(&mut self, message: StateMessage) -> bool {
        match message {
            StateMessage::Connected => self.status = ConnectionStatus::Live,
            StateMessage::Disconnected => self.status = ConnectionStatus::Offline,
            StateMessage::Seed(seed) => self.views.initialize(seed.pair_counts, seed.dns_events),
            StateMessage::PairSummary(counts) => self.views.replace_pair_counts(counts),
            StateMessage::DnsBatch(events) => self.views.merge_dns_batch(events),
            StateMessage::DnsEvent(event) => self.views.append_dns_event(event),
            StateMessage::Shutdown => return false,
        }
        self.applied += 1;
        true
    }

    pub fn views(&self) -> &ViewAggregator {
        &self.views
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn applied_count(&self) -> u64 {
        self.applied
    }
}

/// Background task that receives messages from the channel and folds them
/// into the shared state, one write lock per message.
pub async fn state_aggregator_task(
    mut receiver: mpsc::Receiver<StateMessage>,
    state: Arc<RwLock<LiveState>>,
) {
    log::info!("State aggregator task started");

    while let Some(message) = receiver.recv().await {
        let mut state = state.write().await;
        if !state.apply(message) {
            log::info!("State aggregator received shutdown signal");
            break;
        }
    }

    log::info!("State aggregator task stopped");
}

/// Stream handler that forwards every callback into the state channel.
#[derive(Clone)]
pub struct ChannelHandler {
    tx: mpsc::Sender<StateMessage>,
}

impl ChannelHandler {
    pub fn new(tx: mpsc::Sender<StateMessage>) -> Self {
        Self { tx }
    }

    async fn forward(&self, message: StateMessage) {
        if let Err(e) = self.tx.send(message).await {
            log::warn!("Failed to send message to state aggregator: {}", e);
        }
    }
}

#[async_trait]
impl StreamHandler for ChannelHandler {
    async fn on_open(&mut self) {
        self.forward(StateMessage::Connected).await;
    }

    async fn on_close(&mut self) {
        self.forward(StateMessage::Disconnected).await;
    }

    async fn on_pair_summary(&mut self, counts: Vec<TrafficPairCount>) {
        self.forward(StateMessage::PairSummary(counts)).await;
    }

    async fn on_dns_batch(&mut self, events: Vec<DnsEvent>) {
        self.forward(StateMessage::DnsBatch(events)).await;
    }

    async fn on_dns_event(&mut self, event: DnsEvent) {
        self.forward(StateMessage::DnsEvent(event)).await;
    }
}
