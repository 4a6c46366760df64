use {
    async_trait::async_trait,
    chrono::Local,
    kidos_dashboard::{
        aggregator::ViewAggregator,
        config::Config,
        projection::{to_dns_row, to_pair_row},
        stream::{StreamHandler, StreamIngestor},
        types::{DnsEvent, TrafficPairCount},
    },
};

/// Prints every delivered payload and folds it into a local aggregator so
/// the feed bound and ordering can be checked against a live backend.
struct VerifyHandler {
    views: ViewAggregator,
    summaries: u64,
    batches: u64,
    singles: u64,
}

impl VerifyHandler {
    fn new(max_dns_events: usize) -> Self {
        Self {
            views: ViewAggregator::new(max_dns_events),
            summaries: 0,
            batches: 0,
            singles: 0,
        }
    }

    fn print_stats(&self) {
        log::info!(
            "📊 summaries={} batches={} dns={} | pairs={} feed={}/{}",
            self.summaries,
            self.batches,
            self.singles,
            self.views.pair_counts().len(),
            self.views.dns_events().len(),
            self.views.max_dns_events()
        );
    }
}

#[async_trait]
impl StreamHandler for VerifyHandler {
    async fn on_open(&mut self) {
        log::info!("✅ Stream open");
    }

    async fn on_close(&mut self) {
        log::info!("🔌 Stream closed");
        self.print_stats();
    }

    async fn on_pair_summary(&mut self, counts: Vec<TrafficPairCount>) {
        self.summaries += 1;
        self.views.replace_pair_counts(counts);

        let now = Local::now().format("%H:%M:%S");
        for row in self.views.pair_counts().iter().map(to_pair_row) {
            println!(
                "[{}] pair {} {} -> {} packets={}",
                now, row.category, row.internal, row.external, row.packets
            );
        }
        self.print_stats();
    }

    async fn on_dns_batch(&mut self, events: Vec<DnsEvent>) {
        self.batches += 1;
        println!("[batch] {} DNS events", events.len());
        self.views.merge_dns_batch(events);
        self.print_stats();
    }

    async fn on_dns_event(&mut self, event: DnsEvent) {
        self.singles += 1;
        let row = to_dns_row(&event);
        println!(
            "[{}] dns {} {} {} action={}",
            row.time, row.domain, row.direction, row.flow, row.action
        );
        self.views.append_dns_event(event);
    }
}

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let config = Config::from_env()?;

    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.filter_module("tungstenite", log::LevelFilter::Warn);
    builder.target(env_logger::Target::Stdout).init();

    // NOTE: Workaround for rustls issue
    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        log::warn!("Crypto provider already installed");
    }

    log::info!("🚀 Starting push channel verification");
    log::info!("   Push channel: {}", config.ws_url);
    log::info!("   DNS feed capacity: {}", config.max_dns_events);
    log::info!("Press Ctrl+C to stop");

    let handle = StreamIngestor::open(&config.ws_url, VerifyHandler::new(config.max_dns_events)).await?;
    let closer = handle.closer();
    let finished = handle.wait();
    tokio::pin!(finished);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("Interrupted, closing stream");
            closer.close();
            (&mut finished).await;
        }
        _ = &mut finished => {}
    }

    Ok(())
}
