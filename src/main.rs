use {
    kidos_dashboard::{
        api::ApiClient,
        blocklist::{load_blocklist, BlocklistController, BlocklistStore},
        config::Config,
        reconnect::{run_stream_with_reconnect, ExponentialBackoff},
        state::{state_aggregator_task, LiveState, StateMessage},
        ui,
    },
    std::sync::Arc,
    tokio::sync::{mpsc, RwLock},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let config = Config::from_env()?;

    // Logs go to stderr; the UI draws on the alternate screen
    let mut builder = if config.rust_log.is_some() {
        env_logger::Builder::from_default_env()
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
    };
    builder.filter_module("tungstenite", log::LevelFilter::Warn);
    builder.filter_module("reqwest", log::LevelFilter::Warn);
    builder.target(env_logger::Target::Stderr).init();

    // NOTE: Workaround for rustls issue
    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        log::warn!("Crypto provider already installed");
    }

    log::info!("🚀 Starting dashboard...");
    log::info!("📊 Configuration:");
    log::info!("   API: {}", config.api_url);
    log::info!("   Push channel: {}", config.ws_url);
    log::info!("   DNS feed capacity: {}", config.max_dns_events);

    // Bounded channel for state messages (backpressure handling)
    let (tx, rx) = mpsc::channel::<StateMessage>(1000);

    let state = Arc::new(RwLock::new(LiveState::new(config.max_dns_events)));
    let blocklist = Arc::new(RwLock::new(BlocklistController::new()));

    let state_clone = state.clone();
    tokio::spawn(async move {
        state_aggregator_task(rx, state_clone).await;
    });

    let api = ApiClient::new(&config.api_url, config.http_timeout)?;

    // Seed both views from history; on failure they stay empty until pushes arrive
    match api.fetch_seed(config.max_dns_events).await {
        Ok(seed) => {
            log::info!(
                "Loaded history: {} pairs, {} DNS events",
                seed.pair_counts.len(),
                seed.dns_events.len()
            );
            if let Err(e) = tx.send(StateMessage::Seed(seed)).await {
                log::warn!("Failed to send seed to state aggregator: {}", e);
            }
        }
        Err(e) => log::error!("❌ Failed to load event history: {}", e),
    }

    load_blocklist(&blocklist, &api).await;

    let backoff = ExponentialBackoff::new(
        config.reconnect_initial_secs,
        config.reconnect_max_secs,
        config.reconnect_max_retries,
    );
    let ws_url = config.ws_url.clone();
    let stream_tx = tx.clone();
    let stream_handle = tokio::spawn(async move {
        run_stream_with_reconnect(&ws_url, stream_tx, backoff).await
    });

    let store: Arc<dyn BlocklistStore> = Arc::new(api);
    let mut ui_handle = tokio::spawn(async move {
        if let Err(e) = ui::run_ui(state, blocklist, store).await {
            log::error!("UI error: {}", e);
        }
    });

    tokio::select! {
        _ = &mut ui_handle => {
            log::info!("UI exited");
        }
        result = stream_handle => {
            match result {
                Ok(Ok(())) => log::info!("Push channel stopped"),
                Ok(Err(e)) => log::error!("❌ Push channel gave up: {}", e),
                Err(e) => log::error!("❌ Push channel task failed: {}", e),
            }
            // Views stay readable (offline) until the user quits
            if let Err(e) = ui_handle.await {
                log::error!("UI task failed: {}", e);
            }
        }
    }

    if tx.send(StateMessage::Shutdown).await.is_err() {
        log::debug!("State aggregator already stopped");
    }

    Ok(())
}
