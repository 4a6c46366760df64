use {
    crate::{
        state::{ChannelHandler, StateMessage},
        stream::StreamIngestor,
    },
    std::time::Duration,
    tokio::{sync::mpsc, time::sleep},
};

#[derive(Debug)]
pub struct ExponentialBackoff {
    initial_delay: u64,
    max_delay: u64,
    max_retries: u32,
    current_attempt: u32,
}

#[derive(Debug)]
pub struct MaxRetriesExceeded;

impl std::fmt::Display for MaxRetriesExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Maximum retry attempts exceeded")
    }
}

impl std::error::Error for MaxRetriesExceeded {}

impl ExponentialBackoff {
    pub fn new(initial: u64, max: u64, retries: u32) -> Self {
        Self {
            initial_delay: initial,
            max_delay: max,
            max_retries: retries,
            current_attempt: 0,
        }
    }

    /// Delay (seconds) for the next attempt, `None` once retries are spent.
    pub fn next_delay(&self) -> Option<u64> {
        if self.current_attempt >= self.max_retries {
            return None;
        }
        let factor = 2_u64.saturating_pow(self.current_attempt);
        Some(self.initial_delay.saturating_mul(factor).min(self.max_delay))
    }

    pub async fn sleep(&mut self) -> Result<(), MaxRetriesExceeded> {
        let delay = self.next_delay().ok_or(MaxRetriesExceeded)?;

        log::warn!(
            "⏳ Reconnect attempt {} of {} in {}s",
            self.current_attempt + 1,
            self.max_retries,
            delay
        );

        sleep(Duration::from_secs(delay)).await;
        self.current_attempt += 1;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }
}

/// Keep the push channel open, reopening it with backoff after every loss.
///
/// Each connection gets a fresh `ChannelHandler` on the same state channel,
/// so the indicator flips to offline on loss and back to live on reopen.
/// Returns once `max_retries` consecutive attempts fail without a connection.
pub async fn run_stream_with_reconnect(
    url: &str,
    tx: mpsc::Sender<StateMessage>,
    mut backoff: ExponentialBackoff,
) -> Result<(), MaxRetriesExceeded> {
    loop {
        match StreamIngestor::open(url, ChannelHandler::new(tx.clone())).await {
            Ok(handle) => {
                backoff.reset();
                handle.wait().await;
                log::warn!("🔌 Push channel lost");
            }
            Err(e) => {
                log::error!("❌ Push channel connection failed: {}", e);
            }
        }

        if tx.is_closed() {
            log::info!("State channel closed, stopping reconnect loop");
            return Ok(());
        }
        backoff.sleep().await?;
    }
}
