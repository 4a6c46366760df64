//! Push-channel ingestor
//!
//! Owns one WebSocket connection, classifies every inbound payload into a
//! [`StreamPayload`] and hands it to a [`StreamHandler`]. Holds no view
//! state of its own.
//!
//! Lifecycle:
//! 1. `StreamIngestor::open` connects and spawns the read loop
//! 2. `on_open` fires once the loop starts
//! 3. each text frame → classify → exactly one dispatch (or a logged drop)
//! 4. `on_close` fires exactly once when the loop ends, whatever the cause
//!
//! After `close()` no further payload handler runs, including for frames
//! that were already in flight. Reconnection is not handled here; see
//! `crate::reconnect`.

use {
    crate::types::{parse_records, partition_records, DnsEvent, TrafficPairCount, WireEvent},
    async_trait::async_trait,
    futures_util::{SinkExt, StreamExt},
    std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    tokio::{
        io::{AsyncRead, AsyncWrite},
        sync::Notify,
        task::JoinHandle,
    },
    tokio_tungstenite::{
        connect_async,
        tungstenite::{self, Message},
        WebSocketStream,
    },
};

#[derive(Debug)]
pub enum StreamError {
    Connect(tungstenite::Error),
    Parse(serde_json::Error),
    /// Valid JSON with a `kind` this client does not render
    Unclassified,
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamError::Connect(e) => write!(f, "Connection error: {}", e),
            StreamError::Parse(e) => write!(f, "Invalid payload: {}", e),
            StreamError::Unclassified => write!(f, "Unhandled payload kind"),
        }
    }
}

impl std::error::Error for StreamError {}

impl From<tungstenite::Error> for StreamError {
    fn from(e: tungstenite::Error) -> Self {
        StreamError::Connect(e)
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(e: serde_json::Error) -> Self {
        StreamError::Parse(e)
    }
}

/// The three payload shapes the push channel delivers
#[derive(Debug, Clone, PartialEq)]
pub enum StreamPayload {
    /// Batch on connect/resync: last summary's counts and every DNS event
    Snapshot {
        pair_counts: Option<Vec<TrafficPairCount>>,
        dns_events: Vec<DnsEvent>,
    },
    PairSummary(Option<Vec<TrafficPairCount>>),
    Dns(DnsEvent),
}

/// Parse and classify one inbound text payload.
pub fn classify(text: &str) -> Result<StreamPayload, StreamError> {
    match serde_json::from_str::<WireEvent>(text)? {
        WireEvent::Snapshot(snapshot) => {
            let (pair_counts, dns_events) = partition_records(parse_records(snapshot.events));
            Ok(StreamPayload::Snapshot {
                pair_counts,
                dns_events,
            })
        }
        WireEvent::PairSummary(summary) => Ok(StreamPayload::PairSummary(summary.pair_counts)),
        WireEvent::Dns(event) => Ok(StreamPayload::Dns(event)),
        WireEvent::Other => Err(StreamError::Unclassified),
    }
}

/// Typed callbacks invoked by the ingestor. All default to no-ops.
#[async_trait]
pub trait StreamHandler: Send {
    async fn on_open(&mut self) {}

    async fn on_close(&mut self) {}

    async fn on_pair_summary(&mut self, _counts: Vec<TrafficPairCount>) {}

    async fn on_dns_batch(&mut self, _events: Vec<DnsEvent>) {}

    async fn on_dns_event(&mut self, _event: DnsEvent) {}
}

/// Route a classified payload to the matching callbacks.
pub async fn dispatch<H>(handler: &mut H, payload: StreamPayload)
where
    H: StreamHandler + ?Sized,
{
    dispatch_until(handler, payload, || false).await;
}

/// Like [`dispatch`], but `is_closed` is checked before every callback, so a
/// close requested from inside one callback silences the rest of the payload.
pub async fn dispatch_until<H, F>(handler: &mut H, payload: StreamPayload, is_closed: F)
where
    H: StreamHandler + ?Sized,
    F: Fn() -> bool,
{
    if is_closed() {
        return;
    }
    match payload {
        StreamPayload::Snapshot {
            pair_counts,
            dns_events,
        } => {
            if let Some(counts) = pair_counts {
                handler.on_pair_summary(counts).await;
            }
            if !dns_events.is_empty() && !is_closed() {
                handler.on_dns_batch(dns_events).await;
            }
        }
        StreamPayload::PairSummary(Some(counts)) => handler.on_pair_summary(counts).await,
        StreamPayload::PairSummary(None) => {}
        StreamPayload::Dns(event) => handler.on_dns_event(event).await,
    }
}

/// Classify `text` and dispatch it; failures are logged and the payload dropped.
///
/// Returns whether the payload was dispatched.
pub async fn handle_text<H>(handler: &mut H, text: &str) -> bool
where
    H: StreamHandler + ?Sized,
{
    handle_text_until(handler, text, || false).await
}

/// [`handle_text`] gated on `is_closed` before every callback.
pub async fn handle_text_until<H, F>(handler: &mut H, text: &str, is_closed: F) -> bool
where
    H: StreamHandler + ?Sized,
    F: Fn() -> bool,
{
    match classify(text) {
        Ok(payload) => {
            dispatch_until(handler, payload, is_closed).await;
            true
        }
        Err(StreamError::Unclassified) => {
            log::debug!("Ignoring stream payload with unhandled kind");
            false
        }
        Err(e) => {
            log::warn!("⚠️  Dropping stream payload: {}", e);
            false
        }
    }
}

struct Shared {
    closed: AtomicBool,
    notify: Notify,
}

impl Shared {
    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.notify.notify_one();
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Disposer for an open stream. Dropping the handle closes the stream.
pub struct StreamHandle {
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
}

impl StreamHandle {
    /// Request close. Idempotent.
    pub fn close(&self) {
        self.shared.close();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Detached closer for use from other tasks
    pub fn closer(&self) -> StreamCloser {
        StreamCloser {
            shared: self.shared.clone(),
        }
    }

    /// Wait for the connection to end (remote close, error, or `close()`).
    pub async fn wait(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::error!("Stream task failed: {}", e);
            }
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.shared.close();
    }
}

#[derive(Clone)]
pub struct StreamCloser {
    shared: Arc<Shared>,
}

impl StreamCloser {
    pub fn close(&self) {
        self.shared.close();
    }
}

pub struct StreamIngestor;

impl StreamIngestor {
    /// Connect to `url` and start delivering payloads to `handler`.
    pub async fn open<H>(url: &str, handler: H) -> Result<StreamHandle, StreamError>
    where
        H: StreamHandler + 'static,
    {
        let (ws, _response) = connect_async(url).await?;
        log::info!("🔌 Push channel connected: {}", url);
        Ok(Self::attach(ws, handler))
    }

    /// Drive an already-established WebSocket.
    pub fn attach<S, H>(ws: WebSocketStream<S>, handler: H) -> StreamHandle
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
        H: StreamHandler + 'static,
    {
        let shared = Arc::new(Shared {
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        });
        let task = tokio::spawn(run_connection(ws, handler, shared.clone()));
        StreamHandle {
            shared,
            task: Some(task),
        }
    }
}

async fn run_connection<S, H>(ws: WebSocketStream<S>, mut handler: H, shared: Arc<Shared>)
where
    S: AsyncRead + AsyncWrite + Unpin,
    H: StreamHandler,
{
    let (mut write, mut read) = ws.split();

    if !shared.is_closed() {
        handler.on_open().await;
    }

    loop {
        tokio::select! {
            biased;

            _ = shared.notify.notified() => {
                log::info!("Closing push channel");
                if let Err(e) = write.send(Message::Close(None)).await {
                    log::debug!("Close frame not sent: {}", e);
                }
                break;
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if shared.is_closed() {
                            break;
                        }
                        handle_text_until(&mut handler, &text, || shared.is_closed()).await;
                    }
                    Some(Ok(Message::Binary(data))) => {
                        if shared.is_closed() {
                            break;
                        }
                        match std::str::from_utf8(&data) {
                            Ok(text) => {
                                handle_text_until(&mut handler, text, || shared.is_closed()).await;
                            }
                            Err(e) => log::warn!("⚠️  Dropping non-UTF-8 binary frame: {}", e),
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        log::info!("Push channel closed by server: {:?}", frame);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::error!("❌ Push channel error: {}", e);
                        break;
                    }
                    None => {
                        log::info!("Push channel ended");
                        break;
                    }
                }
            }
        }
    }

    handler.on_close().await;
}
