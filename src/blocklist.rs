//! Blocklist controller
//!
//! Tracks confirmed-blocked domains and mediates single-flight optimistic
//! submission against the backend:
//!
//! ```text
//! idle --begin()--> pending --finish(Ok)--> confirmed
//!                          \--finish(Err)-> idle (confirmed set unchanged)
//! ```
//!
//! Only one domain may be pending at a time. The pending marker is cleared on
//! every completion path, so a domain is never left stuck as pending.

use {
    crate::{api::ApiError, types::normalize_domain},
    async_trait::async_trait,
    tokio::sync::RwLock,
};

/// Remote side of the blocklist (fetch and full replacement)
#[async_trait]
pub trait BlocklistStore: Send + Sync {
    /// Current blocklist as stored by the backend
    async fn fetch_blocklist(&self) -> Result<Vec<String>, ApiError>;

    /// Replace the backend blocklist with `domains`
    async fn update_blocklist(&self, domains: &[String]) -> Result<(), ApiError>;
}

/// Insertion-ordered set of normalized domains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockedDomainSet {
    domains: Vec<String>,
}

impl BlockedDomainSet {
    /// Build from raw strings, normalizing and collapsing duplicates.
    pub fn from_raw<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for domain in raw {
            set.insert(&normalize_domain(domain.as_ref()));
        }
        set
    }

    /// Insert an already-normalized domain. Returns false if present or empty.
    fn insert(&mut self, normalized: &str) -> bool {
        if normalized.is_empty() || self.contains(normalized) {
            return false;
        }
        self.domains.push(normalized.to_string());
        true
    }

    pub fn contains(&self, normalized: &str) -> bool {
        self.domains.iter().any(|d| d == normalized)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.domains
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Ticket for an in-flight submission, returned by [`BlocklistController::begin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubmission {
    pub domain: String,
    /// Confirmed set plus `domain`; sent as the full replacement list
    pub candidate: BlockedDomainSet,
}

/// Result of asking to start a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitDecision {
    /// Caller must send `candidate` and report back through `finish`
    Start(PendingSubmission),
    /// Already confirmed or already pending, or no domain at all
    Skip,
    /// Another domain is in flight
    Busy { pending: String },
}

/// Final state of one `submit_block` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Confirmed,
    Failed,
    Skipped,
    Busy,
}

/// Block control shown next to a DNS row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockControl {
    Block,
    Blocking,
    Blocked,
}

impl BlockControl {
    pub fn label(&self) -> &'static str {
        match self {
            BlockControl::Block => "Block",
            BlockControl::Blocking => "Blocking...",
            BlockControl::Blocked => "Blocked",
        }
    }

    pub fn enabled(&self) -> bool {
        matches!(self, BlockControl::Block)
    }
}

/// Confirmed blocked domains plus the single pending marker.
#[derive(Debug, Default)]
pub struct BlocklistController {
    confirmed: BlockedDomainSet,
    pending: Option<String>,
}

impl BlocklistController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the confirmed set with the backend's list (normalized).
    pub fn load<I, S>(&mut self, raw: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.confirmed = BlockedDomainSet::from_raw(raw);
        if let Some(pending) = &self.pending {
            if self.confirmed.contains(pending) {
                self.pending = None;
            }
        }
    }

    /// Move `domain` to pending if it is neither confirmed nor in flight.
    pub fn begin(&mut self, domain: &str) -> SubmitDecision {
        let normalized = normalize_domain(domain);
        if normalized.is_empty() || self.confirmed.contains(&normalized) {
            return SubmitDecision::Skip;
        }
        match &self.pending {
            Some(pending) if *pending == normalized => return SubmitDecision::Skip,
            Some(pending) => {
                return SubmitDecision::Busy {
                    pending: pending.clone(),
                }
            }
            None => {}
        }

        let mut candidate = self.confirmed.clone();
        candidate.insert(&normalized);
        self.pending = Some(normalized.clone());

        SubmitDecision::Start(PendingSubmission {
            domain: normalized,
            candidate,
        })
    }

    /// Apply the backend's answer and clear the pending marker.
    pub fn finish(&mut self, submission: PendingSubmission, result: Result<(), ApiError>) -> SubmitOutcome {
        let outcome = match result {
            Ok(()) => {
                self.confirmed = submission.candidate;
                SubmitOutcome::Confirmed
            }
            Err(e) => {
                log::warn!("❌ Failed to block {}: {}", submission.domain, e);
                SubmitOutcome::Failed
            }
        };

        if self.pending.as_deref() == Some(submission.domain.as_str()) {
            self.pending = None;
        }
        outcome
    }

    pub fn confirmed(&self) -> &BlockedDomainSet {
        &self.confirmed
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn is_blocked(&self, domain: &str) -> bool {
        self.confirmed.contains(&normalize_domain(domain))
    }

    /// Control state for a row's normalized domain key; `None` without a domain.
    pub fn control_for(&self, domain_key: &str) -> Option<BlockControl> {
        if domain_key.is_empty() {
            return None;
        }
        if self.confirmed.contains(domain_key) {
            Some(BlockControl::Blocked)
        } else if self.pending.as_deref() == Some(domain_key) {
            Some(BlockControl::Blocking)
        } else {
            Some(BlockControl::Block)
        }
    }
}

/// Submit `domain` for blocking.
///
/// The controller lock is held only for the `begin`/`finish` transitions,
/// never across the update call. Failures are logged, not returned.
pub async fn submit_block<S>(
    controller: &RwLock<BlocklistController>,
    store: &S,
    domain: &str,
) -> SubmitOutcome
where
    S: BlocklistStore + ?Sized,
{
    let decision = controller.write().await.begin(domain);
    let submission = match decision {
        SubmitDecision::Start(submission) => submission,
        SubmitDecision::Skip => return SubmitOutcome::Skipped,
        SubmitDecision::Busy { pending } => {
            log::debug!("Block request for {} ignored: {} still pending", domain.trim(), pending);
            return SubmitOutcome::Busy;
        }
    };

    log::info!("🚫 Blocking {} ({} domains)", submission.domain, submission.candidate.len());
    let result = store.update_blocklist(submission.candidate.as_slice()).await;

    let outcome = controller.write().await.finish(submission, result);
    if outcome == SubmitOutcome::Confirmed {
        log::info!("✅ Blocklist updated");
    }
    outcome
}

/// Seed the controller from the backend; on failure the set stays empty.
pub async fn load_blocklist<S>(controller: &RwLock<BlocklistController>, store: &S)
where
    S: BlocklistStore + ?Sized,
{
    match store.fetch_blocklist().await {
        Ok(domains) => {
            let mut guard = controller.write().await;
            guard.load(domains);
            log::info!("Loaded {} blocked domains", guard.confirmed().len());
        }
        Err(e) => log::error!("Failed to load blocklist: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::sync::{Arc, Mutex};
    use tokio::sync::oneshot;

    /// Store that records every update and answers with a preset result
    struct RecordingStore {
        fail: bool,
        updates: Mutex<Vec<Vec<String>>>,
    }

    impl RecordingStore {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                updates: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl BlocklistStore for RecordingStore {
        async fn fetch_blocklist(&self) -> Result<Vec<String>, ApiError> {
            Ok(vec![" Ads.Example ".to_string(), "ads.example".to_string()])
        }

        async fn update_blocklist(&self, domains: &[String]) -> Result<(), ApiError> {
            self.updates.lock().unwrap().push(domains.to_vec());
            if self.fail {
                Err(ApiError::Status(StatusCode::INTERNAL_SERVER_ERROR))
            } else {
                Ok(())
            }
        }
    }

    /// Store whose update blocks until the test releases it
    struct GatedStore {
        gate: Mutex<Option<oneshot::Receiver<()>>>,
        started: Mutex<Option<oneshot::Sender<()>>>,
    }

    #[async_trait]
    impl BlocklistStore for GatedStore {
        async fn fetch_blocklist(&self) -> Result<Vec<String>, ApiError> {
            Ok(Vec::new())
        }

        async fn update_blocklist(&self, _domains: &[String]) -> Result<(), ApiError> {
            if let Some(started) = self.started.lock().unwrap().take() {
                let _ = started.send(());
            }
            let gate = self.gate.lock().unwrap().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            Ok(())
        }
    }

    #[test]
    fn test_begin_normalizes_and_marks_pending() {
        let mut controller = BlocklistController::new();
        let SubmitDecision::Start(submission) = controller.begin("  Example.COM ") else {
            panic!("expected submission to start");
        };
        assert_eq!(submission.domain, "example.com");
        assert_eq!(submission.candidate.as_slice(), ["example.com".to_string()]);
        assert_eq!(controller.pending(), Some("example.com"));
        assert!(!controller.is_blocked("example.com"));
    }

    #[test]
    fn test_same_domain_while_pending_is_noop() {
        let mut controller = BlocklistController::new();
        assert!(matches!(controller.begin("Example.com"), SubmitDecision::Start(_)));
        assert_eq!(controller.begin("example.com"), SubmitDecision::Skip);
    }

    #[test]
    fn test_other_domain_while_pending_is_busy() {
        let mut controller = BlocklistController::new();
        assert!(matches!(controller.begin("a.test"), SubmitDecision::Start(_)));
        assert_eq!(
            controller.begin("b.test"),
            SubmitDecision::Busy {
                pending: "a.test".to_string()
            }
        );
    }

    #[test]
    fn test_confirmed_domain_is_noop() {
        let mut controller = BlocklistController::new();
        controller.load(["example.com"]);
        assert_eq!(controller.begin(" EXAMPLE.com"), SubmitDecision::Skip);
        assert_eq!(controller.begin("   "), SubmitDecision::Skip);
        assert_eq!(controller.pending(), None);
    }

    #[test]
    fn test_candidate_keeps_existing_order() {
        let mut controller = BlocklistController::new();
        controller.load(["b.test", "a.test", "B.TEST"]);
        let SubmitDecision::Start(submission) = controller.begin("c.test") else {
            panic!("expected submission to start");
        };
        assert_eq!(submission.candidate.as_slice(), ["b.test", "a.test", "c.test"]);
    }

    #[test]
    fn test_finish_success_confirms() {
        let mut controller = BlocklistController::new();
        let SubmitDecision::Start(submission) = controller.begin("example.com") else {
            panic!("expected submission to start");
        };
        assert_eq!(controller.finish(submission, Ok(())), SubmitOutcome::Confirmed);
        assert!(controller.is_blocked("example.com"));
        assert_eq!(controller.pending(), None);
        assert_eq!(controller.control_for("example.com"), Some(BlockControl::Blocked));
    }

    #[test]
    fn test_finish_failure_rolls_back() {
        let mut controller = BlocklistController::new();
        controller.load(["kept.test"]);
        let SubmitDecision::Start(submission) = controller.begin("example.com") else {
            panic!("expected submission to start");
        };
        let result = Err(ApiError::Status(StatusCode::BAD_GATEWAY));
        assert_eq!(controller.finish(submission, result), SubmitOutcome::Failed);
        assert_eq!(controller.confirmed().as_slice(), ["kept.test".to_string()]);
        assert_eq!(controller.pending(), None);
        assert_eq!(controller.control_for("example.com"), Some(BlockControl::Block));
    }

    #[test]
    fn test_block_controls() {
        let mut controller = BlocklistController::new();
        controller.load(["done.test"]);
        let _ = controller.begin("wip.test");

        assert_eq!(controller.control_for(""), None);
        assert_eq!(controller.control_for("done.test"), Some(BlockControl::Blocked));
        assert_eq!(controller.control_for("wip.test"), Some(BlockControl::Blocking));
        assert_eq!(controller.control_for("new.test"), Some(BlockControl::Block));
        assert!(!BlockControl::Blocked.enabled());
        assert!(!BlockControl::Blocking.enabled());
        assert!(BlockControl::Block.enabled());
        assert_eq!(BlockControl::Blocking.label(), "Blocking...");
    }

    #[tokio::test]
    async fn test_submit_block_success() {
        let controller = RwLock::new(BlocklistController::new());
        let store = RecordingStore::new(false);

        let outcome = submit_block(&controller, &store, " Example.COM ").await;
        assert_eq!(outcome, SubmitOutcome::Confirmed);

        let guard = controller.read().await;
        assert!(guard.is_blocked("example.com"));
        assert_eq!(guard.control_for("example.com").map(|c| c.label()), Some("Blocked"));
        assert_eq!(store.updates.lock().unwrap().as_slice(), [vec!["example.com".to_string()]]);
    }

    #[tokio::test]
    async fn test_submit_block_failure_leaves_set_unchanged() {
        let controller = RwLock::new(BlocklistController::new());
        let store = RecordingStore::new(true);

        let outcome = submit_block(&controller, &store, "example.com").await;
        assert_eq!(outcome, SubmitOutcome::Failed);

        let guard = controller.read().await;
        assert!(guard.confirmed().is_empty());
        assert_eq!(guard.pending(), None);
    }

    #[tokio::test]
    async fn test_submit_block_confirmed_domain_skips_update() {
        let controller = RwLock::new(BlocklistController::new());
        let store = RecordingStore::new(false);
        load_blocklist(&controller, &store).await;

        assert_eq!(controller.read().await.confirmed().as_slice(), ["ads.example".to_string()]);
        let outcome = submit_block(&controller, &store, "ADS.example").await;
        assert_eq!(outcome, SubmitOutcome::Skipped);
        assert!(store.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_submit_while_in_flight_is_noop() {
        let (release_tx, release_rx) = oneshot::channel();
        let (started_tx, started_rx) = oneshot::channel();
        let store = Arc::new(GatedStore {
            gate: Mutex::new(Some(release_rx)),
            started: Mutex::new(Some(started_tx)),
        });
        let controller = Arc::new(RwLock::new(BlocklistController::new()));

        let first = {
            let controller = controller.clone();
            let store = store.clone();
            tokio::spawn(async move { submit_block(&controller, store.as_ref(), "Example.com").await })
        };
        started_rx.await.unwrap();

        assert_eq!(controller.read().await.pending(), Some("example.com"));
        let second = submit_block(&controller, store.as_ref(), "example.com").await;
        assert_eq!(second, SubmitOutcome::Skipped);

        release_tx.send(()).unwrap();
        assert_eq!(first.await.unwrap(), SubmitOutcome::Confirmed);

        let guard = controller.read().await;
        assert!(guard.is_blocked("example.com"));
        assert_eq!(guard.pending(), None);
    }
}
