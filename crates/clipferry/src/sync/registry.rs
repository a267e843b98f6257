//! Pending-transfer registry
//!
//! A [`PendingTransfer`] exists from the moment a binary push is
//! announced until its terminal transition. The arbitration flags are
//! monotonic atomics: once latched they never clear, so racing updates
//! from the signaling dispatcher converge on the first terminal
//! decision and a late event can never undo one. The `Notify` wakes the
//! arbiter as soon as any flag latches instead of polling.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

/// Why the cloud upload ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadReason {
    /// Server sent `transfer_command{action:"upload_relay"}`
    ServerDirected,
    /// A peer sent `file_need_relay`
    AppFallback,
    /// Arbitration deadline expired with no signal
    Timeout,
}

impl fmt::Display for UploadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerDirected => write!(f, "server_directed"),
            Self::AppFallback => write!(f, "app_fallback"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

/// Outcome of the arbitration window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// A peer pulled the file over the LAN (or the server finished it)
    Completed,
    /// The cloud path must run
    Upload(UploadReason),
}

/// One outbound binary transfer in flight
pub struct PendingTransfer {
    pub room: String,
    pub transfer_id: String,
    pub file_id: String,
    pub filename: String,
    pub kind: String,
    /// The sealed envelope, kept for the cloud path
    pub encrypted: Vec<u8>,
    /// Envelope copy under `temp/`, served by the LAN server
    pub temp_path: PathBuf,

    completed: AtomicBool,
    upload_requested: AtomicBool,
    need_relay: AtomicBool,
    upload_started: AtomicBool,
    decided: Notify,
}

impl PendingTransfer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        room: String,
        transfer_id: String,
        file_id: String,
        filename: String,
        kind: String,
        encrypted: Vec<u8>,
        temp_path: PathBuf,
    ) -> Arc<Self> {
        Arc::new(Self {
            room,
            transfer_id,
            file_id,
            filename,
            kind,
            encrypted,
            temp_path,
            completed: AtomicBool::new(false),
            upload_requested: AtomicBool::new(false),
            need_relay: AtomicBool::new(false),
            upload_started: AtomicBool::new(false),
            decided: Notify::new(),
        })
    }

    /// Latch: a peer confirmed receipt or the server finished the transfer
    pub fn mark_completed(&self) {
        self.completed.store(true, Ordering::SeqCst);
        self.decided.notify_waiters();
    }

    /// Latch: the server directed a cloud relay
    pub fn mark_upload_requested(&self) {
        self.upload_requested.store(true, Ordering::SeqCst);
        self.decided.notify_waiters();
    }

    /// Latch: a peer reported the LAN path unusable
    pub fn mark_need_relay(&self) {
        self.need_relay.store(true, Ordering::SeqCst);
        self.decided.notify_waiters();
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    /// Claim the single cloud upload; true for exactly one caller
    pub fn try_claim_upload(&self) -> bool {
        !self.upload_started.swap(true, Ordering::SeqCst)
    }

    fn current_decision(&self) -> Option<Decision> {
        if self.completed.load(Ordering::SeqCst) {
            Some(Decision::Completed)
        } else if self.upload_requested.load(Ordering::SeqCst) {
            Some(Decision::Upload(UploadReason::ServerDirected))
        } else if self.need_relay.load(Ordering::SeqCst) {
            Some(Decision::Upload(UploadReason::AppFallback))
        } else {
            None
        }
    }

    /// Wait for a terminal signal, up to `timeout`
    ///
    /// Returns as soon as any flag latches; the deadline turns into
    /// [`UploadReason::Timeout`].
    pub async fn await_decision(&self, timeout: Duration) -> Decision {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.decided.notified();
            tokio::pin!(notified);
            // Arm the waiter before checking so a latch between the
            // check and the await cannot be missed
            notified.as_mut().enable();
            if let Some(decision) = self.current_decision() {
                return decision;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self
                    .current_decision()
                    .unwrap_or(Decision::Upload(UploadReason::Timeout));
            }
        }
    }
}

/// Process-wide registry of in-flight outbound transfers
#[derive(Default)]
pub struct TransferRegistry {
    inner: Mutex<HashMap<String, Arc<PendingTransfer>>>,
}

impl TransferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, transfer: Arc<PendingTransfer>) {
        self.inner
            .lock()
            .expect("registry lock poisoned")
            .insert(transfer.transfer_id.clone(), transfer);
    }

    pub fn get(&self, transfer_id: &str) -> Option<Arc<PendingTransfer>> {
        self.inner
            .lock()
            .expect("registry lock poisoned")
            .get(transfer_id)
            .cloned()
    }

    /// Remove the entry; only the arbiter's terminal transition calls this
    pub fn remove(&self, transfer_id: &str) -> Option<Arc<PendingTransfer>> {
        self.inner
            .lock()
            .expect("registry lock poisoned")
            .remove(transfer_id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Arc<PendingTransfer> {
        PendingTransfer::new(
            "room_1".to_string(),
            "tr_1".to_string(),
            "f_1".to_string(),
            "a.bin".to_string(),
            "file".to_string(),
            vec![1, 2, 3],
            PathBuf::from("/tmp/a.bin"),
        )
    }

    #[test]
    fn test_completed_wins_over_later_relay_signals() {
        let transfer = pending();
        transfer.mark_completed();
        transfer.mark_need_relay();
        transfer.mark_upload_requested();

        // Monotonic: completed latched first, so the decision stays
        assert_eq!(transfer.current_decision(), Some(Decision::Completed));
    }

    #[test]
    fn test_server_directive_outranks_peer_fallback() {
        let transfer = pending();
        transfer.mark_need_relay();
        transfer.mark_upload_requested();
        assert_eq!(
            transfer.current_decision(),
            Some(Decision::Upload(UploadReason::ServerDirected))
        );
    }

    #[test]
    fn test_upload_claim_is_exclusive() {
        let transfer = pending();
        assert!(transfer.try_claim_upload());
        assert!(!transfer.try_claim_upload());
        assert!(!transfer.try_claim_upload());
    }

    #[tokio::test]
    async fn test_upload_claim_exclusive_across_tasks() {
        let transfer = pending();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let t = Arc::clone(&transfer);
            handles.push(tokio::spawn(async move { t.try_claim_upload() }));
        }
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_await_decision_wakes_on_latch() {
        let transfer = pending();
        let waiter = Arc::clone(&transfer);
        let handle = tokio::spawn(async move {
            waiter.await_decision(Duration::from_secs(60)).await
        });

        tokio::task::yield_now().await;
        transfer.mark_need_relay();

        let decision = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("arbiter did not wake")
            .unwrap();
        assert_eq!(decision, Decision::Upload(UploadReason::AppFallback));
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_decision_times_out() {
        let transfer = pending();
        let decision = transfer.await_decision(Duration::from_secs(10)).await;
        assert_eq!(decision, Decision::Upload(UploadReason::Timeout));
    }

    #[tokio::test]
    async fn test_await_decision_returns_immediately_when_already_latched() {
        let transfer = pending();
        transfer.mark_completed();
        let decision = transfer.await_decision(Duration::from_secs(60)).await;
        assert_eq!(decision, Decision::Completed);
    }

    #[test]
    fn test_registry_insert_get_remove() {
        let registry = TransferRegistry::new();
        assert!(registry.is_empty());

        let transfer = pending();
        registry.insert(Arc::clone(&transfer));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("tr_1").is_some());
        assert!(registry.get("tr_other").is_none());

        let removed = registry.remove("tr_1").unwrap();
        assert_eq!(removed.transfer_id, "tr_1");
        assert!(registry.is_empty());
        assert!(registry.remove("tr_1").is_none());
    }

    #[test]
    fn test_reason_labels() {
        assert_eq!(UploadReason::ServerDirected.to_string(), "server_directed");
        assert_eq!(UploadReason::AppFallback.to_string(), "app_fallback");
        assert_eq!(UploadReason::Timeout.to_string(), "timeout");
    }
}
