//! The in-flight authentication registry: tracks which sessions currently
//! have a running `IsAuthenticated` call, so a second call against the same
//! session can be rejected instead of racing the first.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

/// A cancellation handle shared between the `IsAuthenticated` call that owns
/// a wait and the `CancelIsAuthenticated`/`EndSession` call that may
/// interrupt it. Cloning is cheap; every clone observes the same flag.
#[derive(Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelHandle {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves as soon as `cancel` has been called, including if it was
    /// already called before this was polled. Takes the `notified()` future
    /// before re-checking the flag so a `cancel()` landing between the
    /// check and the await can't be missed.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Raised when a second `IsAuthenticated` targets a session that already
/// has one in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlreadyInFlight {
    pub session_id: String,
}

impl std::fmt::Display for AlreadyInFlight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "IsAuthenticated already running for session {}",
            self.session_id
        )
    }
}

impl std::error::Error for AlreadyInFlight {}

/// Maps session id to the cancellation handle of its currently-running
/// `IsAuthenticated` attempt, if any. Guarded by a single plain mutex whose
/// critical sections are always short (insert/remove/cancel), never held
/// across a wait.
#[derive(Default)]
pub struct InFlightRegistry {
    entries: Mutex<HashMap<String, CancelHandle>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically check absence and insert. The returned handle must be
    /// dropped from the registry by calling `end` on every exit path —
    /// success, failure, or cancellation.
    pub async fn begin(&self, session_id: &str) -> Result<CancelHandle, AlreadyInFlight> {
        let mut guard = self.entries.lock().await;
        if guard.contains_key(session_id) {
            return Err(AlreadyInFlight {
                session_id: session_id.to_string(),
            });
        }
        let handle = CancelHandle::new();
        guard.insert(session_id.to_string(), handle.clone());
        Ok(handle)
    }

    /// Remove the in-flight entry for a session, if present.
    pub async fn end(&self, session_id: &str) {
        self.entries.lock().await.remove(session_id);
    }

    /// Signal cancellation for a session's in-flight attempt. No-op if
    /// there is none.
    pub async fn cancel(&self, session_id: &str) -> bool {
        match self.entries.lock().await.get(session_id) {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn is_in_flight(&self, session_id: &str) -> bool {
        self.entries.lock().await.contains_key(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn begin_twice_is_rejected() {
        let reg = InFlightRegistry::new();
        let _first = reg.begin("s1").await.unwrap();
        let err = reg.begin("s1").await.unwrap_err();
        assert_eq!(err.session_id, "s1");
    }

    #[tokio::test]
    async fn end_allows_a_new_begin() {
        let reg = InFlightRegistry::new();
        let _first = reg.begin("s1").await.unwrap();
        reg.end("s1").await;
        assert!(reg.begin("s1").await.is_ok());
    }

    #[tokio::test]
    async fn cancel_on_unknown_session_is_noop() {
        let reg = InFlightRegistry::new();
        assert!(!reg.cancel("unknown").await);
    }

    #[tokio::test]
    async fn cancel_wakes_a_waiter_promptly() {
        let reg = Arc::new(InFlightRegistry::new());
        let handle = reg.begin("s1").await.unwrap();

        let waiter = tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            handle.cancelled().await;
            started.elapsed()
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        reg.cancel("s1").await;

        let elapsed = waiter.await.unwrap();
        assert!(elapsed < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn cancel_before_wait_is_observed_immediately() {
        let handle_holder = InFlightRegistry::new();
        let handle = handle_holder.begin("s1").await.unwrap();
        handle_holder.cancel("s1").await;
        // cancelled() must return immediately, not hang.
        tokio::time::timeout(Duration::from_millis(50), handle.cancelled())
            .await
            .expect("cancelled() should resolve without waiting");
    }
}
