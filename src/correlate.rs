//! Correlated request tracking: id generation, the pending map, timeouts.
//!
//! Replies may arrive in any order; each pending entry resolves exactly once
//! — by matching reply, by timeout, or by session closure, whichever comes
//! first. Late replies are ignored.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::ClientError;

// ---------------------------------------------------------------------------
// Id generation
// ---------------------------------------------------------------------------

/// Generates `<prefix><base36 millis>_<counter>` identifiers.
///
/// The monotonic counter guarantees uniqueness across any two concurrently
/// pending requests; the time component keeps ids unique across process
/// restarts (furniture uids outlive the session on the server).
#[derive(Debug, Default)]
pub struct IdGenerator {
    counter: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, prefix: &str) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}{}_{n}", base36(millis))
    }
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ascii")
}

// ---------------------------------------------------------------------------
// Pending requests
// ---------------------------------------------------------------------------

type ReplyResult = Result<serde_json::Value, ClientError>;

struct PendingRequest {
    tx: oneshot::Sender<ReplyResult>,
    created: Instant,
}

/// Tracks in-flight correlated requests keyed by `reqId`.
#[derive(Default)]
pub struct RequestCorrelator {
    pending: Mutex<HashMap<String, PendingRequest>>,
    ids: IdGenerator,
}

impl RequestCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_req_id(&self) -> String {
        self.ids.next("r")
    }

    /// Register a pending request and hand back its completion channel.
    pub fn register(&self, req_id: &str) -> oneshot::Receiver<ReplyResult> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(
            req_id.to_string(),
            PendingRequest {
                tx,
                created: Instant::now(),
            },
        );
        rx
    }

    /// Resolve a pending request with its reply data.
    ///
    /// Returns false for unknown ids — late replies after a timeout land
    /// here and are not an error.
    pub fn resolve(&self, req_id: &str, data: serde_json::Value) -> bool {
        let Some(entry) = self.pending.lock().remove(req_id) else {
            log::debug!("ignoring reply for unknown request {req_id}");
            return false;
        };
        log::debug!("request {req_id} resolved in {:?}", entry.created.elapsed());
        let _ = entry.tx.send(Ok(data));
        true
    }

    /// Drop a pending entry without completing it (timeout path — the
    /// waiter already owns the error).
    pub fn abandon(&self, req_id: &str) {
        self.pending.lock().remove(req_id);
    }

    /// Reject every outstanding request. Called on socket closure so
    /// continuations fail fast instead of timing out silently.
    pub fn reject_all(&self, reason: &str) {
        let drained: Vec<_> = self.pending.lock().drain().collect();
        for (req_id, entry) in drained {
            log::debug!(
                "rejecting request {req_id} after {:?}: {reason}",
                entry.created.elapsed()
            );
            let _ = entry.tx.send(Err(ClientError::Closed(reason.to_string())));
        }
    }

    /// Await a registered request with a deadline.
    ///
    /// On timeout the pending entry is removed, so a late reply is ignored
    /// rather than resolving a dead continuation.
    pub async fn wait(
        &self,
        req_id: String,
        rx: oneshot::Receiver<ReplyResult>,
        deadline: Duration,
    ) -> ReplyResult {
        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::Closed("request channel dropped".into())),
            Err(_) => {
                self.abandon(&req_id);
                Err(ClientError::Timeout { req_id })
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_prefixed() {
        let ids = IdGenerator::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            let id = ids.next("f");
            assert!(id.starts_with('f'));
            assert!(seen.insert(id), "duplicate id generated");
        }
    }

    #[test]
    fn resolve_delivers_payload() {
        tokio_test::block_on(async {
            let c = RequestCorrelator::new();
            let id = c.next_req_id();
            let rx = c.register(&id);
            assert!(c.resolve(&id, serde_json::json!({"ok": true})));
            let data = c
                .wait(id, rx, Duration::from_secs(1))
                .await
                .expect("resolved");
            assert_eq!(data["ok"], true);
            assert_eq!(c.pending_count(), 0);
        });
    }

    #[test]
    fn out_of_order_replies_match_their_own_calls() {
        tokio_test::block_on(async {
            let c = RequestCorrelator::new();
            let id_a = c.next_req_id();
            let id_b = c.next_req_id();
            let rx_a = c.register(&id_a);
            let rx_b = c.register(&id_b);

            // Reply to B first, then A.
            assert!(c.resolve(&id_b, serde_json::json!("payload-b")));
            assert!(c.resolve(&id_a, serde_json::json!("payload-a")));

            let a = c.wait(id_a, rx_a, Duration::from_secs(1)).await.unwrap();
            let b = c.wait(id_b, rx_b, Duration::from_secs(1)).await.unwrap();
            assert_eq!(a, "payload-a");
            assert_eq!(b, "payload-b");
        });
    }

    #[test]
    fn timeout_removes_entry_and_late_reply_is_ignored() {
        tokio_test::block_on(async {
            let c = RequestCorrelator::new();
            let id = c.next_req_id();
            let rx = c.register(&id);
            let err = c
                .wait(id.clone(), rx, Duration::from_millis(10))
                .await
                .expect_err("no reply was sent");
            assert!(matches!(err, ClientError::Timeout { .. }));
            assert_eq!(c.pending_count(), 0);
            assert!(!c.resolve(&id, serde_json::json!(null)), "late reply ignored");
        });
    }

    #[test]
    fn reject_all_fails_every_pending_call() {
        tokio_test::block_on(async {
            let c = RequestCorrelator::new();
            let id_a = c.next_req_id();
            let id_b = c.next_req_id();
            let rx_a = c.register(&id_a);
            let rx_b = c.register(&id_b);

            c.reject_all("socket closed");
            assert_eq!(c.pending_count(), 0);

            for (id, rx) in [(id_a, rx_a), (id_b, rx_b)] {
                let err = c.wait(id, rx, Duration::from_secs(1)).await.unwrap_err();
                assert!(matches!(err, ClientError::Closed(_)));
            }
        });
    }
}
