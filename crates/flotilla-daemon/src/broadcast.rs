//! Best-effort fan-out to connected dashboard clients.
//!
//! Each SSE client owns a bounded queue. Delivery is at-most-once: a full
//! queue drops the message for that client only, a closed queue removes the
//! client at the next broadcast. The authoritative state is always
//! re-readable from the record files, so a dropped push only costs a
//! "please refresh" nudge.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

/// Per-client queue capacity.
const CLIENT_QUEUE_DEPTH: usize = 10;

/// Envelope pushed over the SSE channel.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateEnvelope<T> {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: T,
}

/// Low-detail refresh signal emitted once per reconciliation cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "worktreeCount")]
    pub worktree_count: usize,
}

pub struct Broadcaster {
    clients: Mutex<Vec<mpsc::Sender<String>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(Vec::new()),
        }
    }

    /// Register a new client and hand back its queue's receiving end.
    pub fn subscribe(&self) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(CLIENT_QUEUE_DEPTH);
        self.clients.lock().unwrap().push(tx);
        rx
    }

    /// Send a `{type, data}` envelope to every connected client.
    ///
    /// Full queues drop this message for that client; closed queues
    /// (disconnected clients) are pruned.
    pub fn broadcast<T: Serialize>(&self, kind: &str, data: T) {
        let envelope = UpdateEnvelope {
            kind: kind.to_string(),
            data,
        };
        let msg = match serde_json::to_string(&envelope) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "failed to encode broadcast envelope");
                return;
            }
        };

        self.clients.lock().unwrap().retain(|tx| {
            match tx.try_send(msg.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("client queue full, dropping update");
                    true // keep the client, just drop this message
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_reaches_every_subscriber() {
        let b = Broadcaster::new();
        let mut rx1 = b.subscribe();
        let mut rx2 = b.subscribe();

        b.broadcast("health", CycleSummary {
            timestamp: Utc::now(),
            worktree_count: 3,
        });

        let msg = rx1.try_recv().unwrap();
        assert!(msg.contains("\"type\":\"health\""));
        assert!(msg.contains("\"worktreeCount\":3"));
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn full_queue_drops_message_but_keeps_client() {
        let b = Broadcaster::new();
        let _rx = b.subscribe();

        for _ in 0..(CLIENT_QUEUE_DEPTH + 5) {
            b.broadcast("health", 0u32);
        }
        // The slow client is still registered.
        assert_eq!(b.client_count(), 1);
    }

    #[test]
    fn closed_receiver_is_pruned_on_next_broadcast() {
        let b = Broadcaster::new();
        let rx = b.subscribe();
        assert_eq!(b.client_count(), 1);

        drop(rx);
        b.broadcast("health", 0u32);
        assert_eq!(b.client_count(), 0);
    }

    #[test]
    fn slow_client_does_not_block_others() {
        let b = Broadcaster::new();
        let _slow = b.subscribe();
        // Fill the slow client's queue.
        for _ in 0..CLIENT_QUEUE_DEPTH {
            b.broadcast("health", 0u32);
        }

        let mut fresh = b.subscribe();
        b.broadcast("health", 1u32);
        assert!(fresh.try_recv().is_ok());
    }
}
