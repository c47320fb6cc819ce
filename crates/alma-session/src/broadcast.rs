use alma_types::ServerFrame;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

const CHANNEL_CAPACITY: usize = 1000;

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<ServerFrame>,
}

/// Receiving end handed to a registered client
pub struct Subscription {
    pub id: u64,
    pub thread_id: String,
    pub rx: mpsc::Receiver<ServerFrame>,
}

/// Per-thread push channel with at most one subscriber per thread.
///
/// Registering replaces the previous subscriber silently; its receiver
/// simply stops getting frames. Frames for threads without a subscriber
/// are dropped.
#[derive(Default)]
pub struct BroadcastChannel {
    subscribers: Mutex<HashMap<String, Subscriber>>,
    next_id: AtomicU64,
}

impl BroadcastChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn subscribers(&self) -> MutexGuard<'_, HashMap<String, Subscriber>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn register(&self, thread_id: impl Into<String>) -> Subscription {
        let thread_id = thread_id.into();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        if self
            .subscribers()
            .insert(thread_id.clone(), Subscriber { id, tx })
            .is_some()
        {
            debug!(thread_id = %thread_id, "Replaced thread subscriber");
        }

        Subscription { id, thread_id, rx }
    }

    /// Remove the subscriber only if it is still the one identified by `id`
    pub fn unregister(&self, thread_id: &str, id: u64) -> bool {
        let mut subscribers = self.subscribers();
        match subscribers.get(thread_id) {
            Some(sub) if sub.id == id => {
                subscribers.remove(thread_id);
                true
            }
            _ => false,
        }
    }

    pub fn has_subscriber(&self, thread_id: &str) -> bool {
        self.subscribers().contains_key(thread_id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    /// Deliver a frame without waiting; returns whether a subscriber took it.
    ///
    /// A subscriber whose queue is full or closed is dropped along with the
    /// frame. The stored row always carries the latest parts, so a client
    /// recovers by re-registering and reloading the thread.
    pub fn send(&self, thread_id: &str, frame: ServerFrame) -> bool {
        let target = self
            .subscribers()
            .get(thread_id)
            .map(|sub| (sub.id, sub.tx.clone()));
        let Some((id, tx)) = target else {
            return false;
        };

        match tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(thread_id = %thread_id, subscription_id = id, "Subscriber not keeping up, dropping it");
                self.unregister(thread_id, id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(thread_id = %thread_id, "Subscriber went away");
                self.unregister(thread_id, id);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_without_subscriber_is_dropped() {
        let channel = BroadcastChannel::new();
        assert!(!channel.send("t1", ServerFrame::Done));
    }

    #[tokio::test]
    async fn test_register_replaces_previous() {
        let channel = BroadcastChannel::new();
        let mut first = channel.register("t1");
        let mut second = channel.register("t1");

        assert!(channel.send("t1", ServerFrame::Done));
        assert_eq!(second.rx.recv().await, Some(ServerFrame::Done));
        // First receiver's sender was dropped on replacement
        assert_eq!(first.rx.recv().await, None);
        assert_eq!(channel.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_unregister_keeps_current() {
        let channel = BroadcastChannel::new();
        let first = channel.register("t1");
        let _second = channel.register("t1");

        assert!(!channel.unregister("t1", first.id));
        assert!(channel.has_subscriber("t1"));
    }

    #[tokio::test]
    async fn test_closed_receiver_is_pruned() {
        let channel = BroadcastChannel::new();
        let sub = channel.register("t1");
        drop(sub);

        assert!(!channel.send("t1", ServerFrame::error("x")));
        assert!(!channel.has_subscriber("t1"));
    }

    #[tokio::test]
    async fn test_threads_are_isolated() {
        let channel = BroadcastChannel::new();
        let mut a = channel.register("a");
        let mut b = channel.register("b");

        channel.send("a", ServerFrame::Done);
        assert_eq!(a.rx.recv().await, Some(ServerFrame::Done));
        assert!(b.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stalled_subscriber_is_dropped_without_blocking() {
        let channel = BroadcastChannel::new();
        let mut stalled = channel.register("t1");

        for _ in 0..CHANNEL_CAPACITY {
            assert!(channel.send("t1", ServerFrame::Done));
        }
        // Queue is full: the frame is dropped and so is the subscriber
        assert!(!channel.send("t1", ServerFrame::Done));
        assert!(!channel.has_subscriber("t1"));
        assert!(!channel.send("t1", ServerFrame::Done));

        let mut received = 0;
        while stalled.rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, CHANNEL_CAPACITY);
    }
}
