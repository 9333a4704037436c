//! Broadcast channel carrying joint-telemetry events.
//!
//! Built on [`tokio::sync::broadcast`] so that every subscriber receives
//! every event without any single subscriber blocking the producer or the
//! others. A subscriber that falls behind is lagged past, not waited for:
//! only the latest physical state matters for control decisions, so a
//! consumer may skip generations but never stalls the feed.

use proprio_types::{JointStateEvent, StateError};
use tokio::sync::broadcast;
use tracing::warn;

/// Default channel capacity (buffered events before old ones are dropped for
/// slow subscribers). Telemetry arrives at a fixed rate, so this is sized in
/// update periods, not bytes.
const DEFAULT_CAPACITY: usize = 128;

/// Clonable handle to the joint-telemetry feed.
///
/// All clones share the same underlying channel. The hardware bridge holds
/// one clone and publishes; every consumer subscribes through its own clone.
#[derive(Clone, Debug)]
pub struct JointFeed {
    sender: broadcast::Sender<JointStateEvent>,
}

impl JointFeed {
    /// Create a feed with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish one telemetry event to every active subscriber.
    ///
    /// Returns the number of subscribers that were handed the event.
    ///
    /// # Errors
    ///
    /// [`StateError::Feed`] when no subscriber is currently listening; the
    /// event is dropped and the producer decides whether that matters.
    pub fn publish(&self, event: JointStateEvent) -> Result<usize, StateError> {
        self.sender
            .send(event)
            .map_err(|_| StateError::Feed("no subscribers on the joint feed".to_string()))
    }

    /// Open a new subscription starting at the current head of the feed.
    pub fn subscribe(&self) -> FeedReceiver {
        FeedReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of currently active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for JointFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// One subscription to the joint feed.
///
/// Obtained via [`JointFeed::subscribe`].
pub struct FeedReceiver {
    receiver: broadcast::Receiver<JointStateEvent>,
}

impl FeedReceiver {
    /// Wait for the next telemetry event.
    ///
    /// A lagged subscription (the producer overwrote events this receiver
    /// never saw) is logged and skipped past; the next available event is
    /// returned. Returns `None` once the feed is closed and drained.
    pub async fn recv(&mut self) -> Option<JointStateEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "joint feed subscriber lagged; resuming at head");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
