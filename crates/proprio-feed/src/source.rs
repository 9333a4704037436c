//! Telemetry-source seam.
//!
//! The supervisory layer never talks to robot middleware directly; a driver
//! implements [`TelemetrySource`] and pumps its stream into a
//! [`JointFeed`][crate::bus::JointFeed]. [`ScriptedSource`] is the
//! deterministic double used throughout the test suite: it replays a fixed
//! sequence of sample sets at a configurable cadence.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;

use proprio_types::{JointSample, JointStateEvent, StateError};

use crate::bus::JointFeed;

/// Anything that can produce a live stream of joint-state events.
///
/// Real implementations wrap hardware middleware subscriptions; tests use
/// [`ScriptedSource`]. A [`JointFeed`] subscription is itself a source, which
/// lets components be written against the trait and fed from either side.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Open the event stream. The stream ends when the underlying producer
    /// shuts down.
    async fn stream(&self) -> BoxStream<'static, JointStateEvent>;
}

#[async_trait]
impl TelemetrySource for JointFeed {
    async fn stream(&self) -> BoxStream<'static, JointStateEvent> {
        let receiver = self.subscribe();
        Box::pin(futures_util::stream::unfold(
            receiver,
            |mut receiver| async move { receiver.recv().await.map(|event| (event, receiver)) },
        ))
    }
}

/// Deterministic telemetry double: replays a fixed sequence of sample sets,
/// one event per `period`.
#[derive(Clone)]
pub struct ScriptedSource {
    frames: Vec<Vec<JointSample>>,
    period: Duration,
}

impl ScriptedSource {
    /// Replay `frames` with `period` between consecutive events.
    pub fn new(frames: Vec<Vec<JointSample>>, period: Duration) -> Self {
        Self { frames, period }
    }

    /// Replay `frames` back-to-back with no pacing. Handy in unit tests.
    pub fn immediate(frames: Vec<Vec<JointSample>>) -> Self {
        Self::new(frames, Duration::ZERO)
    }

    /// Publish the whole script into `feed`, pacing each event by the
    /// configured period. Returns the number of events published.
    ///
    /// # Errors
    ///
    /// [`StateError::Feed`] if the feed loses its last subscriber mid-script.
    pub async fn pump(self, feed: JointFeed) -> Result<usize, StateError> {
        let mut published = 0;
        let mut stream = self.stream().await;
        while let Some(event) = stream.next().await {
            feed.publish(event)?;
            published += 1;
        }
        Ok(published)
    }
}

#[async_trait]
impl TelemetrySource for ScriptedSource {
    async fn stream(&self) -> BoxStream<'static, JointStateEvent> {
        let period = self.period;
        Box::pin(
            futures_util::stream::iter(self.frames.clone()).then(move |samples| async move {
                if !period.is_zero() {
                    tokio::time::sleep(period).await;
                }
                JointStateEvent::now(samples)
            }),
        )
    }
}
