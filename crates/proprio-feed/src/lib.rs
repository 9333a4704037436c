//! `proprio-feed` – the asynchronous joint-telemetry boundary.
//!
//! Joint samples enter the supervisory layer through exactly one door: a
//! [`JointFeed`]. Hardware bridges publish [`JointStateEvent`]s into it at an
//! approximately fixed rate; the state service's absorber task subscribes and
//! turns each event into one atomic snapshot generation.
//!
//! # Modules
//!
//! - [`bus`] – [`JointFeed`]/[`FeedReceiver`]: clonable broadcast channel of
//!   telemetry events; slow subscribers lag and skip, they never block the
//!   producer.
//! - [`source`] – [`TelemetrySource`]: the seam real drivers implement, plus
//!   [`ScriptedSource`], a deterministic replay double for tests.
//!
//! [`JointStateEvent`]: proprio_types::JointStateEvent

pub mod bus;
pub mod source;

pub use bus::{FeedReceiver, JointFeed};
pub use source::{ScriptedSource, TelemetrySource};
