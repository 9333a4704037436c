//! `proprio-types` – shared data model of the proprio supervisory layer.
//!
//! Every other proprio crate speaks in terms of these types:
//!
//! - [`JointSample`] – one (position, velocity, effort) measurement for one
//!   joint at one instant.
//! - [`Snapshot`] – the complete, immutable set of joint samples produced by
//!   one accepted telemetry update, tagged with a monotonically increasing
//!   generation id.
//! - [`JointStateEvent`] – the wire unit of the asynchronous telemetry feed.
//! - [`JointField`] – selects which scalar of a sample a query reads.
//! - [`RobotSide`] – left/right selector for paired limbs and grippers.
//! - [`StateError`] – the failure taxonomy of the whole layer.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// One measurement for one robot joint, captured at one update instant.
///
/// A telemetry update carries exactly one sample per declared joint; partial
/// updates are rejected as a whole (see [`StateError::MalformedSample`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointSample {
    /// Joint identifier, e.g. `"l_arm_shz"` or `"r_finger_1_joint_1"`.
    pub name: String,
    /// Angular position in radians (prismatic joints: meters).
    pub position: f64,
    /// Velocity in rad/s (prismatic joints: m/s).
    pub velocity: f64,
    /// Applied effort in N·m (prismatic joints: N).
    pub effort: f64,
}

impl JointSample {
    /// Build a sample from its four raw components.
    pub fn new(name: impl Into<String>, position: f64, velocity: f64, effort: f64) -> Self {
        Self {
            name: name.into(),
            position,
            velocity,
            effort,
        }
    }

    /// Read the scalar selected by `field`.
    pub fn field(&self, field: JointField) -> f64 {
        match field {
            JointField::Position => self.position,
            JointField::Velocity => self.velocity,
            JointField::Effort => self.effort,
        }
    }
}

/// Selects which scalar of a [`JointSample`] a query reads.
///
/// All per-joint scalar queries funnel through this selector so that name
/// validation and empty-cache handling live in exactly one code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointField {
    Position,
    Velocity,
    Effort,
}

impl std::fmt::Display for JointField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JointField::Position => write!(f, "position"),
            JointField::Velocity => write!(f, "velocity"),
            JointField::Effort => write!(f, "effort"),
        }
    }
}

/// Left/right selector for paired limbs, end effectors, and grippers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RobotSide {
    Left,
    Right,
}

impl std::fmt::Display for RobotSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RobotSide::Left => write!(f, "left"),
            RobotSide::Right => write!(f, "right"),
        }
    }
}

/// The wire unit of the telemetry feed: one full set of joint samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointStateEvent {
    pub id: Uuid,
    pub stamp: DateTime<Utc>,
    pub samples: Vec<JointSample>,
}

impl JointStateEvent {
    /// Wrap a sample set in a freshly stamped event.
    pub fn now(samples: Vec<JointSample>) -> Self {
        Self {
            id: Uuid::new_v4(),
            stamp: Utc::now(),
            samples,
        }
    }
}

/// The complete, immutable set of joint samples produced by one accepted
/// telemetry update.
///
/// A snapshot is either absent (no update accepted yet) or complete: it holds
/// exactly one sample per declared joint. Once published it is never mutated;
/// the cache replaces the whole snapshot handle on the next accepted update.
/// Generation ids start at 1 and increase by exactly 1 per accepted update.
#[derive(Debug, Clone)]
pub struct Snapshot {
    generation: u64,
    stamp: DateTime<Utc>,
    samples: HashMap<String, JointSample>,
}

impl Snapshot {
    /// Assemble a snapshot. Callers (the cache) are responsible for having
    /// validated that `samples` covers the declared joint set.
    pub fn new(generation: u64, stamp: DateTime<Utc>, samples: HashMap<String, JointSample>) -> Self {
        Self {
            generation,
            stamp,
            samples,
        }
    }

    /// Monotonically increasing id of the update that produced this snapshot.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Time at which the producing update was stamped.
    pub fn stamp(&self) -> DateTime<Utc> {
        self.stamp
    }

    /// Number of joints in this snapshot.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Look up the sample for `name`, if the joint is declared.
    pub fn sample(&self, name: &str) -> Option<&JointSample> {
        self.samples.get(name)
    }

    /// Read one scalar of one joint.
    ///
    /// # Errors
    ///
    /// [`StateError::UnknownJoint`] when `name` is outside the declared set.
    pub fn value(&self, name: &str, field: JointField) -> Result<f64, StateError> {
        self.samples
            .get(name)
            .map(|s| s.field(field))
            .ok_or_else(|| StateError::UnknownJoint(name.to_string()))
    }

    /// Iterate over all samples in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &JointSample> {
        self.samples.values()
    }
}

/// Failure taxonomy of the proprio layer.
///
/// Every fallible operation returns one of these; the layer never terminates
/// the process and never substitutes a default value for missing data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    /// No telemetry update has been accepted since startup.
    #[error("state cache is empty: no joint telemetry received yet")]
    EmptyCache,

    /// The named joint is outside the robot's declared joint set.
    #[error("unknown joint '{0}'")]
    UnknownJoint(String),

    /// The named joint group does not exist in the robot description.
    #[error("unknown joint group '{0}'")]
    UnknownGroup(String),

    /// An incoming update does not cover exactly the declared joint set.
    /// Handled internally by the absorber: logged, previous snapshot kept.
    #[error("malformed sample set (expected {expected} joints): {details}")]
    MalformedSample { expected: usize, details: String },

    /// A frame-to-frame lookup failed or timed out within its bounded wait.
    #[error("transform from '{from}' to '{to}' unavailable")]
    TransformUnavailable { from: String, to: String },

    /// The telemetry feed channel is closed or has no listeners.
    #[error("telemetry feed error: {0}")]
    Feed(String),

    /// A robot description failed to load or validate.
    #[error("robot description error: {0}")]
    Description(String),
}
