//! Frame-to-frame resolution and primitive conversion.
//!
//! [`TransformResolver`] is a thin, stateless adapter over any
//! [`TransformSource`]: it carries the wait budget and the conversion math,
//! nothing else. Failures from the source pass through untouched so callers
//! always see the typed [`StateError::TransformUnavailable`] and can decide
//! for themselves whether to wait, retry, or abandon the motion.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use proprio_types::StateError;

use crate::geometry::{Pose, Quaternion, Transform3D, Vec3};
use crate::graph::TransformSource;

/// How long a resolution may wait for the graph to connect before failing.
/// Chosen to ride out one dropped broadcast cycle, not to mask a dead source.
const DEFAULT_WAIT: Duration = Duration::from_millis(250);

/// Resolves poses between named frames and converts geometry across them.
#[derive(Clone)]
pub struct TransformResolver {
    source: Arc<dyn TransformSource>,
    wait: Duration,
}

impl TransformResolver {
    /// Wrap a transform source with the default wait budget.
    pub fn new(source: Arc<dyn TransformSource>) -> Self {
        Self::with_wait(source, DEFAULT_WAIT)
    }

    /// Wrap a transform source with an explicit wait budget.
    pub fn with_wait(source: Arc<dyn TransformSource>, wait: Duration) -> Self {
        Self { source, wait }
    }

    /// The coordinate map taking `source_frame` coordinates into
    /// `target_frame`, at the latest available time unless `at` is given.
    ///
    /// # Errors
    ///
    /// [`StateError::TransformUnavailable`] after the bounded wait.
    pub fn resolve_frame(
        &self,
        source_frame: &str,
        target_frame: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<Transform3D, StateError> {
        self.source.resolve(source_frame, target_frame, at, self.wait)
    }

    /// The current pose of `child_frame` as seen from `base_frame`.
    pub fn frame_pose(&self, child_frame: &str, base_frame: &str) -> Result<Pose, StateError> {
        // The child→base map carries the child origin and axes into base
        // coordinates, which is exactly the child's pose in base.
        self.resolve_frame(child_frame, base_frame, None).map(Pose::from)
    }

    /// Re-express a point in another frame (rotation + translation).
    pub fn convert_point(&self, point: Vec3, from: &str, to: &str) -> Result<Vec3, StateError> {
        Ok(self.resolve_frame(from, to, None)?.apply_point(point))
    }

    /// Re-express a free vector in another frame (rotation only).
    pub fn convert_vector(&self, vector: Vec3, from: &str, to: &str) -> Result<Vec3, StateError> {
        Ok(self.resolve_frame(from, to, None)?.apply_vector(vector))
    }

    /// Re-express an orientation in another frame.
    pub fn convert_quaternion(
        &self,
        orientation: Quaternion,
        from: &str,
        to: &str,
    ) -> Result<Quaternion, StateError> {
        Ok(self
            .resolve_frame(from, to, None)?
            .rotation
            .mul(orientation))
    }

    /// Re-express a full pose in another frame.
    pub fn convert_pose(&self, pose: Pose, from: &str, to: &str) -> Result<Pose, StateError> {
        let map = self.resolve_frame(from, to, None)?;
        Ok(Pose::new(
            map.apply_point(pose.position),
            map.rotation.mul(pose.orientation),
        ))
    }
}
