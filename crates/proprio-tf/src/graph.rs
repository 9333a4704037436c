//! Frame-graph buffering and the [`TransformSource`] capability seam.
//!
//! The external transform broadcaster streams parent→child poses; a
//! [`FrameGraphBuffer`] holds the latest edge per frame pair and answers
//! lookups by composing a breadth-first chain between any two connected
//! frames. Lookups wait a bounded time for missing connectivity and then
//! fail with a typed error; an identity fallback is never substituted.
//!
//! [`StaticFrameGraph`] is the deterministic fake used by tests and by any
//! component that wants a fixed scene.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use tracing::debug;

use proprio_types::StateError;

use crate::geometry::Transform3D;

/// A resolvable source of frame-to-frame transforms.
///
/// `resolve(source, target, ..)` returns the rigid map taking coordinates
/// expressed in `source_frame` into `target_frame`, at the latest available
/// time or at `at` when given. Implementations block at most `wait` before
/// failing with [`StateError::TransformUnavailable`].
pub trait TransformSource: Send + Sync {
    fn resolve(
        &self,
        source_frame: &str,
        target_frame: &str,
        at: Option<DateTime<Utc>>,
        wait: Duration,
    ) -> Result<Transform3D, StateError>;
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    /// Coordinate map from the owning frame into the neighbour frame.
    map: Transform3D,
    stamp: DateTime<Utc>,
}

/// Undirected connectivity: registering parent→child stores the inverse edge
/// alongside, so resolution works in both directions like a real transform
/// listener.
#[derive(Debug, Default)]
struct Adjacency {
    edges: HashMap<String, HashMap<String, Edge>>,
}

impl Adjacency {
    /// Register the pose of `child` as seen from `parent`.
    fn insert(&mut self, parent: &str, child: &str, pose_of_child: Transform3D, stamp: DateTime<Utc>) {
        // pose_of_child maps child coordinates into parent coordinates.
        self.edges
            .entry(child.to_string())
            .or_default()
            .insert(parent.to_string(), Edge { map: pose_of_child, stamp });
        self.edges
            .entry(parent.to_string())
            .or_default()
            .insert(
                child.to_string(),
                Edge {
                    map: pose_of_child.inverse(),
                    stamp,
                },
            );
    }

    /// BFS from `source` to `target`, composing the coordinate map along the
    /// chain. With `at` set, only edges stamped at or after `at` are
    /// traversed: the answer must be at least as fresh as requested.
    fn lookup(
        &self,
        source: &str,
        target: &str,
        at: Option<DateTime<Utc>>,
    ) -> Option<Transform3D> {
        if source == target {
            return Some(Transform3D::identity());
        }

        let mut queue: VecDeque<(String, Transform3D)> = VecDeque::new();
        let mut visited: HashSet<String> = HashSet::new();
        queue.push_back((source.to_string(), Transform3D::identity()));
        visited.insert(source.to_string());

        while let Some((current, accumulated)) = queue.pop_front() {
            if let Some(neighbours) = self.edges.get(&current) {
                for (next, edge) in neighbours {
                    if visited.contains(next) {
                        continue;
                    }
                    if let Some(t) = at
                        && edge.stamp < t
                    {
                        continue;
                    }
                    // accumulated: source → current; edge.map: current → next.
                    let composed = edge.map.compose(accumulated);
                    if next == target {
                        return Some(composed);
                    }
                    visited.insert(next.clone());
                    queue.push_back((next.clone(), composed));
                }
            }
        }
        None
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FrameGraphBuffer
// ────────────────────────────────────────────────────────────────────────────

/// Live frame-graph buffer fed by the external transform broadcaster.
///
/// One producer calls [`set_transform`][Self::set_transform] as broadcasts
/// arrive; any number of threads resolve concurrently. A resolve that cannot
/// be satisfied yet parks on a condvar and is woken by the next update, so
/// the bounded wait costs no polling.
#[derive(Default)]
pub struct FrameGraphBuffer {
    inner: Mutex<Adjacency>,
    updated: Condvar,
}

impl FrameGraphBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or update the pose of `child` relative to `parent`, stamped
    /// `stamp`. Wakes every parked resolve.
    pub fn set_transform(
        &self,
        parent: &str,
        child: &str,
        pose_of_child: Transform3D,
        stamp: DateTime<Utc>,
    ) {
        let mut inner = self.inner.lock();
        inner.insert(parent, child, pose_of_child, stamp);
        self.updated.notify_all();
    }

    /// Convenience for live producers: stamp the edge with the current time.
    pub fn set_transform_now(&self, parent: &str, child: &str, pose_of_child: Transform3D) {
        self.set_transform(parent, child, pose_of_child, Utc::now());
    }
}

impl TransformSource for FrameGraphBuffer {
    fn resolve(
        &self,
        source_frame: &str,
        target_frame: &str,
        at: Option<DateTime<Utc>>,
        wait: Duration,
    ) -> Result<Transform3D, StateError> {
        let deadline = Instant::now() + wait;
        let mut inner = self.inner.lock();
        loop {
            if let Some(map) = inner.lookup(source_frame, target_frame, at) {
                return Ok(map);
            }
            let now = Instant::now();
            if now >= deadline {
                debug!(
                    source = source_frame,
                    target = target_frame,
                    waited_ms = wait.as_millis() as u64,
                    "transform lookup timed out"
                );
                return Err(StateError::TransformUnavailable {
                    from: source_frame.to_string(),
                    to: target_frame.to_string(),
                });
            }
            // Park until the next set_transform or the deadline; either way
            // the loop re-checks and decides.
            let _ = self.updated.wait_for(&mut inner, deadline - now);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// StaticFrameGraph
// ────────────────────────────────────────────────────────────────────────────

/// Deterministic [`TransformSource`] with a fixed edge set and zero waiting.
///
/// The test suite's stand-in for the external broadcaster; also useful for
/// replaying recorded scenes.
#[derive(Default)]
pub struct StaticFrameGraph {
    adjacency: Adjacency,
}

impl StaticFrameGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the pose of `child` relative to `parent` and return the graph for
    /// chaining.
    pub fn with_transform(mut self, parent: &str, child: &str, pose_of_child: Transform3D) -> Self {
        self.adjacency.insert(parent, child, pose_of_child, Utc::now());
        self
    }
}

impl TransformSource for StaticFrameGraph {
    fn resolve(
        &self,
        source_frame: &str,
        target_frame: &str,
        at: Option<DateTime<Utc>>,
        _wait: Duration,
    ) -> Result<Transform3D, StateError> {
        self.adjacency
            .lookup(source_frame, target_frame, at)
            .ok_or_else(|| StateError::TransformUnavailable {
                from: source_frame.to_string(),
                to: target_frame.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Quaternion, Vec3};
    use std::f64::consts::FRAC_PI_2;
    use std::sync::Arc;

    fn shift(x: f64, y: f64, z: f64) -> Transform3D {
        Transform3D::new(Vec3::new(x, y, z), Quaternion::identity())
    }

    fn assert_vec_eq(a: Vec3, b: Vec3) {
        assert!(a.distance(b) < 1e-9, "expected {b:?}, got {a:?}");
    }

    #[test]
    fn same_frame_resolves_to_identity() {
        let graph = StaticFrameGraph::new();
        let map = graph.resolve("world", "world", None, Duration::ZERO).unwrap();
        assert_eq!(map, Transform3D::identity());
    }

    #[test]
    fn direct_edge_both_directions() {
        // torso sits 1 m above the pelvis.
        let graph = StaticFrameGraph::new().with_transform("pelvis", "torso", shift(0.0, 0.0, 1.0));

        // The torso origin, expressed in pelvis coordinates.
        let up = graph.resolve("torso", "pelvis", None, Duration::ZERO).unwrap();
        assert_vec_eq(up.apply_point(Vec3::zero()), Vec3::new(0.0, 0.0, 1.0));

        // And back down.
        let down = graph.resolve("pelvis", "torso", None, Duration::ZERO).unwrap();
        assert_vec_eq(down.apply_point(Vec3::new(0.0, 0.0, 1.0)), Vec3::zero());
    }

    #[test]
    fn chained_edges_compose() {
        let graph = StaticFrameGraph::new()
            .with_transform("world", "pelvis", shift(1.0, 0.0, 0.0))
            .with_transform("pelvis", "torso", shift(0.0, 0.0, 1.0));

        let map = graph.resolve("torso", "world", None, Duration::ZERO).unwrap();
        assert_vec_eq(map.apply_point(Vec3::zero()), Vec3::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn rotation_in_chain_is_respected() {
        // pelvis yawed 90 deg in world; palm 1 m along pelvis +x.
        let yaw = Quaternion::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), FRAC_PI_2);
        let graph = StaticFrameGraph::new()
            .with_transform("world", "pelvis", Transform3D::new(Vec3::zero(), yaw))
            .with_transform("pelvis", "l_palm", shift(1.0, 0.0, 0.0));

        let map = graph.resolve("l_palm", "world", None, Duration::ZERO).unwrap();
        assert_vec_eq(map.apply_point(Vec3::zero()), Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn unreachable_frame_is_typed_failure() {
        let graph = StaticFrameGraph::new().with_transform("world", "pelvis", shift(1.0, 0.0, 0.0));
        let result = graph.resolve("pelvis", "ghost", None, Duration::ZERO);
        assert_eq!(
            result,
            Err(StateError::TransformUnavailable {
                from: "pelvis".to_string(),
                to: "ghost".to_string(),
            })
        );
    }

    #[test]
    fn buffer_update_overrides_previous_edge() {
        let buffer = FrameGraphBuffer::new();
        buffer.set_transform_now("world", "pelvis", shift(1.0, 0.0, 0.0));
        buffer.set_transform_now("world", "pelvis", shift(5.0, 0.0, 0.0));

        let map = buffer.resolve("pelvis", "world", None, Duration::ZERO).unwrap();
        assert_vec_eq(map.apply_point(Vec3::zero()), Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn bounded_wait_expires() {
        let buffer = FrameGraphBuffer::new();
        let started = Instant::now();
        let result = buffer.resolve("pelvis", "world", None, Duration::from_millis(50));
        let elapsed = started.elapsed();

        assert!(matches!(result, Err(StateError::TransformUnavailable { .. })));
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_secs(2), "wait must be bounded");
    }

    #[test]
    fn parked_resolve_wakes_on_update() {
        let buffer = Arc::new(FrameGraphBuffer::new());

        let producer = {
            let buffer = Arc::clone(&buffer);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(30));
                buffer.set_transform_now("world", "pelvis", shift(2.0, 0.0, 0.0));
            })
        };

        let started = Instant::now();
        let map = buffer
            .resolve("pelvis", "world", None, Duration::from_secs(5))
            .expect("update arrives inside the wait budget");
        producer.join().unwrap();

        assert_vec_eq(map.apply_point(Vec3::zero()), Vec3::new(2.0, 0.0, 0.0));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn timed_resolution_requires_fresh_edges() {
        let buffer = FrameGraphBuffer::new();
        let stamp = Utc::now();
        buffer.set_transform("world", "pelvis", shift(1.0, 0.0, 0.0), stamp);

        // Data older than requested: unavailable.
        let future = stamp + chrono::Duration::seconds(1);
        let result = buffer.resolve("pelvis", "world", Some(future), Duration::ZERO);
        assert!(matches!(result, Err(StateError::TransformUnavailable { .. })));

        // Data at least as fresh as requested: resolves.
        let past = stamp - chrono::Duration::seconds(1);
        assert!(buffer.resolve("pelvis", "world", Some(past), Duration::ZERO).is_ok());
    }
}
