//! The state-service façade.
//!
//! [`StateService`] is the one query surface every other component of the
//! supervisory layer talks to: trajectory controllers read posture before
//! publishing a command, the GUI samples joint values, perception converts
//! sensor geometry between frames. It composes the [`StateCache`] with a
//! [`TransformResolver`] and derives higher-level predicates (grasp state)
//! from raw joint data.
//!
//! There is no hidden singleton. Construct the service once at process
//! start, wrap it in the returned [`Arc`], and hand clones of the handle to
//! every consumer; tests construct as many independent instances as they
//! need, each bound to its own fake feed and fake frame graph.
//!
//! A derived query that needs joint data and frame data performs two
//! independent accesses; the snapshot lock is never held across a resolver
//! call, so a slow transform lookup cannot stall telemetry readers.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use proprio_description::RobotDescription;
use proprio_feed::JointFeed;
use proprio_tf::{Pose, Quaternion, TransformResolver, TransformSource, Vec3};
use proprio_types::{JointField, JointSample, RobotSide, Snapshot, StateError};

use crate::cache::StateCache;

/// Process-wide facade over the joint-state cache and the frame resolver.
pub struct StateService {
    description: Arc<RobotDescription>,
    cache: StateCache,
    resolver: TransformResolver,
}

impl StateService {
    /// Build a service for `description`, resolving frames through
    /// `transforms` with the default wait budget.
    pub fn new(
        description: Arc<RobotDescription>,
        transforms: Arc<dyn TransformSource>,
    ) -> Arc<Self> {
        Self::with_resolver(description, TransformResolver::new(transforms))
    }

    /// Build a service with an explicitly configured resolver.
    pub fn with_resolver(
        description: Arc<RobotDescription>,
        resolver: TransformResolver,
    ) -> Arc<Self> {
        let cache = StateCache::new(description.joint_names());
        Arc::new(Self {
            description,
            cache,
            resolver,
        })
    }

    /// The robot description this service was bound to.
    pub fn description(&self) -> &RobotDescription {
        &self.description
    }

    /// The frame resolver, for callers doing bulk geometry.
    pub fn resolver(&self) -> &TransformResolver {
        &self.resolver
    }

    // ------------------------------------------------------------------
    // Telemetry intake
    // ------------------------------------------------------------------

    /// Spawn the absorber task: the sole writer that drains `feed` and turns
    /// each event into one snapshot generation. The task ends when the feed
    /// closes.
    ///
    /// Malformed updates are logged and dropped here; query callers simply
    /// keep seeing the previous snapshot that cycle.
    pub fn attach_feed(self: &Arc<Self>, feed: &JointFeed) -> tokio::task::JoinHandle<()> {
        let mut receiver = feed.subscribe();
        let service = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                match service.ingest(&event.samples) {
                    Ok(generation) => trace!(generation, "absorbed joint state"),
                    Err(err) => {
                        warn!(%err, "rejected telemetry update; previous snapshot retained");
                    }
                }
            }
            debug!("joint feed closed; absorber exiting");
        })
    }

    /// Apply one sample set directly. Used by the absorber and by
    /// synchronous producers in tests.
    ///
    /// # Errors
    ///
    /// [`StateError::MalformedSample`] when the set does not cover exactly
    /// the declared joint set; the previous snapshot is retained.
    pub fn ingest(&self, samples: &[JointSample]) -> Result<u64, StateError> {
        self.cache.update(samples)
    }

    // ------------------------------------------------------------------
    // Joint-state queries
    // ------------------------------------------------------------------

    /// The complete current snapshot.
    pub fn joint_state(&self) -> Result<Arc<Snapshot>, StateError> {
        self.cache.read()
    }

    /// The canonical ordered joint-name list.
    pub fn joint_names(&self) -> &[String] {
        self.cache.joint_names()
    }

    /// One scalar of one joint. All single-value queries go through here so
    /// that name validation happens in exactly one place.
    pub fn joint_value(&self, name: &str, field: JointField) -> Result<f64, StateError> {
        self.cache.value(name, field)
    }

    pub fn joint_position(&self, name: &str) -> Result<f64, StateError> {
        self.joint_value(name, JointField::Position)
    }

    pub fn joint_velocity(&self, name: &str) -> Result<f64, StateError> {
        self.joint_value(name, JointField::Velocity)
    }

    pub fn joint_effort(&self, name: &str) -> Result<f64, StateError> {
        self.joint_value(name, JointField::Effort)
    }

    /// One scalar for each of `names`, in the caller's order.
    ///
    /// Fails as a whole: one unknown name or an empty cache yields an error
    /// and no vector, never a partially filled one.
    pub fn joint_vector(&self, names: &[String], field: JointField) -> Result<Vec<f64>, StateError> {
        let snapshot = self.cache.read()?;
        names
            .iter()
            .map(|name| snapshot.value(name, field))
            .collect()
    }

    pub fn joint_positions(&self, names: &[String]) -> Result<Vec<f64>, StateError> {
        self.joint_vector(names, JointField::Position)
    }

    pub fn joint_velocities(&self, names: &[String]) -> Result<Vec<f64>, StateError> {
        self.joint_vector(names, JointField::Velocity)
    }

    pub fn joint_efforts(&self, names: &[String]) -> Result<Vec<f64>, StateError> {
        self.joint_vector(names, JointField::Effort)
    }

    /// One scalar for each member of a description joint group, in group
    /// order. Shares the whole-or-fail path of [`joint_vector`][Self::joint_vector].
    pub fn group_vector(&self, group: &str, field: JointField) -> Result<Vec<f64>, StateError> {
        self.joint_vector(self.description.group(group)?, field)
    }

    pub fn group_positions(&self, group: &str) -> Result<Vec<f64>, StateError> {
        self.group_vector(group, JointField::Position)
    }

    pub fn group_velocities(&self, group: &str) -> Result<Vec<f64>, StateError> {
        self.group_vector(group, JointField::Velocity)
    }

    pub fn group_efforts(&self, group: &str) -> Result<Vec<f64>, StateError> {
        self.group_vector(group, JointField::Effort)
    }

    // ------------------------------------------------------------------
    // Frame geometry (owned entirely by the transform graph; the joint
    // cache is never consulted here)
    // ------------------------------------------------------------------

    /// Current pose of `child_frame` as seen from `base_frame`.
    pub fn current_pose(&self, child_frame: &str, base_frame: &str) -> Result<Pose, StateError> {
        self.resolver.frame_pose(child_frame, base_frame)
    }

    /// Current pose of `child_frame` in the world frame.
    pub fn current_pose_in_world(&self, child_frame: &str) -> Result<Pose, StateError> {
        self.current_pose(child_frame, &self.description.frames().world)
    }

    pub fn transform_point(&self, point: Vec3, from: &str, to: &str) -> Result<Vec3, StateError> {
        self.resolver.convert_point(point, from, to)
    }

    pub fn transform_vector(&self, vector: Vec3, from: &str, to: &str) -> Result<Vec3, StateError> {
        self.resolver.convert_vector(vector, from, to)
    }

    pub fn transform_quaternion(
        &self,
        orientation: Quaternion,
        from: &str,
        to: &str,
    ) -> Result<Quaternion, StateError> {
        self.resolver.convert_quaternion(orientation, from, to)
    }

    pub fn transform_pose(&self, pose: Pose, from: &str, to: &str) -> Result<Pose, StateError> {
        self.resolver.convert_pose(pose, from, to)
    }

    // ------------------------------------------------------------------
    // Derived predicates
    // ------------------------------------------------------------------

    /// Whether the gripper on `side` currently matches its "closed"
    /// reference posture, every grasp joint within the configured tolerance.
    ///
    /// Unavailable telemetry reports `false`: a controller must never be
    /// told a hand is closed on the strength of zero data. Callers that need
    /// to distinguish "open" from "unknown" check [`joint_state`][Self::joint_state]
    /// first.
    pub fn is_grasped(&self, side: RobotSide) -> bool {
        let reference = self.description.grasp(side);
        let snapshot = match self.cache.read() {
            Ok(snapshot) => snapshot,
            Err(_) => {
                debug!(%side, "grasp query before any telemetry; reporting not grasped");
                return false;
            }
        };
        reference
            .joints
            .iter()
            .zip(&reference.closed)
            .all(|(joint, closed)| {
                match snapshot.value(joint, JointField::Position) {
                    Ok(position) => (position - closed).abs() <= reference.tolerance,
                    Err(err) => {
                        debug!(%side, joint, %err, "grasp joint unavailable; reporting not grasped");
                        false
                    }
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proprio_feed::ScriptedSource;
    use proprio_tf::{StaticFrameGraph, Transform3D};
    use std::time::Duration;

    fn description() -> Arc<RobotDescription> {
        Arc::new(RobotDescription::default_humanoid())
    }

    fn empty_graph() -> Arc<StaticFrameGraph> {
        Arc::new(StaticFrameGraph::new())
    }

    /// A service with no frames and no feed; tests drive `ingest` directly.
    fn service() -> Arc<StateService> {
        StateService::new(description(), empty_graph())
    }

    fn full_set(service: &StateService, value: f64) -> Vec<JointSample> {
        service
            .joint_names()
            .iter()
            .map(|name| JointSample::new(name.clone(), value, 0.0, 0.0))
            .collect()
    }

    /// A sample set with the given side's grasp joints pinned to the chosen
    /// reference vector and every other joint at zero.
    fn set_with_grasp(service: &StateService, side: RobotSide, closed: bool) -> Vec<JointSample> {
        let reference = service.description().grasp(side).clone();
        let vector = if closed { &reference.closed } else { &reference.open };
        service
            .joint_names()
            .iter()
            .map(|name| {
                let position = reference
                    .joints
                    .iter()
                    .position(|j| j == name)
                    .map_or(0.0, |i| vector[i]);
                JointSample::new(name.clone(), position, 0.0, 0.0)
            })
            .collect()
    }

    #[test]
    fn queries_before_any_telemetry_are_empty_cache() {
        let service = service();
        assert_eq!(
            service.joint_position("l_arm_shz").err(),
            Some(StateError::EmptyCache)
        );
        assert_eq!(service.joint_state().err(), Some(StateError::EmptyCache));
        let names = service.joint_names().to_vec();
        assert_eq!(
            service.joint_positions(&names).err(),
            Some(StateError::EmptyCache)
        );
    }

    #[test]
    fn ingest_then_query_every_field() {
        let service = service();
        let samples: Vec<JointSample> = service
            .joint_names()
            .iter()
            .enumerate()
            .map(|(i, name)| JointSample::new(name.clone(), i as f64, i as f64 + 0.5, -(i as f64)))
            .collect();
        service.ingest(&samples).unwrap();

        for (i, name) in service.joint_names().iter().enumerate() {
            assert_eq!(service.joint_position(name), Ok(i as f64));
            assert_eq!(service.joint_velocity(name), Ok(i as f64 + 0.5));
            assert_eq!(service.joint_effort(name), Ok(-(i as f64)));
        }
    }

    #[test]
    fn unknown_joint_in_any_cache_state() {
        let service = service();
        assert_eq!(
            service.joint_position("tail_joint").err(),
            Some(StateError::UnknownJoint("tail_joint".to_string()))
        );
        service.ingest(&full_set(&service, 1.0)).unwrap();
        assert_eq!(
            service.joint_position("tail_joint").err(),
            Some(StateError::UnknownJoint("tail_joint".to_string()))
        );
    }

    #[test]
    fn joint_vector_is_whole_or_fail() {
        let service = service();
        service.ingest(&full_set(&service, 2.0)).unwrap();

        let good = vec!["l_arm_shz".to_string(), "r_arm_wrx".to_string()];
        assert_eq!(service.joint_positions(&good), Ok(vec![2.0, 2.0]));

        let tainted = vec!["l_arm_shz".to_string(), "ghost".to_string()];
        assert_eq!(
            service.joint_positions(&tainted).err(),
            Some(StateError::UnknownJoint("ghost".to_string()))
        );
    }

    #[test]
    fn group_vector_follows_group_order() {
        let service = service();
        let samples: Vec<JointSample> = service
            .joint_names()
            .iter()
            .enumerate()
            .map(|(i, name)| JointSample::new(name.clone(), i as f64, 0.0, 0.0))
            .collect();
        service.ingest(&samples).unwrap();

        let group = service.description().group("left_arm").unwrap().to_vec();
        let positions = service.group_positions("left_arm").unwrap();
        assert_eq!(positions.len(), group.len());
        for (name, position) in group.iter().zip(&positions) {
            assert_eq!(service.joint_position(name).unwrap(), *position);
        }

        assert_eq!(
            service.group_positions("tail").err(),
            Some(StateError::UnknownGroup("tail".to_string()))
        );
    }

    #[test]
    fn malformed_ingest_keeps_previous_generation() {
        let service = service();
        service.ingest(&full_set(&service, 1.0)).unwrap();

        let mut partial = full_set(&service, 9.0);
        partial.pop();
        assert!(matches!(
            service.ingest(&partial),
            Err(StateError::MalformedSample { .. })
        ));

        let snap = service.joint_state().unwrap();
        assert_eq!(snap.generation(), 1);
        assert_eq!(service.joint_position("l_arm_shz"), Ok(1.0));
    }

    #[test]
    fn is_grasped_tracks_the_reference_vectors() {
        let service = service();
        for side in [RobotSide::Left, RobotSide::Right] {
            service
                .ingest(&set_with_grasp(&service, side, true))
                .unwrap();
            assert!(service.is_grasped(side), "{side} closed posture");

            service
                .ingest(&set_with_grasp(&service, side, false))
                .unwrap();
            assert!(!service.is_grasped(side), "{side} open posture");
        }
    }

    #[test]
    fn is_grasped_without_telemetry_is_false_not_an_error() {
        let service = service();
        assert!(!service.is_grasped(RobotSide::Left));
        assert!(!service.is_grasped(RobotSide::Right));
    }

    #[test]
    fn is_grasped_respects_tolerance() {
        let service = service();
        let side = RobotSide::Left;
        let tolerance = service.description().grasp(side).tolerance;

        let mut samples = set_with_grasp(&service, side, true);
        let grasp_joint = service.description().grasp(side).joints[0].clone();
        for sample in &mut samples {
            if sample.name == grasp_joint {
                sample.position += tolerance * 2.0;
            }
        }
        service.ingest(&samples).unwrap();
        assert!(!service.is_grasped(side), "one joint out of tolerance");
    }

    #[test]
    fn current_pose_and_conversions_use_the_frame_graph() {
        let graph = StaticFrameGraph::new().with_transform(
            "world",
            "pelvis",
            Transform3D::new(Vec3::new(0.0, 0.0, 1.0), Quaternion::identity()),
        );
        let service = StateService::new(description(), Arc::new(graph));

        let pose = service.current_pose("pelvis", "world").unwrap();
        assert!(pose.position.distance(Vec3::new(0.0, 0.0, 1.0)) < 1e-9);
        // current_pose_in_world resolves against the description's world frame.
        let same = service.current_pose_in_world("pelvis").unwrap();
        assert_eq!(pose, same);

        let p = service
            .transform_point(Vec3::new(1.0, 0.0, 0.0), "pelvis", "world")
            .unwrap();
        assert!(p.distance(Vec3::new(1.0, 0.0, 1.0)) < 1e-9);

        // Geometry failures surface as typed errors, independent of the
        // joint cache's state.
        assert!(matches!(
            service.current_pose("l_palm", "world"),
            Err(StateError::TransformUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn absorber_drains_a_scripted_feed() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let service = service();
        let feed = JointFeed::default();
        let absorber = service.attach_feed(&feed);

        let script = ScriptedSource::new(
            vec![
                full_set(&service, 1.0),
                full_set(&service, 2.0),
                full_set(&service, 3.0),
            ],
            Duration::from_millis(5),
        );
        script.pump(feed.clone()).await.expect("pump");

        // The absorber runs concurrently; wait until the last generation
        // lands (bounded, so a regression fails rather than hangs).
        for _ in 0..100 {
            if service.joint_state().map(|s| s.generation()).ok() == Some(3) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(service.joint_position("neck_ry"), Ok(3.0));

        drop(feed);
        absorber.await.expect("absorber exits when the feed closes");
    }

    #[tokio::test]
    async fn absorber_skips_malformed_events_and_continues() {
        let service = service();
        let feed = JointFeed::default();
        let absorber = service.attach_feed(&feed);

        let mut partial = full_set(&service, 5.0);
        partial.truncate(3);
        let script = ScriptedSource::immediate(vec![
            full_set(&service, 1.0),
            partial,
            full_set(&service, 2.0),
        ]);
        script.pump(feed.clone()).await.expect("pump");

        for _ in 0..100 {
            if service.joint_state().map(|s| s.generation()).ok() == Some(2) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        // Two accepted generations; the malformed one left no trace.
        assert_eq!(service.joint_state().unwrap().generation(), 2);
        assert_eq!(service.joint_position("back_bkz"), Ok(2.0));

        drop(feed);
        absorber.await.expect("absorber exit");
    }

    /// Two services bound to two fake feeds hold fully independent state;
    /// nothing about construction is process-global.
    #[test]
    fn two_instances_are_fully_independent() {
        let left = service();
        let right = service();

        left.ingest(&full_set(&left, 1.0)).unwrap();
        right.ingest(&full_set(&right, 7.0)).unwrap();

        assert_eq!(left.joint_position("neck_ry"), Ok(1.0));
        assert_eq!(right.joint_position("neck_ry"), Ok(7.0));
    }
}
