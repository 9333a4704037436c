//! The joint-state cache: one producer, many readers, zero torn reads.
//!
//! A [`StateCache`] holds the latest complete [`Snapshot`] behind a single
//! `Arc` handle. Updates build the replacement snapshot entirely off the
//! critical section and then swap the handle under a write lock held for the
//! swap alone; readers clone the handle under a read lock and work with the
//! immutable snapshot afterwards. Any one read therefore observes exactly one
//! generation, no matter how the producer races it.
//!
//! An update that does not cover exactly the declared joint set is rejected
//! as a whole and the previous snapshot stays published: availability over
//! freshness.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use proprio_types::{JointField, JointSample, Snapshot, StateError};

/// Shared cache of the robot's latest joint state.
pub struct StateCache {
    /// Declared joint set, in canonical order.
    joints: Vec<String>,
    /// Same set, for O(1) membership checks.
    joint_set: HashSet<String>,
    /// The only mutable shared state: the handle to the current snapshot.
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl StateCache {
    /// Create an empty cache bound to the declared joint set.
    pub fn new(joint_names: &[String]) -> Self {
        Self {
            joints: joint_names.to_vec(),
            joint_set: joint_names.iter().cloned().collect(),
            current: RwLock::new(None),
        }
    }

    /// The declared joint set, in canonical order.
    pub fn joint_names(&self) -> &[String] {
        &self.joints
    }

    /// Absorb one telemetry update as one atomic generation.
    ///
    /// Validation and snapshot assembly happen before the lock is taken; the
    /// write lock covers only the generation assignment and the handle swap.
    /// Returns the new generation id.
    ///
    /// # Errors
    ///
    /// [`StateError::MalformedSample`] when `samples` misses a declared
    /// joint, names an undeclared one, or repeats a name. The previously
    /// published snapshot is untouched in every rejection case.
    pub fn update(&self, samples: &[JointSample]) -> Result<u64, StateError> {
        let expected = self.joints.len();
        let mut map: HashMap<String, JointSample> = HashMap::with_capacity(samples.len());
        for sample in samples {
            if !self.joint_set.contains(&sample.name) {
                return Err(StateError::MalformedSample {
                    expected,
                    details: format!("undeclared joint '{}'", sample.name),
                });
            }
            if map.insert(sample.name.clone(), sample.clone()).is_some() {
                return Err(StateError::MalformedSample {
                    expected,
                    details: format!("duplicate joint '{}'", sample.name),
                });
            }
        }
        if map.len() != expected {
            // Every sample was declared and unique, so something is missing.
            let missing: Vec<&str> = self
                .joints
                .iter()
                .filter(|j| !map.contains_key(*j))
                .map(|j| j.as_str())
                .collect();
            return Err(StateError::MalformedSample {
                expected,
                details: format!("missing joints: {}", missing.join(", ")),
            });
        }

        let stamp = Utc::now();
        let mut current = self.current.write();
        let generation = current.as_ref().map_or(0, |s| s.generation()) + 1;
        *current = Some(Arc::new(Snapshot::new(generation, stamp, map)));
        Ok(generation)
    }

    /// A handle to the current snapshot.
    ///
    /// The read lock covers the handle clone only; iterating the returned
    /// snapshot is lock-free and always within one generation.
    ///
    /// # Errors
    ///
    /// [`StateError::EmptyCache`] before the first accepted update.
    pub fn read(&self) -> Result<Arc<Snapshot>, StateError> {
        self.current.read().clone().ok_or(StateError::EmptyCache)
    }

    /// One scalar of one joint from the current snapshot.
    ///
    /// # Errors
    ///
    /// [`StateError::UnknownJoint`] for a name outside the declared set, in
    /// every cache state; [`StateError::EmptyCache`] for a declared name
    /// before the first update.
    pub fn value(&self, name: &str, field: JointField) -> Result<f64, StateError> {
        if !self.joint_set.contains(name) {
            return Err(StateError::UnknownJoint(name.to_string()));
        }
        self.read()?.value(name, field)
    }

    /// Generation of the current snapshot, if any. Mostly for tests and
    /// staleness probes.
    pub fn generation(&self) -> Option<u64> {
        self.current.read().as_ref().map(|s| s.generation())
    }
}
