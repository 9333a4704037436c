//! `proprio-state` – the state-and-transform core of the supervisory layer.
//!
//! One absorber task continuously publishes immutable joint-state snapshots;
//! an unbounded number of controller, GUI, and perception threads read them
//! and resolve geometry between named frames. Readers always observe exactly
//! one snapshot generation, and every failure mode is a typed
//! [`StateError`][proprio_types::StateError] rather than a default value.
//!
//! # Modules
//!
//! - [`cache`] – [`StateCache`]: the immutable-snapshot / atomic-handle-swap
//!   store; the only mutable shared structure in the core.
//! - [`service`] – [`StateService`]: the query façade composing the cache
//!   with a [`TransformResolver`][proprio_tf::TransformResolver]; derives
//!   grasp state from raw joint data.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use proprio_description::RobotDescription;
//! use proprio_state::StateService;
//! use proprio_tf::StaticFrameGraph;
//! use proprio_types::JointSample;
//!
//! let description = Arc::new(RobotDescription::default_humanoid());
//! let service = StateService::new(description, Arc::new(StaticFrameGraph::new()));
//!
//! let samples: Vec<JointSample> = service
//!     .joint_names()
//!     .iter()
//!     .map(|name| JointSample::new(name.clone(), 0.5, 0.0, 0.0))
//!     .collect();
//! service.ingest(&samples).unwrap();
//!
//! assert_eq!(service.joint_position("l_arm_shz"), Ok(0.5));
//! ```

pub mod cache;
pub mod service;

pub use cache::StateCache;
pub use service::StateService;
