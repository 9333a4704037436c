//! `proprio-tf` – spatial geometry between named reference frames.
//!
//! Resolves "where is frame B relative to frame A, right now" and converts
//! geometric primitives between frames. The actual transform data comes from
//! an external broadcaster; this crate buffers it and answers queries with a
//! bounded wait, never an unchecked identity fallback.
//!
//! # Modules
//!
//! - [`geometry`] – [`Vec3`], [`Quaternion`], [`Transform3D`], [`Pose`]:
//!   rigid-body math, all `f64`.
//! - [`graph`] – [`TransformSource`]: the capability seam; implemented by
//!   [`FrameGraphBuffer`] (live, condvar-notified, bounded wait) and
//!   [`StaticFrameGraph`] (deterministic test fake).
//! - [`resolver`] – [`TransformResolver`]: frame-to-frame pose resolution and
//!   point/vector/quaternion/pose conversion over any [`TransformSource`].

pub mod geometry;
pub mod graph;
pub mod resolver;

pub use geometry::{Pose, Quaternion, Transform3D, Vec3};
pub use graph::{FrameGraphBuffer, StaticFrameGraph, TransformSource};
pub use resolver::TransformResolver;
