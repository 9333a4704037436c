//! Rigid-body geometry primitives.
//!
//! All math is `f64`; rotations are unit quaternions in (w, x, y, z)
//! convention. A [`Transform3D`] is read as a coordinate map: applying the
//! transform registered for "A into B" to coordinates expressed in frame A
//! yields the same physical point expressed in frame B.

// ────────────────────────────────────────────────────────────────────────────
// Vec3
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D translation vector / point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }

    /// Euclidean distance to `rhs`. Used by tests to express tolerances.
    pub fn distance(self, rhs: Self) -> f64 {
        let dx = self.x - rhs.x;
        let dy = self.y - rhs.y;
        let dz = self.z - rhs.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Quaternion
// ────────────────────────────────────────────────────────────────────────────

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    /// The caller is responsible for providing a unit quaternion (|q| = 1).
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `angle_rad` around the (normalized) `axis`.
    pub fn from_axis_angle(axis: Vec3, angle_rad: f64) -> Self {
        let half = angle_rad * 0.5;
        let s = half.sin();
        Self::new(half.cos(), axis.x * s, axis.y * s, axis.z * s)
    }

    /// Hamilton product: compose two rotations (`self` after `rhs`).
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rotate a vector: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(p).mul(self.conjugate());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }

    /// Angular distance to `rhs` in radians. Robust against the q/-q double
    /// cover.
    pub fn angle_to(self, rhs: Self) -> f64 {
        let dot = (self.w * rhs.w + self.x * rhs.x + self.y * rhs.y + self.z * rhs.z).abs();
        2.0 * dot.clamp(-1.0, 1.0).acos()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Transform3D
// ────────────────────────────────────────────────────────────────────────────

/// A rigid-body coordinate map: rotation followed by translation.
///
/// If `t` maps frame-A coordinates into frame B, then for a point `p`
/// expressed in A, `t.apply_point(p)` is the same physical point expressed
/// in B. Equivalently, `t` is the pose of frame A as seen from frame B.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform3D {
    pub translation: Vec3,
    pub rotation: Quaternion,
}

impl Transform3D {
    pub fn new(translation: Vec3, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// The identity map.
    pub fn identity() -> Self {
        Self::new(Vec3::zero(), Quaternion::identity())
    }

    /// Compose two maps: the result applies `other` first, then `self`.
    ///
    /// If `other` maps A into B and `self` maps B into C, the result maps A
    /// into C.
    pub fn compose(self, other: Self) -> Self {
        Self::new(
            self.translation.add(self.rotation.rotate(other.translation)),
            self.rotation.mul(other.rotation),
        )
    }

    /// The inverse map: `t.compose(t.inverse())` is the identity (up to
    /// floating-point error).
    pub fn inverse(self) -> Self {
        let rotation = self.rotation.conjugate();
        Self::new(rotation.rotate(self.translation.neg()), rotation)
    }

    /// Map a point (rotation + translation).
    pub fn apply_point(self, p: Vec3) -> Vec3 {
        self.rotation.rotate(p).add(self.translation)
    }

    /// Map a free vector (rotation only; directions have no origin).
    pub fn apply_vector(self, v: Vec3) -> Vec3 {
        self.rotation.rotate(v)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pose
// ────────────────────────────────────────────────────────────────────────────

/// Position + orientation expressed in some caller-named frame.
///
/// Produced by the resolver, never cached: frame geometry is owned by the
/// transform graph, and a stored pose would silently go stale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quaternion,
}

impl Pose {
    pub fn new(position: Vec3, orientation: Quaternion) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// The pose at the frame origin with no rotation.
    pub fn origin() -> Self {
        Self::new(Vec3::zero(), Quaternion::identity())
    }

    /// Reinterpret as the coordinate map "posed frame into observing frame".
    pub fn to_transform(self) -> Transform3D {
        Transform3D::new(self.position, self.orientation)
    }
}

impl From<Transform3D> for Pose {
    fn from(t: Transform3D) -> Self {
        Self::new(t.translation, t.rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    const EPS: f64 = 1e-12;

    fn assert_vec_eq(a: Vec3, b: Vec3) {
        assert!(a.distance(b) < 1e-9, "expected {b:?}, got {a:?}");
    }

    #[test]
    fn identity_rotation_is_noop() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_vec_eq(Quaternion::identity().rotate(v), v);
    }

    #[test]
    fn yaw_90_rotates_x_to_y() {
        let q = Quaternion::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), FRAC_PI_2);
        let r = q.rotate(Vec3::new(1.0, 0.0, 0.0));
        assert_vec_eq(r, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn conjugate_is_inverse() {
        let q = Quaternion::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), 0.7);
        let prod = q.mul(q.conjugate());
        assert!((prod.w - 1.0).abs() < EPS);
        assert!(prod.x.abs() < EPS && prod.y.abs() < EPS && prod.z.abs() < EPS);
    }

    #[test]
    fn angle_to_handles_double_cover() {
        let q = Quaternion::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), PI / 3.0);
        let negated = Quaternion::new(-q.w, -q.x, -q.y, -q.z);
        assert!(q.angle_to(negated) < 1e-9);
    }

    #[test]
    fn compose_pure_translations_add() {
        let t1 = Transform3D::new(Vec3::new(1.0, 0.0, 0.0), Quaternion::identity());
        let t2 = Transform3D::new(Vec3::new(2.0, 0.0, 0.0), Quaternion::identity());
        assert_vec_eq(t1.compose(t2).translation, Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn compose_applies_rightmost_first() {
        // self rotates 90 deg around z; other translates +1 x.
        let rot = Transform3D::new(
            Vec3::zero(),
            Quaternion::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), FRAC_PI_2),
        );
        let shift = Transform3D::new(Vec3::new(1.0, 0.0, 0.0), Quaternion::identity());

        // Point at the origin: shift first puts it at (1,0,0), then the
        // rotation carries it to (0,1,0).
        let p = rot.compose(shift).apply_point(Vec3::zero());
        assert_vec_eq(p, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn inverse_undoes_the_map() {
        let t = Transform3D::new(
            Vec3::new(0.3, -1.2, 2.5),
            Quaternion::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), 1.1),
        );
        let round = t.inverse().compose(t);
        assert_vec_eq(round.translation, Vec3::zero());
        assert!(round.rotation.angle_to(Quaternion::identity()) < 1e-9);

        let p = Vec3::new(4.0, 5.0, 6.0);
        assert_vec_eq(t.inverse().apply_point(t.apply_point(p)), p);
    }

    #[test]
    fn apply_vector_ignores_translation() {
        let t = Transform3D::new(Vec3::new(100.0, 100.0, 100.0), Quaternion::identity());
        assert_vec_eq(t.apply_vector(Vec3::new(1.0, 0.0, 0.0)), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn pose_transform_roundtrip() {
        let pose = Pose::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quaternion::from_axis_angle(Vec3::new(1.0, 0.0, 0.0), 0.4),
        );
        assert_eq!(Pose::from(pose.to_transform()), pose);
    }
}
