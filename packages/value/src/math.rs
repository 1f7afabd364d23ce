//! Minimal vector and quaternion math for scene transforms.

use serde::{Deserialize, Serialize};

const EPSILON: f64 = 1e-9;

/// A 3-component vector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3(pub [f64; 3]);

impl Vec3 {
    pub const ZERO: Vec3 = Vec3([0.0, 0.0, 0.0]);
    pub const ONE: Vec3 = Vec3([1.0, 1.0, 1.0]);
    pub const X: Vec3 = Vec3([1.0, 0.0, 0.0]);
    pub const Y: Vec3 = Vec3([0.0, 1.0, 0.0]);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Vec3([x, y, z])
    }

    /// A vector with all three components set to `n`.
    pub const fn splat(n: f64) -> Self {
        Vec3([n, n, n])
    }

    pub fn len(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction, or `None` for a zero-length vector.
    pub fn normalized(&self) -> Option<Vec3> {
        let len = self.len();
        if len < EPSILON || !len.is_finite() {
            return None;
        }
        let [x, y, z] = self.0;
        Some(Vec3([x / len, y / len, z / len]))
    }

    pub fn dot(&self, b: &Vec3) -> f64 {
        let [x, y, z] = self.0;
        x * b.0[0] + y * b.0[1] + z * b.0[2]
    }

    pub fn cross(&self, b: &Vec3) -> Vec3 {
        let [ax, ay, az] = self.0;
        let [bx, by, bz] = b.0;
        Vec3([ay * bz - az * by, az * bx - ax * bz, ax * by - ay * bx])
    }

    pub fn scale(&self, s: f64) -> Vec3 {
        let [x, y, z] = self.0;
        Vec3([x * s, y * s, z * s])
    }
}

/// A rotation quaternion stored as `[x, y, z, w]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quat(pub [f64; 4]);

impl Default for Quat {
    fn default() -> Self {
        Quat::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Quat = Quat([0.0, 0.0, 0.0, 1.0]);

    /// Rotation of `angle` radians about `axis`.
    ///
    /// A zero-length axis has no direction and yields the identity.
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Quat {
        let Some(axis) = axis.normalized() else {
            return Quat::IDENTITY;
        };
        let half = angle / 2.0;
        let [x, y, z] = axis.scale(half.sin()).0;
        Quat([x, y, z, half.cos()])
    }

    /// Shortest rotation taking direction `from` onto direction `to`.
    ///
    /// Opposite directions have no unique shortest arc; the result is then a
    /// half turn about an axis orthogonal to `from` (`from × X`, or `from × Y`
    /// when `from` lies along X). Zero-length inputs yield the identity.
    pub fn from_to(from: Vec3, to: Vec3) -> Quat {
        let (Some(from), Some(to)) = (from.normalized(), to.normalized()) else {
            return Quat::IDENTITY;
        };

        let cross = from.cross(&to);
        let [x, y, z] = cross.0;
        let q = Quat([x, y, z, 1.0 + from.dot(&to)]);
        if let Some(q) = q.normalized() {
            return q;
        }

        let axis = from
            .cross(&Vec3::X)
            .normalized()
            .or_else(|| from.cross(&Vec3::Y).normalized())
            .unwrap_or(Vec3::Y);
        let [x, y, z] = axis.0;
        Quat([x, y, z, 0.0])
    }

    pub fn norm(&self) -> f64 {
        self.0.iter().map(|c| c * c).sum::<f64>().sqrt()
    }

    /// Unit quaternion, or `None` when the norm is too small to divide by.
    pub fn normalized(&self) -> Option<Quat> {
        let norm = self.norm();
        if norm < 1e-6 || !norm.is_finite() {
            return None;
        }
        let [x, y, z, w] = self.0;
        Some(Quat([x / norm, y / norm, z / norm, w / norm]))
    }

    /// Component-wise comparison within `tolerance`.
    pub fn approx_eq(&self, other: &Quat, tolerance: f64) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn rotate(q: &Quat, v: Vec3) -> Vec3 {
        let [x, y, z, w] = q.0;
        let u = Vec3([x, y, z]);
        let t = u.cross(&v).scale(2.0);
        let [vx, vy, vz] = v.0;
        let [tx, ty, tz] = t.0;
        let [cx, cy, cz] = u.cross(&t).0;
        Vec3([vx + w * tx + cx, vy + w * ty + cy, vz + w * tz + cz])
    }

    fn vec_close(a: Vec3, b: Vec3) -> bool {
        a.0.iter().zip(b.0.iter()).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn axis_angle_half_turn_about_z() {
        let q = Quat::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), PI);
        assert!(q.approx_eq(&Quat([0.0, 0.0, 1.0, 0.0]), 1e-12));
    }

    #[test]
    fn axis_angle_normalizes_axis() {
        let q = Quat::from_axis_angle(Vec3::new(0.0, 5.0, 0.0), PI / 2.0);
        let s = (PI / 4.0).sin();
        assert!(q.approx_eq(&Quat([0.0, s, 0.0, (PI / 4.0).cos()]), 1e-12));
    }

    #[test]
    fn zero_axis_is_identity() {
        assert_eq!(Quat::from_axis_angle(Vec3::ZERO, 1.0), Quat::IDENTITY);
    }

    #[test]
    fn from_to_maps_from_onto_to() {
        let from = Vec3::new(1.0, 0.0, 0.0);
        let to = Vec3::new(0.0, 1.0, 0.0);
        let q = Quat::from_to(from, to);
        assert!((q.norm() - 1.0).abs() < 1e-12);
        assert!(vec_close(rotate(&q, from), to));
    }

    #[test]
    fn from_to_same_direction_is_identity() {
        let v = Vec3::new(0.0, 2.0, 0.0);
        assert!(Quat::from_to(v, v).approx_eq(&Quat::IDENTITY, 1e-12));
    }

    #[test]
    fn from_to_opposite_is_stable_half_turn() {
        let from = Vec3::new(0.0, 0.0, 1.0);
        let to = Vec3::new(0.0, 0.0, -1.0);
        let q = Quat::from_to(from, to);

        assert!((q.norm() - 1.0).abs() < 1e-12);
        assert!(q.0[3].abs() < 1e-12);
        assert!(q.0.iter().all(|c| c.is_finite()));
        assert!(vec_close(rotate(&q, from), to));
    }

    #[test]
    fn from_to_opposite_along_x_uses_y_fallback() {
        let from = Vec3::X;
        let to = Vec3::new(-3.0, 0.0, 0.0);
        let q = Quat::from_to(from, to);
        assert!((q.norm() - 1.0).abs() < 1e-12);
        assert!(vec_close(rotate(&q, from), Vec3::new(-1.0, 0.0, 0.0)));
    }

    #[test]
    fn from_to_zero_vector_is_identity() {
        assert_eq!(Quat::from_to(Vec3::ZERO, Vec3::X), Quat::IDENTITY);
    }
}
