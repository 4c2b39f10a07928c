//! Reflection of poses across a mirror plane for symmetric building.

use nalgebra::{Isometry3, Point3, Translation3, Unit, UnitQuaternion, Vector3};

/// A plane given by a point and a unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MirrorPlane {
    pub point: Point3<f64>,
    pub normal: Unit<Vector3<f64>>,
}

impl MirrorPlane {
    /// `None` when `normal` has zero length.
    pub fn new(point: Point3<f64>, normal: Vector3<f64>) -> Option<Self> {
        Some(Self {
            point,
            normal: Unit::try_new(normal, 1.0e-9)?,
        })
    }

    pub fn signed_distance(&self, p: &Point3<f64>) -> f64 {
        (p - self.point).dot(&self.normal)
    }

    /// `p - 2((p - point) . n) n`
    pub fn reflect_point(&self, p: &Point3<f64>) -> Point3<f64> {
        p - self.normal.into_inner() * (2.0 * self.signed_distance(p))
    }

    pub fn reflect_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        v - self.normal.into_inner() * (2.0 * v.dot(&self.normal))
    }

    /// Reflect a pose. The forward (+Z) and up (+Y) axes are reflected and
    /// re-orthonormalized into a proper rotation.
    pub fn reflect_pose(&self, pose: &Isometry3<f64>) -> Isometry3<f64> {
        let origin = Point3::from(pose.translation.vector);
        let position = self.reflect_point(&origin);
        let forward = self.reflect_vector(&(pose.rotation * Vector3::z()));
        let up = self.reflect_vector(&(pose.rotation * Vector3::y()));
        let rotation = UnitQuaternion::face_towards(&forward, &up);
        Isometry3::from_parts(Translation3::from(position.coords), rotation)
    }

    /// Mirrored pose, or `None` when the source lies within `dead_zone` of
    /// the plane.
    pub fn mirrored(&self, pose: &Isometry3<f64>, dead_zone: f64) -> Option<Isometry3<f64>> {
        let origin = Point3::from(pose.translation.vector);
        if self.signed_distance(&origin).abs() < dead_zone {
            return None;
        }
        Some(self.reflect_pose(pose))
    }
}
