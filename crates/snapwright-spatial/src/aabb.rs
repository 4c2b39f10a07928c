//! Axis-aligned bounding boxes for collider overlap and proximity queries.

use nalgebra::{Isometry3, Point3, Vector3};
use snapwright_core::part::{Collider, ColliderShape};

/// An axis-aligned bounding box in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    /// Creates a new AABB from two corners in any order.
    #[must_use]
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    #[must_use]
    pub fn from_center(center: Point3<f64>, half_extents: Vector3<f64>) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// World-space bounds of a collider attached to a part at `pose`.
    ///
    /// Oriented shapes are bounded by projecting their local half extents
    /// through the absolute rotation matrix.
    #[must_use]
    pub fn of_collider(collider: &Collider, pose: &Isometry3<f64>) -> Self {
        let world = pose * collider.offset;
        let center = Point3::from(world.translation.vector);
        let local_half = match collider.shape {
            ColliderShape::Box { half_extents } => half_extents.abs(),
            ColliderShape::Sphere { radius } => {
                return Self::from_center(center, Vector3::repeat(radius.abs()));
            }
            ColliderShape::Wheel { radius, width } => {
                Vector3::new(width.abs() * 0.5, radius.abs(), radius.abs())
            }
        };
        let rot = world.rotation.to_rotation_matrix();
        let half = rot.matrix().abs() * local_half;
        Self::from_center(center, half)
    }

    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Whether the boxes intersect. Touching boxes count as intersecting.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Shrink every face inward by `margin`. An axis thinner than
    /// `2 * margin` collapses to its midpoint.
    #[must_use]
    pub fn shrunk(&self, margin: f64) -> Self {
        let c = self.center();
        let shrink = |lo: f64, hi: f64, mid: f64| {
            if hi - lo <= 2.0 * margin {
                (mid, mid)
            } else {
                (lo + margin, hi - margin)
            }
        };
        let (x0, x1) = shrink(self.min.x, self.max.x, c.x);
        let (y0, y1) = shrink(self.min.y, self.max.y, c.y);
        let (z0, z1) = shrink(self.min.z, self.max.z, c.z);
        Self {
            min: Point3::new(x0, y0, z0),
            max: Point3::new(x1, y1, z1),
        }
    }

    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        let m = Vector3::repeat(margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    /// Euclidean distance from the box to a point; zero inside.
    #[must_use]
    pub fn distance_to_point(&self, point: &Point3<f64>) -> f64 {
        let dx = (self.min.x - point.x).max(0.0).max(point.x - self.max.x);
        let dy = (self.min.y - point.y).max(0.0).max(point.y - self.max.y);
        let dz = (self.min.z - point.z).max(0.0).max(point.z - self.max.z);
        Vector3::new(dx, dy, dz).norm()
    }
}
