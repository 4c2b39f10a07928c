//! Overlap-based legality check for a part's pose.

use crate::aabb::Aabb;
use crate::index::SpatialIndex;
use nalgebra::Isometry3;
use snapwright_core::graph::PartGraph;
use snapwright_core::id::PartId;

/// Decides whether a part may occupy a pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementValidator {
    /// Inward shrink applied to each collider's bounds so flush faces pass.
    pub epsilon: f64,
}

impl PlacementValidator {
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }

    /// Validate `part` at its current pose.
    pub fn validate(
        &self,
        graph: &PartGraph,
        index: &SpatialIndex,
        part: PartId,
        ignored_roots: &[PartId],
    ) -> bool {
        match graph.part(part) {
            Some(p) => self.validate_at(graph, index, part, &p.pose, ignored_roots),
            None => false,
        }
    }

    /// Validate `part` as if it stood at `pose`.
    ///
    /// Wheel colliders are skipped. A part without solid colliders is only
    /// legal when its type is collider-light.
    pub fn validate_at(
        &self,
        graph: &PartGraph,
        index: &SpatialIndex,
        part: PartId,
        pose: &Isometry3<f64>,
        ignored_roots: &[PartId],
    ) -> bool {
        let Some(p) = graph.part(part) else {
            return false;
        };
        let mut solid = p.solid_colliders().peekable();
        if solid.peek().is_none() {
            return graph.rules().is_collider_light(p.part_type);
        }

        let mut exclude = Vec::with_capacity(ignored_roots.len() + 1);
        exclude.push(part);
        exclude.extend_from_slice(ignored_roots);

        solid.all(|collider| {
            let bounds = Aabb::of_collider(collider, pose).shrunk(self.epsilon);
            !index.overlaps_solid(&bounds, &exclude)
        })
    }
}

impl Default for PlacementValidator {
    fn default() -> Self {
        Self::new(0.01)
    }
}
