//! Collider spatial index with bounded scratch buffers.
//!
//! The index is a flat list of world-space collider bounds, rebuilt from the
//! part graph once per interaction step. Queries write into a caller-owned
//! [`CandidateBuffer`] whose capacity never grows; results past capacity are
//! dropped and the buffer remembers that it saturated.

use crate::aabb::Aabb;
use nalgebra::Point3;
use snapwright_core::graph::PartGraph;
use snapwright_core::id::PartId;

// ---------------------------------------------------------------------------
// CandidateBuffer
// ---------------------------------------------------------------------------

/// Fixed-capacity, deduplicated list of candidate parts.
#[derive(Debug, Clone)]
pub struct CandidateBuffer {
    parts: Vec<PartId>,
    capacity: usize,
    saturated: bool,
}

impl CandidateBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            parts: Vec::with_capacity(capacity),
            capacity,
            saturated: false,
        }
    }

    /// Add a part unless already present. Returns `false` when the part was
    /// dropped because the buffer is full.
    pub fn push(&mut self, part: PartId) -> bool {
        if self.parts.contains(&part) {
            return true;
        }
        if self.parts.len() >= self.capacity {
            self.saturated = true;
            return false;
        }
        self.parts.push(part);
        true
    }

    pub fn clear(&mut self) {
        self.parts.clear();
        self.saturated = false;
    }

    pub fn as_slice(&self) -> &[PartId] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether any candidate was dropped since the last clear.
    pub fn is_saturated(&self) -> bool {
        self.saturated
    }
}

// ---------------------------------------------------------------------------
// SpatialIndex
// ---------------------------------------------------------------------------

/// World-space bounds of one collider of one part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderEntry {
    pub part: PartId,
    pub aabb: Aabb,
    pub wheel: bool,
}

/// Collider bounds of every visible, collidable part.
///
/// Parts being previewed have collision disabled and hidden parts are
/// skipped, so neither can be found by queries.
#[derive(Debug, Default)]
pub struct SpatialIndex {
    entries: Vec<ColliderEntry>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from the current state of `graph`.
    pub fn from_graph(graph: &PartGraph) -> Self {
        let mut index = Self::new();
        index.rebuild(graph);
        index
    }

    /// Recompute every entry, reusing the existing allocation.
    pub fn rebuild(&mut self, graph: &PartGraph) {
        self.entries.clear();
        for (id, part) in graph.parts() {
            if !part.is_visible() || !part.body().collision_enabled {
                continue;
            }
            for collider in &part.colliders {
                self.entries.push(ColliderEntry {
                    part: id,
                    aabb: Aabb::of_collider(collider, &part.pose),
                    wheel: collider.is_wheel(),
                });
            }
        }
    }

    pub fn entries(&self) -> &[ColliderEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collect parts with any collider within `radius` of `point`, in index
    /// order. Returns `false` if the buffer saturated.
    pub fn query_radius(
        &self,
        point: &Point3<f64>,
        radius: f64,
        out: &mut CandidateBuffer,
    ) -> bool {
        out.clear();
        for entry in &self.entries {
            if entry.aabb.distance_to_point(point) <= radius {
                out.push(entry.part);
            }
        }
        !out.is_saturated()
    }

    /// Whether `aabb` intersects any solid collider not owned by an excluded
    /// part. Wheel colliders are never considered solid.
    pub fn overlaps_solid(&self, aabb: &Aabb, exclude: &[PartId]) -> bool {
        self.entries
            .iter()
            .filter(|e| !e.wheel && !exclude.contains(&e.part))
            .any(|e| e.aabb.overlaps(aabb))
    }
}
