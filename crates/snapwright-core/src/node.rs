//! Connection nodes: typed, directional attachment points on a part.
//!
//! Nodes live in the part graph's arena and refer to their owner and their
//! partner by key. The symmetric connect/disconnect primitives live on
//! [`PartGraph`](crate::graph::PartGraph) because they touch two nodes at once;
//! this module holds the per-node state and the pure geometric predicates.

use crate::id::{NodeId, PartId};
use nalgebra::{Isometry3, Point3, Unit, Vector3};
use serde::{Deserialize, Serialize};

/// Kind of a connection node. `Generic` is a wildcard on either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Generic,
    Structural,
    Axle,
    Mount,
    Hitch,
}

impl NodeKind {
    /// Whether a node of this kind satisfies a requirement of `required`.
    pub fn satisfies(self, required: NodeKind) -> bool {
        self == NodeKind::Generic || required == NodeKind::Generic || self == required
    }
}

/// Errors from per-node operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    #[error("node already belongs to part {0:?}")]
    AlreadyOwned(PartId),
}

/// Prefab-level description of a node, in the part's local frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: NodeKind,
    /// Kind this node accepts on the other side.
    #[serde(default = "default_compatible")]
    pub compatible: NodeKind,
    pub position: Point3<f64>,
    /// Outward direction; normalized on spawn.
    pub direction: Vector3<f64>,
}

fn default_compatible() -> NodeKind {
    NodeKind::Generic
}

/// A live attachment point owned by exactly one part.
#[derive(Debug, Clone)]
pub struct ConnectionNode {
    owner: Option<PartId>,
    index: u16,
    pub kind: NodeKind,
    pub compatible: NodeKind,
    pub local_position: Point3<f64>,
    pub local_direction: Unit<Vector3<f64>>,
    occupied: bool,
    connected_to: Option<NodeId>,
}

impl ConnectionNode {
    /// Build an unowned, unoccupied node from its spec.
    ///
    /// A zero-length direction falls back to +Y so the node stays usable.
    pub fn from_spec(spec: &NodeSpec, index: u16) -> Self {
        let local_direction =
            Unit::try_new(spec.direction, 1.0e-9).unwrap_or_else(Vector3::y_axis);
        Self {
            owner: None,
            index,
            kind: spec.kind,
            compatible: spec.compatible,
            local_position: spec.position,
            local_direction,
            occupied: false,
            connected_to: None,
        }
    }

    /// Assign the owning part. Only the first assignment sticks; assigning
    /// the same owner again is a no-op.
    pub fn assign_owner(&mut self, owner: PartId) -> Result<(), NodeError> {
        match self.owner {
            None => {
                self.owner = Some(owner);
                Ok(())
            }
            Some(current) if current == owner => Ok(()),
            Some(current) => Err(NodeError::AlreadyOwned(current)),
        }
    }

    pub fn owner(&self) -> Option<PartId> {
        self.owner
    }

    /// Position of this node in its owner's node list.
    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn is_occupied(&self) -> bool {
        self.occupied
    }

    pub fn connected_to(&self) -> Option<NodeId> {
        self.connected_to
    }

    pub(crate) fn link(&mut self, partner: NodeId) {
        self.occupied = true;
        self.connected_to = Some(partner);
    }

    pub(crate) fn unlink(&mut self) {
        self.occupied = false;
        self.connected_to = None;
    }

    /// World-space position given the owner's pose.
    pub fn world_position(&self, pose: &Isometry3<f64>) -> Point3<f64> {
        pose * self.local_position
    }

    /// World-space outward direction given the owner's pose.
    pub fn world_direction(&self, pose: &Isometry3<f64>) -> Unit<Vector3<f64>> {
        Unit::new_unchecked(pose.rotation * self.local_direction.into_inner())
    }

    /// Kind compatibility in both directions.
    pub fn kinds_compatible(&self, other: &ConnectionNode) -> bool {
        self.kind.satisfies(other.compatible) && other.kind.satisfies(self.compatible)
    }
}

/// Whether two world-space outward directions are opposed enough to connect.
pub fn facing_opposed(a: &Vector3<f64>, b: &Vector3<f64>, threshold: f64) -> bool {
    a.dot(b) < threshold
}

/// Whether a world-space outward direction agrees with a surface normal.
pub fn matches_surface_normal(direction: &Vector3<f64>, normal: &Vector3<f64>, threshold: f64) -> bool {
    let Some(normal) = normal.try_normalize(1.0e-9) else {
        return false;
    };
    direction.dot(&normal) > threshold
}
