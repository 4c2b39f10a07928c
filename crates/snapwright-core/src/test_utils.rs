//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::config::JointParams;
use crate::graph::PartGraph;
use crate::id::{JointHandle, NodeId, PartId};
use crate::node::{NodeKind, NodeSpec};
use crate::part::{Collider, ColliderShape, PartPrefab, PartType};
use crate::physics::JointBackend;
use nalgebra::{Isometry3, Point3, Vector3};

// ===========================================================================
// Poses
// ===========================================================================

pub fn pose_at(x: f64, y: f64, z: f64) -> Isometry3<f64> {
    Isometry3::translation(x, y, z)
}

// ===========================================================================
// Prefabs
// ===========================================================================

/// The six face directions of a unit cube, in node index order:
/// +X, -X, +Y, -Y, +Z, -Z.
pub fn face_directions() -> [Vector3<f64>; 6] {
    [
        Vector3::x(),
        -Vector3::x(),
        Vector3::y(),
        -Vector3::y(),
        Vector3::z(),
        -Vector3::z(),
    ]
}

fn face_nodes(half: f64) -> Vec<NodeSpec> {
    face_directions()
        .into_iter()
        .map(|dir| NodeSpec {
            kind: NodeKind::Generic,
            compatible: NodeKind::Generic,
            position: Point3::from(dir * half),
            direction: dir,
        })
        .collect()
}

fn unit_box() -> Collider {
    Collider {
        shape: ColliderShape::Box {
            half_extents: Vector3::new(0.5, 0.5, 0.5),
        },
        offset: Isometry3::identity(),
    }
}

/// 1x1x1 frame cube with a generic node at the centre of each face.
pub fn cube_prefab(key: &str) -> PartPrefab {
    PartPrefab {
        key: key.to_string(),
        part_type: PartType::Frame,
        mass: 10.0,
        rigid_bodies: 1,
        colliders: vec![unit_box()],
        nodes: face_nodes(0.5),
    }
}

/// 2x1x1 frame beam with two nodes on each long face and one on each end.
///
/// Node order: +X end, -X end, then (+Y, -Y, +Z, -Z) at x = -0.5 followed by
/// the same four at x = +0.5.
pub fn beam_prefab(key: &str) -> PartPrefab {
    let mut nodes = vec![
        NodeSpec {
            kind: NodeKind::Generic,
            compatible: NodeKind::Generic,
            position: Point3::new(1.0, 0.0, 0.0),
            direction: Vector3::x(),
        },
        NodeSpec {
            kind: NodeKind::Generic,
            compatible: NodeKind::Generic,
            position: Point3::new(-1.0, 0.0, 0.0),
            direction: -Vector3::x(),
        },
    ];
    for x in [-0.5, 0.5] {
        for dir in [Vector3::y(), -Vector3::y(), Vector3::z(), -Vector3::z()] {
            nodes.push(NodeSpec {
                kind: NodeKind::Generic,
                compatible: NodeKind::Generic,
                position: Point3::new(x, 0.0, 0.0) + dir * 0.5,
                direction: dir,
            });
        }
    }
    PartPrefab {
        key: key.to_string(),
        part_type: PartType::Frame,
        mass: 20.0,
        rigid_bodies: 1,
        colliders: vec![Collider {
            shape: ColliderShape::Box {
                half_extents: Vector3::new(1.0, 0.5, 0.5),
            },
            offset: Isometry3::identity(),
        }],
        nodes,
    }
}

/// Core block: a cube of type `Core`.
pub fn core_prefab() -> PartPrefab {
    PartPrefab {
        part_type: PartType::Core,
        mass: 50.0,
        ..cube_prefab("core")
    }
}

/// Motor block: a cube of type `Motor`.
pub fn motor_prefab() -> PartPrefab {
    PartPrefab {
        part_type: PartType::Motor,
        mass: 25.0,
        ..cube_prefab("motor")
    }
}

/// Wheel with only a physics-wheel collider and a single axle node
/// pointing along +X.
pub fn wheel_prefab() -> PartPrefab {
    PartPrefab {
        key: "wheel".to_string(),
        part_type: PartType::Wheel,
        mass: 5.0,
        rigid_bodies: 1,
        colliders: vec![Collider {
            shape: ColliderShape::Wheel {
                radius: 0.4,
                width: 0.2,
            },
            offset: Isometry3::identity(),
        }],
        nodes: vec![NodeSpec {
            kind: NodeKind::Axle,
            compatible: NodeKind::Generic,
            position: Point3::new(-0.1, 0.0, 0.0),
            direction: Vector3::x(),
        }],
    }
}

/// A frame-typed prefab with nodes but no colliders at all.
pub fn ghost_prefab() -> PartPrefab {
    PartPrefab {
        colliders: Vec::new(),
        ..cube_prefab("ghost")
    }
}

// ===========================================================================
// Graph helpers
// ===========================================================================

/// Node key at `index` of `part`.
///
/// # Panics
/// If the part or index does not exist.
pub fn node_at(graph: &PartGraph, part: PartId, index: usize) -> NodeId {
    graph.part(part).expect("part exists").nodes()[index]
}

/// Spawn a cube and commit it in place (not simulating).
pub fn placed_cube(graph: &mut PartGraph, x: f64, y: f64, z: f64) -> PartId {
    let id = graph.spawn(&cube_prefab("cube"), pose_at(x, y, z));
    graph.commit_placement(id, false);
    id
}

/// Spawn and commit a part from any prefab.
pub fn placed(graph: &mut PartGraph, prefab: &PartPrefab, pose: Isometry3<f64>) -> PartId {
    let id = graph.spawn(prefab, pose);
    graph.commit_placement(id, false);
    id
}

// ===========================================================================
// Recording joint backend
// ===========================================================================

/// A joint request as seen by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedJoint {
    pub handle: JointHandle,
    pub part_a: PartId,
    pub anchor_a: Point3<f64>,
    pub part_b: PartId,
    pub anchor_b: Point3<f64>,
    pub params: JointParams,
}

/// In-memory [`JointBackend`] that records every live joint.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    next: u64,
    pub live: Vec<RecordedJoint>,
    pub removed: Vec<JointHandle>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn joints_between(&self, a: PartId, b: PartId) -> usize {
        self.live
            .iter()
            .filter(|j| (j.part_a == a && j.part_b == b) || (j.part_a == b && j.part_b == a))
            .count()
    }
}

impl JointBackend for RecordingBackend {
    fn create_fixed_joint(
        &mut self,
        part_a: PartId,
        anchor_a: Point3<f64>,
        part_b: PartId,
        anchor_b: Point3<f64>,
        params: &JointParams,
    ) -> JointHandle {
        let handle = JointHandle(self.next);
        self.next += 1;
        self.live.push(RecordedJoint {
            handle,
            part_a,
            anchor_a,
            part_b,
            anchor_b,
            params: *params,
        });
        handle
    }

    fn remove_joint(&mut self, handle: JointHandle) {
        self.live.retain(|j| j.handle != handle);
        self.removed.push(handle);
    }
}
