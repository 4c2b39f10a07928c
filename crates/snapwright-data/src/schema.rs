//! Serde data file structs for part prefab definitions.
//!
//! These structs define the on-disk format of the part catalog. They are
//! deserialized from RON, JSON, or TOML data files and then converted into
//! core [`PartPrefab`]s by the loader.

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use serde::Deserialize;
use snapwright_core::node::{NodeKind, NodeSpec};
use snapwright_core::part::{Collider, ColliderShape, PartPrefab, PartType};

// ===========================================================================
// Prefabs
// ===========================================================================

/// A part prefab definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct PrefabData {
    pub key: String,
    #[serde(rename = "type")]
    pub part_type: PartType,
    pub mass: f64,
    #[serde(default = "default_bodies")]
    pub rigid_bodies: u32,
    #[serde(default)]
    pub colliders: Vec<ColliderData>,
    #[serde(default)]
    pub nodes: Vec<NodeData>,
}

fn default_bodies() -> u32 {
    1
}

impl PrefabData {
    pub fn into_prefab(self) -> PartPrefab {
        PartPrefab {
            key: self.key,
            part_type: self.part_type,
            mass: self.mass,
            rigid_bodies: self.rigid_bodies,
            colliders: self.colliders.iter().map(ColliderData::to_collider).collect(),
            nodes: self.nodes.iter().map(NodeData::to_spec).collect(),
        }
    }
}

// ===========================================================================
// Colliders
// ===========================================================================

/// Collider shape in a data file.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeData {
    Box { half_extents: [f64; 3] },
    Sphere { radius: f64 },
    Wheel { radius: f64, width: f64 },
}

/// A collider with an optional local offset and rotation.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ColliderData {
    pub shape: ShapeData,
    #[serde(default)]
    pub offset: [f64; 3],
    /// Euler angles in degrees: roll, pitch, yaw.
    #[serde(default)]
    pub rotation: [f64; 3],
}

impl ColliderData {
    pub fn to_collider(&self) -> Collider {
        let shape = match self.shape {
            ShapeData::Box { half_extents } => ColliderShape::Box {
                half_extents: Vector3::from(half_extents),
            },
            ShapeData::Sphere { radius } => ColliderShape::Sphere { radius },
            ShapeData::Wheel { radius, width } => ColliderShape::Wheel { radius, width },
        };
        let [roll, pitch, yaw] = self.rotation.map(f64::to_radians);
        Collider {
            shape,
            offset: Isometry3::from_parts(
                Translation3::from(Vector3::from(self.offset)),
                UnitQuaternion::from_euler_angles(roll, pitch, yaw),
            ),
        }
    }
}

// ===========================================================================
// Nodes
// ===========================================================================

/// A connection node definition in a data file.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct NodeData {
    #[serde(default = "default_kind")]
    pub kind: NodeKind,
    #[serde(default = "default_kind")]
    pub compatible: NodeKind,
    pub position: [f64; 3],
    pub direction: [f64; 3],
}

fn default_kind() -> NodeKind {
    NodeKind::Generic
}

impl NodeData {
    pub fn to_spec(&self) -> NodeSpec {
        NodeSpec {
            kind: self.kind,
            compatible: self.compatible,
            position: Point3::from(self.position),
            direction: Vector3::from(self.direction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_optional_fields() {
        let data: PrefabData = serde_json::from_str(
            r#"{ "key": "plate", "type": "Frame", "mass": 2.5 }"#,
        )
        .unwrap();
        let prefab = data.into_prefab();
        assert_eq!(prefab.rigid_bodies, 1);
        assert!(prefab.colliders.is_empty());
        assert!(prefab.nodes.is_empty());
        assert_eq!(prefab.part_type, PartType::Frame);
    }

    #[test]
    fn collider_offset_and_rotation() {
        let data: ColliderData = serde_json::from_str(
            r#"{ "shape": { "wheel": { "radius": 0.4, "width": 0.2 } },
                 "offset": [0.0, -0.5, 0.0],
                 "rotation": [0.0, 0.0, 90.0] }"#,
        )
        .unwrap();
        let collider = data.to_collider();
        assert!(collider.is_wheel());
        assert_eq!(collider.offset.translation.vector, Vector3::new(0.0, -0.5, 0.0));
        let x = collider.offset.rotation * Vector3::x();
        assert!((x - Vector3::y()).norm() < 1e-9);
    }

    #[test]
    fn node_kinds_default_to_generic() {
        let data: NodeData =
            serde_json::from_str(r#"{ "position": [0.5, 0, 0], "direction": [1, 0, 0] }"#).unwrap();
        let spec = data.to_spec();
        assert_eq!(spec.kind, NodeKind::Generic);
        assert_eq!(spec.compatible, NodeKind::Generic);
        assert_eq!(spec.position, Point3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn unknown_part_type_rejected() {
        let result: Result<PrefabData, _> =
            serde_json::from_str(r#"{ "key": "x", "type": "Rocket", "mass": 1.0 }"#);
        assert!(result.is_err());
    }
}
