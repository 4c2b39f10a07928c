//! Parts: rigid build units with a lifecycle and a fixed set of nodes.

use crate::config::MassLimits;
use crate::id::NodeId;
use crate::node::NodeSpec;
use nalgebra::{Isometry3, Vector3};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Functional category of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PartType {
    Core,
    Frame,
    Motor,
    Wheel,
    Cargo,
    Ballast,
}

/// Lifecycle state of a part.
///
/// `Unplaced -> Placed -> Simulating`, with `Placed <-> Simulating` toggling
/// freely once a part has been placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PartState {
    #[default]
    Unplaced,
    Placed,
    Simulating,
}

/// Shape of a collider, in the collider's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    Box { half_extents: Vector3<f64> },
    Sphere { radius: f64 },
    /// Physics-wheel shape, rolling about the collider's local X axis.
    /// Excluded from overlap validation.
    Wheel { radius: f64, width: f64 },
}

/// A collider attached to a part's rigid body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub shape: ColliderShape,
    #[serde(default = "Isometry3::identity")]
    pub offset: Isometry3<f64>,
}

impl Collider {
    pub fn is_wheel(&self) -> bool {
        matches!(self.shape, ColliderShape::Wheel { .. })
    }
}

/// Immutable template a part is spawned from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartPrefab {
    pub key: String,
    pub part_type: PartType,
    pub mass: f64,
    /// Number of rigid bodies the prefab hierarchy declares. Exactly one is
    /// valid.
    #[serde(default = "default_bodies")]
    pub rigid_bodies: u32,
    #[serde(default)]
    pub colliders: Vec<Collider>,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
}

fn default_bodies() -> u32 {
    1
}

/// Physics-facing state of a part's single rigid body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBody {
    pub kinematic: bool,
    pub collision_enabled: bool,
    pub mass: f64,
}

/// Errors from lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("part is {0:?}; re-entering placement requires explicit allowance")]
    ReentryNotAllowed(PartState),
    #[error("commit requires an unplaced part, found {0:?}")]
    NotUnplaced(PartState),
    #[error("simulation toggle requires a placed part")]
    NotPlaced,
}

// ---------------------------------------------------------------------------
// Part
// ---------------------------------------------------------------------------

/// A rigid, physically simulated build unit.
#[derive(Debug, Clone)]
pub struct Part {
    pub(crate) serial: u64,
    pub part_type: PartType,
    pub prefab: String,
    pub pose: Isometry3<f64>,
    pub colliders: Vec<Collider>,
    pub(crate) body: RigidBody,
    pub(crate) state: PartState,
    pub(crate) nodes: Box<[NodeId]>,
    pub(crate) visible: bool,
    pub(crate) degraded: bool,
}

impl Part {
    pub(crate) fn new(prefab: &PartPrefab, pose: Isometry3<f64>, serial: u64) -> Self {
        Self {
            serial,
            part_type: prefab.part_type,
            prefab: prefab.key.clone(),
            pose,
            colliders: prefab.colliders.clone(),
            body: RigidBody {
                kinematic: true,
                collision_enabled: false,
                mass: prefab.mass,
            },
            state: PartState::Unplaced,
            nodes: Box::default(),
            visible: true,
            degraded: false,
        }
    }

    pub fn state(&self) -> PartState {
        self.state
    }

    pub fn body(&self) -> &RigidBody {
        &self.body
    }

    pub fn mass(&self) -> f64 {
        self.body.mass
    }

    /// Node keys in stable index order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// True when the prefab had a configuration error at spawn.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Spawn order; used for stable persistence ordering.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Colliders that take part in overlap validation.
    pub fn solid_colliders(&self) -> impl Iterator<Item = &Collider> {
        self.colliders.iter().filter(|c| !c.is_wheel())
    }

    /// Enter preview mode: kinematic, non-colliding, `Unplaced`.
    ///
    /// Idempotent for unplaced parts. A placed part is only re-entered when
    /// `allow_reentry` is set.
    pub fn begin_placement(&mut self, allow_reentry: bool) -> Result<(), LifecycleError> {
        if self.state != PartState::Unplaced && !allow_reentry {
            return Err(LifecycleError::ReentryNotAllowed(self.state));
        }
        self.body.kinematic = true;
        self.body.collision_enabled = false;
        self.state = PartState::Unplaced;
        Ok(())
    }

    /// Finalize placement: enable collision, clamp mass, become `Placed`
    /// (then `Simulating` if requested).
    pub fn commit_placement(
        &mut self,
        enable_simulation: bool,
        limits: &MassLimits,
    ) -> Result<(), LifecycleError> {
        if self.state != PartState::Unplaced {
            return Err(LifecycleError::NotUnplaced(self.state));
        }
        self.body.collision_enabled = true;
        self.body.mass = limits.clamp(self.body.mass);
        self.state = PartState::Placed;
        if enable_simulation {
            self.set_simulating(true)?;
        }
        Ok(())
    }

    /// Toggle dynamics on a placed part. Collision stays enabled either way.
    pub fn set_simulating(&mut self, enabled: bool) -> Result<(), LifecycleError> {
        if self.state == PartState::Unplaced {
            return Err(LifecycleError::NotPlaced);
        }
        self.body.kinematic = !enabled;
        self.body.collision_enabled = true;
        self.state = if enabled {
            PartState::Simulating
        } else {
            PartState::Placed
        };
        Ok(())
    }
}
