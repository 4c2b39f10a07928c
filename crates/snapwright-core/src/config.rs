//! Tunable parameters for snapping, connection rules, joints and drive.
//!
//! Every field has a default so that partial settings files (or none at all)
//! produce a usable [`BuilderConfig`].

use crate::node::NodeKind;
use crate::part::PartType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Aggregate configuration for the builder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    pub snap: SnapConfig,
    pub rules: ConnectionRules,
    pub mass: MassLimits,
    pub joint: JointParams,
    pub drive: DriveConfig,
}

// ---------------------------------------------------------------------------
// Snapping
// ---------------------------------------------------------------------------

/// Geometric thresholds used by node matching, snapping and validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    /// Maximum node-to-node distance considered for automatic alignment.
    pub snap_radius: f64,
    /// Two outward directions must have a dot product below this to connect.
    pub facing_threshold: f64,
    /// Cosine similarity a node direction needs to count as "on" a surface.
    pub surface_normal_threshold: f64,
    /// Amount collider bounds are shrunk by before overlap testing.
    pub overlap_epsilon: f64,
    /// Distance from the mirror plane inside which mirroring is suppressed.
    pub mirror_dead_zone: f64,
    /// Capacity of the per-step candidate scratch buffer.
    pub max_candidates: usize,
    /// After snapping, extra node pairs closer than this are connected too.
    pub connect_tolerance: f64,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            snap_radius: 0.5,
            facing_threshold: -0.9,
            surface_normal_threshold: 0.9,
            overlap_epsilon: 0.01,
            mirror_dead_zone: 0.02,
            max_candidates: 64,
            connect_tolerance: 0.05,
        }
    }
}

// ---------------------------------------------------------------------------
// Connection rules
// ---------------------------------------------------------------------------

/// Part-type level rules that gate which nodes may connect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionRules {
    /// Node kinds a part type may connect through. Types without an entry
    /// may use any kind.
    pub allowed_kinds: BTreeMap<PartType, BTreeSet<NodeKind>>,
    /// Part types that ignore the facing rule.
    pub facing_exempt: BTreeSet<PartType>,
    /// Part types that may be placed with no solid colliders.
    pub collider_light: BTreeSet<PartType>,
}

impl Default for ConnectionRules {
    fn default() -> Self {
        Self {
            allowed_kinds: BTreeMap::new(),
            facing_exempt: BTreeSet::from([PartType::Wheel]),
            collider_light: BTreeSet::from([PartType::Wheel]),
        }
    }
}

impl ConnectionRules {
    /// Whether a part of `part_type` may connect through a node of `kind`.
    pub fn allows(&self, part_type: PartType, kind: NodeKind) -> bool {
        match self.allowed_kinds.get(&part_type) {
            Some(kinds) => kind == NodeKind::Generic || kinds.contains(&kind),
            None => true,
        }
    }

    pub fn is_facing_exempt(&self, part_type: PartType) -> bool {
        self.facing_exempt.contains(&part_type)
    }

    pub fn is_collider_light(&self, part_type: PartType) -> bool {
        self.collider_light.contains(&part_type)
    }
}

// ---------------------------------------------------------------------------
// Mass, joints, drive
// ---------------------------------------------------------------------------

/// Inclusive range a part's mass is clamped into on commit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MassLimits {
    pub min: f64,
    pub max: f64,
}

impl Default for MassLimits {
    fn default() -> Self {
        Self {
            min: 0.01,
            max: 10_000.0,
        }
    }
}

impl MassLimits {
    /// Clamps `mass` into the limits. Inverted limits are treated as the
    /// range between the two values rather than rejected.
    pub fn clamp(&self, mass: f64) -> f64 {
        let lo = self.min.min(self.max);
        let hi = self.max.max(self.min);
        if mass.is_nan() {
            return lo;
        }
        mass.max(lo).min(hi)
    }
}

/// Parameters handed verbatim to the physics backend for each joint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JointParams {
    pub stiffness: f64,
    /// `f64::MAX` means unbreakable.
    pub break_force: f64,
    pub break_torque: f64,
}

impl Default for JointParams {
    fn default() -> Self {
        Self {
            stiffness: 1.0e6,
            break_force: f64::MAX,
            break_torque: f64::MAX,
        }
    }
}

/// Per-part contributions used to compute an assembly's drive capacity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub force_per_motor: f64,
    pub torque_per_motor: f64,
    pub torque_per_wheel: f64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            force_per_motor: 1500.0,
            torque_per_motor: 400.0,
            torque_per_wheel: 50.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = SnapConfig::default();
        assert_eq!(cfg.snap_radius, 0.5);
        assert_eq!(cfg.facing_threshold, -0.9);
        assert_eq!(cfg.surface_normal_threshold, 0.9);
        assert_eq!(cfg.overlap_epsilon, 0.01);
        assert_eq!(cfg.mirror_dead_zone, 0.02);
    }

    #[test]
    fn mass_clamps_into_range() {
        let limits = MassLimits::default();
        assert_eq!(limits.clamp(0.0), 0.01);
        assert_eq!(limits.clamp(5.0), 5.0);
        assert_eq!(limits.clamp(1.0e9), 10_000.0);
        assert_eq!(limits.clamp(f64::NAN), 0.01);
    }

    #[test]
    fn inverted_mass_limits_clamp_without_panicking() {
        let cfg: BuilderConfig =
            serde_json::from_str(r#"{"mass": {"min": 10.0, "max": 1.0}}"#).unwrap();
        assert_eq!(cfg.mass.clamp(5.0), 5.0);
        assert_eq!(cfg.mass.clamp(0.0), 1.0);
        assert_eq!(cfg.mass.clamp(50.0), 10.0);
        assert_eq!(cfg.mass.clamp(f64::NAN), 1.0);
    }

    #[test]
    fn rules_without_entry_allow_everything() {
        let rules = ConnectionRules::default();
        assert!(rules.allows(PartType::Frame, NodeKind::Axle));
        assert!(rules.is_facing_exempt(PartType::Wheel));
        assert!(!rules.is_facing_exempt(PartType::Frame));
    }

    #[test]
    fn allow_list_restricts_kinds_but_not_generic() {
        let mut rules = ConnectionRules::default();
        rules
            .allowed_kinds
            .insert(PartType::Wheel, BTreeSet::from([NodeKind::Axle]));
        assert!(rules.allows(PartType::Wheel, NodeKind::Axle));
        assert!(rules.allows(PartType::Wheel, NodeKind::Generic));
        assert!(!rules.allows(PartType::Wheel, NodeKind::Structural));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: BuilderConfig = serde_json::from_str(r#"{"snap": {"snap_radius": 1.0}}"#).unwrap();
        assert_eq!(cfg.snap.snap_radius, 1.0);
        assert_eq!(cfg.snap.max_candidates, 64);
        assert_eq!(cfg.mass, MassLimits::default());
    }
}
