use crate::config::{ConnectionRules, MassLimits, SnapConfig};
use crate::diagnostics::{Diagnostic, DiagnosticLog};
use crate::id::{NodeId, PartId};
use crate::node::{self, ConnectionNode};
use crate::part::{LifecycleError, Part, PartPrefab, PartState, PartType};
use nalgebra::{Isometry3, Point3, Unit, Vector3};
use slotmap::SlotMap;
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// PartGraph
// ---------------------------------------------------------------------------

/// Arena of parts and connection nodes.
///
/// Parts and nodes live in two `SlotMap`s. A node refers to its owner and to
/// its partner by key, so the node -> part -> nodes and node <-> node cycles
/// never hold live references; removing a part simply invalidates its keys.
///
/// Connections are not stored objects. They are the symmetric relation
/// "A.connected_to == B and B.connected_to == A, both occupied", maintained
/// exclusively by [`connect`](Self::connect) and
/// [`disconnect`](Self::disconnect).
#[derive(Debug)]
pub struct PartGraph {
    parts: SlotMap<PartId, Part>,
    nodes: SlotMap<NodeId, ConnectionNode>,
    by_type: BTreeMap<PartType, BTreeSet<PartId>>,
    root: Option<PartId>,
    next_serial: u64,
    simulation_enabled: bool,

    rules: ConnectionRules,
    facing_threshold: f64,
    surface_normal_threshold: f64,
    mass_limits: MassLimits,

    diagnostics: DiagnosticLog,
}

impl Default for PartGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl PartGraph {
    /// Create an empty graph with default rules and thresholds.
    pub fn new() -> Self {
        Self::with_config(
            ConnectionRules::default(),
            &SnapConfig::default(),
            MassLimits::default(),
        )
    }

    pub fn with_config(rules: ConnectionRules, snap: &SnapConfig, mass_limits: MassLimits) -> Self {
        Self {
            parts: SlotMap::with_key(),
            nodes: SlotMap::with_key(),
            by_type: BTreeMap::new(),
            root: None,
            next_serial: 0,
            simulation_enabled: false,
            rules,
            facing_threshold: snap.facing_threshold,
            surface_normal_threshold: snap.surface_normal_threshold,
            mass_limits,
            diagnostics: DiagnosticLog::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Spawn / remove
    // -----------------------------------------------------------------------

    /// Instantiate a part from a prefab at `pose`. The part starts `Unplaced`.
    ///
    /// Prefab configuration errors are diagnosed, never fatal: a prefab with
    /// no rigid body yields a degraded part with zero nodes, extra rigid
    /// bodies are ignored, and a prefab with no nodes spawns without any.
    pub fn spawn(&mut self, prefab: &PartPrefab, pose: Isometry3<f64>) -> PartId {
        let serial = self.next_serial;
        self.next_serial += 1;

        let mut part = Part::new(prefab, pose, serial);
        let mut node_specs = prefab.nodes.as_slice();
        match prefab.rigid_bodies {
            0 => {
                self.diagnostics.report(Diagnostic::MissingRigidBody {
                    prefab: prefab.key.clone(),
                });
                part.degraded = true;
                node_specs = &[];
            }
            1 => {}
            count => {
                self.diagnostics.report(Diagnostic::ExtraRigidBodies {
                    prefab: prefab.key.clone(),
                    count,
                });
            }
        }
        if prefab.nodes.is_empty() {
            self.diagnostics.report(Diagnostic::MissingNodes {
                prefab: prefab.key.clone(),
            });
        }

        let part_type = part.part_type;
        let part_id = self.parts.insert(part);

        let mut node_ids = Vec::with_capacity(node_specs.len());
        for (index, spec) in node_specs.iter().enumerate() {
            let mut node = ConnectionNode::from_spec(spec, index as u16);
            // Fresh node; cannot already be owned.
            let _ = node.assign_owner(part_id);
            node_ids.push(self.nodes.insert(node));
        }
        if let Some(part) = self.parts.get_mut(part_id) {
            part.nodes = node_ids.into_boxed_slice();
        }

        self.by_type.entry(part_type).or_default().insert(part_id);
        if part_type == PartType::Core && self.root.is_none() {
            self.root = Some(part_id);
        }
        part_id
    }

    /// Delete a part, severing all of its connections first.
    ///
    /// Returns each severed connection as (own node, former partner).
    pub fn remove(&mut self, part_id: PartId) -> Option<Vec<(NodeId, NodeId)>> {
        let Some(part) = self.parts.get(part_id) else {
            self.diagnostics
                .report(Diagnostic::UnknownPart { part: part_id });
            return None;
        };
        let node_ids = part.nodes.clone();
        let part_type = part.part_type;

        let mut severed = Vec::new();
        for &node_id in node_ids.iter() {
            if let Some(partner) = self.nodes.get(node_id).and_then(|n| n.connected_to()) {
                severed.push((node_id, partner));
            }
            self.disconnect(node_id);
        }
        for &node_id in node_ids.iter() {
            self.nodes.remove(node_id);
        }
        self.parts.remove(part_id);

        if let Some(set) = self.by_type.get_mut(&part_type) {
            set.remove(&part_id);
        }
        if self.root == Some(part_id) {
            self.root = self.first_of_type(PartType::Core);
        }
        Some(severed)
    }

    /// Remove every part.
    pub fn clear(&mut self) {
        self.parts.clear();
        self.nodes.clear();
        self.by_type.clear();
        self.root = None;
    }

    // -----------------------------------------------------------------------
    // Node model
    // -----------------------------------------------------------------------

    /// Whether two nodes may be connected right now.
    ///
    /// Requires: both exist and are unoccupied, different owners, kind
    /// compatibility both ways, both owners' part types allow the node kinds,
    /// and (unless either owner is facing-exempt) opposed outward directions.
    pub fn can_connect(&self, a: NodeId, b: NodeId) -> bool {
        let Some(pose) = self
            .nodes
            .get(a)
            .and_then(|n| n.owner())
            .and_then(|owner| self.parts.get(owner))
            .map(|p| p.pose)
        else {
            return false;
        };
        self.can_connect_at(a, &pose, b)
    }

    /// [`can_connect`](Self::can_connect) with the preview node's owner
    /// evaluated at a hypothetical pose instead of its current one.
    pub fn can_connect_at(&self, preview: NodeId, preview_pose: &Isometry3<f64>, target: NodeId) -> bool {
        let (Some(np), Some(nt)) = (self.nodes.get(preview), self.nodes.get(target)) else {
            return false;
        };
        if np.is_occupied() || nt.is_occupied() {
            return false;
        }
        let (Some(owner_p), Some(owner_t)) = (np.owner(), nt.owner()) else {
            return false;
        };
        if owner_p == owner_t {
            return false;
        }
        let (Some(pp), Some(pt)) = (self.parts.get(owner_p), self.parts.get(owner_t)) else {
            return false;
        };
        if !np.kinds_compatible(nt)
            || !self.rules.allows(pp.part_type, np.kind)
            || !self.rules.allows(pt.part_type, nt.kind)
        {
            return false;
        }
        if self.rules.is_facing_exempt(pp.part_type) || self.rules.is_facing_exempt(pt.part_type) {
            return true;
        }
        let dp = np.world_direction(preview_pose);
        let dt = nt.world_direction(&pt.pose);
        node::facing_opposed(&dp, &dt, self.facing_threshold)
    }

    /// Whether a node's outward direction agrees with a world-space normal.
    pub fn matches_surface_normal(&self, node: NodeId, normal: &Vector3<f64>) -> bool {
        self.node_world_direction(node)
            .is_some_and(|d| node::matches_surface_normal(&d, normal, self.surface_normal_threshold))
    }

    /// Connect two nodes atomically and symmetrically.
    ///
    /// Silently does nothing (returns `false`) when
    /// [`can_connect`](Self::can_connect) is false.
    pub fn connect(&mut self, a: NodeId, b: NodeId) -> bool {
        if !self.can_connect(a, b) {
            return false;
        }
        self.link(a, b);
        true
    }

    fn link(&mut self, a: NodeId, b: NodeId) {
        if let Some(na) = self.nodes.get_mut(a) {
            na.link(b);
        }
        if let Some(nb) = self.nodes.get_mut(b) {
            nb.link(a);
        }
        tracing::debug!(?a, ?b, "nodes connected");
    }

    /// Clear a node's connection and, when the partner still points back,
    /// the partner's too. An asymmetric partner is diagnosed and left alone.
    ///
    /// Calling this on an already free node is a no-op.
    pub fn disconnect(&mut self, a: NodeId) {
        let Some(partner) = self.nodes.get(a).and_then(|n| n.connected_to()) else {
            if let Some(n) = self.nodes.get_mut(a) {
                n.unlink();
            }
            return;
        };
        if let Some(n) = self.nodes.get_mut(a) {
            n.unlink();
        }
        match self.nodes.get_mut(partner) {
            Some(p) if p.connected_to() == Some(a) => p.unlink(),
            Some(p) => {
                let partner_points_to = p.connected_to();
                self.diagnostics.report(Diagnostic::AsymmetricConnection {
                    node: a,
                    partner,
                    partner_points_to,
                });
            }
            // Partner already gone with its part.
            None => {}
        }
    }

    /// Try to assign `node` to `owner`. Reassignment is refused and diagnosed.
    pub fn assign_node_owner(&mut self, node: NodeId, owner: PartId) -> bool {
        let Some(n) = self.nodes.get_mut(node) else {
            return false;
        };
        match n.assign_owner(owner) {
            Ok(()) => true,
            Err(crate::node::NodeError::AlreadyOwned(current)) => {
                self.diagnostics.report(Diagnostic::OwnerReassignment {
                    node,
                    current,
                    requested: owner,
                });
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle (diagnosing wrappers around Part)
    // -----------------------------------------------------------------------

    pub fn begin_placement(&mut self, part_id: PartId, allow_reentry: bool) -> bool {
        self.lifecycle(part_id, "begin_placement", |p| p.begin_placement(allow_reentry))
    }

    pub fn commit_placement(&mut self, part_id: PartId, enable_simulation: bool) -> bool {
        let limits = self.mass_limits;
        self.lifecycle(part_id, "commit_placement", |p| {
            p.commit_placement(enable_simulation, &limits)
        })
    }

    pub fn set_simulating(&mut self, part_id: PartId, enabled: bool) -> bool {
        self.lifecycle(part_id, "set_simulating", |p| p.set_simulating(enabled))
    }

    fn lifecycle<F>(&mut self, part_id: PartId, operation: &'static str, f: F) -> bool
    where
        F: FnOnce(&mut Part) -> Result<(), LifecycleError>,
    {
        let Some(part) = self.parts.get_mut(part_id) else {
            self.diagnostics
                .report(Diagnostic::UnknownPart { part: part_id });
            return false;
        };
        let state = part.state;
        match f(part) {
            Ok(()) => true,
            Err(_) => {
                self.diagnostics.report(Diagnostic::LifecycleRefused {
                    part: part_id,
                    state,
                    operation,
                });
                false
            }
        }
    }

    /// Global simulation on/off. Applies to every placed part and is
    /// remembered for later commits.
    pub fn set_simulation_enabled(&mut self, enabled: bool) {
        self.simulation_enabled = enabled;
        for part in self.parts.values_mut() {
            if part.state != PartState::Unplaced {
                // Placed parts always accept the toggle.
                let _ = part.set_simulating(enabled);
            }
        }
    }

    pub fn simulation_enabled(&self) -> bool {
        self.simulation_enabled
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn part(&self, part_id: PartId) -> Option<&Part> {
        self.parts.get(part_id)
    }

    pub fn part_mut(&mut self, part_id: PartId) -> Option<&mut Part> {
        self.parts.get_mut(part_id)
    }

    pub fn node(&self, node_id: NodeId) -> Option<&ConnectionNode> {
        self.nodes.get(node_id)
    }

    pub fn contains_part(&self, part_id: PartId) -> bool {
        self.parts.contains_key(part_id)
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterate parts in arena order.
    pub fn parts(&self) -> impl Iterator<Item = (PartId, &Part)> {
        self.parts.iter()
    }

    /// Part keys ordered by spawn serial.
    pub fn parts_in_spawn_order(&self) -> Vec<PartId> {
        let mut ids: Vec<(u64, PartId)> = self.parts.iter().map(|(id, p)| (p.serial, id)).collect();
        ids.sort_unstable();
        ids.into_iter().map(|(_, id)| id).collect()
    }

    /// Registry lookup: all live parts of a type, in key order.
    pub fn parts_of_type(&self, part_type: PartType) -> impl Iterator<Item = PartId> + '_ {
        self.by_type
            .get(&part_type)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    fn first_of_type(&self, part_type: PartType) -> Option<PartId> {
        self.parts_of_type(part_type)
            .min_by_key(|id| self.parts.get(*id).map(|p| p.serial))
    }

    /// The assembly root (first spawned live Core part).
    pub fn root_part(&self) -> Option<PartId> {
        self.root
    }

    pub fn set_root_part(&mut self, part_id: PartId) -> bool {
        if self.parts.contains_key(part_id) {
            self.root = Some(part_id);
            true
        } else {
            false
        }
    }

    /// Node keys of a part in index order.
    ///
    /// The cached slice is verified against the arena; if any key is dead or
    /// no longer owned by the part, the slice is rebuilt from the arena and a
    /// [`Diagnostic::StaleNodeCache`] is recorded.
    pub fn nodes_of(&mut self, part_id: PartId) -> Vec<NodeId> {
        let Some(part) = self.parts.get(part_id) else {
            return Vec::new();
        };
        let stale = part.nodes.iter().any(|&n| {
            self.nodes
                .get(n)
                .is_none_or(|node| node.owner() != Some(part_id))
        });
        if !stale {
            return part.nodes.to_vec();
        }

        self.diagnostics
            .report(Diagnostic::StaleNodeCache { part: part_id });
        let mut rescanned: Vec<(u16, NodeId)> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.owner() == Some(part_id))
            .map(|(id, n)| (n.index(), id))
            .collect();
        rescanned.sort_unstable();
        let ids: Vec<NodeId> = rescanned.into_iter().map(|(_, id)| id).collect();
        if let Some(part) = self.parts.get_mut(part_id) {
            part.nodes = ids.clone().into_boxed_slice();
        }
        ids
    }

    /// Partner of a node, if connected.
    pub fn partner(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id).and_then(|n| n.connected_to())
    }

    /// Owning part of a node.
    pub fn owner_of(&self, node_id: NodeId) -> Option<PartId> {
        self.nodes.get(node_id).and_then(|n| n.owner())
    }

    pub fn node_world_position(&self, node_id: NodeId) -> Option<Point3<f64>> {
        let node = self.nodes.get(node_id)?;
        let part = self.parts.get(node.owner()?)?;
        Some(node.world_position(&part.pose))
    }

    pub fn node_world_direction(&self, node_id: NodeId) -> Option<Vector3<f64>> {
        let node = self.nodes.get(node_id)?;
        let part = self.parts.get(node.owner()?)?;
        Some(node.world_direction(&part.pose).into_inner())
    }

    /// World-space direction of a node as if its owner stood at `pose`.
    pub fn node_direction_at(&self, node_id: NodeId, pose: &Isometry3<f64>) -> Option<Unit<Vector3<f64>>> {
        self.nodes.get(node_id).map(|n| n.world_direction(pose))
    }

    /// Every connected node pair, each once, as (lower key, higher key).
    pub fn connections(&self) -> Vec<(NodeId, NodeId)> {
        let mut edges: Vec<(NodeId, NodeId)> = self
            .nodes
            .iter()
            .filter_map(|(id, n)| n.connected_to().filter(|&p| id < p).map(|p| (id, p)))
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Every node whose connection state is not symmetric.
    pub fn asymmetric_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(id, n)| match n.connected_to() {
                Some(p) => {
                    !n.is_occupied()
                        || self
                            .nodes
                            .get(p)
                            .is_none_or(|pn| pn.connected_to() != Some(*id) || !pn.is_occupied())
                }
                None => n.is_occupied(),
            })
            .map(|(id, _)| id)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Mutation helpers
    // -----------------------------------------------------------------------

    pub fn set_pose(&mut self, part_id: PartId, pose: Isometry3<f64>) -> bool {
        match self.parts.get_mut(part_id) {
            Some(part) => {
                part.pose = pose;
                true
            }
            None => false,
        }
    }

    pub fn set_visible(&mut self, part_id: PartId, visible: bool) {
        if let Some(part) = self.parts.get_mut(part_id) {
            part.visible = visible;
        }
    }

    // -----------------------------------------------------------------------
    // Config / diagnostics access
    // -----------------------------------------------------------------------

    pub fn rules(&self) -> &ConnectionRules {
        &self.rules
    }

    pub fn mass_limits(&self) -> &MassLimits {
        &self.mass_limits
    }

    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut DiagnosticLog {
        &mut self.diagnostics
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.report(diagnostic);
    }

    /// Break a connection from one side only. Exists so tests can exercise
    /// the asymmetric-state diagnostics.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn corrupt_one_side(&mut self, node: NodeId, points_to: Option<NodeId>) {
        if let Some(n) = self.nodes.get_mut(node) {
            match points_to {
                Some(p) => n.link(p),
                None => n.unlink(),
            }
        }
    }

    /// Remove a single node from the arena behind its owner's back.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn destroy_node_raw(&mut self, node: NodeId) {
        self.nodes.remove(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::node::{NodeKind, NodeSpec};
    use crate::test_utils::*;
    use nalgebra::UnitQuaternion;

    fn two_facing_cubes() -> (PartGraph, PartId, PartId) {
        let mut graph = PartGraph::new();
        let a = graph.spawn(&cube_prefab("cube"), pose_at(0.0, 0.0, 0.0));
        let b = graph.spawn(&cube_prefab("cube"), pose_at(1.0, 0.0, 0.0));
        (graph, a, b)
    }

    // -----------------------------------------------------------------------
    // Spawn
    // -----------------------------------------------------------------------

    #[test]
    fn spawn_assigns_nodes_in_order() {
        let (graph, a, _) = two_facing_cubes();
        let part = graph.part(a).unwrap();
        assert_eq!(part.nodes().len(), 6);
        for (i, &n) in part.nodes().iter().enumerate() {
            let node = graph.node(n).unwrap();
            assert_eq!(node.index() as usize, i);
            assert_eq!(node.owner(), Some(a));
        }
    }

    #[test]
    fn spawn_without_body_is_degraded() {
        let mut graph = PartGraph::new();
        let mut prefab = cube_prefab("broken");
        prefab.rigid_bodies = 0;
        let id = graph.spawn(&prefab, pose_at(0.0, 0.0, 0.0));
        let part = graph.part(id).unwrap();
        assert!(part.is_degraded());
        assert!(part.nodes().is_empty());
        assert_eq!(graph.diagnostics().count(DiagnosticKind::MissingRigidBody), 1);
    }

    #[test]
    fn spawn_with_extra_bodies_keeps_nodes() {
        let mut graph = PartGraph::new();
        let mut prefab = cube_prefab("double");
        prefab.rigid_bodies = 2;
        let id = graph.spawn(&prefab, pose_at(0.0, 0.0, 0.0));
        assert_eq!(graph.part(id).unwrap().nodes().len(), 6);
        assert_eq!(graph.diagnostics().count(DiagnosticKind::ExtraRigidBodies), 1);
    }

    #[test]
    fn spawn_registers_type_and_root() {
        let mut graph = PartGraph::new();
        let frame = graph.spawn(&cube_prefab("cube"), pose_at(0.0, 0.0, 0.0));
        let core = graph.spawn(&core_prefab(), pose_at(2.0, 0.0, 0.0));
        assert_eq!(graph.root_part(), Some(core));
        assert_eq!(graph.parts_of_type(PartType::Frame).collect::<Vec<_>>(), vec![frame]);
        assert_eq!(graph.parts_of_type(PartType::Core).collect::<Vec<_>>(), vec![core]);
    }

    // -----------------------------------------------------------------------
    // can_connect
    // -----------------------------------------------------------------------

    #[test]
    fn facing_nodes_can_connect_symmetrically() {
        let (graph, a, b) = two_facing_cubes();
        let a_px = node_at(&graph, a, 0); // +X face of a
        let b_nx = node_at(&graph, b, 1); // -X face of b
        assert!(graph.can_connect(a_px, b_nx));
        assert!(graph.can_connect(b_nx, a_px));
    }

    #[test]
    fn same_face_nodes_are_rejected() {
        let (graph, a, b) = two_facing_cubes();
        let a_px = node_at(&graph, a, 0);
        let b_px = node_at(&graph, b, 0);
        assert!(!graph.can_connect(a_px, b_px));
    }

    #[test]
    fn no_self_connection() {
        let (graph, a, _) = two_facing_cubes();
        let px = node_at(&graph, a, 0);
        let nx = node_at(&graph, a, 1);
        assert!(!graph.can_connect(px, nx));
    }

    #[test]
    fn wheels_are_exempt_from_facing() {
        let mut graph = PartGraph::new();
        let frame = graph.spawn(&cube_prefab("cube"), pose_at(0.0, 0.0, 0.0));
        let wheel = graph.spawn(&wheel_prefab(), pose_at(1.0, 0.0, 0.0));
        let frame_px = node_at(&graph, frame, 0);
        let axle = node_at(&graph, wheel, 0);
        // Axle points +X too: same-facing, but the wheel is exempt.
        assert!(graph.can_connect(frame_px, axle));
    }

    #[test]
    fn allow_list_blocks_disallowed_kinds() {
        let mut rules = ConnectionRules::default();
        rules
            .allowed_kinds
            .insert(PartType::Frame, BTreeSet::from([NodeKind::Axle]));
        let mut graph = PartGraph::with_config(rules, &SnapConfig::default(), MassLimits::default());
        let mut prefab = cube_prefab("cube");
        for spec in &mut prefab.nodes {
            spec.kind = NodeKind::Structural;
        }
        let a = graph.spawn(&prefab, pose_at(0.0, 0.0, 0.0));
        let b = graph.spawn(&prefab, pose_at(1.0, 0.0, 0.0));
        assert!(!graph.can_connect(node_at(&graph, a, 0), node_at(&graph, b, 1)));
    }

    #[test]
    fn can_connect_matches_hypothetical_check_at_current_pose() {
        let (graph, a, b) = two_facing_cubes();
        let a_pose = graph.part(a).unwrap().pose;
        for i in 0..6 {
            for j in 0..6 {
                let (x, y) = (node_at(&graph, a, i), node_at(&graph, b, j));
                assert_eq!(graph.can_connect(x, y), graph.can_connect_at(x, &a_pose, y));
            }
        }
        // Turned half a revolution, a's +X face points the same way as b's -X.
        let turned = Isometry3::from_parts(
            a_pose.translation,
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::PI),
        );
        let (a_px, b_nx) = (node_at(&graph, a, 0), node_at(&graph, b, 1));
        assert!(graph.can_connect(a_px, b_nx));
        assert!(!graph.can_connect_at(a_px, &turned, b_nx));
    }

    #[test]
    fn incompatible_kinds_rejected() {
        let mut graph = PartGraph::new();
        let mut axle_only = cube_prefab("axle");
        for spec in &mut axle_only.nodes {
            spec.kind = NodeKind::Axle;
            spec.compatible = NodeKind::Mount;
        }
        let mut hitch = cube_prefab("hitch");
        for spec in &mut hitch.nodes {
            spec.kind = NodeKind::Hitch;
            spec.compatible = NodeKind::Hitch;
        }
        let a = graph.spawn(&axle_only, pose_at(0.0, 0.0, 0.0));
        let b = graph.spawn(&hitch, pose_at(1.0, 0.0, 0.0));
        assert!(!graph.can_connect(node_at(&graph, a, 0), node_at(&graph, b, 1)));
    }

    // -----------------------------------------------------------------------
    // connect / disconnect
    // -----------------------------------------------------------------------

    #[test]
    fn connect_is_symmetric() {
        let (mut graph, a, b) = two_facing_cubes();
        let x = node_at(&graph, a, 0);
        let y = node_at(&graph, b, 1);
        assert!(graph.connect(x, y));
        assert_eq!(graph.partner(x), Some(y));
        assert_eq!(graph.partner(y), Some(x));
        assert!(graph.node(x).unwrap().is_occupied());
        assert!(graph.node(y).unwrap().is_occupied());
        assert!(graph.asymmetric_nodes().is_empty());
        assert_eq!(graph.connections().len(), 1);
    }

    #[test]
    fn connect_refused_leaves_state_untouched() {
        let (mut graph, a, b) = two_facing_cubes();
        let x = node_at(&graph, a, 0);
        let y = node_at(&graph, b, 0);
        assert!(!graph.connect(x, y));
        assert!(!graph.node(x).unwrap().is_occupied());
        assert!(!graph.node(y).unwrap().is_occupied());
    }

    #[test]
    fn occupied_nodes_cannot_reconnect() {
        let mut graph = PartGraph::new();
        let a = graph.spawn(&cube_prefab("cube"), pose_at(0.0, 0.0, 0.0));
        let b = graph.spawn(&cube_prefab("cube"), pose_at(1.0, 0.0, 0.0));
        let c = graph.spawn(&cube_prefab("cube"), pose_at(1.0, 0.0, 0.0));
        let x = node_at(&graph, a, 0);
        assert!(graph.connect(x, node_at(&graph, b, 1)));
        assert!(!graph.connect(x, node_at(&graph, c, 1)));
    }

    #[test]
    fn disconnect_clears_both_sides_and_is_idempotent() {
        let (mut graph, a, b) = two_facing_cubes();
        let x = node_at(&graph, a, 0);
        let y = node_at(&graph, b, 1);
        graph.connect(x, y);
        graph.disconnect(x);
        assert_eq!(graph.partner(x), None);
        assert_eq!(graph.partner(y), None);
        graph.disconnect(x);
        assert_eq!(graph.partner(y), None);
        assert!(graph.asymmetric_nodes().is_empty());
        assert!(graph.diagnostics().is_empty());
    }

    #[test]
    fn disconnect_diagnoses_asymmetric_partner() {
        let mut graph = PartGraph::new();
        let a = graph.spawn(&cube_prefab("cube"), pose_at(0.0, 0.0, 0.0));
        let b = graph.spawn(&cube_prefab("cube"), pose_at(1.0, 0.0, 0.0));
        let c = graph.spawn(&cube_prefab("cube"), pose_at(-1.0, 0.0, 0.0));
        let x = node_at(&graph, a, 0);
        let y = node_at(&graph, b, 1);
        let z = node_at(&graph, c, 0);
        graph.connect(x, y);
        graph.corrupt_one_side(y, Some(z));
        graph.disconnect(x);
        assert_eq!(graph.partner(x), None);
        // Partner is left as-is; the violation is reported.
        assert_eq!(graph.partner(y), Some(z));
        assert_eq!(graph.diagnostics().count(DiagnosticKind::AsymmetricConnection), 1);
    }

    #[test]
    fn owner_reassignment_refused() {
        let (mut graph, a, b) = two_facing_cubes();
        let x = node_at(&graph, a, 0);
        assert!(graph.assign_node_owner(x, a));
        assert!(!graph.assign_node_owner(x, b));
        assert_eq!(graph.owner_of(x), Some(a));
        assert_eq!(graph.diagnostics().count(DiagnosticKind::OwnerReassignment), 1);
    }

    #[test]
    fn remove_part_severs_connections() {
        let (mut graph, a, b) = two_facing_cubes();
        let x = node_at(&graph, a, 0);
        let y = node_at(&graph, b, 1);
        graph.connect(x, y);
        let severed = graph.remove(a).unwrap();
        assert_eq!(severed, vec![(x, y)]);
        assert!(!graph.contains_part(a));
        assert_eq!(graph.partner(y), None);
        assert!(!graph.node(y).unwrap().is_occupied());
        assert_eq!(graph.node_count(), 6);
    }

    #[test]
    fn removing_root_promotes_next_core() {
        let mut graph = PartGraph::new();
        let c1 = graph.spawn(&core_prefab(), pose_at(0.0, 0.0, 0.0));
        let c2 = graph.spawn(&core_prefab(), pose_at(3.0, 0.0, 0.0));
        assert_eq!(graph.root_part(), Some(c1));
        graph.remove(c1);
        assert_eq!(graph.root_part(), Some(c2));
        assert_eq!(graph.parts_of_type(PartType::Core).count(), 1);
    }

    // -----------------------------------------------------------------------
    // Node cache / lifecycle / surface normals
    // -----------------------------------------------------------------------

    #[test]
    fn stale_node_cache_is_rescanned() {
        let (mut graph, a, _) = two_facing_cubes();
        let victim = node_at(&graph, a, 2);
        graph.destroy_node_raw(victim);
        let nodes = graph.nodes_of(a);
        assert_eq!(nodes.len(), 5);
        assert!(!nodes.contains(&victim));
        assert_eq!(graph.diagnostics().count(DiagnosticKind::StaleNodeCache), 1);
        // Second observation is clean.
        assert_eq!(graph.nodes_of(a).len(), 5);
        assert_eq!(graph.diagnostics().count(DiagnosticKind::StaleNodeCache), 1);
    }

    #[test]
    fn lifecycle_refusals_are_diagnosed() {
        let (mut graph, a, _) = two_facing_cubes();
        assert!(!graph.set_simulating(a, true));
        assert!(graph.commit_placement(a, false));
        assert!(!graph.commit_placement(a, false));
        assert!(!graph.begin_placement(a, false));
        assert_eq!(graph.diagnostics().count(DiagnosticKind::LifecycleRefused), 3);
    }

    #[test]
    fn global_simulation_toggle() {
        let (mut graph, a, b) = two_facing_cubes();
        graph.commit_placement(a, false);
        graph.set_simulation_enabled(true);
        assert_eq!(graph.part(a).unwrap().state(), PartState::Simulating);
        assert_eq!(graph.part(b).unwrap().state(), PartState::Unplaced);
        graph.set_simulation_enabled(false);
        assert_eq!(graph.part(a).unwrap().state(), PartState::Placed);
    }

    #[test]
    fn surface_normal_match_uses_world_direction() {
        let (graph, a, _) = two_facing_cubes();
        let px = node_at(&graph, a, 0);
        assert!(graph.matches_surface_normal(px, &Vector3::x()));
        assert!(!graph.matches_surface_normal(px, &Vector3::y()));
    }

    #[test]
    fn generic_node_spec_defaults() {
        let spec: NodeSpec = serde_json::from_str(
            r#"{"kind": "Generic", "position": [0.0, 0.0, 0.0], "direction": [0.0, 1.0, 0.0]}"#,
        )
        .unwrap();
        assert_eq!(spec.compatible, NodeKind::Generic);
    }
}
