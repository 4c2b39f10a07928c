//! Snap resolution: where should the part being placed attach?
//!
//! Two paths exist. With a hovered (preferred) target part the resolver only
//! looks at that part and picks the closest admissible node pair, first
//! among target nodes facing the hovered surface and then among all of them.
//! Without one it gathers every part near the desired point and ranks
//! admissible pairs by support count, then by distance.
//!
//! Support count is a greedy, non-backtracking match: after shifting the
//! whole part so the primary pair coincides, each remaining free preview node
//! (in node order) claims the closest still-unclaimed compatible target node
//! within snap radius. This can under-count the true maximum matching in
//! dense clusters.

use crate::index::{CandidateBuffer, SpatialIndex};
use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use snapwright_core::config::SnapConfig;
use snapwright_core::diagnostics::Diagnostic;
use snapwright_core::graph::PartGraph;
use snapwright_core::id::{NodeId, PartId};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Inputs for one resolution step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapRequest {
    /// Where the driver wants the part's root.
    pub desired: Point3<f64>,
    /// Part under the cursor, if any.
    pub hovered: Option<PartId>,
    /// World normal of the hovered surface, if known.
    pub normal: Option<Vector3<f64>>,
}

impl SnapRequest {
    pub fn at(desired: Point3<f64>) -> Self {
        Self {
            desired,
            hovered: None,
            normal: None,
        }
    }

    pub fn hovering(desired: Point3<f64>, part: PartId, normal: Option<Vector3<f64>>) -> Self {
        Self {
            desired,
            hovered: Some(part),
            normal,
        }
    }
}

/// Outcome of one resolution step. Only the latest one is meaningful.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    pub valid: bool,
    pub preview_node: Option<NodeId>,
    pub target_node: Option<NodeId>,
    /// Root position that puts the preview node on the target node; the
    /// desired point when no snap was found.
    pub snapped_position: Point3<f64>,
    pub distance: f64,
    pub support: u32,
}

impl SnapResult {
    pub fn none(desired: Point3<f64>) -> Self {
        Self {
            valid: false,
            preview_node: None,
            target_node: None,
            snapped_position: desired,
            distance: f64::INFINITY,
            support: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PreviewNode {
    node: NodeId,
    /// Offset from the part root in world orientation.
    offset: Vector3<f64>,
}

#[derive(Debug, Clone, Copy)]
struct TargetNode {
    node: NodeId,
    position: Point3<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    preview: usize,
    target: usize,
    distance: f64,
    support: u32,
}

// ---------------------------------------------------------------------------
// SnapResolver
// ---------------------------------------------------------------------------

/// Stateless between steps apart from reusable scratch buffers.
#[derive(Debug, Clone)]
pub struct SnapResolver {
    config: SnapConfig,
    candidates: CandidateBuffer,
    previews: Vec<PreviewNode>,
    targets: Vec<TargetNode>,
    claimed: Vec<bool>,
}

impl SnapResolver {
    pub fn new(config: SnapConfig) -> Self {
        let candidates = CandidateBuffer::new(config.max_candidates);
        Self {
            config,
            candidates,
            previews: Vec::new(),
            targets: Vec::new(),
            claimed: Vec::new(),
        }
    }

    pub fn config(&self) -> &SnapConfig {
        &self.config
    }

    /// Find the best snap for `part` given `request`.
    ///
    /// Parts in `ignored` are never targets. Returns an invalid result when
    /// no admissible node pair exists.
    pub fn resolve(
        &mut self,
        graph: &mut PartGraph,
        index: &SpatialIndex,
        part: PartId,
        request: &SnapRequest,
        ignored: &[PartId],
    ) -> SnapResult {
        let Some(rotation) = graph.part(part).map(|p| p.pose.rotation) else {
            graph.report(Diagnostic::UnknownPart { part });
            return SnapResult::none(request.desired);
        };
        self.collect_previews(graph, part, &rotation);
        if self.previews.is_empty() {
            return SnapResult::none(request.desired);
        }

        let hovered = request.hovered.filter(|&h| {
            h != part
                && !ignored.contains(&h)
                && graph
                    .part(h)
                    .is_some_and(|p| p.is_visible() && p.body().collision_enabled)
        });

        match hovered {
            Some(target_part) => {
                self.collect_targets(graph, &[target_part]);
                if let Some(normal) = request.normal {
                    let best = self.closest_pair(graph, request.desired, &rotation, Some(&normal));
                    if let Some(best) = best {
                        return self.finish(graph, request.desired, &rotation, best);
                    }
                }
                match self.closest_pair(graph, request.desired, &rotation, None) {
                    Some(best) => self.finish(graph, request.desired, &rotation, best),
                    None => SnapResult::none(request.desired),
                }
            }
            None => {
                let radius = self.config.snap_radius + self.reach();
                if !index.query_radius(&request.desired, radius, &mut self.candidates) {
                    graph.report(Diagnostic::CandidateOverflow {
                        capacity: self.candidates.capacity(),
                    });
                }
                let parts: Vec<PartId> = self
                    .candidates
                    .as_slice()
                    .iter()
                    .copied()
                    .filter(|&c| c != part && !ignored.contains(&c))
                    .collect();
                self.collect_targets(graph, &parts);
                match self.best_supported_pair(graph, request.desired, &rotation) {
                    Some(best) => self.build_result(request.desired, best),
                    None => SnapResult::none(request.desired),
                }
            }
        }
    }

    /// Node pairs, other than already connected ones, that coincide within
    /// `tolerance` with `part` at its current pose. Greedy in node order,
    /// each side used at most once.
    pub fn coincident_pairs(
        &mut self,
        graph: &mut PartGraph,
        index: &SpatialIndex,
        part: PartId,
        tolerance: f64,
        ignored: &[PartId],
    ) -> Vec<(NodeId, NodeId)> {
        let Some(pose) = graph.part(part).map(|p| p.pose) else {
            return Vec::new();
        };
        self.collect_previews(graph, part, &pose.rotation);
        let root = Point3::from(pose.translation.vector);
        index.query_radius(&root, tolerance + self.reach(), &mut self.candidates);
        let parts: Vec<PartId> = self
            .candidates
            .as_slice()
            .iter()
            .copied()
            .filter(|&c| c != part && !ignored.contains(&c))
            .collect();
        self.collect_targets(graph, &parts);

        self.claimed.clear();
        self.claimed.resize(self.targets.len(), false);
        let mut pairs = Vec::new();
        for preview in &self.previews {
            let position = root + preview.offset;
            let mut best: Option<(usize, f64)> = None;
            for (ti, target) in self.targets.iter().enumerate() {
                if self.claimed[ti] {
                    continue;
                }
                let d = (target.position - position).norm();
                if d > tolerance || best.is_some_and(|(_, bd)| d >= bd) {
                    continue;
                }
                if graph.can_connect_at(preview.node, &pose, target.node) {
                    best = Some((ti, d));
                }
            }
            if let Some((ti, _)) = best {
                self.claimed[ti] = true;
                pairs.push((preview.node, self.targets[ti].node));
            }
        }
        pairs
    }

    // -----------------------------------------------------------------------
    // Scratch collection
    // -----------------------------------------------------------------------

    fn collect_previews(&mut self, graph: &mut PartGraph, part: PartId, rotation: &UnitQuaternion<f64>) {
        self.previews.clear();
        for node_id in graph.nodes_of(part) {
            let Some(node) = graph.node(node_id) else {
                continue;
            };
            if node.is_occupied() {
                continue;
            }
            self.previews.push(PreviewNode {
                node: node_id,
                offset: rotation * node.local_position.coords,
            });
        }
    }

    fn collect_targets(&mut self, graph: &mut PartGraph, parts: &[PartId]) {
        self.targets.clear();
        for &target_part in parts {
            for node_id in graph.nodes_of(target_part) {
                let free = graph.node(node_id).is_some_and(|n| !n.is_occupied());
                if !free {
                    continue;
                }
                if let Some(position) = graph.node_world_position(node_id) {
                    self.targets.push(TargetNode {
                        node: node_id,
                        position,
                    });
                }
            }
        }
    }

    /// Farthest preview node from the part root.
    fn reach(&self) -> f64 {
        self.previews
            .iter()
            .map(|p| p.offset.norm())
            .fold(0.0, f64::max)
    }

    // -----------------------------------------------------------------------
    // Scoring
    // -----------------------------------------------------------------------

    fn admissible(
        &self,
        graph: &PartGraph,
        desired: Point3<f64>,
        rotation: &UnitQuaternion<f64>,
        pi: usize,
        ti: usize,
    ) -> Option<f64> {
        let preview = &self.previews[pi];
        let target = &self.targets[ti];
        let distance = (target.position - (desired + preview.offset)).norm();
        if distance > self.config.snap_radius {
            return None;
        }
        let pose = root_pose(desired, rotation);
        graph
            .can_connect_at(preview.node, &pose, target.node)
            .then_some(distance)
    }

    /// Minimal-distance admissible pair, optionally restricted to target
    /// nodes facing `normal`. Earlier pairs win ties.
    fn closest_pair(
        &self,
        graph: &PartGraph,
        desired: Point3<f64>,
        rotation: &UnitQuaternion<f64>,
        normal: Option<&Vector3<f64>>,
    ) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        for ti in 0..self.targets.len() {
            if let Some(n) = normal
                && !graph.matches_surface_normal(self.targets[ti].node, n)
            {
                continue;
            }
            for pi in 0..self.previews.len() {
                let Some(distance) = self.admissible(graph, desired, rotation, pi, ti) else {
                    continue;
                };
                if best.is_none_or(|b| distance < b.distance) {
                    best = Some(Candidate {
                        preview: pi,
                        target: ti,
                        distance,
                        support: 0,
                    });
                }
            }
        }
        best
    }

    /// Pair with the greatest support count, ties broken by distance.
    fn best_supported_pair(
        &mut self,
        graph: &PartGraph,
        desired: Point3<f64>,
        rotation: &UnitQuaternion<f64>,
    ) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        for ti in 0..self.targets.len() {
            for pi in 0..self.previews.len() {
                let Some(distance) = self.admissible(graph, desired, rotation, pi, ti) else {
                    continue;
                };
                let support = self.support(graph, desired, rotation, pi, ti);
                let better = match best {
                    None => true,
                    Some(b) => support > b.support || (support == b.support && distance < b.distance),
                };
                if better {
                    best = Some(Candidate {
                        preview: pi,
                        target: ti,
                        distance,
                        support,
                    });
                }
            }
        }
        best
    }

    /// Additional pairings the snap of (`pi`, `ti`) would create.
    fn support(
        &mut self,
        graph: &PartGraph,
        desired: Point3<f64>,
        rotation: &UnitQuaternion<f64>,
        pi: usize,
        ti: usize,
    ) -> u32 {
        let shift = self.targets[ti].position - (desired + self.previews[pi].offset);
        let root = desired + shift;
        let pose = root_pose(root, rotation);

        self.claimed.clear();
        self.claimed.resize(self.targets.len(), false);
        self.claimed[ti] = true;

        let mut count = 0;
        for (qi, preview) in self.previews.iter().enumerate() {
            if qi == pi {
                continue;
            }
            let position = root + preview.offset;
            let mut best: Option<(usize, f64)> = None;
            for (ui, target) in self.targets.iter().enumerate() {
                if self.claimed[ui] {
                    continue;
                }
                let d = (target.position - position).norm();
                if d > self.config.snap_radius || best.is_some_and(|(_, bd)| d >= bd) {
                    continue;
                }
                if graph.can_connect_at(preview.node, &pose, target.node) {
                    best = Some((ui, d));
                }
            }
            if let Some((ui, _)) = best {
                self.claimed[ui] = true;
                count += 1;
            }
        }
        count
    }

    fn finish(
        &mut self,
        graph: &PartGraph,
        desired: Point3<f64>,
        rotation: &UnitQuaternion<f64>,
        mut best: Candidate,
    ) -> SnapResult {
        best.support = self.support(graph, desired, rotation, best.preview, best.target);
        self.build_result(desired, best)
    }

    fn build_result(&self, desired: Point3<f64>, best: Candidate) -> SnapResult {
        let preview = &self.previews[best.preview];
        let target = &self.targets[best.target];
        let result = SnapResult {
            valid: true,
            preview_node: Some(preview.node),
            target_node: Some(target.node),
            snapped_position: target.position - preview.offset,
            distance: best.distance,
            support: best.support,
        };
        tracing::trace!(
            ?desired,
            snapped = ?result.snapped_position,
            distance = result.distance,
            support = result.support,
            "snap resolved"
        );
        result
    }
}

impl Default for SnapResolver {
    fn default() -> Self {
        Self::new(SnapConfig::default())
    }
}

fn root_pose(root: Point3<f64>, rotation: &UnitQuaternion<f64>) -> Isometry3<f64> {
    Isometry3::from_parts(Translation3::from(root.coords), *rotation)
}
