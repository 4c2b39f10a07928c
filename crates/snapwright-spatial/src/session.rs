//! Interactive placement: preview, resolve, commit, undo.
//!
//! A [`PlacementSession`] is what an input driver talks to. It owns the
//! spatial index, the snap resolver and the validator, and remembers which
//! parts it committed so they can be undone together with their joints.

use crate::index::SpatialIndex;
use crate::mirror::MirrorPlane;
use crate::snap::{SnapRequest, SnapResolver, SnapResult};
use crate::validator::PlacementValidator;
use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use snapwright_core::config::{BuilderConfig, JointParams, SnapConfig};
use snapwright_core::graph::PartGraph;
use snapwright_core::id::{JointHandle, NodeId, PartId};
use snapwright_core::part::PartState;
use snapwright_core::physics::JointBackend;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Errors from session operations. None of them change the graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("no part is being previewed")]
    NoPreview,
    #[error("part {0:?} does not exist")]
    UnknownPart(PartId),
    #[error("part {0:?} is already placed")]
    NotUnplaced(PartId),
    #[error("preview and mirror twin must be different parts")]
    TwinIsPreview,
    #[error("mirror plane normal must be non-zero")]
    DegeneratePlane,
    #[error("preview has not been resolved since it last changed")]
    NotResolved,
    #[error("the most recent placement check failed")]
    InvalidPlacement,
    #[error("nothing to undo")]
    NothingToUndo,
}

/// State of the mirrored twin after a resolve step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MirrorState {
    /// The source is within the dead zone of the plane; the twin is hidden.
    Suppressed,
    Active {
        snap: SnapResult,
        placement_valid: bool,
    },
}

/// Result of one resolve step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewState {
    pub snap: SnapResult,
    pub placement_valid: bool,
    pub mirror: Option<MirrorState>,
}

/// What a successful commit did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Committed parts: the preview, then the twin if it was placed too.
    pub parts: Vec<PartId>,
    pub connections: Vec<(NodeId, NodeId)>,
    pub joints: Vec<JointHandle>,
    /// A twin that could not be placed and was removed.
    pub discarded_twin: Option<PartId>,
}

#[derive(Debug, Clone, Copy)]
struct Preview {
    part: PartId,
    twin: Option<(PartId, MirrorPlane)>,
    last: Option<PreviewState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JointRecord {
    handle: JointHandle,
    part_a: PartId,
    part_b: PartId,
}

// ---------------------------------------------------------------------------
// PlacementSession
// ---------------------------------------------------------------------------

/// Drives one part (and optionally its mirror twin) from preview to commit.
#[derive(Debug)]
pub struct PlacementSession {
    snap_config: SnapConfig,
    joint_params: JointParams,
    index: SpatialIndex,
    resolver: SnapResolver,
    validator: PlacementValidator,
    preview: Option<Preview>,
    undo_stack: Vec<Vec<PartId>>,
    joints: Vec<JointRecord>,
}

impl Default for PlacementSession {
    fn default() -> Self {
        Self::new(&BuilderConfig::default())
    }
}

impl PlacementSession {
    pub fn new(config: &BuilderConfig) -> Self {
        Self {
            snap_config: config.snap.clone(),
            joint_params: config.joint,
            index: SpatialIndex::new(),
            resolver: SnapResolver::new(config.snap.clone()),
            validator: PlacementValidator::new(config.snap.overlap_epsilon),
            preview: None,
            undo_stack: Vec::new(),
            joints: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Preview
    // -----------------------------------------------------------------------

    /// Start previewing `part`: it becomes kinematic and non-colliding.
    pub fn begin_preview(&mut self, graph: &mut PartGraph, part: PartId) -> Result<(), SessionError> {
        ensure_unplaced(graph, part)?;
        if !graph.begin_placement(part, false) {
            return Err(SessionError::NotUnplaced(part));
        }
        self.preview = Some(Preview {
            part,
            twin: None,
            last: None,
        });
        Ok(())
    }

    /// Start previewing `part` together with a `twin` mirrored across the
    /// plane through `plane_point` with `plane_normal`.
    pub fn begin_mirrored_preview(
        &mut self,
        graph: &mut PartGraph,
        part: PartId,
        twin: PartId,
        plane_point: Point3<f64>,
        plane_normal: Vector3<f64>,
    ) -> Result<(), SessionError> {
        if part == twin {
            return Err(SessionError::TwinIsPreview);
        }
        // Both parts are checked before either is touched.
        for id in [part, twin] {
            ensure_unplaced(graph, id)?;
        }
        let plane = MirrorPlane::new(plane_point, plane_normal).ok_or(SessionError::DegeneratePlane)?;
        for id in [part, twin] {
            if !graph.begin_placement(id, false) {
                return Err(SessionError::NotUnplaced(id));
            }
        }
        self.preview = Some(Preview {
            part,
            twin: Some((twin, plane)),
            last: None,
        });
        Ok(())
    }

    pub fn preview_part(&self) -> Option<PartId> {
        self.preview.map(|p| p.part)
    }

    pub fn last_state(&self) -> Option<PreviewState> {
        self.preview.and_then(|p| p.last)
    }

    /// Set the orientation of the preview. Invalidates the last resolve.
    pub fn rotate_preview(
        &mut self,
        graph: &mut PartGraph,
        rotation: UnitQuaternion<f64>,
    ) -> Result<(), SessionError> {
        let preview = self.preview.as_mut().ok_or(SessionError::NoPreview)?;
        let part = graph
            .part_mut(preview.part)
            .ok_or(SessionError::UnknownPart(preview.part))?;
        part.pose.rotation = rotation;
        preview.last = None;
        Ok(())
    }

    /// Stop previewing. The parts stay in the graph, unplaced; they belong to
    /// the caller again.
    pub fn cancel(&mut self, graph: &mut PartGraph) -> Vec<PartId> {
        let Some(preview) = self.preview.take() else {
            return Vec::new();
        };
        let mut parts = vec![preview.part];
        if let Some((twin, _)) = preview.twin {
            graph.set_visible(twin, true);
            parts.push(twin);
        }
        parts
    }

    // -----------------------------------------------------------------------
    // Resolve
    // -----------------------------------------------------------------------

    /// One interaction step: snap the preview toward `desired`, move it to
    /// the snapped (or desired) position and validate the result.
    pub fn resolve(
        &mut self,
        graph: &mut PartGraph,
        desired: Point3<f64>,
        hovered: Option<PartId>,
        normal: Option<Vector3<f64>>,
    ) -> Result<PreviewState, SessionError> {
        let preview = self.preview.ok_or(SessionError::NoPreview)?;
        if !graph.contains_part(preview.part) {
            return Err(SessionError::UnknownPart(preview.part));
        }
        let twin = preview.twin.map(|(t, _)| t);
        let ignore_twin: Vec<PartId> = twin.into_iter().collect();

        self.index.rebuild(graph);
        let request = SnapRequest {
            desired,
            hovered,
            normal,
        };
        let snap = self
            .resolver
            .resolve(graph, &self.index, preview.part, &request, &ignore_twin);
        move_root(graph, preview.part, snap.snapped_position);
        let placement_valid =
            self.validator
                .validate(graph, &self.index, preview.part, &ignore_twin);

        let mirror = preview
            .twin
            .map(|(twin, plane)| self.resolve_twin(graph, preview.part, twin, &plane));

        let state = PreviewState {
            snap,
            placement_valid,
            mirror,
        };
        if let Some(p) = self.preview.as_mut() {
            p.last = Some(state);
        }
        Ok(state)
    }

    fn resolve_twin(
        &mut self,
        graph: &mut PartGraph,
        primary: PartId,
        twin: PartId,
        plane: &MirrorPlane,
    ) -> MirrorState {
        let Some(primary_pose) = graph.part(primary).map(|p| p.pose) else {
            return MirrorState::Suppressed;
        };
        let Some(mirrored) = plane.mirrored(&primary_pose, self.snap_config.mirror_dead_zone) else {
            graph.set_visible(twin, false);
            return MirrorState::Suppressed;
        };
        graph.set_visible(twin, true);
        graph.set_pose(twin, mirrored);

        // Hide the primary so the twin never targets it.
        graph.set_visible(primary, false);
        self.index.rebuild(graph);
        let desired = Point3::from(mirrored.translation.vector);
        let snap = self.resolver.resolve(
            graph,
            &self.index,
            twin,
            &SnapRequest::at(desired),
            &[primary],
        );
        move_root(graph, twin, snap.snapped_position);
        let placement_valid = self.validator.validate(graph, &self.index, twin, &[primary]);
        graph.set_visible(primary, true);

        MirrorState::Active {
            snap,
            placement_valid,
        }
    }

    // -----------------------------------------------------------------------
    // Commit
    // -----------------------------------------------------------------------

    /// Place the preview (and twin) at the last resolved pose.
    ///
    /// Connects the snapped node pair and every other coincident compatible
    /// pair, asks `backend` for one joint per connection, and commits the
    /// part. A suppressed or invalid twin is removed instead of committed.
    pub fn commit(
        &mut self,
        graph: &mut PartGraph,
        backend: &mut dyn JointBackend,
    ) -> Result<CommitOutcome, SessionError> {
        let preview = self.preview.ok_or(SessionError::NoPreview)?;
        let state = preview.last.ok_or(SessionError::NotResolved)?;
        if !state.placement_valid {
            return Err(SessionError::InvalidPlacement);
        }
        ensure_unplaced(graph, preview.part)?;
        let twin = preview.twin.map(|(t, _)| t);
        let places_twin = matches!(
            state.mirror,
            Some(MirrorState::Active {
                placement_valid: true,
                ..
            })
        );
        if let Some(twin) = twin
            && places_twin
            && graph.contains_part(twin)
        {
            ensure_unplaced(graph, twin)?;
        }

        let mut outcome = CommitOutcome {
            parts: Vec::new(),
            connections: Vec::new(),
            joints: Vec::new(),
            discarded_twin: None,
        };
        let ignore_twin: Vec<PartId> = twin.into_iter().collect();

        self.index.rebuild(graph);
        self.place(graph, backend, preview.part, &state.snap, &ignore_twin, &mut outcome);

        if let Some(twin) = twin {
            match state.mirror {
                Some(MirrorState::Active {
                    snap,
                    placement_valid: true,
                }) if graph.contains_part(twin) => {
                    self.index.rebuild(graph);
                    self.place(graph, backend, twin, &snap, &[preview.part], &mut outcome);
                }
                _ => {
                    graph.remove(twin);
                    outcome.discarded_twin = Some(twin);
                }
            }
        }

        self.undo_stack.push(outcome.parts.clone());
        self.preview = None;
        tracing::debug!(
            parts = outcome.parts.len(),
            connections = outcome.connections.len(),
            "placement committed"
        );
        Ok(outcome)
    }

    fn place(
        &mut self,
        graph: &mut PartGraph,
        backend: &mut dyn JointBackend,
        part: PartId,
        snap: &SnapResult,
        ignored: &[PartId],
        outcome: &mut CommitOutcome,
    ) {
        let mut made = Vec::new();
        if snap.valid
            && let (Some(a), Some(b)) = (snap.preview_node, snap.target_node)
            && graph.connect(a, b)
        {
            made.push((a, b));
        }
        let tolerance = self.snap_config.connect_tolerance;
        for (a, b) in self
            .resolver
            .coincident_pairs(graph, &self.index, part, tolerance, ignored)
        {
            if graph.connect(a, b) {
                made.push((a, b));
            }
        }

        for &(a, b) in &made {
            if let Some(handle) = self.create_joint(graph, backend, a, b) {
                outcome.joints.push(handle);
            }
        }
        graph.commit_placement(part, graph.simulation_enabled());
        outcome.parts.push(part);
        outcome.connections.extend(made);
    }

    fn create_joint(
        &mut self,
        graph: &PartGraph,
        backend: &mut dyn JointBackend,
        a: NodeId,
        b: NodeId,
    ) -> Option<JointHandle> {
        let (na, nb) = (graph.node(a)?, graph.node(b)?);
        let (part_a, part_b) = (na.owner()?, nb.owner()?);
        let handle = backend.create_fixed_joint(
            part_a,
            na.local_position,
            part_b,
            nb.local_position,
            &self.joint_params,
        );
        self.joints.push(JointRecord {
            handle,
            part_a,
            part_b,
        });
        Some(handle)
    }

    // -----------------------------------------------------------------------
    // Undo / delete
    // -----------------------------------------------------------------------

    /// Remove the parts placed by the most recent commit.
    pub fn undo(
        &mut self,
        graph: &mut PartGraph,
        backend: &mut dyn JointBackend,
    ) -> Result<Vec<PartId>, SessionError> {
        let parts = self.undo_stack.pop().ok_or(SessionError::NothingToUndo)?;
        let mut removed = Vec::with_capacity(parts.len());
        for part in parts {
            if self.delete_part(graph, backend, part) {
                removed.push(part);
            }
        }
        Ok(removed)
    }

    /// Delete a part: remove its joints, sever its connections, drop it from
    /// the graph. Returns `false` if the part no longer exists.
    pub fn delete_part(
        &mut self,
        graph: &mut PartGraph,
        backend: &mut dyn JointBackend,
        part: PartId,
    ) -> bool {
        if !graph.contains_part(part) {
            return false;
        }
        self.joints.retain(|j| {
            if j.part_a == part || j.part_b == part {
                backend.remove_joint(j.handle);
                false
            } else {
                true
            }
        });
        if self.preview.is_some_and(|p| p.part == part) {
            self.preview = None;
        }
        graph.remove(part).is_some()
    }

    /// Joints the session currently tracks.
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Forget all joints and undo history, e.g. after loading a new graph.
    pub fn reset(&mut self) {
        self.preview = None;
        self.undo_stack.clear();
        self.joints.clear();
    }
}

fn ensure_unplaced(graph: &PartGraph, part: PartId) -> Result<(), SessionError> {
    match graph.part(part).map(|p| p.state()) {
        None => Err(SessionError::UnknownPart(part)),
        Some(PartState::Unplaced) => Ok(()),
        Some(_) => Err(SessionError::NotUnplaced(part)),
    }
}

fn move_root(graph: &mut PartGraph, part: PartId, root: Point3<f64>) {
    if let Some(p) = graph.part_mut(part) {
        p.pose = Isometry3::from_parts(Translation3::from(root.coords), p.pose.rotation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapwright_core::part::PartState;
    use snapwright_core::test_utils::*;

    fn world() -> (PartGraph, PartId) {
        let mut graph = PartGraph::new();
        let core = placed(&mut graph, &core_prefab(), pose_at(0.0, 0.0, 0.0));
        (graph, core)
    }

    // -----------------------------------------------------------------------
    // Preview / resolve
    // -----------------------------------------------------------------------

    #[test]
    fn resolve_without_preview_fails() {
        let (mut graph, _) = world();
        let mut session = PlacementSession::default();
        assert_eq!(
            session.resolve(&mut graph, Point3::origin(), None, None),
            Err(SessionError::NoPreview)
        );
    }

    #[test]
    fn resolve_moves_preview_to_snapped_position() {
        let (mut graph, _) = world();
        let cube = graph.spawn(&cube_prefab("cube"), pose_at(9.0, 9.0, 9.0));
        let mut session = PlacementSession::default();
        session.begin_preview(&mut graph, cube).unwrap();
        let state = session
            .resolve(&mut graph, Point3::new(1.3, 0.0, 0.0), None, None)
            .unwrap();
        assert!(state.snap.valid);
        assert!(state.placement_valid);
        assert!(state.mirror.is_none());
        let t = graph.part(cube).unwrap().pose.translation.vector;
        assert!((t - Vector3::new(1.0, 0.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn overlapping_preview_cannot_commit() {
        let (mut graph, _) = world();
        let cube = graph.spawn(&cube_prefab("cube"), pose_at(0.0, 0.0, 0.0));
        let mut session = PlacementSession::default();
        let mut backend = RecordingBackend::new();
        session.begin_preview(&mut graph, cube).unwrap();
        assert_eq!(
            session.commit(&mut graph, &mut backend),
            Err(SessionError::NotResolved)
        );
        // No facing node pair is in reach, so the cube stays inside the core.
        let state = session
            .resolve(&mut graph, Point3::new(0.2, 0.0, 0.0), None, None)
            .unwrap();
        assert!(!state.placement_valid);
        assert_eq!(
            session.commit(&mut graph, &mut backend),
            Err(SessionError::InvalidPlacement)
        );
        assert_eq!(graph.part(cube).unwrap().state(), PartState::Unplaced);
    }

    #[test]
    fn cancel_returns_preview_to_caller() {
        let (mut graph, _) = world();
        let cube = graph.spawn(&cube_prefab("cube"), pose_at(5.0, 0.0, 0.0));
        let mut session = PlacementSession::default();
        session.begin_preview(&mut graph, cube).unwrap();
        assert_eq!(session.cancel(&mut graph), vec![cube]);
        assert!(session.preview_part().is_none());
        assert!(graph.contains_part(cube));
    }

    // -----------------------------------------------------------------------
    // Commit / undo
    // -----------------------------------------------------------------------

    #[test]
    fn commit_connects_and_creates_joint() {
        let (mut graph, core) = world();
        let cube = graph.spawn(&cube_prefab("cube"), pose_at(9.0, 9.0, 9.0));
        let mut session = PlacementSession::default();
        let mut backend = RecordingBackend::new();
        session.begin_preview(&mut graph, cube).unwrap();
        session
            .resolve(&mut graph, Point3::new(1.3, 0.0, 0.0), None, None)
            .unwrap();
        let outcome = session.commit(&mut graph, &mut backend).unwrap();

        assert_eq!(outcome.parts, vec![cube]);
        assert_eq!(outcome.connections.len(), 1);
        assert_eq!(backend.joints_between(core, cube), 1);
        let joint = &backend.live[0];
        assert_eq!(joint.anchor_a, Point3::new(-0.5, 0.0, 0.0));
        assert_eq!(joint.anchor_b, Point3::new(0.5, 0.0, 0.0));
        assert_eq!(graph.part(cube).unwrap().state(), PartState::Placed);
        assert!(session.preview_part().is_none());
    }

    #[test]
    fn commit_honours_global_simulation() {
        let (mut graph, _) = world();
        graph.set_simulation_enabled(true);
        let cube = graph.spawn(&cube_prefab("cube"), pose_at(9.0, 9.0, 9.0));
        let mut session = PlacementSession::default();
        session.begin_preview(&mut graph, cube).unwrap();
        session
            .resolve(&mut graph, Point3::new(1.3, 0.0, 0.0), None, None)
            .unwrap();
        session.commit(&mut graph, &mut RecordingBackend::new()).unwrap();
        assert_eq!(graph.part(cube).unwrap().state(), PartState::Simulating);
    }

    #[test]
    fn commit_connects_extra_coincident_pairs() {
        let mut graph = PartGraph::new();
        let low = placed_cube(&mut graph, 0.0, 0.0, 0.0);
        let high = placed_cube(&mut graph, 0.0, 1.0, 0.0);
        let rot = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2);
        let beam = graph.spawn(
            &beam_prefab("beam"),
            Isometry3::from_parts(Translation3::new(5.0, 5.0, 0.0), rot),
        );
        let mut session = PlacementSession::default();
        let mut backend = RecordingBackend::new();
        session.begin_preview(&mut graph, beam).unwrap();
        let state = session
            .resolve(&mut graph, Point3::new(1.0, 0.45, 0.0), None, None)
            .unwrap();
        assert_eq!(state.snap.support, 1);
        let outcome = session.commit(&mut graph, &mut backend).unwrap();
        assert_eq!(outcome.connections.len(), 2);
        assert_eq!(backend.joints_between(beam, low), 1);
        assert_eq!(backend.joints_between(beam, high), 1);
    }

    #[test]
    fn undo_removes_part_and_joints() {
        let (mut graph, core) = world();
        let cube = graph.spawn(&cube_prefab("cube"), pose_at(9.0, 9.0, 9.0));
        let mut session = PlacementSession::default();
        let mut backend = RecordingBackend::new();
        session.begin_preview(&mut graph, cube).unwrap();
        session
            .resolve(&mut graph, Point3::new(1.3, 0.0, 0.0), None, None)
            .unwrap();
        session.commit(&mut graph, &mut backend).unwrap();

        assert_eq!(session.undo(&mut graph, &mut backend).unwrap(), vec![cube]);
        assert!(!graph.contains_part(cube));
        assert!(backend.live.is_empty());
        assert_eq!(backend.removed.len(), 1);
        assert_eq!(session.joint_count(), 0);
        let core_nodes = graph.part(core).unwrap().nodes().to_vec();
        assert!(core_nodes.iter().all(|&n| graph.partner(n).is_none()));
        assert_eq!(
            session.undo(&mut graph, &mut backend),
            Err(SessionError::NothingToUndo)
        );
    }

    // -----------------------------------------------------------------------
    // Mirroring
    // -----------------------------------------------------------------------

    #[test]
    fn mirrored_preview_places_twin_across_plane() {
        let mut graph = PartGraph::new();
        let left = placed_cube(&mut graph, -2.0, 0.0, 0.0);
        let right = placed_cube(&mut graph, 2.0, 0.0, 0.0);
        let a = graph.spawn(&cube_prefab("cube"), pose_at(9.0, 9.0, 9.0));
        let b = graph.spawn(&cube_prefab("cube"), pose_at(9.0, 9.0, 9.0));
        let mut session = PlacementSession::default();
        let mut backend = RecordingBackend::new();
        session
            .begin_mirrored_preview(&mut graph, a, b, Point3::origin(), Vector3::x())
            .unwrap();
        let state = session
            .resolve(&mut graph, Point3::new(2.0, 1.2, 0.0), None, None)
            .unwrap();
        assert!(state.snap.valid);
        let Some(MirrorState::Active { snap, placement_valid }) = state.mirror else {
            panic!("mirror should be active");
        };
        assert!(snap.valid);
        assert!(placement_valid);
        let tb = graph.part(b).unwrap().pose.translation.vector;
        assert!((tb - Vector3::new(-2.0, 1.0, 0.0)).norm() < 1e-9);
        assert!(graph.part(a).unwrap().is_visible());

        let outcome = session.commit(&mut graph, &mut backend).unwrap();
        assert_eq!(outcome.parts, vec![a, b]);
        assert_eq!(backend.joints_between(a, right), 1);
        assert_eq!(backend.joints_between(b, left), 1);

        assert_eq!(session.undo(&mut graph, &mut backend).unwrap(), vec![a, b]);
        assert_eq!(graph.part_count(), 2);
    }

    #[test]
    fn twin_in_dead_zone_is_suppressed_and_discarded() {
        let mut graph = PartGraph::new();
        placed_cube(&mut graph, 0.0, 0.0, 0.0);
        let a = graph.spawn(&cube_prefab("cube"), pose_at(9.0, 9.0, 9.0));
        let b = graph.spawn(&cube_prefab("cube"), pose_at(9.0, 9.0, 9.0));
        let mut session = PlacementSession::default();
        session
            .begin_mirrored_preview(&mut graph, a, b, Point3::origin(), Vector3::x())
            .unwrap();
        let state = session
            .resolve(&mut graph, Point3::new(0.005, 1.2, 0.0), None, None)
            .unwrap();
        assert_eq!(state.mirror, Some(MirrorState::Suppressed));
        assert!(!graph.part(b).unwrap().is_visible());

        let outcome = session.commit(&mut graph, &mut RecordingBackend::new()).unwrap();
        assert_eq!(outcome.parts, vec![a]);
        assert_eq!(outcome.discarded_twin, Some(b));
        assert!(!graph.contains_part(b));
    }

    #[test]
    fn mirrored_preview_rejects_bad_input() {
        let (mut graph, core) = world();
        let mut session = PlacementSession::default();
        assert_eq!(
            session.begin_mirrored_preview(&mut graph, core, core, Point3::origin(), Vector3::x()),
            Err(SessionError::TwinIsPreview)
        );
        let a = graph.spawn(&cube_prefab("cube"), pose_at(5.0, 0.0, 0.0));
        let b = graph.spawn(&cube_prefab("cube"), pose_at(-5.0, 0.0, 0.0));
        assert_eq!(
            session.begin_mirrored_preview(&mut graph, a, b, Point3::origin(), Vector3::zeros()),
            Err(SessionError::DegeneratePlane)
        );
        assert!(session.preview_part().is_none());
    }

    #[test]
    fn mirrored_preview_with_placed_twin_touches_neither_part() {
        let (mut graph, core) = world();
        let fresh = graph.spawn(&cube_prefab("cube"), pose_at(5.0, 0.0, 0.0));
        let mut session = PlacementSession::default();
        assert_eq!(
            session.begin_mirrored_preview(&mut graph, fresh, core, Point3::origin(), Vector3::x()),
            Err(SessionError::NotUnplaced(core))
        );
        assert!(session.preview_part().is_none());
        assert_eq!(graph.part(core).unwrap().state(), PartState::Placed);
        assert_eq!(graph.part(fresh).unwrap().state(), PartState::Unplaced);
    }

    // -----------------------------------------------------------------------
    // Placed parts
    // -----------------------------------------------------------------------

    #[test]
    fn placed_part_cannot_be_previewed() {
        let (mut graph, core) = world();
        let cube = placed_cube(&mut graph, 1.0, 0.0, 0.0);
        assert!(graph.connect(node_at(&graph, core, 0), node_at(&graph, cube, 1)));
        let before = graph.part(cube).unwrap().pose;

        let mut session = PlacementSession::default();
        let mut backend = RecordingBackend::new();
        assert_eq!(
            session.begin_preview(&mut graph, cube),
            Err(SessionError::NotUnplaced(cube))
        );
        assert!(session.preview_part().is_none());
        assert_eq!(
            session.resolve(&mut graph, Point3::new(5.0, 0.0, 0.0), None, None),
            Err(SessionError::NoPreview)
        );
        assert_eq!(
            session.commit(&mut graph, &mut backend),
            Err(SessionError::NoPreview)
        );

        assert_eq!(graph.part(cube).unwrap().pose, before);
        assert_eq!(graph.part(cube).unwrap().state(), PartState::Placed);
        assert_eq!(graph.connections().len(), 1);
        assert_eq!(session.undo_depth(), 0);
        assert!(backend.live.is_empty());
    }

    #[test]
    fn preview_placed_elsewhere_is_not_committed_twice() {
        let (mut graph, _) = world();
        let cube = graph.spawn(&cube_prefab("cube"), pose_at(9.0, 9.0, 9.0));
        let mut session = PlacementSession::default();
        let mut backend = RecordingBackend::new();
        session.begin_preview(&mut graph, cube).unwrap();
        session
            .resolve(&mut graph, Point3::new(1.3, 0.0, 0.0), None, None)
            .unwrap();
        assert!(graph.commit_placement(cube, false));

        assert_eq!(
            session.commit(&mut graph, &mut backend),
            Err(SessionError::NotUnplaced(cube))
        );
        assert!(graph.connections().is_empty());
        assert!(backend.live.is_empty());
        assert_eq!(session.undo_depth(), 0);
    }
}
