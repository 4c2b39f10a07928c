//! Typed diagnostics with a pre-allocated ring buffer.
//!
//! Nothing in the builder aborts on a bad prefab, a broken invariant or a
//! missing save file. Instead the offending operation is refused (or
//! completed partially) and a [`Diagnostic`] is recorded here and logged via
//! `tracing`. The log has a fixed capacity; when full the oldest diagnostics
//! are dropped while `total_written` keeps counting.

use crate::id::{NodeId, PartId, RecordId};
use crate::part::PartState;

// ---------------------------------------------------------------------------
// Diagnostic types
// ---------------------------------------------------------------------------

/// A recorded problem. Carries enough context to find the offending entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    // -- Configuration --
    MissingRigidBody {
        prefab: String,
    },
    ExtraRigidBodies {
        prefab: String,
        count: u32,
    },
    MissingNodes {
        prefab: String,
    },

    // -- Invariants --
    OwnerReassignment {
        node: NodeId,
        current: PartId,
        requested: PartId,
    },
    AsymmetricConnection {
        node: NodeId,
        partner: NodeId,
        partner_points_to: Option<NodeId>,
    },
    StaleNodeCache {
        part: PartId,
    },
    LifecycleRefused {
        part: PartId,
        state: PartState,
        operation: &'static str,
    },
    UnknownPart {
        part: PartId,
    },

    // -- Capacity --
    CandidateOverflow {
        capacity: usize,
    },

    // -- Persistence --
    UnknownPrefab {
        record: RecordId,
        prefab: String,
    },
    UnresolvedConnection {
        part_a: RecordId,
        node_a: u16,
        part_b: RecordId,
        node_b: u16,
    },
    MissingSaveFile {
        path: String,
    },
}

/// Discriminant tag for diagnostic types, used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    MissingRigidBody,
    ExtraRigidBodies,
    MissingNodes,
    OwnerReassignment,
    AsymmetricConnection,
    StaleNodeCache,
    LifecycleRefused,
    UnknownPart,
    CandidateOverflow,
    UnknownPrefab,
    UnresolvedConnection,
    MissingSaveFile,
}

impl Diagnostic {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Diagnostic::MissingRigidBody { .. } => DiagnosticKind::MissingRigidBody,
            Diagnostic::ExtraRigidBodies { .. } => DiagnosticKind::ExtraRigidBodies,
            Diagnostic::MissingNodes { .. } => DiagnosticKind::MissingNodes,
            Diagnostic::OwnerReassignment { .. } => DiagnosticKind::OwnerReassignment,
            Diagnostic::AsymmetricConnection { .. } => DiagnosticKind::AsymmetricConnection,
            Diagnostic::StaleNodeCache { .. } => DiagnosticKind::StaleNodeCache,
            Diagnostic::LifecycleRefused { .. } => DiagnosticKind::LifecycleRefused,
            Diagnostic::UnknownPart { .. } => DiagnosticKind::UnknownPart,
            Diagnostic::CandidateOverflow { .. } => DiagnosticKind::CandidateOverflow,
            Diagnostic::UnknownPrefab { .. } => DiagnosticKind::UnknownPrefab,
            Diagnostic::UnresolvedConnection { .. } => DiagnosticKind::UnresolvedConnection,
            Diagnostic::MissingSaveFile { .. } => DiagnosticKind::MissingSaveFile,
        }
    }

    fn log(&self) {
        match self {
            Diagnostic::MissingRigidBody { prefab } => {
                tracing::warn!(%prefab, "prefab has no rigid body; part spawned without nodes");
            }
            Diagnostic::ExtraRigidBodies { prefab, count } => {
                tracing::warn!(%prefab, count, "prefab has more than one rigid body; extras ignored");
            }
            Diagnostic::MissingNodes { prefab } => {
                tracing::warn!(%prefab, "prefab defines no connection nodes");
            }
            Diagnostic::OwnerReassignment {
                node,
                current,
                requested,
            } => {
                tracing::warn!(?node, ?current, ?requested, "refused node owner reassignment");
            }
            Diagnostic::AsymmetricConnection {
                node,
                partner,
                partner_points_to,
            } => {
                tracing::warn!(
                    ?node,
                    ?partner,
                    ?partner_points_to,
                    "asymmetric connection state"
                );
            }
            Diagnostic::StaleNodeCache { part } => {
                tracing::warn!(?part, "node cache was stale; rescanned");
            }
            Diagnostic::LifecycleRefused {
                part,
                state,
                operation,
            } => {
                tracing::warn!(?part, ?state, operation, "lifecycle transition refused");
            }
            Diagnostic::UnknownPart { part } => {
                tracing::warn!(?part, "operation on unknown part");
            }
            Diagnostic::CandidateOverflow { capacity } => {
                tracing::warn!(capacity, "spatial candidate buffer saturated; extra candidates dropped");
            }
            Diagnostic::UnknownPrefab { record, prefab } => {
                tracing::warn!(record = record.0, %prefab, "unknown prefab; record skipped");
            }
            Diagnostic::UnresolvedConnection {
                part_a,
                node_a,
                part_b,
                node_b,
            } => {
                tracing::warn!(
                    part_a = part_a.0,
                    node_a,
                    part_b = part_b.0,
                    node_b,
                    "connection record could not be restored"
                );
            }
            Diagnostic::MissingSaveFile { path } => {
                tracing::warn!(%path, "save file not found");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// DiagnosticLog -- pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// Default number of diagnostics retained.
pub const DEFAULT_DIAGNOSTIC_CAPACITY: usize = 256;

/// Fixed-capacity ring buffer of diagnostics.
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    entries: Vec<Option<Diagnostic>>,
    head: usize,
    len: usize,
    total_written: u64,
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::new(DEFAULT_DIAGNOSTIC_CAPACITY)
    }
}

impl DiagnosticLog {
    /// Create a log with the given capacity. A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    /// Record a diagnostic and emit it through `tracing`.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        diagnostic.log();
        self.entries[self.head] = Some(diagnostic);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total diagnostics ever reported, including dropped ones.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Iterate retained diagnostics, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        let cap = self.capacity();
        let start = if self.len < cap { 0 } else { self.head };
        (0..self.len).filter_map(move |i| self.entries[(start + i) % cap].as_ref())
    }

    /// Number of retained diagnostics of a given kind.
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.iter().filter(|d| d.kind() == kind).count()
    }

    /// Remove and return all retained diagnostics, oldest first.
    pub fn drain(&mut self) -> Vec<Diagnostic> {
        let drained: Vec<Diagnostic> = self.iter().cloned().collect();
        self.clear();
        drained
    }

    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            *entry = None;
        }
        self.head = 0;
        self.len = 0;
    }
}
