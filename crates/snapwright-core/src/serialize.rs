//! Persistence of the part graph.
//!
//! An [`AssemblyDocument`] is an id-indexed, order-stable description of all
//! parts and connections. Parts get dense [`RecordId`]s in spawn order and
//! every undirected connection is recorded exactly once, with the lower
//! `(part, node index)` endpoint first.
//!
//! The same document can be packed into a compact binary snapshot via
//! `bitcode`, prefixed by a versioned header, for in-memory checkpoints.

use crate::catalog::PartCatalog;
use crate::diagnostics::Diagnostic;
use crate::graph::PartGraph;
use crate::id::{PartId, RecordId};
use crate::part::PartType;
use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying an assembly snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x5A4B_A55E;

/// Current snapshot format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors from packing or unpacking a binary snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("no snapshot available")]
    Empty,
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// One persisted part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartRecord {
    pub id: RecordId,
    #[serde(rename = "prefabKey")]
    pub prefab: String,
    #[serde(rename = "type")]
    pub part_type: PartType,
    pub position: [f64; 3],
    /// Unit quaternion as `[i, j, k, w]`.
    pub rotation: [f64; 4],
}

impl PartRecord {
    pub fn pose(&self) -> Isometry3<f64> {
        let [x, y, z] = self.position;
        let [i, j, k, w] = self.rotation;
        let q = Quaternion::new(w, i, j, k);
        let rotation = if q.norm() > 1.0e-12 {
            UnitQuaternion::from_quaternion(q)
        } else {
            UnitQuaternion::identity()
        };
        Isometry3::from_parts(Translation3::new(x, y, z), rotation)
    }
}

/// One persisted connection between `(part_a, node_a)` and `(part_b, node_b)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    pub part_a: RecordId,
    pub node_a: u16,
    pub part_b: RecordId,
    pub node_b: u16,
}

/// A whole persisted assembly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssemblyDocument {
    #[serde(default)]
    pub parts: Vec<PartRecord>,
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
}

/// Outcome of restoring a document into a graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub parts_loaded: usize,
    pub parts_skipped: usize,
    pub connections_restored: usize,
    pub connections_dropped: usize,
    /// Live part for each restored record.
    pub id_map: BTreeMap<RecordId, PartId>,
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Describe every live part and connection of `graph`.
pub fn encode(graph: &PartGraph) -> AssemblyDocument {
    let order = graph.parts_in_spawn_order();
    let ids: BTreeMap<PartId, RecordId> = order
        .iter()
        .enumerate()
        .map(|(i, &part)| (part, RecordId(i as u32)))
        .collect();

    let mut doc = AssemblyDocument::default();
    for &part_id in &order {
        let Some(part) = graph.part(part_id) else {
            continue;
        };
        let record = ids[&part_id];
        let t = part.pose.translation.vector;
        let q = part.pose.rotation.quaternion().coords;
        doc.parts.push(PartRecord {
            id: record,
            prefab: part.prefab.clone(),
            part_type: part.part_type,
            position: [t.x, t.y, t.z],
            rotation: [q.x, q.y, q.z, q.w],
        });

        for &node_id in part.nodes() {
            let Some(node) = graph.node(node_id) else {
                continue;
            };
            let Some(partner) = node.connected_to() else {
                continue;
            };
            let Some((partner_record, partner_index)) = graph
                .node(partner)
                .and_then(|p| Some((*ids.get(&p.owner()?)?, p.index())))
            else {
                continue;
            };
            let near = (record, node.index());
            let far = (partner_record, partner_index);
            if near <= far {
                doc.connections.push(ConnectionRecord {
                    part_a: near.0,
                    node_a: near.1,
                    part_b: far.0,
                    node_b: far.1,
                });
            }
        }
    }
    doc
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Replace the contents of `graph` with the parts and connections of `doc`.
///
/// Every part is spawned from its prefab and committed without simulation.
/// Records whose prefab is unknown are skipped, and connections that cannot
/// be resolved or fail the connection rules are dropped; both are diagnosed
/// on the graph and counted in the returned report.
pub fn decode(doc: &AssemblyDocument, catalog: &PartCatalog, graph: &mut PartGraph) -> LoadReport {
    graph.clear();
    let mut report = LoadReport::default();

    for record in &doc.parts {
        let Some(prefab) = catalog.get(&record.prefab) else {
            graph.report(Diagnostic::UnknownPrefab {
                record: record.id,
                prefab: record.prefab.clone(),
            });
            report.parts_skipped += 1;
            continue;
        };
        if report.id_map.contains_key(&record.id) {
            tracing::warn!(record = record.id.0, "duplicate part record; skipped");
            report.parts_skipped += 1;
            continue;
        }
        if prefab.part_type != record.part_type {
            tracing::debug!(
                record = record.id.0,
                recorded = ?record.part_type,
                prefab = ?prefab.part_type,
                "recorded part type differs from prefab; prefab wins"
            );
        }
        let id = graph.spawn(prefab, record.pose());
        graph.begin_placement(id, false);
        graph.commit_placement(id, false);
        report.id_map.insert(record.id, id);
        report.parts_loaded += 1;
    }

    for conn in &doc.connections {
        // Endpoints are matched by node index, the same key encode writes.
        let endpoint = |record: RecordId, index: u16| {
            let part = report.id_map.get(&record)?;
            graph
                .part(*part)?
                .nodes()
                .iter()
                .copied()
                .find(|&n| graph.node(n).is_some_and(|node| node.index() == index))
        };
        let resolved = endpoint(conn.part_a, conn.node_a).zip(endpoint(conn.part_b, conn.node_b));
        let restored = match resolved {
            Some((a, b)) => graph.connect(a, b),
            None => false,
        };
        if restored {
            report.connections_restored += 1;
        } else {
            graph.report(Diagnostic::UnresolvedConnection {
                part_a: conn.part_a,
                node_a: conn.node_a,
                part_b: conn.part_b,
                node_b: conn.node_b,
            });
            report.connections_dropped += 1;
        }
    }

    tracing::debug!(
        parts = report.parts_loaded,
        skipped = report.parts_skipped,
        connections = report.connections_restored,
        dropped = report.connections_dropped,
        "assembly loaded"
    );
    report
}

// ---------------------------------------------------------------------------
// Binary snapshot
// ---------------------------------------------------------------------------

/// Header prepended to every snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    pub part_count: u32,
}

impl SnapshotHeader {
    pub fn new(part_count: u32) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            part_count,
        }
    }

    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(SnapshotError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(SnapshotError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AssemblySnapshot {
    header: SnapshotHeader,
    document: AssemblyDocument,
}

/// Pack a document into a versioned binary snapshot.
pub fn to_snapshot(doc: &AssemblyDocument) -> Result<Vec<u8>, SnapshotError> {
    let snapshot = AssemblySnapshot {
        header: SnapshotHeader::new(doc.parts.len() as u32),
        document: doc.clone(),
    };
    bitcode::serialize(&snapshot).map_err(|e| SnapshotError::Encode(e.to_string()))
}

/// Unpack and validate a binary snapshot.
pub fn from_snapshot(data: &[u8]) -> Result<AssemblyDocument, SnapshotError> {
    let snapshot: AssemblySnapshot =
        bitcode::deserialize(data).map_err(|e| SnapshotError::Decode(e.to_string()))?;
    snapshot.header.validate()?;
    Ok(snapshot.document)
}

// ---------------------------------------------------------------------------
// Checkpoint ring buffer
// ---------------------------------------------------------------------------

/// Fixed-capacity ring buffer of binary snapshots, newest last.
#[derive(Debug, Clone)]
pub struct CheckpointRing {
    entries: Vec<Option<Vec<u8>>>,
    head: usize,
    len: usize,
    total_taken: u64,
}

impl CheckpointRing {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_taken: 0,
        }
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

    pub fn total_taken(&self) -> u64 {
        self.total_taken
    }

    /// Snapshot the graph, overwriting the oldest checkpoint when full.
    pub fn take(&mut self, graph: &PartGraph) -> Result<(), SnapshotError> {
        let bytes = to_snapshot(&encode(graph))?;
        self.entries[self.head] = Some(bytes);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_taken += 1;
        Ok(())
    }

    /// Pop the newest checkpoint and restore it into `graph`.
    pub fn restore_latest(
        &mut self,
        catalog: &PartCatalog,
        graph: &mut PartGraph,
    ) -> Result<LoadReport, SnapshotError> {
        if self.len == 0 {
            return Err(SnapshotError::Empty);
        }
        let newest = (self.head + self.capacity() - 1) % self.capacity();
        let bytes = self.entries[newest].take().ok_or(SnapshotError::Empty)?;
        self.head = newest;
        self.len -= 1;
        let doc = from_snapshot(&bytes)?;
        Ok(decode(&doc, catalog, graph))
    }

    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            *entry = None;
        }
        self.head = 0;
        self.len = 0;
    }
}
