//! Snapwright Core -- the part connection graph for snap-together vehicles.
//!
//! This crate holds the data model a vehicle builder is made of: parts with
//! a fixed set of typed, directional connection nodes, the symmetric
//! connection relation between nodes, breadth-first assembly traversal, and
//! lossless persistence of the whole graph.
//!
//! # Arena model
//!
//! Parts and nodes live in two `slotmap` arenas inside
//! [`graph::PartGraph`]. A node refers to its owning part and to its partner
//! by key, never by reference, so deleting a part only invalidates keys:
//!
//! ```rust,ignore
//! let a = graph.spawn(&frame, pose_a);
//! let b = graph.spawn(&frame, pose_b);
//! let (na, nb) = (graph.part(a).unwrap().nodes()[0], graph.part(b).unwrap().nodes()[1]);
//! if graph.connect(na, nb) {
//!     assert_eq!(graph.partner(nb), Some(na));
//! }
//! ```
//!
//! # Failure model
//!
//! Nothing here aborts a building session. Refused operations return
//! `false`/`None`, and the reason is recorded in the graph's
//! [`diagnostics::DiagnosticLog`] and logged through `tracing`.
//!
//! # Key Types
//!
//! - [`graph::PartGraph`] -- Arena of parts and nodes, connect/disconnect,
//!   part-type registry and root handle.
//! - [`part::Part`] -- Rigid build unit with an `Unplaced -> Placed ->
//!   Simulating` lifecycle.
//! - [`node::ConnectionNode`] -- Typed, directional attachment point.
//! - [`traversal`] -- Assembly reachability, group move and drive capacity.
//! - [`serialize`] -- Assembly documents, load reports and binary snapshots.
//! - [`physics::JointBackend`] -- Seam to the external physics engine.

pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod graph;
pub mod id;
pub mod node;
pub mod part;
pub mod physics;
pub mod serialize;
pub mod traversal;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
