//! Spatial side of the builder: where parts may go and where they snap.
//!
//! - [`SpatialIndex`] holds world-space collider bounds of placed parts and
//!   answers radius and overlap queries into bounded scratch buffers.
//! - [`PlacementValidator`] rejects poses that overlap other parts.
//! - [`SnapResolver`] picks the node pair a previewed part should attach by.
//! - [`MirrorPlane`] reflects poses for symmetric building.
//! - [`PlacementSession`] ties these together for an input driver:
//!   preview, resolve each step, commit with joints, undo.

pub mod aabb;
pub mod index;
pub mod mirror;
pub mod session;
pub mod snap;
pub mod validator;

pub use aabb::Aabb;
pub use index::{CandidateBuffer, ColliderEntry, SpatialIndex};
pub use mirror::MirrorPlane;
pub use session::{CommitOutcome, MirrorState, PlacementSession, PreviewState, SessionError};
pub use snap::{SnapRequest, SnapResolver, SnapResult};
pub use validator::PlacementValidator;
