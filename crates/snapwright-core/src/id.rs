use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a part (rigid build unit) in the part graph.
    pub struct PartId;

    /// Identifies a connection node in the part graph's node arena.
    pub struct NodeId;
}

/// Handle to a joint materialized by the physics backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JointHandle(pub u64);

/// Dense, persisted identifier of a part inside an [`AssemblyDocument`].
///
/// [`AssemblyDocument`]: crate::serialize::AssemblyDocument
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub u32);
