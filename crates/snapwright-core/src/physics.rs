//! Seam to the external physics engine.
//!
//! The builder never simulates anything itself. When a connection is made
//! at commit time it asks a [`JointBackend`] for a rigid joint between the
//! two parts' bodies, anchored at each side's node in the part's local frame.

use crate::config::JointParams;
use crate::id::{JointHandle, PartId};
use nalgebra::Point3;

/// Materializes and removes fixed joints between part bodies.
pub trait JointBackend {
    /// Create a rigid joint. Anchors are node positions in each part's local
    /// frame; `params` is passed through untouched.
    fn create_fixed_joint(
        &mut self,
        part_a: PartId,
        anchor_a: Point3<f64>,
        part_b: PartId,
        anchor_b: Point3<f64>,
        params: &JointParams,
    ) -> JointHandle;

    fn remove_joint(&mut self, handle: JointHandle);
}

/// Backend that hands out handles and forgets them. Useful for headless
/// building where no physics world exists.
#[derive(Debug, Default)]
pub struct NullBackend {
    next: u64,
}

impl JointBackend for NullBackend {
    fn create_fixed_joint(
        &mut self,
        _part_a: PartId,
        _anchor_a: Point3<f64>,
        _part_b: PartId,
        _anchor_b: Point3<f64>,
        _params: &JointParams,
    ) -> JointHandle {
        let handle = JointHandle(self.next);
        self.next += 1;
        handle
    }

    fn remove_joint(&mut self, _handle: JointHandle) {}
}
