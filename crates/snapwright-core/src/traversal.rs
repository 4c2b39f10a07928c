//! Connectivity over the part graph.
//!
//! An assembly is every part reachable from a root by following node
//! connections. It is never stored; each query walks the graph breadth-first.

use crate::config::DriveConfig;
use crate::graph::PartGraph;
use crate::id::PartId;
use crate::part::PartType;
use nalgebra::{Translation3, Vector3};
use std::collections::{BTreeMap, HashSet, VecDeque};

/// Parts reachable from `root`, in breadth-first discovery order.
///
/// The root comes first. An unknown root yields an empty assembly.
pub fn assembly_of(graph: &PartGraph, root: PartId) -> Vec<PartId> {
    if !graph.contains_part(root) {
        return Vec::new();
    }
    let mut visited: HashSet<PartId> = HashSet::from([root]);
    let mut order = vec![root];
    let mut frontier = VecDeque::from([root]);

    while let Some(current) = frontier.pop_front() {
        let Some(part) = graph.part(current) else {
            continue;
        };
        for &node in part.nodes() {
            let Some(owner) = graph.partner(node).and_then(|p| graph.owner_of(p)) else {
                continue;
            };
            if visited.insert(owner) {
                order.push(owner);
                frontier.push_back(owner);
            }
        }
    }
    order
}

/// Whether two parts belong to the same assembly.
pub fn is_connected(graph: &PartGraph, a: PartId, b: PartId) -> bool {
    assembly_of(graph, a).contains(&b)
}

/// Move every part of the assembly rooted at `root` by `delta`.
///
/// Returns the number of parts moved.
pub fn translate_assembly(graph: &mut PartGraph, root: PartId, delta: Vector3<f64>) -> usize {
    let members = assembly_of(graph, root);
    let shift = Translation3::from(delta);
    for &id in &members {
        if let Some(part) = graph.part_mut(id) {
            part.pose = shift * part.pose;
        }
    }
    members.len()
}

/// Part counts per type across the assembly.
pub fn count_by_type(graph: &PartGraph, root: PartId) -> BTreeMap<PartType, usize> {
    let mut counts = BTreeMap::new();
    for id in assembly_of(graph, root) {
        if let Some(part) = graph.part(id) {
            *counts.entry(part.part_type).or_insert(0) += 1;
        }
    }
    counts
}

/// Force and torque an assembly can produce.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriveCapacity {
    pub motors: usize,
    pub wheels: usize,
    pub force: f64,
    pub torque: f64,
}

/// Drive capacity of the assembly rooted at `root`. Only motors and
/// wheels contribute.
pub fn drive_capacity(graph: &PartGraph, root: PartId, config: &DriveConfig) -> DriveCapacity {
    let counts = count_by_type(graph, root);
    let motors = counts.get(&PartType::Motor).copied().unwrap_or(0);
    let wheels = counts.get(&PartType::Wheel).copied().unwrap_or(0);
    DriveCapacity {
        motors,
        wheels,
        force: motors as f64 * config.force_per_motor,
        torque: motors as f64 * config.torque_per_motor + wheels as f64 * config.torque_per_wheel,
    }
}
