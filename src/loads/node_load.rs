//! Node loads - external force vectors applied directly to nodes

use serde::{Deserialize, Serialize};

use crate::math::Vec3;

/// External load vectors grouped by the node they act on
///
/// A node may carry any number of loads; they are summed wherever the solver
/// needs the resultant but are kept apart for reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadAssignment {
    loads: Vec<Vec<Vec3>>,
}

impl LoadAssignment {
    /// Create an empty assignment for `node_count` nodes
    pub fn new(node_count: usize) -> Self {
        Self {
            loads: vec![Vec::new(); node_count],
        }
    }

    /// Append a load vector to a node
    pub fn push(&mut self, node: usize, load: Vec3) {
        self.loads[node].push(load);
    }

    /// Loads acting on a node, in input order
    pub fn on(&self, node: usize) -> &[Vec3] {
        self.loads.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Resultant of the loads acting on a node
    pub fn resultant(&self, node: usize) -> Vec3 {
        self.on(node).iter().fold(Vec3::zeros(), |acc, l| acc + l)
    }

    /// Number of nodes covered
    pub fn node_count(&self) -> usize {
        self.loads.len()
    }

    /// Total number of load vectors
    pub fn load_count(&self) -> usize {
        self.loads.iter().map(Vec::len).sum()
    }

    /// Iterate `(node, load)` pairs in node order, then load order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Vec3)> {
        self.loads
            .iter()
            .enumerate()
            .flat_map(|(node, loads)| loads.iter().map(move |l| (node, l)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resultant() {
        let mut loads = LoadAssignment::new(3);
        loads.push(1, Vec3::new(0.0, 0.0, -10.0));
        loads.push(1, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(loads.resultant(1), Vec3::new(2.0, 0.0, -10.0));
        assert_eq!(loads.resultant(0), Vec3::zeros());
        assert_eq!(loads.load_count(), 2);
    }

    #[test]
    fn test_iter_order() {
        let mut loads = LoadAssignment::new(2);
        loads.push(1, Vec3::x());
        loads.push(0, Vec3::y());
        let nodes: Vec<usize> = loads.iter().map(|(n, _)| n).collect();
        assert_eq!(nodes, vec![0, 1]);
    }
}
