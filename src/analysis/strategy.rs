//! Equilibrium update strategies
//!
//! Both strategies share the nodal residual: the vector sum of edge pulls and
//! external loads at every balanced node. They differ in how the residual is
//! turned into the imbalance that drives the geometric step, and in how much
//! of it each edge absorbs in the force update.

use std::f64::consts::PI;

use crate::elements::SupportClassification;
use crate::force_matrix::ForceMatrix;
use crate::loads::LoadAssignment;
use crate::math::{angle_between, direction, Point, Vec3};

/// Read-only state shared by every node computation of one iteration
#[derive(Debug, Clone, Copy)]
pub struct IterationContext<'a> {
    /// Edge forces at the start of the iteration
    pub forces: &'a ForceMatrix,
    /// Loads per node
    pub loads: &'a LoadAssignment,
    /// Frozen and optimizable supports
    pub supports: &'a SupportClassification,
    /// Edges shorter than this carry no direction
    pub tol: f64,
}

/// Output of the imbalance step
#[derive(Debug, Clone, PartialEq)]
pub struct Imbalance {
    /// Imbalance vectors that drive the geometric step and the convergence measure
    pub avsum: Vec<Vec3>,
    /// Plain nodal residuals (zero at optimizable supports)
    pub residual: Vec<Vec3>,
}

/// Resultant of edge pulls and loads acting on a node
///
/// Edges shorter than the tolerance contribute nothing.
pub fn nodal_force(node: usize, positions: &[Point], ctx: &IterationContext) -> Vec3 {
    let p = &positions[node];
    let mut sum = ctx.loads.resultant(node);
    for &(neighbor, edge) in ctx.forces.neighbors(node) {
        if let Some((u, _)) = direction(p, &positions[neighbor], ctx.tol) {
            sum += u * ctx.forces.axial(edge);
        }
    }
    sum
}

/// Residual force at one node
///
/// Optimizable supports absorb any residual through their reaction and report zero.
pub fn residual(node: usize, positions: &[Point], ctx: &IterationContext) -> Vec3 {
    if !ctx.supports.is_balanced(node) {
        return Vec3::zeros();
    }
    nodal_force(node, positions, ctx)
}

/// Residuals at every node, computed against one snapshot of positions and forces
#[cfg(feature = "parallel")]
pub fn residuals(positions: &[Point], ctx: &IterationContext) -> Vec<Vec3> {
    use rayon::prelude::*;
    (0..positions.len())
        .into_par_iter()
        .map(|i| residual(i, positions, ctx))
        .collect()
}

/// Residuals at every node, computed against one snapshot of positions and forces
#[cfg(not(feature = "parallel"))]
pub fn residuals(positions: &[Point], ctx: &IterationContext) -> Vec<Vec3> {
    (0..positions.len())
        .map(|i| residual(i, positions, ctx))
        .collect()
}

/// One of the two interchangeable equilibrium update rules
pub trait EquilibriumUpdateStrategy: Send {
    /// Compute the imbalance for the current snapshot
    fn imbalance(&mut self, positions: &[Point], ctx: &IterationContext) -> Imbalance;

    /// Axial force change requested by `node` for `edge`
    ///
    /// `u` is the unit direction from `node` to `neighbor` in the snapshot
    /// geometry and `residual` the node's residual. The caller scales the
    /// result by `1 - ratio` and averages it over the balanced endpoints.
    fn correction(
        &self,
        node: usize,
        neighbor: usize,
        u: &Vec3,
        residual: &Vec3,
        ctx: &IterationContext,
    ) -> f64;

    /// Name used in logs
    fn name(&self) -> &'static str;
}

/// Plain vector difference
#[derive(Debug, Clone, Copy, Default)]
pub struct UnweightedUpdate;

impl EquilibriumUpdateStrategy for UnweightedUpdate {
    fn imbalance(&mut self, positions: &[Point], ctx: &IterationContext) -> Imbalance {
        let residual = residuals(positions, ctx);
        Imbalance {
            avsum: residual.clone(),
            residual,
        }
    }

    fn correction(
        &self,
        node: usize,
        _neighbor: usize,
        u: &Vec3,
        residual: &Vec3,
        ctx: &IterationContext,
    ) -> f64 {
        let degree = ctx.forces.neighbors(node).len().max(1) as f64;
        -residual.dot(u) / degree
    }

    fn name(&self) -> &'static str {
        "unweighted"
    }
}

/// Direction-difference field of the weighted strategy
///
/// For every balanced node and incident edge it stores the vector the edge
/// force has to change by so that the node balances, given the edge's share of
/// the node's total force. Entries follow the order of
/// [`ForceMatrix::neighbors`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectionDifference {
    per_node: Vec<Vec<Vec3>>,
}

impl DirectionDifference {
    /// Difference vector of the edge from `node` to `neighbor`
    pub fn get(&self, forces: &ForceMatrix, node: usize, neighbor: usize) -> Vec3 {
        forces
            .neighbors(node)
            .iter()
            .position(|&(n, _)| n == neighbor)
            .and_then(|slot| self.per_node.get(node).and_then(|d| d.get(slot)))
            .copied()
            .unwrap_or_else(Vec3::zeros)
    }
}

/// Vector difference weighted by each edge's force share and misalignment
#[derive(Debug, Clone, Default)]
pub struct WeightedUpdate {
    field: DirectionDifference,
}

impl WeightedUpdate {
    /// Direction-difference field from the last imbalance step
    pub fn field(&self) -> &DirectionDifference {
        &self.field
    }

    /// Weighted imbalance and direction differences at one node
    fn weigh(node: usize, r: &Vec3, positions: &[Point], ctx: &IterationContext) -> (Vec3, Vec<Vec3>) {
        let neighbors = ctx.forces.neighbors(node);
        let mut diffs = vec![Vec3::zeros(); neighbors.len()];
        if !ctx.supports.is_balanced(node) {
            return (Vec3::zeros(), diffs);
        }

        // Current edge force vectors; collapsed edges carry no direction
        let p = &positions[node];
        let vectors: Vec<Option<Vec3>> = neighbors
            .iter()
            .map(|&(neighbor, edge)| {
                direction(p, &positions[neighbor], ctx.tol).map(|(u, _)| u * ctx.forces.axial(edge))
            })
            .collect();

        let live = vectors.iter().filter(|v| v.is_some()).count();
        if live == 0 {
            return (*r, diffs);
        }
        let total: f64 = vectors.iter().flatten().map(|v| v.norm()).sum();

        let mut factor = 0.0;
        for (slot, current) in vectors.iter().enumerate() {
            let Some(current) = current else {
                continue;
            };
            let w = if total > 0.0 {
                current.norm() / total
            } else {
                1.0 / live as f64
            };
            let diff = -r * w;
            let theta = angle_between(current, &(current + diff), ctx.tol);
            factor += w * (1.0 + theta / PI);
            diffs[slot] = diff;
        }

        (r * factor, diffs)
    }
}

impl EquilibriumUpdateStrategy for WeightedUpdate {
    fn imbalance(&mut self, positions: &[Point], ctx: &IterationContext) -> Imbalance {
        let residual = residuals(positions, ctx);
        let (avsum, per_node): (Vec<Vec3>, Vec<Vec<Vec3>>) = residual
            .iter()
            .enumerate()
            .map(|(i, r)| Self::weigh(i, r, positions, ctx))
            .unzip();
        self.field = DirectionDifference { per_node };
        Imbalance { avsum, residual }
    }

    fn correction(
        &self,
        node: usize,
        neighbor: usize,
        u: &Vec3,
        _residual: &Vec3,
        ctx: &IterationContext,
    ) -> f64 {
        self.field.get(ctx.forces, node, neighbor).dot(u)
    }

    fn name(&self) -> &'static str {
        "weighted"
    }
}
