//! The equilibrium iteration
//!
//! Each iteration reads one snapshot of positions and forces, computes the
//! imbalance at every node, then commits the geometric step and the force
//! update together. The loop runs while the iteration budget lasts and the
//! summed imbalance is at or above the threshold.

use std::collections::HashSet;

use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};

use super::strategy::{residuals, EquilibriumUpdateStrategy, Imbalance, IterationContext};
use super::SolverConfig;
use crate::elements::SupportClassification;
use crate::error::SolverWarning;
use crate::force_matrix::ForceMatrix;
use crate::loads::LoadAssignment;
use crate::math::{direction, safe_unit, total_magnitude, Point, Vec3};

/// State of the iteration loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverStatus {
    /// Budget left and imbalance at or above the threshold
    Running,
    /// Imbalance dropped below the threshold
    Converged,
    /// Budget used up before converging
    Exhausted,
}

/// Final state of one run of the iteration
#[derive(Debug, Clone)]
pub struct IterationOutcome {
    /// Node positions after the last update
    pub positions: Vec<Point>,
    /// Force matrix after the last update
    pub forces: ForceMatrix,
    /// Imbalance vectors of the last iteration
    pub imbalance: Vec<Vec3>,
    /// Number of iterations performed
    pub iterations: usize,
    /// Summed imbalance of the last iteration
    pub convergence: f64,
    /// Converged or Exhausted
    pub status: SolverStatus,
    /// Summed imbalance after every iteration
    pub history: Vec<f64>,
    /// Degenerate edges met during the run, once per edge
    pub warnings: Vec<SolverWarning>,
}

/// Run the equilibrium iteration from the initial node positions
pub fn iterate(
    nodes: &[Point],
    forces: ForceMatrix,
    loads: &LoadAssignment,
    supports: &SupportClassification,
    config: &SolverConfig,
) -> IterationOutcome {
    let mut strategy = config.mode.strategy();
    let mut positions = nodes.to_vec();
    let mut forces = forces;
    let mut imbalance = vec![Vec3::zeros(); nodes.len()];
    let mut history = Vec::with_capacity(config.max_iterations);
    let mut warnings = Vec::new();
    let mut degenerate = HashSet::new();

    let mut iterations = 0;
    let mut convergence = f64::MAX;
    let mut status = SolverStatus::Running;

    info!(
        "Form finding: {} nodes, {} edges, {} supports, {} strategy, ratio {}",
        nodes.len(),
        forces.edges().len(),
        supports.all().len(),
        strategy.name(),
        config.deform_ratio
    );
    collect_degenerate(&positions, &forces, config.tol, &mut degenerate, &mut warnings);

    while status == SolverStatus::Running {
        iterations += 1;

        let ctx = IterationContext {
            forces: &forces,
            loads,
            supports,
            tol: config.tol,
        };
        let step = strategy.imbalance(&positions, &ctx);
        let moved = move_nodes(&positions, &step, &ctx, config);
        let updated = updated_forces(strategy.as_ref(), &positions, &moved, &step, &ctx, config);

        for (edge, n) in updated.into_iter().enumerate() {
            forces.set_axial(edge, n);
        }
        positions = moved;

        convergence = total_magnitude(&step.avsum);
        history.push(convergence);
        for (i, v) in step.avsum.iter().enumerate() {
            trace!("iteration {iterations} node {i}: imbalance {:.6e}", v.norm());
        }
        debug!("iteration {iterations}: convergence {convergence:.6e}");
        imbalance = step.avsum;

        collect_degenerate(&positions, &forces, config.tol, &mut degenerate, &mut warnings);

        if convergence < config.threshold {
            status = SolverStatus::Converged;
        } else if iterations >= config.max_iterations {
            status = SolverStatus::Exhausted;
        }
    }

    info!("Form finding {status:?} after {iterations} iterations, convergence {convergence:.6e}");

    IterationOutcome {
        positions,
        forces,
        imbalance,
        iterations,
        convergence,
        status,
        history,
        warnings,
    }
}

/// Sum of force densities |N| / L around a node
fn force_density(node: usize, positions: &[Point], ctx: &IterationContext) -> f64 {
    ctx.forces
        .neighbors(node)
        .iter()
        .filter_map(|&(neighbor, edge)| {
            direction(&positions[node], &positions[neighbor], ctx.tol)
                .map(|(_, length)| ctx.forces.axial(edge).abs() / length)
        })
        .sum()
}

/// Geometric step: frozen nodes stay, the rest travel `ratio * avsum`
///
/// With `config.damping` the step is divided by `max(1, force density)`.
/// The step is split into `config.sub_steps()` segments. The first segment
/// follows the imbalance; later ones resample the direction from the residual
/// at the intermediate geometry while keeping the segment length.
fn move_nodes(
    positions: &[Point],
    step: &Imbalance,
    ctx: &IterationContext,
    config: &SolverConfig,
) -> Vec<Point> {
    let n = config.sub_steps();
    let movable: Vec<usize> = (0..positions.len())
        .filter(|&i| !ctx.supports.is_frozen(i))
        .collect();

    let mut directions: Vec<Option<Vec3>> = vec![None; positions.len()];
    let mut lengths = vec![0.0; positions.len()];
    for &i in &movable {
        let total = if config.damping {
            step.avsum[i] * (config.deform_ratio / force_density(i, positions, ctx).max(1.0))
        } else {
            step.avsum[i] * config.deform_ratio
        };
        lengths[i] = total.norm() / n as f64;
        directions[i] = safe_unit(&total, 0.0);
    }

    let mut moved = positions.to_vec();
    for segment in 0..n {
        if segment > 0 {
            let intermediate = residuals(&moved, ctx);
            for &i in &movable {
                if let Some(u) = safe_unit(&intermediate[i], ctx.tol) {
                    directions[i] = Some(u);
                }
            }
        }
        for &i in &movable {
            if let Some(u) = directions[i] {
                moved[i] += u * lengths[i];
            }
        }
    }
    moved
}

/// Force update: rescale every edge by its length ratio, then let the strategy
/// absorb `1 - ratio` of the imbalance at its balanced endpoints
fn updated_forces(
    strategy: &dyn EquilibriumUpdateStrategy,
    old: &[Point],
    new: &[Point],
    step: &Imbalance,
    ctx: &IterationContext,
    config: &SolverConfig,
) -> Vec<f64> {
    let force_weight = 1.0 - config.deform_ratio;
    ctx.forces
        .edges()
        .iter()
        .enumerate()
        .map(|(edge, e)| {
            let axial = ctx.forces.axial(edge);
            let (Some((u, old_length)), Some((_, new_length))) = (
                direction(&old[e.start], &old[e.end], ctx.tol),
                direction(&new[e.start], &new[e.end], ctx.tol),
            ) else {
                return axial;
            };

            let mut correction = 0.0;
            let mut count = 0;
            for (node, neighbor, toward) in [(e.start, e.end, u), (e.end, e.start, -u)] {
                if ctx.supports.is_balanced(node) {
                    correction += strategy.correction(node, neighbor, &toward, &step.residual[node], ctx);
                    count += 1;
                }
            }

            let mut axial = axial * (new_length / old_length);
            if count > 0 {
                axial += force_weight * correction / count as f64;
            }
            axial
        })
        .collect()
}

/// Warn once per edge whose endpoints sit closer than the tolerance
fn collect_degenerate(
    positions: &[Point],
    forces: &ForceMatrix,
    tol: f64,
    seen: &mut HashSet<usize>,
    warnings: &mut Vec<SolverWarning>,
) {
    for (edge, e) in forces.edges().iter().enumerate() {
        if direction(&positions[e.start], &positions[e.end], tol).is_none() && seen.insert(edge) {
            let w = SolverWarning::DegenerateEdge {
                start: e.start,
                end: e.end,
            };
            warn!("{w}");
            warnings.push(w);
        }
    }
}
