//! Geometry matching - classify supports and assign loads by proximity
//!
//! Raw points and lines from the host are paired with the canonical node list
//! by nearest distance within a tolerance. The policies are explicit:
//! nearest match wins, the lower node index wins on an exact tie, a later
//! support input overrides an earlier one for the same node, and anything that
//! matches no node is dropped with a [`SolverWarning`].

use log::warn;

use crate::elements::{Line, SupportClassification, SupportKind};
use crate::error::{SolverWarning, SupportChannel};
use crate::loads::LoadAssignment;
use crate::math::Point;

/// Index of the node nearest to `p` within `tol`, if any
pub fn nearest_node(nodes: &[Point], p: &Point, tol: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, node) in nodes.iter().enumerate() {
        let d = (node - p).norm();
        if d > tol {
            continue;
        }
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}

/// Classify support nodes
///
/// Points from `free_support_points` freeze their node and free its reaction
/// (both index sets); points from `deformable_support_points` only freeze it.
/// The free channel is processed first, so a node named by both inputs ends up
/// as a deformable support.
pub fn match_supports(
    nodes: &[Point],
    free_support_points: &[Point],
    deformable_support_points: &[Point],
    tol: f64,
) -> (SupportClassification, Vec<SolverWarning>) {
    let mut kinds = vec![SupportKind::None; nodes.len()];
    let mut warnings = Vec::new();

    let channels = [
        (free_support_points, SupportChannel::Free, SupportKind::Optimizable),
        (deformable_support_points, SupportChannel::Deformable, SupportKind::Fixed),
    ];

    for (points, channel, kind) in channels {
        for (point, p) in points.iter().enumerate() {
            let Some(node) = nearest_node(nodes, p, tol) else {
                warnings.push(SolverWarning::UnmatchedSupport { point, kind: channel });
                continue;
            };
            if kinds[node] != SupportKind::None && kinds[node] != kind {
                warnings.push(SolverWarning::SupportOverridden { node, kind: channel });
            }
            kinds[node] = kind;
        }
    }

    for w in &warnings {
        warn!("{w}");
    }

    (SupportClassification::from_kinds(&kinds), warnings)
}

/// Assign load lines to the nodes they start at
///
/// The load vector is the line vector (direction times length).
pub fn match_loads(
    nodes: &[Point],
    load_lines: &[Line],
    tol: f64,
) -> (LoadAssignment, Vec<SolverWarning>) {
    let mut loads = LoadAssignment::new(nodes.len());
    let mut warnings = Vec::new();

    for (line, load) in load_lines.iter().enumerate() {
        match nearest_node(nodes, &load.start, tol) {
            Some(node) => loads.push(node, load.vector()),
            None => {
                let w = SolverWarning::UnmatchedLoad { line };
                warn!("{w}");
                warnings.push(w);
            }
        }
    }

    (loads, warnings)
}

/// Report pairs of input nodes closer than `tol`
pub fn coincident_nodes(nodes: &[Point], tol: f64) -> Vec<SolverWarning> {
    let mut warnings = Vec::new();
    for i in 0..nodes.len() {
        for j in (i + 1)..nodes.len() {
            if (nodes[i] - nodes[j]).norm() <= tol {
                let w = SolverWarning::CoincidentNodes { first: i, second: j };
                warn!("{w}");
                warnings.push(w);
            }
        }
    }
    warnings
}
