//! Result types for form-finding runs

use log::warn;
use serde::{Deserialize, Serialize};

use crate::analysis::{nodal_force, residuals, IterationContext, SolverStatus};
use crate::elements::{Line, SupportClassification};
use crate::error::SolverWarning;
use crate::force_matrix::ForceMatrix;
use crate::loads::LoadAssignment;
use crate::math::{Point, Vec3};

/// What an external force line stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExternalKind {
    /// An input load
    Load,
    /// Reaction at a support with a free reaction
    Reaction,
    /// Force added to balance a node the iteration left unbalanced
    FakeLoad,
}

/// Balancing force added at a node of an unconverged solution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FakeLoad {
    /// Node index
    pub node: usize,
    /// Force vector (already scaled)
    pub force: Vec3,
}

/// Internal and external force geometry of a solution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    /// One segment per edge in edge order
    pub internal_lines: Vec<Line>,
    /// Scaled signed edge forces parallel to `internal_lines`
    pub internal_magnitudes: Vec<f64>,
    /// Loads, then reactions, then fake loads
    pub external_lines: Vec<Line>,
    /// Kind of every line in `external_lines`
    pub external_kinds: Vec<ExternalKind>,
    /// Fake loads also listed in `external_lines`
    pub fake_loads: Vec<FakeLoad>,
    /// One `FakeLoad` warning per fake load
    pub warnings: Vec<SolverWarning>,
}

/// Complete output of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Final node positions
    pub nodes: Vec<Point>,
    /// One segment per edge between its final endpoint positions
    pub internal_lines: Vec<Line>,
    /// Signed edge forces parallel to `internal_lines` (positive = tension)
    pub internal_magnitudes: Vec<f64>,
    /// Loads, then reactions, then fake loads
    pub external_lines: Vec<Line>,
    /// Kind of every line in `external_lines`
    pub external_kinds: Vec<ExternalKind>,
    /// Forces with no physical support that were added to balance the output
    pub fake_loads: Vec<FakeLoad>,
    /// Support classification the run used
    pub supports: SupportClassification,
    /// Convergence report
    pub report: String,
    /// How the iteration loop ended
    pub status: SolverStatus,
    /// Number of iterations performed
    pub iterations: usize,
    /// Summed imbalance of the last iteration
    pub convergence: f64,
    /// Summed imbalance after every iteration
    pub history: Vec<f64>,
    /// Matching, geometry and imposed-equilibrium warnings
    pub warnings: Vec<SolverWarning>,
}

impl Default for Solution {
    /// Solution of a problem that was never run
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            internal_lines: Vec::new(),
            internal_magnitudes: Vec::new(),
            external_lines: Vec::new(),
            external_kinds: Vec::new(),
            fake_loads: Vec::new(),
            supports: SupportClassification::default(),
            report: String::new(),
            status: SolverStatus::Running,
            iterations: 0,
            convergence: 0.0,
            history: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl Solution {
    /// Check whether the imbalance dropped below the threshold
    pub fn is_converged(&self) -> bool {
        self.status == SolverStatus::Converged
    }

    /// External lines of one kind
    pub fn external_of(&self, kind: ExternalKind) -> impl Iterator<Item = &Line> {
        self.external_lines
            .iter()
            .zip(&self.external_kinds)
            .filter(move |(_, k)| **k == kind)
            .map(|(line, _)| line)
    }

    /// Largest tension and compression magnitudes
    pub fn force_range(&self) -> (f64, f64) {
        let max_tension = self
            .internal_magnitudes
            .iter()
            .copied()
            .fold(0.0_f64, f64::max);
        let max_compression = self
            .internal_magnitudes
            .iter()
            .copied()
            .fold(0.0_f64, f64::min);
        (max_tension, max_compression)
    }

    /// Report followed by termination state and every warning
    pub fn summary(&self) -> String {
        let mut out = self.report.clone();
        out.push_str(&format!(
            "Status: {:?} after {} iterations\n",
            self.status, self.iterations
        ));
        let (tension, compression) = self.force_range();
        out.push_str(&format!(
            "Edges: {} (max tension {:.4}, max compression {:.4})\n",
            self.internal_lines.len(),
            tension,
            compression
        ));
        if !self.fake_loads.is_empty() {
            out.push_str(&format!(
                "Imposed equilibrium added {} fake loads\n",
                self.fake_loads.len()
            ));
        }
        for w in &self.warnings {
            out.push_str(&format!("Warning: {w}\n"));
        }
        out
    }
}

/// Build the internal and external force lines from the final state
///
/// Residuals are recomputed at `positions`. When `impose_equilibrium` is set
/// and the run ended `Exhausted`, every balanced node left with a nonzero
/// residual receives a fake load cancelling it exactly.
#[allow(clippy::too_many_arguments)]
pub fn extract_solution(
    positions: &[Point],
    forces: &ForceMatrix,
    loads: &LoadAssignment,
    supports: &SupportClassification,
    impose_equilibrium: bool,
    status: SolverStatus,
    tol: f64,
    scale: f64,
) -> Extraction {
    let mut out = Extraction::default();

    for (edge, e) in forces.edges().iter().enumerate() {
        out.internal_lines
            .push(Line::new(positions[e.start], positions[e.end]));
        out.internal_magnitudes.push(forces.axial(edge) * scale);
    }

    for (node, load) in loads.iter() {
        out.external_lines
            .push(Line::from_vector(positions[node], load * scale));
        out.external_kinds.push(ExternalKind::Load);
    }

    let ctx = IterationContext {
        forces,
        loads,
        supports,
        tol,
    };

    for &node in supports.optimizable() {
        let reaction = -nodal_force(node, positions, &ctx);
        if reaction.norm() > 0.0 {
            out.external_lines
                .push(Line::from_vector(positions[node], reaction * scale));
            out.external_kinds.push(ExternalKind::Reaction);
        }
    }

    if impose_equilibrium && status == SolverStatus::Exhausted {
        for (node, r) in residuals(positions, &ctx).iter().enumerate() {
            let magnitude = r.norm();
            if magnitude == 0.0 {
                continue;
            }
            let force = -r * scale;
            out.external_lines
                .push(Line::from_vector(positions[node], force));
            out.external_kinds.push(ExternalKind::FakeLoad);
            out.fake_loads.push(FakeLoad { node, force });

            let w = SolverWarning::FakeLoad { node, magnitude };
            warn!("{w}");
            out.warnings.push(w);
        }
    }

    out
}
