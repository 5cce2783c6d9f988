//! Form-finding problem - input container, solve entry and caller-owned state

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::analysis::{iterate, SolverConfig};
use crate::elements::Line;
use crate::error::{FormError, FormResult};
use crate::force_matrix::build_force_matrix;
use crate::matching::{coincident_nodes, match_loads, match_supports};
use crate::math::Point;
use crate::report::report;
use crate::results::{extract_solution, Solution};

/// Geometry and forces of a form-finding problem
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProblemInput {
    /// Network edges; endpoints are matched to `nodes`
    pub edge_lines: Vec<Line>,
    /// Initial signed force per edge line (positive = tension)
    pub edge_magnitudes: Vec<f64>,
    /// Canonical node list, index = node id
    pub nodes: Vec<Point>,
    /// Loads: start = application point, vector = direction times magnitude
    pub external_force_lines: Vec<Line>,
    /// Supports whose position is frozen
    pub deformable_support_points: Vec<Point>,
    /// Supports whose position is frozen and whose reaction is free
    pub free_support_points: Vec<Point>,
}

impl ProblemInput {
    /// Create a problem over the given nodes
    pub fn new(nodes: Vec<Point>) -> Self {
        Self {
            nodes,
            ..Self::default()
        }
    }

    /// Add an edge with its initial force
    pub fn with_edge(mut self, line: Line, magnitude: f64) -> Self {
        self.edge_lines.push(line);
        self.edge_magnitudes.push(magnitude);
        self
    }

    /// Add a load line
    pub fn with_load(mut self, line: Line) -> Self {
        self.external_force_lines.push(line);
        self
    }

    /// Add a support whose reaction is free
    pub fn with_free_support(mut self, point: Point) -> Self {
        self.free_support_points.push(point);
        self
    }

    /// Add a support that is only frozen
    pub fn with_deformable_support(mut self, point: Point) -> Self {
        self.deformable_support_points.push(point);
        self
    }

    /// Reject inputs that would feed non-finite values into the iteration
    pub fn validate(&self) -> FormResult<()> {
        let finite = |p: &Point| p.coords.iter().all(|x| x.is_finite());
        if let Some(i) = self.nodes.iter().position(|p| !finite(p)) {
            return Err(FormError::InvalidInput(format!("node {i} is not finite")));
        }
        let mut lines = self.edge_lines.iter().chain(&self.external_force_lines);
        if lines.any(|l| !finite(&l.start) || !finite(&l.end)) {
            return Err(FormError::InvalidInput(
                "line with non-finite coordinates".to_string(),
            ));
        }
        let mut supports = self
            .free_support_points
            .iter()
            .chain(&self.deformable_support_points);
        if supports.any(|p| !finite(p)) {
            return Err(FormError::InvalidInput(
                "support point with non-finite coordinates".to_string(),
            ));
        }
        Ok(())
    }
}

/// JSON problem file: an input and an optional configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemFile {
    pub input: ProblemInput,
    #[serde(default)]
    pub config: SolverConfig,
}

impl ProblemFile {
    /// Parse a problem file from a JSON string
    pub fn from_json(json: &str) -> FormResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a problem file
    pub fn load(path: impl AsRef<Path>) -> FormResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// Run one complete form-finding pass
///
/// Configuration and input are validated before anything else runs. Matching
/// and geometric problems are returned as warnings on the solution.
pub fn solve(input: &ProblemInput, config: &SolverConfig) -> FormResult<Solution> {
    config.validate()?;
    input.validate()?;

    let tol = config.tol;
    let mut warnings = coincident_nodes(&input.nodes, tol);

    let (supports, w) = match_supports(
        &input.nodes,
        &input.free_support_points,
        &input.deformable_support_points,
        tol,
    );
    warnings.extend(w);
    let (loads, w) = match_loads(&input.nodes, &input.external_force_lines, tol);
    warnings.extend(w);
    let (forces, w) =
        build_force_matrix(&input.nodes, &input.edge_lines, &input.edge_magnitudes, tol)?;
    warnings.extend(w);

    let outcome = iterate(&input.nodes, forces, &loads, &supports, config);
    warnings.extend(outcome.warnings);

    let extraction = extract_solution(
        &outcome.positions,
        &outcome.forces,
        &loads,
        &supports,
        config.impose_equilibrium,
        outcome.status,
        tol,
        config.scale,
    );
    warnings.extend(extraction.warnings);

    Ok(Solution {
        report: report(&outcome.imbalance, config.deform_ratio, outcome.iterations),
        nodes: outcome.positions,
        internal_lines: extraction.internal_lines,
        internal_magnitudes: extraction.internal_magnitudes,
        external_lines: extraction.external_lines,
        external_kinds: extraction.external_kinds,
        fake_loads: extraction.fake_loads,
        supports,
        status: outcome.status,
        iterations: outcome.iterations,
        convergence: outcome.convergence,
        history: outcome.history,
        warnings,
    })
}

/// Last solution of a caller, replayed while the run gate is closed
#[derive(Debug, Clone, Default)]
pub struct SolverState {
    last: Option<Solution>,
}

impl SolverState {
    /// Create a state with nothing cached
    pub fn new() -> Self {
        Self::default()
    }

    /// Solve when `run` is set, otherwise replay the cached solution
    ///
    /// With `run == false` nothing is validated or computed; a state that never
    /// ran returns an empty [`Solution`].
    pub fn evaluate(
        &mut self,
        input: &ProblemInput,
        config: &SolverConfig,
        run: bool,
    ) -> FormResult<Solution> {
        if !run {
            info!("Run gate closed, replaying cached solution");
            return Ok(self.last.clone().unwrap_or_default());
        }
        let solution = solve(input, config)?;
        self.last = Some(solution.clone());
        Ok(solution)
    }

    /// Cached solution, if any run completed
    pub fn last(&self) -> Option<&Solution> {
        self.last.as_ref()
    }

    /// Forget the cached solution
    pub fn clear(&mut self) {
        self.last = None;
    }
}
