//! Force matrix - signed edge forces indexed by node pairs

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::elements::Line;
use crate::error::{FormError, FormResult, SolverWarning};
use crate::matching::nearest_node;
use crate::math::{Mat, Point};

/// An oriented edge between two node indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Node the edge line starts at
    pub start: usize,
    /// Node the edge line ends at
    pub end: usize,
}

impl Edge {
    /// The endpoint that is not `node`
    pub fn other(&self, node: usize) -> usize {
        if node == self.start {
            self.end
        } else {
            self.start
        }
    }
}

/// Dense antisymmetric matrix of signed edge forces
///
/// `M[start, end]` holds the axial force of the edge (positive = tension) and
/// `M[end, start]` its negation; the diagonal and every unconnected pair stay
/// zero. The edge list keeps the orientation needed to read the axial force
/// back from either endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceMatrix {
    values: Mat,
    edges: Vec<Edge>,
    /// Per node: (neighbor, edge index)
    adjacency: Vec<Vec<(usize, usize)>>,
}

impl ForceMatrix {
    /// Create an empty matrix for `node_count` nodes
    pub fn new(node_count: usize) -> Self {
        Self {
            values: Mat::zeros(node_count, node_count),
            edges: Vec::new(),
            adjacency: vec![Vec::new(); node_count],
        }
    }

    /// Number of nodes (matrix dimension)
    pub fn size(&self) -> usize {
        self.values.nrows()
    }

    /// Matched edges in input order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges incident to a node as (neighbor, edge index)
    pub fn neighbors(&self, node: usize) -> &[(usize, usize)] {
        &self.adjacency[node]
    }

    /// Raw matrix entry
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[(i, j)]
    }

    /// Underlying dense matrix
    pub fn as_matrix(&self) -> &Mat {
        &self.values
    }

    /// Connect `start` to `end` with axial force `magnitude`
    ///
    /// Returns the index of the edge if the pair was already connected, in
    /// which case the earlier orientation and magnitude are replaced.
    pub fn connect(&mut self, start: usize, end: usize, magnitude: f64) -> Option<usize> {
        let existing = self.adjacency[start]
            .iter()
            .find(|(neighbor, _)| *neighbor == end)
            .map(|&(_, edge)| edge);

        let edge = match existing {
            Some(edge) => {
                self.edges[edge] = Edge { start, end };
                edge
            }
            None => {
                self.edges.push(Edge { start, end });
                let edge = self.edges.len() - 1;
                self.adjacency[start].push((end, edge));
                self.adjacency[end].push((start, edge));
                edge
            }
        };
        self.set_axial(edge, magnitude);
        existing
    }

    /// Axial force of an edge (positive = tension)
    pub fn axial(&self, edge: usize) -> f64 {
        let e = self.edges[edge];
        self.values[(e.start, e.end)]
    }

    /// Replace the axial force of an edge, keeping the matrix antisymmetric
    pub fn set_axial(&mut self, edge: usize, magnitude: f64) {
        let e = self.edges[edge];
        self.values[(e.start, e.end)] = magnitude;
        self.values[(e.end, e.start)] = -magnitude;
    }

    /// Check `M[i,j] == -M[j,i]` for every pair within `tol`
    pub fn is_antisymmetric(&self, tol: f64) -> bool {
        let n = self.size();
        (0..n).all(|i| (i..n).all(|j| (self.values[(i, j)] + self.values[(j, i)]).abs() <= tol))
    }
}

/// Build the force matrix from edge lines and their magnitudes
///
/// Both endpoints of every line are matched to the nearest node within `tol`.
/// Lines that miss a node, or whose ends land on the same node, are dropped
/// with a warning.
pub fn build_force_matrix(
    nodes: &[Point],
    edge_lines: &[Line],
    edge_magnitudes: &[f64],
    tol: f64,
) -> FormResult<(ForceMatrix, Vec<SolverWarning>)> {
    if edge_lines.len() != edge_magnitudes.len() {
        return Err(FormError::InvalidInput(format!(
            "{} edge lines but {} edge magnitudes",
            edge_lines.len(),
            edge_magnitudes.len()
        )));
    }
    if let Some(i) = edge_magnitudes.iter().position(|m| !m.is_finite()) {
        return Err(FormError::InvalidInput(format!(
            "edge magnitude {i} is not finite"
        )));
    }

    let mut matrix = ForceMatrix::new(nodes.len());
    let mut warnings = Vec::new();

    for (line, (edge_line, &magnitude)) in edge_lines.iter().zip(edge_magnitudes).enumerate() {
        let start = nearest_node(nodes, &edge_line.start, tol);
        let end = nearest_node(nodes, &edge_line.end, tol);
        let (start, end) = match (start, end) {
            (Some(s), Some(e)) => (s, e),
            _ => {
                warnings.push(SolverWarning::UnmatchedEdge { line });
                continue;
            }
        };
        if start == end {
            warnings.push(SolverWarning::DegenerateEdge { start, end });
            continue;
        }
        if matrix.connect(start, end, magnitude).is_some() {
            warnings.push(SolverWarning::DuplicateEdge { line, start, end });
        }
    }

    for w in &warnings {
        warn!("{w}");
    }
    debug!(
        "Force matrix built: {} nodes, {} edges from {} lines",
        matrix.size(),
        matrix.edges().len(),
        edge_lines.len()
    );

    Ok((matrix, warnings))
}
