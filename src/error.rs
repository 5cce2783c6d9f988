//! Error and warning types for the form-finding solver

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for solver operations
#[derive(Error, Debug)]
pub enum FormError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for solver operations
pub type FormResult<T> = Result<T, FormError>;

/// Non-fatal condition found while matching geometry or iterating.
///
/// Warnings never abort a run; they are collected on the
/// [`Solution`](crate::results::Solution) so the caller can decide what to show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SolverWarning {
    /// A support point has no node within tolerance
    UnmatchedSupport { point: usize, kind: SupportChannel },
    /// A node matched by both support channels; the later classification was kept
    SupportOverridden { node: usize, kind: SupportChannel },
    /// A load line starts away from every node
    UnmatchedLoad { line: usize },
    /// An edge line endpoint has no node within tolerance
    UnmatchedEdge { line: usize },
    /// An edge of zero length, or one whose ends collapsed during iteration
    DegenerateEdge { start: usize, end: usize },
    /// A later edge line connected a pair that was already connected
    DuplicateEdge { line: usize, start: usize, end: usize },
    /// Two input nodes closer than the matching tolerance
    CoincidentNodes { first: usize, second: usize },
    /// Load introduced by imposing equilibrium on an unconverged state
    FakeLoad { node: usize, magnitude: f64 },
}

/// Input channel a support point came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupportChannel {
    /// Frozen node with a free (optimizable) reaction
    Free,
    /// Frozen node whose reaction is predefined through loads
    Deformable,
}

impl fmt::Display for SupportChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupportChannel::Free => write!(f, "free"),
            SupportChannel::Deformable => write!(f, "deformable"),
        }
    }
}

impl fmt::Display for SolverWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverWarning::UnmatchedSupport { point, kind } => {
                write!(f, "{kind} support point {point} has no corresponding node, ignored")
            }
            SolverWarning::SupportOverridden { node, kind } => {
                write!(f, "node {node} matched by both support inputs, kept as {kind} support")
            }
            SolverWarning::UnmatchedLoad { line } => {
                write!(f, "load line {line} does not start at a node, dropped")
            }
            SolverWarning::UnmatchedEdge { line } => {
                write!(f, "edge line {line} does not connect two nodes, dropped")
            }
            SolverWarning::DegenerateEdge { start, end } => {
                write!(f, "edge {start}-{end} has zero length, skipped")
            }
            SolverWarning::DuplicateEdge { line, start, end } => {
                write!(f, "edge line {line} repeats edge {start}-{end}, later magnitude kept")
            }
            SolverWarning::CoincidentNodes { first, second } => {
                write!(f, "nodes {first} and {second} coincide within tolerance")
            }
            SolverWarning::FakeLoad { node, magnitude } => {
                write!(f, "imposed equilibrium added a fake load of {magnitude:.3e} at node {node}")
            }
        }
    }
}
