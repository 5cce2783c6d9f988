//! Vector-difference form finding for pin-jointed networks
//!
//! Given a network of nodes connected by edges with initial signed forces,
//! external loads and supports, the solver alternates between moving nodes
//! along their force imbalance and correcting edge forces until every node
//! that has to balance does. The blend between the two is set by the deform
//! ratio:
//! - ratio 1 changes only the form
//! - ratio 0 changes only the forces
//! - anything in between mixes both
//!
//! ## Example
//! ```rust
//! use vecdiff_solver::prelude::*;
//!
//! // A single hanging element: A held, B loaded by 10 downward
//! let input = ProblemInput::new(vec![Point::new(0.0, 0.0, 0.0), Point::new(0.0, 0.0, -1.0)])
//!     .with_edge(Line::from_coords([0.0, 0.0, 0.0], [0.0, 0.0, -1.0]), 0.0)
//!     .with_load(Line::from_coords([0.0, 0.0, -1.0], [0.0, 0.0, -11.0]))
//!     .with_free_support(Point::new(0.0, 0.0, 0.0));
//!
//! let solution = solve(&input, &SolverConfig::new().with_max_iter(50)).unwrap();
//! assert!(solution.is_converged());
//! assert!((solution.internal_magnitudes[0] - 10.0).abs() < 1e-3);
//! ```

pub mod analysis;
pub mod elements;
pub mod error;
pub mod force_matrix;
pub mod loads;
pub mod matching;
pub mod math;
pub mod model;
pub mod report;
pub mod results;

// Re-export common types
pub mod prelude {
    pub use crate::analysis::{SolverConfig, SolverStatus, UpdateMode};
    pub use crate::elements::{Line, SupportClassification, SupportKind};
    pub use crate::error::{FormError, FormResult, SolverWarning};
    pub use crate::force_matrix::ForceMatrix;
    pub use crate::loads::LoadAssignment;
    pub use crate::math::{Point, Vec3};
    pub use crate::model::{solve, ProblemFile, ProblemInput, SolverState};
    pub use crate::results::{ExternalKind, Solution};
}
