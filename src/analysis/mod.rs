//! Solver configuration, update strategies and the equilibrium iteration

mod iterator;
mod strategy;

pub use iterator::{iterate, IterationOutcome, SolverStatus};
pub use strategy::{
    nodal_force, residual, residuals, DirectionDifference, EquilibriumUpdateStrategy, Imbalance,
    IterationContext, UnweightedUpdate, WeightedUpdate,
};

use serde::{Deserialize, Serialize};

use crate::error::{FormError, FormResult};

/// Largest accepted subdivision; every sub-segment costs a full residual pass
pub const MAX_SUBDIVISION: f64 = 1024.0;

/// Which equilibrium update rule drives the iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateMode {
    /// Plain vector difference: magnitude update from length ratio and projected imbalance
    Unweighted,
    /// Vector difference weighted by force share and direction deviation per edge
    Weighted,
}

impl Default for UpdateMode {
    fn default() -> Self {
        Self::Unweighted
    }
}

impl UpdateMode {
    /// Instantiate the strategy for this mode
    pub fn strategy(&self) -> Box<dyn EquilibriumUpdateStrategy> {
        match self {
            UpdateMode::Unweighted => Box::new(UnweightedUpdate),
            UpdateMode::Weighted => Box::new(WeightedUpdate::default()),
        }
    }
}

/// Options for the form-finding run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Distance below which points are matched to nodes and edges count as collapsed
    pub tol: f64,
    /// The loop stops once the summed imbalance drops below this
    pub threshold: f64,
    /// Iteration budget
    pub max_iterations: usize,
    /// Blend between form change (1) and force change (0)
    pub deform_ratio: f64,
    /// Number of sub-segments each geometric step is split into
    pub subdivision: f64,
    /// Update rule
    pub mode: UpdateMode,
    /// Balance the reported solution even when the iteration did not converge
    pub impose_equilibrium: bool,
    /// Factor applied to reported force magnitudes and external force lines
    pub scale: f64,
    /// Divide each node's step by its force density when that exceeds one
    pub damping: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tol: 1e-4,
            threshold: 1e-4,
            max_iterations: 100,
            deform_ratio: 0.5,
            subdivision: 1.0,
            mode: UpdateMode::Unweighted,
            impose_equilibrium: true,
            scale: 1.0,
            damping: false,
        }
    }
}

impl SolverConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the iteration budget
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    /// Set the deform ratio
    pub fn with_ratio(mut self, ratio: f64) -> Self {
        self.deform_ratio = ratio;
        self
    }

    /// Set the subdivision count
    pub fn with_subdivision(mut self, subdivision: f64) -> Self {
        self.subdivision = subdivision;
        self
    }

    /// Toggle the weighted vector difference
    pub fn with_weighted(mut self, weighted: bool) -> Self {
        self.mode = if weighted {
            UpdateMode::Weighted
        } else {
            UpdateMode::Unweighted
        };
        self
    }

    /// Set the matching tolerance
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the convergence threshold
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Toggle imposed equilibrium
    pub fn with_imposed_equilibrium(mut self, impose: bool) -> Self {
        self.impose_equilibrium = impose;
        self
    }

    /// Set the output scale
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Toggle force-density damping of the geometric step
    pub fn with_damping(mut self, damping: bool) -> Self {
        self.damping = damping;
        self
    }

    /// Number of sub-segments per geometric step
    pub fn sub_steps(&self) -> usize {
        (self.subdivision.ceil() as usize).max(1)
    }

    /// Reject configurations the solver cannot run with
    pub fn validate(&self) -> FormResult<()> {
        if !self.deform_ratio.is_finite() || !(0.0..=1.0).contains(&self.deform_ratio) {
            return Err(FormError::InvalidConfig(format!(
                "deform ratio {} outside [0, 1]",
                self.deform_ratio
            )));
        }
        if self.max_iterations == 0 {
            return Err(FormError::InvalidConfig(
                "iteration budget must be at least 1".to_string(),
            ));
        }
        if !self.subdivision.is_finite() || self.subdivision <= 0.0 {
            return Err(FormError::InvalidConfig(format!(
                "subdivision {} must be positive",
                self.subdivision
            )));
        }
        if self.subdivision > MAX_SUBDIVISION {
            return Err(FormError::InvalidConfig(format!(
                "subdivision {} exceeds {MAX_SUBDIVISION}",
                self.subdivision
            )));
        }
        if !self.tol.is_finite() || self.tol <= 0.0 {
            return Err(FormError::InvalidConfig(format!(
                "tolerance {} must be positive",
                self.tol
            )));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(FormError::InvalidConfig(format!(
                "threshold {} must be non-negative",
                self.threshold
            )));
        }
        if !self.scale.is_finite() {
            return Err(FormError::InvalidConfig(format!(
                "scale {} must be finite",
                self.scale
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SolverConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_ratio() {
        for ratio in [-0.1, 1.5, f64::NAN] {
            let err = SolverConfig::new().with_ratio(ratio).validate().unwrap_err();
            assert!(matches!(err, FormError::InvalidConfig(_)));
        }
    }

    #[test]
    fn test_invalid_budget_and_subdivision() {
        assert!(SolverConfig::new().with_max_iter(0).validate().is_err());
        assert!(SolverConfig::new().with_subdivision(0.0).validate().is_err());
        assert!(SolverConfig::new().with_subdivision(-2.0).validate().is_err());
    }

    #[test]
    fn test_subdivision_cap() {
        assert!(SolverConfig::new().with_subdivision(MAX_SUBDIVISION).validate().is_ok());
        let err = SolverConfig::new().with_subdivision(1e7).validate().unwrap_err();
        assert!(matches!(err, FormError::InvalidConfig(_)));
    }

    #[test]
    fn test_damping_off_by_default() {
        assert!(!SolverConfig::default().damping);
        assert!(SolverConfig::new().with_damping(true).damping);
    }

    #[test]
    fn test_zero_threshold_allowed() {
        assert!(SolverConfig::new().with_threshold(0.0).validate().is_ok());
    }

    #[test]
    fn test_sub_steps_round_up() {
        assert_eq!(SolverConfig::new().with_subdivision(2.3).sub_steps(), 3);
        assert_eq!(SolverConfig::new().with_subdivision(0.4).sub_steps(), 1);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SolverConfig =
            serde_json::from_str(r#"{ "deform_ratio": 0.25, "mode": "Weighted" }"#).unwrap();
        assert_eq!(config.deform_ratio, 0.25);
        assert_eq!(config.mode, UpdateMode::Weighted);
        assert_eq!(config.max_iterations, 100);
    }
}
