use serde::{Deserialize, Serialize};

/// Settings for the coupled fixed-point driver.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CoupledSolverConfig {
    /// Maximum number of aero/structure sweeps before giving up.
    pub max_iterations: usize,
    /// Absolute tolerance on the aerodynamic residual norm, m/s.
    pub aero_tolerance: f64,
    /// Absolute tolerance on the structural residual norm, N.
    pub struct_tolerance: f64,
    /// Under-relaxation factor on the displacement update, (0, 1].
    pub relaxation: f64,
    /// 0 = silent, 1 = print every 5 iterations, 2 = print every iteration.
    pub debug_level: usize,
}

impl CoupledSolverConfig {
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.max_iterations == 0 {
            return Err(crate::error::AnalysisError::InvalidConfiguration(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.relaxation > 0.0 && self.relaxation <= 1.0) {
            return Err(crate::error::AnalysisError::InvalidConfiguration(format!(
                "relaxation must lie in (0, 1], got {}",
                self.relaxation
            )));
        }
        if self.aero_tolerance <= 0.0 || self.struct_tolerance <= 0.0 {
            return Err(crate::error::AnalysisError::InvalidConfiguration(
                "residual tolerances must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CoupledSolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            aero_tolerance: 1e-8,
            struct_tolerance: 1e-6,
            relaxation: 1.0,
            debug_level: 0,
        }
    }
}
