use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::config::FlowState;
use crate::error::{AnalysisError, Result};

/// Configuration record for one lifting surface.
///
/// Every recognized option is an explicit field; conflicting combinations
/// are rejected by [`SurfaceConfig::validate`] before any solve is run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceConfig {
    pub name: String,
    /// Mirror the mesh about the centerline (y = 0). The mesh then models
    /// one half of the wing and reported coefficients refer to the full wing.
    pub symmetry: bool,
    /// Add a mirrored panel set across the freestream-aligned ground plane.
    /// Requires `symmetry`, zero sideslip, and a flow `height_above_ground`.
    pub ground_effect: bool,
    /// Reference area of the modeled mesh portion, m^2.
    pub s_ref: f64,
    /// Reference chord for pitching-moment normalization, m.
    pub c_ref: f64,
    /// Reference span for roll/yaw-moment normalization, m.
    pub b_ref: f64,
    /// Moment reference point, mesh axes.
    pub moment_ref: Vector3<f64>,
    /// Lift coefficient offset added to the inviscid result.
    pub cl0: f64,
    /// Profile-drag coefficient added to the induced drag.
    pub cd0: f64,
    /// Sharpness of the Kreisselmeier-Steinhauser failure aggregation.
    pub ks_rho: f64,
    /// Multiplier on structural mass accounting for non-structural weight.
    pub wing_weight_ratio: f64,
}

impl SurfaceConfig {
    /// Reject incompatible flag combinations at setup time.
    pub fn validate(&self, flow: &FlowState) -> Result<()> {
        if self.ground_effect && !self.symmetry {
            return Err(AnalysisError::InvalidConfiguration(format!(
                "surface '{}': ground effect requires symmetry",
                self.name
            )));
        }
        if self.ground_effect && flow.beta != 0.0 {
            return Err(AnalysisError::InvalidConfiguration(format!(
                "surface '{}': ground effect is incompatible with nonzero sideslip",
                self.name
            )));
        }
        if self.ground_effect && flow.height_above_ground.is_none() {
            return Err(AnalysisError::InvalidConfiguration(format!(
                "surface '{}': ground effect requires height_above_ground",
                self.name
            )));
        }
        if self.s_ref <= 0.0 || self.c_ref <= 0.0 || self.b_ref <= 0.0 {
            return Err(AnalysisError::InvalidConfiguration(format!(
                "surface '{}': reference quantities must be positive",
                self.name
            )));
        }
        if self.ks_rho <= 0.0 {
            return Err(AnalysisError::InvalidConfiguration(format!(
                "surface '{}': ks_rho must be positive",
                self.name
            )));
        }
        Ok(())
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            name: "wing".to_string(),
            symmetry: false,
            ground_effect: false,
            s_ref: 16.0,
            c_ref: 1.6,
            b_ref: 10.0,
            moment_ref: Vector3::zeros(),
            cl0: 0.0,
            cd0: 0.0,
            ks_rho: 50.0,
            wing_weight_ratio: 1.25,
        }
    }
}
