use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Freestream flow conditions shared by every aerodynamic evaluation.
///
/// Angles are in radians. `height_above_ground` is measured from the mesh
/// reference origin down to the ground plane and is only consulted when the
/// surface enables ground effect.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FlowState {
    /// Freestream speed, m/s.
    pub velocity: f64,
    /// Angle of attack, rad.
    pub alpha: f64,
    /// Sideslip angle, rad.
    pub beta: f64,
    /// Air density, kg/m^3.
    pub density: f64,
    /// Height of the mesh reference origin above the ground plane, m.
    pub height_above_ground: Option<f64>,
}

impl FlowState {
    /// Unit vector along the freestream, in mesh axes.
    pub fn freestream_direction(&self) -> Vector3<f64> {
        let (sa, ca) = self.alpha.sin_cos();
        let (sb, cb) = self.beta.sin_cos();
        Vector3::new(ca * cb, -sb, sa * cb)
    }

    /// Unit vector along the lift direction (normal to the freestream in the
    /// x-z plane).
    pub fn lift_direction(&self) -> Vector3<f64> {
        let (sa, ca) = self.alpha.sin_cos();
        Vector3::new(-sa, 0.0, ca)
    }

    /// Freestream velocity vector, m/s.
    pub fn freestream_velocity(&self) -> Vector3<f64> {
        self.freestream_direction() * self.velocity
    }

    /// Dynamic pressure q = rho V^2 / 2.
    pub fn dynamic_pressure(&self) -> f64 {
        0.5 * self.density * self.velocity * self.velocity
    }
}

impl Default for FlowState {
    fn default() -> Self {
        Self {
            velocity: 50.0,
            alpha: 0.0,
            beta: 0.0,
            density: 1.225,
            height_above_ground: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn freestream_and_lift_directions_are_orthonormal() {
        let flow = FlowState {
            alpha: 0.12,
            beta: 0.05,
            ..Default::default()
        };
        let u = flow.freestream_direction();
        let l = flow.lift_direction();
        assert_relative_eq!(u.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(l.norm(), 1.0, epsilon = 1e-12);
        // With zero sideslip the two are exactly perpendicular.
        let flow = FlowState {
            alpha: 0.12,
            beta: 0.0,
            ..Default::default()
        };
        assert_relative_eq!(
            flow.freestream_direction().dot(&flow.lift_direction()),
            0.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn dynamic_pressure_matches_definition() {
        let flow = FlowState::default();
        assert_relative_eq!(flow.dynamic_pressure(), 0.5 * 1.225 * 2500.0);
    }
}
