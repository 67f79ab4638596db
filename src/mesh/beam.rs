use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Ordered beam-node coordinates. Elements connect consecutive nodes in an
/// open chain from the clamped root (node 0) to the tip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructMesh {
    nodes: Vec<Vector3<f64>>,
}

impl StructMesh {
    pub fn new(nodes: Vec<Vector3<f64>>) -> Result<Self> {
        if nodes.len() < 2 {
            return Err(AnalysisError::DegenerateGeometry(
                "beam chain needs at least 2 nodes".to_string(),
            ));
        }
        for (e, pair) in nodes.windows(2).enumerate() {
            if (pair[1] - pair[0]).norm() < 1e-12 {
                return Err(AnalysisError::DegenerateGeometry(format!(
                    "beam element {} has (near) zero length",
                    e
                )));
            }
        }
        Ok(Self { nodes })
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_elements(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn node(&self, i: usize) -> Vector3<f64> {
        self.nodes[i]
    }

    pub fn nodes(&self) -> &[Vector3<f64>] {
        &self.nodes
    }

    pub fn element_length(&self, e: usize) -> f64 {
        (self.nodes[e + 1] - self.nodes[e]).norm()
    }
}

/// Which closed-form failure checks apply to a cross section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum SectionFamily {
    /// Hollow circular spar: von Mises at the outer fiber.
    Tube { radius: f64, thickness: f64 },
    /// Wingbox: skin strength plus plate-buckling margins.
    Wingbox {
        skin_thickness: f64,
        spar_thickness: f64,
        /// Box width (chordwise), m.
        width: f64,
        /// Box height (vertical), m.
        height: f64,
        /// Allowable-stress multiplier for the upper skin.
        strength_factor_upper: f64,
    },
}

/// Per-element cross-sectional and material properties.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CrossSection {
    /// Cross-sectional area, m^2.
    pub area: f64,
    /// Bending moment of inertia about the local y axis, m^4.
    pub iy: f64,
    /// Bending moment of inertia about the local z axis, m^4.
    pub iz: f64,
    /// Torsion constant, m^4.
    pub j: f64,
    /// Young's modulus, Pa.
    pub e: f64,
    /// Shear modulus, Pa.
    pub g: f64,
    /// Material density, kg/m^3.
    pub density: f64,
    /// Allowable stress, Pa.
    pub allowable_stress: f64,
    pub family: SectionFamily,
}

impl CrossSection {
    /// Aluminium tube with the given outer radius and wall thickness.
    pub fn tube(radius: f64, thickness: f64) -> Self {
        use std::f64::consts::PI;
        let r_in = radius - thickness;
        let area = PI * (radius.powi(2) - r_in.powi(2));
        let i = PI / 4.0 * (radius.powi(4) - r_in.powi(4));
        Self {
            area,
            iy: i,
            iz: i,
            j: 2.0 * i,
            e: 70.0e9,
            g: 30.0e9,
            density: 2700.0,
            allowable_stress: 500.0e6 / 2.5,
            family: SectionFamily::Tube { radius, thickness },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.area <= 0.0 || self.iy <= 0.0 || self.iz <= 0.0 || self.j <= 0.0 {
            return Err(AnalysisError::InvalidConfiguration(
                "cross-section area and inertias must be positive".to_string(),
            ));
        }
        if self.e <= 0.0 || self.g <= 0.0 {
            return Err(AnalysisError::InvalidConfiguration(
                "material moduli must be positive".to_string(),
            ));
        }
        if self.allowable_stress <= 0.0 {
            return Err(AnalysisError::InvalidConfiguration(
                "allowable stress must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Directional perturbation of one cross section, matching [`CrossSection`]
/// field for field (geometry of the `family` is held fixed).
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossSectionTangent {
    pub darea: f64,
    pub diy: f64,
    pub diz: f64,
    pub dj: f64,
}
