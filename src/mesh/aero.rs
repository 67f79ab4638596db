use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Panel-corner coordinates for one lifting surface.
///
/// The grid is rectangular: `nx` chordwise points (leading to trailing edge)
/// by `ny` spanwise points, stored row-major so point `(i, j)` lives at
/// `i * ny + j`. Panels are the `(nx - 1) * (ny - 1)` quadrilaterals between
/// neighbouring points, numbered row-major as well.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AeroMesh {
    nx: usize,
    ny: usize,
    points: Vec<Vector3<f64>>,
}

impl AeroMesh {
    pub fn new(nx: usize, ny: usize, points: Vec<Vector3<f64>>) -> Result<Self> {
        if nx < 2 || ny < 2 {
            return Err(AnalysisError::DegenerateGeometry(format!(
                "mesh needs at least 2x2 points, got {}x{}",
                nx, ny
            )));
        }
        if points.len() != nx * ny {
            return Err(AnalysisError::DimensionMismatch(format!(
                "mesh expects {} points for a {}x{} grid, got {}",
                nx * ny,
                nx,
                ny,
                points.len()
            )));
        }
        Ok(Self { nx, ny, points })
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn num_panels(&self) -> usize {
        (self.nx - 1) * (self.ny - 1)
    }

    pub fn point(&self, i: usize, j: usize) -> Vector3<f64> {
        self.points[i * self.ny + j]
    }

    pub fn points(&self) -> &[Vector3<f64>] {
        &self.points
    }

    /// Copy of this mesh with every point offset by the matching entry of
    /// `offsets` (one per mesh point).
    pub fn displaced(&self, offsets: &[Vector3<f64>]) -> Result<Self> {
        if offsets.len() != self.points.len() {
            return Err(AnalysisError::DimensionMismatch(format!(
                "expected {} mesh point offsets, got {}",
                self.points.len(),
                offsets.len()
            )));
        }
        let points = self
            .points
            .iter()
            .zip(offsets)
            .map(|(p, d)| p + d)
            .collect();
        Ok(Self {
            nx: self.nx,
            ny: self.ny,
            points,
        })
    }
}

/// Quantities derived from the mesh that the vortex-lattice solver consumes.
///
/// The vortex grid sits a quarter panel behind the mesh: ring row `i` runs
/// along the quarter-chord line of panel row `i`, and the final row trails
/// a quarter panel behind the trailing edge. Collocation points are at the
/// panel 3/4-chord midspan position.
#[derive(Debug, Clone)]
pub struct PanelGeometry {
    nx: usize,
    ny: usize,
    /// Vortex-ring vertex grid, `nx * ny`, same indexing as the mesh.
    pub vortex: Vec<Vector3<f64>>,
    /// Collocation (boundary-condition) points, one per panel.
    pub collocation: Vec<Vector3<f64>>,
    /// Unit panel normals, one per panel.
    pub normals: Vec<Vector3<f64>>,
    /// Panel areas, one per panel.
    pub areas: Vec<f64>,
    /// Bound-vortex midpoints (force evaluation points), one per panel.
    pub bound_midpoints: Vec<Vector3<f64>>,
    /// Bound-vortex segment vectors, one per panel.
    pub bound_segments: Vec<Vector3<f64>>,
}

impl PanelGeometry {
    pub fn new(mesh: &AeroMesh) -> Result<Self> {
        let nx = mesh.nx();
        let ny = mesh.ny();

        let mut vortex = vec![Vector3::zeros(); nx * ny];
        for j in 0..ny {
            for i in 0..nx - 1 {
                vortex[i * ny + j] = 0.75 * mesh.point(i, j) + 0.25 * mesh.point(i + 1, j);
            }
            // Trailing ring row: a quarter panel behind the trailing edge.
            vortex[(nx - 1) * ny + j] =
                mesh.point(nx - 1, j) + 0.25 * (mesh.point(nx - 1, j) - mesh.point(nx - 2, j));
        }

        let num_panels = mesh.num_panels();
        let mut collocation = Vec::with_capacity(num_panels);
        let mut normals = Vec::with_capacity(num_panels);
        let mut areas = Vec::with_capacity(num_panels);
        let mut bound_midpoints = Vec::with_capacity(num_panels);
        let mut bound_segments = Vec::with_capacity(num_panels);

        for i in 0..nx - 1 {
            for j in 0..ny - 1 {
                collocation.push(
                    0.125 * (mesh.point(i, j) + mesh.point(i, j + 1))
                        + 0.375 * (mesh.point(i + 1, j) + mesh.point(i + 1, j + 1)),
                );

                // Normal from the cross product of the panel diagonals.
                let d1 = mesh.point(i, j + 1) - mesh.point(i + 1, j);
                let d2 = mesh.point(i, j) - mesh.point(i + 1, j + 1);
                let c = d1.cross(&d2);
                let c_norm = c.norm();
                if c_norm < 1e-12 {
                    return Err(AnalysisError::DegenerateGeometry(format!(
                        "panel ({}, {}) has (near) zero area",
                        i, j
                    )));
                }
                normals.push(c / c_norm);
                areas.push(0.5 * c_norm);

                let va = vortex[i * ny + j];
                let vb = vortex[i * ny + j + 1];
                bound_midpoints.push(0.5 * (va + vb));
                bound_segments.push(vb - va);
            }
        }

        Ok(Self {
            nx,
            ny,
            vortex,
            collocation,
            normals,
            areas,
            bound_midpoints,
            bound_segments,
        })
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn num_panels(&self) -> usize {
        (self.nx - 1) * (self.ny - 1)
    }

    pub fn vortex_point(&self, i: usize, j: usize) -> Vector3<f64> {
        self.vortex[i * self.ny + j]
    }

    pub fn panel_index(&self, i: usize, j: usize) -> usize {
        i * (self.ny - 1) + j
    }

    /// Total planform area of the modeled mesh.
    pub fn total_area(&self) -> f64 {
        self.areas.iter().sum()
    }

    /// Directional derivative of every derived quantity for a mesh
    /// perturbation `dmesh` (one offset per mesh point).
    pub fn tangent(&self, mesh: &AeroMesh, dmesh: &[Vector3<f64>]) -> PanelGeometryTangent {
        let nx = self.nx;
        let ny = self.ny;
        let dpt = |i: usize, j: usize| dmesh[i * ny + j];

        let mut dvortex = vec![Vector3::zeros(); nx * ny];
        for j in 0..ny {
            for i in 0..nx - 1 {
                dvortex[i * ny + j] = 0.75 * dpt(i, j) + 0.25 * dpt(i + 1, j);
            }
            dvortex[(nx - 1) * ny + j] = dpt(nx - 1, j) + 0.25 * (dpt(nx - 1, j) - dpt(nx - 2, j));
        }

        let num_panels = self.num_panels();
        let mut dcollocation = Vec::with_capacity(num_panels);
        let mut dnormals = Vec::with_capacity(num_panels);
        let mut dareas = Vec::with_capacity(num_panels);
        let mut dbound_midpoints = Vec::with_capacity(num_panels);
        let mut dbound_segments = Vec::with_capacity(num_panels);

        for i in 0..nx - 1 {
            for j in 0..ny - 1 {
                dcollocation.push(
                    0.125 * (dpt(i, j) + dpt(i, j + 1)) + 0.375 * (dpt(i + 1, j) + dpt(i + 1, j + 1)),
                );

                let d1 = mesh.point(i, j + 1) - mesh.point(i + 1, j);
                let d2 = mesh.point(i, j) - mesh.point(i + 1, j + 1);
                let dd1 = dpt(i, j + 1) - dpt(i + 1, j);
                let dd2 = dpt(i, j) - dpt(i + 1, j + 1);
                let c = d1.cross(&d2);
                let dc = dd1.cross(&d2) + d1.cross(&dd2);
                let c_norm = c.norm();
                let n = c / c_norm;
                // dn = (I - n n^T) dc / |c|, darea = n . dc / 2
                dnormals.push((dc - n * n.dot(&dc)) / c_norm);
                dareas.push(0.5 * n.dot(&dc));

                let dva = dvortex[i * ny + j];
                let dvb = dvortex[i * ny + j + 1];
                dbound_midpoints.push(0.5 * (dva + dvb));
                dbound_segments.push(dvb - dva);
            }
        }

        PanelGeometryTangent {
            dvortex,
            dcollocation,
            dnormals,
            dareas,
            dbound_midpoints,
            dbound_segments,
        }
    }
}

/// Directional derivatives of [`PanelGeometry`] along one mesh perturbation.
#[derive(Debug, Clone)]
pub struct PanelGeometryTangent {
    pub dvortex: Vec<Vector3<f64>>,
    pub dcollocation: Vec<Vector3<f64>>,
    pub dnormals: Vec<Vector3<f64>>,
    pub dareas: Vec<f64>,
    pub dbound_midpoints: Vec<Vector3<f64>>,
    pub dbound_segments: Vec<Vector3<f64>>,
}

impl PanelGeometryTangent {
    /// All-zero tangent for a geometry-frozen perturbation (flow-only).
    pub fn zeros(geometry: &PanelGeometry) -> Self {
        let np = geometry.num_panels();
        Self {
            dvortex: vec![Vector3::zeros(); geometry.vortex.len()],
            dcollocation: vec![Vector3::zeros(); np],
            dnormals: vec![Vector3::zeros(); np],
            dareas: vec![0.0; np],
            dbound_midpoints: vec![Vector3::zeros(); np],
            dbound_segments: vec![Vector3::zeros(); np],
        }
    }
}
