use nalgebra::{DMatrix, DVector, Dyn, Vector3};
use serde::{Deserialize, Serialize};

use crate::aero::influence::{
    assemble_system, assemble_system_tangent, induced_velocities, induced_velocities_tangent,
    FlowTangent, ImageSystem,
};
use crate::config::{FlowState, SurfaceConfig};
use crate::error::{AnalysisError, MatrixKind, Result};
use crate::mesh::{AeroMesh, PanelGeometry, PanelGeometryTangent};

/// Integrated aerodynamic coefficients in wind axes.
///
/// When the surface is symmetric the mirrored half is included, so these
/// refer to the full wing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AeroCoefficients {
    pub cl: f64,
    pub cd: f64,
    /// Roll/pitch/yaw moment coefficients about the moment reference point.
    pub cm: Vector3<f64>,
}

/// A perturbation direction for the directional-derivative (JVP) interface:
/// one offset per mesh point plus the flow scalars.
#[derive(Debug, Clone)]
pub struct VlmPerturbation {
    pub dmesh: Vec<Vector3<f64>>,
    pub dvelocity: f64,
    pub dalpha: f64,
    pub dbeta: f64,
    pub ddensity: f64,
    pub dheight: f64,
}

impl VlmPerturbation {
    /// Geometry-frozen perturbation (flow scalars only).
    pub fn flow_only(mesh: &AeroMesh) -> Self {
        Self {
            dmesh: vec![Vector3::zeros(); mesh.points().len()],
            dvelocity: 0.0,
            dalpha: 0.0,
            dbeta: 0.0,
            ddensity: 0.0,
            dheight: 0.0,
        }
    }

    fn flow_tangent(&self) -> FlowTangent {
        FlowTangent {
            dvelocity: self.dvelocity,
            dalpha: self.dalpha,
            dbeta: self.dbeta,
            ddensity: self.ddensity,
            dheight: self.dheight,
        }
    }
}

/// Directional derivatives of every solver output along one perturbation.
#[derive(Debug, Clone)]
pub struct VlmJvp {
    pub dcirculations: DVector<f64>,
    pub dpanel_forces: Vec<Vector3<f64>>,
    pub dcl: f64,
    pub dcd: f64,
    pub dcm: Vector3<f64>,
}

/// Vortex-lattice solver for one lifting surface.
pub struct VlmSolver {
    config: SurfaceConfig,
}

impl VlmSolver {
    pub fn new(config: SurfaceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// Assemble and solve the influence system, then recover panel forces
    /// and integrated coefficients.
    pub fn solve(&self, mesh: &AeroMesh, flow: &FlowState) -> Result<VlmSolution> {
        self.config.validate(flow)?;
        let geometry = PanelGeometry::new(mesh)?;
        let images = ImageSystem::new(&self.config, flow);

        if let Some(plane) = images.ground_plane() {
            for (idx, p) in mesh.points().iter().enumerate() {
                if plane.clearance(p) <= 0.0 {
                    return Err(AnalysisError::DegenerateGeometry(format!(
                        "mesh point {} lies on or below the ground plane",
                        idx
                    )));
                }
            }
        }

        let n = geometry.num_panels();
        let (a, rhs) = assemble_system(&geometry, flow, &images);
        let lu = a.lu();
        let circulations = lu
            .solve(&rhs)
            .ok_or(AnalysisError::SingularSystem {
                matrix: MatrixKind::Influence,
                size: n,
            })?;

        let v_fs = flow.freestream_velocity();
        let induced =
            induced_velocities(&geometry, flow, &images, &geometry.bound_midpoints, &circulations);
        let bound_velocities: Vec<Vector3<f64>> =
            induced.iter().map(|v| v + v_fs).collect();

        // Kutta-Joukowski: f = rho * gamma * (v x bound segment).
        let panel_forces: Vec<Vector3<f64>> = (0..n)
            .map(|k| {
                bound_velocities[k].cross(&geometry.bound_segments[k])
                    * (flow.density * circulations[k])
            })
            .collect();

        let coefficients =
            integrate_coefficients(&self.config, flow, &geometry, &panel_forces);

        Ok(VlmSolution {
            config: self.config.clone(),
            mesh: mesh.clone(),
            flow: *flow,
            geometry,
            images,
            lu,
            circulations,
            bound_velocities,
            panel_forces,
            coefficients,
        })
    }
}

/// Converged vortex-lattice state plus the cached factorization used to
/// evaluate derivative directions without refactoring.
pub struct VlmSolution {
    config: SurfaceConfig,
    mesh: AeroMesh,
    flow: FlowState,
    geometry: PanelGeometry,
    images: ImageSystem,
    lu: nalgebra::linalg::LU<f64, Dyn, Dyn>,
    circulations: DVector<f64>,
    bound_velocities: Vec<Vector3<f64>>,
    panel_forces: Vec<Vector3<f64>>,
    coefficients: AeroCoefficients,
}

impl VlmSolution {
    pub fn circulations(&self) -> &DVector<f64> {
        &self.circulations
    }

    pub fn panel_forces(&self) -> &[Vector3<f64>] {
        &self.panel_forces
    }

    pub fn coefficients(&self) -> AeroCoefficients {
        self.coefficients
    }

    pub fn geometry(&self) -> &PanelGeometry {
        &self.geometry
    }

    /// Directional derivative of every output along `perturbation`, reusing
    /// the stored factorization: one tangent assembly plus one triangular
    /// solve, never a refactorization.
    pub fn jvp(&self, perturbation: &VlmPerturbation) -> Result<VlmJvp> {
        if perturbation.dmesh.len() != self.mesh.points().len() {
            return Err(AnalysisError::DimensionMismatch(format!(
                "perturbation has {} mesh offsets, mesh has {} points",
                perturbation.dmesh.len(),
                self.mesh.points().len()
            )));
        }

        let flow = &self.flow;
        let dflow = perturbation.flow_tangent();
        let dgeom = self.geometry.tangent(&self.mesh, &perturbation.dmesh);

        // Implicit-function rule: d_gamma = A^-1 (d_rhs - dA gamma).
        let (da, drhs) =
            assemble_system_tangent(&self.geometry, &dgeom, flow, &dflow, &self.images);
        let residual_tangent = drhs - &da * &self.circulations;
        let dcirculations =
            self.lu
                .solve(&residual_tangent)
                .ok_or(AnalysisError::SingularSystem {
                    matrix: MatrixKind::Influence,
                    size: self.geometry.num_panels(),
                })?;

        let dv_fs = dflow.dfreestream_velocity(flow);
        let dinduced = induced_velocities_tangent(
            &self.geometry,
            &dgeom,
            flow,
            &dflow,
            &self.images,
            &self.geometry.bound_midpoints,
            &dgeom.dbound_midpoints,
            &self.circulations,
            &dcirculations,
        );

        let n = self.geometry.num_panels();
        let mut dpanel_forces = Vec::with_capacity(n);
        for k in 0..n {
            let v = self.bound_velocities[k];
            let dv = dinduced[k] + dv_fs;
            let ell = self.geometry.bound_segments[k];
            let dell = dgeom.dbound_segments[k];
            let gamma = self.circulations[k];
            let dgamma = dcirculations[k];

            let df = v.cross(&ell) * (dflow.ddensity * gamma + flow.density * dgamma)
                + (dv.cross(&ell) + v.cross(&dell)) * (flow.density * gamma);
            dpanel_forces.push(df);
        }

        let (dcl, dcd, dcm) = integrate_coefficients_tangent(
            &self.config,
            flow,
            &dflow,
            &self.geometry,
            &dgeom,
            &self.panel_forces,
            &dpanel_forces,
        );

        Ok(VlmJvp {
            dcirculations,
            dpanel_forces,
            dcl,
            dcd,
            dcm,
        })
    }
}

fn mirror_y(v: Vector3<f64>) -> Vector3<f64> {
    Vector3::new(v.x, -v.y, v.z)
}

/// Sum panel forces and moments (mirrored half included when symmetric) and
/// normalize into wind-axis coefficients.
fn integrate_coefficients(
    config: &SurfaceConfig,
    flow: &FlowState,
    geometry: &PanelGeometry,
    panel_forces: &[Vector3<f64>],
) -> AeroCoefficients {
    let mut force = Vector3::zeros();
    let mut moment = Vector3::zeros();
    for (k, f) in panel_forces.iter().enumerate() {
        let x = geometry.bound_midpoints[k];
        force += f;
        moment += (x - config.moment_ref).cross(f);
        if config.symmetry {
            let fm = mirror_y(*f);
            force += fm;
            moment += (mirror_y(x) - config.moment_ref).cross(&fm);
        }
    }

    let s_eff = if config.symmetry {
        2.0 * config.s_ref
    } else {
        config.s_ref
    };
    let qs = flow.dynamic_pressure() * s_eff;

    AeroCoefficients {
        cl: force.dot(&flow.lift_direction()) / qs + config.cl0,
        cd: force.dot(&flow.freestream_direction()) / qs + config.cd0,
        cm: Vector3::new(
            moment.x / (qs * config.b_ref),
            moment.y / (qs * config.c_ref),
            moment.z / (qs * config.b_ref),
        ),
    }
}

fn integrate_coefficients_tangent(
    config: &SurfaceConfig,
    flow: &FlowState,
    dflow: &FlowTangent,
    geometry: &PanelGeometry,
    dgeom: &PanelGeometryTangent,
    panel_forces: &[Vector3<f64>],
    dpanel_forces: &[Vector3<f64>],
) -> (f64, f64, Vector3<f64>) {
    let mut force = Vector3::zeros();
    let mut dforce = Vector3::zeros();
    let mut moment = Vector3::zeros();
    let mut dmoment = Vector3::zeros();

    for k in 0..panel_forces.len() {
        let f = panel_forces[k];
        let df = dpanel_forces[k];
        let x = geometry.bound_midpoints[k];
        let dx = dgeom.dbound_midpoints[k];
        force += f;
        dforce += df;
        moment += (x - config.moment_ref).cross(&f);
        dmoment += dx.cross(&f) + (x - config.moment_ref).cross(&df);
        if config.symmetry {
            let fm = mirror_y(f);
            let dfm = mirror_y(df);
            let xm = mirror_y(x);
            let dxm = mirror_y(dx);
            force += fm;
            dforce += dfm;
            moment += (xm - config.moment_ref).cross(&fm);
            dmoment += dxm.cross(&fm) + (xm - config.moment_ref).cross(&dfm);
        }
    }

    let s_eff = if config.symmetry {
        2.0 * config.s_ref
    } else {
        config.s_ref
    };
    let q = flow.dynamic_pressure();
    let dq = dflow.ddynamic_pressure(flow);
    let qs = q * s_eff;

    let lift_dir = flow.lift_direction();
    let dlift_dir = dflow.dlift_direction(flow);
    let drag_dir = flow.freestream_direction();
    let ddrag_dir = dflow.ddrag_direction(flow);

    // d(x / qs) = dx / qs - x dq / (q qs)
    let dcl = (dforce.dot(&lift_dir) + force.dot(&dlift_dir)) / qs
        - force.dot(&lift_dir) * dq / (q * qs);
    let dcd = (dforce.dot(&drag_dir) + force.dot(&ddrag_dir)) / qs
        - force.dot(&drag_dir) * dq / (q * qs);
    let dcm = Vector3::new(
        dmoment.x / (qs * config.b_ref) - moment.x * dq / (q * qs * config.b_ref),
        dmoment.y / (qs * config.c_ref) - moment.y * dq / (q * qs * config.c_ref),
        dmoment.z / (qs * config.b_ref) - moment.z * dq / (q * qs * config.b_ref),
    );

    (dcl, dcd, dcm)
}
