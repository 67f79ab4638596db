//! Coupled aerostructural equilibrium.
//!
//! The joint state concatenates the panel circulations with the reduced
//! (clamp-eliminated) beam freedoms. [`CoupledSystem`] exposes residual
//! evaluation and a consistent linearization for an external Newton solver,
//! plus a self-contained block Gauss-Seidel driver for direct use.

use nalgebra::{DMatrix, DVector, Vector6};

use crate::aero::{
    assemble_system, assemble_system_tangent, induced_velocities, induced_velocities_tangent,
    AeroCoefficients, FlowTangent, ImageSystem, VlmSolution, VlmSolver,
};
use crate::config::{CoupledSolverConfig, FlowState, SurfaceConfig};
use crate::error::{AnalysisError, Result};
use crate::mesh::{AeroMesh, CrossSection, PanelGeometry, StructMesh};
use crate::structures::{BeamSolution, BeamSolver};
use crate::transfer::TransferMap;

/// Trial point of the coupled system.
#[derive(Debug, Clone)]
pub struct CoupledState {
    pub circulations: DVector<f64>,
    /// One 6-DOF state per beam node, root included (and zero there).
    pub displacements: Vec<Vector6<f64>>,
}

/// Outcome of the fixed-point iteration. Nonconvergence is a status, not an
/// error: the caller decides whether a stale point is still usable.
#[derive(Debug, Clone, Copy)]
pub struct ConvergenceStatus {
    pub converged: bool,
    pub iterations: usize,
    pub aero_residual: f64,
    pub struct_residual: f64,
}

/// Converged (or stalled) coupled analysis outputs.
pub struct CoupledSolution {
    pub state: CoupledState,
    pub status: ConvergenceStatus,
    pub coefficients: AeroCoefficients,
    /// Aggregated stress margin, feasible below zero.
    pub failure: f64,
    /// Structural mass including the non-structural weight factor.
    pub mass: f64,
}

/// Residual and block Jacobian at one linearization point, ordered
/// circulations first.
pub struct CoupledLinearization {
    pub residual: DVector<f64>,
    pub jacobian: DMatrix<f64>,
}

pub struct CoupledSystem {
    aero: VlmSolver,
    mesh: AeroMesh,
    beam: BeamSolver,
    transfer: TransferMap,
    flow: FlowState,
    config: CoupledSolverConfig,
}

impl CoupledSystem {
    pub fn new(
        surface: SurfaceConfig,
        config: CoupledSolverConfig,
        aero_mesh: AeroMesh,
        struct_mesh: StructMesh,
        sections: Vec<CrossSection>,
        flow: FlowState,
    ) -> Result<Self> {
        surface.validate(&flow)?;
        config.validate()?;
        let transfer = TransferMap::new(&aero_mesh, &struct_mesh)?;
        let beam = BeamSolver::new(struct_mesh, sections)?;
        Ok(Self {
            aero: VlmSolver::new(surface),
            mesh: aero_mesh,
            beam,
            transfer,
            flow,
            config,
        })
    }

    pub fn flow(&self) -> &FlowState {
        &self.flow
    }

    pub fn transfer(&self) -> &TransferMap {
        &self.transfer
    }

    /// Single-discipline pass: aerodynamics on the rigid mesh, then the beam
    /// under those loads. Also the warm start for the coupled iteration.
    pub fn uncoupled(&self) -> Result<(VlmSolution, BeamSolution)> {
        let aero_sol = self.aero.solve(&self.mesh, &self.flow)?;
        let loads = self.transfer.loads(aero_sol.panel_forces())?;
        let beam_sol = self.beam.solve(&loads)?;
        Ok((aero_sol, beam_sol))
    }

    fn check_state(&self, state: &CoupledState) -> Result<()> {
        if state.circulations.len() != self.mesh.num_panels() {
            return Err(AnalysisError::DimensionMismatch(format!(
                "{} circulations for {} panels",
                state.circulations.len(),
                self.mesh.num_panels()
            )));
        }
        if state.displacements.len() != self.beam.mesh().num_nodes() {
            return Err(AnalysisError::DimensionMismatch(format!(
                "{} displacement records for {} beam nodes",
                state.displacements.len(),
                self.beam.mesh().num_nodes()
            )));
        }
        Ok(())
    }

    fn deformed_mesh(&self, state: &CoupledState) -> Result<AeroMesh> {
        let offsets = self.transfer.displacements(&state.displacements)?;
        self.mesh.displaced(&offsets)
    }

    fn reduced_displacements(&self, state: &CoupledState) -> DVector<f64> {
        let n = state.displacements.len();
        let mut u = DVector::zeros(6 * (n - 1));
        for i in 1..n {
            u.fixed_rows_mut::<6>(6 * (i - 1))
                .copy_from(&state.displacements[i]);
        }
        u
    }

    /// Flow-tangency and force-balance residuals at a trial state. Both are
    /// zero at coupled equilibrium.
    pub fn residual(&self, state: &CoupledState) -> Result<(DVector<f64>, DVector<f64>)> {
        self.check_state(state)?;
        let deformed = self.deformed_mesh(state)?;
        let geometry = PanelGeometry::new(&deformed)?;
        let images = ImageSystem::new(self.aero.config(), &self.flow);
        if let Some(plane) = images.ground_plane() {
            for (idx, p) in deformed.points().iter().enumerate() {
                if plane.clearance(p) <= 0.0 {
                    return Err(AnalysisError::DegenerateGeometry(format!(
                        "deformed mesh point {} lies on or below the ground plane",
                        idx
                    )));
                }
            }
        }

        let (a, rhs) = assemble_system(&geometry, &self.flow, &images);
        let r_aero = &a * &state.circulations - rhs;

        let forces = self.panel_forces(&geometry, &images, &state.circulations);
        let loads = self.transfer.loads(&forces)?;
        let n = state.displacements.len();
        let mut f = DVector::zeros(6 * (n - 1));
        for i in 1..n {
            f.fixed_rows_mut::<6>(6 * (i - 1)).copy_from(&loads[i]);
        }
        let k = self.beam.stiffness_matrix()?;
        let r_struct = k * self.reduced_displacements(state) - f;

        Ok((r_aero, r_struct))
    }

    fn panel_forces(
        &self,
        geometry: &PanelGeometry,
        images: &ImageSystem,
        circulations: &DVector<f64>,
    ) -> Vec<nalgebra::Vector3<f64>> {
        let v_fs = self.flow.freestream_velocity();
        let induced = induced_velocities(
            geometry,
            &self.flow,
            images,
            &geometry.bound_midpoints,
            circulations,
        );
        (0..geometry.num_panels())
            .map(|k| {
                (induced[k] + v_fs).cross(&geometry.bound_segments[k])
                    * (self.flow.density * circulations[k])
            })
            .collect()
    }

    /// Residual and dense block Jacobian at `state`, for an external Newton
    /// or adjoint solve. Layout: circulations, then reduced beam freedoms.
    /// Off-diagonal blocks come from directional derivatives of each
    /// discipline against the other's state; the transfer operator is linear
    /// and enters both couplings unchanged.
    pub fn linearize(&self, state: &CoupledState) -> Result<CoupledLinearization> {
        self.check_state(state)?;
        let deformed = self.deformed_mesh(state)?;
        let geometry = PanelGeometry::new(&deformed)?;
        let images = ImageSystem::new(self.aero.config(), &self.flow);

        let np = geometry.num_panels();
        let n_nodes = self.beam.mesh().num_nodes();
        let nu = 6 * (n_nodes - 1);
        let dim = np + nu;

        let (a, rhs) = assemble_system(&geometry, &self.flow, &images);
        let r_aero = &a * &state.circulations - rhs;

        let forces = self.panel_forces(&geometry, &images, &state.circulations);
        let loads = self.transfer.loads(&forces)?;
        let k = self.beam.stiffness_matrix()?;
        let mut f = DVector::zeros(nu);
        for i in 1..n_nodes {
            f.fixed_rows_mut::<6>(6 * (i - 1)).copy_from(&loads[i]);
        }
        let r_struct = &k * self.reduced_displacements(state) - f;

        let mut jac = DMatrix::zeros(dim, dim);
        jac.view_mut((0, 0), (np, np)).copy_from(&a);
        jac.view_mut((np, np), (nu, nu)).copy_from(&k);

        let v_fs = self.flow.freestream_velocity();
        let induced = induced_velocities(
            &geometry,
            &self.flow,
            &images,
            &geometry.bound_midpoints,
            &state.circulations,
        );

        // Displacement columns: one tangent assembly per beam freedom, the
        // geometry perturbed through the rigid station transfer. The same
        // direction also moves the force evaluation points, which feeds back
        // into the structural rows as -dF/du.
        let no_flow = FlowTangent::default();
        let zero_gamma = DVector::zeros(np);
        for d in 0..nu {
            let mut unit = vec![Vector6::zeros(); n_nodes];
            unit[d / 6 + 1][d % 6] = 1.0;
            let dmesh = self.transfer.displacements(&unit)?;
            let dgeom = geometry.tangent(&deformed, &dmesh);
            let (da, drhs) =
                assemble_system_tangent(&geometry, &dgeom, &self.flow, &no_flow, &images);
            let col = &da * &state.circulations - drhs;
            jac.view_mut((0, np + d), (np, 1)).copy_from(&col);

            let dinduced = induced_velocities_tangent(
                &geometry,
                &dgeom,
                &self.flow,
                &no_flow,
                &images,
                &geometry.bound_midpoints,
                &dgeom.dbound_midpoints,
                &state.circulations,
                &zero_gamma,
            );
            let dforces: Vec<_> = (0..np)
                .map(|kk| {
                    let ell = geometry.bound_segments[kk];
                    (dinduced[kk].cross(&ell)
                        + (induced[kk] + v_fs).cross(&dgeom.dbound_segments[kk]))
                        * (self.flow.density * state.circulations[kk])
                })
                .collect();
            let dloads = self.transfer.loads(&dforces)?;
            for i in 1..n_nodes {
                for c in 0..6 {
                    jac[(np + 6 * (i - 1) + c, np + d)] -= dloads[i][c];
                }
            }
        }

        // d(struct residual)/d(circulation) = -dF/d(circulation): forces are
        // quadratic in circulation through the induced velocity.
        for l in 0..np {
            let mut e = DVector::zeros(np);
            e[l] = 1.0;
            let dinduced = induced_velocities(
                &geometry,
                &self.flow,
                &images,
                &geometry.bound_midpoints,
                &e,
            );
            let dforces: Vec<_> = (0..np)
                .map(|kk| {
                    let ell = geometry.bound_segments[kk];
                    let mut df = dinduced[kk].cross(&ell)
                        * (self.flow.density * state.circulations[kk]);
                    if kk == l {
                        df += (induced[kk] + v_fs).cross(&ell) * self.flow.density;
                    }
                    df
                })
                .collect();
            let dloads = self.transfer.loads(&dforces)?;
            for i in 1..n_nodes {
                for c in 0..6 {
                    jac[(np + 6 * (i - 1) + c, l)] = -dloads[i][c];
                }
            }
        }

        let mut residual = DVector::zeros(dim);
        residual.rows_mut(0, np).copy_from(&r_aero);
        residual.rows_mut(np, nu).copy_from(&r_struct);
        Ok(CoupledLinearization {
            residual,
            jacobian: jac,
        })
    }

    /// Block Gauss-Seidel fixed-point iteration with under-relaxation on the
    /// displacement update. Runs until both residual norms pass their
    /// tolerances or the iteration budget is spent.
    pub fn solve(&self) -> Result<CoupledSolution> {
        let n_nodes = self.beam.mesh().num_nodes();
        let relax = self.config.relaxation;
        let mut state = CoupledState {
            circulations: DVector::zeros(self.mesh.num_panels()),
            displacements: vec![Vector6::zeros(); n_nodes],
        };

        let mut iterations = 0;
        loop {
            iterations += 1;

            let offsets = self.transfer.displacements(&state.displacements)?;
            let deformed = self.mesh.displaced(&offsets)?;
            let aero_sol = self.aero.solve(&deformed, &self.flow)?;
            state.circulations = aero_sol.circulations().clone();

            let loads = self.transfer.loads(aero_sol.panel_forces())?;
            let beam_sol = self.beam.solve(&loads)?;
            for i in 0..n_nodes {
                let step = beam_sol.displacements[i] - state.displacements[i];
                state.displacements[i] += step * relax;
            }

            let (r_aero, r_struct) = self.residual(&state)?;
            let aero_residual = r_aero.norm();
            let struct_residual = r_struct.norm();
            if self.config.debug_level >= 2
                || (self.config.debug_level == 1 && iterations % 5 == 0)
            {
                println!(
                    "coupled iter {:3}  |r_aero| = {:10.3e}  |r_struct| = {:10.3e}",
                    iterations, aero_residual, struct_residual
                );
            }

            let converged = aero_residual <= self.config.aero_tolerance
                && struct_residual <= self.config.struct_tolerance;
            if converged || iterations >= self.config.max_iterations {
                let surface = self.aero.config();
                return Ok(CoupledSolution {
                    coefficients: aero_sol.coefficients(),
                    failure: beam_sol.failure(surface.ks_rho)?,
                    mass: beam_sol.weighted_mass(surface.wing_weight_ratio),
                    state,
                    status: ConvergenceStatus {
                        converged,
                        iterations,
                        aero_residual,
                        struct_residual,
                    },
                });
            }
        }
    }
}
