use nalgebra::linalg::LU;
use nalgebra::{DMatrix, DVector, Dyn, Vector3, Vector6};

use crate::error::{AnalysisError, MatrixKind, Result};
use crate::mesh::{CrossSection, CrossSectionTangent, StructMesh};

use super::failure::{element_margins, element_margins_tangent, ks_aggregate, ks_aggregate_tangent};
use super::stiffness::{element_stiffness, element_stiffness_tangent, element_triad};

/// Directional perturbation of the beam inputs. Lengths must match the mesh:
/// one entry per node for `dnodes` and `dloads`, one per element for
/// `dsections`.
#[derive(Debug, Clone)]
pub struct BeamPerturbation {
    pub dnodes: Vec<Vector3<f64>>,
    pub dloads: Vec<Vector6<f64>>,
    pub dsections: Vec<CrossSectionTangent>,
}

impl BeamPerturbation {
    pub fn zeros(num_nodes: usize) -> Self {
        Self {
            dnodes: vec![Vector3::zeros(); num_nodes],
            dloads: vec![Vector6::zeros(); num_nodes],
            dsections: vec![CrossSectionTangent::default(); num_nodes - 1],
        }
    }

    pub fn loads_only(dloads: Vec<Vector6<f64>>) -> Self {
        let n = dloads.len();
        let mut p = Self::zeros(n);
        p.dloads = dloads;
        p
    }
}

/// Tangents of the beam outputs along one [`BeamPerturbation`] direction.
#[derive(Debug, Clone)]
pub struct BeamJvp {
    pub ddisplacements: Vec<Vector6<f64>>,
    pub dmass: f64,
}

/// Cantilever beam chain clamped at node 0, assembled from 12-DOF spatial
/// elements.
#[derive(Debug, Clone)]
pub struct BeamSolver {
    mesh: StructMesh,
    sections: Vec<CrossSection>,
}

impl BeamSolver {
    pub fn new(mesh: StructMesh, sections: Vec<CrossSection>) -> Result<Self> {
        if sections.len() != mesh.num_elements() {
            return Err(AnalysisError::DimensionMismatch(format!(
                "{} cross sections for {} elements",
                sections.len(),
                mesh.num_elements()
            )));
        }
        for sec in &sections {
            sec.validate()?;
        }
        Ok(Self { mesh, sections })
    }

    pub fn mesh(&self) -> &StructMesh {
        &self.mesh
    }

    pub fn sections(&self) -> &[CrossSection] {
        &self.sections
    }

    /// Structural spar mass, before any non-structural weight factor.
    pub fn spar_mass(&self) -> f64 {
        (0..self.mesh.num_elements())
            .map(|e| {
                self.sections[e].density * self.sections[e].area * self.mesh.element_length(e)
            })
            .sum()
    }

    /// Global stiffness with the root clamp eliminated, 6(N-1) square.
    pub fn stiffness_matrix(&self) -> Result<DMatrix<f64>> {
        let reduced = 6 * (self.mesh.num_nodes() - 1);
        let mut k = DMatrix::zeros(reduced, reduced);
        for e in 0..self.mesh.num_elements() {
            let ke = element_stiffness(
                &self.sections[e],
                self.mesh.node(e),
                self.mesh.node(e + 1),
            )?;
            scatter_element(&mut k, e, &ke);
        }
        Ok(k)
    }

    /// Solve K u = F with the root clamp eliminated. `loads` holds one
    /// force/moment pair per node; the root entry is reacted by the clamp.
    pub fn solve(&self, loads: &[Vector6<f64>]) -> Result<BeamSolution> {
        let n = self.mesh.num_nodes();
        if loads.len() != n {
            return Err(AnalysisError::DimensionMismatch(format!(
                "{} load records for {} nodes",
                loads.len(),
                n
            )));
        }

        let reduced = 6 * (n - 1);
        let k = self.stiffness_matrix()?;

        let mut rhs = DVector::zeros(reduced);
        for i in 1..n {
            rhs.fixed_rows_mut::<6>(6 * (i - 1)).copy_from(&loads[i]);
        }

        let lu = k.lu();
        let u = lu.solve(&rhs).ok_or(AnalysisError::SingularSystem {
            matrix: MatrixKind::Stiffness,
            size: reduced,
        })?;

        let mut displacements = vec![Vector6::zeros(); n];
        for i in 1..n {
            displacements[i] = u.fixed_rows::<6>(6 * (i - 1)).into_owned();
        }

        Ok(BeamSolution {
            solver: self.clone(),
            loads: loads.to_vec(),
            lu,
            displacements,
            spar_mass: self.spar_mass(),
        })
    }
}

/// A factored beam solve: displacements plus the LU reused for every
/// derivative direction.
pub struct BeamSolution {
    solver: BeamSolver,
    loads: Vec<Vector6<f64>>,
    lu: LU<f64, Dyn, Dyn>,
    pub displacements: Vec<Vector6<f64>>,
    pub spar_mass: f64,
}

impl BeamSolution {
    pub fn mesh(&self) -> &StructMesh {
        self.solver.mesh()
    }

    pub fn loads(&self) -> &[Vector6<f64>] {
        &self.loads
    }

    /// Spar mass scaled by the wing-weight factor covering non-structural
    /// mass.
    pub fn weighted_mass(&self, wing_weight_ratio: f64) -> f64 {
        self.spar_mass * wing_weight_ratio
    }

    /// All per-element stress margins, (stress / allowable) - 1.
    pub fn margins(&self) -> Result<Vec<f64>> {
        element_margins(
            self.solver.mesh(),
            self.solver.sections(),
            &self.displacements,
        )
    }

    /// Smooth-maximum aggregate of [`Self::margins`]. Feasible when below
    /// zero.
    pub fn failure(&self, ks_rho: f64) -> Result<f64> {
        Ok(ks_aggregate(&self.margins()?, ks_rho))
    }

    /// Directional derivative of the aggregated failure margin, chaining
    /// the displacement tangent through the stress recovery and the KS
    /// weights.
    pub fn failure_jvp(&self, p: &BeamPerturbation, ks_rho: f64) -> Result<f64> {
        let jvp = self.jvp(p)?;
        let (margins, dmargins) = element_margins_tangent(
            self.solver.mesh(),
            self.solver.sections(),
            &self.displacements,
            &p.dnodes,
            &jvp.ddisplacements,
        )?;
        Ok(ks_aggregate_tangent(&margins, &dmargins, ks_rho))
    }

    /// Displacement and mass tangents along one input direction, by the
    /// implicit-function rule: K du = dF - dK u, reusing the factorization.
    pub fn jvp(&self, p: &BeamPerturbation) -> Result<BeamJvp> {
        let mesh = self.solver.mesh();
        let n = mesh.num_nodes();
        if p.dnodes.len() != n || p.dloads.len() != n || p.dsections.len() != n - 1 {
            return Err(AnalysisError::DimensionMismatch(
                "perturbation lengths do not match the beam mesh".to_string(),
            ));
        }

        let reduced = 6 * (n - 1);
        let mut rhs = DVector::zeros(reduced);
        for i in 1..n {
            rhs.fixed_rows_mut::<6>(6 * (i - 1)).copy_from(&p.dloads[i]);
        }

        let mut dmass = 0.0;
        for e in 0..mesh.num_elements() {
            let sec = &self.solver.sections()[e];
            let (_, dke) = element_stiffness_tangent(
                sec,
                &p.dsections[e],
                mesh.node(e),
                mesh.node(e + 1),
                p.dnodes[e],
                p.dnodes[e + 1],
            )?;

            let mut ue = nalgebra::SVector::<f64, 12>::zeros();
            ue.fixed_rows_mut::<6>(0).copy_from(&self.displacements[e]);
            ue.fixed_rows_mut::<6>(6)
                .copy_from(&self.displacements[e + 1]);
            let r = dke * ue;
            for i in 0..12 {
                let g = 6 * e + i;
                if g >= 6 {
                    rhs[g - 6] -= r[i];
                }
            }

            let (t, l) = element_triad(mesh.node(e), mesh.node(e + 1))?;
            let dl = t.row(0).transpose().dot(&(p.dnodes[e + 1] - p.dnodes[e]));
            dmass += sec.density * (p.dsections[e].darea * l + sec.area * dl);
        }

        let du = self
            .lu
            .solve(&rhs)
            .ok_or(AnalysisError::SingularSystem {
                matrix: MatrixKind::Stiffness,
                size: reduced,
            })?;

        let mut ddisplacements = vec![Vector6::zeros(); n];
        for i in 1..n {
            ddisplacements[i] = du.fixed_rows::<6>(6 * (i - 1)).into_owned();
        }
        Ok(BeamJvp {
            ddisplacements,
            dmass,
        })
    }
}

fn scatter_element(k: &mut DMatrix<f64>, e: usize, ke: &super::stiffness::ElementMatrix) {
    // Element e spans nodes e and e+1; clamped root DOFs (global 0..6) are
    // dropped, the rest shift down by 6.
    for i in 0..12 {
        let gi = 6 * e + i;
        if gi < 6 {
            continue;
        }
        for j in 0..12 {
            let gj = 6 * e + j;
            if gj < 6 {
                continue;
            }
            k[(gi - 6, gj - 6)] += ke[(i, j)];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn straight_beam(num_elements: usize, length: f64) -> BeamSolver {
        let n = num_elements + 1;
        let nodes = (0..n)
            .map(|i| Vector3::new(0.0, length * i as f64 / num_elements as f64, 0.0))
            .collect();
        let mesh = StructMesh::new(nodes).unwrap();
        let sections = vec![CrossSection::tube(0.05, 0.005); num_elements];
        BeamSolver::new(mesh, sections).unwrap()
    }

    #[test]
    fn axial_bar_stretch_matches_hookes_law() {
        let solver = straight_beam(4, 2.0);
        let sec = solver.sections()[0];
        let f = 1.0e4;
        let mut loads = vec![Vector6::zeros(); 5];
        loads[4][1] = f;
        let sol = solver.solve(&loads).unwrap();
        assert_relative_eq!(
            sol.displacements[4][1],
            f * 2.0 / (sec.e * sec.area),
            max_relative = 1e-9
        );
    }

    #[test]
    fn section_count_mismatch_is_rejected() {
        let mesh = StructMesh::new(vec![
            Vector3::zeros(),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 2.0, 0.0),
        ])
        .unwrap();
        let r = BeamSolver::new(mesh, vec![CrossSection::tube(0.05, 0.005)]);
        assert!(matches!(r, Err(AnalysisError::DimensionMismatch(_))));
    }

    #[test]
    fn spar_mass_integrates_density_area_length() {
        let solver = straight_beam(3, 3.0);
        let sec = solver.sections()[0];
        assert_relative_eq!(
            solver.spar_mass(),
            sec.density * sec.area * 3.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn jvp_matches_central_differences() {
        let base_nodes = vec![
            Vector3::new(0.05, 0.0, 0.0),
            Vector3::new(0.10, 1.1, 0.08),
            Vector3::new(0.15, 2.3, 0.12),
        ];
        let sections = vec![CrossSection::tube(0.05, 0.004), CrossSection::tube(0.04, 0.003)];
        let mut loads = vec![Vector6::zeros(); 3];
        loads[1] = Vector6::new(10.0, 5.0, 300.0, 2.0, 8.0, -3.0);
        loads[2] = Vector6::new(-4.0, 2.0, 500.0, 6.0, -1.0, 2.5);

        let mut p = BeamPerturbation::zeros(3);
        p.dnodes[1] = Vector3::new(0.02, -0.03, 0.05);
        p.dnodes[2] = Vector3::new(-0.01, 0.04, 0.02);
        p.dloads[1] = Vector6::new(1.0, -2.0, 30.0, 0.5, 1.5, -0.7);
        p.dloads[2] = Vector6::new(0.3, 0.8, -20.0, 1.2, 0.4, 0.9);
        p.dsections[0] = CrossSectionTangent {
            darea: 3e-5,
            diy: 2e-8,
            diz: -1e-8,
            dj: 3e-8,
        };

        let solve_at = |h: f64| {
            let nodes: Vec<_> = base_nodes
                .iter()
                .zip(&p.dnodes)
                .map(|(x, dx)| x + dx * h)
                .collect();
            let secs: Vec<_> = sections
                .iter()
                .zip(&p.dsections)
                .map(|(s, ds)| {
                    let mut s = *s;
                    s.area += h * ds.darea;
                    s.iy += h * ds.diy;
                    s.iz += h * ds.diz;
                    s.j += h * ds.dj;
                    s
                })
                .collect();
            let ld: Vec<_> = loads.iter().zip(&p.dloads).map(|(f, df)| f + df * h).collect();
            BeamSolver::new(StructMesh::new(nodes).unwrap(), secs)
                .unwrap()
                .solve(&ld)
                .unwrap()
        };

        let sol = solve_at(0.0);
        let jvp = sol.jvp(&p).unwrap();

        let h = 1e-6;
        let plus = solve_at(h);
        let minus = solve_at(-h);
        for i in 0..3 {
            let fd = (plus.displacements[i] - minus.displacements[i]) / (2.0 * h);
            for c in 0..6 {
                assert_relative_eq!(
                    jvp.ddisplacements[i][c],
                    fd[c],
                    epsilon = 1e-10,
                    max_relative = 1e-5
                );
            }
        }
        let fd_mass = (plus.spar_mass - minus.spar_mass) / (2.0 * h);
        assert_relative_eq!(jvp.dmass, fd_mass, max_relative = 1e-6);

        let dfailure = sol.failure_jvp(&p, 50.0).unwrap();
        let fd_failure =
            (plus.failure(50.0).unwrap() - minus.failure(50.0).unwrap()) / (2.0 * h);
        assert_relative_eq!(dfailure, fd_failure, epsilon = 1e-9, max_relative = 1e-5);
    }
}
