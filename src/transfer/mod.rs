//! Load and displacement transfer between the panel mesh and the beam.
//!
//! The map is built once from the undeformed meshes and stays fixed through
//! the coupled iteration: every chordwise panel strip is bound to its
//! nearest beam node, with moment arms frozen at build time. Both directions
//! are linear, so the map is its own derivative.

use nalgebra::{Vector3, Vector6};

use crate::error::{AnalysisError, Result};
use crate::mesh::{AeroMesh, PanelGeometry, StructMesh};

pub struct TransferMap {
    num_nodes: usize,
    num_panels: usize,
    num_points: usize,
    /// Beam node receiving each panel's force.
    panel_node: Vec<usize>,
    /// Bound-vortex midpoint relative to that node.
    panel_arm: Vec<Vector3<f64>>,
    /// Beam node driving each mesh point.
    point_node: Vec<usize>,
    /// Mesh point relative to that node.
    point_arm: Vec<Vector3<f64>>,
}

impl TransferMap {
    pub fn new(aero: &AeroMesh, beam: &StructMesh) -> Result<Self> {
        let geometry = PanelGeometry::new(aero)?;
        let nx = aero.nx();
        let ny = aero.ny();
        let num_nodes = beam.num_nodes();

        let nearest = |p: Vector3<f64>| {
            let mut best = 0;
            let mut best_d = f64::INFINITY;
            for (k, node) in beam.nodes().iter().enumerate() {
                let d = (p - node).norm_squared();
                if d < best_d {
                    best_d = d;
                    best = k;
                }
            }
            best
        };

        // Panel strips: all chordwise panels of spanwise column j share one
        // node, picked by the strip centroid.
        let mut panel_node = vec![0; geometry.num_panels()];
        let mut panel_arm = vec![Vector3::zeros(); geometry.num_panels()];
        for j in 0..ny - 1 {
            let mut centroid = Vector3::zeros();
            for i in 0..nx - 1 {
                centroid += geometry.bound_midpoints[geometry.panel_index(i, j)];
            }
            centroid /= (nx - 1) as f64;
            let node = nearest(centroid);
            for i in 0..nx - 1 {
                let k = geometry.panel_index(i, j);
                panel_node[k] = node;
                panel_arm[k] = geometry.bound_midpoints[k] - beam.node(node);
            }
        }

        // Mesh point stations: column j of the point grid.
        let mut point_node = vec![0; nx * ny];
        let mut point_arm = vec![Vector3::zeros(); nx * ny];
        for j in 0..ny {
            let mut centroid = Vector3::zeros();
            for i in 0..nx {
                centroid += aero.point(i, j);
            }
            centroid /= nx as f64;
            let node = nearest(centroid);
            for i in 0..nx {
                let k = i * ny + j;
                point_node[k] = node;
                point_arm[k] = aero.point(i, j) - beam.node(node);
            }
        }

        Ok(Self {
            num_nodes,
            num_panels: geometry.num_panels(),
            num_points: nx * ny,
            panel_node,
            panel_arm,
            point_node,
            point_arm,
        })
    }

    pub fn num_struct_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Sum panel forces into nodal loads, with moments taken about the
    /// receiving node. Layout per node is (force, moment).
    pub fn loads(&self, panel_forces: &[Vector3<f64>]) -> Result<Vec<Vector6<f64>>> {
        if panel_forces.len() != self.num_panels {
            return Err(AnalysisError::DimensionMismatch(format!(
                "{} panel forces for {} panels",
                panel_forces.len(),
                self.num_panels
            )));
        }
        let mut loads = vec![Vector6::zeros(); self.num_nodes];
        for (k, f) in panel_forces.iter().enumerate() {
            let node = self.panel_node[k];
            let m = self.panel_arm[k].cross(f);
            for c in 0..3 {
                loads[node][c] += f[c];
                loads[node][3 + c] += m[c];
            }
        }
        Ok(loads)
    }

    /// Rigid small-angle motion of every mesh point from the 6-DOF state of
    /// its station node: d = u + theta x r.
    pub fn displacements(&self, nodal: &[Vector6<f64>]) -> Result<Vec<Vector3<f64>>> {
        if nodal.len() != self.num_nodes {
            return Err(AnalysisError::DimensionMismatch(format!(
                "{} nodal states for {} nodes",
                nodal.len(),
                self.num_nodes
            )));
        }
        let mut offsets = vec![Vector3::zeros(); self.num_points];
        for (k, offset) in offsets.iter_mut().enumerate() {
            let state = &nodal[self.point_node[k]];
            let u = Vector3::new(state[0], state[1], state[2]);
            let theta = Vector3::new(state[3], state[4], state[5]);
            *offset = u + theta.cross(&self.point_arm[k]);
        }
        Ok(offsets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rectangular_wing(nx: usize, ny: usize, span: f64, chord: f64) -> AeroMesh {
        let mut points = Vec::with_capacity(nx * ny);
        for i in 0..nx {
            for j in 0..ny {
                points.push(Vector3::new(
                    chord * i as f64 / (nx - 1) as f64,
                    span * j as f64 / (ny - 1) as f64,
                    0.0,
                ));
            }
        }
        AeroMesh::new(nx, ny, points).unwrap()
    }

    fn spar(ny: usize, span: f64, chord: f64) -> StructMesh {
        let nodes = (0..ny)
            .map(|j| Vector3::new(chord / 2.0, span * j as f64 / (ny - 1) as f64, 0.0))
            .collect();
        StructMesh::new(nodes).unwrap()
    }

    #[test]
    fn zero_displacement_leaves_the_mesh_unperturbed() {
        let aero = rectangular_wing(3, 5, 4.0, 1.0);
        let beam = spar(5, 4.0, 1.0);
        let map = TransferMap::new(&aero, &beam).unwrap();
        let offsets = map
            .displacements(&vec![Vector6::zeros(); beam.num_nodes()])
            .unwrap();
        assert!(offsets.iter().all(|o| o.norm() == 0.0));
    }

    #[test]
    fn transfer_conserves_force_and_moment() {
        let aero = rectangular_wing(4, 6, 5.0, 1.2);
        let beam = spar(6, 5.0, 1.2);
        let map = TransferMap::new(&aero, &beam).unwrap();
        let geometry = PanelGeometry::new(&aero).unwrap();

        let forces: Vec<_> = (0..aero.num_panels())
            .map(|k| Vector3::new(0.1 * k as f64, -0.05 * k as f64, 1.0 + 0.2 * k as f64))
            .collect();
        let loads = map.loads(&forces).unwrap();

        let mut f_in = Vector3::zeros();
        let mut m_in = Vector3::zeros();
        for (k, f) in forces.iter().enumerate() {
            f_in += f;
            m_in += geometry.bound_midpoints[k].cross(f);
        }
        let mut f_out = Vector3::zeros();
        let mut m_out = Vector3::zeros();
        for (n, load) in loads.iter().enumerate() {
            let f = Vector3::new(load[0], load[1], load[2]);
            f_out += f;
            m_out += beam.node(n).cross(&f) + Vector3::new(load[3], load[4], load[5]);
        }
        assert_relative_eq!(f_out, f_in, epsilon = 1e-10);
        assert_relative_eq!(m_out, m_in, epsilon = 1e-10);
    }

    #[test]
    fn pure_translation_translates_every_station_point() {
        let aero = rectangular_wing(3, 4, 3.0, 1.0);
        let beam = spar(4, 3.0, 1.0);
        let map = TransferMap::new(&aero, &beam).unwrap();

        let mut nodal = vec![Vector6::zeros(); 4];
        for state in &mut nodal {
            state[2] = 0.25;
        }
        let offsets = map.displacements(&nodal).unwrap();
        for o in offsets {
            assert_relative_eq!(o, Vector3::new(0.0, 0.0, 0.25), epsilon = 1e-12);
        }
    }

    #[test]
    fn small_rotation_moves_points_by_theta_cross_r() {
        let aero = rectangular_wing(3, 4, 3.0, 1.0);
        let beam = spar(4, 3.0, 1.0);
        let map = TransferMap::new(&aero, &beam).unwrap();

        // Twist the tip node about the spanwise axis.
        let mut nodal = vec![Vector6::zeros(); 4];
        nodal[3][4] = 0.02;
        let offsets = map.displacements(&nodal).unwrap();

        // Leading-edge tip point sits half a chord ahead of the spar.
        let k = 0 * 4 + 3;
        let r = aero.point(0, 3) - beam.node(3);
        let expected = Vector3::new(0.0, 0.02, 0.0).cross(&r);
        assert_relative_eq!(offsets[k], expected, epsilon = 1e-12);
        // Points on untouched stations stay put.
        assert_relative_eq!(offsets[0], Vector3::zeros(), epsilon = 1e-12);
    }
}
