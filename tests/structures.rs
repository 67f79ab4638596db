mod common;

use approx::assert_relative_eq;
use aerostruct::structures::BeamSolver;
use aerostruct::{CrossSection, StructMesh};
use common::tube_sections;
use nalgebra::{Vector3, Vector6};

fn cantilever(num_elements: usize, length: f64, section: CrossSection) -> BeamSolver {
    let n = num_elements + 1;
    let nodes = (0..n)
        .map(|i| Vector3::new(0.0, length * i as f64 / num_elements as f64, 0.0))
        .collect();
    BeamSolver::new(StructMesh::new(nodes).unwrap(), vec![section; num_elements]).unwrap()
}

#[test]
fn tip_point_load_matches_euler_bernoulli_single_element() {
    let length = 3.0;
    let section = CrossSection::tube(0.05, 0.005);
    let solver = cantilever(1, length, section);

    let p = 2000.0;
    let mut loads = vec![Vector6::zeros(); 2];
    loads[1][2] = p;
    let sol = solver.solve(&loads).unwrap();

    // Hermite cubic shape functions carry the end-load case exactly.
    let expected = p * length.powi(3) / (3.0 * section.e * section.iy);
    assert_relative_eq!(sol.displacements[1][2], expected, max_relative = 1e-9);
}

#[test]
fn tip_point_load_matches_euler_bernoulli_multi_element() {
    let length = 3.0;
    let section = CrossSection::tube(0.05, 0.005);
    let solver = cantilever(8, length, section);

    let p = 2000.0;
    let mut loads = vec![Vector6::zeros(); 9];
    loads[8][2] = p;
    let sol = solver.solve(&loads).unwrap();

    let expected = p * length.powi(3) / (3.0 * section.e * section.iy);
    assert_relative_eq!(sol.displacements[8][2], expected, max_relative = 1e-9);

    // Deflection grows monotonically towards the tip.
    for i in 1..8 {
        assert!(sol.displacements[i + 1][2] > sol.displacements[i][2]);
    }
}

#[test]
fn tip_slope_matches_closed_form() {
    let length = 2.5;
    let section = CrossSection::tube(0.04, 0.004);
    let solver = cantilever(4, length, section);

    let p = 1500.0;
    let mut loads = vec![Vector6::zeros(); 5];
    loads[4][2] = p;
    let sol = solver.solve(&loads).unwrap();

    let expected = p * length.powi(2) / (2.0 * section.e * section.iy);
    assert_relative_eq!(sol.displacements[4][3].abs(), expected, max_relative = 1e-9);
}

#[test]
fn failure_margin_tracks_the_applied_load() {
    let length = 4.0;
    let section = CrossSection::tube(0.05, 0.004);
    let solver = cantilever(6, length, section);

    let margin_at = |p: f64| {
        let mut loads = vec![Vector6::zeros(); 7];
        loads[6][2] = p;
        solver.solve(&loads).unwrap().failure(50.0).unwrap()
    };

    let light = margin_at(100.0);
    let heavy = margin_at(10_000.0);
    assert!(light < heavy, "heavier load must reduce the stress margin");
    assert!(light < 0.0, "a light load should be feasible");
}

#[test]
fn weighted_mass_scales_the_spar_mass() {
    let mesh = StructMesh::new(vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(0.0, 2.0, 0.0),
        Vector3::new(0.0, 4.0, 0.0),
    ])
    .unwrap();
    let sections = tube_sections(2, 0.05, 0.005);
    let solver = BeamSolver::new(mesh, sections.clone()).unwrap();
    let sol = solver.solve(&vec![Vector6::zeros(); 3]).unwrap();

    let bare = sections[0].density * sections[0].area * 4.0;
    assert_relative_eq!(solver.spar_mass(), bare, max_relative = 1e-12);
    assert_relative_eq!(sol.weighted_mass(1.25), 1.25 * bare, max_relative = 1e-12);
}
