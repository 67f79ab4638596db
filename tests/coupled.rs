mod common;

use aerostruct::{
    AnalysisError, CoupledSolverConfig, CoupledSystem, FlowState, SurfaceConfig, TransferMap,
    VlmSolver,
};
use common::{
    cruise_flow, half_wing_mesh, half_wing_surface, mid_chord_spar, tube_sections,
};
use nalgebra::Vector6;

fn build_system(config: CoupledSolverConfig) -> CoupledSystem {
    let chord = 1.0;
    let semispan = 5.0;
    let ny = 6;
    CoupledSystem::new(
        half_wing_surface(chord, semispan),
        config,
        half_wing_mesh(2, ny, chord, semispan),
        mid_chord_spar(ny, chord, semispan),
        tube_sections(ny - 1, 0.05, 0.005),
        cruise_flow(3.0_f64.to_radians()),
    )
    .unwrap()
}

#[test]
fn coupled_solve_converges_and_is_idempotent() {
    let sys = build_system(CoupledSolverConfig::default());
    let solution = sys.solve().unwrap();
    assert!(
        solution.status.converged,
        "stalled after {} iterations: |r_a| = {:e}, |r_s| = {:e}",
        solution.status.iterations,
        solution.status.aero_residual,
        solution.status.struct_residual
    );

    // Re-evaluating the residual at the converged state keeps both norms
    // inside the tolerances: the state is a fixed point.
    let (r_aero, r_struct) = sys.residual(&solution.state).unwrap();
    assert!(r_aero.norm() <= 1e-8);
    assert!(r_struct.norm() <= 1e-6);
}

#[test]
fn flexible_wing_bends_up_under_lift() {
    let sys = build_system(CoupledSolverConfig::default());
    let solution = sys.solve().unwrap();

    let tip = solution.state.displacements.last().unwrap();
    assert!(tip[2] > 0.0, "tip should deflect upward, got {}", tip[2]);
    assert!(solution.mass > 0.0);
    assert!(
        solution.failure < 0.0,
        "cruise load must stay inside the stress envelope, margin {}",
        solution.failure
    );
    assert!(solution.coefficients.cl > 0.0);
}

#[test]
fn exhausted_iteration_budget_is_a_status_not_an_error() {
    let config = CoupledSolverConfig {
        max_iterations: 1,
        aero_tolerance: 1e-14,
        struct_tolerance: 1e-14,
        ..Default::default()
    };
    let solution = build_system(config).solve().unwrap();
    assert!(!solution.status.converged);
    assert_eq!(solution.status.iterations, 1);
}

#[test]
fn invalid_relaxation_is_rejected_at_setup() {
    let config = CoupledSolverConfig {
        relaxation: 0.0,
        ..Default::default()
    };
    let chord = 1.0;
    let semispan = 5.0;
    let ny = 6;
    let r = CoupledSystem::new(
        half_wing_surface(chord, semispan),
        config,
        half_wing_mesh(2, ny, chord, semispan),
        mid_chord_spar(ny, chord, semispan),
        tube_sections(ny - 1, 0.05, 0.004),
        cruise_flow(0.05),
    );
    assert!(matches!(r, Err(AnalysisError::InvalidConfiguration(_))));
}

#[test]
fn ground_effect_with_sideslip_fails_before_any_solve() {
    let chord = 1.0;
    let semispan = 5.0;
    let ny = 6;
    let surface = SurfaceConfig {
        ground_effect: true,
        ..half_wing_surface(chord, semispan)
    };
    let flow = FlowState {
        beta: 0.02,
        height_above_ground: Some(20.0),
        ..cruise_flow(0.05)
    };
    let r = CoupledSystem::new(
        surface,
        CoupledSolverConfig::default(),
        half_wing_mesh(2, ny, chord, semispan),
        mid_chord_spar(ny, chord, semispan),
        tube_sections(ny - 1, 0.05, 0.004),
        flow,
    );
    assert!(matches!(r, Err(AnalysisError::InvalidConfiguration(_))));
}

#[test]
fn transfer_round_trip_is_the_identity_at_zero_displacement() {
    let chord = 1.0;
    let semispan = 5.0;
    let ny = 6;
    let aero = half_wing_mesh(2, ny, chord, semispan);
    let beam = mid_chord_spar(ny, chord, semispan);
    let map = TransferMap::new(&aero, &beam).unwrap();

    // Forward: real aero forces become nodal loads.
    let sol = VlmSolver::new(half_wing_surface(chord, semispan))
        .solve(&aero, &cruise_flow(0.05))
        .unwrap();
    let loads = map.loads(sol.panel_forces()).unwrap();
    assert!(loads.iter().any(|l| l.norm() > 0.0));

    // Backward with zero displacement: the mesh must not move.
    let offsets = map
        .displacements(&vec![Vector6::zeros(); beam.num_nodes()])
        .unwrap();
    let displaced = aero.displaced(&offsets).unwrap();
    for (a, b) in aero.points().iter().zip(displaced.points()) {
        assert_eq!(a, b);
    }
}

#[test]
fn stiffer_spar_deflects_less() {
    let chord = 1.0;
    let semispan = 5.0;
    let ny = 6;
    let tip_z = |radius: f64| {
        let sys = CoupledSystem::new(
            half_wing_surface(chord, semispan),
            CoupledSolverConfig::default(),
            half_wing_mesh(2, ny, chord, semispan),
            mid_chord_spar(ny, chord, semispan),
            tube_sections(ny - 1, radius, 0.004),
            cruise_flow(4.0_f64.to_radians()),
        )
        .unwrap();
        let solution = sys.solve().unwrap();
        solution.state.displacements.last().unwrap()[2]
    };

    let soft = tip_z(0.035);
    let stiff = tip_z(0.06);
    assert!(soft > stiff, "soft {} vs stiff {}", soft, stiff);
    assert!(stiff > 0.0);
}
