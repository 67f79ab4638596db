mod common;

use approx::assert_relative_eq;
use aerostruct::{AnalysisError, FlowState, SurfaceConfig, VlmSolver};
use common::{cruise_flow, full_wing_mesh, full_wing_surface, half_wing_mesh, half_wing_surface};

#[test]
fn lift_curve_follows_lifting_line_across_aspect_ratios() {
    let chord = 1.0;
    for span in [8.0, 12.0, 16.0] {
        let ar = span / chord;
        let alpha = 3.0_f64.to_radians();
        let mesh = full_wing_mesh(2, 2 * span as usize + 1, chord, span);
        let solver = VlmSolver::new(full_wing_surface(chord, span));
        let sol = solver.solve(&mesh, &cruise_flow(alpha)).unwrap();

        let cl_theory = 2.0 * std::f64::consts::PI * alpha * ar / (ar + 2.0);
        assert_relative_eq!(sol.coefficients().cl, cl_theory, max_relative = 0.05);
    }
}

#[test]
fn drag_polar_is_convex_in_alpha() {
    let mesh = half_wing_mesh(3, 9, 1.0, 4.0);
    let solver = VlmSolver::new(half_wing_surface(1.0, 4.0));

    let mut previous = -1.0;
    for alpha_deg in [0.0_f64, 2.0, 4.0, 6.0, 8.0] {
        let sol = solver
            .solve(&mesh, &cruise_flow(alpha_deg.to_radians()))
            .unwrap();
        let cd = sol.coefficients().cd;
        assert!(cd >= -1e-10, "cd = {} at {} deg", cd, alpha_deg);
        assert!(cd >= previous, "induced drag should grow with alpha");
        previous = cd;
    }
}

#[test]
fn ground_effect_without_symmetry_is_rejected() {
    let mesh = full_wing_mesh(2, 5, 1.0, 6.0);
    let config = SurfaceConfig {
        ground_effect: true,
        ..full_wing_surface(1.0, 6.0)
    };
    let flow = FlowState {
        height_above_ground: Some(10.0),
        ..cruise_flow(0.05)
    };
    assert!(matches!(
        VlmSolver::new(config).solve(&mesh, &flow),
        Err(AnalysisError::InvalidConfiguration(_))
    ));
}

#[test]
fn ground_effect_without_height_is_rejected() {
    let mesh = half_wing_mesh(2, 5, 1.0, 3.0);
    let config = SurfaceConfig {
        ground_effect: true,
        ..half_wing_surface(1.0, 3.0)
    };
    assert!(matches!(
        VlmSolver::new(config).solve(&mesh, &cruise_flow(0.05)),
        Err(AnalysisError::InvalidConfiguration(_))
    ));
}

#[test]
fn moment_reference_shift_moves_pitching_moment() {
    let chord = 1.0;
    let span = 6.0;
    let mesh = full_wing_mesh(3, 9, chord, span);
    let flow = cruise_flow(4.0_f64.to_radians());

    let fwd = VlmSolver::new(full_wing_surface(chord, span))
        .solve(&mesh, &flow)
        .unwrap();
    let aft_config = SurfaceConfig {
        moment_ref: nalgebra::Vector3::new(chord, 0.0, 0.0),
        ..full_wing_surface(chord, span)
    };
    let aft = VlmSolver::new(aft_config).solve(&mesh, &flow).unwrap();

    // Pure shift along x: pitch moment changes by the lift couple, roll and
    // yaw stay put for a symmetric lift distribution.
    assert!(aft.coefficients().cm.y > fwd.coefficients().cm.y);
    assert_relative_eq!(aft.coefficients().cm.x, fwd.coefficients().cm.x, epsilon = 1e-10);
}
