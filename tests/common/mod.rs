#![allow(dead_code)]

use aerostruct::{AeroMesh, CrossSection, FlowState, StructMesh, SurfaceConfig};
use nalgebra::Vector3;

/// Flat rectangular mesh with `nx` chordwise and `ny` spanwise points,
/// spanning y in [y0, y0 + span].
pub fn rectangular_mesh(nx: usize, ny: usize, chord: f64, span: f64, y0: f64) -> AeroMesh {
    let mut points = Vec::with_capacity(nx * ny);
    for i in 0..nx {
        for j in 0..ny {
            points.push(Vector3::new(
                chord * i as f64 / (nx - 1) as f64,
                y0 + span * j as f64 / (ny - 1) as f64,
                0.0,
            ));
        }
    }
    AeroMesh::new(nx, ny, points).expect("valid rectangular mesh")
}

/// Centered full-span wing.
pub fn full_wing_mesh(nx: usize, ny: usize, chord: f64, span: f64) -> AeroMesh {
    rectangular_mesh(nx, ny, chord, span, -span / 2.0)
}

/// Right half of a symmetric wing, root at y = 0.
pub fn half_wing_mesh(nx: usize, ny: usize, chord: f64, semispan: f64) -> AeroMesh {
    rectangular_mesh(nx, ny, chord, semispan, 0.0)
}

/// Straight spar at mid chord, one node per spanwise mesh station.
pub fn mid_chord_spar(ny: usize, chord: f64, semispan: f64) -> StructMesh {
    let nodes = (0..ny)
        .map(|j| {
            Vector3::new(
                chord / 2.0,
                semispan * j as f64 / (ny - 1) as f64,
                0.0,
            )
        })
        .collect();
    StructMesh::new(nodes).expect("valid spar")
}

pub fn tube_sections(n: usize, radius: f64, thickness: f64) -> Vec<CrossSection> {
    vec![CrossSection::tube(radius, thickness); n]
}

/// Reference quantities for the full wing (mirrored half included).
pub fn half_wing_surface(chord: f64, semispan: f64) -> SurfaceConfig {
    SurfaceConfig {
        symmetry: true,
        s_ref: chord * semispan,
        c_ref: chord,
        b_ref: 2.0 * semispan,
        ..Default::default()
    }
}

pub fn full_wing_surface(chord: f64, span: f64) -> SurfaceConfig {
    SurfaceConfig {
        s_ref: chord * span,
        c_ref: chord,
        b_ref: span,
        ..Default::default()
    }
}

pub fn cruise_flow(alpha: f64) -> FlowState {
    FlowState {
        alpha,
        ..Default::default()
    }
}
