mod influence;
mod solver;
mod vortex;

pub use influence::{
    assemble_system, assemble_system_tangent, induced_velocities, induced_velocities_tangent,
    FlowTangent, GroundPlane, ImageSystem,
};
pub use solver::{AeroCoefficients, VlmJvp, VlmPerturbation, VlmSolution, VlmSolver};
pub use vortex::{finite_vortex, semi_infinite_vortex, VORTEX_TOL};
