mod failure;
mod solver;
mod stiffness;

pub use failure::{element_margins, element_margins_tangent, ks_aggregate, ks_aggregate_tangent};
pub use solver::{BeamJvp, BeamPerturbation, BeamSolution, BeamSolver};
pub use stiffness::{
    element_stiffness, element_stiffness_tangent, element_triad, element_triad_tangent,
    local_element_state, local_stiffness, ElementMatrix,
};
