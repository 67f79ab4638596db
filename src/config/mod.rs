mod flow;
mod solver;
mod surface;

pub use flow::FlowState;
pub use solver::CoupledSolverConfig;
pub use surface::SurfaceConfig;
