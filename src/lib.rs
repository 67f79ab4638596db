pub mod aero;
pub mod config;
pub mod coupled;
pub mod error;
pub mod mesh;
pub mod structures;
pub mod transfer;

pub use aero::{AeroCoefficients, VlmPerturbation, VlmSolution, VlmSolver};
pub use config::{CoupledSolverConfig, FlowState, SurfaceConfig};
pub use coupled::{ConvergenceStatus, CoupledSolution, CoupledState, CoupledSystem};
pub use error::{AnalysisError, MatrixKind, Result};
pub use mesh::{AeroMesh, CrossSection, PanelGeometry, SectionFamily, StructMesh};
pub use structures::{BeamPerturbation, BeamSolution, BeamSolver};
pub use transfer::TransferMap;
