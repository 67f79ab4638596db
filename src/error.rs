use thiserror::Error;

/// Identifies which dense system matrix failed to factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixKind {
    /// Aerodynamic influence coefficient matrix.
    Influence,
    /// Global beam stiffness matrix (after the root clamp is applied).
    Stiffness,
}

impl std::fmt::Display for MatrixKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatrixKind::Influence => write!(f, "influence"),
            MatrixKind::Stiffness => write!(f, "stiffness"),
        }
    }
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The mesh or beam geometry is degenerate at the current design point
    /// (zero-length segment, coincident points, mesh below the ground plane).
    /// Not retried: the design point itself is invalid.
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// A dense system matrix failed to factor. Recoverable by the caller
    /// backing off the design step.
    #[error("Singular {matrix} matrix ({size}x{size})")]
    SingularSystem { matrix: MatrixKind, size: usize },

    /// Incompatible option combination, rejected before any solve is run.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Inputs whose sizes do not agree (mesh vs. sections vs. loads).
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
