use thiserror::Error;

/// Everything that can go wrong while building regions or answering distance queries.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeomError {
    /// The shape parameters don't describe a well-formed convex region, like a rectangle with
    /// inverted bounds. Raised at construction time.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A region passed to a query has no feasible point at all. This means a malformed region
    /// slipped past construction; callers shouldn't retry.
    #[error("Infeasible region: {0}")]
    InfeasibleRegion(String),

    /// The region-to-region query only accepts bounded regions.
    #[error("Unbounded region: {0}")]
    UnboundedRegion(String),

    /// The QP solve didn't converge within the iteration budget.
    #[error("Solver did not converge after {iterations} iterations (gap: {gap:.2e})")]
    SolverDiverged { iterations: usize, gap: f64 },

    #[error("Invalid solver settings: {0}")]
    InvalidSettings(String),

    /// A quadratic program whose matrices and vectors don't agree on their sizes.
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),
}

impl GeomError {
    /// Only a diverged solve is worth retrying, once, with relaxed settings. Everything else is a
    /// caller bug.
    pub fn is_transient(&self) -> bool {
        matches!(self, GeomError::SolverDiverged { .. })
    }
}

pub type Result<T> = std::result::Result<T, GeomError>;
