use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RationalError {
    #[error("Division by zero")]
    DivisionByZero,
    #[error("{0} is not an integer")]
    NotAnInteger(String),
    #[error("Cannot parse rational: {0}")]
    Parse(String),
}

/// Failure modes of [`crate::Solver::solve`].
///
/// The variants are distinct so callers can recover from infeasibility while
/// letting the rest propagate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    #[error("No solution satisfies all constraints")]
    Infeasible,
    #[error("The objective can grow without limit")]
    Unbounded,
    #[error("Solve was interrupted")]
    Interrupted,
    #[error("Iteration limit of {0} pivots reached")]
    IterationLimit(usize),
    #[error("Malformed model: {0}")]
    MalformedModel(String),
    #[error(transparent)]
    Arithmetic(#[from] RationalError),
}
