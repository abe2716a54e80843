use ratioplan_solver::{RationalError, SolverError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameDataError {
    #[error("Duplicate item: {0}")]
    DuplicateItem(String),
    #[error("Duplicate building: {0}")]
    DuplicateBuilding(String),
    #[error("Duplicate recipe: {0}")]
    DuplicateRecipe(String),
    #[error("Unknown item '{item}' referenced by {context}")]
    UnknownItem { item: String, context: String },
    #[error("Unknown building '{building}' referenced by recipe {recipe}")]
    UnknownBuilding { building: String, recipe: String },
    #[error("Recipe {0} must have a positive cycle time")]
    InvalidCycleTime(String),
    #[error("Invalid amount in {context}: {message}")]
    InvalidAmount { context: String, message: String },
    #[error("Invalid game data document: {0}")]
    Document(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// No plan satisfies the requested inputs, outputs and recipes.
    #[error("Plan is not feasible with the given inputs and recipes")]
    NotFeasible,
    #[error("Planning was interrupted")]
    Interrupted,
    /// The solver failed in a way a well-formed production model never should.
    #[error("Internal planner error: {0}")]
    Internal(SolverError),
    #[error("Unknown item: {0}")]
    UnknownItem(String),
    #[error("Unknown recipe: {0}")]
    UnknownRecipe(String),
    #[error("Invalid rate for {item}: {message}")]
    InvalidRate { item: String, message: String },
    #[error("Invalid plan request: {0}")]
    Request(String),
}

impl From<SolverError> for PlanError {
    fn from(err: SolverError) -> Self {
        match err {
            SolverError::Infeasible => PlanError::NotFeasible,
            SolverError::Interrupted => PlanError::Interrupted,
            other => PlanError::Internal(other),
        }
    }
}

impl From<RationalError> for PlanError {
    fn from(err: RationalError) -> Self {
        PlanError::Internal(SolverError::Arithmetic(err))
    }
}
