mod error;
mod expression;
mod model;
mod pivot;
mod rational;
mod simplex;
mod solution;

pub use error::{RationalError, SolverError};
pub use expression::{Comparator, Constraint, Expression, Variable};
pub use model::{BinaryVariable, IntegerVariable, Model, Objective, Sense};
pub use pivot::{Bland, Dantzig, OptimalIncrease, PivotRule, PivotRuleKind, TableauView};
pub use rational::{Rational, RoundingMode};
pub use simplex::Solver;
pub use solution::OptimizationResult;

pub use num_bigint::BigInt;
