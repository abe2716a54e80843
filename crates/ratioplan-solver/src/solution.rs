use std::collections::BTreeSet;

use num_bigint::BigInt;

use crate::expression::{Expression, Variable};
use crate::model::IntegerVariable;
use crate::rational::Rational;

/// The optimum found by [`crate::Solver::solve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizationResult {
    /// Exact value for each variable, indexed by column
    values: Vec<Rational>,
    objective_value: Rational,
    integer_variables: BTreeSet<Variable>,
    iterations: usize,
}

impl OptimizationResult {
    pub(crate) fn new(
        values: Vec<Rational>,
        objective_value: Rational,
        integer_variables: BTreeSet<Variable>,
        iterations: usize,
    ) -> Self {
        Self {
            values,
            objective_value,
            integer_variables,
            iterations,
        }
    }

    /// Value of a variable; zero for variables the model never created.
    pub fn value(&self, variable: Variable) -> Rational {
        self.values.get(variable.index()).cloned().unwrap_or_default()
    }

    pub fn values(&self) -> &[Rational] {
        &self.values
    }

    pub fn evaluate(&self, expression: &Expression) -> Rational {
        expression.evaluate(|v| self.value(v))
    }

    pub fn objective_value(&self) -> &Rational {
        &self.objective_value
    }

    /// Number of pivots across both phases
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// The integer value, or `None` if the continuous optimum is fractional.
    pub fn integer_value(&self, variable: IntegerVariable) -> Option<BigInt> {
        self.value(variable.variable()).to_integer_exact().ok()
    }

    /// Integer variables whose solved value is fractional
    pub fn integrality_violations(&self) -> Vec<Variable> {
        self.integer_variables
            .iter()
            .copied()
            .filter(|v| !self.value(*v).is_integer())
            .collect()
    }
}
