use std::collections::BTreeSet;

use crate::error::SolverError;
use crate::expression::{Comparator, Constraint, Expression, Variable};
use crate::rational::Rational;

/// Direction of the objective
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sense {
    #[default]
    Maximize,
    Minimize,
}

#[derive(Debug, Clone)]
pub struct Objective {
    pub expression: Expression,
    pub sense: Sense,
}

impl Default for Objective {
    fn default() -> Self {
        Self {
            expression: Expression::zero(),
            sense: Sense::Maximize,
        }
    }
}

/// A variable whose solved value is expected to be integral.
///
/// The solver treats it as continuous; check the outcome with
/// [`crate::OptimizationResult::integer_value`] or
/// [`crate::OptimizationResult::integrality_violations`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntegerVariable(Variable);

impl IntegerVariable {
    pub fn variable(self) -> Variable {
        self.0
    }

    pub fn expression(self) -> Expression {
        Expression::from(self.0)
    }
}

/// An integer variable constrained to `0 <= x <= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BinaryVariable(IntegerVariable);

impl BinaryVariable {
    pub fn variable(self) -> Variable {
        self.0.variable()
    }

    pub fn as_integer(self) -> IntegerVariable {
        self.0
    }

    pub fn expression(self) -> Expression {
        self.0.expression()
    }
}

/// Represents a linear programming problem over exact rationals
#[derive(Debug, Clone, Default)]
pub struct Model {
    /// Variable names, in column order
    variables: Vec<String>,
    /// Constraints, in insertion order
    constraints: Vec<Constraint>,
    objective: Objective,
    integer_variables: BTreeSet<Variable>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a continuous variable with no implicit bounds.
    pub fn add_variable(&mut self, name: impl Into<String>) -> Variable {
        self.variables.push(name.into());
        Variable(self.variables.len() - 1)
    }

    /// Add a continuous variable constrained to be non-negative.
    pub fn add_non_negative_variable(&mut self, name: impl Into<String>) -> Variable {
        let variable = self.add_variable(name);
        self.add_constraint(Expression::from(variable).at_least(Rational::zero()));
        variable
    }

    pub fn add_integer_variable(&mut self, name: impl Into<String>) -> IntegerVariable {
        let variable = self.add_variable(name);
        self.integer_variables.insert(variable);
        IntegerVariable(variable)
    }

    pub fn add_binary_variable(&mut self, name: impl Into<String>) -> BinaryVariable {
        let integer = self.add_integer_variable(name);
        let expr = integer.expression();
        self.add_constraint(expr.at_least(Rational::zero()));
        self.add_constraint(expr.at_most(Rational::one()));
        BinaryVariable(integer)
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn set_objective(&mut self, expression: Expression, sense: Sense) {
        self.objective = Objective { expression, sense };
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn variable_name(&self, variable: Variable) -> Option<&str> {
        self.variables.get(variable.0).map(String::as_str)
    }

    pub fn variables(&self) -> impl Iterator<Item = Variable> + '_ {
        (0..self.variables.len()).map(Variable)
    }

    pub fn is_integer(&self, variable: Variable) -> bool {
        self.integer_variables.contains(&variable)
    }

    pub fn integer_variables(&self) -> impl Iterator<Item = Variable> + '_ {
        self.integer_variables.iter().copied()
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Checks that every referenced variable belongs to this model.
    pub(crate) fn validate(&self) -> Result<(), SolverError> {
        let check = |expr: &Expression, context: &str| match expr.max_variable() {
            Some(v) if v.0 >= self.variables.len() => Err(SolverError::MalformedModel(format!(
                "{context} references variable x{} but the model has {} variables",
                v.0,
                self.variables.len()
            ))),
            _ => Ok(()),
        };
        for (i, c) in self.constraints.iter().enumerate() {
            check(c.expression(), &format!("constraint #{i}"))?;
        }
        check(&self.objective.expression, "objective")
    }

    /// Variables that a constraint already forces to be non-negative.
    ///
    /// Recognizes single-variable rows `c * x + k >= 0` with `c > 0` and
    /// `k <= 0`, and the mirrored `<=` form.
    pub(crate) fn non_negative_variables(&self) -> BTreeSet<Variable> {
        let mut result = BTreeSet::new();
        for c in &self.constraints {
            let expr = c.expression();
            if expr.len() != 1 {
                continue;
            }
            let Some((variable, coefficient)) = expr.terms().next() else {
                continue;
            };
            let constant = expr.constant_term();
            let implies_non_negative = match c.comparator() {
                Comparator::Gte => coefficient.is_positive() && !constant.is_positive(),
                Comparator::Lte => coefficient.is_negative() && !constant.is_negative(),
                Comparator::Eq => {
                    // c * x = -k
                    !(coefficient.is_positive() && constant.is_positive())
                        && !(coefficient.is_negative() && constant.is_negative())
                }
            };
            if implies_non_negative {
                result.insert(variable);
            }
        }
        result
    }
}
