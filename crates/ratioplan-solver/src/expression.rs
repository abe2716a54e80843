use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::sync::Arc;

use crate::rational::Rational;

/// Handle to a column of a [`crate::Model`].
///
/// Variables carry no bounds of their own; non-negativity and friends are
/// ordinary constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variable(pub(crate) usize);

impl Variable {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A linear combination of variables plus a constant.
///
/// The term map is shared between clones and copied on first write.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Expression {
    terms: Arc<BTreeMap<Variable, Rational>>,
    constant: Rational,
}

impl Expression {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn constant(value: impl Into<Rational>) -> Self {
        Self {
            terms: Arc::default(),
            constant: value.into(),
        }
    }

    pub fn term(variable: Variable, coefficient: impl Into<Rational>) -> Self {
        let mut expr = Self::zero();
        expr.add_term(variable, coefficient.into());
        expr
    }

    /// Sum of `coefficient * variable` over the given pairs.
    pub fn weighted_sum<I>(terms: I) -> Self
    where
        I: IntoIterator<Item = (Variable, Rational)>,
    {
        let mut expr = Self::zero();
        for (variable, coefficient) in terms {
            expr.add_term(variable, coefficient);
        }
        expr
    }

    pub fn sum<I>(variables: I) -> Self
    where
        I: IntoIterator<Item = Variable>,
    {
        Self::weighted_sum(variables.into_iter().map(|v| (v, Rational::one())))
    }

    pub fn terms(&self) -> impl Iterator<Item = (Variable, &Rational)> {
        self.terms.iter().map(|(v, c)| (*v, c))
    }

    pub fn coefficient(&self, variable: Variable) -> Rational {
        self.terms.get(&variable).cloned().unwrap_or_default()
    }

    pub fn constant_term(&self) -> &Rational {
        &self.constant
    }

    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.constant.is_zero()
    }

    /// Adds `coefficient * variable` in place, dropping the term if it cancels out.
    fn add_term(&mut self, variable: Variable, coefficient: Rational) {
        if coefficient.is_zero() {
            return;
        }
        let terms = Arc::make_mut(&mut self.terms);
        let updated = match terms.get(&variable) {
            Some(existing) => (existing + &coefficient).simplify(),
            None => coefficient.simplify(),
        };
        if updated.is_zero() {
            terms.remove(&variable);
        } else {
            terms.insert(variable, updated);
        }
    }

    pub fn plus(&self, other: &Expression) -> Self {
        let mut result = self.clone();
        for (variable, coefficient) in other.terms.iter() {
            result.add_term(*variable, coefficient.clone());
        }
        result.constant = (&result.constant + &other.constant).simplify();
        result
    }

    pub fn minus(&self, other: &Expression) -> Self {
        self.plus(&other.scaled(&Rational::minus_one()))
    }

    pub fn scaled(&self, factor: &Rational) -> Self {
        if factor.is_zero() {
            return Self::zero();
        }
        if factor.is_one() {
            return self.clone();
        }
        Self {
            terms: Arc::new(
                self.terms
                    .iter()
                    .map(|(v, c)| (*v, (c * factor).simplify()))
                    .collect(),
            ),
            constant: (&self.constant * factor).simplify(),
        }
    }

    /// Value of the expression for the given variable assignment.
    pub fn evaluate(&self, value_of: impl Fn(Variable) -> Rational) -> Rational {
        let mut total = self.constant.clone();
        for (variable, coefficient) in self.terms.iter() {
            total = (total + coefficient * value_of(*variable)).simplify();
        }
        total
    }

    /// `self <= rhs`
    pub fn at_most(&self, rhs: impl Into<Expression>) -> Constraint {
        Constraint::new(self.minus(&rhs.into()), Comparator::Lte)
    }

    /// `self >= rhs`
    pub fn at_least(&self, rhs: impl Into<Expression>) -> Constraint {
        Constraint::new(self.minus(&rhs.into()), Comparator::Gte)
    }

    /// `self == rhs`
    pub fn equal_to(&self, rhs: impl Into<Expression>) -> Constraint {
        Constraint::new(self.minus(&rhs.into()), Comparator::Eq)
    }

    pub(crate) fn max_variable(&self) -> Option<Variable> {
        self.terms.keys().next_back().copied()
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (variable, coefficient) in self.terms.iter() {
            if !first {
                write!(f, " + ")?;
            }
            write!(f, "{}*x{}", coefficient, variable.0)?;
            first = false;
        }
        if first || !self.constant.is_zero() {
            if !first {
                write!(f, " + ")?;
            }
            write!(f, "{}", self.constant)?;
        }
        Ok(())
    }
}

impl From<Variable> for Expression {
    fn from(variable: Variable) -> Self {
        Expression::term(variable, Rational::one())
    }
}

impl From<Rational> for Expression {
    fn from(value: Rational) -> Self {
        Expression::constant(value)
    }
}

impl From<&Rational> for Expression {
    fn from(value: &Rational) -> Self {
        Expression::constant(value.clone())
    }
}

impl From<&Expression> for Expression {
    fn from(value: &Expression) -> Self {
        value.clone()
    }
}

impl Add<&Expression> for &Expression {
    type Output = Expression;

    fn add(self, rhs: &Expression) -> Expression {
        self.plus(rhs)
    }
}

impl Add<Expression> for Expression {
    type Output = Expression;

    fn add(self, rhs: Expression) -> Expression {
        self.plus(&rhs)
    }
}

impl Add<&Expression> for Expression {
    type Output = Expression;

    fn add(self, rhs: &Expression) -> Expression {
        self.plus(rhs)
    }
}

impl Sub<&Expression> for &Expression {
    type Output = Expression;

    fn sub(self, rhs: &Expression) -> Expression {
        self.minus(rhs)
    }
}

impl Sub<Expression> for Expression {
    type Output = Expression;

    fn sub(self, rhs: Expression) -> Expression {
        self.minus(&rhs)
    }
}

impl Sub<&Expression> for Expression {
    type Output = Expression;

    fn sub(self, rhs: &Expression) -> Expression {
        self.minus(rhs)
    }
}

impl Mul<&Rational> for &Expression {
    type Output = Expression;

    fn mul(self, rhs: &Rational) -> Expression {
        self.scaled(rhs)
    }
}

impl Mul<&Rational> for Expression {
    type Output = Expression;

    fn mul(self, rhs: &Rational) -> Expression {
        self.scaled(rhs)
    }
}

impl Neg for &Expression {
    type Output = Expression;

    fn neg(self) -> Expression {
        self.scaled(&Rational::minus_one())
    }
}

impl Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Expression {
        self.scaled(&Rational::minus_one())
    }
}

/// Comparison operator of a [`Constraint`]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// Equal (=)
    Eq,
    /// Less than or equal (<=)
    Lte,
    /// Greater than or equal (>=)
    Gte,
}

/// `expression (comparator) 0`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    expression: Expression,
    comparator: Comparator,
}

impl Constraint {
    pub fn new(expression: Expression, comparator: Comparator) -> Self {
        Self { expression, comparator }
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn comparator(&self) -> Comparator {
        self.comparator
    }

    /// Whether the assignment satisfies this constraint exactly.
    pub fn is_satisfied_by(&self, value_of: impl Fn(Variable) -> Rational) -> bool {
        let value = self.expression.evaluate(value_of);
        match self.comparator {
            Comparator::Eq => value.is_zero(),
            Comparator::Lte => !value.is_positive(),
            Comparator::Gte => !value.is_negative(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(n: i64, d: i64) -> Rational {
        Rational::new(n, d).unwrap()
    }

    #[test]
    fn test_arithmetic_merges_terms() {
        let x = Variable(0);
        let y = Variable(1);
        let a = Expression::term(x, 2) + Expression::term(y, r(1, 2));
        let b = Expression::term(x, -2) + Expression::constant(3);

        let sum = &a + &b;
        assert_eq!(sum.coefficient(x), Rational::zero());
        assert_eq!(sum.coefficient(y), r(1, 2));
        assert_eq!(sum.constant_term(), &Rational::from(3));
        assert_eq!(sum.len(), 1, "cancelled terms are dropped");

        let diff = &a - &b;
        assert_eq!(diff.coefficient(x), Rational::from(4));
        assert_eq!(diff.constant_term(), &Rational::from(-3));
    }

    #[test]
    fn test_scaling_and_negation() {
        let x = Variable(0);
        let expr = Expression::term(x, r(2, 3)) + Expression::constant(1);
        let scaled = &expr * &r(3, 2);
        assert_eq!(scaled.coefficient(x), Rational::one());
        assert_eq!(scaled.constant_term(), &r(3, 2));
        assert_eq!((-&expr).coefficient(x), r(-2, 3));
        assert!(expr.scaled(&Rational::zero()).is_empty());
    }

    #[test]
    fn test_clones_share_until_written() {
        let x = Variable(0);
        let base = Expression::term(x, 1);
        let copy = base.clone();
        assert!(Arc::ptr_eq(&base.terms, &copy.terms));
        let extended = copy + Expression::term(Variable(1), 1);
        assert_eq!(base.len(), 1);
        assert_eq!(extended.len(), 2);
    }

    #[test]
    fn test_evaluate_and_constraints() {
        let x = Variable(0);
        let y = Variable(1);
        let expr = Expression::term(x, 3) + Expression::term(y, -1) + Expression::constant(r(1, 2));
        let values = |v: Variable| if v == x { Rational::from(2) } else { r(1, 2) };
        assert_eq!(expr.evaluate(values), Rational::from(6));

        assert!(expr.at_most(Rational::from(6)).is_satisfied_by(values));
        assert!(expr.at_least(Rational::from(6)).is_satisfied_by(values));
        assert!(expr.equal_to(Rational::from(6)).is_satisfied_by(values));
        assert!(!expr.at_least(Rational::from(7)).is_satisfied_by(values));
        assert!(!expr.at_most(r(11, 2)).is_satisfied_by(values));
    }
}
