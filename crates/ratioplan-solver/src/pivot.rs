//! Entering-column selection for the simplex method.
//!
//! Every rule breaks ties on the smallest column index, so equivalent models
//! always walk the same sequence of bases.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::rational::Rational;
use crate::simplex::Tableau;

/// Read-only access to the tableau a pivot rule chooses from.
pub struct TableauView<'a> {
    tableau: &'a Tableau,
}

impl<'a> TableauView<'a> {
    pub(crate) fn new(tableau: &'a Tableau) -> Self {
        Self { tableau }
    }

    pub fn num_rows(&self) -> usize {
        self.tableau.rows.len()
    }

    /// Reduced cost of a column. Positive values improve the objective.
    pub fn reduced_cost(&self, column: usize) -> &Rational {
        &self.tableau.costs[column]
    }

    pub fn entry(&self, row: usize, column: usize) -> &Rational {
        &self.tableau.rows[row][column]
    }

    pub fn rhs(&self, row: usize) -> &Rational {
        &self.tableau.rhs[row]
    }

    /// Columns allowed to enter the basis with a positive reduced cost, in ascending order.
    pub fn improving_columns(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.tableau.enterable_columns()).filter(|&j| self.tableau.costs[j].is_positive())
    }

    /// Minimum-ratio row for an entering column and the step length, or
    /// `None` if the column is an unbounded ray.
    pub fn ratio_test(&self, column: usize) -> Option<(usize, Rational)> {
        self.tableau.ratio_test(column)
    }
}

/// Strategy picking the entering column of each pivot.
pub trait PivotRule: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// The entering column, or `None` when no column improves the objective.
    fn select_entering(&self, view: &TableauView<'_>) -> Option<usize>;
}

/// Lowest-index improving column. Never cycles.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bland;

impl PivotRule for Bland {
    fn name(&self) -> &'static str {
        "bland"
    }

    fn select_entering(&self, view: &TableauView<'_>) -> Option<usize> {
        view.improving_columns().next()
    }
}

/// Column with the largest reduced cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dantzig;

impl PivotRule for Dantzig {
    fn name(&self) -> &'static str {
        "dantzig"
    }

    fn select_entering(&self, view: &TableauView<'_>) -> Option<usize> {
        let mut best: Option<usize> = None;
        for j in view.improving_columns() {
            match best {
                Some(b) if view.reduced_cost(j) <= view.reduced_cost(b) => {}
                _ => best = Some(j),
            }
        }
        best
    }
}

/// Column yielding the largest objective increase in a single pivot
/// (reduced cost times step length).
///
/// An unbounded column is returned immediately so the solver can report it.
/// When every candidate is degenerate it falls back to the lowest index,
/// which is Bland's rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimalIncrease;

impl PivotRule for OptimalIncrease {
    fn name(&self) -> &'static str {
        "optimal-increase"
    }

    fn select_entering(&self, view: &TableauView<'_>) -> Option<usize> {
        let mut first = None;
        let mut best: Option<(usize, Rational)> = None;
        for j in view.improving_columns() {
            first.get_or_insert(j);
            let Some((_, step)) = view.ratio_test(j) else {
                return Some(j);
            };
            let increase = (view.reduced_cost(j) * &step).simplify();
            if !increase.is_positive() {
                continue;
            }
            match &best {
                Some((_, current)) if &increase <= current => {}
                _ => best = Some((j, increase)),
            }
        }
        best.map(|(j, _)| j).or(first)
    }
}

/// Named pivot rules, for configuration surfaces.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PivotRuleKind {
    Bland,
    Dantzig,
    #[default]
    OptimalIncrease,
}

impl PivotRuleKind {
    pub fn into_rule(self) -> Arc<dyn PivotRule> {
        match self {
            PivotRuleKind::Bland => Arc::new(Bland),
            PivotRuleKind::Dantzig => Arc::new(Dantzig),
            PivotRuleKind::OptimalIncrease => Arc::new(OptimalIncrease),
        }
    }
}

impl FromStr for PivotRuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bland" => Ok(PivotRuleKind::Bland),
            "dantzig" => Ok(PivotRuleKind::Dantzig),
            "optimal-increase" | "optimal" => Ok(PivotRuleKind::OptimalIncrease),
            other => Err(format!("unknown pivot rule '{other}'")),
        }
    }
}
