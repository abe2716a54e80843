use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, trace};

use crate::error::SolverError;
use crate::expression::Comparator;
use crate::model::{Model, Sense};
use crate::pivot::{Bland, OptimalIncrease, PivotRule, TableauView};
use crate::rational::Rational;
use crate::solution::OptimizationResult;

/// Two-phase simplex solver over exact rationals
#[derive(Debug, Clone)]
pub struct Solver {
    pivot_rule: Arc<dyn PivotRule>,
    /// Maximum pivots per solve, unlimited when `None`
    max_iterations: Option<usize>,
    /// Consecutive degenerate pivots tolerated before switching to Bland's rule
    degenerate_fallback: usize,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            pivot_rule: Arc::new(OptimalIncrease),
            max_iterations: None,
            degenerate_fallback: 50,
            cancel_flag: None,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pivot_rule(mut self, rule: Arc<dyn PivotRule>) -> Self {
        self.pivot_rule = rule;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }

    pub fn with_degenerate_fallback(mut self, pivots: usize) -> Self {
        self.degenerate_fallback = pivots;
        self
    }

    /// Poll `flag` before every pivot and abort with [`SolverError::Interrupted`] once it is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    pub fn pivot_rule(&self) -> &dyn PivotRule {
        self.pivot_rule.as_ref()
    }

    /// Solve the model using the two-phase simplex method
    pub fn solve(&self, model: &Model) -> Result<OptimizationResult, SolverError> {
        model.validate()?;
        let mut tableau = Tableau::build(model)?;
        info!(
            rows = tableau.rows.len(),
            columns = tableau.num_columns(),
            artificial = tableau.n_artificial,
            rule = self.pivot_rule.name(),
            "starting simplex solve"
        );

        let mut iterations = 0;
        if tableau.n_artificial > 0 {
            tableau.load_phase1_objective();
            self.run(&mut tableau, &mut iterations).map_err(|e| match e {
                // The auxiliary objective is bounded by zero, so a ray here means broken bookkeeping.
                SolverError::Unbounded => {
                    SolverError::MalformedModel("phase 1 objective is unbounded".to_string())
                }
                other => other,
            })?;
            if tableau.objective_rhs.is_positive() {
                debug!(
                    infeasibility = %tableau.objective_rhs,
                    iterations,
                    "phase 1 ended with positive artificial sum"
                );
                return Err(SolverError::Infeasible);
            }
            tableau.drive_out_artificials()?;
            debug!(iterations, "phase 1 found a feasible basis");
        }

        tableau.load_phase2_objective(model);
        self.run(&mut tableau, &mut iterations)?;

        let result = tableau.extract(model, iterations);
        info!(iterations, objective = %result.objective_value(), "simplex solve finished");
        Ok(result)
    }

    fn run(&self, tableau: &mut Tableau, iterations: &mut usize) -> Result<(), SolverError> {
        let mut degenerate_streak = 0;
        loop {
            if let Some(flag) = &self.cancel_flag {
                if flag.load(Ordering::Relaxed) {
                    debug!(iterations = *iterations, "solve interrupted");
                    return Err(SolverError::Interrupted);
                }
            }
            let entering = {
                let view = TableauView::new(tableau);
                if degenerate_streak >= self.degenerate_fallback {
                    Bland.select_entering(&view)
                } else {
                    self.pivot_rule.select_entering(&view)
                }
            };
            let Some(column) = entering else {
                return Ok(());
            };
            if let Some(max) = self.max_iterations {
                if *iterations >= max {
                    return Err(SolverError::IterationLimit(max));
                }
            }
            let Some((row, step)) = tableau.ratio_test(column) else {
                debug!(column, "entering column has no limiting row");
                return Err(SolverError::Unbounded);
            };

            if step.is_zero() {
                degenerate_streak += 1;
            } else {
                degenerate_streak = 0;
            }
            trace!(row, column, step = %step, "pivot");
            tableau.pivot(row, column)?;
            *iterations += 1;
        }
    }
}

/// Column layout of one model variable
#[derive(Debug, Clone, Copy)]
struct ColumnMapping {
    positive: usize,
    /// Set for free variables, which are split into `x+ - x-`
    negative: Option<usize>,
}

/// Dense simplex tableau in maximization form.
///
/// Columns are ordered structural, slack/surplus, artificial. `costs` holds
/// the reduced costs and `objective_rhs` holds the negated objective value.
#[derive(Debug, Clone)]
pub(crate) struct Tableau {
    pub(crate) rows: Vec<Vec<Rational>>,
    pub(crate) rhs: Vec<Rational>,
    pub(crate) costs: Vec<Rational>,
    pub(crate) objective_rhs: Rational,
    pub(crate) basis: Vec<usize>,
    columns: Vec<ColumnMapping>,
    n_structural: usize,
    n_slack: usize,
    n_artificial: usize,
}

impl Tableau {
    fn build(model: &Model) -> Result<Self, SolverError> {
        let non_negative = model.non_negative_variables();

        let mut columns = Vec::with_capacity(model.num_variables());
        let mut n_structural = 0;
        for variable in model.variables() {
            let positive = n_structural;
            n_structural += 1;
            let negative = if non_negative.contains(&variable) {
                None
            } else {
                n_structural += 1;
                Some(positive + 1)
            };
            columns.push(ColumnMapping { positive, negative });
        }

        // Normalize every constraint to `a . x (op) b` with `b >= 0`.
        let mut normalized: Vec<(Vec<Rational>, Comparator, Rational)> = Vec::new();
        for constraint in model.constraints() {
            let expr = constraint.expression();
            let mut comparator = constraint.comparator();
            let mut rhs = -expr.constant_term().simplify();

            if expr.is_constant() {
                if constraint.is_satisfied_by(|_| Rational::zero()) {
                    continue;
                }
                debug!(constraint = ?expr, "constant constraint can never hold");
                return Err(SolverError::Infeasible);
            }

            if expr.len() == 1 && rhs.is_zero() {
                if let Some((variable, coefficient)) = expr.terms().next() {
                    let is_plain_bound = columns[variable.index()].negative.is_none()
                        && match comparator {
                            Comparator::Gte => coefficient.is_positive(),
                            Comparator::Lte => coefficient.is_negative(),
                            Comparator::Eq => false,
                        };
                    if is_plain_bound {
                        continue;
                    }
                }
            }

            let mut coefficients = vec![Rational::zero(); n_structural];
            for (variable, coefficient) in expr.terms() {
                let mapping = columns[variable.index()];
                coefficients[mapping.positive] = coefficient.clone();
                if let Some(negative) = mapping.negative {
                    coefficients[negative] = -coefficient;
                }
            }

            let flip = rhs.is_negative() || (rhs.is_zero() && comparator == Comparator::Gte);
            if flip {
                for c in coefficients.iter_mut() {
                    *c = -&*c;
                }
                rhs = -rhs;
                comparator = match comparator {
                    Comparator::Lte => Comparator::Gte,
                    Comparator::Gte => Comparator::Lte,
                    Comparator::Eq => Comparator::Eq,
                };
            }
            normalized.push((coefficients, comparator, rhs));
        }

        let mut n_slack = 0;
        let mut n_artificial = 0;
        for (_, comparator, _) in &normalized {
            match comparator {
                Comparator::Lte => n_slack += 1,
                Comparator::Gte => {
                    n_slack += 1; // surplus
                    n_artificial += 1;
                }
                Comparator::Eq => n_artificial += 1,
            }
        }

        let total_columns = n_structural + n_slack + n_artificial;
        let mut rows = Vec::with_capacity(normalized.len());
        let mut rhs_column = Vec::with_capacity(normalized.len());
        let mut basis = Vec::with_capacity(normalized.len());

        let mut slack_idx = n_structural;
        let mut artificial_idx = n_structural + n_slack;
        for (coefficients, comparator, rhs) in normalized {
            let mut row = coefficients;
            row.resize(total_columns, Rational::zero());
            match comparator {
                Comparator::Lte => {
                    row[slack_idx] = Rational::one();
                    basis.push(slack_idx);
                    slack_idx += 1;
                }
                Comparator::Gte => {
                    row[slack_idx] = Rational::minus_one();
                    slack_idx += 1;
                    row[artificial_idx] = Rational::one();
                    basis.push(artificial_idx);
                    artificial_idx += 1;
                }
                Comparator::Eq => {
                    row[artificial_idx] = Rational::one();
                    basis.push(artificial_idx);
                    artificial_idx += 1;
                }
            }
            rows.push(row);
            rhs_column.push(rhs);
        }

        Ok(Self {
            rows,
            rhs: rhs_column,
            costs: vec![Rational::zero(); total_columns],
            objective_rhs: Rational::zero(),
            basis,
            columns,
            n_structural,
            n_slack,
            n_artificial,
        })
    }

    pub(crate) fn num_columns(&self) -> usize {
        self.n_structural + self.n_slack + self.n_artificial
    }

    /// Artificial columns never (re-)enter the basis.
    pub(crate) fn enterable_columns(&self) -> usize {
        self.n_structural + self.n_slack
    }

    fn is_artificial(&self, column: usize) -> bool {
        column >= self.enterable_columns()
    }

    /// Minimum-ratio row for `column`, ties broken on the smallest basic column index.
    pub(crate) fn ratio_test(&self, column: usize) -> Option<(usize, Rational)> {
        let mut best: Option<(usize, Rational)> = None;
        for (i, row) in self.rows.iter().enumerate() {
            let entry = &row[column];
            if !entry.is_positive() {
                continue;
            }
            let ratio = (&self.rhs[i] / entry).simplify();
            let better = match &best {
                None => true,
                Some((current_row, current_ratio)) => match ratio.cmp(current_ratio) {
                    std::cmp::Ordering::Less => true,
                    std::cmp::Ordering::Equal => self.basis[i] < self.basis[*current_row],
                    std::cmp::Ordering::Greater => false,
                },
            };
            if better {
                best = Some((i, ratio));
            }
        }
        best
    }

    pub(crate) fn pivot(&mut self, row: usize, column: usize) -> Result<(), SolverError> {
        let pivot_value = self.rows[row][column].clone();
        for value in self.rows[row].iter_mut() {
            if !value.is_zero() {
                *value = value.checked_div(&pivot_value)?.simplify();
            }
        }
        self.rhs[row] = self.rhs[row].checked_div(&pivot_value)?.simplify();

        let pivot_row = self.rows[row].clone();
        let pivot_rhs = self.rhs[row].clone();
        let nonzero: Vec<usize> = pivot_row
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_zero())
            .map(|(j, _)| j)
            .collect();

        for i in 0..self.rows.len() {
            if i == row {
                continue;
            }
            let factor = self.rows[i][column].clone();
            if factor.is_zero() {
                continue;
            }
            for &j in &nonzero {
                self.rows[i][j] = (&self.rows[i][j] - &factor * &pivot_row[j]).simplify();
            }
            self.rhs[i] = (&self.rhs[i] - &factor * &pivot_rhs).simplify();
        }

        let factor = self.costs[column].clone();
        if !factor.is_zero() {
            for &j in &nonzero {
                self.costs[j] = (&self.costs[j] - &factor * &pivot_row[j]).simplify();
            }
            self.objective_rhs = (&self.objective_rhs - &factor * &pivot_rhs).simplify();
        }

        self.basis[row] = column;
        Ok(())
    }

    /// Maximize `-(sum of artificials)`, priced out against the initial basis.
    fn load_phase1_objective(&mut self) {
        let start = self.enterable_columns();
        self.costs = vec![Rational::zero(); self.num_columns()];
        for j in start..self.num_columns() {
            self.costs[j] = Rational::minus_one();
        }
        self.objective_rhs = Rational::zero();

        for i in 0..self.rows.len() {
            if self.is_artificial(self.basis[i]) {
                for j in 0..self.num_columns() {
                    if !self.rows[i][j].is_zero() {
                        self.costs[j] = (&self.costs[j] + &self.rows[i][j]).simplify();
                    }
                }
                self.objective_rhs = (&self.objective_rhs + &self.rhs[i]).simplify();
            }
        }
    }

    /// Pivot zero-level artificials out of the basis. Rows with no other
    /// non-zero entry are redundant and keep their artificial.
    fn drive_out_artificials(&mut self) -> Result<(), SolverError> {
        for i in 0..self.rows.len() {
            if !self.is_artificial(self.basis[i]) {
                continue;
            }
            let replacement = (0..self.enterable_columns()).find(|&j| !self.rows[i][j].is_zero());
            match replacement {
                Some(j) => self.pivot(i, j)?,
                None => trace!(row = i, "redundant constraint row"),
            }
        }
        Ok(())
    }

    fn load_phase2_objective(&mut self, model: &Model) {
        let objective = model.objective();
        self.costs = vec![Rational::zero(); self.num_columns()];
        for (variable, coefficient) in objective.expression.terms() {
            let c = match objective.sense {
                Sense::Maximize => coefficient.clone(),
                Sense::Minimize => -coefficient,
            };
            let mapping = self.columns[variable.index()];
            if let Some(negative) = mapping.negative {
                self.costs[negative] = -&c;
            }
            self.costs[mapping.positive] = c;
        }
        self.objective_rhs = Rational::zero();

        for i in 0..self.rows.len() {
            let basic = self.basis[i];
            let factor = self.costs[basic].clone();
            if factor.is_zero() {
                continue;
            }
            for j in 0..self.num_columns() {
                if !self.rows[i][j].is_zero() {
                    self.costs[j] = (&self.costs[j] - &factor * &self.rows[i][j]).simplify();
                }
            }
            self.objective_rhs = (&self.objective_rhs - &factor * &self.rhs[i]).simplify();
        }
    }

    fn extract(&self, model: &Model, iterations: usize) -> OptimizationResult {
        let mut column_values = vec![Rational::zero(); self.n_structural];
        for (i, &basic) in self.basis.iter().enumerate() {
            if basic < self.n_structural {
                column_values[basic] = self.rhs[i].clone();
            }
        }

        let values: Vec<Rational> = self
            .columns
            .iter()
            .map(|mapping| match mapping.negative {
                Some(negative) => {
                    (&column_values[mapping.positive] - &column_values[negative]).simplify()
                }
                None => column_values[mapping.positive].clone(),
            })
            .collect();

        let objective_value = model
            .objective()
            .expression
            .evaluate(|v| values[v.index()].clone());

        OptimizationResult::new(
            values,
            objective_value,
            model.integer_variables().collect(),
            iterations,
        )
    }
}
