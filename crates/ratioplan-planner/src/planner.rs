use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use ratioplan_solver::{Rational, Solver};
use tracing::{debug, info};

use crate::error::PlanError;
use crate::gamedata::{Item, Recipe};
use crate::optimization::OptimizationModel;
use crate::plan::ProductionPlan;
use crate::pruning::{recipes_that_build_what_we_need, recipes_we_can_build};

/// A sub-objective of the plan, applied in priority order.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptimizationTarget {
    /// Maximize the surplus of outputs carrying a maximize weight
    MaximizeOutputItems,
    MinimizeInputItems,
    /// Minimize the share of each input's cap that gets used
    MinimizeResourceScarcity,
    /// Minimize outputs nobody asked for
    MinimizeByproducts,
    MinimizePowerConsumption,
    MaximizeSinkPoints,
    /// Minimize the total number of machine-equivalents
    MinimizeBuildings,
    /// Minimize input drawn beyond each item's allowance
    MinimizeExcessInputs,
}

impl OptimizationTarget {
    pub fn defaults() -> Vec<OptimizationTarget> {
        vec![
            OptimizationTarget::MaximizeOutputItems,
            OptimizationTarget::MinimizeResourceScarcity,
            OptimizationTarget::MinimizeByproducts,
        ]
    }
}

/// How the per-target objectives are combined.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "mode", rename_all = "kebab-case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectiveComposition {
    /// Solve each target in turn, pinning every earlier optimum before the next
    #[default]
    Lexicographic,
    /// One solve; every lower-priority target is scaled down by `10^orders_of_magnitude`
    MagnitudeWeighted { orders_of_magnitude: u32 },
}

/// What is wanted of one output item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutputRequirement {
    /// Rate per minute that must at least be produced
    pub minimum: Rational,
    /// Relative weight when maximizing; zero means the item is not maximized
    pub maximize_weight: Rational,
}

impl OutputRequirement {
    pub fn is_maximized(&self) -> bool {
        self.maximize_weight.is_positive()
    }
}

/// Immutable description of a planning problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionPlanner {
    inputs: BTreeMap<Arc<Item>, Rational>,
    input_allowances: BTreeMap<Arc<Item>, Rational>,
    outputs: BTreeMap<Arc<Item>, OutputRequirement>,
    recipes: BTreeSet<Arc<Recipe>>,
    targets: Vec<OptimizationTarget>,
    strict_max_ratio: bool,
    composition: ObjectiveComposition,
}

impl ProductionPlanner {
    pub fn builder() -> ProductionPlannerBuilder {
        ProductionPlannerBuilder::default()
    }

    /// A builder pre-filled with this planner, for deriving variants.
    pub fn to_builder(&self) -> ProductionPlannerBuilder {
        ProductionPlannerBuilder {
            inputs: self.inputs.clone(),
            input_allowances: self.input_allowances.clone(),
            outputs: self.outputs.clone(),
            recipes: self.recipes.clone(),
            targets: self.targets.clone(),
            strict_max_ratio: self.strict_max_ratio,
            composition: self.composition,
        }
    }

    /// Maximum available rate per input item
    pub fn inputs(&self) -> &BTreeMap<Arc<Item>, Rational> {
        &self.inputs
    }

    /// Input per item that [`OptimizationTarget::MinimizeExcessInputs`] does not count
    pub fn input_allowances(&self) -> &BTreeMap<Arc<Item>, Rational> {
        &self.input_allowances
    }

    pub fn outputs(&self) -> &BTreeMap<Arc<Item>, OutputRequirement> {
        &self.outputs
    }

    pub fn recipes(&self) -> &BTreeSet<Arc<Recipe>> {
        &self.recipes
    }

    pub fn targets(&self) -> &[OptimizationTarget] {
        &self.targets
    }

    pub fn is_strict_max_ratio(&self) -> bool {
        self.strict_max_ratio
    }

    pub fn composition(&self) -> ObjectiveComposition {
        self.composition
    }

    pub fn create_plan(&self) -> Result<ProductionPlan, PlanError> {
        self.create_plan_with(&Solver::new())
    }

    /// Prune the candidate recipes, solve, and decode the optimum.
    pub fn create_plan_with(&self, solver: &Solver) -> Result<ProductionPlan, PlanError> {
        let available: BTreeSet<Arc<Item>> = self.inputs.keys().cloned().collect();
        let buildable = recipes_we_can_build(&self.recipes, &available);
        let wanted: BTreeSet<Arc<Item>> = self.outputs.keys().cloned().collect();
        let relevant = recipes_that_build_what_we_need(&buildable, &wanted);
        debug!(
            candidates = self.recipes.len(),
            buildable = buildable.len(),
            relevant = relevant.len(),
            "pruned recipes"
        );

        let model = OptimizationModel::build(self, &relevant)?;
        info!(
            variables = model.model().num_variables(),
            constraints = model.model().num_constraints(),
            stages = model.stages().len(),
            "planning"
        );
        let result = model.solve(solver, self.composition)?;
        Ok(model.decode(&result))
    }
}

/// Fluent construction of a [`ProductionPlanner`].
#[derive(Debug, Clone)]
pub struct ProductionPlannerBuilder {
    inputs: BTreeMap<Arc<Item>, Rational>,
    input_allowances: BTreeMap<Arc<Item>, Rational>,
    outputs: BTreeMap<Arc<Item>, OutputRequirement>,
    recipes: BTreeSet<Arc<Recipe>>,
    targets: Vec<OptimizationTarget>,
    strict_max_ratio: bool,
    composition: ObjectiveComposition,
}

impl Default for ProductionPlannerBuilder {
    fn default() -> Self {
        Self {
            inputs: BTreeMap::new(),
            input_allowances: BTreeMap::new(),
            outputs: BTreeMap::new(),
            recipes: BTreeSet::new(),
            targets: OptimizationTarget::defaults(),
            strict_max_ratio: false,
            composition: ObjectiveComposition::default(),
        }
    }
}

impl ProductionPlannerBuilder {
    /// Make `item` available at up to `max_rate` per minute, replacing any earlier rate.
    pub fn input(mut self, item: &Arc<Item>, max_rate: impl Into<Rational>) -> Self {
        self.inputs.insert(Arc::clone(item), max_rate.into());
        self
    }

    /// Let up to `rate` per minute of `item` count as free under
    /// [`OptimizationTarget::MinimizeExcessInputs`].
    pub fn input_allowance(mut self, item: &Arc<Item>, rate: impl Into<Rational>) -> Self {
        self.input_allowances.insert(Arc::clone(item), rate.into());
        self
    }

    pub fn remove_input(mut self, item: &Item) -> Self {
        self.inputs.remove(item);
        self
    }

    /// Require at least `minimum` per minute of `item`, keeping any maximize weight.
    pub fn output(mut self, item: &Arc<Item>, minimum: impl Into<Rational>) -> Self {
        self.outputs.entry(Arc::clone(item)).or_default().minimum = minimum.into();
        self
    }

    /// Maximize `item` with the given relative weight, keeping any minimum.
    pub fn maximize_output(mut self, item: &Arc<Item>, weight: impl Into<Rational>) -> Self {
        self.outputs.entry(Arc::clone(item)).or_default().maximize_weight = weight.into();
        self
    }

    pub fn output_requirement(mut self, item: &Arc<Item>, requirement: OutputRequirement) -> Self {
        self.outputs.insert(Arc::clone(item), requirement);
        self
    }

    pub fn remove_output(mut self, item: &Item) -> Self {
        self.outputs.remove(item);
        self
    }

    /// Set every maximize weight to zero, leaving only the minimums.
    pub fn clear_maximize_weights(mut self) -> Self {
        for requirement in self.outputs.values_mut() {
            requirement.maximize_weight = Rational::zero();
        }
        self
    }

    pub fn recipe(mut self, recipe: &Arc<Recipe>) -> Self {
        self.recipes.insert(Arc::clone(recipe));
        self
    }

    pub fn recipes<'a>(mut self, recipes: impl IntoIterator<Item = &'a Arc<Recipe>>) -> Self {
        self.recipes.extend(recipes.into_iter().cloned());
        self
    }

    pub fn remove_recipe(mut self, recipe: &Recipe) -> Self {
        self.recipes.remove(recipe);
        self
    }

    pub fn targets(mut self, targets: impl IntoIterator<Item = OptimizationTarget>) -> Self {
        self.targets = targets.into_iter().collect();
        self
    }

    /// Force maximized outputs into their exact weight ratio.
    pub fn strict_max_ratio(mut self, strict: bool) -> Self {
        self.strict_max_ratio = strict;
        self
    }

    pub fn composition(mut self, composition: ObjectiveComposition) -> Self {
        self.composition = composition;
        self
    }

    /// Validate rates and build the planner.
    pub fn build(self) -> Result<ProductionPlanner, PlanError> {
        for (item, rate) in &self.inputs {
            if rate.is_negative() {
                return Err(PlanError::InvalidRate {
                    item: item.name.clone(),
                    message: format!("input rate must not be negative, got {rate}"),
                });
            }
        }
        for (item, rate) in &self.input_allowances {
            if rate.is_negative() {
                return Err(PlanError::InvalidRate {
                    item: item.name.clone(),
                    message: format!("input allowance must not be negative, got {rate}"),
                });
            }
        }
        for (item, requirement) in &self.outputs {
            if requirement.minimum.is_negative() {
                return Err(PlanError::InvalidRate {
                    item: item.name.clone(),
                    message: format!("minimum output must not be negative, got {}", requirement.minimum),
                });
            }
            if requirement.maximize_weight.is_negative() {
                return Err(PlanError::InvalidRate {
                    item: item.name.clone(),
                    message: format!("maximize weight must not be negative, got {}", requirement.maximize_weight),
                });
            }
        }

        let mut targets = Vec::with_capacity(self.targets.len());
        for target in self.targets {
            if !targets.contains(&target) {
                targets.push(target);
            }
        }

        Ok(ProductionPlanner {
            inputs: self.inputs,
            input_allowances: self.input_allowances,
            outputs: self.outputs,
            recipes: self.recipes,
            targets,
            strict_max_ratio: self.strict_max_ratio,
            composition: self.composition,
        })
    }
}
