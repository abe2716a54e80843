//! Translation of a [`ProductionPlanner`] into a linear program, and of the
//! solver's optimum back into a [`ProductionPlan`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use ratioplan_solver::{
    BigInt, Expression, Model, Objective, OptimizationResult, Rational, Sense, Solver, Variable,
};
use tracing::debug;

use crate::error::PlanError;
use crate::gamedata::{Item, Recipe};
use crate::plan::ProductionPlan;
use crate::planner::{ObjectiveComposition, OptimizationTarget, ProductionPlanner};

/// Fairness term divisor in relaxed balancing, per pair
const FAIRNESS_SCALE: u32 = 1000;

/// One objective in priority order, tagged with the target it came from
#[derive(Debug, Clone)]
pub struct Stage {
    pub target: OptimizationTarget,
    pub objective: Objective,
}

/// A production planning problem expressed as a [`Model`].
#[derive(Debug, Clone)]
pub struct OptimizationModel {
    model: Model,
    recipe_map: BTreeMap<Arc<Recipe>, Variable>,
    item_input_map: BTreeMap<Arc<Item>, Variable>,
    item_output_map: BTreeMap<Arc<Item>, Variable>,
    item_surplus_map: BTreeMap<Arc<Item>, Expression>,
    item_maximize_weight_map: BTreeMap<Arc<Item>, Rational>,
    requested_outputs: BTreeSet<Arc<Item>>,
    stages: Vec<Stage>,
}

impl OptimizationModel {
    /// Build the model for `planner` over the given (already pruned) recipes.
    pub fn build(planner: &ProductionPlanner, recipes: &BTreeSet<Arc<Recipe>>) -> Result<Self, PlanError> {
        let mut model = Model::new();

        let mut recipe_map = BTreeMap::new();
        for recipe in recipes {
            let variable = model.add_non_negative_variable(format!("recipe:{}", recipe.name()));
            recipe_map.insert(Arc::clone(recipe), variable);
        }

        let mut consumed: BTreeMap<Arc<Item>, Vec<(Variable, Rational)>> = BTreeMap::new();
        let mut produced: BTreeMap<Arc<Item>, Vec<(Variable, Rational)>> = BTreeMap::new();
        for (recipe, &variable) in &recipe_map {
            for (item, rate) in recipe.ingredients() {
                consumed.entry(Arc::clone(item)).or_default().push((variable, rate.clone()));
            }
            for (item, rate) in recipe.products() {
                produced.entry(Arc::clone(item)).or_default().push((variable, rate.clone()));
            }
        }

        let items: BTreeSet<Arc<Item>> = consumed
            .keys()
            .chain(produced.keys())
            .chain(planner.inputs().keys())
            .chain(planner.outputs().keys())
            .cloned()
            .collect();

        let mut item_input_map = BTreeMap::new();
        let mut item_output_map = BTreeMap::new();
        let mut item_surplus_map = BTreeMap::new();
        let mut item_maximize_weight_map = BTreeMap::new();

        for item in &items {
            let input = match planner.inputs().get(item) {
                Some(cap) => {
                    let variable = model.add_non_negative_variable(format!("input:{}", item.name));
                    model.add_constraint(Expression::from(variable).at_most(cap));
                    item_input_map.insert(Arc::clone(item), variable);
                    Expression::from(variable)
                }
                None => Expression::zero(),
            };

            let output = model.add_non_negative_variable(format!("output:{}", item.name));
            item_output_map.insert(Arc::clone(item), output);

            let made = Expression::weighted_sum(produced.remove(item).unwrap_or_default());
            let used = Expression::weighted_sum(consumed.remove(item).unwrap_or_default());
            model.add_constraint((Expression::from(output) - input).equal_to(made - used));

            if let Some(requirement) = planner.outputs().get(item) {
                if requirement.minimum.is_positive() {
                    model.add_constraint(Expression::from(output).at_least(&requirement.minimum));
                }
                let surplus = Expression::from(output) - Expression::constant(requirement.minimum.clone());
                item_surplus_map.insert(Arc::clone(item), surplus);
                if requirement.is_maximized() {
                    item_maximize_weight_map.insert(Arc::clone(item), requirement.maximize_weight.clone());
                }
            }
        }

        let mut optimization = Self {
            model,
            recipe_map,
            item_input_map,
            item_output_map,
            item_surplus_map,
            item_maximize_weight_map,
            requested_outputs: planner.outputs().keys().cloned().collect(),
            stages: Vec::new(),
        };
        for &target in planner.targets() {
            optimization.add_target(target, planner)?;
        }
        Ok(optimization)
    }

    fn push_stage(&mut self, target: OptimizationTarget, expression: Expression, sense: Sense) {
        if expression.is_constant() {
            return;
        }
        self.stages.push(Stage {
            target,
            objective: Objective { expression, sense },
        });
    }

    fn add_target(&mut self, target: OptimizationTarget, planner: &ProductionPlanner) -> Result<(), PlanError> {
        match target {
            OptimizationTarget::MaximizeOutputItems => self.add_output_maximization(planner.is_strict_max_ratio())?,
            OptimizationTarget::MinimizeInputItems => {
                let expression = Expression::sum(self.item_input_map.values().copied());
                self.push_stage(target, expression, Sense::Minimize);
            }
            OptimizationTarget::MinimizeResourceScarcity => {
                let mut terms = Vec::new();
                for (item, &variable) in &self.item_input_map {
                    let cap = &planner.inputs()[item];
                    if cap.is_positive() {
                        terms.push((variable, cap.reciprocal()?));
                    }
                }
                self.push_stage(target, Expression::weighted_sum(terms), Sense::Minimize);
            }
            OptimizationTarget::MinimizeByproducts => {
                let expression = Expression::sum(
                    self.item_output_map
                        .iter()
                        .filter(|(item, _)| !self.requested_outputs.contains(*item))
                        .map(|(_, &variable)| variable),
                );
                self.push_stage(target, expression, Sense::Minimize);
            }
            OptimizationTarget::MinimizePowerConsumption => {
                let expression = Expression::weighted_sum(
                    self.recipe_map
                        .iter()
                        .map(|(recipe, &variable)| (variable, recipe.average_power_mw()))
                        .filter(|(_, power)| !power.is_zero()),
                );
                self.push_stage(target, expression, Sense::Minimize);
            }
            OptimizationTarget::MaximizeSinkPoints => {
                let expression = Expression::weighted_sum(
                    self.item_output_map
                        .iter()
                        .filter(|(item, _)| item.sink_value > 0)
                        .map(|(item, &variable)| (variable, Rational::from(item.sink_value))),
                );
                self.push_stage(target, expression, Sense::Maximize);
            }
            OptimizationTarget::MinimizeBuildings => {
                let expression = Expression::sum(self.recipe_map.values().copied());
                self.push_stage(target, expression, Sense::Minimize);
            }
            OptimizationTarget::MinimizeExcessInputs => {
                // excess >= input - allowance, both non-negative
                let mut excesses = Vec::new();
                for (item, &input) in &self.item_input_map {
                    let allowance = planner.input_allowances().get(item).cloned().unwrap_or_default();
                    let excess = self.model.add_non_negative_variable(format!("excess:{}", item.name));
                    let drawn = Expression::from(input) - Expression::constant(allowance);
                    self.model.add_constraint(Expression::from(excess).at_least(drawn));
                    excesses.push(excess);
                }
                self.push_stage(target, Expression::sum(excesses), Sense::Minimize);
            }
        }
        Ok(())
    }

    /// Stages for outputs carrying a maximize weight.
    ///
    /// Several maximized outputs are balanced against each other so the
    /// solver cannot just push the cheapest one.
    fn add_output_maximization(&mut self, strict: bool) -> Result<(), PlanError> {
        let target = OptimizationTarget::MaximizeOutputItems;
        let weighted: Vec<(Arc<Item>, Rational, Expression)> = self
            .item_maximize_weight_map
            .iter()
            .map(|(item, weight)| (Arc::clone(item), weight.clone(), self.item_surplus_map[item].clone()))
            .collect();

        match weighted.as_slice() {
            [] => {}
            [(_, _, surplus)] => self.push_stage(target, surplus.clone(), Sense::Maximize),
            _ if strict => {
                let total: Rational = weighted.iter().map(|(_, weight, _)| weight).sum();
                let balance = self.model.add_non_negative_variable("balance");
                for (_, weight, surplus) in &weighted {
                    let share = weight.checked_div(&total)?;
                    self.model
                        .add_constraint(surplus.equal_to(Expression::term(balance, share)));
                }
                self.push_stage(target, Expression::from(balance), Sense::Maximize);
            }
            _ => {
                let floor = self.model.add_non_negative_variable("balance:floor");
                let mut pairs = Vec::new();
                for (i, (first, first_weight, first_surplus)) in weighted.iter().enumerate() {
                    for (second, second_weight, second_surplus) in &weighted[i + 1..] {
                        let pair = self
                            .model
                            .add_non_negative_variable(format!("balance:{}:{}", first.name, second.name));
                        let pair_expr = Expression::from(pair);
                        self.model
                            .add_constraint(pair_expr.at_most(first_surplus.scaled(&first_weight.reciprocal()?)));
                        self.model
                            .add_constraint(pair_expr.at_most(second_surplus.scaled(&second_weight.reciprocal()?)));
                        self.model.add_constraint(Expression::from(floor).at_most(&pair_expr));
                        pairs.push(pair);
                    }
                }

                self.push_stage(target, Expression::from(floor), Sense::Maximize);

                let fairness = Rational::new(1, BigInt::from(FAIRNESS_SCALE) * BigInt::from(pairs.len()))?;
                let throughput = weighted
                    .iter()
                    .fold(Expression::zero(), |acc, (_, _, surplus)| acc + surplus);
                let expression = throughput + Expression::sum(pairs).scaled(&fairness);
                self.push_stage(target, expression, Sense::Maximize);
            }
        }
        Ok(())
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn recipe_map(&self) -> &BTreeMap<Arc<Recipe>, Variable> {
        &self.recipe_map
    }

    pub fn item_input_map(&self) -> &BTreeMap<Arc<Item>, Variable> {
        &self.item_input_map
    }

    pub fn item_output_map(&self) -> &BTreeMap<Arc<Item>, Variable> {
        &self.item_output_map
    }

    /// Output above the requested minimum, per requested item
    pub fn item_surplus_map(&self) -> &BTreeMap<Arc<Item>, Expression> {
        &self.item_surplus_map
    }

    pub fn item_maximize_weight_map(&self) -> &BTreeMap<Arc<Item>, Rational> {
        &self.item_maximize_weight_map
    }

    /// Solve all stages with the given composition.
    pub fn solve(&self, solver: &Solver, composition: ObjectiveComposition) -> Result<OptimizationResult, PlanError> {
        let mut model = self.model.clone();

        if self.stages.is_empty() {
            model.set_objective(Expression::zero(), Sense::Maximize);
            return Ok(solver.solve(&model)?);
        }

        match composition {
            ObjectiveComposition::Lexicographic => {
                let mut last = None;
                for stage in &self.stages {
                    let Objective { expression, sense } = &stage.objective;
                    model.set_objective(expression.clone(), *sense);
                    let result = solver.solve(&model)?;
                    let optimum = result.evaluate(expression);
                    debug!(objective = ?stage.target, optimum = %optimum, "stage solved");
                    let pin = match sense {
                        Sense::Maximize => expression.at_least(&optimum),
                        Sense::Minimize => expression.at_most(&optimum),
                    };
                    model.add_constraint(pin);
                    last = Some(result);
                }
                last.ok_or_else(|| PlanError::Request("no objective stages".to_string()))
            }
            ObjectiveComposition::MagnitudeWeighted { orders_of_magnitude } => {
                let step = BigInt::from(10).pow(orders_of_magnitude);
                let mut scale = BigInt::from(1);
                let mut combined = Expression::zero();
                for stage in &self.stages {
                    let weight = Rational::new(1, scale.clone())?;
                    let signed = match stage.objective.sense {
                        Sense::Maximize => weight,
                        Sense::Minimize => -weight,
                    };
                    combined = combined + stage.objective.expression.scaled(&signed);
                    scale *= &step;
                }
                model.set_objective(combined, Sense::Maximize);
                let result = solver.solve(&model)?;
                debug!(objective = %result.objective_value(), "weighted objective solved");
                Ok(result)
            }
        }
    }

    /// Read the recipe and item amounts of an optimum, keeping positive amounts only.
    pub fn decode(&self, result: &OptimizationResult) -> ProductionPlan {
        fn positive<K: Ord + Clone>(map: &BTreeMap<K, Variable>, result: &OptimizationResult) -> BTreeMap<K, Rational> {
            map.iter()
                .filter_map(|(key, &variable)| {
                    let value = result.value(variable).simplify();
                    value.is_positive().then(|| (key.clone(), value))
                })
                .collect()
        }

        ProductionPlan::new(
            positive(&self.recipe_map, result),
            positive(&self.item_input_map, result),
            positive(&self.item_output_map, result),
            self.requested_outputs.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamedata::{Building, GameData, RecipeSpec};

    fn data() -> GameData {
        let mut builder = GameData::builder();
        for name in ["ore", "ingot", "rod", "plate", "slag"] {
            builder.add_item(Item::new(name)).unwrap();
        }
        builder.add_building(Building::new("smelter", 4)).unwrap();
        builder.add_building(Building::new("constructor", 4)).unwrap();
        builder
            .add_recipe(
                RecipeSpec::new("ingot", "smelter", 2)
                    .ingredient("ore", 1)
                    .product("ingot", 1)
                    .product("slag", 1),
            )
            .unwrap();
        builder
            .add_recipe(RecipeSpec::new("rod", "constructor", 4).ingredient("ingot", 1).product("rod", 1))
            .unwrap();
        builder
            .add_recipe(RecipeSpec::new("plate", "constructor", 6).ingredient("ingot", 3).product("plate", 2))
            .unwrap();
        builder.build()
    }

    fn item<'a>(data: &'a GameData, name: &str) -> &'a Arc<Item> {
        data.item(name).unwrap()
    }

    fn all_recipes(data: &GameData) -> BTreeSet<Arc<Recipe>> {
        data.recipes().cloned().collect()
    }

    #[test]
    fn test_variables_and_maps() {
        let data = data();
        let planner = ProductionPlanner::builder()
            .input(item(&data, "ore"), 60)
            .output(item(&data, "rod"), 10)
            .build()
            .unwrap();
        let model = OptimizationModel::build(&planner, &all_recipes(&data)).unwrap();
        assert_eq!(model.recipe_map().len(), 3);
        assert_eq!(model.item_input_map().len(), 1);
        // every touched item gets an output variable
        assert_eq!(model.item_output_map().len(), 5);
        assert_eq!(model.item_surplus_map().len(), 1);
        assert!(model.item_maximize_weight_map().is_empty());
        assert_eq!(model.model().variable_name(model.recipe_map().values().copied().next().unwrap()), Some("recipe:ingot"));
    }

    #[test]
    fn test_stages_skip_empty_objectives() {
        let data = data();
        let planner = ProductionPlanner::builder()
            .input(item(&data, "ore"), 60)
            .output(item(&data, "rod"), 10)
            .build()
            .unwrap();
        let model = OptimizationModel::build(&planner, &all_recipes(&data)).unwrap();
        // nothing is maximized, so only scarcity and byproducts remain
        let targets: Vec<_> = model.stages().iter().map(|s| s.target).collect();
        assert_eq!(
            targets,
            vec![OptimizationTarget::MinimizeResourceScarcity, OptimizationTarget::MinimizeByproducts]
        );
    }

    #[test]
    fn test_strict_balancing_uses_one_stage() {
        let data = data();
        let planner = ProductionPlanner::builder()
            .input(item(&data, "ore"), 60)
            .maximize_output(item(&data, "rod"), 1)
            .maximize_output(item(&data, "plate"), 2)
            .strict_max_ratio(true)
            .targets([OptimizationTarget::MaximizeOutputItems])
            .build()
            .unwrap();
        let model = OptimizationModel::build(&planner, &all_recipes(&data)).unwrap();
        assert_eq!(model.stages().len(), 1);

        let result = model.solve(&Solver::new(), ObjectiveComposition::Lexicographic).unwrap();
        let plan = model.decode(&result);
        let rod = plan.output_amount(item(&data, "rod"));
        let plate = plan.output_amount(item(&data, "plate"));
        assert_eq!(plate, rod.multiply_by_integer(2));
        // ingot use: rod + 3/2 plate = 60, with plate = 2 rod
        assert_eq!(rod, Rational::from(15));
    }

    #[test]
    fn test_relaxed_balancing_uses_floor_then_throughput() {
        let data = data();
        let planner = ProductionPlanner::builder()
            .input(item(&data, "ore"), 60)
            .maximize_output(item(&data, "rod"), 1)
            .maximize_output(item(&data, "plate"), 1)
            .targets([OptimizationTarget::MaximizeOutputItems])
            .build()
            .unwrap();
        let model = OptimizationModel::build(&planner, &all_recipes(&data)).unwrap();
        assert_eq!(model.stages().len(), 2);

        let result = model.solve(&Solver::new(), ObjectiveComposition::Lexicographic).unwrap();
        let plan = model.decode(&result);
        // the floor stage equalizes both at 24 (24 + 36 ingots)
        assert_eq!(plan.output_amount(item(&data, "rod")), Rational::from(24));
        assert_eq!(plan.output_amount(item(&data, "plate")), Rational::from(24));
    }

    #[test]
    fn test_magnitude_weighted_matches_lexicographic() {
        let data = data();
        let planner = ProductionPlanner::builder()
            .input(item(&data, "ore"), 60)
            .maximize_output(item(&data, "rod"), 1)
            .recipes(data.recipes())
            .build()
            .unwrap();
        let model = OptimizationModel::build(&planner, &all_recipes(&data)).unwrap();
        let exact = model.solve(&Solver::new(), ObjectiveComposition::Lexicographic).unwrap();
        let weighted = model
            .solve(&Solver::new(), ObjectiveComposition::MagnitudeWeighted { orders_of_magnitude: 6 })
            .unwrap();
        assert_eq!(model.decode(&exact), model.decode(&weighted));
    }

    #[test]
    fn test_infeasible_minimum() {
        let data = data();
        let planner = ProductionPlanner::builder()
            .input(item(&data, "ore"), 10)
            .output(item(&data, "rod"), 20)
            .build()
            .unwrap();
        let model = OptimizationModel::build(&planner, &all_recipes(&data)).unwrap();
        assert_eq!(
            model.solve(&Solver::new(), ObjectiveComposition::Lexicographic).err(),
            Some(PlanError::NotFeasible)
        );
    }
}
