//! Diagnosis of infeasible plans by retrying with relaxed assumptions.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use ratioplan_solver::{Rational, Solver};
use tracing::debug;

use crate::error::PlanError;
use crate::gamedata::{GameData, Item, Recipe};
use crate::plan::ProductionPlan;
use crate::planner::{OptimizationTarget, ProductionPlanner};

/// Which assumptions an attempt relaxed
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Relaxation {
    None,
    /// Every raw resource available up to its extraction cap
    Resources,
    /// Every recipe in the game data allowed
    Recipes,
    ResourcesAndRecipes,
}

/// One planning attempt and its outcome; `plan` is `None` when infeasible.
#[derive(Debug, Clone)]
pub struct PlanAttempt {
    pub relaxation: Relaxation,
    pub planner: ProductionPlanner,
    pub plan: Option<ProductionPlan>,
}

impl PlanAttempt {
    fn run(relaxation: Relaxation, planner: ProductionPlanner, solver: &Solver) -> Result<Self, PlanError> {
        let plan = match planner.create_plan_with(solver) {
            Ok(plan) => Some(plan),
            Err(PlanError::NotFeasible) => None,
            Err(err) => return Err(err),
        };
        debug!(relaxation = ?relaxation, feasible = plan.is_some(), "plan attempt");
        Ok(Self {
            relaxation,
            planner,
            plan,
        })
    }

    pub fn is_feasible(&self) -> bool {
        self.plan.is_some()
    }
}

/// Up to four attempts at the same planning problem.
#[derive(Debug, Clone)]
pub struct MultiPlan {
    original: PlanAttempt,
    with_resources: Option<PlanAttempt>,
    with_recipes: Option<PlanAttempt>,
    with_both: Option<PlanAttempt>,
}

/// Summary of a [`MultiPlan`], keyed by name
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    pub status: Relaxation,
    pub solvable: bool,
    pub missing_resources: BTreeMap<String, Rational>,
    pub missing_recipes: Vec<String>,
}

fn succeeded(attempt: &Option<PlanAttempt>) -> bool {
    attempt.as_ref().is_some_and(PlanAttempt::is_feasible)
}

impl MultiPlan {
    pub fn original(&self) -> &PlanAttempt {
        &self.original
    }

    pub fn attempts(&self) -> impl Iterator<Item = &PlanAttempt> {
        std::iter::once(&self.original)
            .chain(self.with_resources.as_ref())
            .chain(self.with_recipes.as_ref())
            .chain(self.with_both.as_ref())
    }

    /// The unmodified plan, if it was feasible
    pub fn plan(&self) -> Option<&ProductionPlan> {
        self.original.plan.as_ref()
    }

    pub fn is_feasible(&self) -> bool {
        self.original.is_feasible()
    }

    pub fn needs_resources(&self) -> bool {
        !self.is_feasible() && succeeded(&self.with_resources)
    }

    pub fn needs_recipes(&self) -> bool {
        !self.is_feasible() && succeeded(&self.with_recipes)
    }

    /// Neither relaxation alone helped, but both together did.
    pub fn needs_resources_and_recipes(&self) -> bool {
        !self.is_feasible() && !self.needs_resources() && !self.needs_recipes() && succeeded(&self.with_both)
    }

    pub fn is_impossible(&self) -> bool {
        self.attempts().all(|attempt| !attempt.is_feasible())
    }

    /// The least relaxed attempt that succeeded
    pub fn status(&self) -> Option<Relaxation> {
        if self.is_feasible() {
            Some(Relaxation::None)
        } else if self.needs_resources() {
            Some(Relaxation::Resources)
        } else if self.needs_recipes() {
            Some(Relaxation::Recipes)
        } else if self.needs_resources_and_recipes() {
            Some(Relaxation::ResourcesAndRecipes)
        } else {
            None
        }
    }

    fn relaxed_plan<'a>(&'a self, preferred: &'a Option<PlanAttempt>) -> Option<&'a ProductionPlan> {
        if self.is_feasible() {
            return None;
        }
        preferred
            .iter()
            .chain(self.with_both.iter())
            .find_map(|attempt| attempt.plan.as_ref())
    }

    /// Extra input per item the relaxed plan needed beyond the declared cap.
    pub fn missing_resources(&self) -> BTreeMap<Arc<Item>, Rational> {
        let Some(plan) = self.relaxed_plan(&self.with_resources) else {
            return BTreeMap::new();
        };
        let declared = self.original.planner.inputs();
        plan.input_item_amounts()
            .iter()
            .filter_map(|(item, required)| {
                let cap = declared.get(item).cloned().unwrap_or_default();
                let missing = (required - cap).simplify();
                missing.is_positive().then(|| (Arc::clone(item), missing))
            })
            .collect()
    }

    /// Recipes the relaxed plan used that the original candidates lacked.
    pub fn missing_recipes(&self) -> BTreeSet<Arc<Recipe>> {
        let Some(plan) = self.relaxed_plan(&self.with_recipes) else {
            return BTreeSet::new();
        };
        let candidates = self.original.planner.recipes();
        plan.recipe_amounts()
            .keys()
            .filter(|recipe| !candidates.contains(*recipe))
            .cloned()
            .collect()
    }

    pub fn diagnosis(&self) -> Diagnosis {
        Diagnosis {
            status: self.status().unwrap_or(Relaxation::ResourcesAndRecipes),
            solvable: self.status().is_some(),
            missing_resources: self
                .missing_resources()
                .into_iter()
                .map(|(item, amount)| (item.name.clone(), amount))
                .collect(),
            missing_recipes: self
                .missing_recipes()
                .into_iter()
                .map(|recipe| recipe.name().to_string())
                .collect(),
        }
    }
}

/// Plan as requested and, if that is infeasible, with relaxed resources and recipes.
///
/// The resource relaxation raises every raw resource to at least its
/// extraction cap and drops maximize weights, so the relaxed plan reports
/// what the minimums need rather than what the extra input could make. Its
/// first stage minimizes input drawn beyond the declared rates, so declared
/// resources are topped up before undeclared ones are brought in.
/// Only infeasibility is recovered from; other failures propagate.
pub fn get_multi_plan(
    game_data: &GameData,
    planner: &ProductionPlanner,
    solver: &Solver,
) -> Result<MultiPlan, PlanError> {
    let original = PlanAttempt::run(Relaxation::None, planner.clone(), solver)?;
    if original.is_feasible() {
        return Ok(MultiPlan {
            original,
            with_resources: None,
            with_recipes: None,
            with_both: None,
        });
    }

    let with_resources = PlanAttempt::run(Relaxation::Resources, relax_resources(game_data, planner)?, solver)?;
    let with_recipes = PlanAttempt::run(Relaxation::Recipes, relax_recipes(game_data, planner)?, solver)?;

    let with_both = if with_resources.is_feasible() || with_recipes.is_feasible() {
        None
    } else {
        let both = relax_recipes(game_data, &relax_resources(game_data, planner)?)?;
        Some(PlanAttempt::run(Relaxation::ResourcesAndRecipes, both, solver)?)
    };

    Ok(MultiPlan {
        original,
        with_resources: Some(with_resources),
        with_recipes: Some(with_recipes),
        with_both,
    })
}

fn relax_resources(game_data: &GameData, planner: &ProductionPlanner) -> Result<ProductionPlanner, PlanError> {
    let targets = std::iter::once(OptimizationTarget::MinimizeExcessInputs).chain(planner.targets().iter().copied());
    let mut builder = planner.to_builder().clear_maximize_weights().targets(targets);
    for (item, declared) in planner.inputs() {
        builder = builder.input_allowance(item, declared.clone());
    }
    for (item, cap) in game_data.resource_caps() {
        let declared = planner.inputs().get(item).cloned().unwrap_or_default();
        builder = builder.input(item, declared.max(cap.clone()));
    }
    builder.build()
}

fn relax_recipes(game_data: &GameData, planner: &ProductionPlanner) -> Result<ProductionPlanner, PlanError> {
    planner.to_builder().recipes(game_data.recipes()).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamedata::{Building, RecipeSpec};
    use ratioplan_solver::SolverError;

    fn data() -> GameData {
        let mut builder = GameData::builder();
        for name in ["ore", "coal", "scrap", "ingot", "steel", "unobtainium"] {
            builder.add_item(Item::new(name)).unwrap();
        }
        builder.add_building(Building::new("smelter", 4)).unwrap();
        builder.add_building(Building::new("foundry", 16)).unwrap();
        builder
            .add_recipe(RecipeSpec::new("ingot", "smelter", 2).ingredient("ore", 1).product("ingot", 1))
            .unwrap();
        builder
            .add_recipe(
                RecipeSpec::new("scrap_ingot", "smelter", 2)
                    .ingredient("scrap", 2)
                    .product("ingot", 1)
                    .alternate(),
            )
            .unwrap();
        builder
            .add_recipe(
                RecipeSpec::new("steel", "foundry", 4)
                    .ingredient("ore", 3)
                    .ingredient("coal", 3)
                    .product("steel", 3),
            )
            .unwrap();
        builder.add_resource_cap("ore", 600).unwrap();
        builder.add_resource_cap("coal", 300).unwrap();
        builder.add_resource_cap("scrap", 6000).unwrap();
        builder.build()
    }

    fn item<'a>(data: &'a GameData, name: &str) -> &'a Arc<Item> {
        data.item(name).unwrap()
    }

    #[test]
    fn test_feasible_plan_is_not_relaxed() {
        let data = data();
        let planner = ProductionPlanner::builder()
            .input(item(&data, "ore"), 60)
            .output(item(&data, "ingot"), 30)
            .recipes(data.recipes())
            .build()
            .unwrap();
        let multi = get_multi_plan(&data, &planner, &Solver::new()).unwrap();
        assert!(multi.is_feasible());
        assert_eq!(multi.status(), Some(Relaxation::None));
        assert_eq!(multi.attempts().count(), 1);
        assert!(multi.missing_resources().is_empty());
        assert!(multi.missing_recipes().is_empty());
    }

    #[test]
    fn test_missing_resources() {
        let data = data();
        let planner = ProductionPlanner::builder()
            .input(item(&data, "ore"), 20)
            .output(item(&data, "ingot"), 30)
            .maximize_output(item(&data, "ingot"), 1)
            .recipes(data.recipes())
            .build()
            .unwrap();
        let multi = get_multi_plan(&data, &planner, &Solver::new()).unwrap();
        assert!(!multi.is_feasible());
        assert!(multi.needs_resources());
        assert!(!multi.needs_recipes());
        assert!(!multi.needs_resources_and_recipes());
        assert!(!multi.is_impossible());

        // weights are stripped, so only the minimum is planned
        let missing = multi.missing_resources();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[item(&data, "ore")], Rational::from(10));
    }

    #[test]
    fn test_missing_resources_top_up_declared_inputs() {
        let data = data();
        let planner = ProductionPlanner::builder()
            .input(item(&data, "ore"), 20)
            .output(item(&data, "ingot"), 30)
            .recipes(data.recipes())
            .build()
            .unwrap();
        let multi = get_multi_plan(&data, &planner, &Solver::new()).unwrap();
        assert!(multi.needs_resources());

        // scrap is far less scarce, but ten more ore is the smaller top-up
        let relaxed = multi.attempts().find(|a| a.relaxation == Relaxation::Resources).unwrap();
        let plan = relaxed.plan.as_ref().unwrap();
        assert_eq!(plan.input_amount(item(&data, "scrap")), Rational::zero());
        assert_eq!(plan.input_amount(item(&data, "ore")), Rational::from(30));
        assert_eq!(relaxed.planner.input_allowances()[item(&data, "ore")], Rational::from(20));

        let missing = multi.missing_resources();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[item(&data, "ore")], Rational::from(10));
        assert_eq!(
            multi.diagnosis().missing_resources,
            BTreeMap::from([("ore".to_string(), Rational::from(10))])
        );
    }

    #[test]
    fn test_unbounded_is_not_relaxed() {
        let mut builder = GameData::builder();
        builder.add_item(Item::new("water")).unwrap();
        builder.add_building(Building::new("pump", 20)).unwrap();
        builder
            .add_recipe(RecipeSpec::new("pump", "pump", 1).product("water", 2))
            .unwrap();
        let data = builder.build();

        let planner = ProductionPlanner::builder()
            .maximize_output(item(&data, "water"), 1)
            .recipes(data.recipes())
            .build()
            .unwrap();
        let unbounded = PlanError::Internal(SolverError::Unbounded);
        assert_eq!(planner.create_plan().err(), Some(unbounded.clone()));
        assert_eq!(get_multi_plan(&data, &planner, &Solver::new()).err(), Some(unbounded));
    }

    #[test]
    fn test_resources_and_recipes_together() {
        let data = data();
        let planner = ProductionPlanner::builder()
            .input(item(&data, "ore"), 60)
            .output(item(&data, "steel"), 45)
            .recipe(data.recipe("ingot").unwrap())
            .build()
            .unwrap();
        let multi = get_multi_plan(&data, &planner, &Solver::new()).unwrap();
        assert!(multi.needs_resources_and_recipes());
        assert_eq!(multi.status(), Some(Relaxation::ResourcesAndRecipes));
        assert_eq!(multi.attempts().count(), 4);

        let names: Vec<_> = multi.missing_recipes().iter().map(|r| r.name().to_string()).collect();
        assert_eq!(names, vec!["steel"]);
        assert_eq!(multi.missing_resources()[item(&data, "coal")], Rational::from(45));

        let diagnosis = multi.diagnosis();
        assert!(diagnosis.solvable);
        assert_eq!(diagnosis.missing_recipes, vec!["steel".to_string()]);
    }

    #[test]
    fn test_impossible() {
        let data = data();
        let planner = ProductionPlanner::builder()
            .output(item(&data, "unobtainium"), 1)
            .build()
            .unwrap();
        let multi = get_multi_plan(&data, &planner, &Solver::new()).unwrap();
        assert!(multi.is_impossible());
        assert_eq!(multi.status(), None);
        assert!(!multi.diagnosis().solvable);
        assert!(multi.missing_recipes().is_empty());
    }

    #[test]
    fn test_interruption_propagates() {
        let data = data();
        let planner = ProductionPlanner::builder()
            .input(item(&data, "ore"), 60)
            .output(item(&data, "ingot"), 30)
            .recipes(data.recipes())
            .build()
            .unwrap();
        let flag = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let solver = Solver::new().with_cancel_flag(flag);
        assert_eq!(
            get_multi_plan(&data, &planner, &solver).err(),
            Some(PlanError::Interrupted)
        );
    }
}
