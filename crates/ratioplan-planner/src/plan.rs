use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use ratioplan_solver::Rational;

use crate::error::PlanError;
use crate::gamedata::{GameData, Item, Recipe};
use crate::graph::{self, EdgeData, Graph, NodeData};

/// A solved plan: how much of each recipe runs and what enters and leaves.
///
/// Amounts are per minute, strictly positive and exact. Recipe amounts count
/// machine-equivalents running at full speed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductionPlan {
    recipe_amounts: BTreeMap<Arc<Recipe>, Rational>,
    input_item_amounts: BTreeMap<Arc<Item>, Rational>,
    output_item_amounts: BTreeMap<Arc<Item>, Rational>,
    requested_outputs: BTreeSet<Arc<Item>>,
}

impl ProductionPlan {
    pub(crate) fn new(
        recipe_amounts: BTreeMap<Arc<Recipe>, Rational>,
        input_item_amounts: BTreeMap<Arc<Item>, Rational>,
        output_item_amounts: BTreeMap<Arc<Item>, Rational>,
        requested_outputs: BTreeSet<Arc<Item>>,
    ) -> Self {
        Self {
            recipe_amounts,
            input_item_amounts,
            output_item_amounts,
            requested_outputs,
        }
    }

    pub fn recipe_amounts(&self) -> &BTreeMap<Arc<Recipe>, Rational> {
        &self.recipe_amounts
    }

    pub fn input_item_amounts(&self) -> &BTreeMap<Arc<Item>, Rational> {
        &self.input_item_amounts
    }

    pub fn output_item_amounts(&self) -> &BTreeMap<Arc<Item>, Rational> {
        &self.output_item_amounts
    }

    /// Outputs the planner asked for; every other output is a byproduct.
    pub fn requested_outputs(&self) -> &BTreeSet<Arc<Item>> {
        &self.requested_outputs
    }

    pub fn recipe_amount(&self, recipe: &Recipe) -> Rational {
        self.recipe_amounts.get(recipe).cloned().unwrap_or_default()
    }

    pub fn input_amount(&self, item: &Item) -> Rational {
        self.input_item_amounts.get(item).cloned().unwrap_or_default()
    }

    pub fn output_amount(&self, item: &Item) -> Rational {
        self.output_item_amounts.get(item).cloned().unwrap_or_default()
    }

    pub fn is_byproduct(&self, item: &Item) -> bool {
        self.output_item_amounts.contains_key(item) && !self.requested_outputs.contains(item)
    }

    pub fn is_empty(&self) -> bool {
        self.recipe_amounts.is_empty() && self.input_item_amounts.is_empty() && self.output_item_amounts.is_empty()
    }

    /// Every item entering, leaving or passing through the plan
    pub fn items(&self) -> BTreeSet<Arc<Item>> {
        let mut items: BTreeSet<Arc<Item>> = self
            .input_item_amounts
            .keys()
            .chain(self.output_item_amounts.keys())
            .cloned()
            .collect();
        for recipe in self.recipe_amounts.keys() {
            items.extend(recipe.ingredients().keys().cloned());
            items.extend(recipe.products().keys().cloned());
        }
        items
    }

    /// Total rate at which recipes make `item`
    pub fn produced(&self, item: &Item) -> Rational {
        self.recipe_amounts
            .iter()
            .map(|(recipe, amount)| amount * recipe.produced_per_minute(item))
            .sum()
    }

    /// Total rate at which recipes use up `item`
    pub fn consumed(&self, item: &Item) -> Rational {
        self.recipe_amounts
            .iter()
            .map(|(recipe, amount)| amount * recipe.consumed_per_minute(item))
            .sum()
    }

    /// `produced + input - consumed - output`, which is zero for a solved plan.
    pub fn item_balance(&self, item: &Item) -> Rational {
        (self.produced(item) + self.input_amount(item) - self.consumed(item) - self.output_amount(item)).simplify()
    }

    /// Average power draw in MW
    pub fn power_consumption(&self) -> Rational {
        self.recipe_amounts
            .iter()
            .map(|(recipe, amount)| amount * recipe.average_power_mw())
            .sum()
    }

    pub fn sink_points(&self) -> Rational {
        self.output_item_amounts
            .iter()
            .map(|(item, amount)| amount.multiply_by_integer(item.sink_value))
            .sum()
    }

    /// Machine-equivalents across all recipes
    pub fn building_count(&self) -> Rational {
        self.recipe_amounts.values().sum()
    }

    /// Machine-equivalents per building type
    pub fn building_counts(&self) -> BTreeMap<String, Rational> {
        let mut counts: BTreeMap<String, Rational> = BTreeMap::new();
        for (recipe, amount) in &self.recipe_amounts {
            let entry = counts.entry(recipe.building().name.clone()).or_default();
            *entry = (&*entry + amount).simplify();
        }
        counts
    }

    /// Reconstruct item flows between recipes, inputs and outputs.
    pub fn to_graph(&self) -> Graph<NodeData, EdgeData> {
        graph::flow_graph(self)
    }

    pub fn snapshot(&self) -> PlanSnapshot {
        let names = |map: &BTreeMap<Arc<Item>, Rational>| -> BTreeMap<String, Rational> {
            map.iter().map(|(item, amount)| (item.name.clone(), amount.clone())).collect()
        };
        PlanSnapshot {
            recipes: self
                .recipe_amounts
                .iter()
                .map(|(recipe, amount)| (recipe.name().to_string(), amount.clone()))
                .collect(),
            inputs: names(&self.input_item_amounts),
            outputs: names(&self.output_item_amounts),
            requested_outputs: self.requested_outputs.iter().map(|item| item.name.clone()).collect(),
        }
    }
}

/// A plan keyed by name, for persistence.
///
/// Amounts serialize as exact rational strings such as `"45/2"` or `"60"`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlanSnapshot {
    #[cfg_attr(feature = "serde", serde(default))]
    pub recipes: BTreeMap<String, Rational>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub inputs: BTreeMap<String, Rational>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub outputs: BTreeMap<String, Rational>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub requested_outputs: BTreeSet<String>,
}

impl PlanSnapshot {
    /// Resolve names against `game_data`, dropping zero amounts.
    pub fn restore(&self, game_data: &GameData) -> Result<ProductionPlan, PlanError> {
        let item = |name: &String| {
            game_data
                .item(name)
                .cloned()
                .ok_or_else(|| PlanError::UnknownItem(name.clone()))
        };
        let amounts = |map: &BTreeMap<String, Rational>| -> Result<BTreeMap<Arc<Item>, Rational>, PlanError> {
            let mut resolved = BTreeMap::new();
            for (name, amount) in map {
                check_amount(name, amount)?;
                if amount.is_positive() {
                    resolved.insert(item(name)?, amount.simplify());
                }
            }
            Ok(resolved)
        };

        let mut recipe_amounts = BTreeMap::new();
        for (name, amount) in &self.recipes {
            check_amount(name, amount)?;
            let recipe = game_data
                .recipe(name)
                .cloned()
                .ok_or_else(|| PlanError::UnknownRecipe(name.clone()))?;
            if amount.is_positive() {
                recipe_amounts.insert(recipe, amount.simplify());
            }
        }

        let requested_outputs = self.requested_outputs.iter().map(&item).collect::<Result<_, _>>()?;

        Ok(ProductionPlan::new(
            recipe_amounts,
            amounts(&self.inputs)?,
            amounts(&self.outputs)?,
            requested_outputs,
        ))
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, PlanError> {
        serde_json::to_string_pretty(self).map_err(|e| PlanError::Request(e.to_string()))
    }

    #[cfg(feature = "serde")]
    pub fn from_json(source: &str) -> Result<Self, PlanError> {
        serde_json::from_str(source).map_err(|e| PlanError::Request(e.to_string()))
    }
}

fn check_amount(name: &str, amount: &Rational) -> Result<(), PlanError> {
    if amount.is_negative() {
        return Err(PlanError::InvalidRate {
            item: name.to_string(),
            message: format!("amount must not be negative, got {amount}"),
        });
    }
    Ok(())
}
