//! JSON plan requests.
//!
//! ```json
//! {
//!   "inputs": { "iron_ore": "60" },
//!   "outputs": { "iron_plate": { "minimum": "20", "maximize": "1" } },
//!   "recipes": ["iron_ingot", "iron_plate"],
//!   "targets": ["maximize-output-items", "minimize-power-consumption"],
//!   "strict_max_ratio": false,
//!   "composition": { "mode": "lexicographic" }
//! }
//! ```
//!
//! Leaving out `recipes` allows every recipe in the game data.

use std::collections::BTreeMap;

use ratioplan_solver::Rational;
use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::gamedata::GameData;
use crate::planner::{ObjectiveComposition, OptimizationTarget, OutputRequirement, ProductionPlanner};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputRequest {
    #[serde(default)]
    pub minimum: Rational,
    /// Maximize weight; zero leaves the item unmaximized
    #[serde(default)]
    pub maximize: Rational,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlanRequest {
    #[serde(default)]
    pub inputs: BTreeMap<String, Rational>,
    #[serde(default)]
    pub outputs: BTreeMap<String, OutputRequest>,
    #[serde(default)]
    pub recipes: Option<Vec<String>>,
    #[serde(default)]
    pub targets: Option<Vec<OptimizationTarget>>,
    #[serde(default)]
    pub strict_max_ratio: bool,
    #[serde(default)]
    pub composition: ObjectiveComposition,
}

impl PlanRequest {
    pub fn from_json(source: &str) -> Result<Self, PlanError> {
        serde_json::from_str(source).map_err(|e| PlanError::Request(e.to_string()))
    }

    /// Resolve names against `game_data` and build the planner.
    pub fn to_planner(&self, game_data: &GameData) -> Result<ProductionPlanner, PlanError> {
        let item = |name: &str| game_data.item(name).ok_or_else(|| PlanError::UnknownItem(name.to_string()));

        let mut builder = ProductionPlanner::builder()
            .strict_max_ratio(self.strict_max_ratio)
            .composition(self.composition);
        if let Some(targets) = &self.targets {
            builder = builder.targets(targets.iter().copied());
        }

        for (name, rate) in &self.inputs {
            builder = builder.input(item(name.as_str())?, rate.clone());
        }
        for (name, output) in &self.outputs {
            builder = builder.output_requirement(
                item(name.as_str())?,
                OutputRequirement {
                    minimum: output.minimum.clone(),
                    maximize_weight: output.maximize.clone(),
                },
            );
        }

        match &self.recipes {
            Some(names) => {
                for name in names {
                    let recipe = game_data
                        .recipe(name)
                        .ok_or_else(|| PlanError::UnknownRecipe(name.clone()))?;
                    builder = builder.recipe(recipe);
                }
            }
            None => builder = builder.recipes(game_data.recipes()),
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamedata::{Building, Item, RecipeSpec};

    fn data() -> GameData {
        let mut builder = GameData::builder();
        builder.add_item(Item::new("ore")).unwrap();
        builder.add_item(Item::new("ingot")).unwrap();
        builder.add_building(Building::new("smelter", 4)).unwrap();
        builder
            .add_recipe(RecipeSpec::new("ingot", "smelter", 2).ingredient("ore", 1).product("ingot", 1))
            .unwrap();
        builder
            .add_recipe(RecipeSpec::new("ingot_fast", "smelter", 1).ingredient("ore", 1).product("ingot", 1))
            .unwrap();
        builder.build()
    }

    #[test]
    fn test_parse_and_resolve() {
        let data = data();
        let request = PlanRequest::from_json(
            r#"{
                "inputs": { "ore": "45/2" },
                "outputs": { "ingot": { "minimum": "10", "maximize": "1" } },
                "recipes": ["ingot"],
                "targets": ["maximize-output-items", "minimize-buildings"],
                "composition": { "mode": "magnitude-weighted", "orders_of_magnitude": 4 }
            }"#,
        )
        .unwrap();
        let planner = request.to_planner(&data).unwrap();
        let ore = data.item("ore").unwrap();
        let ingot = data.item("ingot").unwrap();

        assert_eq!(planner.inputs()[ore], Rational::new(45, 2).unwrap());
        assert_eq!(planner.outputs()[ingot].minimum, Rational::from(10));
        assert!(planner.outputs()[ingot].is_maximized());
        assert_eq!(planner.recipes().len(), 1);
        assert_eq!(
            planner.targets(),
            &[OptimizationTarget::MaximizeOutputItems, OptimizationTarget::MinimizeBuildings]
        );
        assert_eq!(
            planner.composition(),
            ObjectiveComposition::MagnitudeWeighted { orders_of_magnitude: 4 }
        );
    }

    #[test]
    fn test_defaults() {
        let data = data();
        let planner = PlanRequest::from_json("{}").unwrap().to_planner(&data).unwrap();
        assert_eq!(planner.recipes().len(), 2);
        assert_eq!(planner.targets(), OptimizationTarget::defaults().as_slice());
        assert_eq!(planner.composition(), ObjectiveComposition::Lexicographic);
    }

    #[test]
    fn test_unknown_names() {
        let data = data();
        let request = PlanRequest::from_json(r#"{ "inputs": { "coal": "1" } }"#).unwrap();
        assert_eq!(request.to_planner(&data).err(), Some(PlanError::UnknownItem("coal".to_string())));

        let request = PlanRequest::from_json(r#"{ "recipes": ["steel"] }"#).unwrap();
        assert_eq!(request.to_planner(&data).err(), Some(PlanError::UnknownRecipe("steel".to_string())));
    }

    #[test]
    fn test_floats_are_rejected() {
        assert!(matches!(
            PlanRequest::from_json(r#"{ "inputs": { "ore": 0.1 } }"#),
            Err(PlanError::Request(_))
        ));
    }
}
