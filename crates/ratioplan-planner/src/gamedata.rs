use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use ratioplan_solver::Rational;

use crate::error::GameDataError;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatterState {
    #[default]
    Solid,
    Liquid,
    Gas,
}

/// An item, identified by its unique name.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Item {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub display_name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub form: MatterState,
    /// Points awarded per unit sunk
    #[cfg_attr(feature = "serde", serde(default))]
    pub sink_value: u64,
}

impl Item {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            form: MatterState::Solid,
            sink_value: 0,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_form(mut self, form: MatterState) -> Self {
        self.form = form;
        self
    }

    pub fn with_sink_value(mut self, sink_value: u64) -> Self {
        self.sink_value = sink_value;
        self
    }

    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Building {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub display_name: Option<String>,
    /// Power draw in MW
    #[cfg_attr(feature = "serde", serde(default))]
    pub power_mw: Rational,
}

impl Building {
    pub fn new(name: impl Into<String>, power_mw: impl Into<Rational>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            power_mw: power_mw.into(),
        }
    }
}

/// Recipe as written in a game data document, with items and buildings referenced by name.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct RecipeSpec {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub display_name: Option<String>,
    pub building: String,
    pub cycle_seconds: Rational,
    #[cfg_attr(feature = "serde", serde(default))]
    pub ingredients: Vec<(String, Rational)>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub products: Vec<(String, Rational)>,
    /// Minimum and maximum MW for buildings with a varying power curve
    #[cfg_attr(feature = "serde", serde(default))]
    pub variable_power: Option<(Rational, Rational)>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub alternate: bool,
}

impl RecipeSpec {
    pub fn new(name: impl Into<String>, building: impl Into<String>, cycle_seconds: impl Into<Rational>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            building: building.into(),
            cycle_seconds: cycle_seconds.into(),
            ingredients: Vec::new(),
            products: Vec::new(),
            variable_power: None,
            alternate: false,
        }
    }

    pub fn ingredient(mut self, item: impl Into<String>, amount: impl Into<Rational>) -> Self {
        self.ingredients.push((item.into(), amount.into()));
        self
    }

    pub fn product(mut self, item: impl Into<String>, amount: impl Into<Rational>) -> Self {
        self.products.push((item.into(), amount.into()));
        self
    }

    pub fn variable_power(mut self, min_mw: impl Into<Rational>, max_mw: impl Into<Rational>) -> Self {
        self.variable_power = Some((min_mw.into(), max_mw.into()));
        self
    }

    pub fn alternate(mut self) -> Self {
        self.alternate = true;
        self
    }
}

/// A resolved recipe with per-minute rates.
#[derive(Debug, Clone)]
pub struct Recipe {
    name: String,
    display_name: Option<String>,
    building: Arc<Building>,
    cycle_seconds: Rational,
    ingredients: BTreeMap<Arc<Item>, Rational>,
    products: BTreeMap<Arc<Item>, Rational>,
    variable_power: Option<(Rational, Rational)>,
    alternate: bool,
}

impl Recipe {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn building(&self) -> &Arc<Building> {
        &self.building
    }

    pub fn cycle_seconds(&self) -> &Rational {
        &self.cycle_seconds
    }

    pub fn is_alternate(&self) -> bool {
        self.alternate
    }

    /// Ingredients consumed per minute by one building running this recipe
    pub fn ingredients(&self) -> &BTreeMap<Arc<Item>, Rational> {
        &self.ingredients
    }

    /// Products made per minute by one building running this recipe
    pub fn products(&self) -> &BTreeMap<Arc<Item>, Rational> {
        &self.products
    }

    pub fn consumed_per_minute(&self, item: &Item) -> Rational {
        self.ingredients.get(item).cloned().unwrap_or_default()
    }

    pub fn produced_per_minute(&self, item: &Item) -> Rational {
        self.products.get(item).cloned().unwrap_or_default()
    }

    pub fn produces(&self, item: &Item) -> bool {
        self.products.contains_key(item)
    }

    /// Average MW draw of one building running this recipe.
    pub fn average_power_mw(&self) -> Rational {
        match &self.variable_power {
            Some((min, max)) => ((min + max) / Rational::from(2)).simplify(),
            None => self.building.power_mw.clone(),
        }
    }
}

macro_rules! identity_by_name {
    ($($t:ty),*) => {
        $(
            impl PartialEq for $t {
                fn eq(&self, other: &Self) -> bool {
                    self.name == other.name
                }
            }

            impl Eq for $t {}

            impl PartialOrd for $t {
                fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                    Some(self.cmp(other))
                }
            }

            impl Ord for $t {
                fn cmp(&self, other: &Self) -> Ordering {
                    self.name.cmp(&other.name)
                }
            }

            impl Hash for $t {
                fn hash<H: Hasher>(&self, state: &mut H) {
                    self.name.hash(state);
                }
            }
        )*
    };
}

identity_by_name!(Item, Building, Recipe);

/// Serialized form of [`GameData`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct GameDataDocument {
    #[cfg_attr(feature = "serde", serde(default))]
    pub items: Vec<Item>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub buildings: Vec<Building>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub recipes: Vec<RecipeSpec>,
    /// Extraction cap per raw resource, in items per minute
    #[cfg_attr(feature = "serde", serde(default))]
    pub resource_caps: BTreeMap<String, Rational>,
}

/// Immutable catalogue of items, buildings, recipes and raw resource caps.
#[derive(Debug, Clone, Default)]
pub struct GameData {
    items: BTreeMap<String, Arc<Item>>,
    buildings: BTreeMap<String, Arc<Building>>,
    recipes: BTreeMap<String, Arc<Recipe>>,
    resource_caps: BTreeMap<Arc<Item>, Rational>,
}

impl GameData {
    pub fn builder() -> GameDataBuilder {
        GameDataBuilder::default()
    }

    pub fn from_document(document: GameDataDocument) -> Result<Self, GameDataError> {
        let mut builder = GameDataBuilder::default();
        for item in document.items {
            builder.add_item(item)?;
        }
        for building in document.buildings {
            builder.add_building(building)?;
        }
        for recipe in document.recipes {
            builder.add_recipe(recipe)?;
        }
        for (item, cap) in document.resource_caps {
            builder.add_resource_cap(&item, cap)?;
        }
        Ok(builder.build())
    }

    #[cfg(feature = "serde")]
    pub fn from_json(source: &str) -> Result<Self, GameDataError> {
        let document: GameDataDocument =
            serde_json::from_str(source).map_err(|e| GameDataError::Document(e.to_string()))?;
        Self::from_document(document)
    }

    pub fn item(&self, name: &str) -> Option<&Arc<Item>> {
        self.items.get(name)
    }

    pub fn building(&self, name: &str) -> Option<&Arc<Building>> {
        self.buildings.get(name)
    }

    pub fn recipe(&self, name: &str) -> Option<&Arc<Recipe>> {
        self.recipes.get(name)
    }

    pub fn items(&self) -> impl Iterator<Item = &Arc<Item>> {
        self.items.values()
    }

    pub fn buildings(&self) -> impl Iterator<Item = &Arc<Building>> {
        self.buildings.values()
    }

    pub fn recipes(&self) -> impl Iterator<Item = &Arc<Recipe>> {
        self.recipes.values()
    }

    pub fn is_raw_resource(&self, item: &Item) -> bool {
        self.resource_caps.contains_key(item)
    }

    /// Raw resources with their maximum extraction rate per minute
    pub fn resource_caps(&self) -> &BTreeMap<Arc<Item>, Rational> {
        &self.resource_caps
    }

    pub fn extraction_cap(&self, item: &Item) -> Option<&Rational> {
        self.resource_caps.get(item)
    }
}

#[derive(Debug, Default)]
pub struct GameDataBuilder {
    data: GameData,
}

impl GameDataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&mut self, item: Item) -> Result<&mut Self, GameDataError> {
        if self.data.items.contains_key(&item.name) {
            return Err(GameDataError::DuplicateItem(item.name));
        }
        self.data.items.insert(item.name.clone(), Arc::new(item));
        Ok(self)
    }

    pub fn add_building(&mut self, building: Building) -> Result<&mut Self, GameDataError> {
        if self.data.buildings.contains_key(&building.name) {
            return Err(GameDataError::DuplicateBuilding(building.name));
        }
        self.data.buildings.insert(building.name.clone(), Arc::new(building));
        Ok(self)
    }

    /// Resolve a recipe's references and convert its amounts to per-minute rates.
    pub fn add_recipe(&mut self, spec: RecipeSpec) -> Result<&mut Self, GameDataError> {
        if self.data.recipes.contains_key(&spec.name) {
            return Err(GameDataError::DuplicateRecipe(spec.name));
        }
        if !spec.cycle_seconds.is_positive() {
            return Err(GameDataError::InvalidCycleTime(spec.name));
        }
        let building = self
            .data
            .buildings
            .get(&spec.building)
            .cloned()
            .ok_or_else(|| GameDataError::UnknownBuilding {
                building: spec.building.clone(),
                recipe: spec.name.clone(),
            })?;

        let per_minute = |amounts: &[(String, Rational)]| -> Result<BTreeMap<Arc<Item>, Rational>, GameDataError> {
            let mut rates: BTreeMap<Arc<Item>, Rational> = BTreeMap::new();
            for (name, amount) in amounts {
                let item = self.data.items.get(name).cloned().ok_or_else(|| GameDataError::UnknownItem {
                    item: name.clone(),
                    context: format!("recipe {}", spec.name),
                })?;
                if !amount.is_positive() {
                    return Err(GameDataError::InvalidAmount {
                        context: format!("recipe {}", spec.name),
                        message: format!("{name} amount must be positive, got {amount}"),
                    });
                }
                let rate = (amount * Rational::from(60))
                    .checked_div(&spec.cycle_seconds)
                    .map_err(|e| GameDataError::InvalidAmount {
                        context: format!("recipe {}", spec.name),
                        message: e.to_string(),
                    })?
                    .simplify();
                let entry = rates.entry(item).or_default();
                *entry = (&*entry + &rate).simplify();
            }
            Ok(rates)
        };
        let ingredients = per_minute(&spec.ingredients)?;
        let products = per_minute(&spec.products)?;

        let recipe = Recipe {
            name: spec.name.clone(),
            display_name: spec.display_name,
            building,
            cycle_seconds: spec.cycle_seconds,
            ingredients,
            products,
            variable_power: spec.variable_power,
            alternate: spec.alternate,
        };
        self.data.recipes.insert(spec.name, Arc::new(recipe));
        Ok(self)
    }

    pub fn add_resource_cap(&mut self, item: &str, cap: impl Into<Rational>) -> Result<&mut Self, GameDataError> {
        let cap = cap.into();
        let resolved = self
            .data
            .items
            .get(item)
            .cloned()
            .ok_or_else(|| GameDataError::UnknownItem {
                item: item.to_string(),
                context: "resource caps".to_string(),
            })?;
        if cap.is_negative() {
            return Err(GameDataError::InvalidAmount {
                context: "resource caps".to_string(),
                message: format!("{item} cap must not be negative, got {cap}"),
            });
        }
        self.data.resource_caps.insert(resolved, cap);
        Ok(self)
    }

    pub fn build(self) -> GameData {
        self.data
    }
}
