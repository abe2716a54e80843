//! Reachability pruning over the recipe/item graph.
//!
//! Both searches run to a fixed point, so the result does not depend on the
//! order recipes are supplied in.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use crate::gamedata::{Item, Recipe};

/// Recipes that (transitively) produce one of `needed`.
///
/// Starting from the needed items, every recipe producing a needed item is
/// kept and its ingredients become needed in turn.
pub fn recipes_that_build_what_we_need<'a>(
    recipes: impl IntoIterator<Item = &'a Arc<Recipe>>,
    needed: &BTreeSet<Arc<Item>>,
) -> BTreeSet<Arc<Recipe>> {
    let mut producers: BTreeMap<&Arc<Item>, Vec<&Arc<Recipe>>> = BTreeMap::new();
    for recipe in recipes {
        for product in recipe.products().keys() {
            producers.entry(product).or_default().push(recipe);
        }
    }

    let mut needed = needed.clone();
    let mut queue: VecDeque<Arc<Item>> = needed.iter().cloned().collect();
    let mut selected = BTreeSet::new();

    while let Some(item) = queue.pop_front() {
        let Some(candidates) = producers.get(&item) else {
            continue;
        };
        for recipe in candidates {
            if !selected.insert(Arc::clone(recipe)) {
                continue;
            }
            for ingredient in recipe.ingredients().keys() {
                if needed.insert(Arc::clone(ingredient)) {
                    queue.push_back(Arc::clone(ingredient));
                }
            }
        }
    }

    selected
}

/// Recipes sharing one ingredient set, and the ingredients still unavailable
struct PendingGroup {
    recipes: Vec<Arc<Recipe>>,
    unresolved: BTreeSet<Arc<Item>>,
}

/// Recipes whose ingredients can all be obtained from `available` items,
/// directly or through other buildable recipes.
///
/// Recipes are grouped by ingredient set. Each item keeps the list of groups
/// waiting on it, so a newly available item only touches those groups.
pub fn recipes_we_can_build<'a>(
    recipes: impl IntoIterator<Item = &'a Arc<Recipe>>,
    available: &BTreeSet<Arc<Item>>,
) -> BTreeSet<Arc<Recipe>> {
    let mut by_ingredients: BTreeMap<BTreeSet<Arc<Item>>, Vec<Arc<Recipe>>> = BTreeMap::new();
    for recipe in recipes {
        let ingredients = recipe.ingredients().keys().cloned().collect();
        by_ingredients.entry(ingredients).or_default().push(Arc::clone(recipe));
    }

    let mut available = available.clone();
    let mut groups = Vec::with_capacity(by_ingredients.len());
    let mut waiting: BTreeMap<Arc<Item>, Vec<usize>> = BTreeMap::new();
    let mut ready = VecDeque::new();

    for (ingredients, recipes) in by_ingredients {
        let unresolved: BTreeSet<Arc<Item>> = ingredients.difference(&available).cloned().collect();
        let index = groups.len();
        if unresolved.is_empty() {
            ready.push_back(index);
        }
        for item in &unresolved {
            waiting.entry(Arc::clone(item)).or_default().push(index);
        }
        groups.push(PendingGroup { recipes, unresolved });
    }

    let mut buildable = BTreeSet::new();
    while let Some(index) = ready.pop_front() {
        for recipe in std::mem::take(&mut groups[index].recipes) {
            for product in recipe.products().keys() {
                if !available.insert(Arc::clone(product)) {
                    continue;
                }
                for waiter in waiting.remove(product).unwrap_or_default() {
                    let group = &mut groups[waiter];
                    group.unresolved.remove(product);
                    if group.unresolved.is_empty() {
                        ready.push_back(waiter);
                    }
                }
            }
            buildable.insert(recipe);
        }
    }

    buildable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamedata::{Building, GameData, RecipeSpec};

    fn chain() -> GameData {
        let mut builder = GameData::builder();
        for name in ["ore", "ingot", "plate", "screw", "frame", "slag", "water"] {
            builder.add_item(Item::new(name)).unwrap();
        }
        builder.add_building(Building::new("machine", 4)).unwrap();
        let recipes = [
            RecipeSpec::new("smelt", "machine", 2).ingredient("ore", 1).product("ingot", 1).product("slag", 1),
            RecipeSpec::new("press", "machine", 6).ingredient("ingot", 3).product("plate", 2),
            RecipeSpec::new("cut", "machine", 6).ingredient("ingot", 1).product("screw", 4),
            RecipeSpec::new("frame", "machine", 10).ingredient("plate", 2).ingredient("screw", 8).product("frame", 1),
            RecipeSpec::new("pump", "machine", 1).product("water", 2),
            // needs water, which only the pump makes
            RecipeSpec::new("wash", "machine", 4).ingredient("slag", 1).ingredient("water", 1).product("ore", 1),
        ];
        for recipe in recipes {
            builder.add_recipe(recipe).unwrap();
        }
        builder.build()
    }

    fn items(data: &GameData, names: &[&str]) -> BTreeSet<Arc<Item>> {
        names.iter().map(|n| Arc::clone(data.item(n).unwrap())).collect()
    }

    fn names(recipes: &BTreeSet<Arc<Recipe>>) -> Vec<&str> {
        recipes.iter().map(|r| r.name()).collect()
    }

    #[test]
    fn test_backward_follows_ingredients() {
        let data = chain();
        let needed = recipes_that_build_what_we_need(data.recipes(), &items(&data, &["plate"]));
        // plate <- ingot <- ore <- (slag, water) <- smelt, pump
        assert_eq!(names(&needed), vec!["press", "pump", "smelt", "wash"]);
    }

    #[test]
    fn test_backward_ignores_unrelated_outputs() {
        let data = chain();
        let needed = recipes_that_build_what_we_need(data.recipes(), &items(&data, &["water"]));
        assert_eq!(names(&needed), vec!["pump"]);
        assert!(recipes_that_build_what_we_need(data.recipes(), &BTreeSet::new()).is_empty());
    }

    #[test]
    fn test_forward_unlocks_transitively() {
        let data = chain();
        let buildable = recipes_we_can_build(data.recipes(), &items(&data, &["ore"]));
        assert_eq!(names(&buildable), vec!["cut", "frame", "press", "pump", "smelt", "wash"]);
    }

    #[test]
    fn test_forward_blocks_missing_ingredients() {
        let data = chain();
        let buildable = recipes_we_can_build(data.recipes(), &BTreeSet::new());
        // smelting never starts without ore; the pump needs nothing and wash
        // still lacks slag
        assert_eq!(names(&buildable), vec!["pump"]);
    }

    #[test]
    fn test_order_independence() {
        let data = chain();
        let forward: Vec<Arc<Recipe>> = data.recipes().cloned().collect();
        let backward: Vec<Arc<Recipe>> = forward.iter().rev().cloned().collect();
        let available = items(&data, &["ingot"]);
        assert_eq!(
            recipes_we_can_build(&forward, &available),
            recipes_we_can_build(&backward, &available)
        );
        let needed = items(&data, &["frame"]);
        assert_eq!(
            recipes_that_build_what_we_need(&forward, &needed),
            recipes_that_build_what_we_need(&backward, &needed)
        );
    }
}
