//! Default grocery types, starter catalog items and sample recipes
//!
//! Seeding is idempotent: types and items are looked up before insert, and a
//! sample recipe is skipped when a recipe with the same name exists.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::{Catalog, FALLBACK_TYPE_SORT_ORDER};
use crate::errors::Result;
use crate::model::{NewIngredient, NewRecipe, FALLBACK_TYPE};
use crate::recipes::Recipes;
use crate::store::GroceryStore;

/// Grocery types with their display sort order
pub const GROCERY_TYPES: &[(&str, i32)] = &[
    ("Vegetables", 10),
    ("Fruits", 20),
    ("Dairy & Eggs", 30),
    ("Meat & Seafood", 40),
    ("Bakery", 50),
    ("Pantry", 60),
    ("Spices & Condiments", 70),
    ("Beverages", 80),
    (FALLBACK_TYPE, FALLBACK_TYPE_SORT_ORDER),
];

struct StarterItem {
    name: &'static str,
    grocery_type: &'static str,
    default_unit: &'static str,
    aliases: &'static [&'static str],
}

const STARTER_ITEMS: &[StarterItem] = &[
    StarterItem {
        name: "Eggs",
        grocery_type: "Dairy & Eggs",
        default_unit: "items",
        aliases: &["egg"],
    },
    StarterItem {
        name: "Butter",
        grocery_type: "Dairy & Eggs",
        default_unit: "g",
        aliases: &["unsalted butter"],
    },
    StarterItem {
        name: "Salt",
        grocery_type: "Spices & Condiments",
        default_unit: "g",
        aliases: &["sea salt", "table salt"],
    },
    StarterItem {
        name: "Pasta",
        grocery_type: "Pantry",
        default_unit: "g",
        aliases: &["spaghetti", "penne"],
    },
    StarterItem {
        name: "Tomatoes",
        grocery_type: "Vegetables",
        default_unit: "items",
        aliases: &["tomato"],
    },
    StarterItem {
        name: "Garlic",
        grocery_type: "Vegetables",
        default_unit: "cloves",
        aliases: &["garlic clove"],
    },
    StarterItem {
        name: "Olive oil",
        grocery_type: "Pantry",
        default_unit: "ml",
        aliases: &["extra virgin olive oil", "evoo"],
    },
    StarterItem {
        name: "Lettuce",
        grocery_type: "Vegetables",
        default_unit: "items",
        aliases: &["romaine"],
    },
    StarterItem {
        name: "Cucumber",
        grocery_type: "Vegetables",
        default_unit: "items",
        aliases: &["cucumbers"],
    },
    StarterItem {
        name: "Milk",
        grocery_type: "Dairy & Eggs",
        default_unit: "ml",
        aliases: &["whole milk"],
    },
    StarterItem {
        name: "Cereal",
        grocery_type: "Pantry",
        default_unit: "g",
        aliases: &[],
    },
    StarterItem {
        name: "Bread",
        grocery_type: "Bakery",
        default_unit: "items",
        aliases: &["loaf"],
    },
];

struct SampleRecipe {
    name: &'static str,
    description: &'static str,
    ingredients: &'static [(&'static str, f64, &'static str)],
}

const SAMPLE_RECIPES: &[SampleRecipe] = &[
    SampleRecipe {
        name: "Scrambled Eggs",
        description: "Simple fluffy scrambled eggs",
        ingredients: &[("eggs", 2.0, ""), ("butter", 1.0, "tbsp"), ("salt", 1.0, "pinch")],
    },
    SampleRecipe {
        name: "Tomato Pasta",
        description: "Quick pasta with tomato sauce",
        ingredients: &[
            ("pasta", 200.0, "g"),
            ("tomatoes", 2.0, ""),
            ("garlic", 2.0, "cloves"),
            ("olive oil", 2.0, "tbsp"),
            ("salt", 1.0, "pinch"),
        ],
    },
    SampleRecipe {
        name: "Green Salad",
        description: "Fresh salad with olive oil dressing",
        ingredients: &[
            ("lettuce", 1.0, "head"),
            ("tomatoes", 2.0, ""),
            ("cucumber", 0.5, ""),
            ("olive oil", 2.0, "tbsp"),
            ("salt", 1.0, "pinch"),
        ],
    },
    SampleRecipe {
        name: "Milk and Cereal",
        description: "Classic breakfast",
        ingredients: &[("milk", 1.0, "cup"), ("cereal", 1.0, "bowl")],
    },
    SampleRecipe {
        name: "Garlic Bread",
        description: "Toasted bread with garlic butter",
        ingredients: &[
            ("bread", 4.0, "slices"),
            ("butter", 2.0, "tbsp"),
            ("garlic", 2.0, "cloves"),
        ],
    },
];

/// What a seeding run touched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub grocery_types: usize,
    pub items: usize,
    pub recipes_created: usize,
}

/// Seed types, starter items and sample recipes
pub async fn seed_defaults(store: Arc<dyn GroceryStore>) -> Result<SeedSummary> {
    let catalog = Catalog::new(store.clone());
    let recipes = Recipes::new(store.clone(), catalog.clone());
    let mut summary = SeedSummary::default();

    for (name, sort_order) in GROCERY_TYPES {
        store.ensure_grocery_type(name, *sort_order).await?;
        summary.grocery_types += 1;
    }

    for starter in STARTER_ITEMS {
        let grocery_type = store
            .ensure_grocery_type(starter.grocery_type, type_sort_order(starter.grocery_type))
            .await?;
        catalog
            .register(starter.name, &grocery_type, starter.default_unit, starter.aliases)
            .await?;
        summary.items += 1;
    }

    for sample in SAMPLE_RECIPES {
        if store.find_recipe_by_name(sample.name).await?.is_some() {
            debug!(name = sample.name, "Sample recipe already present");
            continue;
        }
        let recipe = NewRecipe {
            name: sample.name.to_string(),
            description: Some(sample.description.to_string()),
            image_url: None,
            ingredients: sample
                .ingredients
                .iter()
                .map(|(name, quantity, unit)| NewIngredient {
                    grocery_item_id: None,
                    name: Some(name.to_string()),
                    quantity: *quantity,
                    unit: Some(unit.to_string()),
                })
                .collect(),
        };
        recipes.create_recipe(None, recipe).await?;
        summary.recipes_created += 1;
    }

    info!(
        backend = store.backend_name(),
        grocery_types = summary.grocery_types,
        items = summary.items,
        recipes_created = summary.recipes_created,
        "Seed complete"
    );
    Ok(summary)
}

fn type_sort_order(name: &str) -> i32 {
    GROCERY_TYPES
        .iter()
        .find(|(type_name, _)| *type_name == name)
        .map(|(_, order)| *order)
        .unwrap_or(FALLBACK_TYPE_SORT_ORDER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starter_items_use_known_types() {
        for item in STARTER_ITEMS {
            assert!(
                GROCERY_TYPES.iter().any(|(name, _)| *name == item.grocery_type),
                "{} has unknown type {}",
                item.name,
                item.grocery_type
            );
        }
    }

    #[test]
    fn test_type_sort_order() {
        assert_eq!(type_sort_order("Vegetables"), 10);
        assert_eq!(type_sort_order("Unknown"), FALLBACK_TYPE_SORT_ORDER);
    }

    #[test]
    fn test_fallback_type_sorts_last() {
        let max = GROCERY_TYPES.iter().map(|(_, order)| *order).max();
        assert_eq!(max, Some(FALLBACK_TYPE_SORT_ORDER));
    }
}
