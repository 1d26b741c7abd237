//! Recipe recommendations ranked by how much of each recipe the user stocks
//!
//! Matching is presence-only: an ingredient counts as matched when the user
//! has any inventory row for its catalog item, whatever the quantity (zero
//! included) and unit.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::errors::Result;
use crate::model::{GroceryItemId, RecipeMatch, RecipeWithIngredients, UserId};
use crate::store::GroceryStore;

/// Percentage of matched ingredients, rounded to the nearest integer
pub fn match_percent(match_count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((match_count as f64 / total as f64) * 100.0).round() as u32
}

/// Rank recipes against a set of owned catalog items
///
/// Recipes with no matched ingredient are dropped. The rest are sorted by
/// match percentage, highest first; ties keep the input order.
pub fn rank_recipes(
    owned: &HashSet<GroceryItemId>,
    recipes: Vec<RecipeWithIngredients>,
) -> Vec<RecipeMatch> {
    let mut matches: Vec<RecipeMatch> = recipes
        .into_iter()
        .filter_map(|entry| {
            let total_ingredients = entry.ingredients.len();
            let (owned_lines, missing): (Vec<_>, Vec<_>) = entry
                .ingredients
                .into_iter()
                .partition(|line| owned.contains(&line.grocery_item_id));
            let match_count = owned_lines.len();
            if match_count == 0 {
                return None;
            }
            Some(RecipeMatch {
                id: entry.recipe.id,
                name: entry.recipe.name,
                description: entry.recipe.description,
                image_url: entry.recipe.image_url,
                post_id: entry.post_id,
                match_count,
                total_ingredients,
                match_percent: match_percent(match_count, total_ingredients),
                missing_ingredients: missing.into_iter().map(|line| line.name).collect(),
            })
        })
        .collect();

    // sort_by is stable
    matches.sort_by(|a, b| b.match_percent.cmp(&a.match_percent));
    matches
}

#[derive(Clone)]
pub struct Recommender {
    store: Arc<dyn GroceryStore>,
}

impl Recommender {
    pub fn new(store: Arc<dyn GroceryStore>) -> Self {
        Self { store }
    }

    /// Every recipe sharing at least one ingredient with the user's inventory
    pub async fn recommend(&self, user_id: UserId) -> Result<Vec<RecipeMatch>> {
        let owned: HashSet<GroceryItemId> = self
            .store
            .groceries_by_item(user_id)
            .await?
            .into_iter()
            .map(|g| g.grocery_item_id)
            .collect();
        if owned.is_empty() {
            debug!(user_id, "Empty inventory, nothing to recommend");
            return Ok(Vec::new());
        }

        let recipes = self.store.recipes_with_ingredients().await?;
        let candidates = recipes.len();
        let ranked = rank_recipes(&owned, recipes);
        debug!(
            user_id,
            owned = owned.len(),
            candidates,
            matched = ranked.len(),
            "Ranked recipes"
        );
        Ok(ranked)
    }
}
