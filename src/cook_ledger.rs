//! Per-user cook counters for recipes
//!
//! A count only ever goes up. The public count is derived by summing every
//! user's count; it is never stored.

use std::sync::Arc;

use tracing::info;

use crate::errors::{GroceryError, Result};
use crate::model::{RecipeId, UserId};
use crate::store::GroceryStore;

#[derive(Clone)]
pub struct CookLedger {
    store: Arc<dyn GroceryStore>,
}

impl CookLedger {
    pub fn new(store: Arc<dyn GroceryStore>) -> Self {
        Self { store }
    }

    /// Count one cook of `recipe_id` by `user_id`, returning the new count
    ///
    /// Inventory is left untouched; `Inventory::consume_for_recipe` records
    /// the cook together with the decrements.
    pub async fn record_cook(&self, user_id: UserId, recipe_id: RecipeId) -> Result<i64> {
        if self.store.find_recipe(recipe_id).await?.is_none() {
            return Err(GroceryError::NotFound(format!("recipe {recipe_id}")));
        }
        let count = self.store.increment_cook_count(user_id, recipe_id).await?;
        info!(user_id, recipe_id, count, "Cook recorded");
        Ok(count)
    }

    /// Total cooks across all users, 0 if nobody cooked it
    pub async fn public_count(&self, recipe_id: RecipeId) -> Result<i64> {
        self.store.total_cook_count(recipe_id).await
    }

    /// The user's own count, 0 if they never cooked it
    pub async fn user_count(&self, user_id: UserId, recipe_id: RecipeId) -> Result<i64> {
        self.store.cook_count(user_id, recipe_id).await
    }
}
