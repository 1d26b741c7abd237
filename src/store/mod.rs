//! Persistence seam for the grocery services
//!
//! The services own every rule (normalization, validation, clamping, ranking);
//! a store only reads and writes rows. Two backends implement [`GroceryStore`]:
//! [`MemoryStore`] for tests and throwaway sessions, and [`PgStore`] for
//! PostgreSQL.
//!
//! # Atomicity
//!
//! Each trait call is atomic on its own. Calls that span several rows
//! ([`GroceryStore::merge_grocery`], [`GroceryStore::apply_consumption`],
//! [`GroceryStore::insert_recipe`], [`GroceryStore::replace_recipe`]) run as one
//! unit of work. Nothing is atomic across calls: two requests editing the same
//! row race, and the last write wins.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::errors::Result;
use crate::model::{
    Decrement, Grocery, GroceryEntry, GroceryId, GroceryItem, GroceryItemId, GroceryItemSummary,
    GroceryRow, GroceryType, GroceryTypeId, IngredientLine, MergeOutcome, NewCatalogItem, Post,
    PostId, PostRow, Recipe, RecipeId, RecipeRow, RecipeWithIngredients, UserId,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait GroceryStore: Send + Sync {
    /// Insert the type if its name is new, otherwise return the existing one
    async fn ensure_grocery_type(&self, name: &str, sort_order: i32) -> Result<GroceryType>;

    async fn find_grocery_type_by_name(&self, name: &str) -> Result<Option<GroceryType>>;

    /// Case-insensitive exact match on the canonical name
    async fn find_item_by_name(&self, name: &str) -> Result<Option<GroceryItem>>;

    /// Case-insensitive exact match on an alias
    async fn find_item_by_alias(&self, alias: &str) -> Result<Option<GroceryItem>>;

    async fn find_item_by_id(&self, id: GroceryItemId) -> Result<Option<GroceryItem>>;

    /// Insert a catalog item
    ///
    /// Returns `None` when another item already holds the name
    /// (case-insensitively); the caller re-queries to find the winner.
    async fn insert_item(&self, item: NewCatalogItem) -> Result<Option<GroceryItem>>;

    /// Record an extra alias for an item; existing aliases are left alone
    async fn add_alias(&self, item_id: GroceryItemId, alias: &str) -> Result<()>;

    /// Substring match on name or any alias, ordered by (type sort order, name)
    async fn search_items(
        &self,
        text: Option<&str>,
        grocery_type_id: Option<GroceryTypeId>,
        limit: usize,
    ) -> Result<Vec<GroceryItemSummary>>;

    async fn insert_grocery(&self, row: GroceryRow) -> Result<Grocery>;

    /// Row `grocery_id` if it belongs to `user_id`
    async fn find_grocery(
        &self,
        user_id: UserId,
        grocery_id: GroceryId,
    ) -> Result<Option<Grocery>>;

    /// Overwrite unit, quantity and threshold; returns rows affected
    async fn update_grocery(
        &self,
        user_id: UserId,
        grocery_id: GroceryId,
        unit: &str,
        quantity: f64,
        low_threshold: f64,
    ) -> Result<u64>;

    /// Returns rows affected
    async fn delete_grocery(&self, user_id: UserId, grocery_id: GroceryId) -> Result<u64>;

    /// Add `delta` to the quantity, floored at zero
    async fn adjust_grocery_quantity(
        &self,
        user_id: UserId,
        grocery_id: GroceryId,
        delta: f64,
    ) -> Result<Option<Grocery>>;

    /// Increment the user's first row for the item, or create one
    async fn merge_grocery(
        &self,
        user_id: UserId,
        grocery_item_id: GroceryItemId,
        quantity: f64,
        unit: &str,
    ) -> Result<MergeOutcome>;

    /// The user's rows joined with catalog names, ordered by item name
    async fn list_groceries(&self, user_id: UserId) -> Result<Vec<GroceryEntry>>;

    /// First row (lowest id) per catalog item the user stocks, any quantity
    async fn groceries_by_item(&self, user_id: UserId) -> Result<Vec<Grocery>>;

    async fn insert_recipe(&self, recipe: RecipeRow) -> Result<Recipe>;

    /// Replace fields and the whole ingredient list; `None` if missing
    async fn replace_recipe(
        &self,
        recipe_id: RecipeId,
        recipe: RecipeRow,
    ) -> Result<Option<Recipe>>;

    async fn find_recipe(&self, recipe_id: RecipeId) -> Result<Option<Recipe>>;

    async fn find_recipe_by_name(&self, name: &str) -> Result<Option<Recipe>>;

    /// Ingredient lines in insertion order
    async fn recipe_ingredients(&self, recipe_id: RecipeId) -> Result<Vec<IngredientLine>>;

    /// Every recipe, newest first, with ingredients and one referencing post
    async fn recipes_with_ingredients(&self) -> Result<Vec<RecipeWithIngredients>>;

    async fn insert_post(&self, post: PostRow) -> Result<Post>;

    async fn find_post(&self, post_id: PostId) -> Result<Option<Post>>;

    /// Overwrite title, content, kind and recipe link if `post.author_id`
    /// wrote the post; `None` otherwise
    async fn update_post(&self, post_id: PostId, post: PostRow) -> Result<Option<Post>>;

    /// Delete the post if `author_id` wrote it; returns rows affected
    async fn delete_post(&self, author_id: UserId, post_id: PostId) -> Result<u64>;

    /// Decrement rows (floored at zero) and bump the cook count in one unit of work
    ///
    /// Returns the updated rows in request order and the new cook count.
    async fn apply_consumption(
        &self,
        user_id: UserId,
        recipe_id: RecipeId,
        decrements: &[Decrement],
    ) -> Result<(Vec<Grocery>, i64)>;

    /// Create the ledger entry at 1 or increment it; returns the new count
    async fn increment_cook_count(&self, user_id: UserId, recipe_id: RecipeId) -> Result<i64>;

    async fn cook_count(&self, user_id: UserId, recipe_id: RecipeId) -> Result<i64>;

    /// Sum over all users
    async fn total_cook_count(&self, recipe_id: RecipeId) -> Result<i64>;

    fn backend_name(&self) -> &'static str;
}

/// Apply a signed change to a quantity without going below zero
pub(crate) fn floor_at_zero(quantity: f64, delta: f64) -> f64 {
    (quantity + delta).max(0.0)
}
