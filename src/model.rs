//! # Grocery Data Model
//!
//! This module defines the data structures shared by the catalog, the
//! per-user inventory, recipes and the recommendation engine.
//!
//! ## Core Concepts
//!
//! - **Catalog item** ([`GroceryItem`]): canonical, deduplicated grocery entity
//!   shared across all users and recipes, grouped by [`GroceryType`]
//! - **Inventory row** ([`Grocery`]): one user's tracked quantity of one catalog item
//! - **Recipe** ([`Recipe`]): an unordered set of ingredient lines referencing catalog items
//! - **Cook count**: how many times a user confirmed consuming a recipe's ingredients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type UserId = i64;
pub type GroceryTypeId = i64;
pub type GroceryItemId = i64;
pub type GroceryId = i64;
pub type RecipeId = i64;
pub type PostId = i64;

/// Unit given to inventory rows and catalog items when none is supplied
pub const DEFAULT_UNIT: &str = "items";

/// Grocery type that receives every item created from free text
pub const FALLBACK_TYPE: &str = "Other";

/// A named category of catalog items with a display sort order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroceryType {
    pub id: GroceryTypeId,
    pub name: String,
    pub sort_order: i32,
}

/// Canonical catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroceryItem {
    pub id: GroceryItemId,
    /// Display name, whitespace-normalized with a capitalized first letter
    pub name: String,
    pub default_unit: String,
    pub grocery_type_id: GroceryTypeId,
}

/// Catalog item joined with its type, as returned by search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroceryItemSummary {
    pub id: GroceryItemId,
    pub name: String,
    pub default_unit: String,
    pub grocery_type_id: GroceryTypeId,
    pub grocery_type_name: String,
}

/// Item names sharing one grocery type, used for picker sections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemGroup {
    pub group: String,
    pub items: Vec<String>,
}

/// Insert request for a catalog item
#[derive(Debug, Clone, PartialEq)]
pub struct NewCatalogItem {
    pub name: String,
    pub default_unit: String,
    pub grocery_type_id: GroceryTypeId,
    /// Normalized alternate spelling recorded alongside the item
    pub alias: Option<String>,
}

/// A single user's inventory row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Grocery {
    pub id: GroceryId,
    pub user_id: UserId,
    pub grocery_item_id: GroceryItemId,
    pub unit: String,
    pub quantity: f64,
    pub low_threshold: f64,
    pub updated_at: DateTime<Utc>,
}

/// Inventory row joined with its catalog item for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroceryEntry {
    pub id: GroceryId,
    pub grocery_item_id: GroceryItemId,
    pub name: String,
    pub grocery_type_name: String,
    pub unit: String,
    pub quantity: f64,
    pub low_threshold: f64,
}

impl GroceryEntry {
    /// Strictly below the threshold, so a zero threshold never alerts
    pub fn is_low_stock(&self) -> bool {
        self.quantity < self.low_threshold
    }
}

/// Fields of a new inventory row, as submitted by the add form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewGrocery {
    pub grocery_item_id: Option<GroceryItemId>,
    pub name: Option<String>,
    pub unit: Option<String>,
    pub quantity: Option<f64>,
    pub low_threshold: Option<f64>,
}

/// Replacement values for an existing inventory row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroceryUpdate {
    pub unit: Option<String>,
    pub quantity: f64,
    pub low_threshold: Option<f64>,
}

/// Store-level insert for an inventory row, defaults already applied
#[derive(Debug, Clone, PartialEq)]
pub struct GroceryRow {
    pub user_id: UserId,
    pub grocery_item_id: GroceryItemId,
    pub unit: String,
    pub quantity: f64,
    pub low_threshold: f64,
}

/// One parsed receipt line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub name: String,
    pub quantity: f64,
}

impl ReceiptItem {
    pub fn new(name: &str, quantity: f64) -> Self {
        Self {
            name: name.to_string(),
            quantity,
        }
    }
}

/// What happened to one receipt item during ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestStatus {
    /// A new inventory row was created
    Created { grocery_id: GroceryId },
    /// An existing row's quantity was incremented
    Merged { grocery_id: GroceryId },
    /// The item was skipped; the batch carried on
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub name: String,
    #[serde(flatten)]
    pub status: IngestStatus,
}

/// Aggregate result of a receipt ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Items created or merged
    pub added: usize,
    pub outcomes: Vec<IngestOutcome>,
}

impl IngestReport {
    pub fn skipped(&self) -> impl Iterator<Item = &IngestOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, IngestStatus::Skipped { .. }))
    }
}

/// Result of a single-item merge in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Created(GroceryId),
    Merged(GroceryId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Seeded recipes have no author
    pub author_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// A recipe ingredient joined with its catalog item name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct IngredientLine {
    pub grocery_item_id: GroceryItemId,
    pub name: String,
    /// Zero means "to taste"
    pub quantity: f64,
    pub unit: String,
}

/// Recipe with everything the recommender needs
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeWithIngredients {
    pub recipe: Recipe,
    pub ingredients: Vec<IngredientLine>,
    /// First post found that references the recipe
    pub post_id: Option<PostId>,
}

/// Store-level ingredient, already resolved to a catalog item
#[derive(Debug, Clone, PartialEq)]
pub struct StoredIngredient {
    pub grocery_item_id: GroceryItemId,
    pub quantity: f64,
    pub unit: String,
}

/// Store-level recipe insert or replacement
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeRow {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub author_id: Option<UserId>,
    pub ingredients: Vec<StoredIngredient>,
}

/// Ingredient as written by a recipe author
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewIngredient {
    pub grocery_item_id: Option<GroceryItemId>,
    pub name: Option<String>,
    pub quantity: f64,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewRecipe {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub ingredients: Vec<NewIngredient>,
}

/// Recipe plus cook counts, as shown on a post page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDetail {
    pub recipe: Recipe,
    pub ingredients: Vec<IngredientLine>,
    pub public_cook_count: i64,
    pub user_cook_count: i64,
}

/// A recipe ranked against a user's inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeMatch {
    pub id: RecipeId,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub post_id: Option<PostId>,
    pub match_count: usize,
    pub total_ingredients: usize,
    pub match_percent: u32,
    /// Ingredient names the user does not stock, in recipe order
    pub missing_ingredients: Vec<String>,
}

/// An inventory row reduced while cooking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumedIngredient {
    pub grocery_id: GroceryId,
    pub name: String,
    pub amount: f64,
    pub remaining: f64,
}

/// Store-level decrement request for one row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decrement {
    pub grocery_id: GroceryId,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumeReport {
    pub recipe_id: RecipeId,
    pub consumed: Vec<ConsumedIngredient>,
    /// Ingredients the user does not stock
    pub not_stocked: Vec<String>,
    /// The user's cook count after this call
    pub cook_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Story,
    Recipe,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostKind::Story => "story",
            PostKind::Recipe => "recipe",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "story" => Some(PostKind::Story),
            "recipe" => Some(PostKind::Recipe),
            _ => None,
        }
    }
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub title: String,
    /// Rich-text body, already sanitized by the caller
    pub content: String,
    pub kind: PostKind,
    pub recipe_id: Option<RecipeId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub kind: PostKind,
    pub recipe: Option<NewRecipe>,
}

/// Edits to an existing post; `None` keeps the current value
///
/// A recipe replaces the linked recipe, or creates one when the post has none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub kind: Option<PostKind>,
    pub recipe: Option<NewRecipe>,
}

/// Store-level post insert or overwrite
#[derive(Debug, Clone, PartialEq)]
pub struct PostRow {
    pub author_id: UserId,
    pub title: String,
    pub content: String,
    pub kind: PostKind,
    pub recipe_id: Option<RecipeId>,
}
