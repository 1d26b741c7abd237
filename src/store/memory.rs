//! In-memory store
//!
//! All state lives behind a single `tokio::sync::Mutex`, so every trait call
//! is atomic. Uniqueness rules match the PostgreSQL schema: type names are
//! unique, item names are unique case-insensitively, aliases are unique, and
//! the ledger is keyed by (user, recipe).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{floor_at_zero, GroceryStore};
use crate::errors::Result;
use crate::model::{
    Decrement, Grocery, GroceryEntry, GroceryId, GroceryItem, GroceryItemId, GroceryItemSummary,
    GroceryRow, GroceryType, GroceryTypeId, IngredientLine, MergeOutcome, NewCatalogItem, Post,
    PostId, PostRow, Recipe, RecipeId, RecipeRow, RecipeWithIngredients, StoredIngredient, UserId,
};

#[derive(Default)]
struct MemoryState {
    last_id: i64,
    types: Vec<GroceryType>,
    items: Vec<GroceryItem>,
    /// (lowercase alias, item)
    aliases: Vec<(String, GroceryItemId)>,
    groceries: Vec<Grocery>,
    recipes: Vec<Recipe>,
    ingredients: Vec<(RecipeId, StoredIngredient)>,
    posts: Vec<Post>,
    cook_counts: HashMap<(UserId, RecipeId), i64>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn item(&self, id: GroceryItemId) -> Option<&GroceryItem> {
        self.items.iter().find(|i| i.id == id)
    }

    fn item_name(&self, id: GroceryItemId) -> String {
        self.item(id).map(|i| i.name.clone()).unwrap_or_default()
    }

    fn type_of(&self, id: GroceryTypeId) -> Option<&GroceryType> {
        self.types.iter().find(|t| t.id == id)
    }

    fn grocery_mut(&mut self, user_id: UserId, grocery_id: GroceryId) -> Option<&mut Grocery> {
        self.groceries
            .iter_mut()
            .find(|g| g.id == grocery_id && g.user_id == user_id)
    }

    fn ingredient_lines(&self, recipe_id: RecipeId) -> Vec<IngredientLine> {
        self.ingredients
            .iter()
            .filter(|(r, _)| *r == recipe_id)
            .map(|(_, ing)| IngredientLine {
                grocery_item_id: ing.grocery_item_id,
                name: self.item_name(ing.grocery_item_id),
                quantity: ing.quantity,
                unit: ing.unit.clone(),
            })
            .collect()
    }

    fn bump_cook_count(&mut self, user_id: UserId, recipe_id: RecipeId) -> i64 {
        let count = self.cook_counts.entry((user_id, recipe_id)).or_insert(0);
        *count += 1;
        *count
    }
}

/// Store backed by process memory
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GroceryStore for MemoryStore {
    async fn ensure_grocery_type(&self, name: &str, sort_order: i32) -> Result<GroceryType> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.types.iter().find(|t| t.name == name) {
            return Ok(existing.clone());
        }
        let grocery_type = GroceryType {
            id: state.next_id(),
            name: name.to_string(),
            sort_order,
        };
        state.types.push(grocery_type.clone());
        Ok(grocery_type)
    }

    async fn find_grocery_type_by_name(&self, name: &str) -> Result<Option<GroceryType>> {
        let state = self.state.lock().await;
        Ok(state.types.iter().find(|t| t.name == name).cloned())
    }

    async fn find_item_by_name(&self, name: &str) -> Result<Option<GroceryItem>> {
        let state = self.state.lock().await;
        let wanted = name.to_lowercase();
        Ok(state
            .items
            .iter()
            .find(|i| i.name.to_lowercase() == wanted)
            .cloned())
    }

    async fn find_item_by_alias(&self, alias: &str) -> Result<Option<GroceryItem>> {
        let state = self.state.lock().await;
        let wanted = alias.to_lowercase();
        Ok(state
            .aliases
            .iter()
            .find(|(a, _)| *a == wanted)
            .and_then(|(_, item_id)| state.item(*item_id))
            .cloned())
    }

    async fn find_item_by_id(&self, id: GroceryItemId) -> Result<Option<GroceryItem>> {
        let state = self.state.lock().await;
        Ok(state.item(id).cloned())
    }

    async fn insert_item(&self, item: NewCatalogItem) -> Result<Option<GroceryItem>> {
        let mut state = self.state.lock().await;
        let lowered = item.name.to_lowercase();
        if state.items.iter().any(|i| i.name.to_lowercase() == lowered) {
            return Ok(None);
        }
        let created = GroceryItem {
            id: state.next_id(),
            name: item.name,
            default_unit: item.default_unit,
            grocery_type_id: item.grocery_type_id,
        };
        if let Some(alias) = item.alias {
            let alias = alias.to_lowercase();
            if !state.aliases.iter().any(|(a, _)| *a == alias) {
                state.aliases.push((alias, created.id));
            }
        }
        state.items.push(created.clone());
        Ok(Some(created))
    }

    async fn add_alias(&self, item_id: GroceryItemId, alias: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let alias = alias.to_lowercase();
        if !state.aliases.iter().any(|(a, _)| *a == alias) {
            state.aliases.push((alias, item_id));
        }
        Ok(())
    }

    async fn search_items(
        &self,
        text: Option<&str>,
        grocery_type_id: Option<GroceryTypeId>,
        limit: usize,
    ) -> Result<Vec<GroceryItemSummary>> {
        let state = self.state.lock().await;
        let needle = text.map(str::to_lowercase);

        let mut found: Vec<(i32, GroceryItemSummary)> = state
            .items
            .iter()
            .filter(|item| grocery_type_id.map_or(true, |t| item.grocery_type_id == t))
            .filter(|item| match &needle {
                None => true,
                Some(needle) => {
                    item.name.to_lowercase().contains(needle.as_str())
                        || state
                            .aliases
                            .iter()
                            .any(|(a, id)| *id == item.id && a.contains(needle.as_str()))
                }
            })
            .filter_map(|item| {
                let grocery_type = state.type_of(item.grocery_type_id)?;
                Some((
                    grocery_type.sort_order,
                    GroceryItemSummary {
                        id: item.id,
                        name: item.name.clone(),
                        default_unit: item.default_unit.clone(),
                        grocery_type_id: grocery_type.id,
                        grocery_type_name: grocery_type.name.clone(),
                    },
                ))
            })
            .collect();

        found.sort_by(|(a_order, a), (b_order, b)| {
            a_order.cmp(b_order).then_with(|| a.name.cmp(&b.name))
        });
        Ok(found.into_iter().take(limit).map(|(_, s)| s).collect())
    }

    async fn insert_grocery(&self, row: GroceryRow) -> Result<Grocery> {
        let mut state = self.state.lock().await;
        let grocery = Grocery {
            id: state.next_id(),
            user_id: row.user_id,
            grocery_item_id: row.grocery_item_id,
            unit: row.unit,
            quantity: row.quantity,
            low_threshold: row.low_threshold,
            updated_at: Utc::now(),
        };
        state.groceries.push(grocery.clone());
        Ok(grocery)
    }

    async fn find_grocery(
        &self,
        user_id: UserId,
        grocery_id: GroceryId,
    ) -> Result<Option<Grocery>> {
        let state = self.state.lock().await;
        Ok(state
            .groceries
            .iter()
            .find(|g| g.id == grocery_id && g.user_id == user_id)
            .cloned())
    }

    async fn update_grocery(
        &self,
        user_id: UserId,
        grocery_id: GroceryId,
        unit: &str,
        quantity: f64,
        low_threshold: f64,
    ) -> Result<u64> {
        let mut state = self.state.lock().await;
        match state.grocery_mut(user_id, grocery_id) {
            Some(grocery) => {
                grocery.unit = unit.to_string();
                grocery.quantity = quantity;
                grocery.low_threshold = low_threshold;
                grocery.updated_at = Utc::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_grocery(&self, user_id: UserId, grocery_id: GroceryId) -> Result<u64> {
        let mut state = self.state.lock().await;
        let before = state.groceries.len();
        state
            .groceries
            .retain(|g| !(g.id == grocery_id && g.user_id == user_id));
        Ok((before - state.groceries.len()) as u64)
    }

    async fn adjust_grocery_quantity(
        &self,
        user_id: UserId,
        grocery_id: GroceryId,
        delta: f64,
    ) -> Result<Option<Grocery>> {
        let mut state = self.state.lock().await;
        Ok(state.grocery_mut(user_id, grocery_id).map(|grocery| {
            grocery.quantity = floor_at_zero(grocery.quantity, delta);
            grocery.updated_at = Utc::now();
            grocery.clone()
        }))
    }

    async fn merge_grocery(
        &self,
        user_id: UserId,
        grocery_item_id: GroceryItemId,
        quantity: f64,
        unit: &str,
    ) -> Result<MergeOutcome> {
        let mut state = self.state.lock().await;
        let existing = state
            .groceries
            .iter_mut()
            .filter(|g| g.user_id == user_id && g.grocery_item_id == grocery_item_id)
            .min_by_key(|g| g.id);
        if let Some(grocery) = existing {
            grocery.quantity = floor_at_zero(grocery.quantity, quantity);
            grocery.updated_at = Utc::now();
            return Ok(MergeOutcome::Merged(grocery.id));
        }

        let id = state.next_id();
        state.groceries.push(Grocery {
            id,
            user_id,
            grocery_item_id,
            unit: unit.to_string(),
            quantity,
            low_threshold: 0.0,
            updated_at: Utc::now(),
        });
        Ok(MergeOutcome::Created(id))
    }

    async fn list_groceries(&self, user_id: UserId) -> Result<Vec<GroceryEntry>> {
        let state = self.state.lock().await;
        let mut entries: Vec<GroceryEntry> = state
            .groceries
            .iter()
            .filter(|g| g.user_id == user_id)
            .map(|g| {
                let item = state.item(g.grocery_item_id);
                let type_name = item
                    .and_then(|i| state.type_of(i.grocery_type_id))
                    .map(|t| t.name.clone())
                    .unwrap_or_default();
                GroceryEntry {
                    id: g.id,
                    grocery_item_id: g.grocery_item_id,
                    name: item.map(|i| i.name.clone()).unwrap_or_default(),
                    grocery_type_name: type_name,
                    unit: g.unit.clone(),
                    quantity: g.quantity,
                    low_threshold: g.low_threshold,
                }
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(entries)
    }

    async fn groceries_by_item(&self, user_id: UserId) -> Result<Vec<Grocery>> {
        let state = self.state.lock().await;
        let mut first: HashMap<GroceryItemId, &Grocery> = HashMap::new();
        for grocery in state.groceries.iter().filter(|g| g.user_id == user_id) {
            first
                .entry(grocery.grocery_item_id)
                .and_modify(|kept| {
                    if grocery.id < kept.id {
                        *kept = grocery;
                    }
                })
                .or_insert(grocery);
        }
        let mut rows: Vec<Grocery> = first.into_values().cloned().collect();
        rows.sort_by_key(|g| g.id);
        Ok(rows)
    }

    async fn insert_recipe(&self, recipe: RecipeRow) -> Result<Recipe> {
        let mut state = self.state.lock().await;
        let created = Recipe {
            id: state.next_id(),
            name: recipe.name,
            description: recipe.description,
            image_url: recipe.image_url,
            author_id: recipe.author_id,
            created_at: Utc::now(),
        };
        for ingredient in recipe.ingredients {
            state.ingredients.push((created.id, ingredient));
        }
        state.recipes.push(created.clone());
        Ok(created)
    }

    async fn replace_recipe(
        &self,
        recipe_id: RecipeId,
        recipe: RecipeRow,
    ) -> Result<Option<Recipe>> {
        let mut state = self.state.lock().await;
        let Some(existing) = state.recipes.iter_mut().find(|r| r.id == recipe_id) else {
            return Ok(None);
        };
        existing.name = recipe.name;
        existing.description = recipe.description;
        existing.image_url = recipe.image_url;
        let updated = existing.clone();

        state.ingredients.retain(|(r, _)| *r != recipe_id);
        for ingredient in recipe.ingredients {
            state.ingredients.push((recipe_id, ingredient));
        }
        Ok(Some(updated))
    }

    async fn find_recipe(&self, recipe_id: RecipeId) -> Result<Option<Recipe>> {
        let state = self.state.lock().await;
        Ok(state.recipes.iter().find(|r| r.id == recipe_id).cloned())
    }

    async fn find_recipe_by_name(&self, name: &str) -> Result<Option<Recipe>> {
        let state = self.state.lock().await;
        Ok(state.recipes.iter().find(|r| r.name == name).cloned())
    }

    async fn recipe_ingredients(&self, recipe_id: RecipeId) -> Result<Vec<IngredientLine>> {
        let state = self.state.lock().await;
        Ok(state.ingredient_lines(recipe_id))
    }

    async fn recipes_with_ingredients(&self) -> Result<Vec<RecipeWithIngredients>> {
        let state = self.state.lock().await;
        let mut recipes: Vec<&Recipe> = state.recipes.iter().collect();
        recipes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(recipes
            .into_iter()
            .map(|recipe| RecipeWithIngredients {
                recipe: recipe.clone(),
                ingredients: state.ingredient_lines(recipe.id),
                post_id: state
                    .posts
                    .iter()
                    .filter(|p| p.recipe_id == Some(recipe.id))
                    .map(|p| p.id)
                    .min(),
            })
            .collect())
    }

    async fn insert_post(&self, post: PostRow) -> Result<Post> {
        let mut state = self.state.lock().await;
        let created = Post {
            id: state.next_id(),
            author_id: post.author_id,
            title: post.title,
            content: post.content,
            kind: post.kind,
            recipe_id: post.recipe_id,
            created_at: Utc::now(),
        };
        state.posts.push(created.clone());
        Ok(created)
    }

    async fn find_post(&self, post_id: PostId) -> Result<Option<Post>> {
        let state = self.state.lock().await;
        Ok(state.posts.iter().find(|p| p.id == post_id).cloned())
    }

    async fn update_post(&self, post_id: PostId, post: PostRow) -> Result<Option<Post>> {
        let mut state = self.state.lock().await;
        let Some(existing) = state
            .posts
            .iter_mut()
            .find(|p| p.id == post_id && p.author_id == post.author_id)
        else {
            return Ok(None);
        };
        existing.title = post.title;
        existing.content = post.content;
        existing.kind = post.kind;
        existing.recipe_id = post.recipe_id;
        Ok(Some(existing.clone()))
    }

    async fn delete_post(&self, author_id: UserId, post_id: PostId) -> Result<u64> {
        let mut state = self.state.lock().await;
        let before = state.posts.len();
        state
            .posts
            .retain(|p| !(p.id == post_id && p.author_id == author_id));
        Ok((before - state.posts.len()) as u64)
    }

    async fn apply_consumption(
        &self,
        user_id: UserId,
        recipe_id: RecipeId,
        decrements: &[Decrement],
    ) -> Result<(Vec<Grocery>, i64)> {
        let mut state = self.state.lock().await;
        let mut updated = Vec::with_capacity(decrements.len());
        for decrement in decrements {
            if let Some(grocery) = state.grocery_mut(user_id, decrement.grocery_id) {
                grocery.quantity = floor_at_zero(grocery.quantity, -decrement.amount);
                grocery.updated_at = Utc::now();
                updated.push(grocery.clone());
            }
        }
        let count = state.bump_cook_count(user_id, recipe_id);
        Ok((updated, count))
    }

    async fn increment_cook_count(&self, user_id: UserId, recipe_id: RecipeId) -> Result<i64> {
        let mut state = self.state.lock().await;
        Ok(state.bump_cook_count(user_id, recipe_id))
    }

    async fn cook_count(&self, user_id: UserId, recipe_id: RecipeId) -> Result<i64> {
        let state = self.state.lock().await;
        Ok(state
            .cook_counts
            .get(&(user_id, recipe_id))
            .copied()
            .unwrap_or(0))
    }

    async fn total_cook_count(&self, recipe_id: RecipeId) -> Result<i64> {
        let state = self.state.lock().await;
        Ok(state
            .cook_counts
            .iter()
            .filter(|((_, r), _)| *r == recipe_id)
            .map(|(_, count)| *count)
            .sum())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
