//! # Grocery Inventory Module
//!
//! Per-user inventory rows and every way they change: manual add and edit,
//! "use one", receipt ingestion and cooking a recipe.
//!
//! ## Invariants
//!
//! - Every operation is scoped to the calling user; another user's row is
//!   reported as [`GroceryError::NotFound`], never as forbidden
//! - Quantities never go below zero
//! - Manual adds always create a row; only receipt ingestion merges into an
//!   existing row for the same catalog item

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::config::{MAX_ITEM_NAME_LENGTH, MAX_UNIT_LENGTH};
use crate::errors::{GroceryError, Result};
use crate::model::{
    ConsumeReport, ConsumedIngredient, Decrement, Grocery, GroceryEntry, GroceryId, GroceryRow,
    GroceryUpdate, IngestOutcome, IngestReport, IngestStatus, MergeOutcome, NewGrocery, PostId,
    ReceiptItem, RecipeId, UserId, DEFAULT_UNIT,
};
use crate::receipt_parser::parse_receipt_text;
use crate::store::GroceryStore;

/// Reject NaN, infinities and negatives
pub(crate) fn validate_amount(label: &str, value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(GroceryError::Validation(format!("{label} must be a number")));
    }
    if value < 0.0 {
        return Err(GroceryError::Validation(format!("{label} must not be negative")));
    }
    Ok(value)
}

/// Blank units fall back to "items"
pub(crate) fn validate_unit(unit: Option<&str>) -> Result<String> {
    let unit = unit
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(DEFAULT_UNIT);
    if unit.chars().count() > MAX_UNIT_LENGTH {
        return Err(GroceryError::Validation(format!(
            "unit must be at most {MAX_UNIT_LENGTH} characters"
        )));
    }
    Ok(unit.to_string())
}

pub(crate) fn validate_item_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GroceryError::Validation("name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_ITEM_NAME_LENGTH {
        return Err(GroceryError::Validation(format!(
            "name must be at most {MAX_ITEM_NAME_LENGTH} characters"
        )));
    }
    Ok(name)
}

/// Inventory service over a shared store
#[derive(Clone)]
pub struct Inventory {
    store: Arc<dyn GroceryStore>,
    catalog: Catalog,
}

impl Inventory {
    pub fn new(store: Arc<dyn GroceryStore>, catalog: Catalog) -> Self {
        Self { store, catalog }
    }

    /// Add a new inventory row
    ///
    /// The item is either an existing catalog id or a free-text name resolved
    /// through the catalog. Quantity and threshold default to 0, unit to
    /// "items". A row is always created, even if the user already stocks the
    /// item.
    pub async fn add(&self, user_id: UserId, new: NewGrocery) -> Result<Grocery> {
        let quantity = validate_amount("quantity", new.quantity.unwrap_or(0.0))?;
        let low_threshold = validate_amount("low threshold", new.low_threshold.unwrap_or(0.0))?;
        let unit = validate_unit(new.unit.as_deref())?;

        let grocery_item_id = match (new.grocery_item_id, new.name.as_deref()) {
            (Some(id), _) => {
                self.catalog
                    .get(id)
                    .await?
                    .ok_or_else(|| GroceryError::NotFound(format!("grocery item {id}")))?
                    .id
            }
            (None, Some(name)) if !name.trim().is_empty() => {
                let name = validate_item_name(name)?;
                self.catalog.find_or_create(name, None).await?.id
            }
            _ => {
                return Err(GroceryError::Validation(
                    "Either a grocery item or a name is required".to_string(),
                ))
            }
        };

        let grocery = self
            .store
            .insert_grocery(GroceryRow {
                user_id,
                grocery_item_id,
                unit,
                quantity,
                low_threshold,
            })
            .await?;
        info!(
            user_id,
            grocery_id = grocery.id,
            grocery_item_id,
            "Grocery added"
        );
        Ok(grocery)
    }

    /// Overwrite unit, quantity and threshold of an owned row
    pub async fn update(
        &self,
        user_id: UserId,
        grocery_id: GroceryId,
        update: GroceryUpdate,
    ) -> Result<Grocery> {
        let quantity = validate_amount("quantity", update.quantity)?;
        let low_threshold = validate_amount("low threshold", update.low_threshold.unwrap_or(0.0))?;
        let unit = validate_unit(update.unit.as_deref())?;

        let affected = self
            .store
            .update_grocery(user_id, grocery_id, &unit, quantity, low_threshold)
            .await?;
        if affected == 0 {
            return Err(not_found(grocery_id));
        }

        debug!(user_id, grocery_id, quantity, "Grocery updated");
        self.store
            .find_grocery(user_id, grocery_id)
            .await?
            .ok_or_else(|| not_found(grocery_id))
    }

    /// Delete an owned row; deleting a missing or foreign row is a no-op
    ///
    /// Returns whether a row was deleted.
    pub async fn remove(&self, user_id: UserId, grocery_id: GroceryId) -> Result<bool> {
        let affected = self.store.delete_grocery(user_id, grocery_id).await?;
        debug!(user_id, grocery_id, deleted = affected > 0, "Grocery delete");
        Ok(affected > 0)
    }

    /// Use one unit of an owned row, never going below zero
    pub async fn decrement_by_one(
        &self,
        user_id: UserId,
        grocery_id: GroceryId,
    ) -> Result<Grocery> {
        let grocery = self
            .store
            .adjust_grocery_quantity(user_id, grocery_id, -1.0)
            .await?
            .ok_or_else(|| not_found(grocery_id))?;
        debug!(
            user_id,
            grocery_id,
            quantity = grocery.quantity,
            "Grocery decremented"
        );
        Ok(grocery)
    }

    /// The user's inventory ordered by item name
    pub async fn list(&self, user_id: UserId) -> Result<Vec<GroceryEntry>> {
        self.store.list_groceries(user_id).await
    }

    /// Rows whose quantity is below their reminder threshold
    pub async fn low_stock(&self, user_id: UserId) -> Result<Vec<GroceryEntry>> {
        Ok(self
            .list(user_id)
            .await?
            .into_iter()
            .filter(GroceryEntry::is_low_stock)
            .collect())
    }

    /// Add parsed receipt items to the inventory
    ///
    /// Each item is resolved through the catalog, then merged into the user's
    /// existing row for that item or created as a new row (unit "items",
    /// threshold 0). Invalid items are skipped and reported; the batch only
    /// fails when nothing was added. Storage failures abort the batch, leaving
    /// items already processed in place.
    pub async fn ingest_receipt(
        &self,
        user_id: UserId,
        items: &[ReceiptItem],
    ) -> Result<IngestReport> {
        if items.is_empty() {
            return Err(GroceryError::Validation("No items to add".to_string()));
        }

        let mut outcomes = Vec::with_capacity(items.len());
        let mut added = 0;

        for item in items {
            let status = match self.ingest_one(user_id, item).await {
                Ok(MergeOutcome::Created(grocery_id)) => IngestStatus::Created { grocery_id },
                Ok(MergeOutcome::Merged(grocery_id)) => IngestStatus::Merged { grocery_id },
                Err(e) if e.is_retryable() => return Err(e),
                Err(e) => {
                    warn!(user_id, name = %item.name, error = %e, "Skipping receipt item");
                    IngestStatus::Skipped {
                        reason: e.to_string(),
                    }
                }
            };
            if !matches!(status, IngestStatus::Skipped { .. }) {
                added += 1;
            }
            outcomes.push(IngestOutcome {
                name: item.name.clone(),
                status,
            });
        }

        if added == 0 {
            return Err(GroceryError::Validation(
                "None of the receipt items could be added".to_string(),
            ));
        }

        info!(user_id, added, total = items.len(), "Receipt ingested");
        Ok(IngestReport { added, outcomes })
    }

    /// Parse raw receipt text and ingest the result
    pub async fn ingest_receipt_text(&self, user_id: UserId, raw: &str) -> Result<IngestReport> {
        let items = parse_receipt_text(raw);
        if items.is_empty() {
            return Err(GroceryError::Validation(
                "No grocery items found in receipt text".to_string(),
            ));
        }
        self.ingest_receipt(user_id, &items).await
    }

    async fn ingest_one(&self, user_id: UserId, item: &ReceiptItem) -> Result<MergeOutcome> {
        let name = validate_item_name(&item.name)?;
        let quantity = if item.quantity.is_finite() {
            validate_amount("quantity", item.quantity)?
        } else {
            1.0
        };
        let catalog_item = self.catalog.find_or_create(name, None).await?;
        self.store
            .merge_grocery(user_id, catalog_item.id, quantity, DEFAULT_UNIT)
            .await
    }

    /// Subtract a recipe's ingredients from the user's inventory and count the cook
    ///
    /// Best effort: ingredients the user does not stock are skipped, and
    /// quantities stop at zero. The decrements and the ledger increment are
    /// applied as one unit of work; the ledger moves by exactly one per call.
    pub async fn consume_for_recipe(
        &self,
        user_id: UserId,
        recipe_id: RecipeId,
        post_id: Option<PostId>,
    ) -> Result<ConsumeReport> {
        self.store
            .find_recipe(recipe_id)
            .await?
            .ok_or_else(|| GroceryError::NotFound(format!("recipe {recipe_id}")))?;

        let ingredients = self.store.recipe_ingredients(recipe_id).await?;
        let stock: HashMap<_, _> = self
            .store
            .groceries_by_item(user_id)
            .await?
            .into_iter()
            .map(|g| (g.grocery_item_id, g))
            .collect();

        let mut planned: Vec<(String, Decrement)> = Vec::new();
        let mut not_stocked = Vec::new();
        for ingredient in &ingredients {
            match stock.get(&ingredient.grocery_item_id) {
                Some(grocery) => planned.push((
                    ingredient.name.clone(),
                    Decrement {
                        grocery_id: grocery.id,
                        amount: ingredient.quantity.max(0.0),
                    },
                )),
                None => not_stocked.push(ingredient.name.clone()),
            }
        }

        let decrements: Vec<Decrement> = planned.iter().map(|(_, d)| *d).collect();
        let (updated, cook_count) = self
            .store
            .apply_consumption(user_id, recipe_id, &decrements)
            .await?;

        let remaining: HashMap<GroceryId, f64> =
            updated.iter().map(|g| (g.id, g.quantity)).collect();
        let consumed = planned
            .into_iter()
            .filter_map(|(name, decrement)| {
                remaining
                    .get(&decrement.grocery_id)
                    .map(|&left| ConsumedIngredient {
                        grocery_id: decrement.grocery_id,
                        name,
                        amount: decrement.amount,
                        remaining: left,
                    })
            })
            .collect::<Vec<_>>();

        info!(
            user_id,
            recipe_id,
            post_id = ?post_id,
            consumed = consumed.len(),
            not_stocked = not_stocked.len(),
            cook_count,
            "Recipe cooked"
        );
        Ok(ConsumeReport {
            recipe_id,
            consumed,
            not_stocked,
            cook_count,
        })
    }
}

fn not_found(grocery_id: GroceryId) -> GroceryError {
    GroceryError::NotFound(format!("grocery {grocery_id}"))
}
