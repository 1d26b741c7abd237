//! # Grocery Item Catalog
//!
//! Maps free text typed by users (or read off a receipt) to a stable catalog
//! identity, and serves the incremental search behind item pickers.
//!
//! Names are normalized before any lookup: trimmed, lowercased, internal
//! whitespace collapsed. The stored display name is the normalized form with
//! its first character upper-cased, so `"  OLIVE   oil"` and `"olive oil"`
//! both resolve to `"Olive oil"`.
//!
//! Items are created lazily in the fallback `"Other"` type and never deleted.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::DEFAULT_SEARCH_LIMIT;
use crate::errors::{GroceryError, Result};
use crate::model::{
    GroceryItem, GroceryItemId, GroceryItemSummary, GroceryType, GroceryTypeId, ItemGroup,
    NewCatalogItem, DEFAULT_UNIT, FALLBACK_TYPE,
};
use crate::store::GroceryStore;

/// Sort order given to the fallback type when it has to be created
pub const FALLBACK_TYPE_SORT_ORDER: i32 = 999;

/// Trim, lowercase and collapse internal whitespace
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Upper-case the first character of an already normalized name
pub fn display_name(normalized: &str) -> String {
    let mut chars = normalized.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Partition item summaries by type name, keeping the first-seen type order
pub fn group_by_type(items: &[GroceryItemSummary]) -> Vec<ItemGroup> {
    let mut groups: Vec<ItemGroup> = Vec::new();
    let mut index_by_type: HashMap<&str, usize> = HashMap::new();

    for item in items {
        let index = *index_by_type
            .entry(item.grocery_type_name.as_str())
            .or_insert_with(|| {
                groups.push(ItemGroup {
                    group: item.grocery_type_name.clone(),
                    items: Vec::new(),
                });
                groups.len() - 1
            });
        groups[index].items.push(item.name.clone());
    }
    groups
}

/// Catalog service over a shared store
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn GroceryStore>,
    search_limit: usize,
}

impl Catalog {
    pub fn new(store: Arc<dyn GroceryStore>) -> Self {
        Self::with_search_limit(store, DEFAULT_SEARCH_LIMIT)
    }

    pub fn with_search_limit(store: Arc<dyn GroceryStore>, search_limit: usize) -> Self {
        Self {
            store,
            search_limit,
        }
    }

    /// Resolve a name to its catalog item, creating it in "Other" when new
    ///
    /// Lookup order: canonical name (case-insensitive), then `alias` through
    /// the alias table. A new item records `alias` when it differs from the
    /// name. Two requests racing to create the same new name both end up with
    /// the item that won the insert.
    ///
    /// # Errors
    ///
    /// [`GroceryError::InvalidInput`] when the name normalizes to nothing.
    pub async fn find_or_create(&self, name: &str, alias: Option<&str>) -> Result<GroceryItem> {
        let normalized = normalize_name(name);
        if normalized.is_empty() {
            return Err(GroceryError::InvalidInput(
                "Grocery item name cannot be empty".to_string(),
            ));
        }
        let canonical = display_name(&normalized);
        let alias = alias.map(normalize_name).filter(|a| !a.is_empty());

        if let Some(item) = self.store.find_item_by_name(&canonical).await? {
            debug!(name = %canonical, item_id = item.id, "Catalog hit");
            return Ok(item);
        }
        if let Some(alias) = &alias {
            if let Some(item) = self.store.find_item_by_alias(alias).await? {
                debug!(alias = %alias, item_id = item.id, "Catalog alias hit");
                return Ok(item);
            }
        }

        let fallback = self.fallback_type().await?;
        let inserted = self
            .store
            .insert_item(NewCatalogItem {
                name: canonical.clone(),
                default_unit: DEFAULT_UNIT.to_string(),
                grocery_type_id: fallback.id,
                alias: alias.filter(|a| *a != normalized),
            })
            .await?;

        match inserted {
            Some(item) => {
                info!(name = %item.name, item_id = item.id, "Created catalog item");
                Ok(item)
            }
            None => {
                debug!(name = %canonical, "Lost catalog insert race, re-reading winner");
                self.store
                    .find_item_by_name(&canonical)
                    .await?
                    .ok_or_else(|| GroceryError::NotFound(format!("grocery item '{canonical}'")))
            }
        }
    }

    /// Register an item under a named type, with extra aliases
    ///
    /// Used for seeding. An existing item keeps its type and only gains the
    /// aliases.
    pub async fn register(
        &self,
        name: &str,
        grocery_type: &GroceryType,
        default_unit: &str,
        aliases: &[&str],
    ) -> Result<GroceryItem> {
        let normalized = normalize_name(name);
        if normalized.is_empty() {
            return Err(GroceryError::InvalidInput(
                "Grocery item name cannot be empty".to_string(),
            ));
        }
        let canonical = display_name(&normalized);

        let item = match self.store.find_item_by_name(&canonical).await? {
            Some(item) => item,
            None => {
                let inserted = self
                    .store
                    .insert_item(NewCatalogItem {
                        name: canonical.clone(),
                        default_unit: default_unit.to_string(),
                        grocery_type_id: grocery_type.id,
                        alias: None,
                    })
                    .await?;
                match inserted {
                    Some(item) => item,
                    None => self
                        .store
                        .find_item_by_name(&canonical)
                        .await?
                        .ok_or_else(|| {
                            GroceryError::NotFound(format!("grocery item '{canonical}'"))
                        })?,
                }
            }
        };

        for alias in aliases {
            let alias = normalize_name(alias);
            if !alias.is_empty() && alias != normalized {
                self.store.add_alias(item.id, &alias).await?;
            }
        }
        Ok(item)
    }

    /// Catalog item by id
    pub async fn get(&self, id: GroceryItemId) -> Result<Option<GroceryItem>> {
        self.store.find_item_by_id(id).await
    }

    /// Case-insensitive substring search over names and aliases
    ///
    /// Results are ordered by (type sort order, name) and capped at the
    /// configured limit. Blank text returns the first items in that order.
    pub async fn search(
        &self,
        text: Option<&str>,
        grocery_type_id: Option<GroceryTypeId>,
    ) -> Result<Vec<GroceryItemSummary>> {
        let text = text.map(str::trim).filter(|t| !t.is_empty());
        self.store
            .search_items(text, grocery_type_id, self.search_limit)
            .await
    }

    /// Search and group the results for a sectioned picker
    pub async fn search_grouped(
        &self,
        text: Option<&str>,
        grocery_type_id: Option<GroceryTypeId>,
    ) -> Result<Vec<ItemGroup>> {
        Ok(group_by_type(&self.search(text, grocery_type_id).await?))
    }

    async fn fallback_type(&self) -> Result<GroceryType> {
        match self.store.find_grocery_type_by_name(FALLBACK_TYPE).await? {
            Some(grocery_type) => Ok(grocery_type),
            None => {
                self.store
                    .ensure_grocery_type(FALLBACK_TYPE, FALLBACK_TYPE_SORT_ORDER)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(name: &str, type_name: &str) -> GroceryItemSummary {
        GroceryItemSummary {
            id: 0,
            name: name.to_string(),
            default_unit: DEFAULT_UNIT.to_string(),
            grocery_type_id: 0,
            grocery_type_name: type_name.to_string(),
        }
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  OLIVE   oil \t"), "olive oil");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("olive oil"), "Olive oil");
        assert_eq!(display_name("éclair"), "Éclair");
        assert_eq!(display_name(""), "");
    }

    #[test]
    fn test_group_by_type_keeps_first_seen_order() {
        let items = vec![
            summary("Tomatoes", "Vegetables"),
            summary("Milk", "Dairy & Eggs"),
            summary("Garlic", "Vegetables"),
            summary("Apples", "Fruits"),
        ];
        let groups = group_by_type(&items);
        let names: Vec<&str> = groups.iter().map(|g| g.group.as_str()).collect();
        assert_eq!(names, vec!["Vegetables", "Dairy & Eggs", "Fruits"]);
        assert_eq!(groups[0].items, vec!["Tomatoes", "Garlic"]);
    }

    #[test]
    fn test_group_by_type_empty() {
        assert!(group_by_type(&[]).is_empty());
    }
}
