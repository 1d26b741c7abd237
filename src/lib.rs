//! # Groceries
//!
//! Grocery inventory and recipe recommendation engine: a shared catalog of
//! grocery items, per-user inventories fed by manual edits or parsed receipt
//! text, recipes ranked by how much of them a user already stocks, and
//! per-user cook counters.
//!
//! Services share one [`store::GroceryStore`] backend, either PostgreSQL
//! ([`store::PgStore`]) or in-process ([`store::MemoryStore`]).

pub mod catalog;
pub mod config;
pub mod cook_ledger;
pub mod errors;
pub mod inventory;
pub mod model;
pub mod receipt_parser;
pub mod recipes;
pub mod recommend;
pub mod seed;
pub mod store;

use std::sync::Arc;

use catalog::Catalog;
use cook_ledger::CookLedger;
use inventory::Inventory;
use recipes::Recipes;
use recommend::Recommender;
use store::GroceryStore;

/// Every service wired to one backend
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn GroceryStore>,
    pub catalog: Catalog,
    pub inventory: Inventory,
    pub recommender: Recommender,
    pub cook_ledger: CookLedger,
    pub recipes: Recipes,
}

impl Services {
    pub fn new(store: Arc<dyn GroceryStore>, search_limit: usize) -> Self {
        let catalog = Catalog::with_search_limit(store.clone(), search_limit);
        Self {
            inventory: Inventory::new(store.clone(), catalog.clone()),
            recommender: Recommender::new(store.clone()),
            cook_ledger: CookLedger::new(store.clone()),
            recipes: Recipes::new(store.clone(), catalog.clone()),
            catalog,
            store,
        }
    }
}
