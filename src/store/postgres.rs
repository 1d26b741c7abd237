//! PostgreSQL store
//!
//! Schema bootstrap plus the [`GroceryStore`] implementation over a
//! `sqlx::PgPool`. The unique index on `lower(name)` is what makes concurrent
//! first-time catalog inserts safe: the loser's insert does nothing and the
//! catalog service re-reads the winner.

use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

use super::GroceryStore;
use crate::errors::Result;
use crate::model::{
    Decrement, Grocery, GroceryEntry, GroceryId, GroceryItem, GroceryItemId, GroceryItemSummary,
    GroceryRow, GroceryType, GroceryTypeId, IngredientLine, MergeOutcome, NewCatalogItem, Post,
    PostId, PostKind, PostRow, Recipe, RecipeId, RecipeRow, RecipeWithIngredients, UserId,
};

const SCHEMA: &[(&str, &str)] = &[
    (
        "grocery_types table",
        "CREATE TABLE IF NOT EXISTS grocery_types (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            sort_order INTEGER NOT NULL DEFAULT 0
        )",
    ),
    (
        "grocery_items table",
        "CREATE TABLE IF NOT EXISTS grocery_items (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            default_unit TEXT NOT NULL DEFAULT 'items',
            grocery_type_id BIGINT NOT NULL REFERENCES grocery_types(id)
        )",
    ),
    (
        "grocery_items name index",
        "CREATE UNIQUE INDEX IF NOT EXISTS grocery_items_lower_name_idx
            ON grocery_items (lower(name))",
    ),
    (
        "grocery_item_aliases table",
        "CREATE TABLE IF NOT EXISTS grocery_item_aliases (
            id BIGSERIAL PRIMARY KEY,
            alias TEXT NOT NULL UNIQUE,
            grocery_item_id BIGINT NOT NULL REFERENCES grocery_items(id) ON DELETE CASCADE
        )",
    ),
    (
        "groceries table",
        "CREATE TABLE IF NOT EXISTS groceries (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL,
            grocery_item_id BIGINT NOT NULL REFERENCES grocery_items(id),
            unit TEXT NOT NULL DEFAULT 'items',
            quantity DOUBLE PRECISION NOT NULL DEFAULT 0 CHECK (quantity >= 0),
            low_threshold DOUBLE PRECISION NOT NULL DEFAULT 0 CHECK (low_threshold >= 0),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    ),
    (
        "groceries user index",
        "CREATE INDEX IF NOT EXISTS groceries_user_item_idx
            ON groceries (user_id, grocery_item_id)",
    ),
    (
        "recipes table",
        "CREATE TABLE IF NOT EXISTS recipes (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            image_url TEXT,
            author_id BIGINT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    ),
    (
        "recipe_ingredients table",
        "CREATE TABLE IF NOT EXISTS recipe_ingredients (
            id BIGSERIAL PRIMARY KEY,
            recipe_id BIGINT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            grocery_item_id BIGINT NOT NULL REFERENCES grocery_items(id),
            quantity DOUBLE PRECISION NOT NULL DEFAULT 0,
            unit TEXT NOT NULL DEFAULT ''
        )",
    ),
    (
        "posts table",
        "CREATE TABLE IF NOT EXISTS posts (
            id BIGSERIAL PRIMARY KEY,
            author_id BIGINT NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            kind TEXT NOT NULL DEFAULT 'story',
            recipe_id BIGINT REFERENCES recipes(id) ON DELETE SET NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    ),
    (
        "user_recipe_cook_counts table",
        "CREATE TABLE IF NOT EXISTS user_recipe_cook_counts (
            user_id BIGINT NOT NULL,
            recipe_id BIGINT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            cook_count BIGINT NOT NULL DEFAULT 0,
            PRIMARY KEY (user_id, recipe_id)
        )",
    ),
];

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> anyhow::Result<()> {
    info!("Initializing database schema...");

    for (what, sql) in SCHEMA {
        sqlx::query(sql)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to create {what}"))?;
    }

    info!("Database schema initialized successfully");
    Ok(())
}

const GROCERY_COLUMNS: &str =
    "id, user_id, grocery_item_id, unit, quantity, low_threshold, updated_at";
const RECIPE_COLUMNS: &str = "id, name, description, image_url, author_id, created_at";

#[derive(sqlx::FromRow)]
struct IngredientRecord {
    recipe_id: RecipeId,
    grocery_item_id: GroceryItemId,
    name: String,
    quantity: f64,
    unit: String,
}

#[derive(sqlx::FromRow)]
struct PostRecord {
    id: PostId,
    author_id: UserId,
    title: String,
    content: String,
    kind: String,
    recipe_id: Option<RecipeId>,
    created_at: DateTime<Utc>,
}

impl From<PostRecord> for Post {
    fn from(record: PostRecord) -> Self {
        Post {
            id: record.id,
            author_id: record.author_id,
            title: record.title,
            content: record.content,
            kind: PostKind::parse(&record.kind).unwrap_or(PostKind::Story),
            recipe_id: record.recipe_id,
            created_at: record.created_at,
        }
    }
}

/// Store backed by PostgreSQL
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool of at most `max_connections`
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl GroceryStore for PgStore {
    async fn ensure_grocery_type(&self, name: &str, sort_order: i32) -> Result<GroceryType> {
        sqlx::query(
            "INSERT INTO grocery_types (name, sort_order) VALUES ($1, $2)
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(sort_order)
        .execute(&self.pool)
        .await?;

        let grocery_type = sqlx::query_as::<_, GroceryType>(
            "SELECT id, name, sort_order FROM grocery_types WHERE name = $1",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(grocery_type)
    }

    async fn find_grocery_type_by_name(&self, name: &str) -> Result<Option<GroceryType>> {
        let grocery_type = sqlx::query_as::<_, GroceryType>(
            "SELECT id, name, sort_order FROM grocery_types WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(grocery_type)
    }

    async fn find_item_by_name(&self, name: &str) -> Result<Option<GroceryItem>> {
        let item = sqlx::query_as::<_, GroceryItem>(
            "SELECT id, name, default_unit, grocery_type_id FROM grocery_items
             WHERE lower(name) = lower($1)
             LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn find_item_by_alias(&self, alias: &str) -> Result<Option<GroceryItem>> {
        let item = sqlx::query_as::<_, GroceryItem>(
            "SELECT i.id, i.name, i.default_unit, i.grocery_type_id
             FROM grocery_item_aliases a
             JOIN grocery_items i ON i.id = a.grocery_item_id
             WHERE lower(a.alias) = lower($1)
             LIMIT 1",
        )
        .bind(alias)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn find_item_by_id(&self, id: GroceryItemId) -> Result<Option<GroceryItem>> {
        let item = sqlx::query_as::<_, GroceryItem>(
            "SELECT id, name, default_unit, grocery_type_id FROM grocery_items WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn insert_item(&self, item: NewCatalogItem) -> Result<Option<GroceryItem>> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, GroceryItem>(
            "INSERT INTO grocery_items (name, default_unit, grocery_type_id)
             VALUES ($1, $2, $3)
             ON CONFLICT DO NOTHING
             RETURNING id, name, default_unit, grocery_type_id",
        )
        .bind(&item.name)
        .bind(&item.default_unit)
        .bind(item.grocery_type_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let (Some(created), Some(alias)) = (&created, &item.alias) {
            sqlx::query(
                "INSERT INTO grocery_item_aliases (alias, grocery_item_id) VALUES ($1, $2)
                 ON CONFLICT (alias) DO NOTHING",
            )
            .bind(alias.to_lowercase())
            .bind(created.id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(name = %item.name, created = created.is_some(), "Inserted catalog item");
        Ok(created)
    }

    async fn add_alias(&self, item_id: GroceryItemId, alias: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO grocery_item_aliases (alias, grocery_item_id) VALUES ($1, $2)
             ON CONFLICT (alias) DO NOTHING",
        )
        .bind(alias.to_lowercase())
        .bind(item_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn search_items(
        &self,
        text: Option<&str>,
        grocery_type_id: Option<GroceryTypeId>,
        limit: usize,
    ) -> Result<Vec<GroceryItemSummary>> {
        let items = sqlx::query_as::<_, GroceryItemSummary>(
            "SELECT i.id, i.name, i.default_unit, i.grocery_type_id,
                    t.name AS grocery_type_name
             FROM grocery_items i
             JOIN grocery_types t ON t.id = i.grocery_type_id
             WHERE ($1::TEXT IS NULL
                    OR position(lower($1::TEXT) IN lower(i.name)) > 0
                    OR EXISTS (
                        SELECT 1 FROM grocery_item_aliases a
                        WHERE a.grocery_item_id = i.id
                          AND position(lower($1::TEXT) IN lower(a.alias)) > 0))
               AND ($2::BIGINT IS NULL OR i.grocery_type_id = $2::BIGINT)
             ORDER BY t.sort_order ASC, i.name ASC
             LIMIT $3",
        )
        .bind(text)
        .bind(grocery_type_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn insert_grocery(&self, row: GroceryRow) -> Result<Grocery> {
        let grocery = sqlx::query_as::<_, Grocery>(&format!(
            "INSERT INTO groceries (user_id, grocery_item_id, unit, quantity, low_threshold)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {GROCERY_COLUMNS}"
        ))
        .bind(row.user_id)
        .bind(row.grocery_item_id)
        .bind(&row.unit)
        .bind(row.quantity)
        .bind(row.low_threshold)
        .fetch_one(&self.pool)
        .await?;
        Ok(grocery)
    }

    async fn find_grocery(
        &self,
        user_id: UserId,
        grocery_id: GroceryId,
    ) -> Result<Option<Grocery>> {
        let grocery = sqlx::query_as::<_, Grocery>(&format!(
            "SELECT {GROCERY_COLUMNS} FROM groceries WHERE id = $1 AND user_id = $2"
        ))
        .bind(grocery_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(grocery)
    }

    async fn update_grocery(
        &self,
        user_id: UserId,
        grocery_id: GroceryId,
        unit: &str,
        quantity: f64,
        low_threshold: f64,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE groceries
             SET unit = $3, quantity = $4, low_threshold = $5, updated_at = NOW()
             WHERE id = $1 AND user_id = $2",
        )
        .bind(grocery_id)
        .bind(user_id)
        .bind(unit)
        .bind(quantity)
        .bind(low_threshold)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_grocery(&self, user_id: UserId, grocery_id: GroceryId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM groceries WHERE id = $1 AND user_id = $2")
            .bind(grocery_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn adjust_grocery_quantity(
        &self,
        user_id: UserId,
        grocery_id: GroceryId,
        delta: f64,
    ) -> Result<Option<Grocery>> {
        let grocery = sqlx::query_as::<_, Grocery>(&format!(
            "UPDATE groceries
             SET quantity = GREATEST(quantity + $3, 0), updated_at = NOW()
             WHERE id = $1 AND user_id = $2
             RETURNING {GROCERY_COLUMNS}"
        ))
        .bind(grocery_id)
        .bind(user_id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;
        Ok(grocery)
    }

    async fn merge_grocery(
        &self,
        user_id: UserId,
        grocery_item_id: GroceryItemId,
        quantity: f64,
        unit: &str,
    ) -> Result<MergeOutcome> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<GroceryId> = sqlx::query_scalar(
            "SELECT id FROM groceries
             WHERE user_id = $1 AND grocery_item_id = $2
             ORDER BY id
             LIMIT 1
             FOR UPDATE",
        )
        .bind(user_id)
        .bind(grocery_item_id)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match existing {
            Some(id) => {
                sqlx::query(
                    "UPDATE groceries
                     SET quantity = GREATEST(quantity + $2, 0), updated_at = NOW()
                     WHERE id = $1",
                )
                .bind(id)
                .bind(quantity)
                .execute(&mut *tx)
                .await?;
                MergeOutcome::Merged(id)
            }
            None => {
                let id: GroceryId = sqlx::query_scalar(
                    "INSERT INTO groceries (user_id, grocery_item_id, unit, quantity, low_threshold)
                     VALUES ($1, $2, $3, $4, 0)
                     RETURNING id",
                )
                .bind(user_id)
                .bind(grocery_item_id)
                .bind(unit)
                .bind(quantity)
                .fetch_one(&mut *tx)
                .await?;
                MergeOutcome::Created(id)
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn list_groceries(&self, user_id: UserId) -> Result<Vec<GroceryEntry>> {
        let entries = sqlx::query_as::<_, GroceryEntry>(
            "SELECT g.id, g.grocery_item_id, i.name, t.name AS grocery_type_name,
                    g.unit, g.quantity, g.low_threshold
             FROM groceries g
             JOIN grocery_items i ON i.id = g.grocery_item_id
             JOIN grocery_types t ON t.id = i.grocery_type_id
             WHERE g.user_id = $1
             ORDER BY i.name ASC, g.id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn groceries_by_item(&self, user_id: UserId) -> Result<Vec<Grocery>> {
        let mut rows = sqlx::query_as::<_, Grocery>(&format!(
            "SELECT DISTINCT ON (grocery_item_id) {GROCERY_COLUMNS}
             FROM groceries
             WHERE user_id = $1
             ORDER BY grocery_item_id, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.sort_by_key(|g| g.id);
        Ok(rows)
    }

    async fn insert_recipe(&self, recipe: RecipeRow) -> Result<Recipe> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Recipe>(&format!(
            "INSERT INTO recipes (name, description, image_url, author_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(&recipe.name)
        .bind(&recipe.description)
        .bind(&recipe.image_url)
        .bind(recipe.author_id)
        .fetch_one(&mut *tx)
        .await?;

        for ingredient in &recipe.ingredients {
            sqlx::query(
                "INSERT INTO recipe_ingredients (recipe_id, grocery_item_id, quantity, unit)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(created.id)
            .bind(ingredient.grocery_item_id)
            .bind(ingredient.quantity)
            .bind(&ingredient.unit)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(recipe_id = created.id, ingredients = recipe.ingredients.len(), "Recipe created");
        Ok(created)
    }

    async fn replace_recipe(
        &self,
        recipe_id: RecipeId,
        recipe: RecipeRow,
    ) -> Result<Option<Recipe>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Recipe>(&format!(
            "UPDATE recipes SET name = $2, description = $3, image_url = $4
             WHERE id = $1
             RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(recipe_id)
        .bind(&recipe.name)
        .bind(&recipe.description)
        .bind(&recipe.image_url)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(&mut *tx)
            .await?;

        for ingredient in &recipe.ingredients {
            sqlx::query(
                "INSERT INTO recipe_ingredients (recipe_id, grocery_item_id, quantity, unit)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(recipe_id)
            .bind(ingredient.grocery_item_id)
            .bind(ingredient.quantity)
            .bind(&ingredient.unit)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn find_recipe(&self, recipe_id: RecipeId) -> Result<Option<Recipe>> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1"
        ))
        .bind(recipe_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(recipe)
    }

    async fn find_recipe_by_name(&self, name: &str) -> Result<Option<Recipe>> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE name = $1 ORDER BY id LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(recipe)
    }

    async fn recipe_ingredients(&self, recipe_id: RecipeId) -> Result<Vec<IngredientLine>> {
        let lines = sqlx::query_as::<_, IngredientLine>(
            "SELECT ri.grocery_item_id, i.name, ri.quantity, ri.unit
             FROM recipe_ingredients ri
             JOIN grocery_items i ON i.id = ri.grocery_item_id
             WHERE ri.recipe_id = $1
             ORDER BY ri.id",
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }

    async fn recipes_with_ingredients(&self) -> Result<Vec<RecipeWithIngredients>> {
        let recipes = sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let records = sqlx::query_as::<_, IngredientRecord>(
            "SELECT ri.recipe_id, ri.grocery_item_id, i.name, ri.quantity, ri.unit
             FROM recipe_ingredients ri
             JOIN grocery_items i ON i.id = ri.grocery_item_id
             ORDER BY ri.id",
        )
        .fetch_all(&self.pool)
        .await?;

        let post_ids: Vec<(RecipeId, PostId)> = sqlx::query_as(
            "SELECT recipe_id, MIN(id) FROM posts
             WHERE recipe_id IS NOT NULL
             GROUP BY recipe_id",
        )
        .fetch_all(&self.pool)
        .await?;
        let post_ids: HashMap<RecipeId, PostId> = post_ids.into_iter().collect();

        let mut lines: HashMap<RecipeId, Vec<IngredientLine>> = HashMap::new();
        for record in records {
            lines.entry(record.recipe_id).or_default().push(IngredientLine {
                grocery_item_id: record.grocery_item_id,
                name: record.name,
                quantity: record.quantity,
                unit: record.unit,
            });
        }

        Ok(recipes
            .into_iter()
            .map(|recipe| RecipeWithIngredients {
                ingredients: lines.remove(&recipe.id).unwrap_or_default(),
                post_id: post_ids.get(&recipe.id).copied(),
                recipe,
            })
            .collect())
    }

    async fn insert_post(&self, post: PostRow) -> Result<Post> {
        let record = sqlx::query_as::<_, PostRecord>(
            "INSERT INTO posts (author_id, title, content, kind, recipe_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, author_id, title, content, kind, recipe_id, created_at",
        )
        .bind(post.author_id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.kind.as_str())
        .bind(post.recipe_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(record.into())
    }

    async fn find_post(&self, post_id: PostId) -> Result<Option<Post>> {
        let record = sqlx::query_as::<_, PostRecord>(
            "SELECT id, author_id, title, content, kind, recipe_id, created_at
             FROM posts WHERE id = $1",
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record.map(Post::from))
    }

    async fn update_post(&self, post_id: PostId, post: PostRow) -> Result<Option<Post>> {
        let record = sqlx::query_as::<_, PostRecord>(
            "UPDATE posts
             SET title = $3, content = $4, kind = $5, recipe_id = $6
             WHERE id = $1 AND author_id = $2
             RETURNING id, author_id, title, content, kind, recipe_id, created_at",
        )
        .bind(post_id)
        .bind(post.author_id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.kind.as_str())
        .bind(post.recipe_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record.map(Post::from))
    }

    async fn delete_post(&self, author_id: UserId, post_id: PostId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND author_id = $2")
            .bind(post_id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn apply_consumption(
        &self,
        user_id: UserId,
        recipe_id: RecipeId,
        decrements: &[Decrement],
    ) -> Result<(Vec<Grocery>, i64)> {
        let mut tx = self.pool.begin().await?;
        let mut updated = Vec::with_capacity(decrements.len());

        for decrement in decrements {
            let grocery = sqlx::query_as::<_, Grocery>(&format!(
                "UPDATE groceries
                 SET quantity = GREATEST(quantity - $3, 0), updated_at = NOW()
                 WHERE id = $1 AND user_id = $2
                 RETURNING {GROCERY_COLUMNS}"
            ))
            .bind(decrement.grocery_id)
            .bind(user_id)
            .bind(decrement.amount)
            .fetch_optional(&mut *tx)
            .await?;
            updated.extend(grocery);
        }

        let count: i64 = sqlx::query_scalar(
            "INSERT INTO user_recipe_cook_counts (user_id, recipe_id, cook_count)
             VALUES ($1, $2, 1)
             ON CONFLICT (user_id, recipe_id)
             DO UPDATE SET cook_count = user_recipe_cook_counts.cook_count + 1
             RETURNING cook_count",
        )
        .bind(user_id)
        .bind(recipe_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((updated, count))
    }

    async fn increment_cook_count(&self, user_id: UserId, recipe_id: RecipeId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "INSERT INTO user_recipe_cook_counts (user_id, recipe_id, cook_count)
             VALUES ($1, $2, 1)
             ON CONFLICT (user_id, recipe_id)
             DO UPDATE SET cook_count = user_recipe_cook_counts.cook_count + 1
             RETURNING cook_count",
        )
        .bind(user_id)
        .bind(recipe_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn cook_count(&self, user_id: UserId, recipe_id: RecipeId) -> Result<i64> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT cook_count FROM user_recipe_cook_counts
             WHERE user_id = $1 AND recipe_id = $2",
        )
        .bind(user_id)
        .bind(recipe_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(count.unwrap_or(0))
    }

    async fn total_cook_count(&self, recipe_id: RecipeId) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(cook_count), 0)::BIGINT FROM user_recipe_cook_counts
             WHERE recipe_id = $1",
        )
        .bind(recipe_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
