//! Recipe authoring and post publishing
//!
//! Recipes are written by users (or seeded without an author) and referenced
//! by posts. Ingredients resolve to catalog items either by id or through
//! [`Catalog::find_or_create`], so authoring a recipe can grow the catalog.

use std::sync::Arc;

use tracing::{debug, info};
use url::Url;

use crate::catalog::Catalog;
use crate::config::{MAX_POST_TITLE_LENGTH, MAX_RECIPE_NAME_LENGTH, MAX_UNIT_LENGTH};
use crate::errors::{GroceryError, Result};
use crate::inventory::{validate_amount, validate_item_name};
use crate::model::{
    NewIngredient, NewPost, NewRecipe, Post, PostId, PostKind, PostRow, PostUpdate, Recipe,
    RecipeDetail, RecipeId, RecipeRow, StoredIngredient, UserId,
};
use crate::store::GroceryStore;

fn bounded(label: &str, value: &str, max: usize) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(GroceryError::Validation(format!("{label} must not be empty")));
    }
    if value.chars().count() > max {
        return Err(GroceryError::Validation(format!(
            "{label} must be at most {max} characters"
        )));
    }
    Ok(value.to_string())
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Blank means no image; anything else must be an absolute http(s) URL
fn image_url(value: Option<&str>) -> Result<Option<String>> {
    let Some(value) = optional_text(value) else {
        return Ok(None);
    };
    match Url::parse(&value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Some(value)),
        _ => Err(GroceryError::Validation(format!(
            "image URL must be an http(s) URL: {value}"
        ))),
    }
}

fn post_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(GroceryError::Validation("content must not be empty".to_string()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct Recipes {
    store: Arc<dyn GroceryStore>,
    catalog: Catalog,
}

impl Recipes {
    pub fn new(store: Arc<dyn GroceryStore>, catalog: Catalog) -> Self {
        Self { store, catalog }
    }

    /// Create a recipe owned by `author_id`; `None` is used for seeded recipes
    pub async fn create_recipe(
        &self,
        author_id: Option<UserId>,
        recipe: NewRecipe,
    ) -> Result<Recipe> {
        let row = self.recipe_row(author_id, recipe).await?;
        let ingredient_count = row.ingredients.len();
        let created = self.store.insert_recipe(row).await?;
        info!(
            recipe_id = created.id,
            author_id = ?author_id,
            ingredients = ingredient_count,
            "Recipe created"
        );
        Ok(created)
    }

    /// Replace a recipe's fields and its whole ingredient list
    ///
    /// Only the author may edit; any other caller sees [`GroceryError::NotFound`].
    pub async fn replace_recipe(
        &self,
        author_id: UserId,
        recipe_id: RecipeId,
        recipe: NewRecipe,
    ) -> Result<Recipe> {
        let existing = self
            .store
            .find_recipe(recipe_id)
            .await?
            .filter(|r| r.author_id == Some(author_id))
            .ok_or_else(|| GroceryError::NotFound(format!("recipe {recipe_id}")))?;

        let row = self.recipe_row(existing.author_id, recipe).await?;
        let updated = self
            .store
            .replace_recipe(recipe_id, row)
            .await?
            .ok_or_else(|| GroceryError::NotFound(format!("recipe {recipe_id}")))?;
        info!(recipe_id, author_id, "Recipe replaced");
        Ok(updated)
    }

    /// Publish a story or recipe post
    ///
    /// A recipe post creates its recipe first and links to it. The content is
    /// expected to be sanitized already.
    pub async fn publish_post(&self, author_id: UserId, post: NewPost) -> Result<Post> {
        let title = bounded("title", &post.title, MAX_POST_TITLE_LENGTH)?;
        post_content(&post.content)?;

        let recipe_id = match (post.kind, post.recipe) {
            (PostKind::Recipe, Some(recipe)) => {
                Some(self.create_recipe(Some(author_id), recipe).await?.id)
            }
            (PostKind::Recipe, None) => {
                return Err(GroceryError::Validation(
                    "A recipe post needs a recipe".to_string(),
                ))
            }
            (PostKind::Story, _) => None,
        };

        let created = self
            .store
            .insert_post(PostRow {
                author_id,
                title,
                content: post.content,
                kind: post.kind,
                recipe_id,
            })
            .await?;
        info!(post_id = created.id, author_id, kind = %created.kind, "Post published");
        Ok(created)
    }

    /// Edit a post written by `author_id`; any other caller sees
    /// [`GroceryError::NotFound`]
    ///
    /// A recipe in the update replaces the linked recipe in place, or creates
    /// one when the post has none yet. Switching to a story keeps the link.
    pub async fn update_post(
        &self,
        author_id: UserId,
        post_id: PostId,
        update: PostUpdate,
    ) -> Result<Post> {
        let existing = self
            .store
            .find_post(post_id)
            .await?
            .filter(|p| p.author_id == author_id)
            .ok_or_else(|| GroceryError::NotFound(format!("post {post_id}")))?;

        let title = match update.title.as_deref() {
            Some(title) => bounded("title", title, MAX_POST_TITLE_LENGTH)?,
            None => existing.title,
        };
        let content = match update.content {
            Some(content) => {
                post_content(&content)?;
                content
            }
            None => existing.content,
        };
        let kind = update.kind.unwrap_or(existing.kind);

        let recipe_id = match (kind, update.recipe, existing.recipe_id) {
            (PostKind::Recipe, Some(recipe), Some(recipe_id)) => {
                let row = self.recipe_row(Some(author_id), recipe.clone()).await?;
                match self.store.replace_recipe(recipe_id, row).await? {
                    Some(replaced) => Some(replaced.id),
                    None => Some(self.create_recipe(Some(author_id), recipe).await?.id),
                }
            }
            (PostKind::Recipe, Some(recipe), None) => {
                Some(self.create_recipe(Some(author_id), recipe).await?.id)
            }
            (PostKind::Recipe, None, None) => {
                return Err(GroceryError::Validation(
                    "A recipe post needs a recipe".to_string(),
                ))
            }
            (_, _, linked) => linked,
        };

        let updated = self
            .store
            .update_post(
                post_id,
                PostRow {
                    author_id,
                    title,
                    content,
                    kind,
                    recipe_id,
                },
            )
            .await?
            .ok_or_else(|| GroceryError::NotFound(format!("post {post_id}")))?;
        info!(
            post_id,
            author_id,
            kind = %updated.kind,
            recipe_id = ?updated.recipe_id,
            "Post updated"
        );
        Ok(updated)
    }

    /// Delete a post written by `author_id`
    ///
    /// The linked recipe stays, along with its cook counts.
    pub async fn delete_post(&self, author_id: UserId, post_id: PostId) -> Result<()> {
        if self.store.delete_post(author_id, post_id).await? == 0 {
            return Err(GroceryError::NotFound(format!("post {post_id}")));
        }
        info!(post_id, author_id, "Post deleted");
        Ok(())
    }

    /// Recipe with its ingredient lines and cook counts
    ///
    /// The viewer's own count is 0 for anonymous viewers.
    pub async fn recipe_detail(
        &self,
        recipe_id: RecipeId,
        viewer: Option<UserId>,
    ) -> Result<RecipeDetail> {
        let recipe = self
            .store
            .find_recipe(recipe_id)
            .await?
            .ok_or_else(|| GroceryError::NotFound(format!("recipe {recipe_id}")))?;
        let ingredients = self.store.recipe_ingredients(recipe_id).await?;
        let public_cook_count = self.store.total_cook_count(recipe_id).await?;
        let user_cook_count = match viewer {
            Some(user_id) => self.store.cook_count(user_id, recipe_id).await?,
            None => 0,
        };
        Ok(RecipeDetail {
            recipe,
            ingredients,
            public_cook_count,
            user_cook_count,
        })
    }

    async fn recipe_row(&self, author_id: Option<UserId>, recipe: NewRecipe) -> Result<RecipeRow> {
        let name = bounded("recipe name", &recipe.name, MAX_RECIPE_NAME_LENGTH)?;
        if recipe.ingredients.is_empty() {
            return Err(GroceryError::Validation(
                "A recipe needs at least one ingredient".to_string(),
            ));
        }

        let mut ingredients = Vec::with_capacity(recipe.ingredients.len());
        for ingredient in &recipe.ingredients {
            ingredients.push(self.resolve_ingredient(ingredient).await?);
        }

        Ok(RecipeRow {
            name,
            description: optional_text(recipe.description.as_deref()),
            image_url: image_url(recipe.image_url.as_deref())?,
            author_id,
            ingredients,
        })
    }

    async fn resolve_ingredient(&self, ingredient: &NewIngredient) -> Result<StoredIngredient> {
        let quantity = validate_amount("ingredient quantity", ingredient.quantity)?;
        let unit = ingredient.unit.as_deref().unwrap_or("").trim().to_string();
        if unit.chars().count() > MAX_UNIT_LENGTH {
            return Err(GroceryError::Validation(format!(
                "unit must be at most {MAX_UNIT_LENGTH} characters"
            )));
        }

        let grocery_item_id = match (ingredient.grocery_item_id, ingredient.name.as_deref()) {
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
        debug!(grocery_item_id, quantity, unit = %unit, "Resolved ingredient");

        Ok(StoredIngredient {
            grocery_item_id,
            quantity,
            unit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded() {
        assert_eq!(bounded("title", "  Soup ", 10).unwrap(), "Soup");
        assert!(bounded("title", "   ", 10).is_err());
        assert!(bounded("title", "abcdefghijk", 10).is_err());
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text(Some("  ")), None);
        assert_eq!(optional_text(None), None);
        assert_eq!(optional_text(Some(" quick ")), Some("quick".to_string()));
    }

    #[test]
    fn test_image_url_accepts_only_web_urls() {
        assert_eq!(image_url(None).unwrap(), None);
        assert_eq!(image_url(Some("  ")).unwrap(), None);
        assert_eq!(
            image_url(Some(" https://example.com/a.png ")).unwrap(),
            Some("https://example.com/a.png".to_string())
        );
        assert!(image_url(Some("http://cdn.example.org/x.jpg")).is_ok());

        for bad in ["not a url", "ftp://example.com/a.png", "javascript:alert(1)", "/a.png"] {
            assert!(matches!(
                image_url(Some(bad)),
                Err(GroceryError::Validation(_))
            ));
        }
    }
}
