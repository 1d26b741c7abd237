use std::sync::Arc;

use groceries::errors::GroceryError;
use groceries::model::{NewIngredient, NewPost, NewRecipe, PostKind, PostUpdate};
use groceries::seed::seed_defaults;
use groceries::store::{GroceryStore, MemoryStore};
use groceries::Services;

const ALICE: i64 = 1;
const BOB: i64 = 2;

fn services() -> Services {
    let store: Arc<dyn GroceryStore> = Arc::new(MemoryStore::new());
    Services::new(store, 50)
}

fn ingredient(name: &str, quantity: f64, unit: &str) -> NewIngredient {
    NewIngredient {
        grocery_item_id: None,
        name: Some(name.to_string()),
        quantity,
        unit: Some(unit.to_string()),
    }
}

fn pancakes() -> NewRecipe {
    NewRecipe {
        name: "Pancakes".to_string(),
        description: Some("Sunday breakfast".to_string()),
        image_url: Some("".to_string()),
        ingredients: vec![
            ingredient("flour", 200.0, "g"),
            ingredient("Milk", 300.0, "ml"),
            ingredient("eggs", 2.0, ""),
        ],
    }
}

#[tokio::test]
async fn test_create_recipe_resolves_ingredients() {
    let services = services();
    let recipe = services
        .recipes
        .create_recipe(Some(ALICE), pancakes())
        .await
        .unwrap();

    assert_eq!(recipe.author_id, Some(ALICE));
    assert_eq!(recipe.image_url, None);

    let detail = services.recipes.recipe_detail(recipe.id, None).await.unwrap();
    let names: Vec<&str> = detail
        .ingredients
        .iter()
        .map(|i| i.name.as_str())
        .collect();
    assert_eq!(names, vec!["Flour", "Milk", "Eggs"]);
    assert_eq!(detail.ingredients[2].unit, "");
    assert_eq!(detail.public_cook_count, 0);
    assert_eq!(detail.user_cook_count, 0);
}

#[tokio::test]
async fn test_create_recipe_validation() {
    let services = services();

    let unnamed = NewRecipe {
        name: "  ".to_string(),
        ..pancakes()
    };
    assert!(matches!(
        services.recipes.create_recipe(Some(ALICE), unnamed).await,
        Err(GroceryError::Validation(_))
    ));

    let no_ingredients = NewRecipe {
        ingredients: Vec::new(),
        ..pancakes()
    };
    assert!(services
        .recipes
        .create_recipe(Some(ALICE), no_ingredients)
        .await
        .is_err());

    let negative = NewRecipe {
        ingredients: vec![ingredient("flour", -1.0, "g")],
        ..pancakes()
    };
    assert!(matches!(
        services.recipes.create_recipe(Some(ALICE), negative).await,
        Err(GroceryError::Validation(_))
    ));

    let nameless_ingredient = NewRecipe {
        ingredients: vec![NewIngredient::default()],
        ..pancakes()
    };
    assert!(matches!(
        services
            .recipes
            .create_recipe(Some(ALICE), nameless_ingredient)
            .await,
        Err(GroceryError::Validation(_))
    ));
}

#[tokio::test]
async fn test_replace_recipe_is_author_only() {
    let services = services();
    let recipe = services
        .recipes
        .create_recipe(Some(ALICE), pancakes())
        .await
        .unwrap();

    let replacement = NewRecipe {
        name: "Crepes".to_string(),
        description: None,
        image_url: None,
        ingredients: vec![
            ingredient("flour", 100.0, "g"),
            ingredient("milk", 250.0, "ml"),
        ],
    };

    let err = services
        .recipes
        .replace_recipe(BOB, recipe.id, replacement.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, GroceryError::NotFound(_)));

    let replaced = services
        .recipes
        .replace_recipe(ALICE, recipe.id, replacement)
        .await
        .unwrap();
    assert_eq!(replaced.id, recipe.id);
    assert_eq!(replaced.name, "Crepes");

    let detail = services.recipes.recipe_detail(recipe.id, None).await.unwrap();
    assert_eq!(detail.ingredients.len(), 2);
}

#[tokio::test]
async fn test_seeded_recipes_cannot_be_replaced() {
    let services = services();
    seed_defaults(services.store.clone()).await.unwrap();
    let seeded = services
        .store
        .find_recipe_by_name("Garlic Bread")
        .await
        .unwrap()
        .unwrap();

    assert!(matches!(
        services
            .recipes
            .replace_recipe(ALICE, seeded.id, pancakes())
            .await,
        Err(GroceryError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_publish_and_delete_posts() {
    let services = services();

    let story = services
        .recipes
        .publish_post(
            ALICE,
            NewPost {
                title: "Market day".to_string(),
                content: "<p>Found great tomatoes</p>".to_string(),
                kind: PostKind::Story,
                recipe: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(story.recipe_id, None);

    let recipe_post = services
        .recipes
        .publish_post(
            ALICE,
            NewPost {
                title: "Pancakes".to_string(),
                content: "<p>Fluffy</p>".to_string(),
                kind: PostKind::Recipe,
                recipe: Some(pancakes()),
            },
        )
        .await
        .unwrap();
    let recipe_id = recipe_post.recipe_id.expect("recipe post links its recipe");

    assert!(matches!(
        services.recipes.delete_post(BOB, recipe_post.id).await,
        Err(GroceryError::NotFound(_))
    ));
    services
        .recipes
        .delete_post(ALICE, recipe_post.id)
        .await
        .unwrap();
    assert!(services
        .store
        .find_post(recipe_post.id)
        .await
        .unwrap()
        .is_none());
    assert!(services
        .store
        .find_recipe(recipe_id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_publish_post_validation() {
    let services = services();

    let untitled = NewPost {
        title: String::new(),
        content: "body".to_string(),
        kind: PostKind::Story,
        recipe: None,
    };
    assert!(matches!(
        services.recipes.publish_post(ALICE, untitled).await,
        Err(GroceryError::Validation(_))
    ));

    let long_title = NewPost {
        title: "t".repeat(201),
        content: "body".to_string(),
        kind: PostKind::Story,
        recipe: None,
    };
    assert!(services.recipes.publish_post(ALICE, long_title).await.is_err());

    let recipe_without_recipe = NewPost {
        title: "Soup".to_string(),
        content: "body".to_string(),
        kind: PostKind::Recipe,
        recipe: None,
    };
    assert!(matches!(
        services
            .recipes
            .publish_post(ALICE, recipe_without_recipe)
            .await,
        Err(GroceryError::Validation(_))
    ));
}

fn story(title: &str) -> NewPost {
    NewPost {
        title: title.to_string(),
        content: "<p>Found great tomatoes</p>".to_string(),
        kind: PostKind::Story,
        recipe: None,
    }
}

#[tokio::test]
async fn test_update_post_is_author_only() {
    let services = services();
    let post = services
        .recipes
        .publish_post(ALICE, story("Market day"))
        .await
        .unwrap();

    let rename = PostUpdate {
        title: Some("Market morning".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        services
            .recipes
            .update_post(BOB, post.id, rename.clone())
            .await,
        Err(GroceryError::NotFound(_))
    ));
    assert!(matches!(
        services.recipes.update_post(ALICE, 999, rename.clone()).await,
        Err(GroceryError::NotFound(_))
    ));

    let updated = services
        .recipes
        .update_post(ALICE, post.id, rename)
        .await
        .unwrap();
    assert_eq!(updated.id, post.id);
    assert_eq!(updated.title, "Market morning");
    assert_eq!(updated.content, post.content);
    assert_eq!(updated.kind, PostKind::Story);

    let stored = services.store.find_post(post.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Market morning");
}

#[tokio::test]
async fn test_update_post_validation() {
    let services = services();
    let post = services
        .recipes
        .publish_post(ALICE, story("Market day"))
        .await
        .unwrap();

    let blank_content = PostUpdate {
        content: Some("  ".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        services
            .recipes
            .update_post(ALICE, post.id, blank_content)
            .await,
        Err(GroceryError::Validation(_))
    ));

    let recipe_without_recipe = PostUpdate {
        kind: Some(PostKind::Recipe),
        ..Default::default()
    };
    assert!(matches!(
        services
            .recipes
            .update_post(ALICE, post.id, recipe_without_recipe)
            .await,
        Err(GroceryError::Validation(_))
    ));

    let stored = services.store.find_post(post.id).await.unwrap().unwrap();
    assert_eq!(stored, post);
}

#[tokio::test]
async fn test_update_story_into_recipe_post() {
    let services = services();
    let post = services
        .recipes
        .publish_post(ALICE, story("Breakfast"))
        .await
        .unwrap();

    let updated = services
        .recipes
        .update_post(
            ALICE,
            post.id,
            PostUpdate {
                kind: Some(PostKind::Recipe),
                recipe: Some(pancakes()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.kind, PostKind::Recipe);
    assert_eq!(updated.title, "Breakfast");

    let recipe_id = updated.recipe_id.expect("converted post links a recipe");
    let detail = services
        .recipes
        .recipe_detail(recipe_id, None)
        .await
        .unwrap();
    assert_eq!(detail.recipe.name, "Pancakes");
    assert_eq!(detail.recipe.author_id, Some(ALICE));
    assert_eq!(detail.ingredients.len(), 3);
}

#[tokio::test]
async fn test_update_recipe_post_replaces_linked_recipe() {
    let services = services();
    let post = services
        .recipes
        .publish_post(
            ALICE,
            NewPost {
                title: "Pancakes".to_string(),
                content: "<p>Fluffy</p>".to_string(),
                kind: PostKind::Recipe,
                recipe: Some(pancakes()),
            },
        )
        .await
        .unwrap();
    let recipe_id = post.recipe_id.expect("recipe post links its recipe");

    let crepes = NewRecipe {
        name: "Crepes".to_string(),
        image_url: Some("https://example.com/crepes.png".to_string()),
        ingredients: vec![ingredient("flour", 100.0, "g")],
        ..pancakes()
    };
    let updated = services
        .recipes
        .update_post(
            ALICE,
            post.id,
            PostUpdate {
                title: Some("Crepes".to_string()),
                recipe: Some(crepes),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.recipe_id, Some(recipe_id));

    let detail = services
        .recipes
        .recipe_detail(recipe_id, None)
        .await
        .unwrap();
    assert_eq!(detail.recipe.name, "Crepes");
    assert_eq!(
        detail.recipe.image_url.as_deref(),
        Some("https://example.com/crepes.png")
    );
    assert_eq!(detail.ingredients.len(), 1);

    let to_story = services
        .recipes
        .update_post(
            ALICE,
            post.id,
            PostUpdate {
                kind: Some(PostKind::Story),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(to_story.kind, PostKind::Story);
    assert_eq!(to_story.recipe_id, Some(recipe_id));
}

#[tokio::test]
async fn test_recipe_image_must_be_a_web_url() {
    let services = services();

    for bad in ["not a url", "ftp://example.com/a.png"] {
        let recipe = NewRecipe {
            image_url: Some(bad.to_string()),
            ..pancakes()
        };
        assert!(matches!(
            services.recipes.create_recipe(Some(ALICE), recipe).await,
            Err(GroceryError::Validation(_))
        ));
    }

    let recipe = NewRecipe {
        image_url: Some("https://example.com/pancakes.png".to_string()),
        ..pancakes()
    };
    let created = services
        .recipes
        .create_recipe(Some(ALICE), recipe)
        .await
        .unwrap();
    assert_eq!(
        created.image_url.as_deref(),
        Some("https://example.com/pancakes.png")
    );
}

#[tokio::test]
async fn test_cook_ledger_counts() {
    let services = services();
    let recipe = services
        .recipes
        .create_recipe(Some(ALICE), pancakes())
        .await
        .unwrap();
    let ledger = &services.cook_ledger;

    assert_eq!(ledger.user_count(ALICE, recipe.id).await.unwrap(), 0);
    assert_eq!(ledger.public_count(recipe.id).await.unwrap(), 0);

    assert_eq!(ledger.record_cook(ALICE, recipe.id).await.unwrap(), 1);
    assert_eq!(ledger.record_cook(ALICE, recipe.id).await.unwrap(), 2);
    assert_eq!(ledger.record_cook(BOB, recipe.id).await.unwrap(), 1);

    assert_eq!(ledger.user_count(ALICE, recipe.id).await.unwrap(), 2);
    assert_eq!(ledger.user_count(BOB, recipe.id).await.unwrap(), 1);
    assert_eq!(ledger.public_count(recipe.id).await.unwrap(), 3);

    let detail = services
        .recipes
        .recipe_detail(recipe.id, Some(BOB))
        .await
        .unwrap();
    assert_eq!(detail.public_cook_count, 3);
    assert_eq!(detail.user_cook_count, 1);
}

#[tokio::test]
async fn test_record_cook_for_missing_recipe() {
    let services = services();
    assert!(matches!(
        services.cook_ledger.record_cook(ALICE, 999).await,
        Err(GroceryError::NotFound(_))
    ));
    assert_eq!(services.cook_ledger.public_count(999).await.unwrap(), 0);
}

#[tokio::test]
async fn test_seed_is_idempotent() {
    let services = services();
    let first = seed_defaults(services.store.clone()).await.unwrap();
    let second = seed_defaults(services.store.clone()).await.unwrap();

    assert_eq!(first.recipes_created, 5);
    assert_eq!(second.recipes_created, 0);
    assert_eq!(services.catalog.search(None, None).await.unwrap().len(), 12);

    let by_alias = services
        .catalog
        .find_or_create("egg", Some("egg"))
        .await
        .unwrap();
    assert_eq!(by_alias.name, "Eggs");
}
