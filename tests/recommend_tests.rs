use std::sync::Arc;

use groceries::model::{NewGrocery, NewIngredient, NewPost, NewRecipe, PostKind};
use groceries::seed::seed_defaults;
use groceries::store::{GroceryStore, MemoryStore};
use groceries::Services;

const ALICE: i64 = 1;

fn services() -> Services {
    let store: Arc<dyn GroceryStore> = Arc::new(MemoryStore::new());
    Services::new(store, 50)
}

fn recipe(name: &str, ingredients: &[&str]) -> NewRecipe {
    NewRecipe {
        name: name.to_string(),
        description: None,
        image_url: None,
        ingredients: ingredients
            .iter()
            .map(|n| NewIngredient {
                name: Some(n.to_string()),
                quantity: 1.0,
                ..Default::default()
            })
            .collect(),
    }
}

async fn stock(services: &Services, name: &str, quantity: f64) {
    services
        .inventory
        .add(
            ALICE,
            NewGrocery {
                name: Some(name.to_string()),
                quantity: Some(quantity),
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_higher_match_percent_ranks_first() {
    let services = services();
    services
        .recipes
        .create_recipe(None, recipe("Four Things", &["a", "b", "c", "d"]))
        .await
        .unwrap();
    services
        .recipes
        .create_recipe(None, recipe("Two Things", &["a", "e"]))
        .await
        .unwrap();
    services
        .recipes
        .create_recipe(None, recipe("Nothing Stocked", &["x", "y"]))
        .await
        .unwrap();
    for name in ["a", "b", "c"] {
        stock(&services, name, 1.0).await;
    }

    let ranked = services.recommender.recommend(ALICE).await.unwrap();

    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].name, "Four Things");
    assert_eq!(ranked[0].match_percent, 75);
    assert_eq!(ranked[0].match_count, 3);
    assert_eq!(ranked[0].total_ingredients, 4);
    assert_eq!(ranked[0].missing_ingredients, vec!["D"]);
    assert_eq!(ranked[1].name, "Two Things");
    assert_eq!(ranked[1].match_percent, 50);
    assert_eq!(ranked[1].missing_ingredients, vec!["E"]);
}

#[tokio::test]
async fn test_zero_quantity_still_counts_as_present() {
    let services = services();
    seed_defaults(services.store.clone()).await.unwrap();
    stock(&services, "Salt", 0.0).await;

    let ranked = services.recommender.recommend(ALICE).await.unwrap();
    let names: Vec<&str> = ranked.iter().map(|m| m.name.as_str()).collect();

    assert_eq!(ranked.len(), 3);
    assert!(names.contains(&"Scrambled Eggs"));
    assert!(names.contains(&"Tomato Pasta"));
    assert!(names.contains(&"Green Salad"));
    let eggs = ranked.iter().find(|m| m.name == "Scrambled Eggs").unwrap();
    assert_eq!(eggs.match_percent, 33);
    assert_eq!(eggs.missing_ingredients, vec!["Eggs", "Butter"]);
}

#[tokio::test]
async fn test_ties_keep_newest_recipe_first() {
    let services = services();
    let older = services
        .recipes
        .create_recipe(None, recipe("Older", &["flour", "water"]))
        .await
        .unwrap();
    let newer = services
        .recipes
        .create_recipe(None, recipe("Newer", &["flour", "yeast"]))
        .await
        .unwrap();
    stock(&services, "flour", 2.0).await;

    let ranked = services.recommender.recommend(ALICE).await.unwrap();
    let ids: Vec<i64> = ranked.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);
}

#[tokio::test]
async fn test_empty_inventory_recommends_nothing() {
    let services = services();
    seed_defaults(services.store.clone()).await.unwrap();
    assert!(services.recommender.recommend(ALICE).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_match_carries_representative_post() {
    let services = services();
    let post = services
        .recipes
        .publish_post(
            ALICE,
            NewPost {
                title: "Weeknight soup".to_string(),
                content: "<p>Warm and quick</p>".to_string(),
                kind: PostKind::Recipe,
                recipe: Some(recipe("Soup", &["leek", "potato"])),
            },
        )
        .await
        .unwrap();
    stock(&services, "leek", 1.0).await;

    let ranked = services.recommender.recommend(ALICE).await.unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].post_id, Some(post.id));
    assert_eq!(Some(ranked[0].id), post.recipe_id);
}
