//! Concurrent access to a recipe catalog.
//!
//! Covers the two patterns the CLI relies on:
//! - one shared read-write handle used from several threads
//! - several read-only handles on a file nobody is writing

use larder_core::{RecipeDocument, RecipeStore};
use larder_store::RecipeBase;
use serde_json::json;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::tempdir;

fn recipe(id: usize) -> RecipeDocument {
    serde_json::from_value(json!({
        "recipe_id": id.to_string(),
        "recipe_name": format!("Recipe {}", id),
        "ingredients": ["flour", "water"],
        "ingredients_text": "flour, water",
        "embedding": [1.0, 0.0],
        "embedding_dim": 2,
        "embedding_model": "test-model",
    }))
    .expect("valid recipe document")
}

#[test]
fn test_concurrent_readers() {
    let dir = tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("recipes.duckdb");

    {
        let db = RecipeBase::open(&db_path).expect("Failed to open database");
        for id in 0..10 {
            db.insert_if_absent(&RecipeDocument::key_for(&id.to_string()), &recipe(id))
                .expect("Failed to insert recipe");
        }
    }

    let db_path = Arc::new(db_path);
    let barrier = Arc::new(Barrier::new(3));

    let handles: Vec<_> = (0..3)
        .map(|i| {
            let path = Arc::clone(&db_path);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();
                let db = RecipeBase::open_read_only(&*path)
                    .unwrap_or_else(|e| panic!("Reader {} failed to open DB: {}", i, e));
                db.get_all()
                    .unwrap_or_else(|e| panic!("Reader {} failed to read: {}", i, e))
                    .len()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let seen = handle
            .join()
            .unwrap_or_else(|_| panic!("Reader thread {} panicked", i));
        assert_eq!(seen, 10, "Reader {} should see the whole catalog", i);
    }
}

#[test]
fn test_shared_handle_concurrent_ingest() {
    let dir = tempdir().expect("Failed to create temp dir");
    let db = RecipeBase::open(dir.path().join("recipes.duckdb")).expect("Failed to open database");
    let barrier = Arc::new(Barrier::new(4));

    // Every writer races to insert the same 20 keys.
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let db = db.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..20)
                    .filter(|&id| {
                        db.insert_if_absent(&RecipeDocument::key_for(&id.to_string()), &recipe(id))
                            .expect("insert failed")
                    })
                    .count()
            })
        })
        .collect();

    let inserted: usize = handles
        .into_iter()
        .map(|h| h.join().expect("Writer thread panicked"))
        .sum();

    assert_eq!(inserted, 20, "each key is inserted exactly once");
    assert_eq!(db.count().expect("count failed"), 20);
}

#[test]
fn test_read_only_rejects_writes() {
    let dir = tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("recipes.duckdb");
    drop(RecipeBase::open(&db_path).expect("Failed to create database"));

    let db = RecipeBase::open_read_only(&db_path).expect("Failed to open read-only");
    assert!(db.insert_if_absent("recipe::1", &recipe(1)).is_err());
    assert_eq!(db.count().expect("count failed"), 0);
}
