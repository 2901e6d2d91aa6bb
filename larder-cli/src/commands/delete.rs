//! Delete command - remove one recipe or clear the catalog

use larder_core::document::KEY_PREFIX;
use larder_core::{RecipeDocument, RecipeStore, StoreError};
use tracing::info;

use super::AppContext;
use crate::output::{Output, SuccessMessage};

/// Run the delete command
pub async fn run(ctx: &AppContext, key: Option<&str>, all: bool, yes: bool) -> anyhow::Result<()> {
    let message = match (key, all) {
        (Some(_), true) => anyhow::bail!("Pass either a key or --all, not both"),
        (None, false) => anyhow::bail!("Nothing to delete. Pass a recipe key or --all"),
        (None, true) => {
            if !yes {
                anyhow::bail!("Refusing to delete the whole catalog without --yes");
            }
            if !ctx.catalog_exists() {
                SuccessMessage::new("Catalog is already empty")
            } else {
                let removed = ctx.open_store()?.delete_all()?;
                info!(removed, "Cleared catalog");
                SuccessMessage::new(format!("Deleted {} recipes", removed))
            }
        }
        (Some(key), false) => {
            let store = ctx.open_store_read_write_existing()?;
            let deleted = delete_one(&store, key)?;
            SuccessMessage::new(format!("Deleted {}", deleted))
        }
    };

    Output::new(message, ctx.format).render()
}

/// Delete by key, or by bare recipe id. Returns the key that was removed.
fn delete_one(store: &dyn RecipeStore, key: &str) -> anyhow::Result<String> {
    match store.delete(key) {
        Ok(()) => Ok(key.to_string()),
        Err(StoreError::NotFound(_)) if !key.starts_with(KEY_PREFIX) => {
            let full = RecipeDocument::key_for(key);
            match store.delete(&full) {
                Ok(()) => Ok(full),
                Err(StoreError::NotFound(_)) => anyhow::bail!("Recipe not found: {}", key),
                Err(e) => Err(e.into()),
            }
        }
        Err(StoreError::NotFound(_)) => anyhow::bail!("Recipe not found: {}", key),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_core::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_delete_one_by_id() {
        let store = MemoryStore::new();
        let doc: RecipeDocument =
            serde_json::from_value(json!({"recipe_id": "7", "recipe_name": "Toast"})).unwrap();
        store.insert_if_absent("recipe::7", &doc).unwrap();

        assert_eq!(delete_one(&store, "7").unwrap(), "recipe::7");
        assert_eq!(store.count().unwrap(), 0);
        assert!(delete_one(&store, "7")
            .unwrap_err()
            .to_string()
            .contains("Recipe not found"));
    }
}
