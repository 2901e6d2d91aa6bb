//! Storage contract consumed by the core, plus an in-memory implementation.
//!
//! Physical persistence belongs to the implementor (see larder-store for the
//! DuckDB one). The core only reads and writes whole [`RecipeDocument`]s.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::document::RecipeDocument;
use crate::error::StoreError;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Key/document store holding the recipe catalog.
pub trait RecipeStore: Send + Sync {
    /// Every stored document, in insertion order. Some may lack an embedding.
    ///
    /// Records that cannot be decoded as a [`RecipeDocument`] are skipped
    /// rather than failing the whole read.
    fn get_all(&self) -> StoreResult<Vec<RecipeDocument>>;

    /// Insert unless the key exists. Returns `true` when newly inserted.
    fn insert_if_absent(&self, key: &str, document: &RecipeDocument) -> StoreResult<bool>;

    /// Fetch one document, or [`StoreError::NotFound`].
    fn get(&self, key: &str) -> StoreResult<RecipeDocument>;

    /// Replace an existing document wholesale, or [`StoreError::NotFound`].
    fn replace(&self, key: &str, document: &RecipeDocument) -> StoreResult<()>;

    /// Delete one document, or [`StoreError::NotFound`].
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Delete everything. Returns how many documents were removed.
    fn delete_all(&self) -> StoreResult<usize>;

    /// Number of stored documents.
    fn count(&self) -> StoreResult<usize> {
        Ok(self.get_all()?.len())
    }
}

impl<S: RecipeStore + ?Sized> RecipeStore for Box<S> {
    fn get_all(&self) -> StoreResult<Vec<RecipeDocument>> {
        (**self).get_all()
    }

    fn insert_if_absent(&self, key: &str, document: &RecipeDocument) -> StoreResult<bool> {
        (**self).insert_if_absent(key, document)
    }

    fn get(&self, key: &str) -> StoreResult<RecipeDocument> {
        (**self).get(key)
    }

    fn replace(&self, key: &str, document: &RecipeDocument) -> StoreResult<()> {
        (**self).replace(key, document)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        (**self).delete(key)
    }

    fn delete_all(&self) -> StoreResult<usize> {
        (**self).delete_all()
    }

    fn count(&self) -> StoreResult<usize> {
        (**self).count()
    }
}

#[derive(Default)]
struct Entries {
    order: Vec<String>,
    documents: HashMap<String, RecipeDocument>,
}

/// Process-local store, insertion ordered. Used for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<Entries>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Recovering from poisoned memory store lock");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Recovering from poisoned memory store lock");
                poisoned.into_inner()
            }
        }
    }
}

impl RecipeStore for MemoryStore {
    fn get_all(&self) -> StoreResult<Vec<RecipeDocument>> {
        let entries = self.read();
        Ok(entries
            .order
            .iter()
            .filter_map(|key| entries.documents.get(key).cloned())
            .collect())
    }

    fn insert_if_absent(&self, key: &str, document: &RecipeDocument) -> StoreResult<bool> {
        let mut entries = self.write();
        if entries.documents.contains_key(key) {
            return Ok(false);
        }
        entries.order.push(key.to_string());
        entries.documents.insert(key.to_string(), document.clone());
        Ok(true)
    }

    fn get(&self, key: &str) -> StoreResult<RecipeDocument> {
        self.read()
            .documents
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn replace(&self, key: &str, document: &RecipeDocument) -> StoreResult<()> {
        let mut entries = self.write();
        match entries.documents.get_mut(key) {
            Some(existing) => {
                *existing = document.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.write();
        if entries.documents.remove(key).is_none() {
            return Err(StoreError::NotFound(key.to_string()));
        }
        entries.order.retain(|k| k != key);
        Ok(())
    }

    fn delete_all(&self) -> StoreResult<usize> {
        let mut entries = self.write();
        let removed = entries.documents.len();
        entries.documents.clear();
        entries.order.clear();
        Ok(removed)
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(self.read().documents.len())
    }
}
