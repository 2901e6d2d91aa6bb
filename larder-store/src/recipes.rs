//! RecipeBase - DuckDB-backed recipe document store.

use anyhow::{Context, Result};
use duckdb::{params, Config, Connection, OptionalExt};
use larder_core::{RecipeDocument, RecipeStore, StoreError, StoreResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::schema::{SCHEMA_SQL, SCHEMA_VERSION};

/// Database access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// Read-write mode (exclusive lock, for ingestion and deletes)
    #[default]
    ReadWrite,
    /// Read-only mode (shared access, for search and status)
    ReadOnly,
}

/// Catalog statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeStats {
    pub total_recipes: usize,
    pub recipes_with_embeddings: usize,
    /// Most common embedding model among stored documents.
    pub model: Option<String>,
    pub coverage_percent: f32,
}

/// Recipe catalog stored in a single DuckDB file.
///
/// Cloning shares the underlying connection.
#[derive(Clone)]
pub struct RecipeBase {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
    mode: AccessMode,
}

impl RecipeBase {
    /// Open or create a catalog in read-write mode.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_mode(path, AccessMode::ReadWrite)
    }

    /// Open an existing catalog read-only. Several read-only handles can
    /// coexist across processes.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_mode(path, AccessMode::ReadOnly)
    }

    /// Open a catalog with the specified access mode.
    pub fn open_with_mode(path: impl AsRef<Path>, mode: AccessMode) -> Result<Self> {
        let path = path.as_ref();

        let conn = match mode {
            AccessMode::ReadWrite => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create directory: {}", parent.display())
                    })?;
                }
                Connection::open(path)
                    .with_context(|| format!("Failed to open database: {}", path.display()))?
            }
            AccessMode::ReadOnly => {
                let config = Config::default()
                    .access_mode(duckdb::AccessMode::ReadOnly)
                    .map_err(|e| anyhow::anyhow!("Failed to set read-only mode: {}", e))?;
                Connection::open_with_flags(path, config).with_context(|| {
                    format!(
                        "Failed to open database in read-only mode: {}",
                        path.display()
                    )
                })?
            }
        };

        let base = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_path_buf(),
            mode,
        };

        if mode == AccessMode::ReadWrite {
            base.init_schema()?;
        }

        debug!(path = %path.display(), ?mode, "Recipe store opened");
        Ok(base)
    }

    /// Open a throwaway in-memory catalog.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let base = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: PathBuf::from(":memory:"),
            mode: AccessMode::ReadWrite,
        };
        base.init_schema()?;
        Ok(base)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Acquire the connection lock. A poisoned mutex is recovered: the
    /// connection itself is still usable.
    fn acquire_conn(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Recovering from poisoned database mutex");
                poisoned.into_inner()
            }
        }
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.acquire_conn();

        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to initialize schema")?;

        conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?)",
            params![SCHEMA_VERSION],
        )
        .context("Failed to set schema version")?;

        Ok(())
    }

    /// Schema version recorded in the file, if any.
    pub fn schema_version(&self) -> Result<Option<String>> {
        let conn = self.acquire_conn();
        conn.query_row(
            "SELECT value FROM metadata WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to read schema version")
    }

    /// Document counts and embedding coverage.
    pub fn stats(&self) -> Result<RecipeStats> {
        let conn = self.acquire_conn();

        let total_recipes: usize =
            conn.query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))?;
        let recipes_with_embeddings: usize = conn.query_row(
            "SELECT COUNT(*) FROM recipes WHERE embedding_dim IS NOT NULL",
            [],
            |row| row.get(0),
        )?;

        let model: Option<String> = conn
            .query_row(
                "SELECT embedding_model FROM recipes
                 WHERE embedding_model IS NOT NULL
                 GROUP BY embedding_model ORDER BY COUNT(*) DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let coverage_percent = if total_recipes > 0 {
            (recipes_with_embeddings as f32 / total_recipes as f32) * 100.0
        } else {
            0.0
        };

        Ok(RecipeStats {
            total_recipes,
            recipes_with_embeddings,
            model,
            coverage_percent,
        })
    }

    fn load_rows(conn: &Connection) -> Result<Vec<(String, String)>> {
        let mut stmt = conn.prepare("SELECT key, document FROM recipes ORDER BY seq")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn contains(conn: &Connection, key: &str) -> Result<bool> {
        let found: usize = conn.query_row(
            "SELECT COUNT(*) FROM recipes WHERE key = ?",
            params![key],
            |row| row.get(0),
        )?;
        Ok(found > 0)
    }

    fn insert_row(conn: &Connection, key: &str, row: &Row) -> Result<()> {
        conn.execute(
            "INSERT INTO recipes
               (key, recipe_id, embedding_model, embedding_dim, document, created_at)
               VALUES (?, ?, ?, ?, ?, ?)",
            params![
                key,
                row.recipe_id,
                row.embedding_model,
                row.embedding_dim,
                row.document,
                row.created_at,
            ],
        )
        .with_context(|| format!("Failed to insert recipe: {}", key))?;
        Ok(())
    }

    fn update_row(conn: &Connection, key: &str, row: &Row) -> Result<usize> {
        conn.execute(
            "UPDATE recipes
               SET recipe_id = ?, embedding_model = ?, embedding_dim = ?,
                   document = ?, created_at = ?
               WHERE key = ?",
            params![
                row.recipe_id,
                row.embedding_model,
                row.embedding_dim,
                row.document,
                row.created_at,
                key,
            ],
        )
        .with_context(|| format!("Failed to replace recipe: {}", key))
    }
}

/// Column values derived from one document.
struct Row {
    recipe_id: String,
    embedding_model: Option<String>,
    embedding_dim: Option<i64>,
    document: String,
    created_at: Option<String>,
}

impl Row {
    fn from_document(document: &RecipeDocument) -> StoreResult<Self> {
        Ok(Self {
            recipe_id: document.recipe_id.clone(),
            embedding_model: document.embedding_model.clone(),
            embedding_dim: document.embedding.as_ref().map(|e| e.len() as i64),
            document: serde_json::to_string(document)?,
            created_at: document.created_at.clone(),
        })
    }
}

fn backend(err: anyhow::Error) -> StoreError {
    StoreError::Backend(format!("{:#}", err))
}

fn decode(key: &str, json: &str) -> StoreResult<RecipeDocument> {
    serde_json::from_str(json)
        .map_err(|e| StoreError::Serialization(format!("document {}: {}", key, e)))
}

impl RecipeStore for RecipeBase {
    fn get_all(&self) -> StoreResult<Vec<RecipeDocument>> {
        let conn = self.acquire_conn();
        let rows = Self::load_rows(&conn).map_err(backend)?;
        drop(conn);

        // Undecodable rows are dropped so one bad record cannot hide the catalog.
        let mut skipped = 0usize;
        let documents: Vec<RecipeDocument> = rows
            .iter()
            .filter_map(|(key, json)| match decode(key, json) {
                Ok(document) => Some(document),
                Err(error) => {
                    skipped += 1;
                    warn!(key = %key, %error, "Skipping undecodable recipe document");
                    None
                }
            })
            .collect();
        debug!(count = documents.len(), skipped, "Loaded recipe catalog");
        Ok(documents)
    }

    fn insert_if_absent(&self, key: &str, document: &RecipeDocument) -> StoreResult<bool> {
        let row = Row::from_document(document)?;
        let conn = self.acquire_conn();
        if Self::contains(&conn, key).map_err(backend)? {
            debug!(key, "Recipe already stored, skipping");
            return Ok(false);
        }
        Self::insert_row(&conn, key, &row).map_err(backend)?;
        Ok(true)
    }

    fn get(&self, key: &str) -> StoreResult<RecipeDocument> {
        let conn = self.acquire_conn();
        let json: Option<String> = conn
            .query_row(
                "SELECT document FROM recipes WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| backend(e.into()))?;
        drop(conn);

        match json {
            Some(json) => decode(key, &json),
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }

    fn replace(&self, key: &str, document: &RecipeDocument) -> StoreResult<()> {
        let row = Row::from_document(document)?;
        let conn = self.acquire_conn();
        match Self::update_row(&conn, key, &row).map_err(backend)? {
            0 => Err(StoreError::NotFound(key.to_string())),
            _ => Ok(()),
        }
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let conn = self.acquire_conn();
        let removed = conn
            .execute("DELETE FROM recipes WHERE key = ?", params![key])
            .map_err(|e| backend(e.into()))?;
        if removed == 0 {
            return Err(StoreError::NotFound(key.to_string()));
        }
        Ok(())
    }

    fn delete_all(&self) -> StoreResult<usize> {
        let conn = self.acquire_conn();
        let removed = conn
            .execute("DELETE FROM recipes", [])
            .map_err(|e| backend(e.into()))?;
        info!(removed, "Cleared recipe catalog");
        Ok(removed)
    }

    fn count(&self) -> StoreResult<usize> {
        let conn = self.acquire_conn();
        conn.query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))
            .map_err(|e| backend(e.into()))
    }
}
