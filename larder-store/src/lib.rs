//! Larder Store - DuckDB persistence for the recipe catalog.
//!
//! [`RecipeBase`] implements [`larder_core::RecipeStore`]: documents are kept
//! as JSON next to a few indexed columns (insertion sequence, embedding model
//! and dimension) used for ordering and statistics.

mod recipes;
mod schema;

pub use recipes::{AccessMode, RecipeBase, RecipeStats};
pub use schema::SCHEMA_VERSION;
