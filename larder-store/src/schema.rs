//! DuckDB schema for the recipe catalog.

/// Current schema version, recorded in `metadata`.
pub const SCHEMA_VERSION: &str = "1";

/// Full document JSON lives in `document`; the other columns are copies of
/// document fields used for ordering and statistics.
pub const SCHEMA_SQL: &str = r#"
CREATE SEQUENCE IF NOT EXISTS recipe_seq START 1;

-- Recipes table: one row per stored document
CREATE TABLE IF NOT EXISTS recipes (
    key VARCHAR PRIMARY KEY,
    seq BIGINT NOT NULL DEFAULT nextval('recipe_seq'),
    recipe_id VARCHAR NOT NULL,
    embedding_model VARCHAR,
    embedding_dim INTEGER,
    document VARCHAR NOT NULL,
    created_at VARCHAR
);

-- Metadata table: schema version
CREATE TABLE IF NOT EXISTS metadata (
    key VARCHAR PRIMARY KEY,
    value VARCHAR
);

CREATE INDEX IF NOT EXISTS idx_recipes_seq ON recipes(seq);
"#;
