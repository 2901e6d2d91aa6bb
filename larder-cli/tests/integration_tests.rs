//! Integration tests for the Larder CLI
//!
//! Runs the built binary in isolated temp directories. None of these need
//! model weights.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// Get the path to the larder binary (built by cargo)
fn larder_binary() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_larder"));
    cmd.env_remove("LARDER_MODEL_DIR")
        .env_remove("LARDER_DB")
        .env_remove("RUST_LOG");
    cmd
}

/// Run larder with the given args in the specified directory
fn run_larder(dir: &Path, args: &[&str]) -> Output {
    larder_binary()
        .current_dir(dir)
        .args(args)
        .output()
        .expect("Failed to execute larder command")
}

/// Get stdout as string
fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Get stderr as string
fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn json_stdout(output: &Output) -> serde_json::Value {
    serde_json::from_str(&stdout(output)).expect("stdout should be JSON")
}

// ============================================================================
// Help
// ============================================================================

#[test]
fn test_help_lists_commands() {
    let temp = TempDir::new().unwrap();
    let output = run_larder(temp.path(), &["--help"]);

    assert!(output.status.success());
    let text = stdout(&output);
    for command in ["ingest", "search", "get", "delete", "status", "validate"] {
        assert!(text.contains(command), "missing {} in help", command);
    }
}

#[test]
fn test_no_command_prints_help() {
    let temp = TempDir::new().unwrap();
    let output = run_larder(temp.path(), &[]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("Usage"));
}

// ============================================================================
// Status
// ============================================================================

#[test]
fn test_status_without_catalog() {
    let temp = TempDir::new().unwrap();
    let output = run_larder(temp.path(), &["status", "--format", "json"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json = json_stdout(&output);
    assert_eq!(json["catalog_exists"], false);
    assert_eq!(json["total_recipes"], 0);
    assert_eq!(json["model_available"], false);
    assert_eq!(json["top_k"], 5);
    assert!(json["config_file"].is_null());
}

#[test]
fn test_status_reads_config_file() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join(".larder.toml"),
        r#"
[store]
path = "data/catalog.duckdb"

[search]
top_k = 12
min_similarity = 0.3

[output]
format = "json"
"#,
    )
    .unwrap();

    let output = run_larder(temp.path(), &["status"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json = json_stdout(&output);
    assert_eq!(json["store_path"], "data/catalog.duckdb");
    assert_eq!(json["top_k"], 12);
    assert!(json["config_file"].is_string());
}

#[test]
fn test_db_flag_overrides_config() {
    let temp = TempDir::new().unwrap();
    let output = run_larder(
        temp.path(),
        &["status", "--format", "json", "--db", "elsewhere.duckdb"],
    );

    assert!(output.status.success());
    assert_eq!(json_stdout(&output)["store_path"], "elsewhere.duckdb");
}

// ============================================================================
// Catalog access without a catalog
// ============================================================================

#[test]
fn test_get_without_catalog_fails() {
    let temp = TempDir::new().unwrap();
    let output = run_larder(temp.path(), &["get", "38"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("No catalog found"));
}

#[test]
fn test_validate_without_catalog_fails() {
    let temp = TempDir::new().unwrap();
    let output = run_larder(temp.path(), &["validate"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("No catalog found"));
}

#[test]
fn test_search_without_catalog_fails() {
    let temp = TempDir::new().unwrap();
    let output = run_larder(temp.path(), &["search", "chicken, rice"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("No catalog found"));
}

// ============================================================================
// Argument validation
// ============================================================================

#[test]
fn test_search_empty_ingredients_fails() {
    let temp = TempDir::new().unwrap();
    let output = run_larder(temp.path(), &["search", "  "]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("cannot be empty"));
}

#[test]
fn test_search_rejects_bad_threshold() {
    let temp = TempDir::new().unwrap();
    let output = run_larder(temp.path(), &["search", "rice", "-t", "1.5"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("threshold must be between 0.0 and 1.0"));
}

#[test]
fn test_delete_all_requires_yes() {
    let temp = TempDir::new().unwrap();
    let output = run_larder(temp.path(), &["delete", "--all"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("--yes"));
}

#[test]
fn test_delete_all_on_empty_catalog() {
    let temp = TempDir::new().unwrap();
    let output = run_larder(temp.path(), &["delete", "--all", "--yes", "--format", "json"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(json_stdout(&output)["message"], "Catalog is already empty");
}

#[test]
fn test_delete_needs_target() {
    let temp = TempDir::new().unwrap();
    let output = run_larder(temp.path(), &["delete"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Nothing to delete"));
}

// ============================================================================
// Ingest
// ============================================================================

#[test]
fn test_ingest_missing_file_fails() {
    let temp = TempDir::new().unwrap();
    let output = run_larder(temp.path(), &["ingest", "nope.csv"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Source file not found"));
}

#[test]
fn test_ingest_without_model_fails() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("recipes.json"),
        r#"[{"title": "Toast", "ingredients": ["bread", "butter"]}]"#,
    )
    .unwrap();

    let output = run_larder(
        temp.path(),
        &["ingest", "recipes.json", "--model-dir", "no-model-here"],
    );

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to load embedding model"));
    // Nothing is written when the model cannot be loaded.
    assert!(!temp.path().join(".larder").exists());
}
