//! Larder CLI - recipe recommendations from the ingredients you have
//!
//! Builds an embedded recipe catalog from scraped or tabular recipe data and
//! ranks it against an ingredient list by cosine similarity.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Parse and validate a similarity threshold (must be between 0.0 and 1.0)
fn parse_threshold(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!(
            "threshold must be between 0.0 and 1.0, got {}",
            value
        ));
    }
    Ok(value)
}

mod commands;
mod config;
mod constants;
mod extractor;
mod output;
mod sources;

use commands::AppContext;
use config::LarderConfig;
use constants::CONFIG_FILE;
use output::OutputFormat;
use sources::SourceFormat;

/// Recipe recommendations from the ingredients you have.
#[derive(Parser)]
#[command(name = "larder")]
#[command(author, version)]
#[command(about = "Recipe recommendations from the ingredients you have")]
#[command(propagate_version = true)]
#[command(after_help = "Quick Start:
  larder ingest recipes.csv           Build the catalog
  larder search \"chicken, rice\"       Recommend recipes
  larder get 38                       Show a stored recipe
  larder status                       Check catalog and model")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format (overrides config default)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// Config file (default: ./.larder.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding config.json, tokenizer.json and model.safetensors
    #[arg(long, global = true, env = "LARDER_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// Catalog database file
    #[arg(long, global = true, env = "LARDER_DB")]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build recipe documents from a source file and add them to the catalog
    Ingest {
        /// Scraped recipe JSON or recipe CSV export
        file: PathBuf,

        /// Source layout (default: detected from the file extension)
        #[arg(long, value_enum)]
        source: Option<SourceFormat>,

        /// Read at most this many recipes
        #[arg(short, long)]
        limit: Option<usize>,

        /// Also write the built documents to this JSON file
        #[arg(long)]
        dump: Option<PathBuf>,

        /// Store documents even if some fail integrity checks
        #[arg(long)]
        no_validate: bool,
    },

    /// Recommend recipes for a comma-separated ingredient list
    #[command(visible_alias = "s")]
    Search {
        /// Ingredients, e.g. "chicken, tomato, onion"
        ingredients: String,

        /// Maximum results to return (default from config)
        #[arg(short = 'n', long = "limit")]
        top_k: Option<usize>,

        /// Minimum similarity threshold, 0.0-1.0 (default from config)
        #[arg(short, long, value_parser = parse_threshold)]
        threshold: Option<f32>,
    },

    /// Show one stored recipe by key or recipe id
    Get {
        /// Storage key (recipe::38) or recipe id (38)
        key: String,
    },

    /// Delete a recipe, or the whole catalog with --all
    #[command(visible_alias = "rm")]
    Delete {
        /// Storage key or recipe id
        key: Option<String>,

        /// Delete every recipe
        #[arg(long)]
        all: bool,

        /// Confirm deleting every recipe
        #[arg(short, long)]
        yes: bool,
    },

    /// Show catalog and model status
    #[command(visible_alias = "st")]
    Status,

    /// Check stored documents for integrity problems
    Validate,
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug,larder_embeddings=info"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config_file = cli
        .config
        .clone()
        .unwrap_or_else(|| Path::new(".").join(CONFIG_FILE));
    let config = match &cli.config {
        Some(path) => LarderConfig::load_file(path),
        None => LarderConfig::load(Path::new(".")),
    };

    // CLI flag > config default > Table
    let format = cli.format.unwrap_or_else(|| {
        config
            .default_format()
            .and_then(|f| f.parse().ok())
            .unwrap_or(OutputFormat::Table)
    });

    if let Some(use_color) = config.use_color() {
        colored::control::set_override(use_color);
    }

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            let _ = Cli::command().print_help();
            println!();
            return Ok(());
        }
    };

    let ctx = AppContext::new(config, format, cli.model_dir, cli.db, cli.quiet);

    match command {
        Commands::Ingest {
            file,
            source,
            limit,
            dump,
            no_validate,
        } => commands::ingest::run(&ctx, &file, source, limit, dump, no_validate).await,
        Commands::Search {
            ingredients,
            top_k,
            threshold,
        } => commands::search::run(&ctx, &ingredients, top_k, threshold).await,
        Commands::Get { key } => commands::get::run(&ctx, &key).await,
        Commands::Delete { key, all, yes } => {
            commands::delete::run(&ctx, key.as_deref(), all, yes).await
        }
        Commands::Status => commands::status::run(&ctx, &config_file).await,
        Commands::Validate => commands::validate::run(&ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_threshold() {
        assert_eq!(parse_threshold("0.25"), Ok(0.25));
        assert!(parse_threshold("1.5").is_err());
        assert!(parse_threshold("abc").is_err());
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }
}
