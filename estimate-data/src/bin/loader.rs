use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use estimate_data::FringeConstantLoader;
use estimate_db_sqlite::SqliteRepository;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Load fringe benefit profiles from a CSV file into the database.
///
/// The CSV file should have the following columns:
/// - name: Profile name referenced by labor items (e.g., Union)
/// - w_comp_percent: Workers-compensation percentage (e.g., 12 or 12%)
/// - payroll_tax_percent: Payroll-tax percentage (e.g., 9.65)
/// - fringe_amount: Fringe dollars per hour (e.g., 18.40)
#[derive(Parser, Debug)]
#[command(name = "estimate-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CSV file containing fringe profiles
    #[arg(short, long)]
    file: PathBuf,

    /// SQLite database path or URL (created if missing)
    #[arg(short, long, default_value = "estimates.db")]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,

    /// Run seed files from the specified directory after migrations
    #[arg(short, long)]
    seeds: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .without_time()
        .with_target(false)
        .init();

    let args = Args::parse();

    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if args.migrate {
        info!("Running migrations...");
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
        info!("Migrations complete.");
    }

    if let Some(seeds_dir) = &args.seeds {
        info!("Running seeds from: {}", seeds_dir.display());
        repo.run_seeds(seeds_dir)
            .await
            .with_context(|| format!("Failed to run seeds from: {}", seeds_dir.display()))?;
        info!("Seeds complete.");
    }

    info!("Loading fringe profiles from: {}", args.file.display());

    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open: {}", args.file.display()))?;

    let records = FringeConstantLoader::parse(file)
        .with_context(|| format!("Failed to parse CSV: {}", args.file.display()))?;

    info!("Parsed {} records from CSV", records.len());

    let loaded = FringeConstantLoader::load(&repo, &records)
        .await
        .context("Failed to load fringe profiles into database")?;

    println!("Successfully loaded {} fringe profiles into the database.", loaded);

    Ok(())
}
