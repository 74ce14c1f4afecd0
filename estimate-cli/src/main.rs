use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, warn};

use estimate_cli::app::{self, HeaderEdit};
use estimate_cli::config::AppConfig;
use estimate_cli::logging;
use estimate_core::proposal::RegenerateOutcome;
use estimate_core::session::FlushOutcome;

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Construction estimate calculator.
///
/// Opens the configured estimate database and prices, versions and
/// generates proposals for stored estimates.
#[derive(Debug, Parser)]
struct Cli {
    /// Path to the TOML configuration file. A missing file means defaults.
    #[arg(long, default_value = "estimator.toml")]
    config: PathBuf,

    /// Database backend, overriding the config file.
    #[arg(long)]
    backend: Option<String>,

    /// Database connection string, overriding the config file.
    /// For SQLite this is a file path (e.g. `estimates.db`) or `:memory:`.
    #[arg(long)]
    db: Option<String>,

    /// Log level or EnvFilter directive, overriding the config file.
    #[arg(long)]
    log_level: Option<String>,

    /// Hide log output on stderr. File logging is unaffected.
    #[arg(long, short)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import an estimate from a JSON document.
    Import {
        /// Path to the JSON file.
        file: PathBuf,
    },
    /// List the latest version of every estimate.
    List,
    /// Print section totals, markup and grand total.
    Summary {
        /// Estimate id or slug.
        estimate: String,
    },
    /// Explain how one line item's total is computed.
    Breakdown {
        /// Estimate id or slug.
        estimate: String,
        /// Item id.
        item: String,
    },
    /// Generate a proposal from a template and print its HTML.
    Proposal {
        /// Estimate id or slug.
        estimate: String,
        /// Template id.
        template: String,
        /// Overwrite a hand-edited proposal.
        #[arg(long)]
        force: bool,
        /// Store this HTML file as a hand edit instead of generating.
        #[arg(long, value_name = "FILE", conflicts_with = "force")]
        edited: Option<PathBuf>,
    },
    /// Edit header fields and save through the autosave session.
    Edit {
        /// Estimate id or slug.
        estimate: String,
        #[arg(long)]
        customer: Option<String>,
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        job_address: Option<String>,
        #[arg(long)]
        project: Option<String>,
        /// Markup percentage, e.g. `15` or `15%`.
        #[arg(long)]
        markup: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    /// Save the next version of an estimate.
    Version {
        /// Estimate id or slug.
        estimate: String,
    },
    /// Copy an estimate into a new estimate number.
    Copy {
        /// Estimate id or slug.
        estimate: String,
    },
    /// List fringe benefit profiles.
    Fringes,
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("cannot load config '{}'", cli.config.display()))?;
    if let Some(backend) = cli.backend {
        config.database.backend = backend;
    }
    if let Some(db) = cli.db {
        config.database.connection_string = db;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    logging::init_logging(&config.logging.level);
    if cli.quiet {
        logging::set_stderr_enabled(false)?;
    }
    if let Some(path) = &config.logging.file {
        logging::enable_file_logging(path)?;
    }
    debug!(config = %cli.config.display(), "configuration loaded");

    let repo = app::open_repository(&config.database.db_config()).await?;
    let repo = repo.as_ref();

    match cli.command {
        Command::Import { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("cannot read '{}'", file.display()))?;
            let estimate = app::import_estimate(repo, &json).await?;
            println!(
                "imported estimate {} as id {}",
                estimate.estimate_number,
                estimate.id.unwrap_or_default()
            );
        }
        Command::List => print!("{}", app::list(repo).await?),
        Command::Summary { estimate } => print!("{}", app::summary(repo, &estimate).await?),
        Command::Breakdown { estimate, item } => {
            print!("{}", app::breakdown(repo, &estimate, &item).await?)
        }
        Command::Proposal {
            estimate,
            template,
            edited: Some(file),
            ..
        } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("cannot read '{}'", file.display()))?;
            app::save_edited_proposal(repo, &estimate, &template, html).await?;
            println!("saved edited proposal for template {template}");
        }
        Command::Proposal {
            estimate,
            template,
            force,
            edited: None,
        } => {
            let (outcome, html) = app::proposal(repo, &estimate, &template, force).await?;
            if outcome == RegenerateOutcome::KeptCustom {
                warn!("proposal was edited by hand; pass --force to regenerate it");
            }
            println!("{html}");
        }
        Command::Edit {
            estimate,
            customer,
            contact,
            job_address,
            project,
            markup,
            status,
        } => {
            let edit = HeaderEdit {
                customer,
                contact,
                job_address,
                project_name: project,
                markup,
                status,
            };
            match app::edit_estimate(repo, &estimate, edit, config.autosave.debounce()).await? {
                FlushOutcome::Saved => println!("saved"),
                FlushOutcome::Reconciled { error, .. } => {
                    anyhow::bail!("edit not saved: {error}")
                }
                FlushOutcome::Clean | FlushOutcome::Pending => println!("nothing to save"),
            }
        }
        Command::Version { estimate } => {
            let created = app::new_version(repo, &estimate).await?;
            println!(
                "created {} (id {})",
                created.slug.unwrap_or_default(),
                created.id.unwrap_or_default()
            );
        }
        Command::Copy { estimate } => {
            let created = app::copy_estimate(repo, &estimate).await?;
            println!(
                "created {} (id {})",
                created.slug.unwrap_or_default(),
                created.id.unwrap_or_default()
            );
        }
        Command::Fringes => print!("{}", app::fringes(repo).await?),
    }

    Ok(())
}
