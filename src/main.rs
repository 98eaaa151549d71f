//! # OSINT Harness CLI (`osint`)
//!
//! ## Usage
//!
//! ```bash
//! osint --config ./config/osint.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `osint init` | Create the SQLite database and schema |
//! | `osint sources` | List providers and whether they are configured |
//! | `osint classify <query>` | Print the detected indicator type |
//! | `osint investigate <query>` | Query all applicable providers |
//! | `osint similar <case-id>` | Cases similar to a saved case |
//! | `osint search "<text>"` | Semantic search over saved cases |
//! | `osint serve` | Start the HTTP server |
//!
//! Provider credentials are read from the environment (`SHODAN_API_KEY`,
//! `VIRUSTOTAL_API_KEY`, `HIBP_API_KEY`, `CENSYS_API_ID`/`CENSYS_API_SECRET`,
//! `GREYNOISE_API_KEY`, `INTELX_API_KEY`, `OPENAI_API_KEY`).

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use osint_harness::app::App;
use osint_harness::config::{self, Config};
use osint_harness::credentials::Credentials;
use osint_harness::sources::status::list_sources;
use osint_harness::{commands, migrate, server};

/// OSINT Harness: query threat-intelligence providers and find related
/// investigations.
#[derive(Parser)]
#[command(name = "osint", version)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// A missing file at the default location means built-in defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Enable debug logging (overrides RUST_LOG).
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// List providers, their credentials status, and rate limits.
    Sources,

    /// Print the indicator type detected for a query.
    Classify {
        query: String,
    },

    /// Query every applicable provider and print the aggregated result.
    Investigate {
        query: String,

        /// Force the indicator type (`ip`, `domain`, `email`, `hash`, `url`, `auto`).
        #[arg(long = "type")]
        query_type: Option<String>,

        /// Save the investigation as a case.
        #[arg(long)]
        save: bool,
    },

    /// List cases similar to a saved case.
    Similar {
        case_id: String,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Semantic search over saved cases.
    Search {
        text: String,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

const DEFAULT_CONFIG: &str = "./config/osint.toml";

fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG) {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    config::load_config(path)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Commands that don't require config
    if let Commands::Classify { query } = &cli.command {
        return commands::run_classify(query);
    }

    let cfg = load_config(&cli.config)?;
    let credentials = Credentials::from_env();

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sources => {
            list_sources(&cfg, &credentials);
        }
        Commands::Classify { .. } => unreachable!(),
        Commands::Investigate {
            query,
            query_type,
            save,
        } => {
            let app = App::open(cfg, credentials).await?;
            commands::run_investigate(&app, &query, query_type, save).await?;
        }
        Commands::Similar { case_id, limit } => {
            let app = App::open(cfg, credentials).await?;
            commands::run_similar(&app, &case_id, limit).await?;
        }
        Commands::Search { text, limit } => {
            let app = App::open(cfg, credentials).await?;
            commands::run_search(&app, &text, limit).await?;
        }
        Commands::Serve => {
            let app = Arc::new(App::open(cfg, credentials).await?);
            server::run_server(app).await?;
        }
    }

    Ok(())
}
