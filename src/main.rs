//! Partmatch CLI - serve the GraphQL API and manage its configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use partmatch::config::{self, AppConfig};
use partmatch::SqliteStore;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "partmatch")]
#[command(version = "0.1.0")]
#[command(about = "GraphQL API for parts and messages, with model-suggested classification")]
#[command(long_about = r#"
Partmatch stores a catalog of parts and incoming messages. Every new message
is classified against the catalog by a chat-completion model and linked to the
matching part.

Example usage:
  partmatch init
  OPENAI_API_KEY=sk-... partmatch serve --port 4000
  partmatch stats --database partmatch.db
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the GraphQL server
    Serve {
        /// Path to the config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Path to the database file (overrides config and DATABASE_URL)
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Write a config file template
    Init {
        /// Where to write the config
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the GraphQL schema (SDL)
    Schema,

    /// Show part and message counts
    Stats {
        /// Path to the config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Serve { config, database, port } => {
            let mut app_config = AppConfig::load(config.as_deref())?;
            if let Some(database) = database {
                app_config.database = database.to_string_lossy().to_string();
            }
            if let Some(port) = port {
                app_config.port = port;
            }

            tracing::info!("Using database {}", app_config.database);
            partmatch::server::start_server(&app_config).await?;
        }

        Commands::Init { path, force } => {
            let path = path.unwrap_or_else(config::default_config_path);
            config::write_config(&path, &AppConfig::default(), force)?;
            println!("✅ Wrote config to {}", path.display());
        }

        Commands::Schema => {
            println!("{}", partmatch::graphql::schema_sdl());
        }

        Commands::Stats { config, database } => {
            let app_config = AppConfig::load(config.as_deref())?;
            let database = database.unwrap_or_else(|| app_config.database_path());
            if !database.exists() {
                anyhow::bail!("no database at {}", database.display());
            }

            let store = SqliteStore::open(&database)?;
            let stats = store.stats()?;

            println!("📊 Partmatch Statistics ({:?})", database);
            println!("------------------------------------");
            println!("{}", stats);
        }
    }

    Ok(())
}
