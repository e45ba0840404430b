mod api;
mod cli;
mod config;
mod models;
mod services;
mod store;
mod utils;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::services::importer::DEFAULT_BATCH_SIZE;

#[derive(Parser)]
#[command(name = "madness")]
#[command(about = "NCAA tournament pool analytics: team profiles, win odds and similar historical teams")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },
    /// List the seeded tournament field
    Teams,
    /// Show the analysis for one team
    Team {
        #[arg(short, long)]
        name: String,
    },
    /// Load pre-computed team vectors into the vector database
    ImportVectors {
        #[arg(short, long, default_value = "data/vector_db/chroma_vectors.json")]
        file: PathBuf,
        #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { port }) => {
            tracing::info!("Starting pool analytics API on port {}", port);
            api::serve(settings, port).await?;
        }
        Some(Commands::Teams) => {
            cli::list_teams(&settings).await?;
        }
        Some(Commands::Team { name }) => {
            tracing::info!("Querying team: {}", name);
            cli::query_team(&settings, &name).await?;
        }
        Some(Commands::ImportVectors { file, batch_size }) => {
            tracing::info!("Importing vectors from {}", file.display());
            cli::import_vectors(&settings, &file, batch_size).await?;
        }
        None => {
            // Default to serving
            tracing::info!("Starting pool analytics API on port 8000");
            api::serve(settings, 8000).await?;
        }
    }

    Ok(())
}
