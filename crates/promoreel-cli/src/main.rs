//! PromoReel CLI tool.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "promoreel")]
#[command(about = "PromoReel video job CLI", long_about = None)]
struct Cli {
    /// API server URL
    #[arg(long, env = "PROMOREEL_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a video job
    Submit {
        /// Template name (A, B, C or crowned, dethroned, dynamic)
        #[arg(long, short)]
        template: String,
        /// JSON file with the template parameters
        #[arg(long, short)]
        params: PathBuf,
        /// Render only; do not publish
        #[arg(long)]
        no_publish: bool,
        /// Wait for the job to finish and print the final record
        #[arg(long, short)]
        wait: bool,
    },
    /// Show a job
    Status {
        /// Job ID
        id: String,
    },
    /// List recent jobs
    List {
        /// Only show jobs in this status
        #[arg(long)]
        status: Option<String>,
        /// Maximum number of jobs to show
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Check that the API server is up
    Health,
    /// Validate an engine configuration file
    Validate {
        /// Path to the configuration file
        #[arg(default_value = "promoreel.kdl")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Submit {
            template,
            params,
            no_publish,
            wait,
        } => {
            let api = commands::ApiClient::new(&cli.api_url)?;
            commands::videos::submit(&api, &template, &params, !no_publish, wait).await?;
        }
        Commands::Status { id } => {
            let api = commands::ApiClient::new(&cli.api_url)?;
            commands::videos::status(&api, &id).await?;
        }
        Commands::List { status, limit } => {
            let api = commands::ApiClient::new(&cli.api_url)?;
            commands::videos::list(&api, status, limit).await?;
        }
        Commands::Health => {
            let api = commands::ApiClient::new(&cli.api_url)?;
            commands::health(&api).await?;
        }
        Commands::Validate { path } => {
            commands::validate(&path)?;
        }
    }

    Ok(())
}
