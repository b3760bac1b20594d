use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod error;
mod evaluate;
mod http;
mod import;
mod models;
mod notify;
mod store;
mod workflow;

use crate::db::PgStore;
use crate::workflow::Workflow;

#[derive(Parser)]
#[command(name = "checkin-interventions")]
#[command(about = "Daily check-in tracker and intervention workflow for Group Scholar", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed students
    Seed,
    /// Replay daily check-ins from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Run the HTTP API
    Serve {
        #[arg(long, env = "PORT", default_value_t = 4000)]
        port: u16,
        #[arg(long, env = "INTERVENTION_WEBHOOK_URL")]
        webhook_url: Option<String>,
    },
}

async fn connect() -> anyhow::Result<PgPool> {
    let options = config::database_options()?;
    PgPoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("failed to connect to Postgres")
}

fn build_workflow(pool: PgPool, webhook_url: Option<&str>) -> anyhow::Result<Workflow> {
    let notifier = notify::webhook_from_url(webhook_url)?;
    if notifier.is_some() {
        info!(url = webhook_url.unwrap_or_default(), "intervention webhook enabled");
    } else {
        info!("intervention webhook disabled");
    }
    Ok(Workflow::new(Arc::new(PgStore::new(pool)), notifier))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let pool = connect().await?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let upserted = db::seed(&pool).await?;
            println!("Seeded {upserted} students.");
        }
        Commands::Import { csv } => {
            // Replayed history is not announced downstream.
            let workflow = build_workflow(pool, None)?;
            let summary = import::import_csv(&workflow, &csv).await?;
            println!(
                "Imported check-ins from {}: {} on track, {} pending mentor review, {} skipped.",
                csv.display(),
                summary.passed,
                summary.failed,
                summary.skipped
            );
        }
        Commands::Serve { port, webhook_url } => {
            let webhook_url = config::webhook_url(webhook_url);
            let workflow = build_workflow(pool, webhook_url.as_deref())?;
            let app = http::create_router(workflow);

            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind to {addr}"))?;
            info!(%addr, "server started");

            axum::serve(listener, app).await.context("server exited")?;
        }
    }

    Ok(())
}
