//! Habitat console
//!
//! Opens a store, optionally loads a nested JSON seed into it, and serves one
//! browsing session over HTTP:
//!
//!   GET  /api/v1/snapshot   latest hierarchy snapshot
//!   POST /api/v1/events     submit a selection or mutation event
//!   GET  /api/v1/slots      subscriptions currently open
//!
//! Usage:
//!   habitat-console --seed seed.json --http-port 4100
//!   habitat-console --database habitat.duckdb --delete-policy clear-selection

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use habitat_console::{build_router, seed, ConsoleState};
use habitat_hierarchy::HierarchyRepository;
use habitat_session::{DeletePolicy, Session, SessionConfig};
use habitat_storage::{DocumentStore, HierarchyStore, MemoryStore};
use std::{fs, path::PathBuf, sync::Arc};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DeletePolicyArg {
    Retain,
    ClearSelection,
}

impl From<DeletePolicyArg> for DeletePolicy {
    fn from(arg: DeletePolicyArg) -> Self {
        match arg {
            DeletePolicyArg::Retain => DeletePolicy::Retain,
            DeletePolicyArg::ClearSelection => DeletePolicy::ClearSelection,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "habitat-console")]
#[command(about = "Browse the country to flat hierarchy over HTTP")]
struct Args {
    /// Nested JSON seed loaded before the session starts
    #[arg(short, long)]
    seed: Option<PathBuf>,

    /// DuckDB file to keep data in (in-memory when omitted)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// HTTP API port
    #[arg(long, default_value = "4100")]
    http_port: u16,

    /// What happens to the selection when a selected entity is deleted
    #[arg(long, value_enum, default_value = "retain")]
    delete_policy: DeletePolicyArg,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    match &args.database {
        Some(path) => {
            let store = DocumentStore::open_duckdb(path)
                .with_context(|| format!("failed to open database {}", path.display()))?;
            info!("using database {}", path.display());
            serve(Arc::new(store), &args).await
        }
        None => {
            info!("using in-memory store");
            serve(Arc::new(MemoryStore::in_memory()), &args).await
        }
    }
}

async fn serve<S: HierarchyStore>(store: Arc<S>, args: &Args) -> Result<()> {
    if let Some(path) = &args.seed {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read seed {}", path.display()))?;
        let seed_file = seed::SeedFile::parse(&text)
            .with_context(|| format!("malformed seed {}", path.display()))?;
        let report = seed::load(&HierarchyRepository::new(store.clone()), &seed_file)
            .await
            .context("seeding failed")?;
        info!("seeded {report}");
    }

    let config = SessionConfig {
        delete_policy: args.delete_policy.into(),
        ..SessionConfig::default()
    };
    let session = Session::spawn(store, config);
    let app = build_router(Arc::new(ConsoleState::new(session.clone())));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.http_port))
        .await
        .with_context(|| format!("failed to bind HTTP port {}", args.http_port))?;
    info!("HTTP API listening on port {}", args.http_port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .context("HTTP server failed")?;

    session.shutdown().await;
    Ok(())
}
