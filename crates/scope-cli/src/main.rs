//! scopectl - client scope diagnostics
//!
//! Loads a JSON snapshot of clients, users and entities and runs the scope
//! pipeline against it.
//!
//! # Usage
//!
//! ```bash
//! # Decision for one user
//! scopectl --snapshot agency.json resolve --user u1
//!
//! # Where each grant value went
//! scopectl --snapshot agency.json --config scope.toml explain --user u1
//!
//! # Scoped rows
//! scopectl --snapshot agency.json fetch --user u1 --kind artwork --from 2024-03-01
//! ```

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use scope_core::prelude::*;
use scope_core::{DateWindow, UserId};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "scopectl")]
#[command(version)]
#[command(about = "Inspect role-scoped client access against a data snapshot")]
struct Cli {
    /// JSON snapshot with clients, users and entities
    #[arg(long)]
    snapshot: PathBuf,

    /// TOML scope configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the scope decision for a user
    Resolve {
        /// User id
        #[arg(long)]
        user: String,
    },

    /// Print the per-value resolution report for a user
    Explain {
        /// User id
        #[arg(long)]
        user: String,
    },

    /// Print the scoped entities a user can see
    Fetch {
        /// User id
        #[arg(long)]
        user: String,

        /// Entity kind: calendar_entry, artwork or campaign
        #[arg(long)]
        kind: EntityKind,

        /// First included day (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last included day (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Exact status match
        #[arg(long)]
        status: Option<String>,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn filters(from: Option<NaiveDate>, to: Option<NaiveDate>, status: Option<String>) -> RangeFilters {
    let mut filters = RangeFilters::new();
    if from.is_some() || to.is_some() {
        filters = filters.with_window(DateWindow::new(from, to));
    }
    if let Some(status) = status {
        filters = filters.with_status(status);
    }
    filters
}

fn user_context(snapshot: &Snapshot, user: &str) -> Result<UserContext> {
    let entry = snapshot
        .user(&UserId::from(user))
        .with_context(|| format!("user {user} not found in snapshot"))?;
    Ok(entry.context()?)
}

async fn run(cli: Cli) -> Result<Value> {
    let config = match &cli.config {
        Some(path) => ScopeConfig::load(path)?,
        None => ScopeConfig::new(),
    };
    let snapshot = Arc::new(Snapshot::load(&cli.snapshot)?);
    let service = ScopeService::new(snapshot.clone(), snapshot.clone(), snapshot.clone(), config);
    let cache = RequestCache::new();

    let output = match cli.command {
        Command::Resolve { user } => {
            let ctx = user_context(&snapshot, &user)?;
            serde_json::to_value(service.resolve_scope(&ctx, &cache).await?)?
        }
        Command::Explain { user } => {
            let ctx = user_context(&snapshot, &user)?;
            serde_json::to_value(service.explain(&ctx, &cache).await?)?
        }
        Command::Fetch {
            user,
            kind,
            from,
            to,
            status,
        } => {
            let ctx = user_context(&snapshot, &user)?;
            let decision = service.resolve_scope(&ctx, &cache).await?;
            let result = service
                .fetch_scoped(kind, &decision, &filters(from, to, status))
                .await?;
            if result.partial {
                tracing::warn!(
                    "Result is partial; failed subsets: {:?}",
                    result.failures.iter().map(|f| f.subset).collect::<Vec<_>>()
                );
            }
            serde_json::to_value(result)?
        }
    };
    Ok(output)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(cli).await {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
