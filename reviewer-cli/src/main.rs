//! PR Reviewer CLI - command line interface for reviewer assignment
//!
//! Creates teams, opens pull requests with automatically assigned reviewers,
//! and keeps reviews staffed as team members come and go.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use reviewer_core::{CliOverrides, Config, StorageBackend};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{PrArgs, TeamArgs, UserArgs};

/// Assign and reconcile pull request reviewers
#[derive(Parser, Debug)]
#[command(name = "pr-reviewer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.config/pr-reviewer/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Storage backend: sqlite or memory (overrides config and env)
    #[arg(long, global = true)]
    storage: Option<StorageBackend>,

    /// Database file (overrides config and env)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Manage teams and bulk deactivation
    #[command(visible_alias = "t")]
    Team(TeamArgs),

    /// Manage individual users
    #[command(visible_alias = "u")]
    User(UserArgs),

    /// Open, merge, and reassign pull requests
    Pr(PrArgs),

    /// Show review assignment counts per user
    Stats,

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        backend: cli.storage,
        db_path: cli.db.clone(),
        log_level: cli.verbose.then(|| "debug".to_string()),
    };
    let config = match Config::load_with_overrides(cli.config.as_deref(), overrides) {
        Ok(config) => config,
        Err(err) => {
            report(&err.into());
            return ExitCode::FAILURE;
        }
    };

    // RUST_LOG wins over the configured level
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    tracing::debug!(
        backend = %config.storage.backend,
        path = ?config.storage.path,
        timeout = ?config.engine.transaction_timeout,
        "Configuration loaded"
    );

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Option<Commands>, config: &Config) -> anyhow::Result<()> {
    match command {
        Some(Commands::Version) => {
            println!("pr-reviewer {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Team(args)) => {
            let engine = commands::open_engine(config).await?;
            args.execute(&engine).await?;
        }
        Some(Commands::User(args)) => {
            let engine = commands::open_engine(config).await?;
            args.execute(&engine).await?;
        }
        Some(Commands::Pr(args)) => {
            let engine = commands::open_engine(config).await?;
            args.execute(&engine).await?;
        }
        Some(Commands::Stats) => {
            let engine = commands::open_engine(config).await?;
            commands::print_json(&engine.assignment_stats().await?)?;
        }
        Some(Commands::Config) => show_config(config),
        None => {
            println!("pr-reviewer - pull request reviewer assignment");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

fn show_config(config: &Config) {
    println!("PR Reviewer Configuration");
    println!("=========================");
    println!();
    println!("log_level: {}", config.log_level);
    println!();
    println!("Storage Settings:");
    println!("  backend: {}", config.storage.backend);
    match &config.storage.path {
        Some(path) => println!("  path: {}", path.display()),
        None => println!("  path: (default cache location)"),
    }
    println!("  max_connections: {}", config.storage.max_connections);
    println!("  busy_timeout: {:?}", config.storage.busy_timeout);
    println!();
    println!("Engine Settings:");
    println!(
        "  transaction_timeout: {:?}",
        config.engine.transaction_timeout
    );
    println!();
    if let Some(path) = Config::default_config_path() {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }
}

/// Print an error on stderr; engine errors use the JSON error body
fn report(err: &anyhow::Error) {
    match err.downcast_ref::<reviewer_core::Error>() {
        Some(core) => match serde_json::to_string(&core.to_response()) {
            Ok(body) => eprintln!("{}", body),
            Err(_) => eprintln!("Error: {}", core),
        },
        None => eprintln!("Error: {:#}", err),
    }
}
