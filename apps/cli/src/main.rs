//! # dukan: Operator CLI for Dukan POS
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         CLI Startup                                     │
//! │                                                                         │
//! │  1. Parse arguments (clap) ────────────────────────────────────────────►│
//! │     --db / DUKAN_DB, --config / DUKAN_CONFIG, --json                    │
//! │                                                                         │
//! │  2. Initialize Logging ────────────────────────────────────────────────►│
//! │     tracing-subscriber to stderr, RUST_LOG overrides                    │
//! │                                                                         │
//! │  3. Open Database ─────────────────────────────────────────────────────►│
//! │     platform data dir unless --db, migrations applied                   │
//! │                                                                         │
//! │  4. Run the command ───────────────────────────────────────────────────►│
//! │     commands::* render to stdout (text or --json)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use directories::ProjectDirs;
use tracing_subscriber::EnvFilter;

use dukan_db::{Database, DbConfig};

mod commands;
mod output;

// =============================================================================
// Arguments
// =============================================================================

#[derive(Parser)]
#[command(name = "dukan", about = "Dukan POS operator CLI", version)]
struct Cli {
    /// SQLite database file. Defaults to the platform data directory.
    #[arg(long, global = true, env = "DUKAN_DB")]
    db: Option<PathBuf>,

    /// Sync configuration file. Defaults to the platform config directory.
    #[arg(long, global = true, env = "DUKAN_CONFIG")]
    config: Option<PathBuf>,

    /// Render output as pretty JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations and report status.
    Migrate,
    /// Load the demo catalog into an empty database.
    Seed(SeedArgs),
    #[command(subcommand)]
    User(UserCommands),
    /// Find a variant by SKU or barcode.
    Lookup { code: String },
    #[command(subcommand)]
    Stock(StockCommands),
    #[command(subcommand)]
    Sales(SalesCommands),
    #[command(subcommand)]
    Settings(SettingsCommands),
    #[command(subcommand)]
    Printer(PrinterCommands),
    /// Recent audit entries.
    Audit(AuditArgs),
    #[command(subcommand)]
    Sync(SyncCommands),
}

#[derive(Args)]
struct SeedArgs {
    /// Categories of the built-in catalog to create.
    #[arg(long)]
    categories: Option<usize>,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a user.
    Create(UserCreateArgs),
    /// List users.
    List,
    /// Grant permissions (`manage_users`, `canVoidBill`, ...).
    Grant { username: String, permissions: Vec<String> },
    /// Revoke permissions.
    Revoke { username: String, permissions: Vec<String> },
    /// Set a new password.
    Passwd {
        username: String,
        #[arg(long)]
        password: String,
    },
}

#[derive(Args)]
struct UserCreateArgs {
    username: String,
    #[arg(long)]
    password: String,
    /// Display name; defaults to the username.
    #[arg(long)]
    name: Option<String>,
    #[arg(long, default_value = "cashier")]
    role: String,
    /// Comma-separated permissions.
    #[arg(long, conflicts_with = "all_permissions")]
    permissions: Option<String>,
    /// Grant every permission.
    #[arg(long)]
    all_permissions: bool,
}

#[derive(Subcommand)]
enum StockCommands {
    /// Active variants at or below their reorder threshold.
    Low,
    /// Change stock and record the movement.
    Adjust(StockAdjustArgs),
}

#[derive(Args)]
struct StockAdjustArgs {
    /// SKU or barcode.
    code: String,
    #[arg(allow_hyphen_values = true)]
    delta: i64,
    #[arg(long)]
    reason: Option<String>,
    #[arg(long, default_value = "cli")]
    by: String,
}

#[derive(Subcommand)]
enum SalesCommands {
    /// Totals per payment method.
    Summary(SalesSummaryArgs),
}

#[derive(Args)]
struct SalesSummaryArgs {
    /// First day (YYYY-MM-DD, UTC). Defaults to today.
    #[arg(long)]
    from: Option<String>,
    /// Last day, inclusive. Defaults to `--from`.
    #[arg(long)]
    to: Option<String>,
    /// Include voided sales.
    #[arg(long)]
    include_void: bool,
}

#[derive(Subcommand)]
enum SettingsCommands {
    Get { key: String },
    Set { key: String, value: String },
    List,
}

#[derive(Subcommand)]
enum PrinterCommands {
    List,
    /// Create or replace the printer of a type.
    Set(PrinterSetArgs),
}

#[derive(Args)]
struct PrinterSetArgs {
    /// `receipt`, `label`, ...
    printer_type: String,
    name: String,
    #[arg(long)]
    port: Option<String>,
    /// Paper width in millimetres.
    #[arg(long)]
    width: Option<i64>,
    #[arg(long)]
    inactive: bool,
}

#[derive(Args)]
struct AuditArgs {
    #[arg(long, default_value_t = 20)]
    limit: i64,
    /// Only entries of this username.
    #[arg(long)]
    user: Option<String>,
}

#[derive(Subcommand)]
enum SyncCommands {
    /// Queue counts per status.
    Status,
    /// Push one batch.
    Once,
    /// Run the processor until Ctrl-C.
    Run,
    /// Give failed entries a fresh set of retries.
    RetryFailed,
    /// Delete old completed entries.
    Purge {
        /// Age in days; defaults to `retention_days` from the config.
        #[arg(long)]
        days: Option<i64>,
    },
}

// =============================================================================
// Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let path = match cli.db {
        Some(path) => path,
        None => default_database_path()?,
    };

    let db = Database::new(DbConfig::new(&path).run_migrations(false))
        .await
        .with_context(|| format!("failed to open database {}", path.display()))?;

    if !matches!(cli.command, Commands::Migrate) {
        db.run_migrations().await.context("failed to apply migrations")?;
    }

    let ctx = commands::Context {
        db,
        json: cli.json,
        config_path: cli.config,
    };

    let result = dispatch(&ctx, cli.command).await;
    ctx.db.close().await;
    result
}

async fn dispatch(ctx: &commands::Context, command: Commands) -> Result<()> {
    use commands::*;

    match command {
        Commands::Migrate => admin::migrate(ctx).await,
        Commands::Seed(args) => admin::seed(ctx, args.categories).await,
        Commands::User(command) => match command {
            UserCommands::Create(args) => {
                user::create(
                    ctx,
                    user::CreateUser {
                        name: args.name.unwrap_or_else(|| args.username.clone()),
                        username: args.username,
                        password: args.password,
                        role: args.role,
                        permissions: args.permissions,
                        all_permissions: args.all_permissions,
                    },
                )
                .await
            }
            UserCommands::List => user::list(ctx).await,
            UserCommands::Grant { username, permissions } => {
                user::set_permissions(ctx, &username, &permissions, true).await
            }
            UserCommands::Revoke { username, permissions } => {
                user::set_permissions(ctx, &username, &permissions, false).await
            }
            UserCommands::Passwd { username, password } => {
                user::passwd(ctx, &username, &password).await
            }
        },
        Commands::Lookup { code } => stock::lookup(ctx, &code).await,
        Commands::Stock(command) => match command {
            StockCommands::Low => stock::low(ctx).await,
            StockCommands::Adjust(args) => {
                stock::adjust(ctx, &args.code, args.delta, args.reason, &args.by).await
            }
        },
        Commands::Sales(SalesCommands::Summary(args)) => {
            sales::summary(ctx, args.from.as_deref(), args.to.as_deref(), args.include_void).await
        }
        Commands::Settings(command) => match command {
            SettingsCommands::Get { key } => settings::get(ctx, &key).await,
            SettingsCommands::Set { key, value } => settings::set(ctx, &key, &value).await,
            SettingsCommands::List => settings::list(ctx).await,
        },
        Commands::Printer(command) => match command {
            PrinterCommands::List => settings::printers(ctx).await,
            PrinterCommands::Set(args) => {
                settings::configure_printer(
                    ctx,
                    settings::PrinterArgs {
                        printer_type: args.printer_type,
                        name: args.name,
                        port: args.port,
                        width: args.width,
                        active: !args.inactive,
                    },
                )
                .await
            }
        },
        Commands::Audit(args) => admin::audit(ctx, args.limit, args.user.as_deref()).await,
        Commands::Sync(command) => match command {
            SyncCommands::Status => sync::status(ctx).await,
            SyncCommands::Once => sync::once(ctx).await,
            SyncCommands::Run => sync::run(ctx).await,
            SyncCommands::RetryFailed => sync::retry_failed(ctx).await,
            SyncCommands::Purge { days } => sync::purge(ctx, days).await,
        },
    }
}

// =============================================================================
// Startup Helpers
// =============================================================================

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr so `--json` output stays parseable.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=dukan_db=trace` - Trace one crate
/// - Default: INFO level
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Determines the database file path based on the platform.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/com.dukan.pos/dukan.db`
/// - **Windows**: `%APPDATA%\dukan\pos\data\dukan.db`
/// - **Linux**: `~/.local/share/pos/dukan.db`
fn default_database_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "dukan", "pos")
        .context("could not determine app data directory")?;

    let data_dir = dirs.data_dir();
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;

    Ok(data_dir.join("dukan.db"))
}
