//! Command line interface.
//!
//! `serve` runs the HTTP API. The other commands operate on the database
//! file directly and are meant for provisioning and inspection.

use crate::api::{self, AppState, notify::LogNotifier};
use crate::config::{ConfigError, ServeArgs, ServerConfig};
use chrono::Utc;
use clap::{Parser, Subcommand};
use hrdesk_core::account::bootstrap_admin;
use hrdesk_core::{HrError, Store, StoreCounts, User};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] HrError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("database already exists at {0} (use --force to overwrite)")]
    AlreadyExists(PathBuf),

    #[error("no database at {0} (run `hrdesk init` first)")]
    MissingDatabase(PathBuf),
}

#[derive(Debug, Parser)]
#[command(name = "hrdesk", version, about = "HR administration portal server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve(ServeArgs),

    /// Create an empty database
    Init {
        #[arg(long, env = "HRDESK_DB", default_value = "hrdesk.redb")]
        db: PathBuf,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Create the first administrator account
    CreateAdmin {
        #[arg(long, env = "HRDESK_DB", default_value = "hrdesk.redb")]
        db: PathBuf,

        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "HRDESK_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Print record counts
    Status {
        #[arg(long, env = "HRDESK_DB", default_value = "hrdesk.redb")]
        db: PathBuf,

        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Init { db, force } => cmd_init(&db, force),
        Command::CreateAdmin {
            db,
            name,
            email,
            password,
        } => {
            let admin = cmd_create_admin(&db, &name, &email, &password)?;
            println!("Created administrator {} <{}>", admin.id, admin.email);
            Ok(())
        }
        Command::Status { db, json } => {
            let counts = cmd_status(&db)?;
            print_status(&db, &counts, json)
        }
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

pub async fn cmd_serve(args: ServeArgs) -> Result<(), CliError> {
    let config = ServerConfig::from(args);
    config.validate()?;

    info!(db = %config.db.display(), "opening database");
    let store = Store::open(&config.db)?;
    let notifier = Arc::new(LogNotifier::new(config.reset_url_base.clone()));
    let state = AppState::new(store, config, notifier)?;

    api::serve(state).await?;
    Ok(())
}

pub fn cmd_init(db: &Path, force: bool) -> Result<(), CliError> {
    if db.exists() {
        if !force {
            return Err(CliError::AlreadyExists(db.to_path_buf()));
        }
        std::fs::remove_file(db)?;
    }
    if let Some(parent) = db.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Store::open(db)?;
    info!(db = %db.display(), "database initialized");
    Ok(())
}

pub fn cmd_create_admin(
    db: &Path,
    name: &str,
    email: &str,
    password: &str,
) -> Result<User, CliError> {
    let store = open_existing(db)?;
    let admin = bootstrap_admin(&store, name, email, password, Utc::now())?;
    info!(user_id = %admin.id, "administrator created");
    Ok(admin)
}

pub fn cmd_status(db: &Path) -> Result<StoreCounts, CliError> {
    let store = open_existing(db)?;
    Ok(store.counts()?)
}

fn open_existing(db: &Path) -> Result<Store, CliError> {
    if !db.exists() {
        return Err(CliError::MissingDatabase(db.to_path_buf()));
    }
    Ok(Store::open(db)?)
}

fn print_status(db: &Path, counts: &StoreCounts, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(counts)?);
        return Ok(());
    }
    println!("Database:    {}", db.display());
    println!("Users:       {}", counts.users);
    println!("Departments: {}", counts.departments);
    println!("Positions:   {}", counts.positions);
    println!("Events:      {}", counts.events);
    println!("Leaves:      {}", counts.leaves);
    println!("Attendance:  {}", counts.attendance);
    Ok(())
}
