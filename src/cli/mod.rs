pub mod commands;
pub mod config;
pub mod utils;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::session::SessionContext;

#[derive(Parser)]
#[command(name = "campus")]
#[command(about = "Campus CLI - administrative client for the education-management API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Authentication and token management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "CRUD operations on users, roles, teachers, students, courses, enrollments, grades and schedule")]
    Data {
        #[command(subcommand)]
        cmd: commands::data::DataCommands,
    },

    #[command(about = "Reports and CSV exports")]
    Report {
        #[command(subcommand)]
        cmd: commands::report::ReportCommands,
    },

    #[command(about = "Show which views the current session may see")]
    Views {
        #[arg(long, help = "YAML view rules (defaults to CAMPUS_VIEWS_FILE or the built-in rules)")]
        file: Option<std::path::PathBuf>,
    },

    #[command(about = "Client configuration")]
    Config {
        #[command(subcommand)]
        cmd: commands::config::ConfigCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Session context over the persisted settings and token file
pub fn build_context() -> anyhow::Result<SessionContext> {
    let settings = config::load_settings()?;
    let store = Arc::new(config::token_store()?);
    let base_url = settings.effective_base_url();
    let login_path = &crate::config::config().api.login_path;

    tracing::debug!(%base_url, "building session context");
    Ok(SessionContext::connect(&base_url, login_path, store)?)
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, output_format).await,
        Commands::Data { cmd } => commands::data::handle(cmd, output_format).await,
        Commands::Report { cmd } => commands::report::handle(cmd, output_format).await,
        Commands::Views { file } => commands::views::handle(file, output_format).await,
        Commands::Config { cmd } => commands::config::handle(cmd, output_format).await,
    }
}
