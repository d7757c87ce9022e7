mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::CommandContext;
use commands::session::{LoginForm, RegisterForm};
use config::CvasConfig;
use cvas_session::RegistrationRole;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// CLI for the Civil Vehicle Acquisition System session layer
#[derive(Parser, Debug)]
#[command(name = "cvas", about = "CVAS session and access control")]
pub struct Cli {
    /// Path to configuration file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Data directory location (overrides $CVAS_DATA_DIR)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands for configuration inspection
#[derive(Subcommand, Debug)]
#[command(about = "Inspect CLI configuration")]
pub enum ConfigCommands {
    /// Show current effective configuration
    Show,

    /// Write the effective configuration to a TOML file
    Init {
        /// Destination (defaults to the user config directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Top-level commands for cvas
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in with a service number and password
    Login {
        #[arg(long)]
        service_number: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },

    /// Request a new account, pending administrator approval
    Register {
        #[arg(long)]
        service_number: Option<String>,
        #[arg(long)]
        rank: Option<String>,
        /// Full name
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        password: Option<String>,
        /// WORKER or CHECKPOINT_ADMIN
        #[arg(long, default_value = "WORKER")]
        role: RegistrationRole,
    },

    /// Forget the stored session
    Logout,

    /// Show the logged-in profile
    Whoami,

    /// Navigate to a path and show the view it resolves to
    Open { path: String },

    /// Show the navigation menu for the current role
    Menu,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("CVAS_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = CvasConfig::resolve_config(cli.config, cli.data_dir)?;
    debug!(data_dir = %config.data_dir.display(), base_url = %config.api.base_url, "Resolved configuration");

    // Configuration commands never touch the session
    let command = match cli.command {
        Commands::Config { command } => return commands::config::handle_config_command(&config, command),
        command => command,
    };

    // Create command context
    let ctx = CommandContext::new(config)?;

    // Dispatch commands
    match command {
        Commands::Login { service_number, password } => {
            let form = LoginForm {
                service_number: service_number.unwrap_or_default(),
                password: password.unwrap_or_default(),
            };
            commands::session::login(&ctx, form).await?;
        }
        Commands::Register {
            service_number,
            rank,
            name,
            password,
            role,
        } => {
            let form = RegisterForm {
                service_number: service_number.unwrap_or_default(),
                rank: rank.unwrap_or_default(),
                name: name.unwrap_or_default(),
                password: password.unwrap_or_default(),
                role,
            };
            commands::session::register(&ctx, form).await?;
        }
        Commands::Logout => {
            commands::session::logout(&ctx);
        }
        Commands::Whoami => {
            commands::session::whoami(&ctx);
        }
        Commands::Open { path } => {
            commands::navigate::open(&ctx, &path)?;
        }
        Commands::Menu => {
            commands::navigate::show_menu(&ctx)?;
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}
