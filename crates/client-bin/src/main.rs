//! Webclient - command-line front end for the session layer.

mod app;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use client_config_and_utils::{init_logging, init_logging_json, Config, Paths};

/// Webclient command-line interface.
#[derive(Parser)]
#[command(name = "webclient")]
#[command(about = "Sign in to the API and manage the local session")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config and session files. Defaults to ~/.webclient
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "WEBCLIENT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and log into it
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "WEBCLIENT_PASSWORD", hide_env_values = true)]
        password: String,
        /// Defaults to the password
        #[arg(long)]
        password_confirmation: Option<String>,
    },
    /// Log out locally and on the server
    Logout,
    /// Refresh and print the signed-in user
    Whoami,
    /// Print the local session state
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let config = Config::load(&paths)?;

    // Initialize logging
    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    if std::env::var("WEBCLIENT_LOG_FORMAT").is_ok_and(|format| format == "json") {
        init_logging_json(level);
    } else {
        init_logging(level);
    }

    let app = app::App::build(&config, &paths)?;

    match cli.command {
        Commands::Login { email, password } => app.login(email, password).await?,
        Commands::Register {
            name,
            email,
            password,
            password_confirmation,
        } => {
            let password_confirmation = password_confirmation.unwrap_or_else(|| password.clone());
            app.register(name, email, password, password_confirmation)
                .await?
        }
        Commands::Logout => app.logout().await?,
        Commands::Whoami => app.whoami().await?,
        Commands::Status => app.status()?,
    }

    Ok(())
}
