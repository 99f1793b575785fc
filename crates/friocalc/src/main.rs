use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod app;
mod backend;
mod calculator;
mod config;
mod editor;
mod error;
mod history;
mod inflight;
mod session;
mod shell;
#[cfg(test)]
mod stub;
mod types;

use app::App;
use calculator::{format_number, Inputs};
use config::{Config, Lifecycle};

#[derive(Parser, Debug)]
#[command(name = "friocalc")]
#[command(about = "BTU calculator with a personal calculation history")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Backend base URL (overrides FRIOCALC_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// How edits and removals reach the backend (overrides FRIOCALC_LIFECYCLE)
    #[arg(long, value_enum, global = true)]
    lifecycle: Option<Lifecycle>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive calculator and history (default)
    Shell,

    /// Compute a BTU estimate without touching the server
    Calc {
        /// Floor area in square metres
        #[arg(long)]
        area: String,

        /// Number of occupants
        #[arg(long)]
        people: String,

        /// Number of heat-producing appliances
        #[arg(long)]
        appliances: String,
    },

    /// Log in with FRIOCALC_USER / FRIOCALC_PASSWORD and print the history
    History,
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level))
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("reqwest=warn".parse().unwrap());

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_max_level(Level::TRACE)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level);

    match args.command {
        Some(Commands::Calc {
            area,
            people,
            appliances,
        }) => {
            let inputs = Inputs::parse(&area, &people, &appliances)?;
            println!("{}", format_number(inputs.btu()));
        }
        Some(Commands::History) => {
            let config = load_config(&args)?;
            history_command(&config).await?;
        }
        None | Some(Commands::Shell) => {
            let config = load_config(&args)?;
            let app = App::from_config(&config)?;
            info!(url = %config.base_url, lifecycle = ?config.lifecycle, "Starting shell");

            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            shell::Shell::new(&app, stdin, std::io::stdout(), std::io::stderr())
                .run(config.credentials.as_ref())
                .await?;
        }
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<Config> {
    Config::from_env()
        .context("Failed to load configuration")?
        .with_overrides(args.url.as_deref(), args.lifecycle)
}

async fn history_command(config: &Config) -> Result<()> {
    let credentials = config
        .credentials
        .as_ref()
        .context("FRIOCALC_USER and FRIOCALC_PASSWORD must be set")?;

    let app = App::from_config(config)?;
    app.login(&credentials.username, &credentials.password)
        .await
        .context("Login failed")?;

    for line in shell::render_history(&app.visible_history(), app.visible_count()) {
        println!("{}", line);
    }

    app.logout().await.context("Logout failed")?;
    Ok(())
}
