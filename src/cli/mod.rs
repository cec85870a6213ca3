pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "statuswatch")]
#[command(about = "StatusWatch CLI - headless client for the StatusWatch dashboard")]
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
    #[command(about = "Sign in, register, sign out and session status")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Load a URL in the headless browser (consumes session transfers)")]
    Open {
        #[arg(help = "Absolute URL, e.g. https://acme.statuswatch.example.com/login#session=...")]
        url: String,
    },

    #[command(about = "Manage monitored endpoints")]
    Endpoints {
        #[command(subcommand)]
        cmd: commands::endpoints::EndpointCommands,
    },

    #[command(about = "Subscription and checkout")]
    Billing {
        #[command(subcommand)]
        cmd: commands::billing::BillingCommands,
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

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, output_format).await,
        Commands::Open { url } => commands::open::handle(url, output_format),
        Commands::Endpoints { cmd } => commands::endpoints::handle(cmd, output_format).await,
        Commands::Billing { cmd } => commands::billing::handle(cmd, output_format).await,
    }
}
