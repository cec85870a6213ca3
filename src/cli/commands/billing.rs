use clap::Subcommand;
use serde_json::json;

use crate::api::ApiClient;
use crate::browser::Location;
use crate::cli::config::{resolve_url, token_store_for};
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config::config;

#[derive(Subcommand)]
pub enum BillingCommands {
    #[command(about = "Start a checkout session for a plan")]
    Checkout {
        #[arg(help = "Plan identifier, e.g. pro")]
        plan: String,
    },
}

pub async fn handle(cmd: BillingCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        BillingCommands::Checkout { plan } => {
            let location = Location::parse(&resolve_url(None)?)?;
            let api = ApiClient::new(&config().api, token_store_for(&location)?)?;

            match api.create_checkout_session(&plan).await {
                Ok(session) => output_success(
                    &output_format,
                    &format!("Open {} to complete checkout", session.checkout_url),
                    Some(json!({
                        "checkout_url": session.checkout_url,
                        "session_id": session.session_id,
                    })),
                ),
                Err(e) => output_client_error(&output_format, e),
            }
        }
    }
}
