use clap::Subcommand;
use serde_json::json;

use crate::api::{ApiClient, NewEndpoint};
use crate::browser::Location;
use crate::cli::config::{resolve_url, token_store_for};
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config::config;

#[derive(Subcommand)]
pub enum EndpointCommands {
    #[command(about = "List monitored endpoints")]
    List,

    #[command(about = "Start monitoring an endpoint")]
    Add {
        #[arg(help = "Display name")]
        name: String,
        #[arg(help = "URL to check")]
        url: String,
        #[arg(long, default_value_t = 5, help = "Check interval in minutes")]
        interval: u32,
    },

    #[command(about = "Stop monitoring an endpoint")]
    Delete {
        #[arg(help = "Endpoint ID")]
        id: i64,
    },
}

fn client() -> anyhow::Result<ApiClient> {
    let location = Location::parse(&resolve_url(None)?)?;
    Ok(ApiClient::new(&config().api, token_store_for(&location)?)?)
}

pub async fn handle(cmd: EndpointCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let api = client()?;

    match cmd {
        EndpointCommands::List => {
            let endpoints = match api.list_endpoints().await {
                Ok(endpoints) => endpoints,
                Err(e) => return output_client_error(&output_format, e),
            };

            if endpoints.is_empty() {
                return output_empty_collection(
                    &output_format,
                    "endpoints",
                    "No endpoints monitored yet",
                );
            }

            match output_format {
                OutputFormat::Json => {
                    let body = json!({ "endpoints": endpoints });
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                OutputFormat::Text => {
                    println!(
                        "{:<6} {:<20} {:<10} {:<8} {}",
                        "ID", "NAME", "STATUS", "EVERY", "URL"
                    );
                    println!("{}", "-".repeat(80));
                    for endpoint in &endpoints {
                        println!(
                            "{:<6} {:<20} {:<10} {:<8} {}",
                            endpoint.id,
                            endpoint.name,
                            endpoint.last_status.as_deref().unwrap_or("pending"),
                            format!("{}m", endpoint.interval_minutes),
                            endpoint.url
                        );
                    }
                }
            }
            Ok(())
        }
        EndpointCommands::Add {
            name,
            url,
            interval,
        } => {
            let form = NewEndpoint {
                name,
                url,
                interval_minutes: interval,
            };
            match api.create_endpoint(&form).await {
                Ok(endpoint) => output_success(
                    &output_format,
                    &format!("Monitoring '{}' (id {})", endpoint.name, endpoint.id),
                    Some(json!({ "endpoint": endpoint })),
                ),
                Err(e) => output_client_error(&output_format, e),
            }
        }
        EndpointCommands::Delete { id } => match api.delete_endpoint(id).await {
            Ok(()) => output_success(
                &output_format,
                &format!("Endpoint {} deleted", id),
                Some(json!({ "id": id })),
            ),
            Err(e) => output_client_error(&output_format, e),
        },
    }
}
