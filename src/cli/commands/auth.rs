use clap::Subcommand;
use serde_json::json;

use crate::api::{ApiClient, LoginRequest, RegisterRequest};
use crate::browser::{History, Navigator};
use crate::cli::config::*;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::guard::DomainPolicy;
use crate::shell::{LoginOutcome, Shell};
use crate::transfer::TransferSource;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Sign in and open the tenant dashboard")]
    Login {
        #[arg(help = "Email address")]
        email: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
        #[arg(long, help = "App URL to sign in from (defaults to the last visited URL)")]
        url: Option<String>,
        #[arg(long, help = "Tenant schema or name to open when the account has several")]
        tenant: Option<String>,
        #[arg(long, help = "Tag the session transfer as started from the homepage demo")]
        demo: bool,
    },

    #[command(about = "Register a new organization")]
    Register {
        #[arg(help = "Organization name")]
        organization: String,
        #[arg(help = "Email address")]
        email: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
        #[arg(long, help = "Password confirmation (prompted for when the password is)")]
        password_confirm: Option<String>,
        #[arg(long, help = "App URL to register from (defaults to the last visited URL)")]
        url: Option<String>,
    },

    #[command(about = "Sign out of the current origin")]
    Logout,

    #[command(about = "Show current authentication status")]
    Status,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login {
            email,
            password,
            url,
            tenant,
            demo,
        } => {
            let password = resolve_password(password)?;
            let mut shell = shell_at(&resolve_url(url)?)?;
            shell.load()?;

            let api = ApiClient::new(&config().api, shell.tokens().clone())?;
            let request = LoginRequest {
                email: email.clone(),
                password,
            };
            let response = match api.login(&request).await {
                Ok(response) => response,
                Err(e) => return output_client_error(&output_format, e),
            };

            let source = if demo {
                TransferSource::HomepageDemo
            } else {
                TransferSource::LoginPage
            };
            let outcome = shell.complete_login(response, Some(email), source)?;
            settle_login(shell, outcome, tenant, &output_format)
        }
        AuthCommands::Register {
            organization,
            email,
            password,
            password_confirm,
            url,
        } => {
            let (password, password_confirm) = resolve_new_password(password, password_confirm)?;
            let mut shell = shell_at(&resolve_url(url)?)?;
            shell.navigate("/register")?;

            let api = ApiClient::new(&config().api, shell.tokens().clone())?;
            let request = RegisterRequest {
                organization_name: organization,
                email: email.clone(),
                password,
                password_confirm,
            };
            let response = match api.register(&request).await {
                Ok(response) => response,
                Err(e) => return output_client_error(&output_format, e),
            };

            let outcome = shell.complete_login(response, Some(email), TransferSource::LoginPage)?;
            settle_login(shell, outcome, None, &output_format)
        }
        AuthCommands::Logout => {
            let mut shell = shell_at(&resolve_url(None)?)?;
            let view = shell.logout()?;
            let location = shell.navigator().location().clone();
            remember(&location)?;
            output_view(&output_format, &location.origin(), &view)
        }
        AuthCommands::Status => {
            let href = resolve_url(None)?;
            let history = History::new(&href)?;
            let location = history.location();
            let tokens = token_store_for(location)?;
            let host_kind =
                DomainPolicy::from_config(&config().domain).classify(&location.hostname);

            match output_format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "origin": location.origin(),
                            "host_kind": host_kind,
                            "signed_in": tokens.has_session(),
                            "has_refresh_token": tokens.get_refresh().is_some(),
                        }))?
                    );
                }
                OutputFormat::Text => {
                    println!("Origin: {} ({:?} domain)", location.origin(), host_kind);
                    if tokens.has_session() {
                        let refresh = if tokens.get_refresh().is_some() { "yes" } else { "no" };
                        println!("Signed in (refresh token: {})", refresh);
                    } else {
                        println!("Not signed in");
                    }
                }
            }
            Ok(())
        }
    }
}

/// Follow a login outcome to the page it lands on. A transfer is followed
/// by loading the tenant URL, as the browser would.
fn settle_login(
    mut shell: Shell<History>,
    outcome: LoginOutcome,
    tenant: Option<String>,
    output_format: &OutputFormat,
) -> anyhow::Result<()> {
    let outcome = match outcome {
        LoginOutcome::SelectTenant(pending) => {
            let Some(wanted) = tenant else {
                let names: Vec<_> = pending.tenants().iter().map(|t| t.schema.as_str()).collect();
                anyhow::bail!(
                    "this account belongs to several workspaces ({}); pass --tenant <schema>",
                    names.join(", ")
                );
            };
            let choice = pending
                .tenants()
                .iter()
                .find(|t| t.schema == wanted || t.name.eq_ignore_ascii_case(&wanted))
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("Tenant '{}' not found for this account", wanted))?;
            shell.select_tenant(pending, &choice)?
        }
        other => other,
    };

    match outcome {
        LoginOutcome::Transferred { url } => {
            let mut tenant_shell = shell_at(&url)?;
            let view = tenant_shell.load()?;
            let location = tenant_shell.navigator().location().clone();
            remember(&location)?;
            output_success(
                output_format,
                &format!("Signed in, session moved to {}", location.origin()),
                None,
            )?;
            output_view(output_format, &location.origin(), &view)
        }
        LoginOutcome::Navigated(view) => {
            let location = shell.navigator().location().clone();
            remember(&location)?;
            output_success(output_format, "Signed in", None)?;
            output_view(output_format, &location.origin(), &view)
        }
        LoginOutcome::SelectTenant(_) => anyhow::bail!("tenant selection did not settle"),
    }
}
