use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::error::ClientError;
use crate::shell::View;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(
    output_format: &OutputFormat,
    message: &str,
    error_code: Option<&str>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// Report a backend failure as a soft message; only unexpected failures
/// propagate.
pub fn output_client_error(output_format: &OutputFormat, err: ClientError) -> anyhow::Result<()> {
    match err {
        ClientError::Storage(e) => Err(e.into()),
        other => output_error(output_format, &other.to_string(), Some(other.error_code())),
    }
}

/// Output the page the shell settled on
pub fn output_view(output_format: &OutputFormat, origin: &str, view: &View) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "origin": origin,
                    "page": view.page,
                    "path": view.path,
                    "state": view.state,
                }))?
            );
        }
        OutputFormat::Text => {
            println!("{} - {}{}", view.page.title(), origin, view.path);
            if let Some(message) = &view.state.message {
                println!("  {}", message);
            }
            if let Some(target) = &view.state.redirect_to {
                println!("  (returns to {} after sign-in)", target);
            }
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(
    output_format: &OutputFormat,
    collection_name: &str,
    message: &str,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ collection_name: [] }))?);
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

/// Read a secret from the given value, an environment variable, or stdin.
pub fn resolve_password(provided: Option<String>) -> anyhow::Result<String> {
    if let Some(password) = provided.or_else(|| std::env::var("STATUSWATCH_PASSWORD").ok()) {
        return Ok(password);
    }
    prompt_secret("Password: ")
}

/// Password plus its confirmation for registration. A confirmation is
/// prompted for whenever the password itself was typed in; a password
/// passed on the command line or in the environment is its own
/// confirmation unless `--password-confirm` says otherwise.
pub fn resolve_new_password(
    provided: Option<String>,
    confirm: Option<String>,
) -> anyhow::Result<(String, String)> {
    let provided = provided.or_else(|| std::env::var("STATUSWATCH_PASSWORD").ok());
    match (provided, confirm) {
        (Some(password), Some(confirm)) => Ok((password, confirm)),
        (Some(password), None) => Ok((password.clone(), password)),
        (None, confirm) => {
            let password = prompt_secret("Password: ")?;
            let confirm = match confirm {
                Some(confirm) => confirm,
                None => prompt_secret("Confirm password: ")?,
            };
            Ok((password, confirm))
        }
    }
}

fn prompt_secret(label: &str) -> anyhow::Result<String> {
    eprint!("{label}");
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let secret = line.trim_end_matches(['\r', '\n']).to_string();
    if secret.is_empty() {
        anyhow::bail!("a password is required");
    }
    Ok(secret)
}
