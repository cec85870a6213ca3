use crate::browser::Navigator;
use crate::cli::config::{remember, shell_at};
use crate::cli::utils::output_view;
use crate::cli::OutputFormat;

/// Full page load of `url`; a `/login#session=...` URL completes a transfer.
pub fn handle(url: String, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut shell = shell_at(&url)?;
    let view = shell.load()?;
    let location = shell.navigator().location().clone();
    remember(&location)?;
    output_view(&output_format, &location.origin(), &view)
}
