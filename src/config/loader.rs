//! Configuration loading from the command line.

use std::ffi::OsString;

use thiserror::Error;

use crate::config::diagnostics::print_options;
use crate::config::flags::{parse_flags, ParsedFlags};
use crate::config::validation::{ValidatedOptions, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Unknown flag or malformed value. Raised before any validation.
    #[error("{0}")]
    Parse(#[from] clap::Error),

    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),
}

/// Validate parsed flags and log the effective configuration.
pub fn prepare_options(parsed: ParsedFlags) -> Result<ValidatedOptions, ValidationError> {
    for flag in &parsed.deprecated {
        tracing::warn!(
            flag = flag.name,
            "Flag --{} has been deprecated, {}",
            flag.name,
            flag.message
        );
    }

    let validated = parsed.args.into_options().validate()?;
    print_options(&validated);

    let options = validated.options();
    tracing::info!(
        server_id = %options.server_id,
        mode = %validated.mode(),
        uds = !options.uds_name.is_empty(),
        needs_kubernetes_client = validated.needs_kubernetes_client(),
        "Configuration validated"
    );
    Ok(validated)
}

/// Parse and validate command-line arguments. The first item is the program name.
pub fn load_options<I, T>(args: I) -> Result<ValidatedOptions, ConfigError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let parsed = parse_flags(args)?;
    Ok(prepare_options(parsed)?)
}
