//! Network proxy server entry point.
//!
//! # Startup
//!
//! ```text
//!     argv ──▶ flags ──▶ logging ──▶ validation ──▶ diagnostics ──▶ server runtime
//!                │                       │
//!                ▼                       ▼
//!          usage error (2)        invalid config (1)
//! ```
//!
//! Parse errors exit through clap (status 2, or 0 for `--help`/`--version`).
//! Validation errors exit with status 1 after logging the violated rule.

use std::process::ExitCode;

use proxy_server::config::{parse_flags, prepare_options};
use proxy_server::net::ListenerRole;
use proxy_server::observability::init_logging;

fn main() -> ExitCode {
    let parsed = match parse_flags(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(err) => err.exit(),
    };

    if let Err(err) = init_logging(parsed.args.log_level) {
        eprintln!("failed to initialize logging: {}", err);
    }

    tracing::info!("proxy-server v{} starting", env!("CARGO_PKG_VERSION"));

    let validated = match prepare_options(parsed) {
        Ok(validated) => validated,
        Err(err) => {
            tracing::error!(error = %err, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let options = validated.options();
    for listener in options.listeners() {
        if listener.role == ListenerRole::Server && options.uses_uds() {
            tracing::info!(uds_name = %options.uds_name, "server listener configured on UDS");
            continue;
        }
        tracing::info!(role = %listener.role, address = %listener, "listener configured");
    }
    tracing::info!(
        strategies = ?validated.proxy_strategies(),
        "Configuration handed to server runtime"
    );

    ExitCode::SUCCESS
}
