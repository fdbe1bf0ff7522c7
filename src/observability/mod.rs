//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! config loading, validation, diagnostics
//!     → tracing events (structured fields)
//!     → logging.rs (subscriber, filter)
//!     → stderr/stdout
//! ```

pub mod logging;

pub use logging::init_logging;
