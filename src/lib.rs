//! Startup configuration for the network proxy server.
//!
//! The proxy server bridges an API server (frontend) and a fleet of remote
//! agents (backend). This crate owns the part of startup that runs before
//! any socket opens: flags, defaults and validation.

pub mod config;
pub mod lease;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::{load_options, ConfigError, ProxyRunOptions, ValidatedOptions, ValidationError};
