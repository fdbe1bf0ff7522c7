//! Startup configuration subsystem.
//!
//! # Data Flow
//! ```text
//! argv / PROXY_SERVER_ID
//!     → flags.rs (clap parse, deprecated switch notices)
//!     → schema.rs (ProxyRunOptions, defaults)
//!     → validation.rs (ordered rules, first violation wins)
//!     → ValidatedOptions (immutable)
//!     → diagnostics.rs (debug dump of every option)
//!     → handed to the server runtime
//! ```
//!
//! # Design Decisions
//! - Options are validated once at startup; there is no reload
//! - Parse errors and validation errors are separate failure classes
//! - Derived values are computed from validated options, never stored

pub mod diagnostics;
pub mod flags;
pub mod loader;
pub mod schema;
pub mod validation;

pub use flags::{parse_flags, ParsedFlags, ProxyRunArgs};
pub use loader::{load_options, prepare_options, ConfigError};
pub use schema::{ProxyMode, ProxyRunOptions};
pub use validation::{ValidatedOptions, ValidationError};
