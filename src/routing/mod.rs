//! Proxy routing strategies.
//!
//! # Data Flow
//! ```text
//! --proxy-strategies "destHost,default"
//!     → strategy.rs (split, trim, parse each entry)
//!     → Vec<ProxyStrategy> in operator order
//!     → handed to the tunnel runtime with the validated options
//! ```
//!
//! # Design Decisions
//! - Order is significant: the runtime tries each strategy in turn
//! - Unknown names are rejected, never ignored
//! - Strategy names are case-sensitive to match the flag documentation

pub mod strategy;

pub use strategy::{parse_proxy_strategies, ProxyStrategy, StrategyError};
