//! Proxy strategy parsing.
//!
//! # Responsibilities
//! - Map strategy names to [`ProxyStrategy`]
//! - Parse the comma-separated `--proxy-strategies` list
//!
//! # Design Decisions
//! - Empty entries (`"default,,destHost"`) are skipped
//! - A list that yields no strategy at all is an error

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Policy used to pick the agent tunnel for a proxied request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyStrategy {
    /// Pick a random connected agent.
    Default,
    /// Pick an agent that advertised the destination host.
    DestHost,
    /// Pick an agent that advertised itself as a default route.
    DefaultRoute,
}

impl ProxyStrategy {
    /// All strategies, in documentation order.
    pub const ALL: [ProxyStrategy; 3] = [
        ProxyStrategy::Default,
        ProxyStrategy::DestHost,
        ProxyStrategy::DefaultRoute,
    ];

    /// The flag spelling of this strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyStrategy::Default => "default",
            ProxyStrategy::DestHost => "destHost",
            ProxyStrategy::DefaultRoute => "defaultRoute",
        }
    }
}

impl fmt::Display for ProxyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a strategy list cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    #[error("unknown proxy strategy: {0}")]
    Unknown(String),

    #[error("proxy strategies cannot be empty")]
    Empty,
}

impl FromStr for ProxyStrategy {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProxyStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| StrategyError::Unknown(s.to_string()))
    }
}

/// Parse a comma-separated strategy list, preserving order.
pub fn parse_proxy_strategies(input: &str) -> Result<Vec<ProxyStrategy>, StrategyError> {
    let strategies = input
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(ProxyStrategy::from_str)
        .collect::<Result<Vec<_>, _>>()?;

    if strategies.is_empty() {
        return Err(StrategyError::Empty);
    }
    Ok(strategies)
}
