//! Listener endpoints and the port policy they must satisfy.
//!
//! # Responsibilities
//! - Name the four listeners the proxy server opens
//! - Check a port against the allowed range
//!
//! # Design Decisions
//! - Allowed TCP range is (1024, 49151]: 1024 itself counts as reserved
//! - Ports above 49151 belong to the ephemeral range
//! - Port 0 is only meaningful for the server listener when it runs over UDS
//! - Ports are plain signed integers so out-of-range values reach validation

use std::fmt;

/// Highest port a listener may use; above this is the ephemeral range.
pub const MAX_LISTENER_PORT: i32 = 49151;

/// Ports at or below this value are reserved.
pub const RESERVED_PORT_CEILING: i32 = 1024;

/// The listeners a proxy server opens, in validation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerRole {
    /// Frontend connections from the API server.
    Server,
    /// Backend connections from agents.
    Agent,
    /// Admin endpoints (profiling, metrics).
    Admin,
    /// Health and readiness probes.
    Health,
}

impl ListenerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListenerRole::Server => "server",
            ListenerRole::Agent => "agent",
            ListenerRole::Admin => "admin",
            ListenerRole::Health => "health",
        }
    }
}

impl fmt::Display for ListenerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured (bind address, port) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerEndpoint {
    pub role: ListenerRole,
    /// Empty means the runtime picks its default interface.
    pub bind_address: String,
    pub port: i32,
}

impl ListenerEndpoint {
    pub fn new(role: ListenerRole, bind_address: impl Into<String>, port: i32) -> Self {
        Self {
            role,
            bind_address: bind_address.into(),
            port,
        }
    }

    /// Port lies above the registered range.
    pub fn is_ephemeral(&self) -> bool {
        self.port > MAX_LISTENER_PORT
    }

    /// Port lies in the reserved range.
    ///
    /// `uds_active` only relaxes the rule for the server listener, whose port
    /// must be 0 when it listens on a Unix-domain socket.
    pub fn is_reserved(&self, uds_active: bool) -> bool {
        if self.port > RESERVED_PORT_CEILING {
            return false;
        }
        !(self.role == ListenerRole::Server && uds_active && self.port == 0)
    }
}

impl fmt::Display for ListenerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.bind_address, self.port)
    }
}
