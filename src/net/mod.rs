//! Network surface described by the startup options.
//!
//! # Data Flow
//! ```text
//! ProxyRunOptions
//!     → listener.rs (four TCP endpoints: server, agent, admin, health)
//!     → tls.rs (frontend/backend certificate material, cipher allow-list)
//!     → validated and handed to the tunnel runtime
//! ```
//!
//! # Design Decisions
//! - Nothing here opens a socket; the runtime binds after validation
//! - The frontend listener may be a Unix-domain socket instead of TCP
//! - Cipher names follow the IANA registry spelling

pub mod listener;
pub mod tls;

pub use listener::{ListenerEndpoint, ListenerRole};
pub use tls::{accepted_ciphers, TlsMaterial, TlsRole};
