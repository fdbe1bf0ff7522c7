//! Startup options for the proxy server.
//!
//! This module defines every tunable the server reads at startup and the
//! canonical defaults. Nothing here validates; see
//! [`validation`](crate::config::validation).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use uuid::Uuid;

use crate::net::{ListenerEndpoint, ListenerRole, TlsMaterial, TlsRole};

/// Environment variable consulted for the server ID when `--server-id` is empty.
pub const SERVER_ID_ENV: &str = "PROXY_SERVER_ID";

/// Default values shared by [`ProxyRunOptions::default`] and the flag binder.
pub mod defaults {
    use std::time::Duration;

    pub const MODE: &str = "grpc";
    pub const DELETE_UDS_FILE: bool = true;
    pub const SERVER_PORT: i32 = 8090;
    pub const AGENT_PORT: i32 = 8091;
    pub const HEALTH_PORT: i32 = 8092;
    pub const ADMIN_PORT: i32 = 8095;
    pub const ADMIN_BIND_ADDRESS: &str = "127.0.0.1";
    pub const KEEPALIVE_TIME: Duration = Duration::from_secs(60 * 60);
    pub const FRONTEND_KEEPALIVE_TIME: Duration = Duration::from_secs(60 * 60);
    pub const ENABLE_PROFILING: bool = false;
    pub const ENABLE_CONTENTION_PROFILING: bool = false;
    pub const SERVER_COUNT: u32 = 1;
    pub const KUBECONFIG_QPS: f32 = 0.0;
    pub const KUBECONFIG_BURST: u32 = 0;
    pub const API_CONTENT_TYPE: &str = "application/vnd.kubernetes.protobuf";
    pub const PROXY_STRATEGIES: &str = "default";
    pub const XFR_CHANNEL_SIZE: i64 = 10;
    pub const ENABLE_LEASE_CONTROLLER: bool = false;
    pub const LEASE_NAMESPACE: &str = "kube-system";
    pub const LEASE_LABEL: &str = "k8s-app=konnectivity-server";
}

/// Transport the frontend listener speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProxyMode {
    #[default]
    Grpc,
    HttpConnect,
}

impl ProxyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyMode::Grpc => "grpc",
            ProxyMode::HttpConnect => "http-connect",
        }
    }
}

impl fmt::Display for ProxyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProxyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grpc" => Ok(ProxyMode::Grpc),
            "http-connect" => Ok(ProxyMode::HttpConnect),
            other => Err(other.to_string()),
        }
    }
}

/// Every startup option of the proxy server.
///
/// Empty strings mean "unset" throughout.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyRunOptions {
    /// Certificate securing the frontend (API server) listener.
    pub server_cert: String,
    pub server_key: String,
    /// CA used to verify frontend clients.
    pub server_ca_cert: String,

    /// Certificate securing the agent listener.
    pub cluster_cert: String,
    pub cluster_key: String,
    /// CA used to verify agents.
    pub cluster_ca_cert: String,

    /// `grpc` or `http-connect`; kept raw until validation.
    pub mode: String,

    /// Unix-domain socket for the frontend listener. Setting it disables TCP.
    pub uds_name: String,
    /// Remove a stale socket file before binding.
    pub delete_uds_file: bool,

    pub server_port: i32,
    pub server_bind_address: String,
    pub agent_port: i32,
    pub agent_bind_address: String,
    pub admin_port: i32,
    pub admin_bind_address: String,
    pub health_port: i32,
    pub health_bind_address: String,

    /// Idle time before the agent server pings its peer.
    pub keepalive_time: Duration,
    /// Idle time before the frontend server pings its peer.
    pub frontend_keepalive_time: Duration,

    /// Serve profiles on the admin listener.
    pub enable_profiling: bool,
    /// Also serve lock contention profiles. Requires `enable_profiling`.
    pub enable_contention_profiling: bool,

    pub server_id: String,
    /// Number of proxy server replicas; 1 unless running HA.
    pub server_count: u32,

    /// Expected agent namespace for token authentication.
    pub agent_namespace: String,
    /// Expected agent service account for token authentication.
    pub agent_service_account: String,
    /// Expected token audience for agent authentication.
    pub authentication_audience: String,
    /// Kubeconfig for the cluster client; empty means in-cluster.
    pub kubeconfig_path: String,
    pub kubeconfig_qps: f32,
    pub kubeconfig_burst: u32,
    /// Content type of requests sent to the API server.
    pub api_content_type: String,

    /// Comma-separated, ordered list of proxy strategies.
    pub proxy_strategies: String,

    /// Allowed cipher suites; empty means the platform default list.
    pub cipher_suites: Vec<String>,

    /// Capacity of the frontend and backend data channels.
    pub xfr_channel_size: i64,

    pub enable_lease_controller: bool,
    pub lease_namespace: String,
    /// Label selector for the leases this server publishes and collects.
    pub lease_label: String,
}

impl Default for ProxyRunOptions {
    fn default() -> Self {
        Self {
            server_cert: String::new(),
            server_key: String::new(),
            server_ca_cert: String::new(),
            cluster_cert: String::new(),
            cluster_key: String::new(),
            cluster_ca_cert: String::new(),
            mode: defaults::MODE.to_string(),
            uds_name: String::new(),
            delete_uds_file: defaults::DELETE_UDS_FILE,
            server_port: defaults::SERVER_PORT,
            server_bind_address: String::new(),
            agent_port: defaults::AGENT_PORT,
            agent_bind_address: String::new(),
            admin_port: defaults::ADMIN_PORT,
            admin_bind_address: defaults::ADMIN_BIND_ADDRESS.to_string(),
            health_port: defaults::HEALTH_PORT,
            health_bind_address: String::new(),
            keepalive_time: defaults::KEEPALIVE_TIME,
            frontend_keepalive_time: defaults::FRONTEND_KEEPALIVE_TIME,
            enable_profiling: defaults::ENABLE_PROFILING,
            enable_contention_profiling: defaults::ENABLE_CONTENTION_PROFILING,
            server_id: default_server_id(),
            server_count: defaults::SERVER_COUNT,
            agent_namespace: String::new(),
            agent_service_account: String::new(),
            authentication_audience: String::new(),
            kubeconfig_path: String::new(),
            kubeconfig_qps: defaults::KUBECONFIG_QPS,
            kubeconfig_burst: defaults::KUBECONFIG_BURST,
            api_content_type: defaults::API_CONTENT_TYPE.to_string(),
            proxy_strategies: defaults::PROXY_STRATEGIES.to_string(),
            cipher_suites: Vec::new(),
            xfr_channel_size: defaults::XFR_CHANNEL_SIZE,
            enable_lease_controller: defaults::ENABLE_LEASE_CONTROLLER,
            lease_namespace: defaults::LEASE_NAMESPACE.to_string(),
            lease_label: defaults::LEASE_LABEL.to_string(),
        }
    }
}

impl ProxyRunOptions {
    /// Whether the frontend listens on a Unix-domain socket.
    pub fn uses_uds(&self) -> bool {
        !self.uds_name.is_empty()
    }

    /// Whether any part of service-account agent authentication is configured.
    pub fn uses_service_account_auth(&self) -> bool {
        !self.agent_namespace.is_empty()
            || !self.agent_service_account.is_empty()
            || !self.authentication_audience.is_empty()
    }

    pub fn server_tls(&self) -> TlsMaterial<'_> {
        TlsMaterial {
            role: TlsRole::Server,
            cert: &self.server_cert,
            key: &self.server_key,
            ca_cert: &self.server_ca_cert,
        }
    }

    pub fn cluster_tls(&self) -> TlsMaterial<'_> {
        TlsMaterial {
            role: TlsRole::Cluster,
            cert: &self.cluster_cert,
            key: &self.cluster_key,
            ca_cert: &self.cluster_ca_cert,
        }
    }

    /// The four listeners in server, agent, admin, health order.
    pub fn listeners(&self) -> [ListenerEndpoint; 4] {
        [
            ListenerEndpoint::new(ListenerRole::Server, &self.server_bind_address, self.server_port),
            ListenerEndpoint::new(ListenerRole::Agent, &self.agent_bind_address, self.agent_port),
            ListenerEndpoint::new(ListenerRole::Admin, &self.admin_bind_address, self.admin_port),
            ListenerEndpoint::new(ListenerRole::Health, &self.health_bind_address, self.health_port),
        ]
    }
}

/// Resolve the default server ID from the process environment.
pub fn default_server_id() -> String {
    server_id_from(std::env::var(SERVER_ID_ENV).ok())
}

/// Resolve a server ID: a non-empty environment value wins, otherwise a random UUID.
pub fn server_id_from(env_value: Option<String>) -> String {
    match env_value {
        Some(id) if !id.is_empty() => id,
        _ => Uuid::new_v4().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ProxyRunOptions::default();
        assert_eq!(options.mode, "grpc");
        assert_eq!(options.server_port, 8090);
        assert_eq!(options.agent_port, 8091);
        assert_eq!(options.health_port, 8092);
        assert_eq!(options.admin_port, 8095);
        assert_eq!(options.admin_bind_address, "127.0.0.1");
        assert_eq!(options.keepalive_time, Duration::from_secs(3600));
        assert_eq!(options.frontend_keepalive_time, Duration::from_secs(3600));
        assert_eq!(options.server_count, 1);
        assert_eq!(options.proxy_strategies, "default");
        assert_eq!(options.xfr_channel_size, 10);
        assert_eq!(options.lease_namespace, "kube-system");
        assert!(options.delete_uds_file);
        assert!(options.cipher_suites.is_empty());
        assert!(!options.uses_uds());
        assert!(!options.uses_service_account_auth());
        assert!(!options.server_id.is_empty());
    }

    #[test]
    fn test_server_id_prefers_environment() {
        assert_eq!(server_id_from(Some("proxy-0".into())), "proxy-0");
    }

    #[test]
    fn test_server_id_falls_back_to_uuid() {
        let first = server_id_from(None);
        let second = server_id_from(Some(String::new()));
        assert!(Uuid::parse_str(&first).is_ok());
        assert!(Uuid::parse_str(&second).is_ok());
        assert_ne!(first, second);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("grpc".parse::<ProxyMode>(), Ok(ProxyMode::Grpc));
        assert_eq!("http-connect".parse::<ProxyMode>(), Ok(ProxyMode::HttpConnect));
        assert!("GRPC".parse::<ProxyMode>().is_err());
        assert_eq!(ProxyMode::HttpConnect.to_string(), "http-connect");
    }

    #[test]
    fn test_listeners_order() {
        let roles: Vec<ListenerRole> = ProxyRunOptions::default()
            .listeners()
            .iter()
            .map(|l| l.role)
            .collect();
        assert_eq!(
            roles,
            vec![
                ListenerRole::Server,
                ListenerRole::Agent,
                ListenerRole::Admin,
                ListenerRole::Health
            ]
        );
    }

    #[test]
    fn test_service_account_auth_detection() {
        let options = ProxyRunOptions {
            authentication_audience: "system:konnectivity-server".into(),
            ..ProxyRunOptions::default()
        };
        assert!(options.uses_service_account_auth());
    }
}
