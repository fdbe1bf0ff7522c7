//! Command-line flags.
//!
//! # Responsibilities
//! - Declare one `--long` switch per startup option, with default and help
//! - Apply parsed flags onto [`ProxyRunOptions`]
//! - Report deprecated switches the operator still passes
//!
//! # Design Decisions
//! - Boolean switches take an optional `=value` so defaults of `true` can be
//!   turned off; `1`/`0`, `t`/`f`, `yes`/`no` and any casing are accepted
//! - Every default comes from [`defaults`], the same constants that back
//!   [`ProxyRunOptions::default`]
//! - Durations use humantime syntax (`1h`, `90s`, `1h30m`)
//! - Ports are signed so out-of-range values fail validation, not parsing
//! - `--server-id` has no static default; an empty value defers to the
//!   environment and then to a random ID

use std::ffi::OsString;

use clap::builder::BoolishValueParser;
use clap::parser::ValueSource;
use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};
use humantime::Duration;

use crate::config::schema::{defaults, server_id_from, ProxyRunOptions, SERVER_ID_ENV};

/// A switch that is still accepted but no longer has any effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeprecatedFlag {
    /// Argument id as declared on [`ProxyRunArgs`].
    pub id: &'static str,
    /// Switch spelling on the command line.
    pub name: &'static str,
    pub message: &'static str,
}

const WARN_ON_CHANNEL_LIMIT_MESSAGE: &str =
    "This behavior is now thread safe and always on. This flag will be removed in a future release.";

pub const DEPRECATED_FLAGS: &[DeprecatedFlag] = &[DeprecatedFlag {
    id: "warn_on_channel_limit",
    name: "warn-on-channel-limit",
    message: WARN_ON_CHANNEL_LIMIT_MESSAGE,
}];

/// Startup flags of the proxy server.
#[derive(Debug, Clone, Parser)]
#[command(name = "proxy-server")]
#[command(about = "Network proxy bridging an API server and remote agents", long_about = None)]
#[command(version)]
pub struct ProxyRunArgs {
    /// If non-empty secure communication with this cert.
    #[arg(long, default_value = "")]
    pub server_cert: String,

    /// If non-empty secure communication with this key.
    #[arg(long, default_value = "")]
    pub server_key: String,

    /// If non-empty the CA we use to validate API server clients.
    #[arg(long, default_value = "")]
    pub server_ca_cert: String,

    /// If non-empty secure communication with this cert.
    #[arg(long, default_value = "")]
    pub cluster_cert: String,

    /// If non-empty secure communication with this key.
    #[arg(long, default_value = "")]
    pub cluster_key: String,

    /// If non-empty the CA we use to validate agent clients.
    #[arg(long, default_value = "")]
    pub cluster_ca_cert: String,

    /// mode can be either 'grpc' or 'http-connect'.
    #[arg(long, default_value = defaults::MODE)]
    pub mode: String,

    /// uds-name should be empty for TCP traffic. For UDS set to its name.
    #[arg(long, default_value = "")]
    pub uds_name: String,

    /// If true and the uds-name file already exists, delete it before listening on it.
    #[arg(
        long = "delete-existing-uds-file",
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        value_parser = BoolishValueParser::new(),
        default_value_t = defaults::DELETE_UDS_FILE,
        default_missing_value = "true"
    )]
    pub delete_uds_file: bool,

    /// Port we listen for server connections on. Set to 0 for UDS.
    #[arg(long, allow_negative_numbers = true, default_value_t = defaults::SERVER_PORT)]
    pub server_port: i32,

    /// Bind address for server connections. If empty, we will bind to all interfaces.
    #[arg(long, default_value = "")]
    pub server_bind_address: String,

    /// Port we listen for agent connections on.
    #[arg(long, allow_negative_numbers = true, default_value_t = defaults::AGENT_PORT)]
    pub agent_port: i32,

    /// Bind address for agent connections. If empty, we will bind to all interfaces.
    #[arg(long, default_value = "")]
    pub agent_bind_address: String,

    /// Port we listen for admin connections on.
    #[arg(long, allow_negative_numbers = true, default_value_t = defaults::ADMIN_PORT)]
    pub admin_port: i32,

    /// Bind address for admin connections. If empty, we will bind to localhost.
    #[arg(long, default_value = defaults::ADMIN_BIND_ADDRESS)]
    pub admin_bind_address: String,

    /// Port we listen for health connections on.
    #[arg(long, allow_negative_numbers = true, default_value_t = defaults::HEALTH_PORT)]
    pub health_port: i32,

    /// Bind address for health connections. If empty, we will bind to all interfaces.
    #[arg(long, default_value = "")]
    pub health_bind_address: String,

    /// Time for gRPC agent server keepalive.
    #[arg(long, default_value_t = Duration::from(defaults::KEEPALIVE_TIME))]
    pub keepalive_time: Duration,

    /// Time for gRPC frontend server keepalive.
    #[arg(long, default_value_t = Duration::from(defaults::FRONTEND_KEEPALIVE_TIME))]
    pub frontend_keepalive_time: Duration,

    /// Enable profiling at host:admin-port/debug/pprof.
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        value_parser = BoolishValueParser::new(),
        default_value_t = defaults::ENABLE_PROFILING,
        default_missing_value = "true"
    )]
    pub enable_profiling: bool,

    /// Enable contention profiling at host:admin-port/debug/pprof/block. "--enable-profiling" must also be set.
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        value_parser = BoolishValueParser::new(),
        default_value_t = defaults::ENABLE_CONTENTION_PROFILING,
        default_missing_value = "true"
    )]
    pub enable_contention_profiling: bool,

    /// The unique ID of this server. Can also be set by the 'PROXY_SERVER_ID' environment variable.
    #[arg(long, default_value = "")]
    pub server_id: String,

    /// The number of proxy server instances, should be 1 unless it is an HA server.
    #[arg(long, default_value_t = defaults::SERVER_COUNT)]
    pub server_count: u32,

    /// Expected agent's namespace during agent authentication (used with agent-service-account, authentication-audience, kubeconfig).
    #[arg(long, default_value = "")]
    pub agent_namespace: String,

    /// Expected agent's service account during agent authentication (used with agent-namespace, authentication-audience, kubeconfig).
    #[arg(long, default_value = "")]
    pub agent_service_account: String,

    /// Absolute path to the kubeconfig file (used with agent-namespace, agent-service-account, authentication-audience).
    #[arg(long = "kubeconfig", default_value = "")]
    pub kubeconfig_path: String,

    /// Maximum client QPS (proxy server uses this client to authenticate agent tokens).
    #[arg(long, default_value_t = defaults::KUBECONFIG_QPS)]
    pub kubeconfig_qps: f32,

    /// Maximum client burst (proxy server uses this client to authenticate agent tokens).
    #[arg(long, default_value_t = defaults::KUBECONFIG_BURST)]
    pub kubeconfig_burst: u32,

    /// Content type of requests sent to apiserver.
    #[arg(long = "kube-api-content-type", default_value = defaults::API_CONTENT_TYPE)]
    pub api_content_type: String,

    /// Expected agent's token authentication audience (used with agent-namespace, agent-service-account, kubeconfig).
    #[arg(long, default_value = "")]
    pub authentication_audience: String,

    /// The list of proxy strategies used by the server to pick an agent/tunnel, available strategies are: default, destHost, defaultRoute.
    #[arg(long, default_value = defaults::PROXY_STRATEGIES)]
    pub proxy_strategies: String,

    /// The comma separated list of allowed cipher suites. Has no effect on TLS1.3. Empty means allow default list.
    #[arg(long, value_delimiter = ',')]
    pub cipher_suites: Vec<String>,

    /// The size of the two channels used in server for transferring data. One channel is for data coming from the API server, and the other one is for data coming from the agent.
    #[arg(long, allow_negative_numbers = true, default_value_t = defaults::XFR_CHANNEL_SIZE)]
    pub xfr_channel_size: i64,

    /// Enable lease controller to publish and garbage collect proxy server leases.
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        value_parser = BoolishValueParser::new(),
        default_value_t = defaults::ENABLE_LEASE_CONTROLLER,
        default_missing_value = "true"
    )]
    pub enable_lease_controller: bool,

    /// The namespace where lease objects are managed by the controller.
    #[arg(long, default_value = defaults::LEASE_NAMESPACE)]
    pub lease_namespace: String,

    /// The labels on which the lease objects are managed.
    #[arg(long, default_value = defaults::LEASE_LABEL)]
    pub lease_label: String,

    /// DEPRECATED: This behavior is now thread safe and always on. This flag will be removed in a future release.
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        value_parser = BoolishValueParser::new(),
        default_value_t = true,
        default_missing_value = "true"
    )]
    pub warn_on_channel_limit: bool,

    /// Log level for this process; RUST_LOG takes precedence when set.
    #[arg(long, default_value_t = tracing::Level::INFO)]
    pub log_level: tracing::Level,
}

/// Parsed flags plus the deprecated switches the operator passed explicitly.
#[derive(Debug, Clone)]
pub struct ParsedFlags {
    pub args: ProxyRunArgs,
    pub deprecated: Vec<&'static DeprecatedFlag>,
}

/// Parse command-line arguments. The first item is the program name.
pub fn parse_flags<I, T>(args: I) -> Result<ParsedFlags, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = ProxyRunArgs::command().try_get_matches_from(args)?;
    let deprecated = deprecated_flags_used(&matches);
    let args = ProxyRunArgs::from_arg_matches(&matches)?;
    Ok(ParsedFlags { args, deprecated })
}

fn deprecated_flags_used(matches: &ArgMatches) -> Vec<&'static DeprecatedFlag> {
    DEPRECATED_FLAGS
        .iter()
        .filter(|flag| matches.value_source(flag.id) == Some(ValueSource::CommandLine))
        .collect()
}

impl ProxyRunArgs {
    /// Build the options these flags describe.
    ///
    /// An empty `--server-id` falls back to `PROXY_SERVER_ID`, then to a
    /// random ID. `--warn-on-channel-limit` and `--log-level` are not options.
    pub fn into_options(self) -> ProxyRunOptions {
        let server_id = if self.server_id.is_empty() {
            server_id_from(std::env::var(SERVER_ID_ENV).ok())
        } else {
            self.server_id
        };

        ProxyRunOptions {
            server_cert: self.server_cert,
            server_key: self.server_key,
            server_ca_cert: self.server_ca_cert,
            cluster_cert: self.cluster_cert,
            cluster_key: self.cluster_key,
            cluster_ca_cert: self.cluster_ca_cert,
            mode: self.mode,
            uds_name: self.uds_name,
            delete_uds_file: self.delete_uds_file,
            server_port: self.server_port,
            server_bind_address: self.server_bind_address,
            agent_port: self.agent_port,
            agent_bind_address: self.agent_bind_address,
            admin_port: self.admin_port,
            admin_bind_address: self.admin_bind_address,
            health_port: self.health_port,
            health_bind_address: self.health_bind_address,
            keepalive_time: self.keepalive_time.into(),
            frontend_keepalive_time: self.frontend_keepalive_time.into(),
            enable_profiling: self.enable_profiling,
            enable_contention_profiling: self.enable_contention_profiling,
            server_id,
            server_count: self.server_count,
            agent_namespace: self.agent_namespace,
            agent_service_account: self.agent_service_account,
            authentication_audience: self.authentication_audience,
            kubeconfig_path: self.kubeconfig_path,
            kubeconfig_qps: self.kubeconfig_qps,
            kubeconfig_burst: self.kubeconfig_burst,
            api_content_type: self.api_content_type,
            proxy_strategies: self.proxy_strategies,
            cipher_suites: self
                .cipher_suites
                .into_iter()
                .map(|cipher| cipher.trim().to_string())
                .filter(|cipher| !cipher.is_empty())
                .collect(),
            xfr_channel_size: self.xfr_channel_size,
            enable_lease_controller: self.enable_lease_controller,
            lease_namespace: self.lease_namespace,
            lease_label: self.lease_label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_well_formed() {
        ProxyRunArgs::command().debug_assert();
    }

    #[test]
    fn test_no_flags_matches_defaults() {
        let parsed = parse_flags(["proxy-server", "--server-id", "proxy-0"]).unwrap();
        let options = parsed.args.into_options();
        let expected = ProxyRunOptions {
            server_id: "proxy-0".into(),
            ..ProxyRunOptions::default()
        };
        assert_eq!(options, expected);
        assert!(parsed.deprecated.is_empty());
    }

    #[test]
    fn test_bool_flag_forms() {
        let parsed = parse_flags([
            "proxy-server",
            "--enable-profiling",
            "--delete-existing-uds-file=false",
            "--enable-lease-controller=true",
        ])
        .unwrap();
        assert!(parsed.args.enable_profiling);
        assert!(!parsed.args.delete_uds_file);
        assert!(parsed.args.enable_lease_controller);
        assert!(!parsed.args.enable_contention_profiling);
    }

    #[test]
    fn test_bool_flag_spellings() {
        for (value, expected) in [
            ("1", true),
            ("t", true),
            ("T", true),
            ("TRUE", true),
            ("True", true),
            ("0", false),
            ("f", false),
            ("F", false),
            ("FALSE", false),
            ("False", false),
        ] {
            let flag = format!("--enable-lease-controller={value}");
            let parsed = parse_flags(["proxy-server", flag.as_str()]).unwrap();
            assert_eq!(parsed.args.enable_lease_controller, expected, "{value}");
        }
    }

    #[test]
    fn test_out_of_range_ports_reach_options() {
        let parsed = parse_flags([
            "proxy-server",
            "--agent-port=70000",
            "--server-port",
            "-1",
        ])
        .unwrap();
        let options = parsed.args.into_options();
        assert_eq!(options.agent_port, 70000);
        assert_eq!(options.server_port, -1);
    }

    #[test]
    fn test_help_defaults_follow_schema() {
        let command = ProxyRunArgs::command();
        let default_of = |id: &str| -> String {
            let arg = command.get_arguments().find(|arg| arg.get_id() == id).unwrap();
            arg.get_default_values()[0].to_string_lossy().into_owned()
        };
        assert_eq!(default_of("keepalive_time"), "1h");
        assert_eq!(default_of("frontend_keepalive_time"), "1h");
        assert_eq!(default_of("server_port"), defaults::SERVER_PORT.to_string());
        assert_eq!(default_of("kubeconfig_qps"), "0");
        assert_eq!(default_of("delete_uds_file"), "true");
    }

    #[test]
    fn test_deprecated_flag_is_reported() {
        let parsed = parse_flags(["proxy-server", "--warn-on-channel-limit=false"]).unwrap();
        assert_eq!(parsed.deprecated.len(), 1);
        assert_eq!(parsed.deprecated[0].name, "warn-on-channel-limit");
        assert!(!parsed.args.warn_on_channel_limit);
    }

    #[test]
    fn test_deprecated_flag_help_text() {
        let command = ProxyRunArgs::command();
        let arg = command
            .get_arguments()
            .find(|arg| arg.get_id() == "warn_on_channel_limit")
            .unwrap();
        assert!(arg.get_help().unwrap().to_string().starts_with("DEPRECATED:"));
        assert_eq!(arg.get_long(), Some("warn-on-channel-limit"));
    }

    #[test]
    fn test_durations_and_lists() {
        let parsed = parse_flags([
            "proxy-server",
            "--keepalive-time",
            "90s",
            "--frontend-keepalive-time=1h30m",
            "--cipher-suites",
            "TLS_AES_128_GCM_SHA256,TLS_AES_256_GCM_SHA384",
        ])
        .unwrap();
        let options = parsed.args.into_options();
        assert_eq!(options.keepalive_time, std::time::Duration::from_secs(90));
        assert_eq!(
            options.frontend_keepalive_time,
            std::time::Duration::from_secs(5400)
        );
        assert_eq!(
            options.cipher_suites,
            vec!["TLS_AES_128_GCM_SHA256", "TLS_AES_256_GCM_SHA384"]
        );
    }

    #[test]
    fn test_negative_channel_size_reaches_options() {
        let parsed = parse_flags(["proxy-server", "--xfr-channel-size", "-1"]).unwrap();
        assert_eq!(parsed.args.into_options().xfr_channel_size, -1);
    }

    #[test]
    fn test_malformed_values_fail() {
        assert!(parse_flags(["proxy-server", "--server-port=abc"]).is_err());
        assert!(parse_flags(["proxy-server", "--keepalive-time=soon"]).is_err());
        assert!(parse_flags(["proxy-server", "--enable-profiling=maybe"]).is_err());
        assert!(parse_flags(["proxy-server", "--no-such-flag"]).is_err());
    }

    #[test]
    fn test_explicit_server_id_wins() {
        let parsed = parse_flags(["proxy-server", "--server-id=proxy-7"]).unwrap();
        assert_eq!(parsed.args.into_options().server_id, "proxy-7");
    }
}
