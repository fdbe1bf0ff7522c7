//! Configuration validation.
//!
//! # Responsibilities
//! - Check cross-field constraints before any listener opens
//! - Check that referenced certificate and kubeconfig files exist
//! - Produce the immutable [`ValidatedOptions`] handed to the runtime
//!
//! # Design Decisions
//! - Rules run in a fixed order and stop at the first violation, so the
//!   reported error for a given config is deterministic
//! - Each rule is a named function listed in [`RULES`]
//! - Empty strings are "unset" and never checked as paths

use std::io;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{ProxyMode, ProxyRunOptions};
use crate::lease::{parse_label_selector, LabelSelector, SelectorError};
use crate::net::{accepted_ciphers, ListenerRole, TlsMaterial, TlsRole};
use crate::routing::{parse_proxy_strategies, ProxyStrategy, StrategyError};

/// A violated startup constraint.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("error checking {what} {path}, got {source}")]
    MissingFile {
        what: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot have {role} {missing} empty when {role} {present} is set to {path:?}")]
    UnpairedTls {
        role: TlsRole,
        missing: &'static str,
        present: &'static str,
        path: String,
    },

    #[error("mode must be set to either 'grpc' or 'http-connect' not {0:?}")]
    InvalidMode(String),

    #[error("server port should be set to 0 not {0} for UDS")]
    UdsServerPort(i32),

    #[error("{0} should not be set for UDS")]
    UdsServerTls(&'static str),

    #[error("please do not try to use ephemeral port {port} for the {role} port")]
    EphemeralPort { role: ListenerRole, port: i32 },

    #[error("please do not try to use reserved port {port} for the {role} port")]
    ReservedPort { role: ListenerRole, port: i32 },

    #[error("if --enable-contention-profiling is set, --enable-profiling must also be set")]
    ContentionWithoutProfiling,

    #[error("--cluster-ca-cert can not be used when agent authentication is enabled")]
    AuthWithClusterCa,

    #[error("--{0} cannot be empty when agent authentication is enabled")]
    AuthMissing(&'static str),

    #[error("proxy strategies cannot be empty")]
    EmptyProxyStrategies,

    #[error("invalid proxy strategies: {0}")]
    InvalidProxyStrategies(#[source] StrategyError),

    #[error("channel size {0} must be greater than 0")]
    NonPositiveChannelSize(i64),

    #[error("cipher suite {0} not supported, doesn't exist or considered as insecure")]
    UnsupportedCipher(String),

    #[error("invalid lease label {label:?}: {source}")]
    InvalidLeaseLabel {
        label: String,
        #[source]
        source: SelectorError,
    },
}

/// A named validation step.
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub check: fn(&ProxyRunOptions) -> Result<(), ValidationError>,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// Validation steps in evaluation order.
pub const RULES: &[Rule] = &[
    Rule { name: "server-tls", check: check_server_tls },
    Rule { name: "cluster-tls", check: check_cluster_tls },
    Rule { name: "mode", check: check_mode },
    Rule { name: "uds", check: check_uds },
    Rule { name: "ports", check: check_ports },
    Rule { name: "profiling", check: check_profiling },
    Rule { name: "service-account-auth", check: check_service_account_auth },
    Rule { name: "kubeconfig", check: check_kubeconfig },
    Rule { name: "proxy-strategies", check: check_proxy_strategies },
    Rule { name: "xfr-channel-size", check: check_channel_size },
    Rule { name: "cipher-suites", check: check_cipher_suites },
    Rule { name: "lease-label", check: check_lease_label },
];

/// Options that passed every rule. Read-only from here on.
#[derive(Debug, Clone)]
pub struct ValidatedOptions {
    options: ProxyRunOptions,
    mode: ProxyMode,
    proxy_strategies: Vec<ProxyStrategy>,
    lease_selector: Option<LabelSelector>,
}

impl ValidatedOptions {
    pub fn options(&self) -> &ProxyRunOptions {
        &self.options
    }

    pub fn mode(&self) -> ProxyMode {
        self.mode
    }

    /// Parsed strategies, in the order the runtime should try them.
    pub fn proxy_strategies(&self) -> &[ProxyStrategy] {
        &self.proxy_strategies
    }

    /// Parsed lease label; `None` when the lease controller is disabled.
    pub fn lease_selector(&self) -> Option<&LabelSelector> {
        self.lease_selector.as_ref()
    }

    /// Whether the runtime must build a Kubernetes client, either to review
    /// agent tokens or to manage leases.
    pub fn needs_kubernetes_client(&self) -> bool {
        self.options.uses_service_account_auth() || self.options.enable_lease_controller
    }
}

impl ProxyRunOptions {
    /// Run every rule in order and return the validated options.
    pub fn validate(self) -> Result<ValidatedOptions, ValidationError> {
        validate_options(&self)?;

        let mode: ProxyMode = self.mode.parse().map_err(ValidationError::InvalidMode)?;
        let proxy_strategies = parse_proxy_strategies(&self.proxy_strategies)
            .map_err(ValidationError::InvalidProxyStrategies)?;
        let lease_selector = if self.enable_lease_controller {
            Some(parse_lease_label(&self.lease_label)?)
        } else {
            None
        };

        Ok(ValidatedOptions {
            options: self,
            mode,
            proxy_strategies,
            lease_selector,
        })
    }
}

/// Run every rule in order, stopping at the first violation.
pub fn validate_options(options: &ProxyRunOptions) -> Result<(), ValidationError> {
    for rule in RULES {
        if let Err(err) = (rule.check)(options) {
            tracing::debug!(rule = rule.name, error = %err, "validation rule failed");
            return Err(err);
        }
    }
    Ok(())
}

fn check_file(what: &'static str, path: &str) -> Result<(), ValidationError> {
    match std::fs::metadata(Path::new(path)) {
        Err(source) if source.kind() == io::ErrorKind::NotFound => Err(ValidationError::MissingFile {
            what,
            path: path.to_string(),
            source,
        }),
        _ => Ok(()),
    }
}

fn check_tls(tls: TlsMaterial<'_>, names: [&'static str; 3]) -> Result<(), ValidationError> {
    let [key_name, cert_name, ca_name] = names;
    if !tls.key.is_empty() {
        check_file(key_name, tls.key)?;
        if tls.cert.is_empty() {
            return Err(ValidationError::UnpairedTls {
                role: tls.role,
                missing: "cert",
                present: "key",
                path: tls.key.to_string(),
            });
        }
    }
    if !tls.cert.is_empty() {
        check_file(cert_name, tls.cert)?;
        if tls.key.is_empty() {
            return Err(ValidationError::UnpairedTls {
                role: tls.role,
                missing: "key",
                present: "cert",
                path: tls.cert.to_string(),
            });
        }
    }
    if !tls.ca_cert.is_empty() {
        check_file(ca_name, tls.ca_cert)?;
    }
    Ok(())
}

pub fn check_server_tls(options: &ProxyRunOptions) -> Result<(), ValidationError> {
    check_tls(
        options.server_tls(),
        ["server key", "server cert", "server CA cert"],
    )
}

pub fn check_cluster_tls(options: &ProxyRunOptions) -> Result<(), ValidationError> {
    check_tls(
        options.cluster_tls(),
        ["cluster key", "cluster cert", "cluster CA cert"],
    )
}

pub fn check_mode(options: &ProxyRunOptions) -> Result<(), ValidationError> {
    options
        .mode
        .parse::<ProxyMode>()
        .map(|_| ())
        .map_err(ValidationError::InvalidMode)
}

pub fn check_uds(options: &ProxyRunOptions) -> Result<(), ValidationError> {
    if !options.uses_uds() {
        return Ok(());
    }
    if options.server_port != 0 {
        return Err(ValidationError::UdsServerPort(options.server_port));
    }
    if !options.server_key.is_empty() {
        return Err(ValidationError::UdsServerTls("server key"));
    }
    if !options.server_cert.is_empty() {
        return Err(ValidationError::UdsServerTls("server cert"));
    }
    if !options.server_ca_cert.is_empty() {
        return Err(ValidationError::UdsServerTls("server ca cert"));
    }
    Ok(())
}

/// Ephemeral ports are checked on every listener before reserved ports are.
pub fn check_ports(options: &ProxyRunOptions) -> Result<(), ValidationError> {
    let listeners = options.listeners();
    if let Some(listener) = listeners.iter().find(|l| l.is_ephemeral()) {
        return Err(ValidationError::EphemeralPort {
            role: listener.role,
            port: listener.port,
        });
    }
    let uds_active = options.uses_uds();
    if let Some(listener) = listeners.iter().find(|l| l.is_reserved(uds_active)) {
        return Err(ValidationError::ReservedPort {
            role: listener.role,
            port: listener.port,
        });
    }
    Ok(())
}

pub fn check_profiling(options: &ProxyRunOptions) -> Result<(), ValidationError> {
    if options.enable_contention_profiling && !options.enable_profiling {
        return Err(ValidationError::ContentionWithoutProfiling);
    }
    Ok(())
}

pub fn check_service_account_auth(options: &ProxyRunOptions) -> Result<(), ValidationError> {
    if !options.uses_service_account_auth() {
        return Ok(());
    }
    if !options.cluster_ca_cert.is_empty() {
        return Err(ValidationError::AuthWithClusterCa);
    }
    let required = [
        ("agent-namespace", &options.agent_namespace),
        ("agent-service-account", &options.agent_service_account),
        ("authentication-audience", &options.authentication_audience),
    ];
    match required.iter().find(|(_, value)| value.is_empty()) {
        Some((flag, _)) => Err(ValidationError::AuthMissing(*flag)),
        None => Ok(()),
    }
}

pub fn check_kubeconfig(options: &ProxyRunOptions) -> Result<(), ValidationError> {
    if options.kubeconfig_path.is_empty() {
        return Ok(());
    }
    check_file("kubeconfig", &options.kubeconfig_path)
}

pub fn check_proxy_strategies(options: &ProxyRunOptions) -> Result<(), ValidationError> {
    if options.proxy_strategies.is_empty() {
        return Err(ValidationError::EmptyProxyStrategies);
    }
    parse_proxy_strategies(&options.proxy_strategies)
        .map(|_| ())
        .map_err(ValidationError::InvalidProxyStrategies)
}

pub fn check_channel_size(options: &ProxyRunOptions) -> Result<(), ValidationError> {
    if options.xfr_channel_size <= 0 {
        return Err(ValidationError::NonPositiveChannelSize(options.xfr_channel_size));
    }
    Ok(())
}

pub fn check_cipher_suites(options: &ProxyRunOptions) -> Result<(), ValidationError> {
    let accepted = accepted_ciphers();
    match options
        .cipher_suites
        .iter()
        .find(|cipher| !accepted.contains_key(cipher.as_str()))
    {
        Some(cipher) => Err(ValidationError::UnsupportedCipher(cipher.clone())),
        None => Ok(()),
    }
}

pub fn check_lease_label(options: &ProxyRunOptions) -> Result<(), ValidationError> {
    if !options.enable_lease_controller {
        return Ok(());
    }
    parse_lease_label(&options.lease_label).map(|_| ())
}

fn parse_lease_label(label: &str) -> Result<LabelSelector, ValidationError> {
    parse_label_selector(label).map_err(|source| ValidationError::InvalidLeaseLabel {
        label: label.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_order() {
        let names: Vec<&str> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "server-tls",
                "cluster-tls",
                "mode",
                "uds",
                "ports",
                "profiling",
                "service-account-auth",
                "kubeconfig",
                "proxy-strategies",
                "xfr-channel-size",
                "cipher-suites",
                "lease-label",
            ]
        );
    }

    #[test]
    fn test_defaults_pass_every_rule() {
        let options = ProxyRunOptions::default();
        for rule in RULES {
            assert!((rule.check)(&options).is_ok(), "rule {} failed", rule.name);
        }
    }

    #[test]
    fn test_mode_rule() {
        let options = ProxyRunOptions {
            mode: "quic".into(),
            ..ProxyRunOptions::default()
        };
        let err = check_mode(&options).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidMode(ref m) if m == "quic"));
        assert_eq!(
            err.to_string(),
            "mode must be set to either 'grpc' or 'http-connect' not \"quic\""
        );
    }

    #[test]
    fn test_uds_checks_port_before_tls() {
        let options = ProxyRunOptions {
            uds_name: "/run/konnectivity/proxy.sock".into(),
            server_cert: "/etc/tls.crt".into(),
            ..ProxyRunOptions::default()
        };
        assert!(matches!(
            check_uds(&options),
            Err(ValidationError::UdsServerPort(8090))
        ));

        let options = ProxyRunOptions {
            server_port: 0,
            ..options
        };
        assert!(matches!(
            check_uds(&options),
            Err(ValidationError::UdsServerTls("server cert"))
        ));
    }

    #[test]
    fn test_ephemeral_ports_checked_before_reserved() {
        let options = ProxyRunOptions {
            agent_port: 80,
            health_port: 60000,
            ..ProxyRunOptions::default()
        };
        let err = check_ports(&options).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::EphemeralPort { role: ListenerRole::Health, port: 60000 }
        ));
        assert_eq!(
            err.to_string(),
            "please do not try to use ephemeral port 60000 for the health port"
        );

        let options = ProxyRunOptions {
            health_port: 8092,
            ..options
        };
        assert!(matches!(
            check_ports(&options),
            Err(ValidationError::ReservedPort { role: ListenerRole::Agent, port: 80 })
        ));
    }

    #[test]
    fn test_negative_port_is_reserved() {
        let options = ProxyRunOptions {
            admin_port: -1,
            ..ProxyRunOptions::default()
        };
        assert!(matches!(
            check_ports(&options),
            Err(ValidationError::ReservedPort { role: ListenerRole::Admin, port: -1 })
        ));
    }

    #[test]
    fn test_service_account_requires_all_three() {
        let options = ProxyRunOptions {
            agent_namespace: "kube-system".into(),
            authentication_audience: "system:konnectivity-server".into(),
            ..ProxyRunOptions::default()
        };
        let err = check_service_account_auth(&options).unwrap_err();
        assert!(matches!(err, ValidationError::AuthMissing("agent-service-account")));
        assert_eq!(
            err.to_string(),
            "--agent-service-account cannot be empty when agent authentication is enabled"
        );
    }

    #[test]
    fn test_cluster_ca_checked_before_missing_auth_fields() {
        let options = ProxyRunOptions {
            agent_namespace: "kube-system".into(),
            cluster_ca_cert: "/etc/ca.crt".into(),
            ..ProxyRunOptions::default()
        };
        assert!(matches!(
            check_service_account_auth(&options),
            Err(ValidationError::AuthWithClusterCa)
        ));
    }

    #[test]
    fn test_proxy_strategies_rule() {
        let empty = ProxyRunOptions {
            proxy_strategies: String::new(),
            ..ProxyRunOptions::default()
        };
        assert!(matches!(
            check_proxy_strategies(&empty),
            Err(ValidationError::EmptyProxyStrategies)
        ));

        let bogus = ProxyRunOptions {
            proxy_strategies: "bogus-strategy".into(),
            ..ProxyRunOptions::default()
        };
        let err = check_proxy_strategies(&bogus).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid proxy strategies: unknown proxy strategy: bogus-strategy"
        );
    }

    #[test]
    fn test_channel_size_rule() {
        for size in [0, -1] {
            let options = ProxyRunOptions {
                xfr_channel_size: size,
                ..ProxyRunOptions::default()
            };
            assert!(matches!(
                check_channel_size(&options),
                Err(ValidationError::NonPositiveChannelSize(s)) if s == size
            ));
        }
    }

    #[test]
    fn test_cipher_rule_reports_first_unknown() {
        let options = ProxyRunOptions {
            cipher_suites: vec![
                "TLS_AES_128_GCM_SHA256".into(),
                "TLS_RSA_WITH_RC4_128_SHA".into(),
                "BOGUS".into(),
            ],
            ..ProxyRunOptions::default()
        };
        assert!(matches!(
            check_cipher_suites(&options),
            Err(ValidationError::UnsupportedCipher(ref c)) if c == "TLS_RSA_WITH_RC4_128_SHA"
        ));
    }

    #[test]
    fn test_lease_label_ignored_when_controller_disabled() {
        let options = ProxyRunOptions {
            lease_label: "not a selector!!".into(),
            ..ProxyRunOptions::default()
        };
        assert!(check_lease_label(&options).is_ok());

        let enabled = ProxyRunOptions {
            enable_lease_controller: true,
            ..options
        };
        assert!(matches!(
            check_lease_label(&enabled),
            Err(ValidationError::InvalidLeaseLabel { .. })
        ));
    }

    #[test]
    fn test_missing_file_message() {
        let options = ProxyRunOptions {
            server_key: "/nonexistent/server.key".into(),
            server_cert: "/nonexistent/server.crt".into(),
            ..ProxyRunOptions::default()
        };
        let err = check_server_tls(&options).unwrap_err();
        assert!(matches!(err, ValidationError::MissingFile { what: "server key", .. }));
        assert!(err
            .to_string()
            .starts_with("error checking server key /nonexistent/server.key, got "));
    }
}
