//! Effective configuration dump.
//!
//! Emits one debug event per option so operators can see what the server
//! actually runs with. Never affects control flow.

use crate::config::schema::ProxyRunOptions;
use crate::config::validation::ValidatedOptions;

/// Every option as `(flag name, rendered value)`, grouped as declared.
///
/// Strings are quoted so empty values stay visible.
pub fn fields(options: &ProxyRunOptions) -> Vec<(&'static str, String)> {
    vec![
        ("server-cert", format!("{:?}", options.server_cert)),
        ("server-key", format!("{:?}", options.server_key)),
        ("server-ca-cert", format!("{:?}", options.server_ca_cert)),
        ("cluster-cert", format!("{:?}", options.cluster_cert)),
        ("cluster-key", format!("{:?}", options.cluster_key)),
        ("cluster-ca-cert", format!("{:?}", options.cluster_ca_cert)),
        ("mode", format!("{:?}", options.mode)),
        ("uds-name", format!("{:?}", options.uds_name)),
        ("delete-existing-uds-file", options.delete_uds_file.to_string()),
        ("server-port", options.server_port.to_string()),
        ("server-bind-address", format!("{:?}", options.server_bind_address)),
        ("agent-port", options.agent_port.to_string()),
        ("agent-bind-address", format!("{:?}", options.agent_bind_address)),
        ("admin-port", options.admin_port.to_string()),
        ("admin-bind-address", format!("{:?}", options.admin_bind_address)),
        ("health-port", options.health_port.to_string()),
        ("health-bind-address", format!("{:?}", options.health_bind_address)),
        (
            "keepalive-time",
            humantime::format_duration(options.keepalive_time).to_string(),
        ),
        (
            "frontend-keepalive-time",
            humantime::format_duration(options.frontend_keepalive_time).to_string(),
        ),
        ("enable-profiling", options.enable_profiling.to_string()),
        (
            "enable-contention-profiling",
            options.enable_contention_profiling.to_string(),
        ),
        ("server-id", options.server_id.clone()),
        ("server-count", options.server_count.to_string()),
        ("agent-namespace", format!("{:?}", options.agent_namespace)),
        ("agent-service-account", format!("{:?}", options.agent_service_account)),
        ("authentication-audience", format!("{:?}", options.authentication_audience)),
        ("kubeconfig", format!("{:?}", options.kubeconfig_path)),
        ("kubeconfig-qps", format!("{:.6}", options.kubeconfig_qps)),
        ("kubeconfig-burst", options.kubeconfig_burst.to_string()),
        ("kube-api-content-type", options.api_content_type.clone()),
        ("proxy-strategies", format!("{:?}", options.proxy_strategies)),
        ("enable-lease-controller", options.enable_lease_controller.to_string()),
        ("lease-namespace", options.lease_namespace.clone()),
        ("lease-label", options.lease_label.clone()),
        ("cipher-suites", format!("{:?}", options.cipher_suites)),
        ("xfr-channel-size", options.xfr_channel_size.to_string()),
    ]
}

/// Log the effective configuration at debug level.
pub fn print_options(validated: &ValidatedOptions) {
    for (name, value) in fields(validated.options()) {
        tracing::debug!(option = name, value = %value, "{} set to {}", name, value);
    }
    tracing::debug!(
        needs_kubernetes_client = validated.needs_kubernetes_client(),
        "derived options"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_cover_every_option() {
        let names: Vec<&str> = fields(&ProxyRunOptions::default())
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names.len(), 36);
        assert_eq!(names.first(), Some(&"server-cert"));
        assert_eq!(names.last(), Some(&"xfr-channel-size"));

        let position = |name| names.iter().position(|n| *n == name).unwrap();
        assert!(position("server-port") < position("agent-port"));
        assert!(position("agent-port") < position("admin-port"));
        assert!(position("admin-port") < position("health-port"));
    }

    #[test]
    fn test_fields_render_values() {
        let options = ProxyRunOptions {
            server_id: "proxy-0".into(),
            cipher_suites: vec!["TLS_AES_128_GCM_SHA256".into()],
            ..ProxyRunOptions::default()
        };
        let fields = fields(&options);
        let value = |name: &str| {
            fields
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(value("server-cert"), "\"\"");
        assert_eq!(value("server-port"), "8090");
        assert_eq!(value("keepalive-time"), "1h");
        assert_eq!(value("server-id"), "proxy-0");
        assert_eq!(value("cipher-suites"), "[\"TLS_AES_128_GCM_SHA256\"]");
        assert_eq!(value("admin-bind-address"), "\"127.0.0.1\"");
    }
}
