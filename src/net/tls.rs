//! TLS material and cipher suite policy.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

/// Which side of the proxy a set of certificates secures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsRole {
    /// Frontend listener facing the API server (`--server-*` flags).
    Server,
    /// Backend listener facing agents (`--cluster-*` flags).
    Cluster,
}

impl TlsRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsRole::Server => "server",
            TlsRole::Cluster => "cluster",
        }
    }
}

impl fmt::Display for TlsRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Certificate, key and CA paths for one role. Empty strings mean unset.
#[derive(Debug, Clone, Copy)]
pub struct TlsMaterial<'a> {
    pub role: TlsRole,
    pub cert: &'a str,
    pub key: &'a str,
    pub ca_cert: &'a str,
}

/// IANA names and IDs of the cipher suites considered secure.
///
/// RC4, 3DES and CBC-SHA256 suites are left out. Static-RSA AES suites stay
/// accepted so existing `--cipher-suites` lists keep working. TLS 1.3 suites
/// are listed for completeness; they are not configurable.
const SECURE_CIPHER_SUITES: &[(&str, u16)] = &[
    ("TLS_RSA_WITH_AES_128_CBC_SHA", 0x002f),
    ("TLS_RSA_WITH_AES_256_CBC_SHA", 0x0035),
    ("TLS_RSA_WITH_AES_128_GCM_SHA256", 0x009c),
    ("TLS_RSA_WITH_AES_256_GCM_SHA384", 0x009d),
    ("TLS_AES_128_GCM_SHA256", 0x1301),
    ("TLS_AES_256_GCM_SHA384", 0x1302),
    ("TLS_CHACHA20_POLY1305_SHA256", 0x1303),
    ("TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA", 0xc009),
    ("TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA", 0xc00a),
    ("TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA", 0xc013),
    ("TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA", 0xc014),
    ("TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256", 0xc02b),
    ("TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384", 0xc02c),
    ("TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256", 0xc02f),
    ("TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384", 0xc030),
    ("TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256", 0xcca8),
    ("TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256", 0xcca9),
];

static ACCEPTED_CIPHERS: LazyLock<BTreeMap<&'static str, u16>> =
    LazyLock::new(|| SECURE_CIPHER_SUITES.iter().copied().collect());

/// Cipher suites an operator may request via `--cipher-suites`, keyed by name.
pub fn accepted_ciphers() -> &'static BTreeMap<&'static str, u16> {
    &ACCEPTED_CIPHERS
}
