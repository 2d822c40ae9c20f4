use std::time::Duration;

/// Connect timeout applied to every upstream cluster
pub const CLUSTER_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default upstream port when the transport socket is plaintext
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// Default upstream port when the transport socket is TLS
pub const DEFAULT_HTTPS_PORT: u16 = 443;

/// The only ALPN token offered to policy upstreams.
/// Upstreams are always spoken to over HTTP/1.1 regardless of what the downstream negotiated.
pub const UPSTREAM_ALPN: &str = "http/1.1";

/// Synthetic filename attached to an inline custom CA
pub const CUSTOM_CA_FILENAME: &str = "custom-ca.pem";

/// Synthetic filenames attached to an inline client certificate and its key
pub const CLIENT_CERT_FILENAME: &str = "client-cert.pem";
pub const CLIENT_KEY_FILENAME: &str = "client-key.pem";

/// Transport socket name understood by the data plane
pub const TLS_TRANSPORT_SOCKET_NAME: &str = "tls";

/// Internal cluster names. These never change across configuration epochs.
pub const CONTROL_PLANE_GRPC_CLUSTER: &str = "control-plane-grpc";
pub const CONTROL_PLANE_HTTP_CLUSTER: &str = "control-plane-http";
pub const AUTHORIZE_CLUSTER: &str = "control-plane-authz";

/// Prefix of every cluster name derived from a backend policy
pub const POLICY_CLUSTER_PREFIX: &str = "policy-";

/// Number of digest bytes kept in a policy cluster name
pub const POLICY_NAME_DIGEST_BYTES: usize = 8;

/// Environment variable that pins the system root CA bundle
pub const SSL_CERT_FILE_ENV: &str = "SSL_CERT_FILE";

/// Well-known locations of the system root CA bundle, probed in order
pub const SYSTEM_ROOT_CA_FILES: &[&str] = &[
  "/etc/ssl/certs/ca-certificates.crt",                // Debian/Ubuntu/Gentoo etc.
  "/etc/pki/tls/certs/ca-bundle.crt",                  // Fedora/RHEL 6
  "/etc/ssl/ca-bundle.pem",                            // OpenSUSE
  "/etc/pki/tls/cacert.pem",                           // OpenELEC
  "/etc/pki/ca-trust/extracted/pem/tls-ca-bundle.pem", // CentOS/RHEL 7
  "/etc/ssl/cert.pem",                                 // Alpine Linux
  "/usr/local/etc/ssl/cert.pem",                       // FreeBSD
  "/opt/homebrew/etc/ca-certificates/cert.pem",        // macOS (Homebrew)
];
