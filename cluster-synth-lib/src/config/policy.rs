use crate::{target::url_authority, trust::DataSource};
use std::path::PathBuf;
use url::{Host, Url};

/// A route to a backend and the TLS settings used to reach it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendPolicy {
  /// Public URL the route is served on
  pub from: Url,
  /// Backend URL; `https` gets an upstream TLS context, `http` does not
  pub destination: Url,
  /// Overrides the destination hostname as SNI and as the expected peer SAN
  pub tls_server_name: Option<String>,
  /// Client certificate presented to the backend
  pub client_certificate: Option<ClientCertificate>,
  /// Custom CA file, referenced by path and never read by the control plane
  pub tls_custom_ca_file: Option<PathBuf>,
  /// Base64 encoded custom CA bundle
  pub tls_custom_ca: Option<String>,
  /// Accept any certificate chain from the backend. The SAN is still matched.
  pub tls_skip_verify: bool,
}

/// Client certificate and its private key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCertificate {
  pub certificate: DataSource,
  pub private_key: DataSource,
}

impl BackendPolicy {
  /// Whether the backend is reached over TLS
  pub fn is_tls(&self) -> bool {
    self.destination.scheme() == "https"
  }

  /// Destination hostname without port and without IPv6 brackets
  pub fn destination_hostname(&self) -> String {
    match self.destination.host() {
      Some(Host::Domain(domain)) => domain.to_string(),
      Some(Host::Ipv4(ip)) => ip.to_string(),
      Some(Host::Ipv6(ip)) => ip.to_string(),
      None => String::new(),
    }
  }

  /// Destination `host[:port]`, the port being present only when explicitly set
  pub fn destination_authority(&self) -> String {
    url_authority(&self.destination)
  }

  /// SNI sent to the backend: the server name override if non-empty, else the destination hostname
  pub fn effective_sni(&self) -> String {
    match self.tls_server_name.as_deref() {
      Some(name) if !name.is_empty() => name.to_string(),
      _ => self.destination_hostname(),
    }
  }
}

#[cfg(test)]
mod tests {
  use crate::config::BackendPolicyBuilder;

  #[test]
  fn test_effective_sni() {
    let policy = BackendPolicyBuilder::new()
      .with_from("https://app.example.com")
      .unwrap()
      .with_destination("https://[2001:db8::1]:8443")
      .unwrap()
      .build()
      .unwrap();
    assert_eq!(policy.effective_sni(), "2001:db8::1");
    assert_eq!(policy.destination_authority(), "[2001:db8::1]:8443");

    let mut policy = policy;
    policy.tls_server_name = Some(String::new());
    assert_eq!(policy.effective_sni(), "2001:db8::1");
    policy.tls_server_name = Some("backend.example.com".to_string());
    assert_eq!(policy.effective_sni(), "backend.example.com");
  }
}
