use serde::Serialize;
use std::net::IpAddr;

/// How the data plane discovers the members of a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiscoveryType {
  /// Membership is fixed to a literal IP address
  #[serde(rename = "STATIC")]
  Static,
  /// Membership is resolved from a hostname and refreshed on DNS TTL expiry
  #[serde(rename = "LOGICAL_DNS")]
  LogicalDns,
}

impl DiscoveryType {
  /// Classify a host (already stripped of its port).
  /// Literal IPv4/IPv6 addresses, bracketed or not, are static. Everything else goes through DNS.
  pub fn classify(host: &str) -> Self {
    let host = host
      .strip_prefix('[')
      .and_then(|h| h.strip_suffix(']'))
      .unwrap_or(host);
    match host.parse::<IpAddr>() {
      Ok(_) => DiscoveryType::Static,
      Err(_) => DiscoveryType::LogicalDns,
    }
  }
}
