use crate::{
  constants::{DEFAULT_HTTP_PORT, DEFAULT_HTTPS_PORT},
  error::ClusterBuildError,
};
use std::{
  fmt,
  net::{IpAddr, Ipv6Addr, SocketAddr},
};
use url::Url;

/// Upstream endpoint address, either a literal socket address or a domain name with port.
/// The port is always resolved: an authority without explicit port gets the default port of its transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetAddr {
  /// Direct socket address (IP and port)
  Socket(SocketAddr),
  /// Domain name and port combination
  Domain(String, u16),
}

impl TargetAddr {
  /// Default port for the transport: 443 with TLS, 80 without
  pub fn default_port(tls: bool) -> u16 {
    if tls { DEFAULT_HTTPS_PORT } else { DEFAULT_HTTP_PORT }
  }

  /// Resolve a `host[:port]` authority.
  ///
  /// Accepted forms:
  /// - IPv4 or domain, with or without port (e.g., "10.0.0.5", "backend.internal:8080")
  /// - bracketed IPv6, with or without port (e.g., "[::1]", "[::1]:8443")
  /// - bare IPv6 without port (e.g., "::1")
  pub fn from_authority(authority: &str, tls: bool) -> Result<Self, ClusterBuildError> {
    let (host, port) = split_authority(authority)?;
    let port = match port {
      Some(port) => parse_port(authority, port)?,
      None => Self::default_port(tls),
    };
    Self::from_host_port(authority, host, port)
  }

  fn from_host_port(authority: &str, host: &str, port: u16) -> Result<Self, ClusterBuildError> {
    if host.is_empty() {
      return Err(ClusterBuildError::EmptyHost(authority.to_string()));
    }
    if let Ok(ip) = host.parse::<IpAddr>() {
      return Ok(TargetAddr::Socket(SocketAddr::new(ip, port)));
    }
    if !Self::validate_domain(host) {
      return Err(ClusterBuildError::InvalidDomain(host.to_string()));
    }
    Ok(TargetAddr::Domain(host.to_string(), port))
  }

  /// Validates if the given domain name follows basic DNS naming rules
  /// Allows alphanumeric characters (a-z, A-Z, 0-9), dots (.), hyphens (-) and underscores (_)
  /// Does not allow:
  /// - Empty domains
  /// - Domains longer than 253 characters
  /// - Consecutive dots
  /// - Leading or trailing dots
  fn validate_domain(domain: &str) -> bool {
    !domain.is_empty()
      && domain.len() <= 253
      && domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
      && !domain.starts_with('.')
      && !domain.ends_with('.')
      && !domain.contains("..")
  }

  /// Host part without port and without IPv6 brackets
  pub fn domain_or_ip(&self) -> String {
    match self {
      TargetAddr::Socket(addr) => addr.ip().to_string(),
      TargetAddr::Domain(domain, _) => domain.clone(),
    }
  }

  /// Resolved port
  pub fn port(&self) -> u16 {
    match self {
      TargetAddr::Socket(addr) => addr.port(),
      TargetAddr::Domain(_, port) => *port,
    }
  }
}

impl fmt::Display for TargetAddr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TargetAddr::Socket(addr) => write!(f, "{}", addr),
      TargetAddr::Domain(domain, port) => write!(f, "{}:{}", domain, port),
    }
  }
}

/// Split an authority into host and optional port string, stripping IPv6 brackets
pub(crate) fn split_authority(authority: &str) -> Result<(&str, Option<&str>), ClusterBuildError> {
  if let Some(rest) = authority.strip_prefix('[') {
    let Some((host, after)) = rest.split_once(']') else {
      return Err(ClusterBuildError::InvalidDomain(authority.to_string()));
    };
    if after.is_empty() {
      return Ok((host, None));
    }
    return match after.strip_prefix(':') {
      Some(port) => Ok((host, Some(port))),
      None => Err(ClusterBuildError::InvalidPort {
        destination: authority.to_string(),
        port: after.to_string(),
      }),
    };
  }

  // unbracketed IPv6 literal cannot carry a port
  if authority.parse::<Ipv6Addr>().is_ok() {
    return Ok((authority, None));
  }

  match authority.rsplit_once(':') {
    Some((host, port)) => Ok((host, Some(port))),
    None => Ok((authority, None)),
  }
}

fn parse_port(authority: &str, port: &str) -> Result<u16, ClusterBuildError> {
  port
    .parse::<u16>()
    .ok()
    .filter(|p| *p != 0)
    .ok_or_else(|| ClusterBuildError::InvalidPort {
      destination: authority.to_string(),
      port: port.to_string(),
    })
}

/// `host[:port]` authority of a URL, the port being present only when it differs from the scheme default
pub(crate) fn url_authority(url: &Url) -> String {
  let host = url.host_str().unwrap_or_default();
  match url.port() {
    Some(port) => format!("{host}:{port}"),
    None => host.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_explicit_port_wins() {
    let addr = TargetAddr::from_authority("10.0.0.5:8443", true).unwrap();
    assert_eq!(addr.to_string(), "10.0.0.5:8443");
    let addr = TargetAddr::from_authority("10.0.0.5:8443", false).unwrap();
    assert_eq!(addr.to_string(), "10.0.0.5:8443");
  }

  #[test]
  fn test_default_port_follows_transport() {
    let addr = TargetAddr::from_authority("backend.internal", false).unwrap();
    assert_eq!(addr, TargetAddr::Domain("backend.internal".to_string(), 80));
    let addr = TargetAddr::from_authority("backend.internal", true).unwrap();
    assert_eq!(addr, TargetAddr::Domain("backend.internal".to_string(), 443));
  }

  #[test]
  fn test_ipv6_authorities() {
    let addr = TargetAddr::from_authority("[2001:db8::1]:8443", true).unwrap();
    assert_eq!(addr.to_string(), "[2001:db8::1]:8443");
    assert_eq!(addr.domain_or_ip(), "2001:db8::1");

    let addr = TargetAddr::from_authority("[::1]", true).unwrap();
    assert_eq!(addr.port(), 443);

    let addr = TargetAddr::from_authority("::1", false).unwrap();
    assert_eq!(addr.to_string(), "[::1]:80");
  }

  #[test]
  fn test_invalid_authorities() {
    assert!(matches!(
      TargetAddr::from_authority("", false),
      Err(ClusterBuildError::EmptyHost(_))
    ));
    assert!(matches!(
      TargetAddr::from_authority(":8080", false),
      Err(ClusterBuildError::EmptyHost(_))
    ));
    assert!(matches!(
      TargetAddr::from_authority("example.com:http", false),
      Err(ClusterBuildError::InvalidPort { .. })
    ));
    assert!(matches!(
      TargetAddr::from_authority("example.com:70000", false),
      Err(ClusterBuildError::InvalidPort { .. })
    ));
    assert!(matches!(
      TargetAddr::from_authority("example.com:0", false),
      Err(ClusterBuildError::InvalidPort { .. })
    ));
    assert!(matches!(
      TargetAddr::from_authority("[::1]8080", false),
      Err(ClusterBuildError::InvalidPort { .. })
    ));
    assert!(TargetAddr::from_authority("example..com:8080", false).is_err());
    assert!(TargetAddr::from_authority(".example.com", false).is_err());
    assert!(TargetAddr::from_authority("exa mple.com", false).is_err());
  }

  #[test]
  fn test_url_authority() {
    let url = Url::parse("https://10.0.0.5:8443/path").unwrap();
    assert_eq!(url_authority(&url), "10.0.0.5:8443");

    // scheme default port is dropped by the URL parser
    let url = Url::parse("https://backend.internal:443").unwrap();
    assert_eq!(url_authority(&url), "backend.internal");

    let url = Url::parse("http://[::1]:8080").unwrap();
    assert_eq!(url_authority(&url), "[::1]:8080");
  }
}
