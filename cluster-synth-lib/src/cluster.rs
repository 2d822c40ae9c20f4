use crate::{
  constants::CLUSTER_CONNECT_TIMEOUT, discovery::DiscoveryType, error::ClusterBuildError, target::TargetAddr, tls::TransportSocket,
  trace::*,
};
use serde::{Serialize, Serializer};
use std::{fmt, time::Duration};

/// Upstream cluster descriptor, shaped after the discovery protocol's cluster resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cluster {
  /// Unique within a snapshot
  pub name: String,
  #[serde(serialize_with = "serialize_duration")]
  pub connect_timeout: Duration,
  pub load_assignment: ClusterLoadAssignment,
  /// Always true: DNS discovered clusters re-resolve on TTL expiry
  pub respect_dns_ttl: bool,
  #[serde(skip_serializing_if = "TransportSocket::is_plaintext")]
  pub transport_socket: TransportSocket,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub http2_protocol_options: Option<Http2ProtocolOptions>,
  pub cluster_discovery_type: DiscoveryType,
}

impl Cluster {
  /// Address of the single endpoint member
  pub fn endpoint_address(&self) -> Option<&SocketAddress> {
    self
      .load_assignment
      .endpoints
      .first()
      .and_then(|locality| locality.lb_endpoints.first())
      .map(|lb| &lb.endpoint.address.socket_address)
  }
}

/// Protocol-JSON rendering of a duration, e.g., "10s" or "1.5s"
fn serialize_duration<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
  let secs = duration.as_secs();
  let nanos = duration.subsec_nanos();
  if nanos == 0 {
    serializer.serialize_str(&format!("{secs}s"))
  } else {
    let frac = format!("{nanos:09}");
    serializer.serialize_str(&format!("{secs}.{}s", frac.trim_end_matches('0')))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterLoadAssignment {
  pub cluster_name: String,
  pub endpoints: Vec<LocalityLbEndpoints>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalityLbEndpoints {
  pub lb_endpoints: Vec<LbEndpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LbEndpoint {
  pub endpoint: Endpoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
  pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
  pub socket_address: SocketAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SocketAddress {
  /// IP literal (without brackets) or hostname
  pub address: String,
  pub port_value: u16,
}

impl From<&TargetAddr> for SocketAddress {
  fn from(target: &TargetAddr) -> Self {
    Self {
      address: target.domain_or_ip(),
      port_value: target.port(),
    }
  }
}

impl fmt::Display for SocketAddress {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.address.contains(':') {
      write!(f, "[{}]:{}", self.address, self.port_value)
    } else {
      write!(f, "{}:{}", self.address, self.port_value)
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Http2ProtocolOptions {
  pub allow_connect: bool,
}

/* ---------------------------------------------------------- */
/// Assemble a cluster with a single endpoint.
///
/// The default port of `authority` follows the transport socket (443 for TLS, 80 otherwise),
/// and the discovery type follows the host (static for IP literals, logical DNS otherwise).
/// `force_http2` enables HTTP/2 with CONNECT, which internal gRPC streaming clusters need.
pub fn build_cluster(
  name: &str,
  authority: &str,
  transport_socket: TransportSocket,
  force_http2: bool,
) -> Result<Cluster, ClusterBuildError> {
  let target = TargetAddr::from_authority(authority, transport_socket.is_tls())?;
  let cluster_discovery_type = DiscoveryType::classify(&target.domain_or_ip());
  debug!("Cluster {name}: {target} ({cluster_discovery_type:?})");

  let load_assignment = ClusterLoadAssignment {
    cluster_name: name.to_string(),
    endpoints: vec![LocalityLbEndpoints {
      lb_endpoints: vec![LbEndpoint {
        endpoint: Endpoint {
          address: Address {
            socket_address: SocketAddress::from(&target),
          },
        },
      }],
    }],
  };

  Ok(Cluster {
    name: name.to_string(),
    connect_timeout: CLUSTER_CONNECT_TIMEOUT,
    load_assignment,
    respect_dns_ttl: true,
    transport_socket,
    http2_protocol_options: force_http2.then_some(Http2ProtocolOptions { allow_connect: true }),
    cluster_discovery_type,
  })
}
