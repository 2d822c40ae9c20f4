mod cluster;
mod cluster_set;
pub mod config;
mod constants;
mod discovery;
mod error;
mod naming;
mod target;
mod tls;
mod trust;

#[allow(unused)]
pub(crate) mod trace {
  pub(crate) use tracing::{debug, error, info, trace, warn};
}

pub use cluster::{
  Address, Cluster, ClusterLoadAssignment, Endpoint, Http2ProtocolOptions, LbEndpoint, LocalityLbEndpoints, SocketAddress,
  build_cluster,
};
pub use cluster_set::{ClusterSnapshot, ClusterSynthesizer, ClusterSynthesizerBuilder, ClusterSynthesizerBuilderError, ClusterWarning};
pub use config::{
  BackendPolicy, BackendPolicyBuilder, ClientCertificate, Config, ConfigBuilder, ConfigValidationError, ServiceMode,
};
pub use constants::{AUTHORIZE_CLUSTER, CLIENT_CERT_FILENAME, CLIENT_KEY_FILENAME, CONTROL_PLANE_GRPC_CLUSTER, CONTROL_PLANE_HTTP_CLUSTER};
pub use discovery::DiscoveryType;
pub use error::{ClusterBuildError, TrustMaterialError};
pub use naming::{HashPolicyNamer, PolicyNamer};
pub use target::TargetAddr;
pub use tls::{
  CertificateValidationContext, CommonTlsContext, StringMatcher, TlsCertificate, TransportSocket, TrustChainVerification,
  UpstreamTlsContext, build_policy_transport_socket, build_upstream_tls_context,
};
pub use trust::{DataSource, RootCaProvider, StaticRootCa, SystemRootCa, decode_wrapped_base64, resolve_trusted_ca};
