use crate::{
  cluster::{Cluster, build_cluster},
  config::{BackendPolicy, Config},
  constants::{AUTHORIZE_CLUSTER, CONTROL_PLANE_GRPC_CLUSTER, CONTROL_PLANE_HTTP_CLUSTER},
  error::{ClusterBuildError, TrustMaterialError},
  naming::{HashPolicyNamer, PolicyNamer},
  target::url_authority,
  tls::{TransportSocket, UpstreamTlsContext, build_policy_transport_socket},
  trace::*,
  trust::{RootCaProvider, StaticRootCa, SystemRootCa},
};
use std::{collections::HashSet, fmt, sync::Arc};

/// Result of a synthesis pass.
/// Internal clusters come first in fixed order, then one cluster per policy in policy order.
/// Downstream change detection relies on this order being stable across epochs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClusterSnapshot {
  pub clusters: Vec<Cluster>,
  /// Non-fatal trust material problems, one per degraded cluster
  pub warnings: Vec<ClusterWarning>,
}

impl ClusterSnapshot {
  /// Find a cluster by name
  pub fn get(&self, name: &str) -> Option<&Cluster> {
    self.clusters.iter().find(|c| c.name == name)
  }
}

/// Trust material problem attached to the cluster it degraded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterWarning {
  pub cluster: String,
  pub error: TrustMaterialError,
}

impl fmt::Display for ClusterWarning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "cluster {}: {}", self.cluster, self.error)
  }
}

/* ---------------------------------------------------------- */
fn default_namer() -> Arc<dyn PolicyNamer> {
  Arc::new(HashPolicyNamer)
}

/// Synthesizes the full cluster set of a configuration epoch.
/// Holds no state between calls, so a single instance can serve concurrent snapshots.
#[derive(Clone, derive_builder::Builder)]
pub struct ClusterSynthesizer {
  /// System root CA lookup, the last resort trust anchor
  #[builder(setter(custom))]
  root_ca: Arc<dyn RootCaProvider>,
  /// Policy to cluster name mapping
  #[builder(setter(custom), default = "default_namer()")]
  namer: Arc<dyn PolicyNamer>,
}

impl ClusterSynthesizerBuilder {
  pub fn root_ca(&mut self, provider: impl RootCaProvider + 'static) -> &mut Self {
    self.root_ca = Some(Arc::new(provider));
    self
  }
  pub fn namer(&mut self, namer: impl PolicyNamer + 'static) -> &mut Self {
    self.namer = Some(Arc::new(namer));
    self
  }
  /// Root CA lookup as configured: the pinned `root_ca_file` if any, else the system probe
  pub fn root_ca_from_config(&mut self, config: &Config) -> &mut Self {
    match config.root_ca_file.as_ref() {
      Some(path) => self.root_ca(StaticRootCa::new(path)),
      None => self.root_ca(SystemRootCa::new()),
    }
  }
}

impl ClusterSynthesizer {
  /// Build every cluster of the configuration in a single pass.
  ///
  /// Fails on the first cluster that cannot be built, or on a cluster name collision,
  /// so that the configuration can be rejected as a whole. Trust material problems
  /// never fail: they are returned as warnings alongside the clusters.
  pub fn synthesize(&self, config: &Config) -> Result<ClusterSnapshot, ClusterBuildError> {
    let mut clusters = Self::internal_clusters(config)?;
    let mut warnings = Vec::new();

    if config.services.is_proxy() {
      let mut names = clusters.iter().map(|c| c.name.clone()).collect::<HashSet<_>>();

      for (index, policy) in config.policies.iter().enumerate() {
        let name = self.namer.policy_name(policy);
        if !names.insert(name.clone()) {
          return Err(ClusterBuildError::DuplicateClusterName { name, index });
        }

        let (cluster, trust_error) =
          self
            .policy_cluster(&name, policy)
            .map_err(|e| ClusterBuildError::PolicyCluster {
              name: name.clone(),
              index,
              source: Box::new(e),
            })?;
        if let Some(error) = trust_error {
          warnings.push(ClusterWarning { cluster: name, error });
        }
        clusters.push(cluster);
      }
    } else {
      debug!("Service mode {:?} does not proxy, skipping policy clusters", config.services);
    }

    debug!("Synthesized {} clusters with {} warnings", clusters.len(), warnings.len());
    Ok(ClusterSnapshot { clusters, warnings })
  }

  /// Clusters of the control plane's own services, always in this order: gRPC, HTTP, authorize
  fn internal_clusters(config: &Config) -> Result<Vec<Cluster>, ClusterBuildError> {
    let internal = [
      (CONTROL_PLANE_GRPC_CLUSTER, config.grpc_address.clone(), !config.grpc_insecure),
      (CONTROL_PLANE_HTTP_CLUSTER, config.http_address.clone(), false),
      (
        AUTHORIZE_CLUSTER,
        url_authority(&config.authorize_url),
        config.authorize_url.scheme() == "https",
      ),
    ];

    internal
      .into_iter()
      .map(|(name, authority, tls)| {
        // bare TLS context: the data plane validates its own control plane with its defaults
        let transport_socket = if tls {
          TransportSocket::tls(UpstreamTlsContext::default())
        } else {
          TransportSocket::Plaintext
        };
        let force_http2 = name != CONTROL_PLANE_HTTP_CLUSTER;
        build_cluster(name, &authority, transport_socket, force_http2).map_err(|e| ClusterBuildError::InternalCluster {
          name: name.to_string(),
          source: Box::new(e),
        })
      })
      .collect()
  }

  fn policy_cluster(
    &self,
    name: &str,
    policy: &BackendPolicy,
  ) -> Result<(Cluster, Option<TrustMaterialError>), ClusterBuildError> {
    let scheme = policy.destination.scheme();
    if scheme != "http" && scheme != "https" {
      return Err(ClusterBuildError::UnsupportedScheme(scheme.to_string()));
    }

    let (transport_socket, trust_error) = build_policy_transport_socket(policy, self.root_ca.as_ref());
    let cluster = build_cluster(name, &policy.destination_authority(), transport_socket, false)?;
    Ok((cluster, trust_error))
  }
}
