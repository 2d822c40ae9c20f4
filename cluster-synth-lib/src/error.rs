/// Errors that make a cluster impossible to build.
/// The policy that caused it should be rejected by the configuration layer, never silently dropped.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterBuildError {
  /* --------------------------------------- */
  #[error("Empty host in destination: '{0}'")]
  EmptyHost(String),

  #[error("Invalid port '{port}' in destination '{destination}'")]
  InvalidPort { destination: String, port: String },

  #[error("Invalid domain name: '{0}'")]
  InvalidDomain(String),

  #[error("Unsupported destination scheme: '{0}'")]
  UnsupportedScheme(String),

  /* --------------------------------------- */
  /// Two clusters ended up with the same name
  #[error("Duplicate cluster name '{name}' produced for policy #{index}")]
  DuplicateClusterName { name: String, index: usize },

  /// A policy cluster failed to build
  #[error("Failed to build cluster '{name}' for policy #{index}: {source}")]
  PolicyCluster {
    name: String,
    index: usize,
    #[source]
    source: Box<ClusterBuildError>,
  },

  /// An internal cluster failed to build, i.e., a control plane bind address is broken
  #[error("Failed to build internal cluster '{name}': {source}")]
  InternalCluster {
    name: String,
    #[source]
    source: Box<ClusterBuildError>,
  },
}

/// Trust material could not be resolved for a cluster.
/// Never fatal: the cluster is emitted without a trusted CA and the error is attached to it as a warning.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TrustMaterialError {
  #[error("Invalid custom CA certificate: {0}")]
  InvalidInlineCa(#[from] base64::DecodeError),

  #[error("Unable to enable certificate verification because no root CAs were found")]
  RootCaUnavailable,
}
