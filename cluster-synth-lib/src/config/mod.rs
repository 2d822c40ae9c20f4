use std::path::PathBuf;
use url::Url;

pub mod builder;
#[cfg(test)]
mod integration_tests;
mod policy;
pub mod validation;

pub use builder::{BackendPolicyBuilder, ConfigBuilder};
pub use policy::{BackendPolicy, ClientCertificate};
pub use validation::{ConfigValidationError, ValidationResult};

/// Configuration of one epoch, as far as cluster synthesis is concerned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  /// Services run by this process
  pub services: ServiceMode,
  /// Control plane gRPC bind address, `host:port`
  pub grpc_address: String,
  /// Control plane gRPC endpoint is served without TLS
  pub grpc_insecure: bool,
  /// Control plane HTTP bind address, `host:port`
  pub http_address: String,
  /// Authorize service URL; TLS iff `https`
  pub authorize_url: Url,
  /// Root CA bundle pinned by the operator.
  /// Not read during synthesis: hand it to `ClusterSynthesizerBuilder::root_ca_from_config`.
  pub root_ca_file: Option<PathBuf>,
  /// Backend policies, in configuration order
  pub policies: Vec<BackendPolicy>,
}

/// Services run by this process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceMode {
  #[default]
  /// Every service in one process [default]
  All,
  /// Externally facing proxy only
  Proxy,
  /// Authorize service only
  Authorize,
  /// Authenticate service only
  Authenticate,
}

impl ServiceMode {
  /// Whether the externally facing proxy runs, i.e., policy clusters are needed
  pub fn is_proxy(&self) -> bool {
    matches!(self, ServiceMode::All | ServiceMode::Proxy)
  }
}

impl TryFrom<&str> for ServiceMode {
  type Error = ConfigValidationError;
  fn try_from(value: &str) -> Result<Self, Self::Error> {
    match value {
      "all" => Ok(ServiceMode::All),
      "proxy" => Ok(ServiceMode::Proxy),
      "authorize" => Ok(ServiceMode::Authorize),
      "authenticate" => Ok(ServiceMode::Authenticate),
      _ => Err(ConfigValidationError::InvalidFieldValue {
        field: "services".to_string(),
        value: value.to_string(),
        reason: "Expected one of all, proxy, authorize, authenticate".to_string(),
      }),
    }
  }
}
