use crate::config::{
  BackendPolicy, ClientCertificate, Config, ServiceMode,
  validation::*,
};
use std::path::PathBuf;
use url::Url;

/// Builder for creating the synthesis configuration with validation
#[derive(Debug, Default)]
pub struct ConfigBuilder {
  services: ServiceMode,
  grpc_address: Option<String>,
  grpc_insecure: bool,
  http_address: Option<String>,
  authorize_url: Option<Url>,
  root_ca_file: Option<PathBuf>,
  policies: Vec<BackendPolicy>,
}

impl ConfigBuilder {
  /// Create a new configuration builder
  pub fn new() -> Self {
    Self::default()
  }

  /// Set the running services
  pub fn with_services(mut self, services: ServiceMode) -> Self {
    self.services = services;
    self
  }

  /// Set the control plane gRPC bind address (required)
  pub fn with_grpc_address(mut self, address: &str) -> Result<Self, ConfigValidationError> {
    BasicConfigValidator::validate_bind_address("grpc_address", address)?;
    self.grpc_address = Some(address.to_string());
    Ok(self)
  }

  /// Serve the control plane gRPC endpoint without TLS
  pub fn with_grpc_insecure(mut self, insecure: bool) -> Self {
    self.grpc_insecure = insecure;
    self
  }

  /// Set the control plane HTTP bind address (required)
  pub fn with_http_address(mut self, address: &str) -> Result<Self, ConfigValidationError> {
    BasicConfigValidator::validate_bind_address("http_address", address)?;
    self.http_address = Some(address.to_string());
    Ok(self)
  }

  /// Set the authorize service URL (required)
  pub fn with_authorize_url(mut self, url: &str) -> Result<Self, ConfigValidationError> {
    let url = parse_url("authorize_url", url)?;
    BasicConfigValidator::validate_authorize_url(&url)?;
    self.authorize_url = Some(url);
    Ok(self)
  }

  /// Pin the root CA bundle instead of probing the system
  pub fn with_root_ca_file(mut self, path: impl Into<PathBuf>) -> Self {
    self.root_ca_file = Some(path.into());
    self
  }

  /// Append a policy
  pub fn with_policy(mut self, policy: BackendPolicy) -> Result<Self, ConfigValidationError> {
    PolicyValidator::validate_policy(&policy)?;
    self.policies.push(policy);
    Ok(self)
  }

  /// Append policies, keeping their order
  pub fn with_policies(self, policies: Vec<BackendPolicy>) -> Result<Self, ConfigValidationError> {
    policies.into_iter().try_fold(self, |builder, policy| builder.with_policy(policy))
  }

  /// Build the final configuration
  pub fn build(self) -> Result<Config, ConfigValidationError> {
    let grpc_address = self.grpc_address.ok_or(ConfigValidationError::MissingRequiredField {
      field: "grpc_address".to_string(),
    })?;
    let http_address = self.http_address.ok_or(ConfigValidationError::MissingRequiredField {
      field: "http_address".to_string(),
    })?;
    let authorize_url = self.authorize_url.ok_or(ConfigValidationError::MissingRequiredField {
      field: "authorize_url".to_string(),
    })?;

    if grpc_address == http_address {
      return Err(ConfigValidationError::ConflictingConfiguration {
        reason: format!("grpc_address and http_address are both {grpc_address}"),
      });
    }
    if self.policies.is_empty() && self.services.is_proxy() {
      crate::trace::warn!("No policies configured, only internal clusters will be synthesized");
    }

    Ok(Config {
      services: self.services,
      grpc_address,
      grpc_insecure: self.grpc_insecure,
      http_address,
      authorize_url,
      root_ca_file: self.root_ca_file,
      policies: self.policies,
    })
  }
}

/// Builder for creating backend policies with validation
#[derive(Debug, Default)]
pub struct BackendPolicyBuilder {
  from: Option<Url>,
  destination: Option<Url>,
  tls_server_name: Option<String>,
  client_certificate: Option<ClientCertificate>,
  tls_custom_ca_file: Option<PathBuf>,
  tls_custom_ca: Option<String>,
  tls_skip_verify: bool,
}

impl BackendPolicyBuilder {
  /// Create a new policy builder
  pub fn new() -> Self {
    Self::default()
  }

  /// Set the public URL of the route (required)
  pub fn with_from(mut self, from: &str) -> Result<Self, ConfigValidationError> {
    let url = parse_url("from", from)?;
    PolicyValidator::validate_url(from, "from", &url)?;
    self.from = Some(url);
    Ok(self)
  }

  /// Set the backend URL (required)
  pub fn with_destination(mut self, destination: &str) -> Result<Self, ConfigValidationError> {
    let url = parse_url("to", destination)?;
    PolicyValidator::validate_url(destination, "to", &url)?;
    self.destination = Some(url);
    Ok(self)
  }

  /// Override SNI and the expected peer SAN. An empty name means no override.
  pub fn with_tls_server_name(mut self, server_name: &str) -> Result<Self, ConfigValidationError> {
    if server_name.is_empty() {
      self.tls_server_name = None;
      return Ok(self);
    }
    PolicyValidator::validate_server_name("tls_server_name", server_name)?;
    self.tls_server_name = Some(server_name.to_string());
    Ok(self)
  }

  /// Present a client certificate to the backend
  pub fn with_client_certificate(mut self, certificate: ClientCertificate) -> Self {
    self.client_certificate = Some(certificate);
    self
  }

  /// Trust the CA in this file
  pub fn with_tls_custom_ca_file(mut self, path: impl Into<PathBuf>) -> Self {
    self.tls_custom_ca_file = Some(path.into());
    self
  }

  /// Trust this base64 encoded CA bundle
  pub fn with_tls_custom_ca(mut self, encoded: impl Into<String>) -> Self {
    self.tls_custom_ca = Some(encoded.into());
    self
  }

  /// Skip certificate chain verification
  pub fn with_tls_skip_verify(mut self, skip: bool) -> Self {
    self.tls_skip_verify = skip;
    self
  }

  /// Build the policy
  pub fn build(self) -> Result<BackendPolicy, ConfigValidationError> {
    let from = self.from.ok_or(ConfigValidationError::MissingRequiredField {
      field: "from".to_string(),
    })?;
    let destination = self.destination.ok_or(ConfigValidationError::MissingRequiredField {
      field: "to".to_string(),
    })?;

    let policy = BackendPolicy {
      from,
      destination,
      tls_server_name: self.tls_server_name,
      client_certificate: self.client_certificate,
      tls_custom_ca_file: self.tls_custom_ca_file.filter(|p| !p.as_os_str().is_empty()),
      tls_custom_ca: self.tls_custom_ca.filter(|s| !s.is_empty()),
      tls_skip_verify: self.tls_skip_verify,
    };
    PolicyValidator::validate_policy(&policy)?;
    Ok(policy)
  }
}
