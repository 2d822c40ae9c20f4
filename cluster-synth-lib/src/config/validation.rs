use crate::{
  config::BackendPolicy,
  target::{TargetAddr, split_authority, url_authority},
  trust::decode_wrapped_base64,
};
use std::{net::Ipv4Addr, path::Path};
use url::{Host, Url};

/// Validation errors specific to configuration
#[derive(thiserror::Error, Debug)]
pub enum ConfigValidationError {
  #[error("Missing required field: {field}")]
  MissingRequiredField { field: String },

  #[error("Invalid value for field {field}: {value}. {reason}")]
  InvalidFieldValue { field: String, value: String, reason: String },

  #[error("Policy validation error for '{policy}': {reason}")]
  PolicyValidationError { policy: String, reason: String },

  #[error("Address validation error: {reason}")]
  AddressError { reason: String },

  #[error("Conflicting configuration: {reason}")]
  ConflictingConfiguration { reason: String },
}

/// Result type for configuration validation
pub type ValidationResult<T> = Result<T, ConfigValidationError>;

/// Parse a URL field.
/// The URL parser rewrites shorthand IPv4 hosts ("10.0.0", "2130706433", "0x0a.0.0.5") into dotted quads,
/// so an IPv4 host is only accepted when it was typed as one.
pub(crate) fn parse_url(field: &str, value: &str) -> ValidationResult<Url> {
  let url = Url::parse(value).map_err(|e| ConfigValidationError::InvalidFieldValue {
    field: field.to_string(),
    value: value.to_string(),
    reason: e.to_string(),
  })?;

  if let Some(Host::Ipv4(ip)) = url.host() {
    let typed = typed_host(value).and_then(|host| host.parse::<Ipv4Addr>().ok());
    if typed != Some(ip) {
      return Err(ConfigValidationError::InvalidFieldValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: format!("Host is not a literal IPv4 address and would be read as {ip}"),
      });
    }
  }
  Ok(url)
}

/// Host of a URL string as written, before any normalization
fn typed_host(value: &str) -> Option<&str> {
  let (_, rest) = value.split_once("://")?;
  let authority = rest.split(['/', '\\', '?', '#']).next().unwrap_or_default();
  let authority = authority.rsplit_once('@').map_or(authority, |(_, host_port)| host_port);
  split_authority(authority).ok().map(|(host, _)| host)
}

/// Validator for basic configuration fields
pub struct BasicConfigValidator;

impl BasicConfigValidator {
  /// Validate a control plane bind address given as `host:port`
  pub fn validate_bind_address(field: &str, address: &str) -> ValidationResult<()> {
    let target = TargetAddr::from_authority(address, false).map_err(|e| ConfigValidationError::AddressError {
      reason: format!("Invalid {field} '{address}': {e}"),
    })?;

    // the default port only moves with the transport when no port is given
    let implicit_port = TargetAddr::from_authority(address, true).is_ok_and(|tls| tls.port() != target.port());
    if implicit_port {
      crate::trace::warn!("{} '{}' has no explicit port, assuming {}", field, address, target.port());
    }
    Ok(())
  }

  /// Validate the authorize service URL
  pub fn validate_authorize_url(url: &Url) -> ValidationResult<()> {
    if !matches!(url.scheme(), "http" | "https") {
      return Err(ConfigValidationError::InvalidFieldValue {
        field: "authorize_url".to_string(),
        value: url.to_string(),
        reason: "Scheme must be http or https".to_string(),
      });
    }

    TargetAddr::from_authority(&url_authority(url), url.scheme() == "https").map_err(|e| {
      ConfigValidationError::AddressError {
        reason: format!("Invalid authorize_url '{url}': {e}"),
      }
    })?;

    if url.scheme() == "http" {
      crate::trace::warn!("authorize_url {} is plaintext", url);
    }
    Ok(())
  }
}

/// Validator for backend policies
pub struct PolicyValidator;

impl PolicyValidator {
  /// Validate a complete policy
  pub fn validate_policy(policy: &BackendPolicy) -> ValidationResult<()> {
    let name = policy.from.as_str();
    Self::validate_url(name, "from", &policy.from)?;
    Self::validate_url(name, "to", &policy.destination)?;
    if let Some(server_name) = policy.tls_server_name.as_deref() {
      Self::validate_server_name(name, server_name)?;
    }
    Self::validate_custom_ca(
      name,
      policy.tls_custom_ca_file.as_deref(),
      policy.tls_custom_ca.as_deref(),
    );
    Self::validate_tls_settings(policy);

    crate::trace::debug!("Validated policy '{}' -> '{}'", name, policy.destination);
    Ok(())
  }

  /// `from` and `to` must be http(s) URLs with a resolvable authority
  pub fn validate_url(policy: &str, field: &str, url: &Url) -> ValidationResult<()> {
    if !matches!(url.scheme(), "http" | "https") {
      return Err(ConfigValidationError::PolicyValidationError {
        policy: policy.to_string(),
        reason: format!("'{field}' scheme must be http or https, got '{}'", url.scheme()),
      });
    }

    TargetAddr::from_authority(&url_authority(url), url.scheme() == "https").map_err(|e| {
      ConfigValidationError::PolicyValidationError {
        policy: policy.to_string(),
        reason: format!("Invalid '{field}' URL '{url}': {e}"),
      }
    })?;
    Ok(())
  }

  /// TLS server name override: non-empty, no whitespace
  pub fn validate_server_name(policy: &str, server_name: &str) -> ValidationResult<()> {
    if server_name.is_empty() {
      return Err(ConfigValidationError::PolicyValidationError {
        policy: policy.to_string(),
        reason: "TLS server name cannot be empty".to_string(),
      });
    }
    if server_name.chars().any(char::is_whitespace) {
      return Err(ConfigValidationError::PolicyValidationError {
        policy: policy.to_string(),
        reason: format!("Invalid TLS server name '{}': cannot contain spaces", server_name),
      });
    }
    Ok(())
  }

  /// Custom CA settings only ever warn: the file wins over inline bytes,
  /// and broken inline bytes are reported per cluster at synthesis time.
  pub fn validate_custom_ca(policy: &str, file: Option<&Path>, inline: Option<&str>) {
    if let (Some(file), Some(_)) = (file, inline) {
      crate::trace::warn!(
        "Policy '{}' sets both tls_custom_ca_file and tls_custom_ca, {} takes precedence",
        policy,
        file.display()
      );
    }
    if inline.is_some_and(|inline| decode_wrapped_base64(inline).is_err()) {
      crate::trace::warn!("Policy '{}' has a tls_custom_ca that is not valid base64", policy);
    }
  }

  /// TLS settings are meaningless on plaintext destinations
  pub fn validate_tls_settings(policy: &BackendPolicy) {
    if policy.is_tls() {
      return;
    }
    let has_tls_settings = policy.tls_server_name.is_some()
      || policy.client_certificate.is_some()
      || policy.tls_custom_ca_file.is_some()
      || policy.tls_custom_ca.is_some()
      || policy.tls_skip_verify;
    if has_tls_settings {
      crate::trace::warn!(
        "Policy '{}' has TLS settings but its destination {} is plaintext, they are ignored",
        policy.from,
        policy.destination
      );
    }
  }

  /// A client certificate needs both halves or none
  pub fn validate_client_certificate_pair<T>(
    policy: &str,
    certificate: Option<T>,
    private_key: Option<T>,
  ) -> ValidationResult<Option<(T, T)>> {
    match (certificate, private_key) {
      (Some(cert), Some(key)) => Ok(Some((cert, key))),
      (None, None) => Ok(None),
      (Some(_), None) => Err(ConfigValidationError::ConflictingConfiguration {
        reason: format!("Policy '{policy}' has a client certificate without private key"),
      }),
      (None, Some(_)) => Err(ConfigValidationError::ConflictingConfiguration {
        reason: format!("Policy '{policy}' has a client private key without certificate"),
      }),
    }
  }
}
