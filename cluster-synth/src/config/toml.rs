use crate::log::warn;
use anyhow::anyhow;
use rpxy_xds_lib::{
  BackendPolicy, CLIENT_CERT_FILENAME, CLIENT_KEY_FILENAME, ClientCertificate, Config, DataSource, ServiceMode,
  config::validation::PolicyValidator, decode_wrapped_base64,
};
use serde::Deserialize;
use std::{collections::HashSet, fs, path::PathBuf};

#[derive(Deserialize, Debug, Default, PartialEq, Eq, Clone)]
pub struct ConfigToml {
  pub services: Option<String>,
  pub grpc_address: Option<String>,
  pub grpc_insecure: Option<bool>,
  pub http_address: Option<String>,
  pub authorize_service_url: Option<String>,
  /// Overrides the system root CA lookup
  pub root_ca_file: Option<String>,
  pub policies: Option<Vec<PolicyToml>>,
}

#[derive(Deserialize, Debug, Default, PartialEq, Eq, Clone)]
pub struct PolicyToml {
  pub from: Option<String>,
  pub to: Option<String>,
  pub tls_server_name: Option<String>,
  pub tls_skip_verify: Option<bool>,
  /// Base64 encoded CA bundle
  pub tls_custom_ca: Option<String>,
  pub tls_custom_ca_file: Option<String>,
  /// Base64 encoded client certificate, pairs with `tls_client_key`
  pub tls_client_cert: Option<String>,
  /// Base64 encoded client private key
  pub tls_client_key: Option<String>,
  pub tls_client_cert_file: Option<String>,
  pub tls_client_key_file: Option<String>,
}

impl ConfigToml {
  pub fn new(config_file: &str) -> Result<Self, anyhow::Error> {
    let config_str = fs::read_to_string(config_file)?;
    Self::from_toml_str(&config_str)
  }

  /// Parse the content of a configuration file, warning about unsupported fields
  fn from_toml_str(config_str: &str) -> Result<Self, anyhow::Error> {
    // Check unused fields during deserialization
    let t = toml::de::Deserializer::new(config_str);
    let mut unused = HashSet::new();

    let res = serde_ignored::deserialize(t, |path| {
      unused.insert(path.to_string());
    })
    .map_err(|e| anyhow::anyhow!(e));

    if !unused.is_empty() {
      let str = unused.iter().fold(String::new(), |acc, x| acc + x + "\n");
      warn!("Configuration file contains unsupported fields. Check typos:\n{}", str);
    }

    res
  }
}

impl TryFrom<ConfigToml> for Config {
  type Error = anyhow::Error;

  fn try_from(config_toml: ConfigToml) -> Result<Self, Self::Error> {
    use rpxy_xds_lib::config::ConfigBuilder;

    let Some(grpc_address) = config_toml.grpc_address else {
      return Err(anyhow!("grpc_address is required"));
    };
    let Some(http_address) = config_toml.http_address else {
      return Err(anyhow!("http_address is required"));
    };
    let Some(authorize_service_url) = config_toml.authorize_service_url else {
      return Err(anyhow!("authorize_service_url is required"));
    };

    let services = match config_toml.services.as_deref() {
      Some(services) => ServiceMode::try_from(services)?,
      None => ServiceMode::default(),
    };

    let mut builder = ConfigBuilder::new()
      .with_services(services)
      .with_grpc_address(&grpc_address)
      .map_err(|e| anyhow!("Invalid gRPC address: {}", e))?
      .with_grpc_insecure(config_toml.grpc_insecure.unwrap_or(false))
      .with_http_address(&http_address)
      .map_err(|e| anyhow!("Invalid HTTP address: {}", e))?
      .with_authorize_url(&authorize_service_url)
      .map_err(|e| anyhow!("Invalid authorize service URL: {}", e))?;

    if let Some(root_ca_file) = config_toml.root_ca_file {
      builder = builder.with_root_ca_file(root_ca_file);
    }

    let policies = config_toml
      .policies
      .unwrap_or_default()
      .into_iter()
      .enumerate()
      .map(|(index, policy_toml)| policy_toml.into_policy(index))
      .collect::<Result<Vec<_>, _>>()?;
    builder = builder.with_policies(policies).map_err(|e| anyhow!("Invalid policy: {}", e))?;

    // Build the final configuration with validation
    builder.build().map_err(|e| anyhow!("Configuration validation failed: {}", e))
  }
}

impl PolicyToml {
  fn into_policy(self, index: usize) -> Result<BackendPolicy, anyhow::Error> {
    use rpxy_xds_lib::config::BackendPolicyBuilder;

    let label = format!("policies[{index}]");
    let Some(from) = self.from.as_ref() else {
      return Err(anyhow!("from is required for {label}"));
    };
    let Some(to) = self.to.as_ref() else {
      return Err(anyhow!("to is required for {label}"));
    };

    let mut builder = BackendPolicyBuilder::new()
      .with_from(from)
      .map_err(|e| anyhow!("Invalid from for {}: {}", label, e))?
      .with_destination(to)
      .map_err(|e| anyhow!("Invalid to for {}: {}", label, e))?
      .with_tls_skip_verify(self.tls_skip_verify.unwrap_or(false));

    if let Some(server_name) = self.tls_server_name.as_ref() {
      builder = builder
        .with_tls_server_name(server_name)
        .map_err(|e| anyhow!("Invalid tls_server_name for {}: {}", label, e))?;
    }
    if let Some(ca) = self.tls_custom_ca.as_ref() {
      builder = builder.with_tls_custom_ca(ca);
    }
    if let Some(ca_file) = self.tls_custom_ca_file.as_ref() {
      builder = builder.with_tls_custom_ca_file(ca_file);
    }
    if let Some(client_certificate) = self.client_certificate(&label)? {
      builder = builder.with_client_certificate(client_certificate);
    }

    builder
      .build()
      .map_err(|e| anyhow!("Failed to build policy {}: {}", label, e))
  }

  /// Client certificate given either inline (base64) or as a pair of files, never both
  fn client_certificate(&self, label: &str) -> Result<Option<ClientCertificate>, anyhow::Error> {
    let inline = PolicyValidator::validate_client_certificate_pair(
      label,
      self.tls_client_cert.as_deref(),
      self.tls_client_key.as_deref(),
    )?;
    let files = PolicyValidator::validate_client_certificate_pair(
      label,
      self.tls_client_cert_file.as_deref(),
      self.tls_client_key_file.as_deref(),
    )?;

    match (inline, files) {
      (Some(_), Some(_)) => Err(anyhow!(
        "{label}: tls_client_cert and tls_client_cert_file are mutually exclusive"
      )),
      (Some((cert, key)), None) => {
        let certificate = decode_wrapped_base64(cert)
          .map_err(|e| anyhow!("Invalid base64 in tls_client_cert for {}: {}", label, e))?;
        let private_key = decode_wrapped_base64(key)
          .map_err(|e| anyhow!("Invalid base64 in tls_client_key for {}: {}", label, e))?;
        Ok(Some(ClientCertificate {
          certificate: DataSource::inline(CLIENT_CERT_FILENAME, certificate),
          private_key: DataSource::inline(CLIENT_KEY_FILENAME, private_key),
        }))
      }
      (None, Some((cert_file, key_file))) => Ok(Some(ClientCertificate {
        certificate: DataSource::Filename(PathBuf::from(cert_file)),
        private_key: DataSource::Filename(PathBuf::from(key_file)),
      })),
      (None, None) => Ok(None),
    }
  }
}
