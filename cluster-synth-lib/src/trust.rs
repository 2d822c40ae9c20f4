//! Trust anchor resolution
//!
//! Decides which CA material the data plane uses to validate an upstream certificate.
//! Precedence is strict: custom CA file, then inline custom CA, then the system root bundle.
//! Nothing here opens a certificate file: file references are handed to the data plane as-is.

use crate::{
  config::BackendPolicy,
  constants::{CUSTOM_CA_FILENAME, SSL_CERT_FILE_ENV, SYSTEM_ROOT_CA_FILES},
  error::TrustMaterialError,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Serialize, Serializer};
use std::{
  path::{Path, PathBuf},
  sync::OnceLock,
};

/// Where the data plane reads certificate material from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
  /// Reference to a file on the data plane's filesystem
  Filename(PathBuf),
  /// Bytes carried inline, tagged with a synthetic filename
  InlineBytes {
    filename: String,
    #[serde(serialize_with = "serialize_base64")]
    bytes: Vec<u8>,
  },
}

impl DataSource {
  /// Inline bytes tagged with the given synthetic filename
  pub fn inline(filename: &str, bytes: Vec<u8>) -> Self {
    DataSource::InlineBytes {
      filename: filename.to_string(),
      bytes,
    }
  }
}

fn serialize_base64<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
  serializer.serialize_str(&STANDARD.encode(bytes))
}

/* ---------------------------------------------------------- */
/// Lookup of the host's root CA bundle
pub trait RootCaProvider: Send + Sync {
  /// Path of the root CA bundle, or `None` if no bundle is available
  fn root_ca_bundle(&self) -> Option<PathBuf>;
}

impl<F> RootCaProvider for F
where
  F: Fn() -> Option<PathBuf> + Send + Sync,
{
  fn root_ca_bundle(&self) -> Option<PathBuf> {
    self()
  }
}

/// Root CA bundle found by probing well-known system locations.
/// `SSL_CERT_FILE` is honoured first. The first hit is memoized for the lifetime of the provider.
#[derive(Debug, Default)]
pub struct SystemRootCa {
  found: OnceLock<Option<PathBuf>>,
}

impl SystemRootCa {
  pub fn new() -> Self {
    Self::default()
  }

  fn probe() -> Option<PathBuf> {
    let pinned = std::env::var_os(SSL_CERT_FILE_ENV).map(PathBuf::from);
    pinned
      .into_iter()
      .chain(SYSTEM_ROOT_CA_FILES.iter().map(PathBuf::from))
      .find(|path| path.is_file())
  }
}

impl RootCaProvider for SystemRootCa {
  fn root_ca_bundle(&self) -> Option<PathBuf> {
    self.found.get_or_init(Self::probe).clone()
  }
}

/// Fixed root CA bundle, e.g., pinned by configuration
#[derive(Debug, Clone, Default)]
pub struct StaticRootCa(Option<PathBuf>);

impl StaticRootCa {
  pub fn new(path: impl AsRef<Path>) -> Self {
    Self(Some(path.as_ref().to_path_buf()))
  }

  /// Provider that never finds a bundle
  pub fn unavailable() -> Self {
    Self(None)
  }
}

impl RootCaProvider for StaticRootCa {
  fn root_ca_bundle(&self) -> Option<PathBuf> {
    self.0.clone()
  }
}

/// Standard base64 that may be wrapped over several lines, e.g., a multi-line TOML string.
/// Line breaks are skipped; any other stray byte is an error.
pub fn decode_wrapped_base64(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
  let compact = encoded.chars().filter(|c| !matches!(c, '\r' | '\n')).collect::<String>();
  STANDARD.decode(compact)
}

/* ---------------------------------------------------------- */
/// Resolve the trusted CA for a policy
pub fn resolve_trusted_ca(policy: &BackendPolicy, roots: &dyn RootCaProvider) -> Result<DataSource, TrustMaterialError> {
  if let Some(path) = policy.tls_custom_ca_file.as_ref().filter(|p| !p.as_os_str().is_empty()) {
    return Ok(DataSource::Filename(path.clone()));
  }

  if let Some(encoded) = policy.tls_custom_ca.as_deref().filter(|s| !s.is_empty()) {
    let bytes = decode_wrapped_base64(encoded)?;
    return Ok(DataSource::inline(CUSTOM_CA_FILENAME, bytes));
  }

  roots
    .root_ca_bundle()
    .map(DataSource::Filename)
    .ok_or(TrustMaterialError::RootCaUnavailable)
}
