//! Upstream TLS context synthesis

use crate::{
  config::{BackendPolicy, ClientCertificate},
  constants::{TLS_TRANSPORT_SOCKET_NAME, UPSTREAM_ALPN},
  error::TrustMaterialError,
  trace::*,
  trust::{DataSource, RootCaProvider, resolve_trusted_ca},
};
use serde::{Serialize, Serializer, ser::SerializeStruct};

/// Transport socket of a cluster: plaintext, or TLS with its upstream context
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TransportSocket {
  #[default]
  Plaintext,
  Tls(Box<UpstreamTlsContext>),
}

impl TransportSocket {
  pub fn tls(context: UpstreamTlsContext) -> Self {
    TransportSocket::Tls(Box::new(context))
  }

  pub fn is_tls(&self) -> bool {
    matches!(self, TransportSocket::Tls(_))
  }

  pub fn is_plaintext(&self) -> bool {
    !self.is_tls()
  }

  /// Upstream TLS context, if any
  pub fn tls_context(&self) -> Option<&UpstreamTlsContext> {
    match self {
      TransportSocket::Plaintext => None,
      TransportSocket::Tls(context) => Some(&**context),
    }
  }
}

impl Serialize for TransportSocket {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      TransportSocket::Plaintext => serializer.serialize_none(),
      TransportSocket::Tls(context) => {
        let mut state = serializer.serialize_struct("TransportSocket", 2)?;
        state.serialize_field("name", TLS_TRANSPORT_SOCKET_NAME)?;
        state.serialize_field("typed_config", context)?;
        state.end()
      }
    }
  }
}

/* ---------------------------------------------------------- */
/// TLS context used when connecting to an upstream
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct UpstreamTlsContext {
  pub common_tls_context: CommonTlsContext,
  #[serde(skip_serializing_if = "String::is_empty")]
  pub sni: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CommonTlsContext {
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub alpn_protocols: Vec<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub tls_certificates: Vec<TlsCertificate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub validation_context: Option<CertificateValidationContext>,
}

/// Certificate and key presented to the upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TlsCertificate {
  pub certificate_chain: DataSource,
  pub private_key: DataSource,
}

impl From<&ClientCertificate> for TlsCertificate {
  fn from(cert: &ClientCertificate) -> Self {
    Self {
      certificate_chain: cert.certificate.clone(),
      private_key: cert.private_key.clone(),
    }
  }
}

/// How the upstream certificate is validated
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CertificateValidationContext {
  pub match_subject_alt_names: Vec<StringMatcher>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub trusted_ca: Option<DataSource>,
  pub trust_chain_verification: TrustChainVerification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StringMatcher {
  Exact(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrustChainVerification {
  /// Verify the peer certificate chain against the trusted CA
  #[default]
  Verify,
  /// Accept any chain. Subject alt names are still matched.
  AcceptUntrusted,
}

/* ---------------------------------------------------------- */
/// Build the upstream TLS context of a policy from its already resolved trusted CA.
///
/// - ALPN is pinned to HTTP/1.1
/// - the peer SAN must exactly match the effective SNI, even when verification is skipped
/// - `tls_skip_verify` only turns chain verification into `ACCEPT_UNTRUSTED`
/// - the client certificate, if any, is the only certificate entry
pub fn build_upstream_tls_context(policy: &BackendPolicy, trusted_ca: Option<DataSource>) -> UpstreamTlsContext {
  let sni = policy.effective_sni();

  let trust_chain_verification = if policy.tls_skip_verify {
    TrustChainVerification::AcceptUntrusted
  } else {
    TrustChainVerification::Verify
  };
  let validation_context = CertificateValidationContext {
    match_subject_alt_names: vec![StringMatcher::Exact(sni.clone())],
    trusted_ca,
    trust_chain_verification,
  };

  let tls_certificates = policy.client_certificate.iter().map(TlsCertificate::from).collect();

  UpstreamTlsContext {
    common_tls_context: CommonTlsContext {
      alpn_protocols: vec![UPSTREAM_ALPN.to_string()],
      tls_certificates,
      validation_context: Some(validation_context),
    },
    sni,
  }
}

/// Transport socket of a policy cluster.
/// Only `https` destinations get TLS. A trust material problem degrades the context
/// to one without trusted CA, and is handed back so the caller can attach it to the cluster.
pub fn build_policy_transport_socket(
  policy: &BackendPolicy,
  roots: &dyn RootCaProvider,
) -> (TransportSocket, Option<TrustMaterialError>) {
  if !policy.is_tls() {
    return (TransportSocket::Plaintext, None);
  }

  let (trusted_ca, trust_error) = match resolve_trusted_ca(policy, roots) {
    Ok(ca) => (Some(ca), None),
    Err(e) => {
      debug!("No trusted CA for {}: {}", policy.destination, e);
      (None, Some(e))
    }
  };

  (
    TransportSocket::tls(build_upstream_tls_context(policy, trusted_ca)),
    trust_error,
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{config::BackendPolicyBuilder, trust::StaticRootCa};
  use std::path::PathBuf;

  fn https_policy() -> BackendPolicyBuilder {
    BackendPolicyBuilder::new()
      .with_from("https://app.example.com")
      .unwrap()
      .with_destination("https://backend.internal:8443")
      .unwrap()
  }

  #[test]
  fn test_default_context() {
    let policy = https_policy().build().unwrap();
    let ctx = build_upstream_tls_context(&policy, Some(DataSource::Filename(PathBuf::from("/etc/ssl/cert.pem"))));

    assert_eq!(ctx.sni, "backend.internal");
    assert_eq!(ctx.common_tls_context.alpn_protocols, vec!["http/1.1".to_string()]);
    assert!(ctx.common_tls_context.tls_certificates.is_empty());

    let validation = ctx.common_tls_context.validation_context.unwrap();
    assert_eq!(
      validation.match_subject_alt_names,
      vec![StringMatcher::Exact("backend.internal".to_string())]
    );
    assert_eq!(validation.trust_chain_verification, TrustChainVerification::Verify);
    assert!(validation.trusted_ca.is_some());
  }

  #[test]
  fn test_server_name_override() {
    let policy = https_policy().with_tls_server_name("app.internal").unwrap().build().unwrap();
    let ctx = build_upstream_tls_context(&policy, None);
    assert_eq!(ctx.sni, "app.internal");
    assert_eq!(
      ctx.common_tls_context.validation_context.unwrap().match_subject_alt_names,
      vec![StringMatcher::Exact("app.internal".to_string())]
    );
  }

  #[test]
  fn test_skip_verify_keeps_san_match() {
    let policy = https_policy().with_tls_skip_verify(true).build().unwrap();
    let ctx = build_upstream_tls_context(&policy, None);
    let validation = ctx.common_tls_context.validation_context.unwrap();
    assert_eq!(validation.trust_chain_verification, TrustChainVerification::AcceptUntrusted);
    assert_eq!(
      validation.match_subject_alt_names,
      vec![StringMatcher::Exact("backend.internal".to_string())]
    );
  }

  #[test]
  fn test_client_certificate() {
    let policy = https_policy()
      .with_client_certificate(ClientCertificate {
        certificate: DataSource::Filename(PathBuf::from("/certs/client.pem")),
        private_key: DataSource::Filename(PathBuf::from("/certs/client-key.pem")),
      })
      .build()
      .unwrap();
    let ctx = build_upstream_tls_context(&policy, None);
    assert_eq!(ctx.common_tls_context.tls_certificates.len(), 1);
    assert_eq!(
      ctx.common_tls_context.tls_certificates[0].certificate_chain,
      DataSource::Filename(PathBuf::from("/certs/client.pem"))
    );
  }

  #[test]
  fn test_plaintext_destination_has_no_tls() {
    let policy = BackendPolicyBuilder::new()
      .with_from("https://app.example.com")
      .unwrap()
      .with_destination("http://backend.internal")
      .unwrap()
      .with_tls_skip_verify(true)
      .build()
      .unwrap();
    let (socket, err) = build_policy_transport_socket(&policy, &StaticRootCa::unavailable());
    assert_eq!(socket, TransportSocket::Plaintext);
    assert!(err.is_none());
  }

  #[test]
  fn test_missing_roots_degrade_to_no_trusted_ca() {
    let policy = https_policy().build().unwrap();
    let (socket, err) = build_policy_transport_socket(&policy, &StaticRootCa::unavailable());
    assert_eq!(err, Some(TrustMaterialError::RootCaUnavailable));

    let ctx = socket.tls_context().unwrap();
    assert!(ctx.common_tls_context.validation_context.as_ref().unwrap().trusted_ca.is_none());
  }

  #[test]
  fn test_tls_context_json() {
    let policy = https_policy().with_tls_skip_verify(true).build().unwrap();
    let socket = TransportSocket::tls(build_upstream_tls_context(
      &policy,
      Some(DataSource::inline("custom-ca.pem", b"pem".to_vec())),
    ));
    let json = serde_json::to_value(&socket).unwrap();

    assert_eq!(json["name"], "tls");
    let ctx = &json["typed_config"];
    assert_eq!(ctx["sni"], "backend.internal");
    assert_eq!(ctx["common_tls_context"]["alpn_protocols"][0], "http/1.1");
    let validation = &ctx["common_tls_context"]["validation_context"];
    assert_eq!(validation["match_subject_alt_names"][0]["exact"], "backend.internal");
    assert_eq!(validation["trust_chain_verification"], "ACCEPT_UNTRUSTED");
    assert_eq!(validation["trusted_ca"]["inline_bytes"]["filename"], "custom-ca.pem");
    assert_eq!(validation["trusted_ca"]["inline_bytes"]["bytes"], "cGVt");
  }
}
