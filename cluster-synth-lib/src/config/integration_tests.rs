//! Configuration to cluster snapshot, end to end

#[cfg(test)]
mod tests {
  use crate::{
    BackendPolicyBuilder, ClientCertificate, ClusterBuildError, ClusterSynthesizer, ClusterSynthesizerBuilder, ConfigBuilder,
    DataSource, DiscoveryType, StaticRootCa, StringMatcher, TrustChainVerification, TrustMaterialError,
  };
  use base64::{Engine as _, engine::general_purpose::STANDARD};
  use std::path::PathBuf;

  const SYSTEM_ROOTS: &str = "/etc/ssl/certs/ca-certificates.crt";

  fn init_logger() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
  }

  fn synthesizer() -> ClusterSynthesizer {
    ClusterSynthesizerBuilder::default()
      .root_ca(StaticRootCa::new(SYSTEM_ROOTS))
      .build()
      .unwrap()
  }

  fn config_builder() -> ConfigBuilder {
    ConfigBuilder::new()
      .with_grpc_address("127.0.0.1:5443")
      .unwrap()
      .with_http_address("127.0.0.1:5080")
      .unwrap()
      .with_authorize_url("https://authorize.internal:5443")
      .unwrap()
  }

  fn policy(to: &str) -> BackendPolicyBuilder {
    BackendPolicyBuilder::new()
      .with_from("https://app.example.com")
      .unwrap()
      .with_destination(to)
      .unwrap()
  }

  #[test]
  fn test_static_https_destination() {
    init_logger();
    let config = config_builder()
      .with_policy(policy("https://10.0.0.5:8443").build().unwrap())
      .unwrap()
      .build()
      .unwrap();
    let snapshot = synthesizer().synthesize(&config).unwrap();
    assert!(snapshot.warnings.is_empty());

    let cluster = snapshot.clusters.last().unwrap();
    assert_eq!(cluster.cluster_discovery_type, DiscoveryType::Static);
    assert_eq!(cluster.endpoint_address().unwrap().to_string(), "10.0.0.5:8443");

    let ctx = cluster.transport_socket.tls_context().unwrap();
    assert_eq!(ctx.sni, "10.0.0.5");
    let validation = ctx.common_tls_context.validation_context.as_ref().unwrap();
    assert_eq!(validation.trusted_ca, Some(DataSource::Filename(PathBuf::from(SYSTEM_ROOTS))));
    assert_eq!(validation.trust_chain_verification, TrustChainVerification::Verify);
  }

  #[test]
  fn test_plain_dns_destination() {
    init_logger();
    let config = config_builder()
      .with_policy(policy("http://backend.internal").build().unwrap())
      .unwrap()
      .build()
      .unwrap();
    let snapshot = synthesizer().synthesize(&config).unwrap();

    let cluster = snapshot.clusters.last().unwrap();
    assert_eq!(cluster.endpoint_address().unwrap().to_string(), "backend.internal:80");
    assert_eq!(cluster.cluster_discovery_type, DiscoveryType::LogicalDns);
    assert!(cluster.transport_socket.is_plaintext());
    assert!(cluster.http2_protocol_options.is_none());
  }

  #[test]
  fn test_https_default_port() {
    let config = config_builder()
      .with_policy(policy("https://backend.internal").build().unwrap())
      .unwrap()
      .build()
      .unwrap();
    let snapshot = synthesizer().synthesize(&config).unwrap();
    let cluster = snapshot.clusters.last().unwrap();
    assert_eq!(cluster.endpoint_address().unwrap().to_string(), "backend.internal:443");
  }

  #[test]
  fn test_invalid_inline_ca_is_a_warning() {
    init_logger();
    let config = config_builder()
      .with_policy(policy("https://backend.internal").with_tls_custom_ca("%%%not-base64").build().unwrap())
      .unwrap()
      .with_policy(policy("https://other.internal").build().unwrap())
      .unwrap()
      .build()
      .unwrap();
    let snapshot = synthesizer().synthesize(&config).unwrap();
    assert_eq!(snapshot.clusters.len(), 5);

    assert_eq!(snapshot.warnings.len(), 1);
    let warning = &snapshot.warnings[0];
    assert_eq!(warning.cluster, snapshot.clusters[3].name);
    assert!(matches!(warning.error, TrustMaterialError::InvalidInlineCa(_)));

    let degraded = snapshot.clusters[3].transport_socket.tls_context().unwrap();
    assert!(degraded.common_tls_context.validation_context.as_ref().unwrap().trusted_ca.is_none());

    // the next cluster is untouched
    let healthy = snapshot.clusters[4].transport_socket.tls_context().unwrap();
    assert!(healthy.common_tls_context.validation_context.as_ref().unwrap().trusted_ca.is_some());

    let json = serde_json::to_value(&snapshot.clusters[3]).unwrap();
    assert!(
      json["transport_socket"]["typed_config"]["common_tls_context"]["validation_context"]
        .get("trusted_ca")
        .is_none()
    );
  }

  #[test]
  fn test_wrapped_inline_ca() {
    let ca = (0u8..100).collect::<Vec<_>>();
    let encoded = STANDARD.encode(&ca);
    let wrapped = format!("{}\n{}\n", &encoded[..64], &encoded[64..]);
    let config = config_builder()
      .with_policy(policy("https://backend.internal").with_tls_custom_ca(wrapped).build().unwrap())
      .unwrap()
      .build()
      .unwrap();
    let snapshot = synthesizer().synthesize(&config).unwrap();
    assert!(snapshot.warnings.is_empty());

    let ctx = snapshot.clusters.last().unwrap().transport_socket.tls_context().unwrap();
    assert_eq!(
      ctx.common_tls_context.validation_context.as_ref().unwrap().trusted_ca,
      Some(DataSource::inline("custom-ca.pem", ca))
    );
  }

  #[test]
  fn test_shorthand_ipv4_destinations_are_rejected() {
    for to in ["https://10.0.0", "http://2130706433", "http://0x0a.0.0.5"] {
      assert!(BackendPolicyBuilder::new().with_destination(to).is_err(), "{to}");
    }

    let config = config_builder()
      .with_policy(policy("https://10.0.0.5").build().unwrap())
      .unwrap()
      .build()
      .unwrap();
    let snapshot = synthesizer().synthesize(&config).unwrap();
    let cluster = snapshot.clusters.last().unwrap();
    assert_eq!(cluster.endpoint_address().unwrap().to_string(), "10.0.0.5:443");
    assert_eq!(cluster.transport_socket.tls_context().unwrap().sni, "10.0.0.5");
  }

  #[test]
  fn test_skip_verify_with_override_and_client_cert() {
    let client_certificate = ClientCertificate {
      certificate: DataSource::inline("client-cert.pem", b"cert".to_vec()),
      private_key: DataSource::inline("client-key.pem", b"key".to_vec()),
    };
    let config = config_builder()
      .with_policy(
        policy("https://10.0.0.7")
          .with_tls_server_name("backend.example.com")
          .unwrap()
          .with_tls_skip_verify(true)
          .with_client_certificate(client_certificate)
          .with_tls_custom_ca_file("/etc/backend/ca.pem")
          .build()
          .unwrap(),
      )
      .unwrap()
      .build()
      .unwrap();
    let snapshot = synthesizer().synthesize(&config).unwrap();

    let cluster = snapshot.clusters.last().unwrap();
    assert_eq!(cluster.cluster_discovery_type, DiscoveryType::Static);
    assert_eq!(cluster.endpoint_address().unwrap().to_string(), "10.0.0.7:443");

    let ctx = cluster.transport_socket.tls_context().unwrap();
    assert_eq!(ctx.sni, "backend.example.com");
    assert_eq!(ctx.common_tls_context.tls_certificates.len(), 1);
    let validation = ctx.common_tls_context.validation_context.as_ref().unwrap();
    assert_eq!(validation.trust_chain_verification, TrustChainVerification::AcceptUntrusted);
    assert_eq!(
      validation.match_subject_alt_names,
      vec![StringMatcher::Exact("backend.example.com".to_string())]
    );
    assert_eq!(
      validation.trusted_ca,
      Some(DataSource::Filename(PathBuf::from("/etc/backend/ca.pem")))
    );
  }

  #[test]
  fn test_snapshots_are_reproducible() {
    let config = config_builder()
      .with_policy(policy("https://a.internal").build().unwrap())
      .unwrap()
      .with_policy(policy("http://b.internal:8080").build().unwrap())
      .unwrap()
      .build()
      .unwrap();
    let synthesizer = synthesizer();
    let first = synthesizer.synthesize(&config).unwrap();
    let second = synthesizer.synthesize(&config).unwrap();
    assert_eq!(first, second);
  }

  #[test]
  fn test_concurrent_synthesis() {
    let synthesizer = &synthesizer();
    let configs = (0..4)
      .map(|i| {
        config_builder()
          .with_policy(policy(&format!("http://backend-{i}.internal")).build().unwrap())
          .unwrap()
          .build()
          .unwrap()
      })
      .collect::<Vec<_>>();

    std::thread::scope(|s| {
      let handles = configs
        .iter()
        .map(|config| s.spawn(move || synthesizer.synthesize(config)))
        .collect::<Vec<_>>();
      for (i, handle) in handles.into_iter().enumerate() {
        let snapshot = handle.join().unwrap().unwrap();
        assert_eq!(
          snapshot.clusters.last().unwrap().endpoint_address().unwrap().address,
          format!("backend-{i}.internal")
        );
      }
    });
  }

  #[test]
  fn test_duplicate_routes_are_rejected() {
    let config = config_builder()
      .with_policy(policy("http://backend.internal").build().unwrap())
      .unwrap()
      .with_policy(policy("http://backend.internal").build().unwrap())
      .unwrap()
      .build()
      .unwrap();
    assert!(matches!(
      synthesizer().synthesize(&config),
      Err(ClusterBuildError::DuplicateClusterName { index: 1, .. })
    ));
  }
}
