use crate::{
  config::BackendPolicy,
  constants::{POLICY_CLUSTER_PREFIX, POLICY_NAME_DIGEST_BYTES},
};
use sha2::{Digest, Sha256};

/// Derives the cluster name of a backend policy
pub trait PolicyNamer: Send + Sync {
  fn policy_name(&self, policy: &BackendPolicy) -> String;
}

impl<F> PolicyNamer for F
where
  F: Fn(&BackendPolicy) -> String + Send + Sync,
{
  fn policy_name(&self, policy: &BackendPolicy) -> String {
    self(policy)
  }
}

/// `policy-<hex>` where the hex is a truncated SHA-256 of the route (from + destination).
/// The same route keeps the same name across configuration epochs.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashPolicyNamer;

impl PolicyNamer for HashPolicyNamer {
  fn policy_name(&self, policy: &BackendPolicy) -> String {
    let mut hasher = Sha256::new();
    hasher.update(policy.from.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(policy.destination.as_str().as_bytes());
    let digest = hasher.finalize();

    let hex = digest
      .iter()
      .take(POLICY_NAME_DIGEST_BYTES)
      .map(|b| format!("{b:02x}"))
      .collect::<String>();
    format!("{POLICY_CLUSTER_PREFIX}{hex}")
  }
}
