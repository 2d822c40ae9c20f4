#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod config;
mod log;

use crate::{
  config::{ConfigToml, parse_opts},
  log::*,
};
use anyhow::anyhow;
use rpxy_xds_lib::{ClusterSynthesizerBuilder, Config};
use std::io::Write;

fn main() {
  init_logger();

  if let Err(e) = run() {
    error!("{e}");
    std::process::exit(1);
  }
}

fn run() -> Result<(), anyhow::Error> {
  let opts = parse_opts()?;
  let config_toml = ConfigToml::new(&opts.config_file_path)
    .map_err(|e| anyhow!("Invalid toml file {}: {}", opts.config_file_path, e))?;
  let config = Config::try_from(config_toml)?;
  info!(
    "Synthesizing clusters for {} policies ({:?})",
    config.policies.len(),
    config.services
  );

  let synthesizer = ClusterSynthesizerBuilder::default().root_ca_from_config(&config).build()?;

  let snapshot = synthesizer.synthesize(&config)?;
  for warning in snapshot.warnings.iter() {
    warn!("Degraded trust material: {warning}");
  }
  if opts.strict && !snapshot.warnings.is_empty() {
    return Err(anyhow!(
      "{} clusters have degraded trust material, refusing in strict mode",
      snapshot.warnings.len()
    ));
  }

  let json = if opts.pretty {
    serde_json::to_string_pretty(&snapshot.clusters)?
  } else {
    serde_json::to_string(&snapshot.clusters)?
  };
  let mut stdout = std::io::stdout().lock();
  writeln!(stdout, "{json}")?;

  info!("Emitted {} clusters", snapshot.clusters.len());
  Ok(())
}
