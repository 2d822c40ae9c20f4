#![allow(unused)]
pub use tracing::{debug, error, info, warn};

use std::str::FromStr;
use tracing_subscriber::{fmt, prelude::*};

pub fn init_logger() {
  let level_string = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
  let level = tracing::Level::from_str(level_string.as_str()).unwrap_or(tracing::Level::INFO);

  let passed_pkg_names = [
    env!("CARGO_PKG_NAME").replace('-', "_"),
    "rpxy_xds_lib".to_string(),
  ];

  // Descriptors go to stdout, so logs are written to stderr.
  // This crate and the library emit at any level, other crates only INFO or above.
  let stdio_layer = fmt::layer()
    .with_writer(std::io::stderr)
    .with_line_number(true)
    .with_thread_ids(false)
    .with_thread_names(true)
    .with_target(true)
    .with_level(true)
    .compact()
    .with_filter(tracing_subscriber::filter::filter_fn(move |metadata| {
      (passed_pkg_names
        .iter()
        .any(|pkg_name| metadata.target().starts_with(pkg_name))
        && metadata.level() <= &level)
        || metadata.level() <= &tracing::Level::INFO.min(level)
    }));

  let reg = tracing_subscriber::registry().with(stdio_layer);
  reg.init();
}
