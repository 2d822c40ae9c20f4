use anyhow::anyhow;
use clap::{Arg, ArgAction};

/// Parsed options
pub struct Opts {
  /// Configuration file path
  pub config_file_path: String,
  /// Pretty-print the emitted descriptors
  pub pretty: bool,
  /// Treat trust material warnings as errors
  pub strict: bool,
}

/// Parse arg values passed from cli
pub fn parse_opts() -> Result<Opts, anyhow::Error> {
  let _ = include_str!("../../Cargo.toml");
  let options = clap::command!()
    .arg(
      Arg::new("config_file")
        .long("config")
        .short('c')
        .value_name("FILE")
        .required(true)
        .help("Configuration file path like ./config.toml"),
    )
    .arg(
      Arg::new("pretty")
        .long("pretty")
        .short('p')
        .action(ArgAction::SetTrue)
        .help("Pretty-print the cluster descriptors"),
    )
    .arg(
      Arg::new("strict")
        .long("strict")
        .action(ArgAction::SetTrue)
        .help("Fail instead of emitting clusters with degraded trust material"),
    );
  let matches = options.get_matches();

  ///////////////////////////////////
  let config_file_path = matches
    .get_one::<String>("config_file")
    .ok_or_else(|| anyhow!("config_file is required"))?
    .to_owned();

  Ok(Opts {
    config_file_path,
    pretty: matches.get_flag("pretty"),
    strict: matches.get_flag("strict"),
  })
}
