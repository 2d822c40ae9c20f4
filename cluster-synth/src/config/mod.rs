mod parse;
mod toml;

pub(crate) use self::{parse::parse_opts, toml::ConfigToml};
