//! Configuration parsing for waybar-autohide
//!
//! This crate handles parsing the KDL configuration file that describes
//! the bar geometry, the debounce behaviour and the command used to
//! show/hide the bar process.

mod error;
mod model;
mod parser;

pub use error::ConfigError;
pub use model::*;
pub use parser::{parse_config, parse_config_str};
