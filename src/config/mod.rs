//! Configuration parsing, validation and types.

pub mod parser;
pub mod types;
pub mod validate;

pub use parser::{load_config, load_config_str, load_or_init};
pub use types::{ChannelBinding, Config, Direction};
pub use validate::{load_and_validate, validate_config};
