//! Static configuration
//!
//! Loaded once at startup from `config.toml` (optional) and `LG__*`
//! environment variables. Components receive explicit values taken from
//! here; nothing on the resolution path reads the global directly.

mod r#impl;
mod structs;

pub use r#impl::{get_config, init_config_from};
pub use structs::*;
