//! Mode routing
//!
//! - Server mode (HTTP server, default)
//! - CLI mode (one-shot management commands)

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(feature = "server")]
pub use server::run_server;

#[cfg(feature = "cli")]
pub use cli::{CliError, run_cli};

use crate::cli::Commands;

/// Mode detection result
#[derive(Debug, PartialEq)]
pub enum Mode {
    #[cfg(feature = "server")]
    Server,
    #[cfg(feature = "cli")]
    Cli,
    Unknown,
}

/// Pick the mode for a parsed command line
///
/// 1. No subcommand or `serve` -> Server mode
/// 2. Any other subcommand with the CLI feature -> CLI mode
/// 3. Otherwise -> Unknown
pub fn detect_mode(command: Option<&Commands>) -> Mode {
    match command {
        #[cfg(feature = "server")]
        None | Some(Commands::Serve) => Mode::Server,
        #[cfg(feature = "cli")]
        Some(_) => Mode::Cli,
        #[allow(unreachable_patterns)]
        _ => Mode::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_mode() {
        assert_eq!(detect_mode(None), Mode::Server);
        assert_eq!(detect_mode(Some(&Commands::Serve)), Mode::Server);
        assert_eq!(
            detect_mode(Some(&Commands::Disable {
                token: "abc".to_string(),
                owner: "alice".to_string(),
            })),
            Mode::Cli
        );
    }
}
