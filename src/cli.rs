//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

use crate::services::DEFAULT_PAGE_SIZE;

/// Linkgate - self-destructing short links
#[derive(Parser, Debug)]
#[command(name = "linkgate")]
#[command(version)]
#[command(about = "Self-destructing short links with prefetch-safe resolution", long_about = None)]
pub struct Cli {
    /// Configuration file (default: config.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Create a link
    Create {
        /// Destination URL (http/https)
        target_url: String,

        /// Owner id the link belongs to
        #[arg(long)]
        owner: String,

        #[arg(long)]
        label: Option<String>,

        /// Click quota; plan defaults apply when omitted
        #[arg(long)]
        max_clicks: Option<i64>,

        /// Expiration time (RFC3339 or relative like "1d", "2h")
        #[arg(long)]
        expires: Option<String>,

        /// Reveal time (RFC3339 or relative like "30m")
        #[arg(long)]
        reveal: Option<String>,

        /// One-shot link, retired after its single genuine access
        #[arg(long)]
        phantom: bool,

        #[arg(long)]
        password: Option<String>,
    },

    /// Disable a link (terminal)
    Disable {
        token: String,

        #[arg(long)]
        owner: String,
    },

    /// Delete a link
    Delete {
        token: String,

        #[arg(long)]
        owner: String,
    },

    /// List an owner's links, newest first
    List {
        #[arg(long)]
        owner: String,

        #[arg(long, default_value_t = 1)]
        page: u64,

        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: u64,
    },

    /// Show a link and its lifecycle state
    Inspect {
        token: String,

        #[arg(long)]
        owner: String,
    },

    /// Resolve a token the way a visitor would
    ///
    /// A genuine resolution consumes a click; use --speculative to peek.
    Resolve {
        token: String,

        #[arg(long)]
        password: Option<String>,

        /// Resolve as a prefetch (never counted)
        #[arg(long)]
        speculative: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// Configuration management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: stdout)
        output_path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_args_means_serve() {
        let cli = Cli::try_parse_from(["linkgate"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_create_flags() {
        let cli = Cli::try_parse_from([
            "linkgate",
            "-c",
            "custom.toml",
            "create",
            "https://example.com",
            "--owner",
            "alice",
            "--max-clicks",
            "2",
            "--phantom",
        ])
        .unwrap();

        assert_eq!(cli.config.as_deref(), Some("custom.toml"));
        match cli.command {
            Some(Commands::Create {
                target_url,
                owner,
                max_clicks,
                phantom,
                ..
            }) => {
                assert_eq!(target_url, "https://example.com");
                assert_eq!(owner, "alice");
                assert_eq!(max_clicks, Some(2));
                assert!(phantom);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_list_defaults() {
        let cli = Cli::try_parse_from(["linkgate", "list", "--owner", "alice"]).unwrap();
        match cli.command {
            Some(Commands::List {
                owner,
                page,
                page_size,
            }) => {
                assert_eq!(owner, "alice");
                assert_eq!(page, 1);
                assert_eq!(page_size, DEFAULT_PAGE_SIZE);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
