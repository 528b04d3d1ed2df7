//! CLI mode
//!
//! Operates on the configured store directly, through the same
//! `LinkService` and `TokenResolver` paths the server uses.

use colored::Colorize;
use std::fmt;
use std::sync::Arc;

use crate::cli::{Commands, ConfigCommands};
use crate::config::StaticConfig;
use crate::errors::LinkgateError;
use crate::resolver::{BlockReason, RequestHeaders, RequestMetadata, ResolveOutcome, TokenResolver};
use crate::runtime::lifetime::startup::open_store;
use crate::services::{CreateLinkRequest, LinkService, PlanPolicy};
use crate::storage::{LinkStore, ShortLink};

#[derive(Debug)]
pub enum CliError {
    StorageError(String),
    ParseError(String),
    CommandError(String),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::StorageError(msg) => format!("Storage error: {}", msg),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    /// Format as colored output
    pub fn format_colored(&self) -> String {
        match self {
            CliError::StorageError(msg) => {
                format!("{} {}", "Storage error:".red().bold(), msg.white())
            }
            CliError::ParseError(msg) => {
                format!("{} {}", "Parse error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<LinkgateError> for CliError {
    fn from(err: LinkgateError) -> Self {
        match err {
            LinkgateError::Validation { .. } | LinkgateError::DateParse(_) => {
                CliError::ParseError(err.to_string())
            }
            LinkgateError::NotFound(_) | LinkgateError::TokenExhausted(_) => {
                CliError::CommandError(err.to_string())
            }
            _ => CliError::StorageError(err.to_string()),
        }
    }
}

async fn require_store(config: &StaticConfig) -> Result<Arc<dyn LinkStore>, CliError> {
    open_store(config)
        .await
        .map_err(|e| CliError::StorageError(format!("{:#}", e)))?
        .ok_or_else(|| CliError::StorageError("database.database_url is not set".to_string()))
}

async fn link_service(config: &StaticConfig) -> Result<LinkService, CliError> {
    Ok(LinkService::new(
        require_store(config).await?,
        PlanPolicy::from_config(&config.plans),
        &config.links,
    ))
}

fn print_link(link: &ShortLink) {
    let label = link.label.as_deref().unwrap_or("-");
    println!("  {} {}", "token:".bold(), link.token.cyan());
    println!("  {} {}", "target:".bold(), link.target_url.blue().underline());
    println!("  {} {} ({})", "owner:".bold(), link.owner_id, label.dimmed());
    let quota = match link.max_clicks {
        Some(max) => format!("{}/{}", link.click_count, max),
        None => format!("{}/unlimited", link.click_count),
    };
    println!("  {} {}", "clicks:".bold(), quota.yellow());
    if let Some(reveal_at) = link.reveal_at {
        println!(
            "  {} {}",
            "reveals:".bold(),
            reveal_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    if let Some(expires_at) = link.expires_at {
        println!(
            "  {} {}",
            "expires:".bold(),
            expires_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    if link.is_phantom {
        println!("  {} yes", "phantom:".bold());
    }
    if link.has_password() {
        println!("  {} yes", "password:".bold());
    }
}

fn generate_config(output_path: Option<String>, force: bool) -> Result<(), CliError> {
    let Some(path) = output_path else {
        print!("{}", StaticConfig::generate_sample_config());
        return Ok(());
    };

    if std::path::Path::new(&path).exists() && !force {
        return Err(CliError::CommandError(format!(
            "{} already exists (use --force to overwrite)",
            path
        )));
    }
    StaticConfig::default()
        .save_to_file(&path)
        .map_err(|e| CliError::CommandError(format!("Failed to write {}: {}", path, e)))?;
    println!("{} Wrote sample configuration to {}", "✓".bold().green(), path);
    Ok(())
}

async fn resolve(
    config: &StaticConfig,
    token: String,
    password: Option<String>,
    speculative: bool,
) -> Result<(), CliError> {
    let resolver = TokenResolver::new(require_store(config).await?)
        .with_head_is_speculative(config.resolver.head_is_speculative);

    let headers = if speculative {
        RequestHeaders::from_pairs([("purpose", "prefetch")])
    } else {
        RequestHeaders::new()
    };
    let mut request = RequestMetadata::from_headers(headers);
    if let Some(password) = password {
        request = request.with_password(password);
    }

    match resolver.resolve(&token, &request).await {
        ResolveOutcome::Redirect {
            target_url,
            counted,
        } => {
            println!(
                "{} {} -> {} ({})",
                "→".bold().green(),
                token.cyan(),
                target_url.blue().underline(),
                if counted { "counted" } else { "not counted" }
            );
        }
        ResolveOutcome::Blocked(BlockReason::NotYetAvailable { reveal_at }) => {
            println!(
                "{} {} not yet available (reveals {})",
                "…".bold().yellow(),
                token.cyan(),
                reveal_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        ResolveOutcome::Blocked(reason) => {
            println!("{} {} blocked: {}", "✗".bold().red(), token.cyan(), reason);
        }
    }
    Ok(())
}

/// Run a CLI command from clap-parsed input
pub async fn run_cli(cmd: Commands, config: &StaticConfig) -> Result<(), CliError> {
    match cmd {
        Commands::Serve => Err(CliError::CommandError(
            "serve is handled by server mode".to_string(),
        )),
        Commands::Config {
            action: ConfigCommands::Generate { output_path, force },
        } => generate_config(output_path, force),
        Commands::Create {
            target_url,
            owner,
            label,
            max_clicks,
            expires,
            reveal,
            phantom,
            password,
        } => {
            let service = link_service(config).await?;
            let link = service
                .create_link(
                    &owner,
                    CreateLinkRequest {
                        label,
                        target_url,
                        max_clicks,
                        expires_at: expires,
                        reveal_at: reveal,
                        is_phantom: phantom,
                        password,
                    },
                )
                .await?;
            println!("{} Created link", "✓".bold().green());
            print_link(&link);
            Ok(())
        }
        Commands::Disable { token, owner } => {
            link_service(config).await?.disable_link(&token, &owner).await?;
            println!("{} Disabled {}", "✓".bold().green(), token.cyan());
            Ok(())
        }
        Commands::Delete { token, owner } => {
            link_service(config).await?.delete_link(&token, &owner).await?;
            println!("{} Deleted {}", "✓".bold().green(), token.cyan());
            Ok(())
        }
        Commands::List {
            owner,
            page,
            page_size,
        } => {
            let listing = link_service(config)
                .await?
                .list_links(&owner, page, page_size)
                .await?;
            println!(
                "{} {} links for {} (page {}/{})",
                "✓".bold().green(),
                listing.total,
                owner.cyan(),
                listing.page,
                listing.total_pages().max(1)
            );
            for details in &listing.links {
                println!();
                println!("  {} {:?}", "state:".bold(), details.state);
                print_link(&details.link);
            }
            Ok(())
        }
        Commands::Inspect { token, owner } => {
            let details = link_service(config).await?.get_link(&token, &owner).await?;
            println!(
                "{} {:?} ({:?} plan)",
                "state:".bold(),
                details.state,
                details.plan
            );
            print_link(&details.link);
            Ok(())
        }
        Commands::Resolve {
            token,
            password,
            speculative,
        } => resolve(config, token, password, speculative).await,
    }
}
