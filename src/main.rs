use clap::Parser;
use colored::Colorize;
use tracing::{error, info};

use linkgate::cli::Cli;
use linkgate::config::{get_config, init_config_from};
use linkgate::runtime::modes::{self, Mode};
use linkgate::system::logging::init_logging;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_config_from(cli.config.as_deref().unwrap_or("config.toml"));
    let config = get_config();

    match modes::detect_mode(cli.command.as_ref()) {
        #[cfg(feature = "server")]
        Mode::Server => {
            // guard 必须活到进程结束
            let _guard = init_logging(&config.logging)?;
            info!("linkgate {} starting", env!("CARGO_PKG_VERSION"));

            if let Err(e) = modes::run_server(&config).await {
                error!("Server exited with error: {:#}", e);
                return Err(e);
            }
            Ok(())
        }
        #[cfg(feature = "cli")]
        Mode::Cli => {
            let Some(command) = cli.command else {
                return Ok(());
            };
            if let Err(e) = modes::run_cli(command, &config).await {
                eprintln!("{}", e.format_colored());
                std::process::exit(1);
            }
            Ok(())
        }
        Mode::Unknown => {
            eprintln!(
                "{}",
                "No execution mode available: build with the `server` feature".red()
            );
            std::process::exit(1);
        }
    }
}
