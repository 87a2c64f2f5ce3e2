//! # oca
//!
//! Command-line client of the cloud control plane.
//!
//! ## Usage
//! ```bash
//! oca render vm.xml
//! oca to-xml vm.tpl --root TEMPLATE
//! oca --endpoint http://frontend:2633/RPC2 --session oneadmin:pw images list --all
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use oca_client::{ClientConfig, Controller};
use oca_common::LogFormat;

mod cli;
mod commands;

use cli::{Args, Command};

/// Configuration read when `--config` is not given.
const DEFAULT_CONFIG_PATH: &str = "/etc/oca/client.yaml";

/// Load the configuration file, then apply command-line overrides.
fn load_config(args: &Args) -> Result<ClientConfig> {
    let config = match &args.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => ClientConfig::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load configuration from {}", DEFAULT_CONFIG_PATH))?,
        None => ClientConfig::default(),
    };

    Ok(with_cli_overrides(config, args))
}

fn with_cli_overrides(config: ClientConfig, args: &Args) -> ClientConfig {
    let mut config = config.with_overrides(args.endpoint.as_deref(), args.session.as_deref());
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    if args.json_logs {
        config.log_format = LogFormat::Json;
    }
    config
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args)?;
    config.validate().context("Invalid configuration")?;

    oca_common::init_logging(&config.log_level, config.log_format)?;
    debug!(
        version = env!("CARGO_PKG_VERSION"),
        endpoint = %config.endpoint,
        "Starting oca"
    );

    match args.command {
        Command::Render { file } => println!("{}", commands::render(&file)?),
        Command::ToXml { file, root } => println!("{}", commands::to_xml(&file, &root)?),
        Command::Images { action } => {
            let controller = Controller::from_config(&config)?;
            print_lines(commands::list_images(&controller, action).await?);
        }
        Command::Documents { doc_type, action } => {
            let controller = Controller::from_config(&config)?;
            print_lines(commands::list_documents(&controller, doc_type, action).await?);
        }
        Command::Vdcs { .. } => {
            let controller = Controller::from_config(&config)?;
            print_lines(commands::list_vdcs(&controller).await?);
        }
        Command::Vms { action } => {
            let controller = Controller::from_config(&config)?;
            print_lines(commands::list_vms(&controller, action).await?);
        }
    }

    info!("Done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let args = Args::parse_from([
            "oca",
            "--endpoint",
            "https://cloud.example.com/RPC2",
            "--log-level",
            "debug",
            "--json-logs",
            "vdcs",
            "list",
        ]);

        let config = with_cli_overrides(ClientConfig::default(), &args);
        assert_eq!(config.endpoint, "https://cloud.example.com/RPC2");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.validate().is_ok());
    }
}
