//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// oca - cloud control plane client
#[derive(Parser, Debug)]
#[command(name = "oca")]
#[command(about = "Convert templates and query resource pools of the cloud control plane")]
#[command(version)]
pub struct Args {
    /// Path to configuration file (optional, defaults used if not found)
    #[arg(short, long, env = "OCA_CONFIG")]
    pub config: Option<PathBuf>,

    /// XML-RPC endpoint, overrides the configuration file
    #[arg(long, env = "OCA_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Session string (user:password)
    #[arg(long, env = "OCA_SESSION", hide_env_values = true)]
    pub session: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render an XML template as wire text
    Render {
        /// XML file, `-` for stdin
        file: PathBuf,
    },

    /// Convert wire text into an XML template
    ToXml {
        /// Template file, `-` for stdin
        file: PathBuf,

        /// Name of the root element
        #[arg(long, default_value = "TEMPLATE")]
        root: String,
    },

    /// Image pool
    Images {
        #[command(subcommand)]
        action: PoolAction,
    },

    /// Document pool of one document type
    Documents {
        /// Document type number
        #[arg(long = "type", default_value_t = 100)]
        doc_type: i64,

        #[command(subcommand)]
        action: PoolAction,
    },

    /// VDC pool
    Vdcs {
        #[command(subcommand)]
        action: PoolAction,
    },

    /// VM pool
    Vms {
        #[command(subcommand)]
        action: PoolAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum PoolAction {
    /// List the pool
    List {
        /// Every visible resource instead of the caller's own
        #[arg(long)]
        all: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_to_xml() {
        let args = Args::parse_from(["oca", "to-xml", "vm.tpl", "--root", "VM"]);
        match args.command {
            Command::ToXml { file, root } => {
                assert_eq!(file, PathBuf::from("vm.tpl"));
                assert_eq!(root, "VM");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_pool_list() {
        let args = Args::parse_from([
            "oca",
            "--endpoint",
            "http://one:2633/RPC2",
            "--json-logs",
            "documents",
            "--type",
            "101",
            "list",
            "--all",
        ]);
        assert_eq!(args.endpoint.as_deref(), Some("http://one:2633/RPC2"));
        assert!(args.json_logs);
        assert!(matches!(
            args.command,
            Command::Documents {
                doc_type: 101,
                action: PoolAction::List { all: true }
            }
        ));
    }
}
