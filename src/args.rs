//! Command-line argument parsing using clap.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;

use crate::config::Config;

/// MCP server exposing code intelligence from a Language Server Protocol server
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:\n  \
    wayfinder -e py -s pyright-langserver -- --stdio\n  \
    wayfinder -e ts -e tsx -s typescript-language-server -- --stdio\n  \
    wayfinder -e rs -s rust-analyzer -w /path/to/project\n  \
    wayfinder -c wayfinder.json")]
pub struct Cli {
    /// File extensions to handle (can be specified multiple times)
    ///
    /// Examples: py, rs, js, ts
    #[arg(
        short,
        long,
        value_name = "EXT",
        action = clap::ArgAction::Append,
        required_unless_present = "config"
    )]
    pub extension: Vec<String>,

    /// LSP server command and arguments
    ///
    /// Everything after --server is passed to the LSP server.
    /// Use -- to clearly separate server flags: --server cmd -- --flag
    #[arg(
        short,
        long,
        value_name = "CMD",
        num_args = 1..,
        required_unless_present = "config",
        allow_hyphen_values = true
    )]
    pub server: Vec<String>,

    /// Workspace base directory (defaults to current directory)
    #[arg(short, long, value_name = "PATH")]
    pub workspace: Option<PathBuf>,

    /// JSON configuration file, used instead of --extension/--server
    #[arg(short, long, value_name = "FILE", conflicts_with_all = ["extension", "server"])]
    pub config: Option<PathBuf>,
}

#[derive(Debug)]
pub struct ServerSpec {
    pub extensions: Vec<String>,
    pub command: Vec<String>,
}

impl Cli {
    /// Loads the configuration file, or builds one from the server flags.
    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::from_file(path),
            None => Config::from_server_spec(self.to_server_spec()?),
        }
    }

    fn to_server_spec(&self) -> Result<ServerSpec> {
        if self.extension.is_empty() {
            return Err(anyhow!("at least one --extension must be specified"));
        }

        if self.server.is_empty() {
            return Err(anyhow!("--server command cannot be empty"));
        }

        // The first "--" separates clap flags; any later one belongs to the server.
        let mut command = self.server.clone();
        if let Some(separator) = command.iter().position(|part| part == "--") {
            command.remove(separator);
        }
        Ok(ServerSpec {
            extensions: self.extension.clone(),
            command,
        })
    }
}
