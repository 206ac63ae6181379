//! Server configuration.
//!
//! A configuration names one language server: the file extensions it handles,
//! the command that starts it, and the root directory it indexes. It comes
//! either from a JSON file or from the `-e`/`-s` command-line flags.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::args::ServerSpec;
use crate::utils::language_id_for_extension;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub extensions: Vec<String>,
    pub command: Vec<String>,
    #[serde(rename = "rootDir", default = "default_root_dir")]
    pub root_dir: PathBuf,
}

fn default_root_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("invalid config file: {}", path.display()))
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json).context("failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a configuration from command-line server specification.
    pub fn from_server_spec(spec: ServerSpec) -> Result<Self> {
        let server = ServerConfig {
            extensions: spec.extensions,
            command: spec.command,
            root_dir: default_root_dir(),
        };

        let config = Config { server };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.server.extensions.is_empty() {
            return Err(anyhow!("server has no extensions"));
        }
        if self.server.command.iter().all(|part| part.trim().is_empty()) {
            return Err(anyhow!("server has empty command"));
        }
        Ok(())
    }

    /// LSP language ids of the configured extensions, deduplicated in order.
    pub fn languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = Vec::new();
        for extension in &self.server.extensions {
            let id = language_id_for_extension(extension.trim_start_matches('.'));
            if !languages.iter().any(|known| known == id) {
                languages.push(id.to_string());
            }
        }
        languages
    }
}

impl ServerConfig {
    pub fn resolve_root_dir(&self, base: &Path) -> Result<PathBuf> {
        let path = if self.root_dir.is_absolute() {
            self.root_dir.clone()
        } else {
            base.join(&self.root_dir)
        };
        path.canonicalize()
            .with_context(|| format!("failed to resolve root directory: {}", path.display()))
    }

    /// The program and its arguments.
    pub fn program(&self) -> Result<(&str, Vec<String>)> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| anyhow!("server has empty command"))?;
        Ok((program.as_str(), args.to_vec()))
    }
}
