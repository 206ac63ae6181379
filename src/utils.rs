//! Utility functions for URI and file path handling.
//!
//! This module provides common utilities for converting `file://` URIs to
//! paths and mapping file extensions to LSP language identifiers.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use url::Url;

/// Converts a file:// URI to a PathBuf without checking that it exists.
///
/// # Errors
///
/// Returns an error if:
/// - The URI cannot be parsed
/// - The URI is not a file:// scheme
pub fn uri_to_path(uri: &str) -> Result<PathBuf> {
    let parsed = Url::parse(uri).context("invalid URI")?;
    parsed
        .to_file_path()
        .map_err(|_| anyhow!("only file:// URIs are supported"))
}

/// Converts a path to a file:// URI string.
pub fn path_to_uri(path: &Path) -> Result<String> {
    Url::from_file_path(path)
        .map(|url| url.to_string())
        .map_err(|_| anyhow!("path cannot be expressed as file URI: {}", path.display()))
}

/// Human-readable path for a document identifier, used in error messages.
///
/// Falls back to the raw identifier when it is not a file:// URI.
pub fn display_path(uri: &str) -> String {
    uri_to_path(uri)
        .map(|path| path.display().to_string())
        .unwrap_or_else(|_| uri.to_string())
}

/// Determines the LSP language identifier for a given file path.
///
/// Maps common file extensions to their corresponding LSP language identifiers.
/// Returns the extension itself if no specific mapping is found, or "plaintext"
/// for files with no extension.
///
/// The language id is what the semantic-token capability check compares
/// against the languages the configured server was registered for, so both
/// sides must derive it through this function.
pub fn language_id_for_path(path: &Path) -> &str {
    language_id_for_extension(path.extension().and_then(|ext| ext.to_str()).unwrap_or(""))
}

pub fn language_id_for_extension(extension: &str) -> &str {
    match extension {
        "rs" => "rust",
        "go" => "go",
        "py" | "pyi" => "python",
        "ts" => "typescript",
        "tsx" => "typescriptreact",
        "js" => "javascript",
        "jsx" => "javascriptreact",
        "cs" => "csharp",
        "c" | "h" => "c",
        "cc" | "cpp" | "hpp" => "cpp",
        "java" => "java",
        "json" => "json",
        "toml" => "toml",
        "yaml" | "yml" => "yaml",
        "md" => "markdown",
        "" => "plaintext",
        other => other,
    }
}
