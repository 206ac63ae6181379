//! Code intelligence for MCP clients, answered by a language server.

pub mod args;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod documents;
pub mod error;
pub mod lsp_bridge;
pub mod lsp_provider;
pub mod preview;
pub mod provider;
pub mod service;
pub mod store;
pub mod tools;
pub mod transport;
pub mod utils;
