//! Storage infrastructure: configuration and startup files.
//!
//! The `config` sub-module handles:
//!
//! - Reading the TOML configuration file from the platform-appropriate directory.
//! - Writing it back (first run creates the directory).
//! - Resolving API keys from the environment or the file.
//! - Loading the system prompt text sent with every inference request.

pub mod config;
