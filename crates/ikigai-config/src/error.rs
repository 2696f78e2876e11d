// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

/// Config-loading error kinds, matching the taxonomy the rest of the engine
/// distinguishes on.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("config file {path} could not be parsed: {source}")]
    Parse { path: String, #[source] source: serde_json::Error },
    #[error("{field} is out of range: {message}")]
    OutOfRange { field: &'static str, message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
