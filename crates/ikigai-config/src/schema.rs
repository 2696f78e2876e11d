// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_openai_model() -> String {
    "gpt-5-mini".to_string()
}

fn default_openai_temperature() -> f64 {
    1.0
}

fn default_openai_max_completion_tokens() -> u32 {
    4096
}

fn default_listen_address() -> String {
    "127.0.0.1".to_string()
}

fn default_listen_port() -> u32 {
    1984
}

fn default_max_tool_turns() -> u32 {
    50
}

fn default_max_output_size() -> u32 {
    1_048_576
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u32 {
    5432
}

fn default_db_name() -> String {
    "ikigai".to_string()
}

fn default_db_user() -> String {
    "ikigai".to_string()
}

fn default_db_password() -> String {
    String::new()
}

/// The JSON configuration schema. Field-level type mismatches (e.g.
/// `db_port` given as a string) surface as `serde_json::Error` during
/// deserialization, mapped to `ConfigError::Parse` by the loader; numeric
/// range violations are checked separately by `validate()` and surface as
/// `ConfigError::OutOfRange`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_openai_temperature")]
    pub openai_temperature: f64,
    #[serde(default = "default_openai_max_completion_tokens")]
    pub openai_max_completion_tokens: u32,
    #[serde(default)]
    pub openai_system_message: Option<String>,

    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    #[serde(default = "default_listen_port")]
    pub listen_port: u32,

    #[serde(default = "default_max_tool_turns")]
    pub max_tool_turns: u32,
    #[serde(default = "default_max_output_size")]
    pub max_output_size: u32,

    #[serde(default = "default_db_host")]
    pub db_host: String,
    #[serde(default = "default_db_port")]
    pub db_port: u32,
    #[serde(default = "default_db_name")]
    pub db_name: String,
    #[serde(default = "default_db_user")]
    pub db_user: String,
    #[serde(default = "default_db_password")]
    pub db_password: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_model: default_openai_model(),
            openai_temperature: default_openai_temperature(),
            openai_max_completion_tokens: default_openai_max_completion_tokens(),
            openai_system_message: None,
            listen_address: default_listen_address(),
            listen_port: default_listen_port(),
            max_tool_turns: default_max_tool_turns(),
            max_output_size: default_max_output_size(),
            db_host: default_db_host(),
            db_port: default_db_port(),
            db_name: default_db_name(),
            db_user: default_db_user(),
            db_password: default_db_password(),
        }
    }
}

impl Config {
    /// Range checks not expressible through serde's own type system.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.openai_temperature) {
            return Err(ConfigError::OutOfRange {
                field: "openai_temperature",
                message: format!("{} is not in [0.0, 2.0]", self.openai_temperature),
            });
        }
        if !(1..=128_000).contains(&self.openai_max_completion_tokens) {
            return Err(ConfigError::OutOfRange {
                field: "openai_max_completion_tokens",
                message: format!("{} is not in [1, 128000]", self.openai_max_completion_tokens),
            });
        }
        if !(1024..=65535).contains(&self.listen_port) {
            return Err(ConfigError::OutOfRange {
                field: "listen_port",
                message: format!("{} is not in [1024, 65535]", self.listen_port),
            });
        }
        if !(1..=65535).contains(&self.db_port) {
            return Err(ConfigError::OutOfRange {
                field: "db_port",
                message: format!("{} is not in [1, 65535]", self.db_port),
            });
        }
        Ok(())
    }
}
