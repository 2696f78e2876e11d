// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use ikigai_runtime::Paths;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::schema::Config;

/// Load and validate the JSON config at `paths.config_file()`. A missing
/// file is not an error — the all-defaults `Config` is returned. A missing
/// `openai_system_message` falls back to the contents of
/// `paths.system_prompt_file()`.
pub fn load(paths: &Paths) -> ConfigResult<Config> {
    let path = paths.config_file();
    let mut config = if path.is_file() {
        debug!(path = %path.display(), "loading config");
        let text = std::fs::read_to_string(&path)
            .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
        serde_json::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.display().to_string(), source })?
    } else {
        debug!(path = %path.display(), "no config file, using defaults");
        Config::default()
    };

    config.validate()?;

    if config.openai_system_message.is_none() {
        let prompt_path = paths.system_prompt_file();
        if let Ok(text) = std::fs::read_to_string(&prompt_path) {
            config.openai_system_message = Some(text);
        }
    }

    Ok(config)
}
