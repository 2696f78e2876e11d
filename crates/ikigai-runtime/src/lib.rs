// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Directory layout resolution.
//!
//! Four roles, each overridable by an environment variable, falling back to
//! platform defaults via the `dirs` crate when unset.

use std::path::PathBuf;

/// The four directory roles used throughout ikigai.
#[derive(Debug, Clone)]
pub struct Paths {
    pub bin_dir: PathBuf,
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub libexec_dir: PathBuf,
}

impl Paths {
    /// Resolve all four roles from environment variables, falling back to
    /// platform conventions (`dirs::*_dir()` joined with `ikigai`).
    pub fn resolve() -> Self {
        Self {
            bin_dir: from_env_or("IKIGAI_BIN_DIR", default_bin_dir),
            config_dir: from_env_or("IKIGAI_CONFIG_DIR", default_config_dir),
            data_dir: from_env_or("IKIGAI_DATA_DIR", default_data_dir),
            libexec_dir: from_env_or("IKIGAI_LIBEXEC_DIR", default_libexec_dir),
        }
    }

    /// The migrations bundle directory: `<data_dir>/migrations`.
    pub fn migrations_dir(&self) -> PathBuf {
        self.data_dir.join("migrations")
    }

    /// The fallback system-prompt file: `<data_dir>/prompts/system.md`.
    pub fn system_prompt_file(&self) -> PathBuf {
        self.data_dir.join("prompts").join("system.md")
    }

    /// The credentials file: `<config_dir>/credentials`.
    pub fn credentials_file(&self) -> PathBuf {
        self.config_dir.join("credentials")
    }

    /// The config file: `<config_dir>/config.json`.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }

    /// Directory holding tool executables: `<libexec_dir>/tools`.
    pub fn tools_dir(&self) -> PathBuf {
        self.libexec_dir.join("tools")
    }
}

fn from_env_or(var: &str, default: impl FnOnce() -> PathBuf) -> PathBuf {
    std::env::var_os(var).map(PathBuf::from).unwrap_or_else(default)
}

fn default_bin_dir() -> PathBuf {
    dirs::executable_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("/usr/local/bin"))
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join("ikigai"))
        .unwrap_or_else(|| PathBuf::from("/etc/ikigai"))
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("ikigai"))
        .unwrap_or_else(|| PathBuf::from("/usr/local/share/ikigai"))
}

fn default_libexec_dir() -> PathBuf {
    PathBuf::from("/usr/local/libexec/ikigai")
}
