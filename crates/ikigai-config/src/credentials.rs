// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Provider API credentials: `<config_dir>/credentials`, `key=value` one
//! per line, with per-provider environment variable overrides.

use std::collections::HashMap;

use ikigai_runtime::Paths;

/// Resolved credentials, keyed by provider name (`"anthropic"`, `"openai"`,
/// `"google"`).
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    keys: HashMap<String, String>,
}

impl Credentials {
    pub fn get(&self, provider: &str) -> Option<&str> {
        self.keys.get(provider).map(String::as_str)
    }
}

fn env_var_for(provider: &str) -> String {
    format!("{}_API_KEY", provider.to_uppercase())
}

/// Parse `<config_dir>/credentials` (missing file ⇒ empty map), then apply
/// any `<PROVIDER>_API_KEY` environment variable as an override.
pub fn load(paths: &Paths) -> Credentials {
    let mut keys = HashMap::new();
    let path = paths.credentials_file();
    if let Ok(text) = std::fs::read_to_string(&path) {
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                keys.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
    }

    for provider in ["anthropic", "openai", "google"] {
        if let Ok(value) = std::env::var(env_var_for(provider)) {
            keys.insert(provider.to_string(), value);
        }
    }

    Credentials { keys }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn paths_in(dir: &std::path::Path) -> Paths {
        Paths {
            bin_dir: dir.to_path_buf(),
            config_dir: dir.to_path_buf(),
            data_dir: dir.to_path_buf(),
            libexec_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn missing_file_yields_empty_credentials() {
        let tmp = tempfile::tempdir().unwrap();
        let creds = load(&paths_in(tmp.path()));
        assert!(creds.get("anthropic").is_none());
    }

    #[test]
    fn parses_key_value_lines_and_skips_comments() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = paths_in(tmp.path());
        std::fs::write(paths.credentials_file(), "# comment\nanthropic=sk-ant-test\n\nopenai=sk-test\n").unwrap();

        let creds = load(&paths);
        assert_eq!(creds.get("anthropic"), Some("sk-ant-test"));
        assert_eq!(creds.get("openai"), Some("sk-test"));
    }

    #[test]
    fn env_var_overrides_file_value() {
        let _guard = ENV_LOCK.lock().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let paths = paths_in(tmp.path());
        std::fs::write(paths.credentials_file(), "anthropic=from-file\n").unwrap();

        std::env::set_var("ANTHROPIC_API_KEY", "from-env");
        let creds = load(&paths);
        std::env::remove_var("ANTHROPIC_API_KEY");

        assert_eq!(creds.get("anthropic"), Some("from-env"));
    }
}
