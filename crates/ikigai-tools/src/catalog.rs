// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Discovery of tool executables under `<libexec_dir>/tools`.
//!
//! Each executable declares its own schema by responding to an invocation
//! with `{"id": "__schema__", "name": "__schema__", "arguments": {}}` — by
//! convention the reserved id `__schema__` asks the tool to print its
//! `ToolSchema` as JSON on stdout instead of executing.

use std::collections::HashMap;
use std::path::PathBuf;

use ikigai_runtime::Paths;
use serde::{Deserialize, Serialize};

/// A tool's advertised shape, as reported by the tool executable itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// The set of tool executables discovered under `<libexec_dir>/tools`,
/// keyed by name.
#[derive(Debug, Default)]
pub struct ToolCatalog {
    tools: HashMap<String, PathBuf>,
}

impl ToolCatalog {
    /// Enumerate executable files directly under `paths.tools_dir()`.
    /// The catalog records paths only — schemas are fetched lazily by
    /// querying each executable (see `crate::process::ToolProcess::fetch_schema`).
    pub fn discover(paths: &Paths) -> std::io::Result<Self> {
        let dir = paths.tools_dir();
        let mut tools = HashMap::new();
        let entries = match std::fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self { tools });
            }
            Err(e) => return Err(e),
        };
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if !is_executable(&path) {
                continue;
            }
            if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                tools.insert(name.to_string(), path);
            }
        }
        Ok(Self { tools })
    }

    pub fn path_of(&self, name: &str) -> Option<&PathBuf> {
        self.tools.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

#[cfg(unix)]
fn is_executable(path: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.is_file()
        && std::fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &std::path::Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_paths(dir: &std::path::Path) -> Paths {
        Paths {
            bin_dir: dir.to_path_buf(),
            config_dir: dir.to_path_buf(),
            data_dir: dir.to_path_buf(),
            libexec_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn discover_returns_empty_when_tools_dir_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = make_paths(tmp.path());
        let catalog = ToolCatalog::discover(&paths).unwrap();
        assert!(catalog.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn discover_finds_executable_files_only() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempfile::tempdir().unwrap();
        let paths = make_paths(tmp.path());
        let tools_dir = paths.tools_dir();
        std::fs::create_dir_all(&tools_dir).unwrap();

        let exe = tools_dir.join("grep");
        std::fs::write(&exe, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

        let not_exe = tools_dir.join("README.md");
        std::fs::write(&not_exe, "not a tool").unwrap();

        let catalog = ToolCatalog::discover(&paths).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.path_of("grep").is_some());
        assert!(catalog.path_of("README").is_none());
    }

    #[test]
    fn names_are_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = make_paths(tmp.path());
        let mut catalog = ToolCatalog::discover(&paths).unwrap();
        catalog.tools.insert("zeta".into(), tmp.path().join("zeta"));
        catalog.tools.insert("alpha".into(), tmp.path().join("alpha"));
        assert_eq!(catalog.names(), vec!["alpha", "zeta"]);
    }
}
