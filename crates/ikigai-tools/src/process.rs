// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Spawning a tool executable and driving the invocation contract over its
//! stdio.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;

use crate::contract::{ToolInvocationRequest, ToolInvocationResponse};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn tool process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("failed to write request to tool stdin: {0}")]
    WriteRequest(#[source] std::io::Error),
    #[error("failed to read response from tool stdout: {0}")]
    ReadResponse(#[source] std::io::Error),
    #[error("tool produced no output before closing stdout")]
    NoOutput,
    #[error("tool response was not valid JSON: {0}")]
    InvalidResponse(#[source] serde_json::Error),
    #[error("tool did not respond within {0:?}")]
    Timeout(Duration),
}

/// A single-shot spawn of a tool executable driven over the JSON stdio
/// contract: one request line in, one response line out.
pub struct ToolProcess {
    path: std::path::PathBuf,
}

impl ToolProcess {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    /// Spawn the executable, send `request`, and wait up to `timeout_dur` for
    /// a single JSON response line on stdout.
    pub async fn invoke(
        &self,
        request: &ToolInvocationRequest,
        timeout_dur: Duration,
    ) -> Result<ToolInvocationResponse, ProcessError> {
        timeout(timeout_dur, self.invoke_inner(request))
            .await
            .map_err(|_| ProcessError::Timeout(timeout_dur))?
    }

    async fn invoke_inner(
        &self,
        request: &ToolInvocationRequest,
    ) -> Result<ToolInvocationResponse, ProcessError> {
        let mut child = Command::new(&self.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(ProcessError::Spawn)?;

        let mut stdin = child.stdin.take().expect("stdin piped");
        let mut line = serde_json::to_string(request).expect("request serializes");
        line.push('\n');
        stdin.write_all(line.as_bytes()).await.map_err(ProcessError::WriteRequest)?;
        stdin.flush().await.map_err(ProcessError::WriteRequest)?;
        drop(stdin);

        let stdout = child.stdout.take().expect("stdout piped");
        let mut reader = BufReader::new(stdout);
        let mut response_line = String::new();
        reader
            .read_line(&mut response_line)
            .await
            .map_err(ProcessError::ReadResponse)?;

        let _ = child.wait().await;

        if response_line.trim().is_empty() {
            return Err(ProcessError::NoOutput);
        }
        serde_json::from_str(response_line.trim()).map_err(ProcessError::InvalidResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn write_script(dir: &std::path::Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn invoke_round_trips_echo_tool() {
        let tmp = tempfile::tempdir().unwrap();
        let script = write_script(
            tmp.path(),
            "echo_tool.sh",
            "#!/bin/sh\nread line\necho \"{\\\"id\\\":\\\"call_1\\\",\\\"content\\\":\\\"ok\\\"}\"\n",
        );
        let proc = ToolProcess::new(&script);
        let req = ToolInvocationRequest {
            id: "call_1".into(),
            name: "echo_tool".into(),
            arguments: serde_json::json!({}),
        };
        let resp = proc.invoke(&req, Duration::from_secs(5)).await.unwrap();
        assert_eq!(resp.id, "call_1");
        assert_eq!(resp.content, "ok");
        assert!(!resp.is_error);
    }

    #[tokio::test]
    async fn invoke_fails_on_missing_executable() {
        let proc = ToolProcess::new("/nonexistent/tool/path");
        let req = ToolInvocationRequest {
            id: "x".into(),
            name: "x".into(),
            arguments: serde_json::json!({}),
        };
        let err = proc.invoke(&req, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ProcessError::Spawn(_)));
    }

    #[tokio::test]
    async fn invoke_errors_on_empty_output() {
        let tmp = tempfile::tempdir().unwrap();
        let script = write_script(tmp.path(), "silent.sh", "#!/bin/sh\nread line\n");
        let proc = ToolProcess::new(&script);
        let req = ToolInvocationRequest {
            id: "x".into(),
            name: "x".into(),
            arguments: serde_json::json!({}),
        };
        let err = proc.invoke(&req, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, ProcessError::NoOutput));
    }

    #[tokio::test]
    async fn invoke_times_out_on_hanging_tool() {
        let tmp = tempfile::tempdir().unwrap();
        let script = write_script(tmp.path(), "hang.sh", "#!/bin/sh\nsleep 30\n");
        let proc = ToolProcess::new(&script);
        let req = ToolInvocationRequest {
            id: "x".into(),
            name: "x".into(),
            arguments: serde_json::json!({}),
        };
        let err = proc
            .invoke(&req, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Timeout(_)));
    }
}
