// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The wire contract spoken with a spawned tool executable.
//!
//! A tool invocation writes one [`ToolInvocationRequest`] as a single line of
//! JSON to the child's stdin, then reads one [`ToolInvocationResponse`] as a
//! single line of JSON from its stdout. The child process itself — what it
//! does with `arguments`, how it produces `content` — is out of scope here;
//! this module only fixes the shape both sides must agree on.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request written to a tool child process's stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    /// Opaque identifier echoed back verbatim in the response, forwarded
    /// from the model's `ToolCall.id`.
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Response read from a tool child process's stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocationResponse {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolInvocationResponse {
    pub fn ok(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self { id: id.into(), content: content.into(), is_error: false }
    }

    pub fn err(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self { id: id.into(), content: message.into(), is_error: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips_through_json() {
        let req = ToolInvocationRequest {
            id: "call_1".into(),
            name: "grep".into(),
            arguments: serde_json::json!({"pattern": "foo"}),
        };
        let text = serde_json::to_string(&req).unwrap();
        let back: ToolInvocationRequest = serde_json::from_str(&text).unwrap();
        assert_eq!(back.id, "call_1");
        assert_eq!(back.name, "grep");
    }

    #[test]
    fn response_missing_is_error_defaults_false() {
        let resp: ToolInvocationResponse =
            serde_json::from_str(r#"{"id":"x","content":"ok"}"#).unwrap();
        assert!(!resp.is_error);
    }

    #[test]
    fn err_constructor_sets_is_error() {
        let resp = ToolInvocationResponse::err("x", "boom");
        assert!(resp.is_error);
        assert_eq!(resp.content, "boom");
    }
}
