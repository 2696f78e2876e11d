// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Google Gemini driver — native Generative Language API.
//!
//! Uses the `streamGenerateContent` endpoint. Supports text, tool calls, and
//! thinking deltas via `thought` parts.
//!
//! # Auth
//! API key via `?key=...` query param.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use tracing::debug;

use crate::catalog::{self, static_catalog, ModelCatalogEntry, ThinkingFamily};
use crate::error::ProviderError;
use crate::provider::ResponseStream;
use crate::types::{ContentBlock, FinishReason, Message, Request, Role, StreamEvent, ThinkingLevel, Usage};

pub struct GoogleProvider {
    model: String,
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(model: String, api_key: Option<String>, base_url: Option<String>) -> Self {
        Self {
            model,
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://generativelanguage.googleapis.com".into()),
            client: reqwest::Client::new(),
        }
    }

    fn thinking_config(&self, level: ThinkingLevel) -> Option<Value> {
        match catalog::thinking_family("google", &self.model) {
            ThinkingFamily::BudgetTokens => {
                let budget = catalog::thinking_budget_tokens("google", &self.model, level)?;
                let mut cfg = json!({ "thinkingBudget": budget });
                if !catalog::can_disable_thinking("google", &self.model) {
                    cfg["includeThoughts"] = json!(true);
                }
                Some(cfg)
            }
            ThinkingFamily::LevelEnum => {
                let effort = match level {
                    ThinkingLevel::Min => "minimal",
                    ThinkingLevel::Low => "low",
                    ThinkingLevel::Medium => "medium",
                    ThinkingLevel::High => "high",
                };
                Some(json!({ "thinkingLevel": effort }))
            }
            ThinkingFamily::Adaptive | ThinkingFamily::None => None,
        }
    }
}

#[async_trait]
impl crate::ModelProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn list_models(&self) -> Result<Vec<ModelCatalogEntry>, ProviderError> {
        let mut entries: Vec<ModelCatalogEntry> =
            static_catalog().into_iter().filter(|e| e.provider == "google").collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entries)
    }

    async fn start_request(&self, req: Request) -> Result<ResponseStream, ProviderError> {
        let key = self.api_key.as_deref().ok_or_else(|| ProviderError::InvalidArg("GEMINI_API_KEY not set".into()))?;

        // `functionResponse` parts match calls by name, not by the opaque
        // `ToolCall.id`, so the session's ids must be resolved back to names.
        let mut tc_name_map: HashMap<String, String> = HashMap::new();
        for m in &req.messages {
            for b in &m.blocks {
                if let ContentBlock::ToolCall { id, name, .. } = b {
                    tc_name_map.insert(id.clone(), name.clone());
                }
            }
        }

        let contents: Vec<Value> = req
            .messages
            .iter()
            .map(|m| {
                let role = if m.role == Role::Assistant { "model" } else { "user" };
                json!({ "role": role, "parts": message_to_gemini_parts(m, &tc_name_map) })
            })
            .collect();

        let mut body = json!({
            "contents": contents,
            "generationConfig": { "maxOutputTokens": req.max_output_tokens },
        });

        if let Some(system) = &req.system_prompt {
            if !system.is_empty() {
                body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
            }
        }

        if !req.tools.is_empty() {
            let function_declarations: Vec<Value> = req
                .tools
                .iter()
                .map(|t| json!({ "name": t.name, "description": t.description, "parameters": t.parameters }))
                .collect();
            body["tools"] = json!([{ "functionDeclarations": function_declarations }]);
        }

        if let Some(thinking_config) = self.thinking_config(req.thinking_level) {
            body["generationConfig"]["thinkingConfig"] = thinking_config;
        }

        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            key
        );

        debug!(model = %self.model, "sending google gemini request");

        let resp = self.client.post(&url).json(&body).send().await.map_err(|e| ProviderError::Transport(e.into()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Remote(format!("google gemini error {status}: {text}")));
        }

        let byte_stream = resp.bytes_stream();
        let event_stream = byte_stream.flat_map(|chunk| {
            let lines = match chunk {
                Ok(b) => String::from_utf8_lossy(&b).to_string(),
                Err(e) => return futures::stream::iter(vec![Err(ProviderError::Transport(e.into()))]),
            };
            let events: Vec<Result<StreamEvent, ProviderError>> = lines
                .lines()
                .filter_map(|line| {
                    let line = line.strip_prefix("data: ")?.trim();
                    let v: Value = serde_json::from_str(line).ok()?;
                    parse_gemini_chunk(&v)
                })
                .map(Ok)
                .collect();
            futures::stream::iter(events)
        });

        Ok(Box::pin(event_stream))
    }
}

fn message_to_gemini_parts(m: &Message, tc_name_map: &HashMap<String, String>) -> Vec<Value> {
    let parts: Vec<Value> = m
        .blocks
        .iter()
        .map(|b| match b {
            ContentBlock::Text { text } => json!({ "text": text }),
            ContentBlock::Thinking { text, .. } => json!({ "text": text, "thought": true }),
            ContentBlock::RedactedThinking { opaque_data } => json!({ "text": "", "thought": true, "thoughtSignature": opaque_data }),
            ContentBlock::ToolCall { name, arguments_json, .. } => {
                let args: Value = serde_json::from_str(arguments_json).unwrap_or(json!({}));
                json!({ "functionCall": { "name": name, "args": args } })
            }
            ContentBlock::ToolResult { tool_call_id, content, .. } => {
                let fn_name = tc_name_map.get(tool_call_id).map(|s| s.as_str()).unwrap_or(tool_call_id);
                json!({ "functionResponse": { "name": fn_name, "response": { "output": content } } })
            }
        })
        .collect();
    if parts.is_empty() {
        vec![json!({ "text": "" })]
    } else {
        parts
    }
}

fn parse_gemini_chunk(v: &Value) -> Option<StreamEvent> {
    if let Some(meta) = v.get("usageMetadata") {
        let full_usage = Usage {
            input_tokens: meta["promptTokenCount"].as_u64().unwrap_or(0) as u32,
            output_tokens: meta["candidatesTokenCount"].as_u64().unwrap_or(0) as u32,
            thinking_tokens: meta["thoughtsTokenCount"].as_u64().unwrap_or(0) as u32,
            cached_tokens: meta["cachedContentTokenCount"].as_u64().unwrap_or(0) as u32,
            total_tokens: meta["totalTokenCount"].as_u64().unwrap_or(0) as u32,
        };
        return Some(StreamEvent::MessageDone { full_usage });
    }

    let candidate = &v["candidates"][0];
    let content = &candidate["content"];
    if let Some(parts) = content["parts"].as_array() {
        for part in parts {
            if part.get("thought").and_then(|t| t.as_bool()) == Some(true) {
                let text = part["text"].as_str().unwrap_or("").to_string();
                if !text.is_empty() {
                    return Some(StreamEvent::ThinkingDelta { text, signature: None });
                }
                continue;
            }
            if let Some(fc) = part.get("functionCall") {
                let name = fc["name"].as_str().unwrap_or("").to_string();
                let args = serde_json::to_string(&fc["args"]).unwrap_or_default();
                return Some(StreamEvent::ToolCallArgumentsDelta { id: name, delta: args });
            }
            if let Some(text) = part["text"].as_str() {
                if !text.is_empty() {
                    return Some(StreamEvent::TextDelta(text.to_string()));
                }
            }
        }
    }

    candidate["finishReason"].as_str().map(|reason| {
        let finish_reason = match reason {
            "STOP" => FinishReason::Stop,
            "MAX_TOKENS" => FinishReason::Length,
            "SAFETY" | "RECITATION" => FinishReason::ContentFilter,
            _ => FinishReason::Unknown,
        };
        StreamEvent::MessageDelta { finish_reason: Some(finish_reason), usage_delta: Usage::default() }
    })
}
