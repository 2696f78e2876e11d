// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use tracing::debug;

use crate::catalog::{self, static_catalog, ModelCatalogEntry, ThinkingFamily};
use crate::error::ProviderError;
use crate::provider::ResponseStream;
use crate::types::{ContentBlock, FinishReason, Message, Request, Role, StreamEvent, ThinkingLevel, Usage};

pub struct OpenAiProvider {
    model: String,
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(model: String, api_key: Option<String>, base_url: Option<String>) -> Self {
        Self {
            model,
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".into()),
            client: reqwest::Client::new(),
        }
    }

    fn reasoning_effort(&self, level: ThinkingLevel) -> Option<&'static str> {
        if catalog::thinking_family("openai", &self.model) != ThinkingFamily::LevelEnum {
            return None;
        }
        Some(match level {
            ThinkingLevel::Min => "minimal",
            ThinkingLevel::Low => "low",
            ThinkingLevel::Medium => "medium",
            ThinkingLevel::High => "high",
        })
    }
}

#[async_trait]
impl crate::ModelProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn list_models(&self) -> Result<Vec<ModelCatalogEntry>, ProviderError> {
        let mut entries: Vec<ModelCatalogEntry> =
            static_catalog().into_iter().filter(|e| e.provider == "openai").collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entries)
    }

    async fn start_request(&self, req: Request) -> Result<ResponseStream, ProviderError> {
        let key = self.api_key.as_deref().ok_or_else(|| ProviderError::InvalidArg("OPENAI_API_KEY not set".into()))?;

        let mut messages = build_openai_messages(&req.messages)?;
        if let Some(system) = &req.system_prompt {
            if !system.is_empty() {
                messages.insert(0, json!({ "role": "system", "content": system }));
            }
        }

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "max_completion_tokens": req.max_output_tokens,
            "stream": req.stream,
        });

        if !req.tools.is_empty() {
            let tools: Vec<Value> = req
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": { "name": t.name, "description": t.description, "parameters": t.parameters },
                    })
                })
                .collect();
            body["tools"] = json!(tools);
        }

        if let Some(effort) = self.reasoning_effort(req.thinking_level) {
            body["reasoning_effort"] = json!(effort);
        }

        debug!(model = %self.model, "sending openai request");

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.into()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Remote(format!("openai error {status}: {text}")));
        }

        let byte_stream = resp.bytes_stream();
        let event_stream = byte_stream
            .scan(String::new(), |buf, chunk| {
                let text = match chunk {
                    Ok(b) => String::from_utf8_lossy(&b).to_string(),
                    Err(e) => return futures::future::ready(Some(vec![Err(ProviderError::Transport(e.into()))])),
                };
                buf.push_str(&text);
                let mut events = Vec::new();
                while let Some(pos) = buf.find('\n') {
                    let line = buf[..pos].trim_end_matches('\r').to_string();
                    buf.drain(..=pos);
                    if let Some(data) = line.strip_prefix("data: ") {
                        let data = data.trim();
                        if data == "[DONE]" {
                            continue;
                        }
                        if let Ok(v) = serde_json::from_str::<Value>(data) {
                            events.extend(parse_openai_event(&v));
                        }
                    }
                }
                futures::future::ready(Some(events))
            })
            .flat_map(futures::stream::iter);

        Ok(Box::pin(event_stream))
    }
}

/// Decode one OpenAI chat-completions streaming chunk into zero or more
/// [`StreamEvent`]s (a single chunk can carry both a finish reason and usage).
pub(crate) fn parse_openai_event(v: &Value) -> Vec<Result<StreamEvent, ProviderError>> {
    let mut out = Vec::new();
    if let Some(choice) = v["choices"].get(0) {
        let delta = &choice["delta"];
        if let Some(text) = delta["content"].as_str() {
            if !text.is_empty() {
                out.push(Ok(StreamEvent::TextDelta(text.to_string())));
            }
        }
        if let Some(calls) = delta["tool_calls"].as_array() {
            for call in calls {
                if let Some(id) = call["id"].as_str() {
                    let name = call["function"]["name"].as_str().unwrap_or("").to_string();
                    out.push(Ok(StreamEvent::ToolCallStart { id: id.to_string(), name }));
                }
                if let Some(args) = call["function"]["arguments"].as_str() {
                    if !args.is_empty() {
                        let id = call["id"].as_str().unwrap_or("").to_string();
                        out.push(Ok(StreamEvent::ToolCallArgumentsDelta { id, delta: args.to_string() }));
                    }
                }
            }
        }
        if let Some(reason) = choice["finish_reason"].as_str() {
            let finish_reason = match reason {
                "stop" => FinishReason::Stop,
                "length" => FinishReason::Length,
                "tool_calls" => FinishReason::ToolUse,
                "content_filter" => FinishReason::ContentFilter,
                _ => FinishReason::Unknown,
            };
            out.push(Ok(StreamEvent::MessageDelta { finish_reason: Some(finish_reason), usage_delta: Usage::default() }));
        }
    }
    if let Some(usage) = v.get("usage") {
        if !usage.is_null() {
            let full_usage = Usage {
                input_tokens: usage["prompt_tokens"].as_u64().unwrap_or(0) as u32,
                output_tokens: usage["completion_tokens"].as_u64().unwrap_or(0) as u32,
                thinking_tokens: usage["completion_tokens_details"]["reasoning_tokens"].as_u64().unwrap_or(0) as u32,
                cached_tokens: usage["prompt_tokens_details"]["cached_tokens"].as_u64().unwrap_or(0) as u32,
                total_tokens: usage["total_tokens"].as_u64().unwrap_or(0) as u32,
            };
            out.push(Ok(StreamEvent::MessageDone { full_usage }));
        }
    }
    out
}

/// Convert the internal message shape into OpenAI's chat-completions wire
/// format. Tool results map to `role: "tool"` with `tool_call_id`; assistant
/// tool calls are carried in an `assistant` message's `tool_calls` array.
pub(crate) fn build_openai_messages(messages: &[Message]) -> Result<Vec<Value>, ProviderError> {
    let mut out = Vec::with_capacity(messages.len());
    for m in messages {
        match m.role {
            Role::Tool => {
                for b in &m.blocks {
                    if let ContentBlock::ToolResult { tool_call_id, content, .. } = b {
                        out.push(json!({ "role": "tool", "tool_call_id": tool_call_id, "content": content }));
                    }
                }
            }
            Role::User | Role::Assistant => {
                let role = if m.role == Role::User { "user" } else { "assistant" };
                let text: String =
                    m.blocks.iter().filter_map(|b| if let ContentBlock::Text { text } = b { Some(text.as_str()) } else { None }).collect();
                let tool_calls: Vec<Value> = m
                    .blocks
                    .iter()
                    .filter_map(|b| match b {
                        ContentBlock::ToolCall { id, name, arguments_json } => Some(json!({
                            "id": id,
                            "type": "function",
                            "function": { "name": name, "arguments": arguments_json },
                        })),
                        _ => None,
                    })
                    .collect();
                let mut msg = json!({ "role": role, "content": text });
                if !tool_calls.is_empty() {
                    msg["tool_calls"] = json!(tool_calls);
                }
                out.push(msg);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModelProvider;

    #[test]
    fn provider_name_and_model() {
        let p = OpenAiProvider::new("gpt-5".into(), None, None);
        assert_eq!(p.name(), "openai");
        assert_eq!(p.model_name(), "gpt-5");
    }

    #[test]
    fn gpt5_maps_min_level_to_minimal_effort() {
        let p = OpenAiProvider::new("gpt-5".into(), None, None);
        assert_eq!(p.reasoning_effort(ThinkingLevel::Min), Some("minimal"));
        assert_eq!(p.reasoning_effort(ThinkingLevel::High), Some("high"));
    }

    #[test]
    fn non_level_model_has_no_reasoning_effort() {
        let p = OpenAiProvider::new("gpt-3.5-turbo".into(), None, None);
        assert_eq!(p.reasoning_effort(ThinkingLevel::High), None);
    }

    #[test]
    fn text_delta_is_parsed() {
        let v = json!({ "choices": [{ "delta": { "content": "hi" } }] });
        let events = parse_openai_event(&v);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Ok(StreamEvent::TextDelta(t)) if t == "hi"));
    }

    #[test]
    fn finish_reason_tool_calls_maps_to_tool_use() {
        let v = json!({ "choices": [{ "delta": {}, "finish_reason": "tool_calls" }] });
        let events = parse_openai_event(&v);
        assert!(matches!(&events[0], Ok(StreamEvent::MessageDelta { finish_reason: Some(FinishReason::ToolUse), .. })));
    }

    #[test]
    fn usage_chunk_yields_message_done() {
        let v = json!({ "choices": [], "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 } });
        let events = parse_openai_event(&v);
        assert!(matches!(&events[0], Ok(StreamEvent::MessageDone { full_usage }) if full_usage.total_tokens == 15));
    }

    #[test]
    fn tool_message_maps_to_tool_role() {
        let msgs = build_openai_messages(&[Message::tool_result("call_1", "ok", false)]).unwrap();
        assert_eq!(msgs[0]["role"], "tool");
        assert_eq!(msgs[0]["tool_call_id"], "call_1");
    }

    #[test]
    fn assistant_tool_call_carries_tool_calls_array() {
        let msg = Message::new(Role::Assistant, vec![ContentBlock::tool_call("1", "grep", "{}")]);
        let msgs = build_openai_messages(&[msg]).unwrap();
        assert_eq!(msgs[0]["tool_calls"][0]["function"]["name"], "grep");
    }
}
