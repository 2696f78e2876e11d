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
use crate::types::{ContentBlock, FinishReason, Message, Request, Role, StreamEvent, Usage};

pub struct AnthropicProvider {
    model: String,
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(model: String, api_key: Option<String>, base_url: Option<String>) -> Self {
        Self {
            model,
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.anthropic.com".into()),
            client: reqwest::Client::new(),
        }
    }

    fn thinking_block(&self, req: &Request) -> Option<Value> {
        match catalog::thinking_family("anthropic", &self.model) {
            ThinkingFamily::BudgetTokens => {
                let budget = catalog::thinking_budget_tokens("anthropic", &self.model, req.thinking_level)?;
                Some(json!({ "type": "enabled", "budget_tokens": budget }))
            }
            ThinkingFamily::Adaptive => Some(json!({ "type": "adaptive" })),
            ThinkingFamily::LevelEnum | ThinkingFamily::None => None,
        }
    }
}

#[async_trait]
impl crate::ModelProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }
    fn model_name(&self) -> &str {
        &self.model
    }

    /// Anthropic does not expose a public list-models endpoint with full
    /// metadata, so this falls back to the static catalog for this provider.
    async fn list_models(&self) -> Result<Vec<ModelCatalogEntry>, ProviderError> {
        let mut entries: Vec<ModelCatalogEntry> =
            static_catalog().into_iter().filter(|e| e.provider == "anthropic").collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entries)
    }

    async fn start_request(&self, req: Request) -> Result<ResponseStream, ProviderError> {
        let key = self.api_key.as_deref().ok_or_else(|| ProviderError::InvalidArg("ANTHROPIC_API_KEY not set".into()))?;

        let messages = build_anthropic_messages(&req.messages)?;

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": req.max_output_tokens,
            "stream": req.stream,
        });

        if let Some(system) = &req.system_prompt {
            if !system.is_empty() {
                body["system"] = json!(system);
            }
        }

        if !req.tools.is_empty() {
            let tools: Vec<Value> = req
                .tools
                .iter()
                .map(|t| json!({ "name": t.name, "description": t.description, "input_schema": t.parameters }))
                .collect();
            body["tools"] = json!(tools);
        }

        if let Some(thinking) = self.thinking_block(&req) {
            body["thinking"] = thinking;
        }

        debug!(model = %self.model, "sending anthropic request");

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.into()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Remote(format!("anthropic error {status}: {text}")));
        }

        let byte_stream = resp.bytes_stream();
        // SSE lines can be split across TCP chunks, so a remainder buffer is
        // carried forward. Only complete lines (terminated by '\n') are
        // parsed; anything left over is prepended to the next chunk.
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
                        if let Ok(v) = serde_json::from_str::<Value>(data) {
                            if let Some(ev) = parse_anthropic_event(&v) {
                                events.push(Ok(ev));
                            }
                        }
                    }
                }
                futures::future::ready(Some(events))
            })
            .flat_map(futures::stream::iter);

        Ok(Box::pin(event_stream))
    }
}

/// Decode one Anthropic SSE event. Returns `None` for events that carry no
/// information the session cares about (`ping`, ids inside `content_block_start`
/// for plain text, etc).
pub(crate) fn parse_anthropic_event(v: &Value) -> Option<StreamEvent> {
    let event_type = v["type"].as_str().unwrap_or("");
    match event_type {
        "content_block_start" => {
            let block = &v["content_block"];
            if block["type"].as_str() == Some("tool_use") {
                let id = block["id"].as_str().unwrap_or("").to_string();
                let name = block["name"].as_str().unwrap_or("").to_string();
                Some(StreamEvent::ToolCallStart { id, name })
            } else {
                None
            }
        }
        "content_block_delta" => {
            let delta = &v["delta"];
            match delta["type"].as_str().unwrap_or("") {
                "text_delta" => {
                    let text = delta["text"].as_str().unwrap_or("").to_string();
                    if text.is_empty() {
                        None
                    } else {
                        Some(StreamEvent::TextDelta(text))
                    }
                }
                "input_json_delta" => {
                    let partial = delta["partial_json"].as_str().unwrap_or("").to_string();
                    // The enclosing tool_use id is only known from the matching
                    // content_block_start; the session tracks that association
                    // by block index and fills it in before this delta is used.
                    Some(StreamEvent::ToolCallArgumentsDelta { id: String::new(), delta: partial })
                }
                "thinking_delta" => {
                    let thinking = delta["thinking"].as_str().unwrap_or("").to_string();
                    if thinking.is_empty() {
                        None
                    } else {
                        Some(StreamEvent::ThinkingDelta { text: thinking, signature: None })
                    }
                }
                "signature_delta" => {
                    let sig = delta["signature"].as_str().unwrap_or("").to_string();
                    Some(StreamEvent::ThinkingDelta { text: String::new(), signature: Some(sig) })
                }
                _ => None,
            }
        }
        "message_delta" => {
            let finish_reason = match v["delta"]["stop_reason"].as_str() {
                Some("end_turn") => Some(FinishReason::Stop),
                Some("max_tokens") => Some(FinishReason::Length),
                Some("tool_use") => Some(FinishReason::ToolUse),
                Some("stop_sequence") => Some(FinishReason::Stop),
                Some(_) => Some(FinishReason::Unknown),
                None => None,
            };
            let usage_delta = Usage {
                output_tokens: v["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
                ..Usage::default()
            };
            Some(StreamEvent::MessageDelta { finish_reason, usage_delta })
        }
        "message_start" => {
            let usage = &v["message"]["usage"];
            let full_usage = Usage {
                input_tokens: usage["input_tokens"].as_u64().unwrap_or(0) as u32,
                cached_tokens: usage["cache_read_input_tokens"].as_u64().unwrap_or(0) as u32,
                ..Usage::default()
            };
            Some(StreamEvent::MessageDone { full_usage })
        }
        _ => None,
    }
}

/// Convert the internal message shape into Anthropic's wire format. Tool
/// messages map to `role: "user"` with a `tool_result` block, matching
/// Anthropic's convention of carrying tool output back in the user turn.
pub(crate) fn build_anthropic_messages(messages: &[Message]) -> Result<Vec<Value>, ProviderError> {
    let mut out = Vec::with_capacity(messages.len());
    for m in messages {
        let role = match m.role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "user",
        };
        let content: Vec<Value> = m
            .blocks
            .iter()
            .map(|b| match b {
                ContentBlock::Text { text } => Ok(json!({ "type": "text", "text": text })),
                ContentBlock::Thinking { text, signature } => {
                    let mut block = json!({ "type": "thinking", "thinking": text });
                    if let Some(sig) = signature {
                        block["signature"] = json!(sig);
                    }
                    Ok(block)
                }
                ContentBlock::RedactedThinking { opaque_data } => {
                    Ok(json!({ "type": "redacted_thinking", "data": opaque_data }))
                }
                ContentBlock::ToolCall { id, name, arguments_json } => {
                    let input: Value = if arguments_json.trim().is_empty() {
                        json!({})
                    } else {
                        serde_json::from_str(arguments_json)
                            .map_err(|e| ProviderError::Serialize(format!("tool call {id} arguments: {e}")))?
                    };
                    Ok(json!({ "type": "tool_use", "id": id, "name": name, "input": input }))
                }
                ContentBlock::ToolResult { tool_call_id, content, is_error } => Ok(json!({
                    "type": "tool_result",
                    "tool_use_id": tool_call_id,
                    "content": content,
                    "is_error": is_error,
                })),
            })
            .collect::<Result<_, ProviderError>>()?;
        out.push(json!({ "role": role, "content": content }));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModelProvider;

    #[test]
    fn provider_name_and_model() {
        let p = AnthropicProvider::new("claude-sonnet-4-6".into(), None, None);
        assert_eq!(p.name(), "anthropic");
        assert_eq!(p.model_name(), "claude-sonnet-4-6");
    }

    #[test]
    fn message_start_yields_done_with_input_usage() {
        let v = json!({ "type": "message_start", "message": { "usage": { "input_tokens": 42 } } });
        let ev = parse_anthropic_event(&v).unwrap();
        assert!(matches!(ev, StreamEvent::MessageDone { full_usage } if full_usage.input_tokens == 42));
    }

    #[test]
    fn content_block_start_tool_use_emits_tool_call_start() {
        let v = json!({
            "type": "content_block_start",
            "content_block": { "type": "tool_use", "id": "toolu_01", "name": "shell" }
        });
        let ev = parse_anthropic_event(&v).unwrap();
        assert!(matches!(&ev, StreamEvent::ToolCallStart { id, name } if id == "toolu_01" && name == "shell"));
    }

    #[test]
    fn content_block_start_text_yields_no_event() {
        let v = json!({ "type": "content_block_start", "content_block": { "type": "text", "text": "" } });
        assert!(parse_anthropic_event(&v).is_none());
    }

    #[test]
    fn content_block_delta_text_delta() {
        let v = json!({ "type": "content_block_delta", "delta": { "type": "text_delta", "text": "world" } });
        let ev = parse_anthropic_event(&v).unwrap();
        assert!(matches!(ev, StreamEvent::TextDelta(t) if t == "world"));
    }

    #[test]
    fn content_block_delta_thinking_delta() {
        let v = json!({ "type": "content_block_delta", "delta": { "type": "thinking_delta", "thinking": "reasoning..." } });
        let ev = parse_anthropic_event(&v).unwrap();
        assert!(matches!(&ev, StreamEvent::ThinkingDelta { text, .. } if text == "reasoning..."));
    }

    #[test]
    fn content_block_delta_empty_thinking_yields_no_event() {
        let v = json!({ "type": "content_block_delta", "delta": { "type": "thinking_delta", "thinking": "" } });
        assert!(parse_anthropic_event(&v).is_none());
    }

    #[test]
    fn message_delta_maps_stop_reasons() {
        let v = json!({ "type": "message_delta", "delta": { "stop_reason": "tool_use" }, "usage": { "output_tokens": 10 } });
        let ev = parse_anthropic_event(&v).unwrap();
        assert!(matches!(ev, StreamEvent::MessageDelta { finish_reason: Some(FinishReason::ToolUse), usage_delta } if usage_delta.output_tokens == 10));
    }

    #[test]
    fn unknown_event_type_yields_no_event() {
        let v = json!({ "type": "ping" });
        assert!(parse_anthropic_event(&v).is_none());
    }

    #[test]
    fn plain_text_message_serializes_to_text_block() {
        let msgs = build_anthropic_messages(&[Message::user_text("hello")]).unwrap();
        assert_eq!(msgs[0]["role"], "user");
        assert_eq!(msgs[0]["content"][0]["type"], "text");
        assert_eq!(msgs[0]["content"][0]["text"], "hello");
    }

    #[test]
    fn tool_message_maps_to_user_role_with_tool_result_block() {
        let msgs = build_anthropic_messages(&[Message::tool_result("call_1", "ok", false)]).unwrap();
        assert_eq!(msgs[0]["role"], "user");
        assert_eq!(msgs[0]["content"][0]["type"], "tool_result");
        assert_eq!(msgs[0]["content"][0]["tool_use_id"], "call_1");
    }

    #[test]
    fn tool_call_empty_arguments_becomes_empty_object() {
        let msg = Message::new(Role::Assistant, vec![ContentBlock::tool_call("1", "grep", "")]);
        let msgs = build_anthropic_messages(&[msg]).unwrap();
        assert_eq!(msgs[0]["content"][0]["input"], json!({}));
    }

    #[test]
    fn tool_call_unparseable_arguments_is_serialize_error() {
        let msg = Message::new(Role::Assistant, vec![ContentBlock::tool_call("1", "grep", "{not json")]);
        let err = build_anthropic_messages(&[msg]).unwrap_err();
        assert!(matches!(err, ProviderError::Serialize(_)));
    }

    #[test]
    fn thinking_block_is_budget_for_sonnet() {
        let p = AnthropicProvider::new("claude-sonnet-4-6".into(), None, None);
        let req = Request::new("claude-sonnet-4-6", vec![]);
        let block = p.thinking_block(&req).unwrap();
        assert_eq!(block["type"], "enabled");
        assert!(block["budget_tokens"].as_u64().unwrap() > 0);
    }

    #[test]
    fn thinking_block_is_adaptive_for_opus_4_6() {
        let p = AnthropicProvider::new("claude-opus-4-6".into(), None, None);
        let req = Request::new("claude-opus-4-6", vec![]);
        let block = p.thinking_block(&req).unwrap();
        assert_eq!(block["type"], "adaptive");
    }
}
