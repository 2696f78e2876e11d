// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;

use crate::catalog::InputModality;
use crate::error::ProviderError;
use crate::provider::ResponseStream;
use crate::types::{FinishReason, Message, Request, Role, StreamEvent, Usage};

/// Deterministic mock provider for tests. Echoes the last user message back
/// as the assistant response.
#[derive(Default)]
pub struct MockProvider;

#[async_trait]
impl crate::ModelProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }
    fn model_name(&self) -> &str {
        "mock-echo"
    }

    async fn start_request(&self, req: Request) -> Result<ResponseStream, ProviderError> {
        let reply = req.messages.iter().rev().find(|m| m.role == Role::User).map(|m| m.text()).unwrap_or_default();

        let events: Vec<Result<StreamEvent, ProviderError>> = vec![
            Ok(StreamEvent::TextDelta(format!("MOCK: {reply}"))),
            Ok(StreamEvent::MessageDelta { finish_reason: Some(FinishReason::Stop), usage_delta: Usage::default() }),
            Ok(StreamEvent::MessageDone {
                full_usage: Usage { input_tokens: 10, output_tokens: 10, total_tokens: 20, ..Usage::default() },
            }),
        ];
        Ok(Box::pin(stream::iter(events)))
    }
}

/// A pre-scripted mock provider. Each call to `start_request` pops the next
/// response script from the front of the queue, letting tests specify exact
/// event sequences — including tool calls — without network access.
pub struct ScriptedMockProvider {
    scripts: Arc<Mutex<Vec<Vec<StreamEvent>>>>,
    name: String,
    modalities: Vec<InputModality>,
    /// The last request seen by this provider, for test assertions.
    pub last_request: Arc<Mutex<Option<Request>>>,
}

impl ScriptedMockProvider {
    pub fn new(scripts: Vec<Vec<StreamEvent>>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts)),
            name: "scripted-mock".into(),
            modalities: vec![InputModality::Text],
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Declare that this mock supports image input as well as text.
    pub fn with_vision(mut self) -> Self {
        self.modalities = vec![InputModality::Text, InputModality::Image];
        self
    }

    pub fn always_text(reply: impl Into<String>) -> Self {
        let r = reply.into();
        Self::new(vec![vec![
            StreamEvent::TextDelta(r),
            StreamEvent::MessageDelta { finish_reason: Some(FinishReason::Stop), usage_delta: Usage::default() },
            StreamEvent::MessageDone { full_usage: Usage { input_tokens: 5, output_tokens: 5, total_tokens: 10, ..Usage::default() } },
        ]])
    }

    pub fn tool_then_text(tool_id: impl Into<String>, tool_name: impl Into<String>, args_json: impl Into<String>, final_text: impl Into<String>) -> Self {
        Self::new(vec![
            vec![
                StreamEvent::ToolCallStart { id: tool_id.into(), name: tool_name.into() },
                StreamEvent::ToolCallArgumentsDelta { id: String::new(), delta: args_json.into() },
                StreamEvent::MessageDelta { finish_reason: Some(FinishReason::ToolUse), usage_delta: Usage::default() },
            ],
            vec![
                StreamEvent::TextDelta(final_text.into()),
                StreamEvent::MessageDelta { finish_reason: Some(FinishReason::Stop), usage_delta: Usage::default() },
            ],
        ])
    }
}

#[async_trait]
impl crate::ModelProvider for ScriptedMockProvider {
    fn name(&self) -> &str {
        &self.name
    }
    fn model_name(&self) -> &str {
        "scripted-mock-model"
    }

    fn input_modalities(&self) -> Vec<InputModality> {
        self.modalities.clone()
    }

    async fn start_request(&self, req: Request) -> Result<ResponseStream, ProviderError> {
        *self.last_request.lock().unwrap() = Some(req);
        let events = {
            let mut scripts = self.scripts.lock().unwrap();
            if scripts.is_empty() {
                vec![StreamEvent::TextDelta("[no more scripts]".into())]
            } else {
                scripts.remove(0)
            }
        };
        let wrapped: Vec<Result<StreamEvent, ProviderError>> = events.into_iter().map(Ok).collect();
        Ok(Box::pin(stream::iter(wrapped)))
    }
}
