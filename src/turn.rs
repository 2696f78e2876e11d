// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Driving one user turn to completion: submit the input, stream the LLM's
//! response, and run any tool calls it asks for until the model stops
//! asking or `max_tool_turns` is exhausted.
use std::collections::HashMap;
use std::time::Duration;

use futures::StreamExt;

use ikigai_model::{
    ContentBlock, Message, Request, Role, StreamEvent, ToolDefinition,
};
use ikigai_store::EventKind;
use ikigai_tools::{ApprovalPolicy, ToolInvocationRequest};

use crate::dispatch::Repl;

const SCHEMA_PROBE_TIMEOUT: Duration = Duration::from_secs(2);
const TOOL_INVOCATION_TIMEOUT: Duration = Duration::from_secs(60);

pub async fn run_turn(repl: &mut Repl, agent_uuid: &str, input: &str) -> anyhow::Result<()> {
    repl.store()
        .registry
        .set_idle(agent_uuid, false)
        .await?;
    repl.session_mut(agent_uuid).submit_input(Message::user_text(input));
    repl.store()
        .events
        .append(repl.session_id(), Some(agent_uuid), EventKind::User, Some(input), None)
        .await?;

    let max_turns = repl.config().max_tool_turns;
    for _ in 0..max_turns {
        let more_tool_calls = run_one_round(repl, agent_uuid).await?;
        if !more_tool_calls {
            break;
        }
    }

    repl.store().registry.set_idle(agent_uuid, true).await?;
    Ok(())
}

/// Run one LLM round trip and, if the model asked for tool calls, execute
/// them and append their results. Returns `true` if the caller should loop
/// again (tool results were produced and need a follow-up round).
async fn run_one_round(repl: &mut Repl, agent_uuid: &str) -> anyhow::Result<bool> {
    let (provider_name, model_name, messages) = {
        let session = repl.session_mut(agent_uuid);
        (session.provider.clone(), session.model.clone(), session.messages.clone())
    };
    let api_key = repl.credentials().get(&provider_name).map(str::to_string);
    let provider = ikigai_model::from_provider_and_model(&provider_name, &model_name, api_key, None)?;

    let tools = discover_tool_definitions(repl, agent_uuid).await;

    let mut request = Request::new(model_name, messages);
    request.system_prompt = repl.system_prompt().map(str::to_string);
    request.max_output_tokens = repl.config().openai_max_completion_tokens;
    request.tools = tools;

    let mut stream = provider.start_request(request).await?;

    let mut text = String::new();
    let mut tool_calls: Vec<(String, String, String)> = Vec::new();
    let mut tool_args: HashMap<String, String> = HashMap::new();

    while let Some(event) = stream.next().await {
        match event? {
            StreamEvent::TextDelta(delta) => {
                print!("{delta}");
                text.push_str(&delta);
            }
            StreamEvent::ThinkingDelta { .. } => {}
            StreamEvent::ToolCallStart { id, name } => {
                tool_calls.push((id.clone(), name, String::new()));
                tool_args.insert(id, String::new());
            }
            StreamEvent::ToolCallArgumentsDelta { id, delta } => {
                if let Some(buf) = tool_args.get_mut(&id) {
                    buf.push_str(&delta);
                }
            }
            StreamEvent::MessageDelta { .. } => {}
            StreamEvent::MessageDone { full_usage } => {
                let data = serde_json::json!({
                    "input_tokens": full_usage.input_tokens,
                    "output_tokens": full_usage.output_tokens,
                    "thinking_tokens": full_usage.thinking_tokens,
                    "cached_tokens": full_usage.cached_tokens,
                    "total_tokens": full_usage.total_tokens,
                });
                repl.store()
                    .events
                    .append(repl.session_id(), Some(agent_uuid), EventKind::Usage, None, Some(&data))
                    .await?;
            }
        }
    }
    println!();

    for i in 0..tool_calls.len() {
        let id = tool_calls[i].0.clone();
        if let Some(args) = tool_args.remove(&id) {
            tool_calls[i].2 = args;
        }
    }

    let mut blocks = Vec::new();
    if !text.is_empty() {
        blocks.push(ContentBlock::text(text.clone()));
    }
    for (id, name, arguments_json) in &tool_calls {
        blocks.push(ContentBlock::tool_call(id.clone(), name.clone(), arguments_json.clone()));
    }

    if !blocks.is_empty() {
        repl.session_mut(agent_uuid).add_message(Message::new(Role::Assistant, blocks));
    }
    if !text.is_empty() {
        repl.store()
            .events
            .append(repl.session_id(), Some(agent_uuid), EventKind::Assistant, Some(&text), None)
            .await?;
    }
    for (id, name, arguments_json) in &tool_calls {
        let data = serde_json::json!({ "id": id, "name": name, "arguments_json": arguments_json });
        repl.store()
            .events
            .append(repl.session_id(), Some(agent_uuid), EventKind::ToolCall, None, Some(&data))
            .await?;
    }

    if tool_calls.is_empty() {
        return Ok(false);
    }

    for (id, name, arguments_json) in tool_calls {
        let (content, is_error) = execute_tool_call(repl, &name, &arguments_json).await;
        let data = serde_json::json!({ "tool_call_id": id, "is_error": is_error });
        repl.store()
            .events
            .append(repl.session_id(), Some(agent_uuid), EventKind::ToolResult, Some(&content), Some(&data))
            .await?;
        repl.session_mut(agent_uuid).add_message(Message::tool_result(id, content, is_error));
    }

    Ok(true)
}

/// Run (or deny) one tool call, gated by the configured approval policy. An
/// `Ask` decision prompts on stdin for a `y`/`n` answer before running.
async fn execute_tool_call(repl: &mut Repl, name: &str, arguments_json: &str) -> (String, bool) {
    let Some(path) = repl.tools().path_of(name).cloned() else {
        return (format!("no such tool: {name}"), true);
    };
    let arguments: serde_json::Value = serde_json::from_str(arguments_json).unwrap_or(serde_json::Value::Null);

    match repl.policy().decide(name) {
        ApprovalPolicy::Deny => (format!("tool {name} denied by policy"), true),
        ApprovalPolicy::Ask => {
            repl.emit_public(format!("run tool `{name}` with {arguments}? [y/N]"));
            if !confirm() {
                return (format!("tool {name} declined by user"), true);
            }
            invoke(&path, name, arguments).await
        }
        ApprovalPolicy::Auto => invoke(&path, name, arguments).await,
    }
}

async fn invoke(path: &std::path::Path, name: &str, arguments: serde_json::Value) -> (String, bool) {
    let request = ToolInvocationRequest { id: name.to_string(), name: name.to_string(), arguments };
    let process = ikigai_tools::ToolProcess::new(path);
    match process.invoke(&request, TOOL_INVOCATION_TIMEOUT).await {
        Ok(response) => (response.content, response.is_error),
        Err(err) => (err.to_string(), true),
    }
}

fn confirm() -> bool {
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Probe every tool the focused agent's toolset filter allows (or the whole
/// catalog, if the filter is empty) for its schema, using the
/// `__schema__` sentinel convention documented on `ToolCatalog`. A tool that
/// fails to respond is skipped rather than failing the whole turn.
async fn discover_tool_definitions(repl: &Repl, agent_uuid: &str) -> Vec<ToolDefinition> {
    let session_filter = repl.toolset_of(agent_uuid);
    let names: Vec<String> = repl
        .tools()
        .names()
        .into_iter()
        .map(str::to_string)
        .filter(|n| session_filter.is_empty() || session_filter.contains(n))
        .collect();

    let mut defs = Vec::new();
    for name in names {
        let Some(path) = repl.tools().path_of(&name).cloned() else { continue };
        let request = ToolInvocationRequest {
            id: "__schema__".to_string(),
            name: "__schema__".to_string(),
            arguments: serde_json::Value::Object(Default::default()),
        };
        let process = ikigai_tools::ToolProcess::new(&path);
        match process.invoke(&request, SCHEMA_PROBE_TIMEOUT).await {
            Ok(response) if !response.is_error => {
                match serde_json::from_str::<ikigai_tools::ToolSchema>(&response.content) {
                    Ok(schema) => defs.push(ToolDefinition {
                        name: schema.name,
                        description: schema.description,
                        parameters: schema.parameters,
                    }),
                    Err(_) => tracing::warn!(tool = %name, "schema response was not valid JSON, skipping"),
                }
            }
            Ok(_) => tracing::warn!(tool = %name, "schema probe returned an error, skipping"),
            Err(err) => tracing::warn!(tool = %name, %err, "schema probe failed, skipping"),
        }
    }
    defs
}
