// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Rebuilds an agent's in-memory state from the event log: the root-first
//! chain of clear-bounded ranges to replay, and the mapping of each event
//! onto a mutation of an `AgentSession`.
use serde_json::Value;

use ikigai_model::{ContentBlock, Message};
use ikigai_store::{AgentRow, Event, EventKind, Range, Store};

use crate::agent_session::AgentSession;
use crate::error::{CoreError, CoreResult};

/// One step of a replay plan: the events of `agent_uuid` within `range`
/// contribute to the target agent's reconstructed history, in order.
#[derive(Debug, Clone)]
pub struct PlanStep {
    pub agent_uuid: String,
    pub range: Range,
}

/// Walk from the root of the fork tree down to `agent_uuid`, returning the
/// chain root-first (the target agent is always the last element).
async fn ancestor_chain(store: &Store, agent_uuid: &str) -> CoreResult<Vec<AgentRow>> {
    let mut chain = Vec::new();
    let mut current = store
        .registry
        .get(agent_uuid)
        .await?
        .ok_or_else(|| CoreError::InvalidArg(format!("unknown agent {agent_uuid}")))?;
    loop {
        let parent_uuid = current.parent_uuid.clone();
        chain.push(current);
        match parent_uuid {
            None => break,
            Some(parent_uuid) => {
                current = store
                    .registry
                    .get(&parent_uuid)
                    .await?
                    .ok_or_else(|| CoreError::InvalidArg("Parent not found".to_string()))?;
            }
        }
    }
    chain.reverse();
    Ok(chain)
}

/// Build the clear-bounded range to replay for each ancestor of
/// `agent_uuid`, root-first, ending with the target agent itself.
pub async fn build_plan(store: &Store, agent_uuid: &str) -> CoreResult<Vec<PlanStep>> {
    let chain = ancestor_chain(store, agent_uuid).await?;
    let mut steps = Vec::with_capacity(chain.len());
    for (i, row) in chain.iter().enumerate() {
        let bound = chain.get(i + 1).map(|child| child.fork_message_id);
        let start = store.events.find_last_by_kind(&row.uuid, EventKind::Clear, bound).await?;
        steps.push(PlanStep {
            agent_uuid: row.uuid.clone(),
            range: Range { start_id_exclusive: start, end_id_inclusive: bound },
        });
    }
    Ok(steps)
}

fn extract_toolset_array(data: &Value) -> Vec<String> {
    data.get("toolset_filter")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect::<Vec<_>>())
        .filter(|v| !v.is_empty())
        .unwrap_or_default()
}

/// Resolve the toolset filter that should apply to `agent_uuid`: the most
/// recent `/toolset` command persisted anywhere in its own log wins, falling
/// back to the toolset it inherited at fork time. Neither lookup is bounded
/// by a clear range — the toolset filter is not reset by `clear` (spec §9).
pub async fn restore_toolset(store: &Store, agent_uuid: &str) -> CoreResult<Vec<String>> {
    if let Some(data) = store.events.find_most_recent_command(agent_uuid, "toolset").await? {
        return Ok(extract_toolset_array(&data));
    }
    let fork_id = store.events.find_last_by_kind(agent_uuid, EventKind::Fork, None).await?;
    if fork_id == 0 {
        return Ok(Vec::new());
    }
    let events = store
        .events
        .query_range(agent_uuid, Range { start_id_exclusive: fork_id - 1, end_id_inclusive: Some(fork_id) })
        .await?;
    Ok(events
        .into_iter()
        .find(|e| e.id == fork_id)
        .and_then(|e| e.data)
        .map(|data| extract_toolset_array(&data))
        .unwrap_or_default())
}

fn tool_call_block_from_event(event: &Event) -> Option<ContentBlock> {
    let data = event.data.as_ref()?;
    let id = data.get("id")?.as_str()?.to_string();
    let name = data.get("name")?.as_str()?.to_string();
    let arguments_json = data.get("arguments_json").and_then(|v| v.as_str()).unwrap_or("{}").to_string();
    Some(ContentBlock::tool_call(id, name, arguments_json))
}

fn tool_result_block_from_event(event: &Event) -> Option<Message> {
    let data = event.data.as_ref()?;
    let tool_call_id = data.get("tool_call_id")?.as_str()?.to_string();
    let content = event.content.clone().unwrap_or_default();
    let is_error = data.get("is_error").and_then(|v| v.as_bool()).unwrap_or(false);
    Some(Message::tool_result(tool_call_id, content, is_error))
}

/// Apply one agent's event range onto `session`, continuing (not resetting)
/// whatever state earlier ranges in the plan already built up. Tracks the
/// currently open assistant turn so consecutive `tool_call` events merge
/// into the assistant message they belong to.
fn apply_range(session: &mut AgentSession, events: Vec<Event>) {
    let mut open_turn: Option<usize> = None;
    for event in events {
        match event.kind {
            EventKind::Clear => {
                session.clear_messages();
                open_turn = None;
            }
            EventKind::User => {
                let text = event.content.unwrap_or_default();
                session.add_message(Message::user_text(text));
                open_turn = None;
            }
            EventKind::Assistant => {
                let text = event.content.unwrap_or_default();
                session.add_message(Message::assistant_text(text));
                open_turn = Some(session.messages.len() - 1);
            }
            EventKind::ToolCall => {
                if let Some(block) = tool_call_block_from_event(&event) {
                    match open_turn {
                        Some(idx) if session.messages.get(idx).map(|m| m.role == ikigai_model::Role::Assistant).unwrap_or(false) => {
                            session.messages[idx].blocks.push(block);
                        }
                        _ => {
                            session.add_message(Message::new(ikigai_model::Role::Assistant, vec![block]));
                            open_turn = Some(session.messages.len() - 1);
                        }
                    }
                }
            }
            EventKind::ToolResult => {
                if let Some(message) = tool_result_block_from_event(&event) {
                    session.add_message(message);
                }
                open_turn = None;
            }
            EventKind::Mark => {
                let label = event.data.as_ref().and_then(|d| d.get("label")).and_then(|v| v.as_str()).map(str::to_string);
                session.push_mark(label);
            }
            EventKind::Rewind => {
                if let Some(count) = event.data.as_ref().and_then(|d| d.get("message_count")).and_then(|v| v.as_u64()) {
                    session.rewind_to_count(count as usize);
                }
                open_turn = None;
            }
            EventKind::System
            | EventKind::AgentKilled
            | EventKind::Command
            | EventKind::Fork
            | EventKind::Usage
            | EventKind::Interrupted => {}
        }
    }
}

/// Reconstruct the in-memory state of `agent_uuid` by walking the replay
/// plan root-first and applying every event in each step's range in order.
pub async fn replay(store: &Store, agent_uuid: &str) -> CoreResult<AgentSession> {
    let target = store
        .registry
        .get(agent_uuid)
        .await?
        .ok_or_else(|| CoreError::InvalidArg(format!("unknown agent {agent_uuid}")))?;
    let plan = build_plan(store, agent_uuid).await?;

    let mut session = AgentSession::new(agent_uuid.to_string(), target.parent_uuid.clone(), String::new(), String::new());
    for step in plan {
        let events = store.events.query_range(&step.agent_uuid, step.range).await?;
        apply_range(&mut session, events);
    }
    session.toolset_filter = restore_toolset(store, agent_uuid).await?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ikigai_store::{AgentStatus, EventKind};

    async fn new_store() -> Store {
        ikigai_store::connect_test_store().await.unwrap()
    }

    #[tokio::test]
    async fn replay_scenario_a_linear_history_with_clear() {
        let store = new_store().await;
        let session_id = 1;
        store
            .registry
            .insert(&AgentRow {
                uuid: "root".into(),
                name: None,
                parent_uuid: None,
                created_at: 0,
                fork_message_id: 0,
                status: AgentStatus::Running,
                ended_at: None,
                idle: false,
                session_id,
            })
            .await
            .unwrap();

        store.events.append(session_id, Some("root"), EventKind::User, Some("first"), None).await.unwrap();
        store.events.append(session_id, Some("root"), EventKind::Assistant, Some("reply one"), None).await.unwrap();
        store.events.append(session_id, Some("root"), EventKind::Clear, None, None).await.unwrap();
        store.events.append(session_id, Some("root"), EventKind::User, Some("second"), None).await.unwrap();
        store.events.append(session_id, Some("root"), EventKind::Assistant, Some("reply two"), None).await.unwrap();

        let session = replay(&store, "root").await.unwrap();
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].text(), "second");
        assert_eq!(session.messages[1].text(), "reply two");
    }

    #[tokio::test]
    async fn replay_scenario_b_fork_inherits_parent_prefix() {
        let store = new_store().await;
        let session_id = 1;
        store
            .registry
            .insert(&AgentRow {
                uuid: "root".into(),
                name: None,
                parent_uuid: None,
                created_at: 0,
                fork_message_id: 0,
                status: AgentStatus::Running,
                ended_at: None,
                idle: false,
                session_id,
            })
            .await
            .unwrap();
        let fork_id = store.events.append(session_id, Some("root"), EventKind::User, Some("before fork"), None).await.unwrap();
        store
            .registry
            .insert(&AgentRow {
                uuid: "child".into(),
                name: None,
                parent_uuid: Some("root".into()),
                created_at: 1,
                fork_message_id: fork_id,
                status: AgentStatus::Running,
                ended_at: None,
                idle: false,
                session_id,
            })
            .await
            .unwrap();
        store.events.append(session_id, Some("root"), EventKind::User, Some("root continues"), None).await.unwrap();
        store.events.append(session_id, Some("child"), EventKind::User, Some("child continues"), None).await.unwrap();

        let child_session = replay(&store, "child").await.unwrap();
        assert_eq!(child_session.messages.len(), 2);
        assert_eq!(child_session.messages[0].text(), "before fork");
        assert_eq!(child_session.messages[1].text(), "child continues");
    }

    #[tokio::test]
    async fn missing_parent_is_invalid_arg() {
        let store = new_store().await;
        let session_id = 1;
        store
            .registry
            .insert(&AgentRow {
                uuid: "orphan".into(),
                name: None,
                parent_uuid: Some("ghost".into()),
                created_at: 0,
                fork_message_id: 0,
                status: AgentStatus::Running,
                ended_at: None,
                idle: false,
                session_id,
            })
            .await
            .unwrap();

        let err = replay(&store, "orphan").await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidArg(msg) if msg == "Parent not found"));
    }

    #[tokio::test]
    async fn toolset_command_overrides_fork_inheritance() {
        let store = new_store().await;
        let session_id = 1;
        store
            .registry
            .insert(&AgentRow {
                uuid: "root".into(),
                name: None,
                parent_uuid: None,
                created_at: 0,
                fork_message_id: 0,
                status: AgentStatus::Running,
                ended_at: None,
                idle: false,
                session_id,
            })
            .await
            .unwrap();
        store
            .events
            .append(
                session_id,
                Some("root"),
                EventKind::Command,
                None,
                Some(&serde_json::json!({"command": "toolset", "toolset_filter": ["shell", "edit"]})),
            )
            .await
            .unwrap();

        let toolset = restore_toolset(&store, "root").await.unwrap();
        assert_eq!(toolset, vec!["shell".to_string(), "edit".to_string()]);
    }
}
