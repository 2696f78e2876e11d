// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Append-only event log keyed by (session, agent).

use chrono::{DateTime, Utc};
use sqlx::{AnyPool, Row};

use crate::error::{StoreError, StoreResult};
use crate::notify::NotifyHub;

/// The enumerated event kinds. The id order of the `messages` table IS the
/// agent's history order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Clear,
    System,
    User,
    Assistant,
    ToolCall,
    ToolResult,
    Mark,
    Rewind,
    AgentKilled,
    Command,
    Fork,
    Usage,
    Interrupted,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Clear => "clear",
            EventKind::System => "system",
            EventKind::User => "user",
            EventKind::Assistant => "assistant",
            EventKind::ToolCall => "tool_call",
            EventKind::ToolResult => "tool_result",
            EventKind::Mark => "mark",
            EventKind::Rewind => "rewind",
            EventKind::AgentKilled => "agent_killed",
            EventKind::Command => "command",
            EventKind::Fork => "fork",
            EventKind::Usage => "usage",
            EventKind::Interrupted => "interrupted",
        }
    }

    pub fn parse(s: &str) -> StoreResult<Self> {
        Ok(match s {
            "clear" => EventKind::Clear,
            "system" => EventKind::System,
            "user" => EventKind::User,
            "assistant" => EventKind::Assistant,
            "tool_call" => EventKind::ToolCall,
            "tool_result" => EventKind::ToolResult,
            "mark" => EventKind::Mark,
            "rewind" => EventKind::Rewind,
            "agent_killed" => EventKind::AgentKilled,
            "command" => EventKind::Command,
            "fork" => EventKind::Fork,
            "usage" => EventKind::Usage,
            "interrupted" => EventKind::Interrupted,
            other => return Err(StoreError::InvalidArg(format!("unknown event kind: {other}"))),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Event {
    pub id: i64,
    pub session_id: i64,
    pub agent_uuid: Option<String>,
    pub kind: EventKind,
    pub content: Option<String>,
    pub data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// `end_id_inclusive == None` means unbounded ("to end"), the sentinel
/// `end_id = 0` from the replay plan's wire representation.
#[derive(Debug, Clone, Copy)]
pub struct Range {
    pub start_id_exclusive: i64,
    pub end_id_inclusive: Option<i64>,
}

pub struct EventStore {
    pool: AnyPool,
    notify_hub: NotifyHub,
}

impl EventStore {
    pub fn new(pool: AnyPool, notify_hub: NotifyHub) -> Self {
        Self { pool, notify_hub }
    }

    pub fn notify_hub(&self) -> &NotifyHub {
        &self.notify_hub
    }

    /// Append one event. Notifies `agent_lifecycle:<agent_uuid>` only for
    /// `agent_killed` events; callers needing other notifications (mail,
    /// custom channels) invoke `notify_hub()` directly after commit.
    pub async fn append(
        &self,
        session_id: i64,
        agent_uuid: Option<&str>,
        kind: EventKind,
        content: Option<&str>,
        data: Option<&serde_json::Value>,
    ) -> StoreResult<i64> {
        let data_text = data.map(|v| v.to_string());
        let now = Utc::now().to_rfc3339();
        let row = sqlx::query(
            "INSERT INTO messages (session_id, agent_uuid, kind, content, data, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(session_id)
        .bind(agent_uuid)
        .bind(kind.as_str())
        .bind(content)
        .bind(data_text)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        let id: i64 = row.try_get(0)?;

        if kind == EventKind::AgentKilled {
            if let Some(uuid) = agent_uuid {
                self.notify_hub.notify(format!("agent_lifecycle:{uuid}"), "dead");
            }
        }
        Ok(id)
    }

    /// Query events for `agent` within `(start_id_exclusive, end_id_inclusive]`,
    /// ordered by id (the history order).
    pub async fn query_range(&self, agent_uuid: &str, range: Range) -> StoreResult<Vec<Event>> {
        let rows = match range.end_id_inclusive {
            Some(end) => {
                sqlx::query(
                    "SELECT id, session_id, agent_uuid, kind, content, data, created_at \
                     FROM messages WHERE agent_uuid = ? AND id > ? AND id <= ? ORDER BY id",
                )
                .bind(agent_uuid)
                .bind(range.start_id_exclusive)
                .bind(end)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, session_id, agent_uuid, kind, content, data, created_at \
                     FROM messages WHERE agent_uuid = ? AND id > ? ORDER BY id",
                )
                .bind(agent_uuid)
                .bind(range.start_id_exclusive)
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.into_iter().map(row_to_event).collect()
    }

    /// The id of the most recent event of `kind` on `agent`'s log with
    /// `id <= max_id` (or unbounded if `max_id` is `None`), or `0` if none.
    pub async fn find_last_by_kind(
        &self,
        agent_uuid: &str,
        kind: EventKind,
        max_id: Option<i64>,
    ) -> StoreResult<i64> {
        let row = match max_id {
            Some(max) => {
                sqlx::query(
                    "SELECT MAX(id) FROM messages WHERE agent_uuid = ? AND kind = ? AND id <= ?",
                )
                .bind(agent_uuid)
                .bind(kind.as_str())
                .bind(max)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT MAX(id) FROM messages WHERE agent_uuid = ? AND kind = ?")
                    .bind(agent_uuid)
                    .bind(kind.as_str())
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        let id: Option<i64> = row.try_get(0)?;
        Ok(id.unwrap_or(0))
    }

    /// The `data` of the most recent `command` event on `agent`'s log whose
    /// `data.command == command_name`, or `None`.
    pub async fn find_most_recent_command(
        &self,
        agent_uuid: &str,
        command_name: &str,
    ) -> StoreResult<Option<serde_json::Value>> {
        let rows = sqlx::query(
            "SELECT data FROM messages WHERE agent_uuid = ? AND kind = ? ORDER BY id DESC",
        )
        .bind(agent_uuid)
        .bind(EventKind::Command.as_str())
        .fetch_all(&self.pool)
        .await?;

        for row in rows {
            let text: Option<String> = row.try_get(0)?;
            let Some(text) = text else { continue };
            let value: serde_json::Value = serde_json::from_str(&text)
                .map_err(|e| StoreError::Parse(e.to_string()))?;
            if value.get("command").and_then(|v| v.as_str()) == Some(command_name) {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

fn row_to_event(row: crate::pool::Row) -> StoreResult<Event> {
    let data_text: Option<String> = row.try_get(5)?;
    let data = data_text
        .map(|t| serde_json::from_str(&t))
        .transpose()
        .map_err(|e: serde_json::Error| StoreError::Parse(e.to_string()))?;
    let created_at_text: String = row.try_get(6)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Parse(e.to_string()))?;
    let kind_text: String = row.try_get(3)?;
    Ok(Event {
        id: row.try_get(0)?,
        session_id: row.try_get(1)?,
        agent_uuid: row.try_get(2)?,
        kind: EventKind::parse(&kind_text)?,
        content: row.try_get(4)?,
        data,
        created_at,
    })
}

/// Creates the sessions/agents/events/mail tables directly, bypassing the
/// migration runner. Used by this crate's own tests and exposed so
/// downstream crates can spin up an in-memory store for their tests too.
pub async fn create_test_schema(pool: &AnyPool) {
    sqlx::query(
        "CREATE TABLE sessions (id INTEGER PRIMARY KEY AUTOINCREMENT, started_at TEXT, ended_at TEXT)",
    )
    .execute(pool)
    .await
    .unwrap();
    sqlx::query(
        "CREATE TABLE agents (\
            uuid TEXT PRIMARY KEY, name TEXT, parent_uuid TEXT, created_at INTEGER, \
            fork_message_id INTEGER DEFAULT 0, status TEXT DEFAULT 'running', \
            ended_at INTEGER, idle INTEGER DEFAULT 0, session_id INTEGER)",
    )
    .execute(pool)
    .await
    .unwrap();
    sqlx::query(
        "CREATE TABLE messages (\
            id INTEGER PRIMARY KEY AUTOINCREMENT, session_id INTEGER NOT NULL, \
            agent_uuid TEXT, kind TEXT NOT NULL, content TEXT, data TEXT, created_at TEXT)",
    )
    .execute(pool)
    .await
    .unwrap();
    sqlx::query("CREATE INDEX idx_messages_agent ON messages (agent_uuid, id)")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query(
        "CREATE TABLE mail (\
            id INTEGER PRIMARY KEY AUTOINCREMENT, session_id INTEGER, from_uuid TEXT, \
            to_uuid TEXT, body TEXT, timestamp INTEGER)",
    )
    .execute(pool)
    .await
    .unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::connect_in_memory;

    async fn store() -> EventStore {
        let pool = connect_in_memory().await.unwrap();
        create_test_schema(&pool).await;
        EventStore::new(pool, NotifyHub::new())
    }

    #[tokio::test]
    async fn append_then_query_range_returns_in_id_order() {
        let store = store().await;
        store.append(1, Some("agent-a"), EventKind::User, Some("hi"), None).await.unwrap();
        store.append(1, Some("agent-a"), EventKind::Assistant, Some("hello"), None).await.unwrap();

        let events = store
            .query_range("agent-a", Range { start_id_exclusive: 0, end_id_inclusive: None })
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].content.as_deref(), Some("hi"));
        assert_eq!(events[1].content.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn query_range_respects_exclusive_start_and_inclusive_end() {
        let store = store().await;
        let id1 = store.append(1, Some("a"), EventKind::User, Some("1"), None).await.unwrap();
        let id2 = store.append(1, Some("a"), EventKind::User, Some("2"), None).await.unwrap();
        store.append(1, Some("a"), EventKind::User, Some("3"), None).await.unwrap();

        let events = store
            .query_range("a", Range { start_id_exclusive: id1, end_id_inclusive: Some(id2) })
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].content.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn find_last_by_kind_returns_zero_when_absent() {
        let store = store().await;
        store.append(1, Some("a"), EventKind::User, Some("1"), None).await.unwrap();
        let last = store.find_last_by_kind("a", EventKind::Clear, None).await.unwrap();
        assert_eq!(last, 0);
    }

    #[tokio::test]
    async fn find_last_by_kind_honors_max_id() {
        let store = store().await;
        let clear1 = store.append(1, Some("a"), EventKind::Clear, None, None).await.unwrap();
        let mid = store.append(1, Some("a"), EventKind::User, Some("x"), None).await.unwrap();
        let clear2 = store.append(1, Some("a"), EventKind::Clear, None, None).await.unwrap();

        assert_eq!(store.find_last_by_kind("a", EventKind::Clear, Some(mid)).await.unwrap(), clear1);
        assert_eq!(store.find_last_by_kind("a", EventKind::Clear, None).await.unwrap(), clear2);
    }

    #[tokio::test]
    async fn find_most_recent_command_matches_by_command_field() {
        let store = store().await;
        store
            .append(1, Some("a"), EventKind::Command, None, Some(&serde_json::json!({"command": "mark", "label": "x"})))
            .await
            .unwrap();
        store
            .append(1, Some("a"), EventKind::Command, None, Some(&serde_json::json!({"command": "toolset", "filter": ["grep"]})))
            .await
            .unwrap();

        let found = store.find_most_recent_command("a", "toolset").await.unwrap().unwrap();
        assert_eq!(found["filter"][0], "grep");

        assert!(store.find_most_recent_command("a", "nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn append_agent_killed_notifies_lifecycle_channel() {
        let store = store().await;
        let mut sub = store.notify_hub().listen();
        store.append(1, Some("a"), EventKind::AgentKilled, None, None).await.unwrap();
        let n = sub.recv_on("agent_lifecycle:a").await.unwrap();
        assert_eq!(n.payload, "dead");
    }

    #[tokio::test]
    async fn unknown_kind_fails_to_parse() {
        assert!(EventKind::parse("bogus").is_err());
    }
}
