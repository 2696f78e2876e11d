// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Persistent record of every agent ever created.

use sqlx::{AnyPool, Row};

use crate::error::StoreResult;
use crate::notify::NotifyHub;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Running,
    Dead,
}

impl AgentStatus {
    fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Running => "running",
            AgentStatus::Dead => "dead",
        }
    }
}

/// A row in the agent registry.
///
/// Invariants (enforced by callers, not this type): the parent chain is
/// acyclic and rooted at an agent with `parent_uuid == None`;
/// `fork_message_id > 0` iff `parent_uuid.is_some()`; `ended_at` is set iff
/// `status == Dead`.
#[derive(Debug, Clone)]
pub struct AgentRow {
    pub uuid: String,
    pub name: Option<String>,
    pub parent_uuid: Option<String>,
    pub created_at: i64,
    pub fork_message_id: i64,
    pub status: AgentStatus,
    pub ended_at: Option<i64>,
    pub idle: bool,
    pub session_id: i64,
}

pub struct AgentRegistry {
    pool: AnyPool,
    notify_hub: NotifyHub,
}

impl AgentRegistry {
    pub fn new(pool: AnyPool, notify_hub: NotifyHub) -> Self {
        Self { pool, notify_hub }
    }

    pub fn notify_hub(&self) -> &NotifyHub {
        &self.notify_hub
    }

    pub async fn insert(&self, row: &AgentRow) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO agents (uuid, name, parent_uuid, created_at, fork_message_id, \
             status, ended_at, idle, session_id) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.uuid)
        .bind(&row.name)
        .bind(&row.parent_uuid)
        .bind(row.created_at)
        .bind(row.fork_message_id)
        .bind(row.status.as_str())
        .bind(row.ended_at)
        .bind(row.idle as i64)
        .bind(row.session_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Marks `uuid` dead and stamps `ended_at`, atomically. A dead agent is
    /// never resurrected, so this is a one-way transition; calling it again
    /// on an already-dead agent is a harmless no-op.
    pub async fn mark_dead(&self, uuid: &str, ended_at: i64) -> StoreResult<()> {
        sqlx::query(
            "UPDATE agents SET status = ?, ended_at = ? WHERE uuid = ? AND status = 'running'",
        )
        .bind(AgentStatus::Dead.as_str())
        .bind(ended_at)
        .bind(uuid)
        .execute(&self.pool)
        .await?;
        self.notify_hub.notify(format!("agent_lifecycle:{uuid}"), "dead");
        Ok(())
    }

    pub async fn set_idle(&self, uuid: &str, idle: bool) -> StoreResult<()> {
        sqlx::query("UPDATE agents SET idle = ? WHERE uuid = ?")
            .bind(idle as i64)
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get(&self, uuid: &str) -> StoreResult<Option<AgentRow>> {
        let row = sqlx::query(
            "SELECT uuid, name, parent_uuid, created_at, fork_message_id, status, \
             ended_at, idle, session_id FROM agents WHERE uuid = ?",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_agent).transpose()
    }

    /// The highest event id recorded for `uuid`, or `0` if none.
    pub async fn get_last_event_id(&self, uuid: &str) -> StoreResult<i64> {
        let row = sqlx::query("SELECT MAX(id) FROM messages WHERE agent_uuid = ?")
            .bind(uuid)
            .fetch_one(&self.pool)
            .await?;
        let id: Option<i64> = row.try_get(0)?;
        Ok(id.unwrap_or(0))
    }

    pub async fn find_children(&self, uuid: &str) -> StoreResult<Vec<AgentRow>> {
        let rows = sqlx::query(
            "SELECT uuid, name, parent_uuid, created_at, fork_message_id, status, \
             ended_at, idle, session_id FROM agents WHERE parent_uuid = ? ORDER BY created_at",
        )
        .bind(uuid)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_agent).collect()
    }

    pub async fn list_all(&self, session_id: i64) -> StoreResult<Vec<AgentRow>> {
        let rows = sqlx::query(
            "SELECT uuid, name, parent_uuid, created_at, fork_message_id, status, \
             ended_at, idle, session_id FROM agents WHERE session_id = ? ORDER BY created_at",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_agent).collect()
    }
}

fn row_to_agent(row: crate::pool::Row) -> StoreResult<AgentRow> {
    let status_text: String = row.try_get(5)?;
    let status = if status_text == "dead" { AgentStatus::Dead } else { AgentStatus::Running };
    let idle_int: i64 = row.try_get(7)?;
    Ok(AgentRow {
        uuid: row.try_get(0)?,
        name: row.try_get(1)?,
        parent_uuid: row.try_get(2)?,
        created_at: row.try_get(3)?,
        fork_message_id: row.try_get(4)?,
        status,
        ended_at: row.try_get(6)?,
        idle: idle_int != 0,
        session_id: row.try_get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::create_test_schema;
    use crate::pool::connect_in_memory;

    fn root(uuid: &str) -> AgentRow {
        AgentRow {
            uuid: uuid.to_string(),
            name: None,
            parent_uuid: None,
            created_at: 1000,
            fork_message_id: 0,
            status: AgentStatus::Running,
            ended_at: None,
            idle: false,
            session_id: 1,
        }
    }

    async fn registry() -> AgentRegistry {
        let pool = connect_in_memory().await.unwrap();
        create_test_schema(&pool).await;
        AgentRegistry::new(pool, NotifyHub::new())
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let reg = registry().await;
        reg.insert(&root("agent-a")).await.unwrap();
        let row = reg.get("agent-a").await.unwrap().unwrap();
        assert_eq!(row.status, AgentStatus::Running);
        assert!(row.ended_at.is_none());
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let reg = registry().await;
        assert!(reg.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mark_dead_sets_status_and_ended_at_and_is_idempotent() {
        let reg = registry().await;
        reg.insert(&root("agent-a")).await.unwrap();
        reg.mark_dead("agent-a", 2000).await.unwrap();
        let row = reg.get("agent-a").await.unwrap().unwrap();
        assert_eq!(row.status, AgentStatus::Dead);
        assert_eq!(row.ended_at, Some(2000));

        // second call is a no-op, not an error, and doesn't bump ended_at
        reg.mark_dead("agent-a", 3000).await.unwrap();
        let row = reg.get("agent-a").await.unwrap().unwrap();
        assert_eq!(row.ended_at, Some(2000));
    }

    #[tokio::test]
    async fn mark_dead_notifies_lifecycle_channel() {
        let reg = registry().await;
        reg.insert(&root("agent-a")).await.unwrap();
        let mut sub = reg.notify_hub().listen();
        reg.mark_dead("agent-a", 10).await.unwrap();
        assert_eq!(sub.recv_on("agent_lifecycle:agent-a").await.unwrap().payload, "dead");
    }

    #[tokio::test]
    async fn find_children_orders_by_created_at() {
        let reg = registry().await;
        reg.insert(&root("parent")).await.unwrap();
        let mut child1 = root("child-1");
        child1.parent_uuid = Some("parent".into());
        child1.fork_message_id = 5;
        child1.created_at = 10;
        let mut child2 = root("child-2");
        child2.parent_uuid = Some("parent".into());
        child2.fork_message_id = 8;
        child2.created_at = 20;
        reg.insert(&child2).await.unwrap();
        reg.insert(&child1).await.unwrap();

        let children = reg.find_children("parent").await.unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].uuid, "child-1");
        assert_eq!(children[1].uuid, "child-2");
    }

    #[tokio::test]
    async fn set_idle_toggles_flag() {
        let reg = registry().await;
        reg.insert(&root("agent-a")).await.unwrap();
        reg.set_idle("agent-a", true).await.unwrap();
        assert!(reg.get("agent-a").await.unwrap().unwrap().idle);
        reg.set_idle("agent-a", false).await.unwrap();
        assert!(!reg.get("agent-a").await.unwrap().unwrap().idle);
    }
}
