// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Per-recipient FIFO of pending inter-agent messages.

use sqlx::{AnyPool, Row};

use crate::error::{StoreError, StoreResult};
use crate::notify::NotifyHub;
use crate::registry::{AgentRegistry, AgentStatus};

#[derive(Debug, Clone)]
pub struct Mail {
    pub id: i64,
    pub from_uuid: String,
    pub body: String,
}

pub struct Mailbox {
    pool: AnyPool,
    notify_hub: NotifyHub,
}

impl Mailbox {
    pub fn new(pool: AnyPool, notify_hub: NotifyHub) -> Self {
        Self { pool, notify_hub }
    }

    pub fn notify_hub(&self) -> &NotifyHub {
        &self.notify_hub
    }

    /// The recipient must exist in the registry with status `running`;
    /// an empty body is rejected. On success, notifies `mail:<to_uuid>`.
    pub async fn send(
        &self,
        registry: &AgentRegistry,
        session_id: i64,
        from_uuid: &str,
        to_uuid: &str,
        body: &str,
        timestamp: i64,
    ) -> StoreResult<i64> {
        if body.is_empty() {
            return Err(StoreError::InvalidArg("Message body cannot be empty".to_string()));
        }
        match registry.get(to_uuid).await? {
            Some(row) if row.status == AgentStatus::Running => {}
            Some(_) => return Err(StoreError::InvalidArg("Recipient agent is dead".to_string())),
            None => return Err(StoreError::InvalidArg("Recipient agent is dead".to_string())),
        }

        let row = sqlx::query(
            "INSERT INTO mail (session_id, from_uuid, to_uuid, body, timestamp) \
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(session_id)
        .bind(from_uuid)
        .bind(to_uuid)
        .bind(body)
        .bind(timestamp)
        .fetch_one(&self.pool)
        .await?;
        let id: i64 = row.try_get(0)?;

        self.notify_hub.notify(format!("mail:{to_uuid}"), id.to_string());
        Ok(id)
    }

    /// Atomically pop the oldest pending message for `to_uuid`, from any
    /// sender. The row is deleted in the same round trip it is read in, so
    /// duplicate delivery is impossible even under concurrent consumers.
    pub async fn consume_next(&self, to_uuid: &str) -> StoreResult<Option<Mail>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT id, from_uuid, body FROM mail WHERE to_uuid = ? ORDER BY id LIMIT 1")
            .bind(to_uuid)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };
        let mail = row_to_mail(row)?;
        sqlx::query("DELETE FROM mail WHERE id = ?").bind(mail.id).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(Some(mail))
    }

    /// Like `consume_next`, but only considers messages from `from_uuid`.
    pub async fn consume_from(&self, to_uuid: &str, from_uuid: &str) -> StoreResult<Option<Mail>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            "SELECT id, from_uuid, body FROM mail WHERE to_uuid = ? AND from_uuid = ? ORDER BY id LIMIT 1",
        )
        .bind(to_uuid)
        .bind(from_uuid)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };
        let mail = row_to_mail(row)?;
        sqlx::query("DELETE FROM mail WHERE id = ?").bind(mail.id).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(Some(mail))
    }

    /// Read-only peek at pending mail for `to_uuid`, optionally filtered to
    /// messages at or after `since_timestamp`. Does not consume.
    pub async fn peek_filter(
        &self,
        to_uuid: &str,
        since_timestamp: Option<i64>,
    ) -> StoreResult<Vec<Mail>> {
        let rows = match since_timestamp {
            Some(since) => {
                sqlx::query(
                    "SELECT id, from_uuid, body FROM mail WHERE to_uuid = ? AND timestamp >= ? ORDER BY id",
                )
                .bind(to_uuid)
                .bind(since)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT id, from_uuid, body FROM mail WHERE to_uuid = ? ORDER BY id")
                    .bind(to_uuid)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.into_iter().map(row_to_mail).collect()
    }
}

fn row_to_mail(row: crate::pool::Row) -> StoreResult<Mail> {
    Ok(Mail { id: row.try_get(0)?, from_uuid: row.try_get(1)?, body: row.try_get(2)? })
}
