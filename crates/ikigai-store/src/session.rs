// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The `sessions` table: one row per REPL run, bracketing every agent and
//! event that belongs to it.

use chrono::Utc;
use sqlx::{AnyPool, Row};

use crate::error::StoreResult;

pub struct SessionStore {
    pool: AnyPool,
}

impl SessionStore {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Open a new session, stamping `started_at` now, and return its id.
    pub async fn open(&self) -> StoreResult<i64> {
        let now = Utc::now().to_rfc3339();
        let row = sqlx::query("INSERT INTO sessions (started_at, ended_at) VALUES (?, NULL) RETURNING id")
            .bind(now)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get(0)?)
    }

    /// Stamp `ended_at` now, closing the session.
    pub async fn close(&self, session_id: i64) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE sessions SET ended_at = ? WHERE id = ?")
            .bind(now)
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// The most recently opened session with `ended_at` still null, if any
    /// — used to resume after a crash rather than starting a fresh session.
    pub async fn find_open(&self) -> StoreResult<Option<i64>> {
        let row = sqlx::query("SELECT id FROM sessions WHERE ended_at IS NULL ORDER BY id DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.try_get(0)).transpose().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::create_test_schema;
    use crate::pool::connect_in_memory;

    async fn store() -> SessionStore {
        let pool = connect_in_memory().await.unwrap();
        create_test_schema(&pool).await;
        SessionStore::new(pool)
    }

    #[tokio::test]
    async fn open_then_close_round_trips() {
        let sessions = store().await;
        let id = sessions.open().await.unwrap();
        assert!(id > 0);
        assert_eq!(sessions.find_open().await.unwrap(), Some(id));
        sessions.close(id).await.unwrap();
        assert_eq!(sessions.find_open().await.unwrap(), None);
    }

    #[tokio::test]
    async fn find_open_picks_the_most_recent_unclosed_session() {
        let sessions = store().await;
        let first = sessions.open().await.unwrap();
        sessions.close(first).await.unwrap();
        let second = sessions.open().await.unwrap();
        assert_eq!(sessions.find_open().await.unwrap(), Some(second));
    }
}
