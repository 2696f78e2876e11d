// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Durable, event-sourced storage for ikigai.
//!
//! Three collaborating stores share one connection pool and one in-process
//! notification hub: the append-only [`events::EventStore`], the
//! [`registry::AgentRegistry`], and the [`mailbox::Mailbox`]. Production
//! targets PostgreSQL; the test suite runs identical queries against
//! bundled SQLite via `sqlx`'s `Any` driver.

pub mod error;
pub mod events;
pub mod mailbox;
pub mod migrate;
pub mod notify;
pub mod pool;
pub mod registry;
pub mod session;

pub use error::{StoreError, StoreResult};
pub use events::{Event, EventKind, EventStore, Range};
pub use mailbox::{Mail, Mailbox};
pub use notify::{NotifyHub, Notification, Subscription};
pub use registry::{AgentRegistry, AgentRow, AgentStatus};
pub use session::SessionStore;

use sqlx::AnyPool;
use std::path::Path;

/// Bundle of the three stores plus the pool, built by connecting and
/// migrating in one call.
pub struct Store {
    pub events: EventStore,
    pub registry: AgentRegistry,
    pub mailbox: Mailbox,
    pub sessions: SessionStore,
    pool: AnyPool,
}

impl Store {
    /// Connect to `database_url`, apply any pending migrations from
    /// `migrations_dir`, and build the four stores on a shared hub.
    pub async fn connect(database_url: &str, migrations_dir: &Path) -> StoreResult<Self> {
        let pool = pool::connect(database_url).await?;
        migrate::run(&pool, migrations_dir).await?;
        Ok(Self::from_pool(pool))
    }

    fn from_pool(pool: AnyPool) -> Self {
        let hub = NotifyHub::new();
        Self {
            events: EventStore::new(pool.clone(), hub.clone()),
            registry: AgentRegistry::new(pool.clone(), hub.clone()),
            mailbox: Mailbox::new(pool.clone(), hub),
            sessions: SessionStore::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

/// Connects to a private in-memory SQLite database and creates its schema
/// directly, skipping the migration runner. Exposed for other crates' test
/// suites; never used outside `#[cfg(test)]` code.
pub async fn connect_test_store() -> StoreResult<Store> {
    let pool = pool::connect_in_memory().await?;
    events::create_test_schema(&pool).await;
    Ok(Store::from_pool(pool))
}
