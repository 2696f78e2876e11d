// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Backend-agnostic connection pool.
//!
//! Production targets PostgreSQL; the bundled test suite runs the identical
//! queries against SQLite. `sqlx::Any` gives both a single `?`-placeholder
//! dialect, so every query in this crate is written once and runs unchanged
//! on either driver.

use std::sync::Once;

use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::AnyPool;

use crate::error::{StoreError, StoreResult};

static INSTALL_DRIVERS: Once = Once::new();

fn ensure_drivers_installed() {
    INSTALL_DRIVERS.call_once(|| {
        sqlx::any::install_default_drivers();
    });
}

/// Connect to a database URL (`postgres://...` or `sqlite::memory:` /
/// `sqlite:<path>`).
pub async fn connect(database_url: &str) -> StoreResult<AnyPool> {
    ensure_drivers_installed();
    AnyPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(StoreError::DbConnect)
}

/// Connect to a private in-memory SQLite database, for tests.
pub async fn connect_in_memory() -> StoreResult<AnyPool> {
    connect("sqlite::memory:").await
}

pub(crate) type Row = AnyRow;
