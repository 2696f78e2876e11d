// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Applies the migration bundle at `<data_dir>/migrations/<NNN>-<name>.sql`
//! in lexical order, tracking progress in a `schema_version` row.
//!
//! The SQL files themselves are out of scope here (they ship with the
//! product, not this crate); this module only owns the runner.

use std::path::Path;

use sqlx::AnyPool;

use crate::error::{StoreError, StoreResult};

/// One discovered migration file: a numeric prefix and its SQL body.
#[derive(Debug, Clone)]
struct Migration {
    version: i64,
    name: String,
    sql: String,
}

async fn ensure_schema_version_table(pool: &AnyPool) -> StoreResult<()> {
    sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (id INTEGER PRIMARY KEY, version INTEGER NOT NULL)")
        .execute(pool)
        .await?;
    sqlx::query("INSERT INTO schema_version (id, version) SELECT 1, 0 WHERE NOT EXISTS (SELECT 1 FROM schema_version WHERE id = 1)")
        .execute(pool)
        .await?;
    Ok(())
}

async fn current_version(pool: &AnyPool) -> StoreResult<i64> {
    let row: (i64,) = sqlx::query_as("SELECT version FROM schema_version WHERE id = 1")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

async fn set_version(pool: &AnyPool, version: i64) -> StoreResult<()> {
    sqlx::query("UPDATE schema_version SET version = ? WHERE id = 1")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

fn discover_migrations(dir: &Path) -> StoreResult<Vec<Migration>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut migrations = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("sql") {
            continue;
        }
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| StoreError::Parse(format!("non-utf8 migration filename: {path:?}")))?;
        let (prefix, name) = stem.split_once('-').ok_or_else(|| {
            StoreError::Parse(format!("migration filename missing '-' separator: {stem}"))
        })?;
        let version: i64 = prefix
            .parse()
            .map_err(|_| StoreError::Parse(format!("migration filename prefix is not numeric: {stem}")))?;
        let sql = std::fs::read_to_string(&path)?;
        migrations.push(Migration { version, name: name.to_string(), sql });
    }
    migrations.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.name.cmp(&b.name)));
    Ok(migrations)
}

/// Apply every migration in `migrations_dir` with `version` greater than the
/// one already recorded, each in its own transaction, in lexical order.
pub async fn run(pool: &AnyPool, migrations_dir: &Path) -> StoreResult<i64> {
    ensure_schema_version_table(pool).await?;
    let applied = current_version(pool).await?;
    let migrations = discover_migrations(migrations_dir)?;

    let mut latest = applied;
    for migration in migrations.into_iter().filter(|m| m.version > applied) {
        let mut tx = pool.begin().await?;
        for statement in split_statements(&migration.sql) {
            sqlx::query(statement).execute(&mut *tx).await.map_err(|e| {
                StoreError::DbMigrate(format!("{}-{}: {e}", migration.version, migration.name))
            })?;
        }
        tx.commit().await?;
        set_version(pool, migration.version).await?;
        latest = migration.version;
    }
    Ok(latest)
}

/// Split a migration file on `;` terminators. Good enough for the simple DDL
/// this bundle carries; doesn't attempt to parse string literals containing
/// semicolons.
fn split_statements(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::connect_in_memory;

    fn write_migration(dir: &Path, filename: &str, sql: &str) {
        std::fs::write(dir.join(filename), sql).unwrap();
    }

    #[tokio::test]
    async fn applies_migrations_in_lexical_order() {
        let pool = connect_in_memory().await.unwrap();
        let tmp = tempfile::tempdir().unwrap();
        write_migration(tmp.path(), "001-init.sql", "CREATE TABLE foo (id INTEGER PRIMARY KEY);");
        write_migration(tmp.path(), "002-add-bar.sql", "ALTER TABLE foo ADD COLUMN bar TEXT;");

        let version = run(&pool, tmp.path()).await.unwrap();
        assert_eq!(version, 2);

        sqlx::query("INSERT INTO foo (id, bar) VALUES (1, 'x')")
            .execute(&pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rerunning_is_a_no_op() {
        let pool = connect_in_memory().await.unwrap();
        let tmp = tempfile::tempdir().unwrap();
        write_migration(tmp.path(), "001-init.sql", "CREATE TABLE foo (id INTEGER PRIMARY KEY);");

        assert_eq!(run(&pool, tmp.path()).await.unwrap(), 1);
        assert_eq!(run(&pool, tmp.path()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_migrations_dir_is_not_an_error() {
        let pool = connect_in_memory().await.unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("does-not-exist");
        assert_eq!(run(&pool, &missing).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn only_new_versions_run() {
        let pool = connect_in_memory().await.unwrap();
        let tmp = tempfile::tempdir().unwrap();
        write_migration(tmp.path(), "001-init.sql", "CREATE TABLE foo (id INTEGER PRIMARY KEY);");
        run(&pool, tmp.path()).await.unwrap();

        write_migration(tmp.path(), "002-add-bar.sql", "ALTER TABLE foo ADD COLUMN bar TEXT;");
        let version = run(&pool, tmp.path()).await.unwrap();
        assert_eq!(version, 2);
    }
}
