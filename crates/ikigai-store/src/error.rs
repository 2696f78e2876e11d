// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

/// Error taxonomy for the durable store, matching the kinds the rest of the
/// engine distinguishes on (see `ikigai-core`'s error module for the
/// REPL-facing counterpart).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid argument: {0}")]
    InvalidArg(String),
    #[error("database connection failed: {0}")]
    DbConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    DbMigrate(String),
    #[error("database error: {0}")]
    Db(#[source] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[source] std::io::Error),
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Db(e)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
