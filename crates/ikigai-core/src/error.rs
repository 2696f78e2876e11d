// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

/// Error taxonomy for agent session, replay, and wait-coordinator operations,
/// matching the kinds the rest of the engine distinguishes on.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid argument: {0}")]
    InvalidArg(String),
    #[error("out of range: {0}")]
    OutOfRange(String),
    #[error(transparent)]
    Store(#[from] ikigai_store::StoreError),
}

pub type CoreResult<T> = Result<T, CoreError>;
