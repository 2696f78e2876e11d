// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("invalid argument: {0}")]
    InvalidArg(String),
    #[error("failed to serialize request: {0}")]
    Serialize(String),
    #[error("failed to parse provider response: {0}")]
    Parse(String),
    #[error("transport error: {0}")]
    Transport(#[source] anyhow::Error),
    #[error("provider returned an error: {0}")]
    Remote(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;
