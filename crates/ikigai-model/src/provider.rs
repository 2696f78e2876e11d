// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::catalog::{InputModality, ModelCatalogEntry};
use crate::error::ProviderError;
use crate::types::{Request, StreamEvent};

/// A provider's streaming response: the session drives this to completion,
/// converting each `StreamEvent` into appended messages and scrollback
/// lines as it arrives.
pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ProviderError>> + Send>>;

#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Human-readable provider name, e.g. `"anthropic"`.
    fn name(&self) -> &str;

    /// Model identifier as reported to users.
    fn model_name(&self) -> &str;

    /// Send a request and return a streaming response. Implementations
    /// serialize `req` to their wire format, open the HTTP stream (treated
    /// as an opaque byte-stream callback per this crate's scope — the
    /// concrete transport lives outside it), and decode SSE frames into
    /// `StreamEvent`s as they arrive.
    async fn start_request(&self, req: Request) -> Result<ResponseStream, ProviderError>;

    /// List all models available from this provider. Default implementation
    /// returns only the static catalog entries for this provider; override
    /// to perform a live API query.
    async fn list_models(&self) -> Result<Vec<ModelCatalogEntry>, ProviderError> {
        let provider = self.name();
        Ok(crate::catalog::static_catalog().into_iter().filter(|e| e.provider == provider).collect())
    }

    fn catalog_max_output_tokens(&self) -> Option<u32> {
        crate::catalog::lookup(self.name(), self.model_name()).map(|e| e.max_output_tokens)
    }

    fn catalog_context_window(&self) -> Option<u32> {
        crate::catalog::lookup(self.name(), self.model_name()).map(|e| e.context_window)
    }

    /// Query the live API for the actual context window in use. Default
    /// implementation returns `None` (no live probe available).
    async fn probe_context_window(&self) -> Option<u32> {
        None
    }

    fn input_modalities(&self) -> Vec<InputModality> {
        crate::catalog::lookup(self.name(), self.model_name())
            .map(|e| e.input_modalities)
            .unwrap_or_else(|| vec![InputModality::Text])
    }

    fn supports_images(&self) -> bool {
        self.input_modalities().contains(&InputModality::Image)
    }
}
