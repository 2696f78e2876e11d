// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
pub mod catalog;
mod error;
mod provider;
mod types;
mod anthropic;
mod google;
mod mock;
mod openai;

pub use anthropic::AnthropicProvider;
pub use catalog::{InputModality, ModelCatalogEntry, ThinkingFamily};
pub use error::{ProviderError, ProviderResult};
pub use google::GoogleProvider;
pub use mock::{MockProvider, ScriptedMockProvider};
pub use openai::OpenAiProvider;
pub use provider::{ModelProvider, ResponseStream};
pub use types::*;

/// Build a boxed [`ModelProvider`] for one of the three provider families this
/// crate knows about. `model_id` is matched against the bundled catalog to
/// recover its provider when `provider` is left unspecified by the caller.
pub fn from_provider_and_model(provider: &str, model_id: &str, api_key: Option<String>, base_url: Option<String>) -> Result<Box<dyn ModelProvider>, ProviderError> {
    match provider {
        "anthropic" => Ok(Box::new(AnthropicProvider::new(model_id.to_string(), api_key, base_url))),
        "openai" => Ok(Box::new(OpenAiProvider::new(model_id.to_string(), api_key, base_url))),
        "google" => Ok(Box::new(GoogleProvider::new(model_id.to_string(), api_key, base_url))),
        "mock" => Ok(Box::new(MockProvider)),
        other => Err(ProviderError::InvalidArg(format!("unknown model provider: {other:?}"))),
    }
}

/// Resolve a bare model id (no provider prefix) against the static catalog
/// and construct its provider. Used when the session only has a model name,
/// e.g. from the `/model` slash command.
pub fn from_model_id(model_id: &str, api_key: Option<String>) -> Result<Box<dyn ModelProvider>, ProviderError> {
    let entry = catalog::lookup_by_model_name(model_id)
        .ok_or_else(|| ProviderError::InvalidArg(format!("model {model_id:?} not found in catalog")))?;
    from_provider_and_model(&entry.provider, &entry.id, api_key, None)
}
