// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Model catalog: static metadata for known models, with optional live refresh.

use serde::{Deserialize, Serialize};

/// Input modalities supported by a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputModality {
    Text,
    Image,
}

fn default_input_modalities() -> Vec<InputModality> {
    // Conservative default: text only.
    // Vision-capable models must explicitly list `image` in models.yaml.
    vec![InputModality::Text]
}

/// Metadata for a single model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelCatalogEntry {
    /// Provider-scoped model identifier (e.g. "gpt-4o", "claude-opus-4-6")
    pub id: String,
    /// Human-readable display name
    pub name: String,
    /// Provider identifier: "openai" | "anthropic" | "mock"
    pub provider: String,
    /// Total context window in tokens (input + output)
    pub context_window: u32,
    /// Maximum output tokens per completion
    pub max_output_tokens: u32,
    /// Short description
    #[serde(default)]
    pub description: String,
    /// Supported input modalities.  Defaults to `[text]`.
    #[serde(default = "default_input_modalities")]
    pub input_modalities: Vec<InputModality>,
}

impl ModelCatalogEntry {
    /// Return `true` if the model can accept image input.
    pub fn supports_images(&self) -> bool {
        self.input_modalities.contains(&InputModality::Image)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    models: Vec<ModelCatalogEntry>,
}

/// Return all entries from the bundled static catalog.
pub fn static_catalog() -> Vec<ModelCatalogEntry> {
    let yaml = include_str!("../models.yaml");
    let catalog: CatalogFile =
        serde_yaml::from_str(yaml).expect("bundled models.yaml must be valid");
    catalog.models
}

/// Look up a single model by provider and id (or name).
/// Returns `None` if not found in the static catalog.
pub fn lookup(provider: &str, model_id: &str) -> Option<ModelCatalogEntry> {
    static_catalog()
        .into_iter()
        .find(|e| e.provider == provider && (e.id == model_id || e.name == model_id))
}

/// Look up a model by bare model name (without provider prefix).
///
/// Checks `id` and `name` fields.  Returns the first matching entry from the
/// static catalog or `None` if not found.
///
/// Used by `resolve_model_from_config` to detect when a bare model name (e.g.
/// `"gpt-4o"`) should be resolved against the catalog provider rather than
/// inheriting the custom `base_url` from the user's config.
pub fn lookup_by_model_name(model_name: &str) -> Option<ModelCatalogEntry> {
    static_catalog()
        .into_iter()
        .find(|e| e.id == model_name || e.name == model_name)
}

/// Return `true` if the model supports image input, defaulting to `false` when
/// the model is not found in the catalog.
pub fn supports_images(provider: &str, model_id: &str) -> bool {
    lookup(provider, model_id)
        .map(|e| e.supports_images())
        .unwrap_or(false)
}

/// Look up the context window for a model.  Falls back to `default` if not in catalog.
pub fn context_window(provider: &str, model_id: &str, default: u32) -> u32 {
    lookup(provider, model_id)
        .map(|e| e.context_window)
        .unwrap_or(default)
}

/// Look up the max output tokens for a model.  Falls back to `default` if not in catalog.
pub fn max_output_tokens(provider: &str, model_id: &str, default: u32) -> u32 {
    lookup(provider, model_id)
        .map(|e| e.max_output_tokens)
        .unwrap_or(default)
}

/// Which of the three wire shapes a provider uses to carry a thinking-effort
/// request. Anthropic and Gemini 2.5 take a token budget; GPT-5 and Gemini 3.x
/// take a named level; Claude opus-4-6 takes neither and instead asks the
/// model to size its own thinking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThinkingFamily {
    /// `thinking { type: "enabled", budget_tokens: N }`
    BudgetTokens,
    /// `reasoning_effort` / `thinking_level` as a named enum value
    LevelEnum,
    /// `thinking { type: "adaptive" }` plus `output_config.effort`
    Adaptive,
    /// Model has no thinking mode at all
    None,
}

/// Determine the thinking family for a model, defaulting to `None` for
/// models not in the catalog or with no special-cased behavior.
pub fn thinking_family(provider: &str, model_id: &str) -> ThinkingFamily {
    match (provider, model_id) {
        ("anthropic", "claude-opus-4-6") => ThinkingFamily::Adaptive,
        ("anthropic", _) => ThinkingFamily::BudgetTokens,
        ("google", m) if m.starts_with("gemini-2.5") => ThinkingFamily::BudgetTokens,
        ("google", m) if m.starts_with("gemini-3") => ThinkingFamily::LevelEnum,
        ("openai", m) if m.starts_with("gpt-5") => ThinkingFamily::LevelEnum,
        _ => ThinkingFamily::None,
    }
}

/// Token budget for a `BudgetTokens`-family model at a given level. Levels
/// scale with the model's own `max_output_tokens`, since a budget above the
/// completion cap is rejected by these providers.
pub fn thinking_budget_tokens(provider: &str, model_id: &str, level: crate::types::ThinkingLevel) -> Option<u32> {
    use crate::types::ThinkingLevel::*;
    if thinking_family(provider, model_id) != ThinkingFamily::BudgetTokens {
        return None;
    }
    let cap = lookup(provider, model_id).map(|e| e.max_output_tokens).unwrap_or(32_000);
    Some(match level {
        Min => 1024,
        Low => (cap / 8).max(1024),
        Medium => (cap / 3).max(2048),
        High => (cap / 2).max(4096),
    })
}

/// Gemini 2.5 Pro cannot disable thinking at all; every other model can.
pub fn can_disable_thinking(provider: &str, model_id: &str) -> bool {
    !(provider == "google" && model_id == "gemini-2.5-pro")
}

// ── Unit tests ────────────────────────────────────────────────────────────────
