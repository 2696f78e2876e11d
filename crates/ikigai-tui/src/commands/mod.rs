// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Slash command system for the REPL.
//!
//! Commands are invoked by typing `/command [args]`. Built-ins are
//! registered at startup via [`CommandRegistry::with_builtins`]. A command
//! never touches the store or an `AgentSession` directly — it validates its
//! arguments and returns a [`ReplEffect`] describing what should happen; the
//! dispatch loop in the binary crate applies the effect.

pub mod builtin;
pub mod parser;
pub mod registry;

pub use parser::{parse, ParsedCommand};
pub use registry::CommandRegistry;

use std::time::Duration;

/// Read-only snapshot of the current agent passed to commands for argument
/// validation and completion. Does not include the mutable `AgentSession` —
/// commands describe effects, they don't apply them.
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    pub agent_uuid: String,
    pub provider: String,
    pub model: String,
    pub toolset_filter: Vec<String>,
    pub known_agent_uuids: Vec<String>,
    pub mark_labels: Vec<String>,
}

/// Completion candidate shown while an argument is still being typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    pub value: String,
    pub description: Option<String>,
}

impl CompletionItem {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into(), description: None }
    }

    pub fn with_description(value: impl Into<String>, description: impl Into<String>) -> Self {
        Self { value: value.into(), description: Some(description.into()) }
    }
}

/// Everything a slash command can ask the dispatch loop to do. Each variant
/// maps onto one REPL Core operation from the spec.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplEffect {
    /// `/fork [prompt]` — spawn a child agent, seeded by history copy or by
    /// `prompt` alone.
    Fork { prompt: Option<String> },
    /// `/kill [target]` — mark an agent dead; `None` targets the current one.
    Kill { target: Option<String> },
    /// `/reap [target]` — reclaim dead agents; `None` reaps every dead
    /// descendant of the current agent.
    Reap { target: Option<String> },
    /// `/send <target> <body>` — enqueue mail for another agent.
    Send { target: String, body: String },
    /// `/wait [timeout]` with no targets — block for the current agent's
    /// next message.
    WaitNext { timeout: Duration },
    /// `/wait <timeout> <target...>` — block until every target answers,
    /// idles, or dies.
    WaitFanIn { timeout: Duration, targets: Vec<String> },
    /// `/mark [label]` — push a checkpoint onto the mark stack.
    Mark { label: Option<String> },
    /// `/rewind <mark>` — truncate history back to a mark, by label or
    /// index.
    Rewind { mark: String },
    /// `/toolset <tool...>` — replace the active toolset filter.
    Toolset { tools: Vec<String> },
    /// `/agents` — list every agent in the session's fork tree.
    Agents,
    /// `/help` — list every registered command.
    Help,
    /// `/filter-mail [--since <duration>]` — peek pending mail.
    FilterMail { since: Option<Duration> },
    /// `/system [prompt]` — show or replace the system prompt.
    System { prompt: Option<String> },
    /// `/model <provider> <model>` — switch the active model.
    Model { provider: String, model: String },
    /// `/clear` — drop message history (never resets the toolset filter).
    Clear,
    /// `/exit` — leave the REPL.
    Exit,
}

/// The outcome of executing a command: either an effect for the dispatch
/// loop to apply, or a validation error to show the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandResult {
    pub effect: Option<ReplEffect>,
    pub error: Option<String>,
}

impl CommandResult {
    pub fn effect(effect: ReplEffect) -> Self {
        Self { effect: Some(effect), error: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { effect: None, error: Some(message.into()) }
    }
}

/// Describes one argument a command expects; used for `/help` generation
/// and argument-count validation.
#[derive(Debug, Clone)]
pub struct CommandArgument {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

impl CommandArgument {
    pub const fn required(name: &'static str, description: &'static str) -> Self {
        Self { name, description, required: true }
    }

    pub const fn optional(name: &'static str, description: &'static str) -> Self {
        Self { name, description, required: false }
    }
}

/// A slash command invokable from the input line.
///
/// Implementations must be `Send + Sync` so they can be stored in the
/// registry behind an `Arc`.
pub trait SlashCommand: Send + Sync {
    /// The keyword used after `/` (e.g. `"fork"` for `/fork`).
    fn name(&self) -> &str;

    /// One-line description shown in `/help` and completion.
    fn description(&self) -> &str;

    /// Metadata about expected arguments, for `/help` generation.
    fn arguments(&self) -> Vec<CommandArgument> {
        vec![]
    }

    /// Completions for the argument at `arg_index`, given `partial` text
    /// typed so far. Default: no completions.
    fn complete(&self, arg_index: usize, partial: &str, ctx: &CommandContext) -> Vec<CompletionItem> {
        let _ = (arg_index, partial, ctx);
        vec![]
    }

    /// Validate and translate `args` into an effect for the dispatch loop.
    fn execute(&self, args: Vec<String>, ctx: &CommandContext) -> CommandResult;
}
