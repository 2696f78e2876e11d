// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `/help` — list every registered command. The dispatch loop renders the
//! text from the registry itself (via `CommandRegistry::iter`), so `/help`
//! never drifts out of sync with what is actually registered.

use crate::commands::{CommandContext, CommandRegistry, CommandResult, ReplEffect, SlashCommand};

/// Renders one line per registered command, sorted by name, for display
/// when a `/help` effect is applied.
pub fn render_help(registry: &CommandRegistry) -> String {
    registry
        .names()
        .into_iter()
        .map(|name| {
            let cmd = registry.get(name).expect("name came from this registry");
            format!("/{name} — {}", cmd.description())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct HelpCommand;

impl SlashCommand for HelpCommand {
    fn name(&self) -> &str {
        "help"
    }

    fn description(&self) -> &str {
        "List every available command"
    }

    fn execute(&self, args: Vec<String>, _ctx: &CommandContext) -> CommandResult {
        if !args.is_empty() {
            return CommandResult::error("usage: /help");
        }
        CommandResult::effect(ReplEffect::Help)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_returns_help_effect() {
        let result = HelpCommand.execute(vec![], &CommandContext::default());
        assert_eq!(result.effect, Some(ReplEffect::Help));
    }
}
