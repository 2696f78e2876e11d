// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `/clear` — drop the current agent's message history. Never resets the
//! toolset filter (spec §9).

use crate::commands::{CommandContext, CommandResult, ReplEffect, SlashCommand};

pub struct ClearCommand;

impl SlashCommand for ClearCommand {
    fn name(&self) -> &str {
        "clear"
    }

    fn description(&self) -> &str {
        "Clear message history (keeps the toolset filter)"
    }

    fn execute(&self, args: Vec<String>, _ctx: &CommandContext) -> CommandResult {
        if !args.is_empty() {
            return CommandResult::error("usage: /clear");
        }
        CommandResult::effect(ReplEffect::Clear)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_returns_clear_effect() {
        let result = ClearCommand.execute(vec![], &CommandContext::default());
        assert_eq!(result.effect, Some(ReplEffect::Clear));
    }
}
