// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `/fork [prompt...]` — spawn a child agent.
//!
//! With no arguments the child inherits a verbatim copy of the current
//! agent's message history. With a prompt, the child starts fresh with only
//! that prompt as its first user message.

use crate::commands::{CommandArgument, CommandContext, CommandResult, ReplEffect, SlashCommand};

pub struct ForkCommand;

impl SlashCommand for ForkCommand {
    fn name(&self) -> &str {
        "fork"
    }

    fn description(&self) -> &str {
        "Spawn a child agent, optionally seeded with a fresh prompt"
    }

    fn arguments(&self) -> Vec<CommandArgument> {
        vec![CommandArgument::optional("prompt", "seed the child with this instead of copying history")]
    }

    fn execute(&self, args: Vec<String>, _ctx: &CommandContext) -> CommandResult {
        let prompt = if args.is_empty() { None } else { Some(args.join(" ")) };
        CommandResult::effect(ReplEffect::Fork { prompt })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_args_copies_history() {
        let result = ForkCommand.execute(vec![], &CommandContext::default());
        assert_eq!(result.effect, Some(ReplEffect::Fork { prompt: None }));
    }

    #[test]
    fn args_join_into_prompt() {
        let result = ForkCommand.execute(vec!["go".into(), "explore".into()], &CommandContext::default());
        assert_eq!(result.effect, Some(ReplEffect::Fork { prompt: Some("go explore".into()) }));
    }
}
