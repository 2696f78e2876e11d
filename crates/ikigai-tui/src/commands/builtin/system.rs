// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `/system [prompt...]` — show the active system prompt, or replace it.

use crate::commands::{CommandArgument, CommandContext, CommandResult, ReplEffect, SlashCommand};

pub struct SystemCommand;

impl SlashCommand for SystemCommand {
    fn name(&self) -> &str {
        "system"
    }

    fn description(&self) -> &str {
        "Show or replace the system prompt"
    }

    fn arguments(&self) -> Vec<CommandArgument> {
        vec![CommandArgument::optional("prompt", "new system prompt; omit to show the current one")]
    }

    fn execute(&self, args: Vec<String>, _ctx: &CommandContext) -> CommandResult {
        let prompt = if args.is_empty() { None } else { Some(args.join(" ")) };
        CommandResult::effect(ReplEffect::System { prompt })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_args_requests_display() {
        let result = SystemCommand.execute(vec![], &CommandContext::default());
        assert_eq!(result.effect, Some(ReplEffect::System { prompt: None }));
    }

    #[test]
    fn args_join_into_new_prompt() {
        let result = SystemCommand.execute(vec!["be".into(), "terse".into()], &CommandContext::default());
        assert_eq!(result.effect, Some(ReplEffect::System { prompt: Some("be terse".into()) }));
    }
}
