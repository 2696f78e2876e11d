// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `/kill [target]` — mark an agent dead. With no argument, kills the
//! current agent.

use crate::commands::{CommandArgument, CommandContext, CommandResult, ReplEffect, SlashCommand};

pub struct KillCommand;

impl SlashCommand for KillCommand {
    fn name(&self) -> &str {
        "kill"
    }

    fn description(&self) -> &str {
        "Mark an agent dead (defaults to the current agent)"
    }

    fn arguments(&self) -> Vec<CommandArgument> {
        vec![CommandArgument::optional("target", "uuid of the agent to kill")]
    }

    fn execute(&self, args: Vec<String>, _ctx: &CommandContext) -> CommandResult {
        match args.len() {
            0 => CommandResult::effect(ReplEffect::Kill { target: None }),
            1 => CommandResult::effect(ReplEffect::Kill { target: Some(args[0].clone()) }),
            _ => CommandResult::error("usage: /kill [target]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_args_kills_current_agent() {
        let result = KillCommand.execute(vec![], &CommandContext::default());
        assert_eq!(result.effect, Some(ReplEffect::Kill { target: None }));
    }

    #[test]
    fn one_arg_targets_that_agent() {
        let result = KillCommand.execute(vec!["child-1".into()], &CommandContext::default());
        assert_eq!(result.effect, Some(ReplEffect::Kill { target: Some("child-1".into()) }));
    }

    #[test]
    fn too_many_args_is_an_error() {
        let result = KillCommand.execute(vec!["a".into(), "b".into()], &CommandContext::default());
        assert!(result.error.is_some());
    }
}
