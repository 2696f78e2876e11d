// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `/reap [target]` — reclaim dead agents.
//!
//! With no argument, reaps every dead descendant of the current agent
//! (the transitive closure of dead children); with a target, reaps just
//! that agent and its own dead descendants.

use crate::commands::{CommandArgument, CommandContext, CommandResult, ReplEffect, SlashCommand};

pub struct ReapCommand;

impl SlashCommand for ReapCommand {
    fn name(&self) -> &str {
        "reap"
    }

    fn description(&self) -> &str {
        "Reclaim dead agents (defaults to every dead descendant)"
    }

    fn arguments(&self) -> Vec<CommandArgument> {
        vec![CommandArgument::optional("target", "uuid of the dead-agent subtree to reap")]
    }

    fn execute(&self, args: Vec<String>, _ctx: &CommandContext) -> CommandResult {
        match args.len() {
            0 => CommandResult::effect(ReplEffect::Reap { target: None }),
            1 => CommandResult::effect(ReplEffect::Reap { target: Some(args[0].clone()) }),
            _ => CommandResult::error("usage: /reap [target]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_args_reaps_all_descendants() {
        let result = ReapCommand.execute(vec![], &CommandContext::default());
        assert_eq!(result.effect, Some(ReplEffect::Reap { target: None }));
    }

    #[test]
    fn one_arg_targets_subtree() {
        let result = ReapCommand.execute(vec!["child-1".into()], &CommandContext::default());
        assert_eq!(result.effect, Some(ReplEffect::Reap { target: Some("child-1".into()) }));
    }
}
