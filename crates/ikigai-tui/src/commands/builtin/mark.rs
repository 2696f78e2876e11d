// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `/mark [label...]` — push a checkpoint onto the mark stack.

use crate::commands::{CommandArgument, CommandContext, CommandResult, ReplEffect, SlashCommand};

pub struct MarkCommand;

impl SlashCommand for MarkCommand {
    fn name(&self) -> &str {
        "mark"
    }

    fn description(&self) -> &str {
        "Checkpoint the current message history"
    }

    fn arguments(&self) -> Vec<CommandArgument> {
        vec![CommandArgument::optional("label", "name for this checkpoint")]
    }

    fn execute(&self, args: Vec<String>, _ctx: &CommandContext) -> CommandResult {
        let label = if args.is_empty() { None } else { Some(args.join(" ")) };
        CommandResult::effect(ReplEffect::Mark { label })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_args_pushes_unlabeled_mark() {
        let result = MarkCommand.execute(vec![], &CommandContext::default());
        assert_eq!(result.effect, Some(ReplEffect::Mark { label: None }));
    }

    #[test]
    fn args_join_into_label() {
        let result = MarkCommand.execute(vec!["before".into(), "refactor".into()], &CommandContext::default());
        assert_eq!(result.effect, Some(ReplEffect::Mark { label: Some("before refactor".into()) }));
    }
}
