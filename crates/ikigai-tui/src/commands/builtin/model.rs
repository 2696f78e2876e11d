// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `/model <provider> <model>` — switch the active model.

use crate::commands::{CommandArgument, CommandContext, CommandResult, ReplEffect, SlashCommand};

pub struct ModelCommand;

impl SlashCommand for ModelCommand {
    fn name(&self) -> &str {
        "model"
    }

    fn description(&self) -> &str {
        "Switch the active provider and model"
    }

    fn arguments(&self) -> Vec<CommandArgument> {
        vec![
            CommandArgument::required("provider", "e.g. anthropic, openai, google"),
            CommandArgument::required("model", "model id"),
        ]
    }

    fn execute(&self, args: Vec<String>, _ctx: &CommandContext) -> CommandResult {
        match args.as_slice() {
            [provider, model] => {
                CommandResult::effect(ReplEffect::Model { provider: provider.clone(), model: model.clone() })
            }
            _ => CommandResult::error("usage: /model <provider> <model>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_exactly_two_args() {
        assert!(ModelCommand.execute(vec!["anthropic".into()], &CommandContext::default()).error.is_some());
        let result = ModelCommand.execute(vec!["anthropic".into(), "claude-sonnet".into()], &CommandContext::default());
        assert_eq!(result.effect, Some(ReplEffect::Model { provider: "anthropic".into(), model: "claude-sonnet".into() }));
    }
}
