// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `/toolset [tool...]` — replace the active toolset filter.
//!
//! Tools are deduplicated order-preservingly and whitespace is tolerant of
//! stray commas, matching how users tend to paste a tool list. An empty
//! list clears the filter (no restriction).

use crate::commands::{CommandArgument, CommandContext, CommandResult, ReplEffect, SlashCommand};

pub struct ToolsetCommand;

impl SlashCommand for ToolsetCommand {
    fn name(&self) -> &str {
        "toolset"
    }

    fn description(&self) -> &str {
        "Restrict (or clear) the tools available to this agent"
    }

    fn arguments(&self) -> Vec<CommandArgument> {
        vec![CommandArgument::optional("tool", "tool names to allow; omit to clear the filter")]
    }

    fn execute(&self, args: Vec<String>, _ctx: &CommandContext) -> CommandResult {
        let mut seen = std::collections::HashSet::new();
        let tools: Vec<String> = args
            .iter()
            .flat_map(|arg| arg.split(','))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter(|s| seen.insert(s.to_string()))
            .map(str::to_string)
            .collect();
        CommandResult::effect(ReplEffect::Toolset { tools })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_args_clears_filter() {
        let result = ToolsetCommand.execute(vec![], &CommandContext::default());
        assert_eq!(result.effect, Some(ReplEffect::Toolset { tools: vec![] }));
    }

    #[test]
    fn dedups_and_trims_commas_and_whitespace() {
        let result = ToolsetCommand.execute(
            vec!["shell, edit".into(), "shell".into(), " read ".into()],
            &CommandContext::default(),
        );
        assert_eq!(
            result.effect,
            Some(ReplEffect::Toolset { tools: vec!["shell".into(), "edit".into(), "read".into()] })
        );
    }
}
