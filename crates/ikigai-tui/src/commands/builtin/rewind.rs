// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `/rewind <mark>` — truncate history back to a mark, identified by label
//! or stack index.

use crate::commands::{CommandArgument, CommandContext, CommandResult, ReplEffect, SlashCommand, CompletionItem};

pub struct RewindCommand;

impl SlashCommand for RewindCommand {
    fn name(&self) -> &str {
        "rewind"
    }

    fn description(&self) -> &str {
        "Rewind history back to a mark"
    }

    fn arguments(&self) -> Vec<CommandArgument> {
        vec![CommandArgument::required("mark", "label or index of the mark to rewind to")]
    }

    fn complete(&self, arg_index: usize, partial: &str, ctx: &CommandContext) -> Vec<CompletionItem> {
        if arg_index != 0 {
            return vec![];
        }
        ctx.mark_labels
            .iter()
            .filter(|label| label.starts_with(partial))
            .map(CompletionItem::new)
            .collect()
    }

    fn execute(&self, args: Vec<String>, _ctx: &CommandContext) -> CommandResult {
        match args.as_slice() {
            [mark] if !mark.is_empty() => CommandResult::effect(ReplEffect::Rewind { mark: mark.clone() }),
            _ => CommandResult::error("usage: /rewind <mark>"),
        }
    }
}
