// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `/filter-mail [--since <duration>]` — peek pending mail without
//! consuming it, optionally filtered to mail no older than `duration`.

use crate::commands::{CommandArgument, CommandContext, CommandResult, ReplEffect, SlashCommand};

pub struct FilterMailCommand;

impl SlashCommand for FilterMailCommand {
    fn name(&self) -> &str {
        "filter-mail"
    }

    fn description(&self) -> &str {
        "Peek pending mail, optionally filtered by age"
    }

    fn arguments(&self) -> Vec<CommandArgument> {
        vec![CommandArgument::optional("--since", "only show mail no older than this, e.g. 5m")]
    }

    fn execute(&self, args: Vec<String>, _ctx: &CommandContext) -> CommandResult {
        match args.as_slice() {
            [] => CommandResult::effect(ReplEffect::FilterMail { since: None }),
            [flag, value] if flag == "--since" => match humantime::parse_duration(value) {
                Ok(d) => CommandResult::effect(ReplEffect::FilterMail { since: Some(d) }),
                Err(_) => CommandResult::error(format!("invalid duration: {value}")),
            },
            _ => CommandResult::error("usage: /filter-mail [--since <duration>]"),
        }
    }
}
