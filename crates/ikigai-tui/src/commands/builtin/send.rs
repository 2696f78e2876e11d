// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `/send <target> <body...>` — enqueue mail for another agent.

use crate::commands::{CommandArgument, CommandContext, CommandResult, ReplEffect, SlashCommand};

pub struct SendCommand;

impl SlashCommand for SendCommand {
    fn name(&self) -> &str {
        "send"
    }

    fn description(&self) -> &str {
        "Send mail to another agent"
    }

    fn arguments(&self) -> Vec<CommandArgument> {
        vec![
            CommandArgument::required("target", "uuid of the recipient agent"),
            CommandArgument::required("body", "message body"),
        ]
    }

    fn execute(&self, args: Vec<String>, _ctx: &CommandContext) -> CommandResult {
        if args.len() < 2 {
            return CommandResult::error("usage: /send <target> <body>");
        }
        let target = args[0].clone();
        let body = args[1..].join(" ");
        if body.is_empty() {
            return CommandResult::error("message body cannot be empty");
        }
        CommandResult::effect(ReplEffect::Send { target, body })
    }
}
