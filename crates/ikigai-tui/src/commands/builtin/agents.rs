// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `/agents` — list every agent in the session's fork tree.

use crate::commands::{CommandContext, CommandResult, ReplEffect, SlashCommand};

pub struct AgentsCommand;

impl SlashCommand for AgentsCommand {
    fn name(&self) -> &str {
        "agents"
    }

    fn description(&self) -> &str {
        "List every agent in this session"
    }

    fn execute(&self, args: Vec<String>, _ctx: &CommandContext) -> CommandResult {
        if !args.is_empty() {
            return CommandResult::error("usage: /agents");
        }
        CommandResult::effect(ReplEffect::Agents)
    }
}
