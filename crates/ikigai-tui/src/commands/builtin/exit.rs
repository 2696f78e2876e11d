// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `/exit` — leave the REPL.

use crate::commands::{CommandContext, CommandResult, ReplEffect, SlashCommand};

pub struct ExitCommand;

impl SlashCommand for ExitCommand {
    fn name(&self) -> &str {
        "exit"
    }

    fn description(&self) -> &str {
        "Exit the REPL"
    }

    fn execute(&self, args: Vec<String>, _ctx: &CommandContext) -> CommandResult {
        if !args.is_empty() {
            return CommandResult::error("usage: /exit");
        }
        CommandResult::effect(ReplEffect::Exit)
    }
}
