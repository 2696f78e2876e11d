// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `/wait <timeout> [target...]` — block for mail.
//!
//! With no targets, blocks for the current agent's next message. With one
//! or more targets, fans in on all of them at once.

use std::time::Duration;

use crate::commands::{CommandArgument, CommandContext, CommandResult, ReplEffect, SlashCommand};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct WaitCommand;

impl SlashCommand for WaitCommand {
    fn name(&self) -> &str {
        "wait"
    }

    fn description(&self) -> &str {
        "Block for the next message, or fan in on several targets"
    }

    fn arguments(&self) -> Vec<CommandArgument> {
        vec![
            CommandArgument::optional("timeout", "how long to wait, e.g. 30s (default 30s)"),
            CommandArgument::optional("target", "agent(s) to fan in on"),
        ]
    }

    fn execute(&self, args: Vec<String>, _ctx: &CommandContext) -> CommandResult {
        let mut rest = args.as_slice();
        let timeout = match rest.first().and_then(|s| humantime::parse_duration(s).ok()) {
            Some(d) => {
                rest = &rest[1..];
                d
            }
            None => DEFAULT_TIMEOUT,
        };

        if rest.is_empty() {
            CommandResult::effect(ReplEffect::WaitNext { timeout })
        } else {
            CommandResult::effect(ReplEffect::WaitFanIn { timeout, targets: rest.to_vec() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_args_waits_on_self_with_default_timeout() {
        let result = WaitCommand.execute(vec![], &CommandContext::default());
        assert_eq!(result.effect, Some(ReplEffect::WaitNext { timeout: DEFAULT_TIMEOUT }));
    }

    #[test]
    fn explicit_timeout_with_no_targets() {
        let result = WaitCommand.execute(vec!["5s".into()], &CommandContext::default());
        assert_eq!(result.effect, Some(ReplEffect::WaitNext { timeout: Duration::from_secs(5) }));
    }

    #[test]
    fn timeout_plus_targets_is_a_fanin() {
        let result = WaitCommand.execute(
            vec!["10s".into(), "child-1".into(), "child-2".into()],
            &CommandContext::default(),
        );
        assert_eq!(
            result.effect,
            Some(ReplEffect::WaitFanIn {
                timeout: Duration::from_secs(10),
                targets: vec!["child-1".into(), "child-2".into()],
            })
        );
    }

    #[test]
    fn targets_without_a_parseable_timeout_use_the_default() {
        let result = WaitCommand.execute(vec!["child-1".into()], &CommandContext::default());
        assert_eq!(
            result.effect,
            Some(ReplEffect::WaitFanIn { timeout: DEFAULT_TIMEOUT, targets: vec!["child-1".into()] })
        );
    }
}
