// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Command registry: central store for all registered slash commands.

use std::collections::HashMap;
use std::sync::Arc;

use super::SlashCommand;

/// Central registry of all available slash commands.
///
/// Commands are stored as `Arc<dyn SlashCommand>` so they can be shared
/// without cloning.
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn SlashCommand>>,
}

impl CommandRegistry {
    pub fn empty() -> Self {
        Self { commands: HashMap::new() }
    }

    /// A registry pre-populated with every built-in command from spec §4.7.
    pub fn with_builtins() -> Self {
        use super::builtin;
        let mut reg = Self::empty();
        reg.register(Arc::new(builtin::fork::ForkCommand));
        reg.register(Arc::new(builtin::kill::KillCommand));
        reg.register(Arc::new(builtin::reap::ReapCommand));
        reg.register(Arc::new(builtin::send::SendCommand));
        reg.register(Arc::new(builtin::wait::WaitCommand));
        reg.register(Arc::new(builtin::mark::MarkCommand));
        reg.register(Arc::new(builtin::rewind::RewindCommand));
        reg.register(Arc::new(builtin::toolset::ToolsetCommand));
        reg.register(Arc::new(builtin::agents::AgentsCommand));
        reg.register(Arc::new(builtin::help::HelpCommand));
        reg.register(Arc::new(builtin::filter_mail::FilterMailCommand));
        reg.register(Arc::new(builtin::system::SystemCommand));
        reg.register(Arc::new(builtin::model::ModelCommand));
        reg.register(Arc::new(builtin::clear::ClearCommand));
        reg.register(Arc::new(builtin::exit::ExitCommand));
        reg
    }

    /// Register a command, replacing any existing command with the same name.
    pub fn register(&mut self, cmd: Arc<dyn SlashCommand>) {
        self.commands.insert(cmd.name().to_string(), cmd);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SlashCommand>> {
        self.commands.get(name).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = Arc<dyn SlashCommand>> + '_ {
        self.commands.values().cloned()
    }

    /// Sorted list of every registered command name, used by `/help` and
    /// tab completion.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_builtins_registers_every_spec_command() {
        let reg = CommandRegistry::with_builtins();
        for name in [
            "fork", "kill", "reap", "send", "wait", "mark", "rewind", "toolset", "agents",
            "help", "filter-mail", "system", "model", "clear", "exit",
        ] {
            assert!(reg.get(name).is_some(), "{name} must be registered");
        }
    }

    #[test]
    fn register_replaces_existing_command() {
        use super::super::{CommandContext, CommandResult};

        struct DummyCmd;
        impl SlashCommand for DummyCmd {
            fn name(&self) -> &str {
                "clear"
            }
            fn description(&self) -> &str {
                "dummy"
            }
            fn execute(&self, _: Vec<String>, _: &CommandContext) -> CommandResult {
                CommandResult::default()
            }
        }

        let mut reg = CommandRegistry::with_builtins();
        reg.register(Arc::new(DummyCmd));
        let cmd = reg.get("clear").unwrap();
        assert_eq!(cmd.description(), "dummy");
    }

    #[test]
    fn names_returns_sorted_list() {
        let reg = CommandRegistry::with_builtins();
        let names = reg.names();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }
}
