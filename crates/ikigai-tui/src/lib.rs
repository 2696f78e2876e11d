// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The REPL Core: slash-command registry, scrollback, and the input
//! surface. Terminal rendering and key-event parsing are out of scope —
//! this crate owns the data and dispatch decisions a renderer reads from.
mod commands;
mod input_surface;
mod scrollback;

pub use commands::builtin;
pub use commands::{
    CommandArgument, CommandContext, CommandRegistry, CommandResult, CompletionItem, ParsedCommand,
    ReplEffect, SlashCommand,
};
pub use input_surface::InputBuffer;
pub use scrollback::Scrollback;
