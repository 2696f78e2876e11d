// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! In-memory state for a single agent: its message history, marks, toolset
//! filter, and execution state. Persistence of the events that produced this
//! state (and of the effects of mutating it) is the caller's responsibility;
//! this module holds no database handle.
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use ikigai_model::{Message, ThinkingLevel};

/// Execution state of an agent, as a lock-free atomic so the REPL loop and a
/// background worker can both read it without contention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Idle,
    WaitingForLlm,
    ExecutingTool,
    Interrupted,
}

impl AgentState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => AgentState::Idle,
            1 => AgentState::WaitingForLlm,
            2 => AgentState::ExecutingTool,
            _ => AgentState::Interrupted,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            AgentState::Idle => 0,
            AgentState::WaitingForLlm => 1,
            AgentState::ExecutingTool => 2,
            AgentState::Interrupted => 3,
        }
    }
}

/// Atomic storage cell for `AgentState`.
#[derive(Debug)]
pub struct StateAtom(AtomicU8);

impl StateAtom {
    pub fn new(state: AgentState) -> Self {
        Self(AtomicU8::new(state.as_u8()))
    }

    pub fn get(&self) -> AgentState {
        AgentState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn set(&self, state: AgentState) {
        self.0.store(state.as_u8(), Ordering::SeqCst);
    }
}

impl Default for StateAtom {
    fn default() -> Self {
        Self::new(AgentState::Idle)
    }
}

/// A named checkpoint in the message history, recording how many messages
/// existed at the time the mark was pushed so `rewind_to` can restore it.
#[derive(Debug, Clone)]
pub struct Mark {
    pub label: Option<String>,
    pub message_count: usize,
}

/// In-memory session state for one agent in the tree.
pub struct AgentSession {
    pub uuid: String,
    pub parent_uuid: Option<String>,
    pub messages: Vec<Message>,
    pub marks: Vec<Mark>,
    pub toolset_filter: Vec<String>,
    pub model: String,
    pub provider: String,
    pub thinking_level: ThinkingLevel,
    pub state: StateAtom,
    /// Shared across every agent spawned from the same root process; set by
    /// the input parser on ESC, polled by whichever worker is driving this
    /// agent (§5/§9).
    pub interrupted: Arc<AtomicBool>,
}

impl AgentSession {
    pub fn new(uuid: String, parent_uuid: Option<String>, provider: String, model: String) -> Self {
        Self {
            uuid,
            parent_uuid,
            messages: Vec::new(),
            marks: Vec::new(),
            toolset_filter: Vec::new(),
            model,
            provider,
            thinking_level: ThinkingLevel::Min,
            state: StateAtom::default(),
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Drop every message without touching marks or the toolset filter — a
    /// `clear` never resets the toolset filter (spec §9).
    pub fn clear_messages(&mut self) {
        self.messages.clear();
        self.marks.clear();
    }

    /// Push a mark at the current message count, returning its stack index.
    pub fn push_mark(&mut self, label: Option<String>) -> usize {
        let message_count = self.messages.len();
        self.marks.push(Mark { label, message_count });
        self.marks.len() - 1
    }

    /// Truncate `messages` back to the message count recorded at `mark_index`,
    /// and drop every mark pushed after it. Returns the restored message
    /// count so the caller can persist a matching `rewind` event.
    pub fn rewind_to(&mut self, mark_index: usize) -> Option<usize> {
        let mark = self.marks.get(mark_index)?;
        let message_count = mark.message_count;
        self.messages.truncate(message_count);
        self.marks.truncate(mark_index + 1);
        Some(message_count)
    }

    /// Truncate directly to a message count, independent of any mark stack
    /// entry — used by the Replay Engine, which reads `message_count`
    /// straight out of a persisted `rewind` event's data.
    pub fn rewind_to_count(&mut self, message_count: usize) {
        self.messages.truncate(message_count);
        self.marks.retain(|m| m.message_count <= message_count);
    }

    pub fn set_model(&mut self, provider: String, model: String) {
        self.provider = provider;
        self.model = model;
    }

    pub fn set_toolset(&mut self, toolset_filter: Vec<String>) {
        self.toolset_filter = toolset_filter;
    }

    /// Append a user message and flip to `WaitingForLlm`. The caller drives
    /// the actual LLM round-trip; this only records the state transition.
    pub fn submit_input(&mut self, message: Message) {
        self.messages.push(message);
        self.state.set(AgentState::WaitingForLlm);
    }

    /// Build the in-memory state for a forked child: either a verbatim copy
    /// of this agent's messages, or just the given prompt as a single user
    /// message when one was supplied. The child shares this agent's
    /// `interrupted` flag and inherits its toolset filter. Persisting the
    /// paired `fork` events is the dispatcher's responsibility.
    pub fn fork_child(&self, child_uuid: String, prompt: Option<&str>) -> AgentSession {
        let messages = match prompt {
            Some(text) => vec![Message::user_text(text)],
            None => self.messages.clone(),
        };
        AgentSession {
            uuid: child_uuid,
            parent_uuid: Some(self.uuid.clone()),
            messages,
            marks: Vec::new(),
            toolset_filter: self.toolset_filter.clone(),
            model: self.model.clone(),
            provider: self.provider.clone(),
            thinking_level: self.thinking_level,
            state: StateAtom::default(),
            interrupted: Arc::clone(&self.interrupted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> AgentSession {
        AgentSession::new("root".into(), None, "mock".into(), "mock-model".into())
    }

    #[test]
    fn clear_preserves_toolset_filter() {
        let mut s = session();
        s.set_toolset(vec!["shell".into()]);
        s.add_message(Message::user_text("hi"));
        s.clear_messages();
        assert!(s.messages.is_empty());
        assert_eq!(s.toolset_filter, vec!["shell".to_string()]);
    }

    #[test]
    fn push_mark_and_rewind_restores_message_count() {
        let mut s = session();
        s.add_message(Message::user_text("one"));
        let idx = s.push_mark(Some("checkpoint".into()));
        s.add_message(Message::user_text("two"));
        s.add_message(Message::user_text("three"));
        assert_eq!(s.messages.len(), 3);

        let restored = s.rewind_to(idx).unwrap();
        assert_eq!(restored, 1);
        assert_eq!(s.messages.len(), 1);
        assert_eq!(s.marks.len(), 1);
    }

    #[test]
    fn rewind_to_unknown_mark_is_none() {
        let mut s = session();
        assert!(s.rewind_to(0).is_none());
    }

    #[test]
    fn fork_with_prompt_seeds_single_message() {
        let mut s = session();
        s.add_message(Message::user_text("one"));
        s.add_message(Message::assistant_text("two"));
        let child = s.fork_child("child".into(), Some("go do x"));
        assert_eq!(child.messages.len(), 1);
        assert_eq!(child.messages[0].text(), "go do x");
        assert_eq!(child.parent_uuid.as_deref(), Some("root"));
    }

    #[test]
    fn fork_without_prompt_copies_history() {
        let mut s = session();
        s.add_message(Message::user_text("one"));
        s.add_message(Message::assistant_text("two"));
        let child = s.fork_child("child".into(), None);
        assert_eq!(child.messages.len(), 2);
    }

    #[test]
    fn fork_shares_interrupted_flag() {
        let s = session();
        let child = s.fork_child("child".into(), None);
        s.interrupted.store(true, Ordering::SeqCst);
        assert!(child.interrupted.load(Ordering::SeqCst));
    }

    #[test]
    fn state_atom_round_trips() {
        let atom = StateAtom::default();
        assert_eq!(atom.get(), AgentState::Idle);
        atom.set(AgentState::ExecutingTool);
        assert_eq!(atom.get(), AgentState::ExecutingTool);
    }
}
