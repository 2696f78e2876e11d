// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Agent session state, the replay engine that rebuilds it from the event
//! log, and the wait coordinator agents block on for mail.
mod agent_session;
mod error;
mod replay;
mod wait;

pub use agent_session::{AgentSession, AgentState, Mark, StateAtom};
pub use error::{CoreError, CoreResult};
pub use replay::{build_plan, replay, restore_toolset, PlanStep};
pub use wait::{fanin, next, EntryStatus, FanInEntry, FanInResult, WaitResult};
