// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Interface to per-tool executables.
//!
//! Concrete tool executables are external collaborators: each is a
//! standalone program under `<libexec_dir>/tools/` spawned as a child
//! process and driven over a single-shot JSON request/response contract on
//! its stdin/stdout. This crate owns only the contract, the catalog of
//! discovered tools, and the approval-policy gate — not any tool bodies.
pub mod catalog;
pub mod contract;
pub mod policy;
pub mod process;

pub use catalog::{ToolCatalog, ToolSchema};
pub use contract::{ToolInvocationRequest, ToolInvocationResponse};
pub use policy::{ApprovalPolicy, ToolPolicy};
pub use process::ToolProcess;
