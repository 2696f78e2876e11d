// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Reactive waits over the mailbox and agent registry: a single agent
//! blocking for its next message (`next`), and a supervisor blocking for
//! the first of several targets to answer, go idle, or die (`fanin`).
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use ikigai_store::{AgentStatus, Store};

use crate::error::CoreResult;

/// How often a wait re-checks the interrupt flag and deadline between
/// notification wakeups, so a stalled broadcast channel can't wedge a wait
/// past its timeout.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitResult {
    Received { from: String, body: String },
    Timeout,
    Interrupted,
}

/// Block until a message addressed to `me` arrives, `timeout` elapses, or
/// `interrupted` is set. Mailbox delivery races a periodic wakeup so an
/// interrupt set while idle is noticed within one poll interval.
pub async fn next(store: &Store, timeout: Duration, me: &str, interrupted: &AtomicBool) -> CoreResult<WaitResult> {
    let deadline = Instant::now() + timeout;
    let mut sub = store.mailbox.notify_hub().listen();
    let channel = format!("mail:{me}");

    loop {
        if interrupted.load(Ordering::SeqCst) {
            return Ok(WaitResult::Interrupted);
        }
        if let Some(mail) = store.mailbox.consume_next(me).await? {
            return Ok(WaitResult::Received { from: mail.from_uuid, body: mail.body });
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(WaitResult::Timeout);
        }
        let wait = (deadline - now).min(POLL_INTERVAL);
        sub.recv_on_timeout(&channel, wait).await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    Pending,
    Received { body: String },
    Idle,
    Dead,
    Timeout,
}

#[derive(Debug, Clone)]
pub struct FanInEntry {
    pub agent_name: String,
    pub status: EntryStatus,
}

#[derive(Debug, Clone)]
pub struct FanInResult {
    pub entries: Vec<(String, FanInEntry)>,
    pub interrupted: bool,
}

/// Block until every target in `targets` has either answered `me`, gone
/// idle, died, or `timeout` elapses, or `interrupted` is set. All targets
/// deliver on the same `mail:<me>` channel regardless of sender, so one
/// subscription wakes the fan-in for any of them.
pub async fn fanin(
    store: &Store,
    timeout: Duration,
    me: &str,
    targets: &[String],
    interrupted: &AtomicBool,
) -> CoreResult<FanInResult> {
    let mut entries = Vec::with_capacity(targets.len());
    for uuid in targets {
        let agent_name = store
            .registry
            .get(uuid)
            .await?
            .and_then(|row| row.name)
            .unwrap_or_else(|| "undefined".to_string());
        entries.push((uuid.clone(), FanInEntry { agent_name, status: EntryStatus::Pending }));
    }

    let deadline = Instant::now() + timeout;
    let mut sub = store.mailbox.notify_hub().listen();
    let channel = format!("mail:{me}");
    let mut was_interrupted = false;

    loop {
        if interrupted.load(Ordering::SeqCst) {
            was_interrupted = true;
            break;
        }

        let mut all_resolved = true;
        for (uuid, entry) in entries.iter_mut() {
            if entry.status != EntryStatus::Pending {
                continue;
            }
            if let Some(mail) = store.mailbox.consume_from(me, uuid).await? {
                entry.status = EntryStatus::Received { body: mail.body };
                continue;
            }
            match store.registry.get(uuid).await? {
                Some(row) if row.status == AgentStatus::Dead => entry.status = EntryStatus::Dead,
                Some(row) if row.idle => entry.status = EntryStatus::Idle,
                _ => all_resolved = false,
            }
        }
        if all_resolved {
            break;
        }

        let now = Instant::now();
        if now >= deadline {
            for (_, entry) in entries.iter_mut() {
                if entry.status == EntryStatus::Pending {
                    entry.status = EntryStatus::Timeout;
                }
            }
            break;
        }
        let wait = (deadline - now).min(POLL_INTERVAL);
        sub.recv_on_timeout(&channel, wait).await;
    }

    Ok(FanInResult { entries, interrupted: was_interrupted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ikigai_store::{AgentRow, AgentStatus as Status};
    use std::sync::Arc;

    async fn registered_agent(store: &Store, uuid: &str, name: Option<&str>, idle: bool, status: Status) {
        store
            .registry
            .insert(&AgentRow {
                uuid: uuid.to_string(),
                name: name.map(str::to_string),
                parent_uuid: None,
                created_at: 0,
                fork_message_id: 0,
                status,
                ended_at: None,
                idle,
                session_id: 1,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn scenario_c_next_receives_pending_mail_immediately() {
        let store = ikigai_store::connect_test_store().await.unwrap();
        registered_agent(&store, "a", None, false, Status::Running).await;
        registered_agent(&store, "b", None, false, Status::Running).await;
        store.mailbox.send(&store.registry, 1, "b", "a", "hello", 0).await.unwrap();

        let interrupted = AtomicBool::new(false);
        let result = next(&store, Duration::from_secs(1), "a", &interrupted).await.unwrap();
        assert_eq!(result, WaitResult::Received { from: "b".to_string(), body: "hello".to_string() });
    }

    #[tokio::test]
    async fn next_times_out_with_no_mail() {
        let store = ikigai_store::connect_test_store().await.unwrap();
        registered_agent(&store, "a", None, false, Status::Running).await;
        let interrupted = AtomicBool::new(false);
        let result = next(&store, Duration::from_millis(50), "a", &interrupted).await.unwrap();
        assert_eq!(result, WaitResult::Timeout);
    }

    #[tokio::test]
    async fn next_reports_interrupted() {
        let store = ikigai_store::connect_test_store().await.unwrap();
        registered_agent(&store, "a", None, false, Status::Running).await;
        let interrupted = AtomicBool::new(true);
        let result = next(&store, Duration::from_secs(5), "a", &interrupted).await.unwrap();
        assert_eq!(result, WaitResult::Interrupted);
    }

    #[tokio::test]
    async fn next_wakes_on_late_arriving_mail() {
        let store = Arc::new(ikigai_store::connect_test_store().await.unwrap());
        registered_agent(&store, "a", None, false, Status::Running).await;
        registered_agent(&store, "b", None, false, Status::Running).await;

        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let interrupted = AtomicBool::new(false);
                next(&store, Duration::from_secs(2), "a", &interrupted).await.unwrap()
            })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        store.mailbox.send(&store.registry, 1, "b", "a", "late", 0).await.unwrap();

        let result = waiter.await.unwrap();
        assert_eq!(result, WaitResult::Received { from: "b".to_string(), body: "late".to_string() });
    }

    #[tokio::test]
    async fn scenario_d_fanin_resolves_mixed_outcomes() {
        let store = ikigai_store::connect_test_store().await.unwrap();
        registered_agent(&store, "me", None, false, Status::Running).await;
        registered_agent(&store, "worker1", Some("worker-one"), false, Status::Running).await;
        registered_agent(&store, "worker2", None, true, Status::Running).await;
        registered_agent(&store, "worker3", None, false, Status::Dead).await;
        store.mailbox.send(&store.registry, 1, "worker1", "me", "done", 0).await.unwrap();

        let interrupted = AtomicBool::new(false);
        let targets = vec!["worker1".to_string(), "worker2".to_string(), "worker3".to_string()];
        let result = fanin(&store, Duration::from_secs(1), "me", &targets, &interrupted).await.unwrap();

        assert!(!result.interrupted);
        let by_uuid: std::collections::HashMap<_, _> = result.entries.into_iter().collect();
        assert_eq!(by_uuid["worker1"].status, EntryStatus::Received { body: "done".to_string() });
        assert_eq!(by_uuid["worker1"].agent_name, "worker-one");
        assert_eq!(by_uuid["worker2"].status, EntryStatus::Idle);
        assert_eq!(by_uuid["worker2"].agent_name, "undefined");
        assert_eq!(by_uuid["worker3"].status, EntryStatus::Dead);
    }

    #[tokio::test]
    async fn fanin_times_out_pending_targets() {
        let store = ikigai_store::connect_test_store().await.unwrap();
        registered_agent(&store, "me", None, false, Status::Running).await;
        registered_agent(&store, "worker1", None, false, Status::Running).await;

        let interrupted = AtomicBool::new(false);
        let targets = vec!["worker1".to_string()];
        let result = fanin(&store, Duration::from_millis(50), "me", &targets, &interrupted).await.unwrap();
        assert_eq!(result.entries[0].1.status, EntryStatus::Timeout);
    }
}
