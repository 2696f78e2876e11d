// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The store's wake-up channel.
//!
//! Concurrent edits across multiple client processes against the same
//! session are a stated non-goal, so this hub delivers notifications
//! in-process only: a `tokio::sync::broadcast` fanning (channel, payload)
//! pairs out to every live subscription. A genuine multi-process deployment
//! would swap this for `LISTEN`/`NOTIFY` on the Postgres connection without
//! changing any caller.

use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct Notification {
    pub channel: String,
    pub payload: String,
}

#[derive(Clone)]
pub struct NotifyHub {
    sender: broadcast::Sender<Notification>,
}

impl NotifyHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Broadcast a payload on `channel`. Never fails: with no subscribers
    /// the notification is simply dropped, matching Postgres `NOTIFY`
    /// semantics when nobody is listening.
    pub fn notify(&self, channel: impl Into<String>, payload: impl Into<String>) {
        let _ = self.sender.send(Notification { channel: channel.into(), payload: payload.into() });
    }

    /// Subscribe to all notifications; callers filter by `channel`
    /// themselves, mirroring a Postgres `LISTEN` on one channel name.
    pub fn listen(&self) -> Subscription {
        Subscription { receiver: self.sender.subscribe() }
    }
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

/// A live subscription returned by `listen()`.
pub struct Subscription {
    receiver: broadcast::Receiver<Notification>,
}

impl Subscription {
    /// Wait for the next notification on `channel`, skipping any others.
    /// Returns `None` if the hub itself was dropped.
    pub async fn recv_on(&mut self, channel: &str) -> Option<Notification> {
        loop {
            match self.receiver.recv().await {
                Ok(n) if n.channel == channel => return Some(n),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Wait up to `timeout` for the next notification on `channel`.
    pub async fn recv_on_timeout(
        &mut self,
        channel: &str,
        timeout: std::time::Duration,
    ) -> Option<Notification> {
        tokio::time::timeout(timeout, self.recv_on(channel)).await.ok().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn subscriber_receives_matching_channel_only() {
        let hub = NotifyHub::new();
        let mut sub = hub.listen();
        hub.notify("mail:other", "1");
        hub.notify("mail:abc", "42");

        let n = sub.recv_on("mail:abc").await.unwrap();
        assert_eq!(n.payload, "42");
    }

    #[tokio::test]
    async fn recv_times_out_with_no_notification() {
        let hub = NotifyHub::new();
        let mut sub = hub.listen();
        let n = sub.recv_on_timeout("mail:abc", Duration::from_millis(50)).await;
        assert!(n.is_none());
    }

    #[tokio::test]
    async fn notify_with_no_subscribers_does_not_panic() {
        let hub = NotifyHub::new();
        hub.notify("mail:abc", "1");
    }

    #[tokio::test]
    async fn multiple_subscribers_all_see_notification() {
        let hub = NotifyHub::new();
        let mut a = hub.listen();
        let mut b = hub.listen();
        hub.notify("agent_lifecycle:x", "dead");
        assert_eq!(a.recv_on("agent_lifecycle:x").await.unwrap().payload, "dead");
        assert_eq!(b.recv_on("agent_lifecycle:x").await.unwrap().payload, "dead");
    }
}
