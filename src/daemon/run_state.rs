// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Cooperative cancellation shared by the bridge tasks
//!
//! A `RunState` starts running and is switched off exactly once. Loops poll
//! [`RunState::is_running`] every cycle and race their blocking points
//! against [`RunState::stopped`] so a stalled socket never delays shutdown.

use log::info;
use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable cancellation token
#[derive(Clone)]
pub struct RunState {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    /// Create a token in the running state
    pub fn new() -> Self {
        let (sender, _) = watch::channel(true);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn is_running(&self) -> bool {
        *self.sender.borrow()
    }

    /// Switch to stopped. Returns `true` only for the call that did it.
    pub fn request_shutdown(&self, reason: &str) -> bool {
        let changed = self.sender.send_if_modified(|running| {
            let was_running = *running;
            *running = false;
            was_running
        });
        if changed {
            info!("Shutdown requested: {}", reason);
        }
        changed
    }

    /// Resolve once shutdown has been requested
    pub async fn stopped(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = receiver.wait_for(|running| !*running).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_shutdown_happens_once() {
        let state = RunState::new();
        assert!(state.is_running());
        assert!(state.request_shutdown("test"));
        assert!(!state.request_shutdown("again"));
        assert!(!state.is_running());
    }

    #[tokio::test]
    async fn test_stopped_wakes_waiters() {
        let state = RunState::new();
        let waiter = {
            let state = state.clone();
            tokio::spawn(async move { state.stopped().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        state.request_shutdown("test");
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter must wake")
            .unwrap();
    }

    #[tokio::test]
    async fn test_stopped_returns_immediately_when_already_stopped() {
        let state = RunState::new();
        state.request_shutdown("test");
        tokio::time::timeout(Duration::from_millis(100), state.stopped())
            .await
            .expect("already stopped");
    }
}
