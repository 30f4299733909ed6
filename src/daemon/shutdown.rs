// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Cooperative shutdown
//!
//! Signals never touch the sensor session. They only record the requested
//! [`ShutdownMode`] in a [`ShutdownFlag`]; the sampling loop checks it
//! between cycles and its inter-cycle sleep wakes up as soon as a request
//! arrives. A hard request overrides a graceful one, never the reverse.

use anyhow::Result;
use log::info;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::scd30::ShutdownMode;

const NOT_REQUESTED: u8 = 0;
const GRACEFUL: u8 = 1;
const HARD: u8 = 2;

/// Shared shutdown request
#[derive(Debug, Default)]
pub struct ShutdownFlag {
    mode: AtomicU8,
    notify: Notify,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a shutdown request and wake the waiters
    pub fn request(&self, mode: ShutdownMode) {
        let value = match mode {
            ShutdownMode::Graceful => GRACEFUL,
            ShutdownMode::Hard => HARD,
        };
        self.mode.fetch_max(value, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Mode requested so far, if any
    pub fn requested(&self) -> Option<ShutdownMode> {
        match self.mode.load(Ordering::SeqCst) {
            NOT_REQUESTED => None,
            GRACEFUL => Some(ShutdownMode::Graceful),
            _ => Some(ShutdownMode::Hard),
        }
    }

    pub fn is_requested(&self) -> bool {
        self.requested().is_some()
    }

    /// Wait until a shutdown is requested
    pub async fn wait(&self) -> ShutdownMode {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a request in between is not missed
            notified.as_mut().enable();
            if let Some(mode) = self.requested() {
                return mode;
            }
            notified.await;
        }
    }

    /// Sleep for `duration` unless a shutdown is requested first.
    ///
    /// Returns true when the sleep was cut short by a request.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => self.is_requested(),
            _ = self.wait() => true,
        }
    }
}

/// Translate process signals into shutdown requests.
///
/// SIGINT and SIGTERM ask for a graceful shutdown, SIGQUIT for a hard one.
#[cfg(unix)]
pub fn spawn_signal_listener(flag: Arc<ShutdownFlag>) -> Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    Ok(tokio::spawn(async move {
        loop {
            let (name, mode) = tokio::select! {
                Some(()) = interrupt.recv() => ("SIGINT", ShutdownMode::Graceful),
                Some(()) = terminate.recv() => ("SIGTERM", ShutdownMode::Graceful),
                Some(()) = quit.recv() => ("SIGQUIT", ShutdownMode::Hard),
                else => break,
            };
            info!("Received {}, requesting {:?} shutdown", name, mode);
            flag.request(mode);
        }
    }))
}

/// Translate Ctrl-C into a graceful shutdown request
#[cfg(not(unix))]
pub fn spawn_signal_listener(flag: Arc<ShutdownFlag>) -> Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, requesting graceful shutdown");
            flag.request(ShutdownMode::Graceful);
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hard_overrides_graceful() {
        let flag = ShutdownFlag::new();
        assert_eq!(flag.requested(), None);
        flag.request(ShutdownMode::Graceful);
        assert_eq!(flag.requested(), Some(ShutdownMode::Graceful));
        flag.request(ShutdownMode::Hard);
        assert_eq!(flag.requested(), Some(ShutdownMode::Hard));
        flag.request(ShutdownMode::Graceful);
        assert_eq!(flag.requested(), Some(ShutdownMode::Hard));
    }

    #[tokio::test]
    async fn test_request_interrupts_sleep() {
        let flag = Arc::new(ShutdownFlag::new());
        let sleeper = {
            let flag = Arc::clone(&flag);
            tokio::spawn(async move { flag.sleep(Duration::from_secs(3600)).await })
        };
        tokio::task::yield_now().await;
        flag.request(ShutdownMode::Graceful);
        let interrupted = tokio::time::timeout(Duration::from_secs(5), sleeper)
            .await
            .unwrap()
            .unwrap();
        assert!(interrupted);
    }

    #[tokio::test]
    async fn test_sleep_completes_without_request() {
        let flag = ShutdownFlag::new();
        assert!(!flag.sleep(Duration::from_millis(5)).await);
    }

    #[tokio::test]
    async fn test_wait_returns_pending_request() {
        let flag = ShutdownFlag::new();
        flag.request(ShutdownMode::Hard);
        assert_eq!(flag.wait().await, ShutdownMode::Hard);
    }
}
