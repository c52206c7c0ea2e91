//! Debounce timers driven by tokio.
//!
//! A [`Debouncer`] owns one cancelable sleep and a generation counter. When the
//! sleep ends it posts a [`SessionMessage::Timer`] tagged with the generation
//! it was scheduled under; [`Debouncer::accept`] rejects firings that were
//! rescheduled or cancelled in the meantime.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::SessionMessage;
use super::action::TimerKind;
use crate::domain::Side;
use crate::infra::app_config::SyncConfig;

#[derive(Debug)]
pub struct Debouncer {
    kind: TimerKind,
    delay: Duration,
    generation: u64,
    handle: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<SessionMessage>,
}

impl Debouncer {
    pub fn new(kind: TimerKind, delay: Duration, tx: mpsc::UnboundedSender<SessionMessage>) -> Self {
        Self {
            kind,
            delay,
            generation: 0,
            handle: None,
            tx,
        }
    }

    /// (Re)starts the countdown. A pending firing is superseded.
    pub fn schedule(&mut self) {
        self.abort();
        self.generation += 1;
        let (kind, generation, delay) = (self.kind, self.generation, self.delay);
        let tx = self.tx.clone();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(SessionMessage::Timer { kind, generation });
        }));
    }

    pub fn cancel(&mut self) {
        self.generation += 1;
        self.abort();
    }

    /// Cancels the countdown and reports whether one was pending, so the
    /// caller can run the timer's work immediately.
    pub fn flush_now(&mut self) -> bool {
        let pending = self.is_pending();
        self.cancel();
        pending
    }

    pub fn is_pending(&self) -> bool {
        self.handle.is_some()
    }

    /// Claims a firing. Returns `false` for superseded generations.
    pub fn accept(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.handle.is_none() {
            return false;
        }
        self.handle = None;
        true
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Every timer of one session.
#[derive(Debug)]
pub struct Timers {
    commit: [Debouncer; 2],
    refresh: Debouncer,
    preview: Debouncer,
    deferred_retry: Debouncer,
}

impl Timers {
    pub fn new(config: &SyncConfig, tx: &mpsc::UnboundedSender<SessionMessage>) -> Self {
        let debouncer = |kind, delay| Debouncer::new(kind, delay, tx.clone());
        Self {
            commit: [
                debouncer(TimerKind::Commit(Side::Source), config.commit_debounce()),
                debouncer(TimerKind::Commit(Side::Target), config.commit_debounce()),
            ],
            refresh: debouncer(TimerKind::Refresh, config.refresh_debounce()),
            preview: debouncer(TimerKind::Preview, config.preview_debounce()),
            deferred_retry: debouncer(TimerKind::DeferredRetry, config.deferred_retry()),
        }
    }

    pub fn get_mut(&mut self, kind: TimerKind) -> &mut Debouncer {
        match kind {
            TimerKind::Commit(side) => &mut self.commit[side.index()],
            TimerKind::Refresh => &mut self.refresh,
            TimerKind::Preview => &mut self.preview,
            TimerKind::DeferredRetry => &mut self.deferred_retry,
        }
    }

    pub fn is_pending(&self, kind: TimerKind) -> bool {
        match kind {
            TimerKind::Commit(side) => self.commit[side.index()].is_pending(),
            TimerKind::Refresh => self.refresh.is_pending(),
            TimerKind::Preview => self.preview.is_pending(),
            TimerKind::DeferredRetry => self.deferred_retry.is_pending(),
        }
    }

    pub fn cancel_all(&mut self) {
        for debouncer in self.commit.iter_mut() {
            debouncer.cancel();
        }
        self.refresh.cancel();
        self.preview.cancel();
        self.deferred_retry.cancel();
    }
}
