//! One diff tab's sync engine.
//!
//! A [`DiffSession`] owns the aligned model of two panes and keeps it in step
//! with the backing documents: edits are echoed locally, committed after a
//! debounce, and replaced by the service's authoritative alignment when the
//! user is not typing. View input goes in through [`DiffSession::dispatch`];
//! service results and timers arrive on an internal channel that the owner
//! drains with [`DiffSession::poll_messages`] or [`DiffSession::run_until_idle`].

pub mod action;
pub mod command;
pub mod reducer;
pub mod runtime;
pub mod state;
pub mod store;
pub mod timer;

#[cfg(test)]
mod tests;

use log::{debug, info, warn};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub use action::{Action, AsyncAction, EditorAction, PanelAction, TimerKind};
pub use command::{Command, PanelOp, PanelOpOutcome};
pub use state::{PanelState, SessionState, ViewEffect};
pub use store::AlignedStore;

use crate::application::pair::PairHighlight;
use crate::application::search::{Direction, SearchNavigator, step_from_anchor};
use crate::domain::{AlignedDiffResult, DocumentId, RawAlignedDiff, Side, TabId, normalize};
use crate::infra::app_config::SyncConfig;
use crate::infra::bus::{SessionBus, SessionSignal};
use crate::infra::services::Services;
use timer::Timers;

/// What a tab opens with.
#[derive(Debug, Clone)]
pub enum InitialPayload {
    /// An alignment the host already computed.
    Precomputed(RawAlignedDiff),
    /// Plain texts, paired line by line until the first refresh.
    Texts { source: String, target: String },
}

impl InitialPayload {
    fn into_model(self) -> AlignedDiffResult {
        match self {
            InitialPayload::Precomputed(raw) => normalize(raw),
            InitialPayload::Texts { source, target } => {
                AlignedDiffResult::naive_pairing(&source, &target)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub tab_id: TabId,
    pub source_id: DocumentId,
    pub target_id: DocumentId,
    pub initial: InitialPayload,
    pub config: SyncConfig,
}

#[derive(Debug)]
pub enum SessionMessage {
    Action(Action),
    Timer { kind: TimerKind, generation: u64 },
}

pub struct DiffSession {
    state: SessionState,
    services: Services,
    timers: Timers,
    tx: mpsc::UnboundedSender<SessionMessage>,
    rx: mpsc::UnboundedReceiver<SessionMessage>,
    shutdown: CancellationToken,
}

impl DiffSession {
    /// Opens a session and starts forwarding `bus` signals into it. Must be
    /// called inside a tokio runtime.
    pub fn open(options: SessionOptions, services: Services, bus: &SessionBus) -> Self {
        for warning in options.config.validate() {
            warn!(target: "sync", "{}", warning);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let timers = Timers::new(&options.config, &tx);
        let shutdown = CancellationToken::new();
        spawn_signal_forwarder(
            bus.subscribe(),
            tx.clone(),
            shutdown.clone(),
            options.source_id.clone(),
        );

        info!(
            target: "sync",
            "opening session {} ({} <-> {})",
            options.tab_id, options.source_id, options.target_id
        );
        let state = SessionState::new(
            options.tab_id,
            options.source_id,
            options.target_id,
            options.initial.into_model(),
            options.config,
        );
        Self {
            state,
            services,
            timers,
            tx,
            rx,
            shutdown,
        }
    }

    pub fn dispatch(&mut self, action: Action) {
        let commands = reducer::reduce(&mut self.state, action, Instant::now());
        for command in commands {
            runtime::run(self, command);
        }
    }

    pub fn dispatch_editor(&mut self, action: EditorAction) {
        self.dispatch(Action::Editor(action));
    }

    pub fn dispatch_panel(&mut self, action: PanelAction) {
        self.dispatch(Action::Panel(action));
    }

    /// Handles every message already waiting. Returns how many there were.
    pub fn poll_messages(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.rx.try_recv() {
            self.handle_message(message);
            handled += 1;
        }
        handled
    }

    /// Waits for and handles the next message.
    pub async fn next_message(&mut self) {
        if let Some(message) = self.rx.recv().await {
            self.handle_message(message);
        }
    }

    /// Handles messages until none arrives for `quiet`.
    pub async fn run_until_idle(&mut self, quiet: Duration) {
        loop {
            let message = tokio::select! {
                message = self.rx.recv() => message,
                _ = tokio::time::sleep(quiet) => None,
            };
            match message {
                Some(message) => self.handle_message(message),
                None => break,
            }
        }
    }

    fn handle_message(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::Action(action) => self.dispatch(action),
            SessionMessage::Timer { kind, generation } => {
                if self.timers.get_mut(kind).accept(generation) {
                    self.dispatch(Action::TimerElapsed(kind));
                } else {
                    debug!(target: "sync", "ignoring superseded {:?} timer", kind);
                }
            }
        }
    }

    /// Cancels every timer and stops listening to the bus. Results still in
    /// flight are dropped when they arrive.
    pub fn close(&mut self) {
        if self.state.disposed {
            return;
        }
        info!(target: "sync", "closing session {}", self.state.tab_id);
        self.dispatch(Action::Close);
        self.timers.cancel_all();
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.state.disposed
    }

    pub fn tab_id(&self) -> &TabId {
        &self.state.tab_id
    }

    pub fn model(&self) -> &AlignedDiffResult {
        self.state.model()
    }

    /// Revision counter bumped on every model change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.state.store.subscribe()
    }

    pub fn panel(&self, side: Side) -> &PanelState {
        self.state.panel(side)
    }

    pub fn is_metadata_stale(&self) -> bool {
        self.state.metadata_stale
    }

    pub fn has_deferred_result(&self) -> bool {
        self.state.deferred.is_some()
    }

    pub fn take_effects(&mut self) -> Vec<ViewEffect> {
        std::mem::take(&mut self.state.effects)
    }

    pub fn search(&self, side: Side) -> &SearchNavigator {
        &self.state.search[side.index()]
    }

    pub fn pair_highlights(&self, side: Side) -> &[PairHighlight] {
        self.state.pairs[side.index()].highlights()
    }

    /// Cycles through the pane's search matches.
    pub fn step_match(&mut self, side: Side, direction: Direction) -> Option<usize> {
        self.state.search[side.index()].step(direction)
    }

    pub fn next_match(&mut self, side: Side) -> Option<usize> {
        self.step_match(side, Direction::Next)
    }

    pub fn prev_match(&mut self, side: Side) -> Option<usize> {
        self.step_match(side, Direction::Prev)
    }

    /// Finds the next diff row relative to the caret. Without a caret the
    /// first (or last) diff row is returned.
    pub fn step_diff_row(&self, direction: Direction) -> Option<usize> {
        let rows = &self.state.model().diff_row_indexes;
        match self.state.caret {
            Some(caret) => step_from_anchor(rows, caret.row_index, direction),
            None => match direction {
                Direction::Next => rows.first().copied(),
                Direction::Prev => rows.last().copied(),
            },
        }
    }

    pub fn next_diff_row(&self) -> Option<usize> {
        self.step_diff_row(Direction::Next)
    }

    pub fn prev_diff_row(&self) -> Option<usize> {
        self.step_diff_row(Direction::Prev)
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &SessionState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn timer_pending(&self, kind: TimerKind) -> bool {
        self.timers.is_pending(kind)
    }
}

impl Drop for DiffSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn spawn_signal_forwarder(
    mut signals: broadcast::Receiver<SessionSignal>,
    tx: mpsc::UnboundedSender<SessionMessage>,
    shutdown: CancellationToken,
    source_id: DocumentId,
) {
    tokio::spawn(async move {
        loop {
            let signal = tokio::select! {
                _ = shutdown.cancelled() => break,
                signal = signals.recv() => signal,
            };
            let signal = match signal {
                Ok(signal) => signal,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(target: "bus", "missed {} signals, forcing a refresh", missed);
                    SessionSignal::DocumentChanged {
                        document_id: source_id.clone(),
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if tx.send(SessionMessage::Action(Action::Signal(signal))).is_err() {
                break;
            }
        }
        debug!(target: "bus", "signal forwarder stopped");
    });
}
