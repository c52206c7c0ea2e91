//! State transitions of a diff session.
//!
//! `reduce` never performs I/O: it updates [`SessionState`] and returns the
//! commands the runtime has to execute.

pub mod editor;
pub mod panel;
pub mod sync;

use log::debug;
use tokio::time::Instant;

use super::action::{Action, TimerKind};
use super::command::Command;
use super::state::{DeferredResult, ResultOrigin, SessionState, ViewEffect};
use crate::domain::{AlignedDiffResult, Side};
use crate::infra::bus::SessionSignal;

pub fn reduce(state: &mut SessionState, action: Action, now: Instant) -> Vec<Command> {
    if state.disposed {
        debug!(target: "sync", "session {} disposed, ignoring {:?}", state.tab_id, action);
        return Vec::new();
    }
    match action {
        Action::Editor(action) => editor::reduce(state, action, now),
        Action::Panel(action) => panel::reduce(state, action),
        Action::TimerElapsed(kind) => on_timer(state, kind, now),
        Action::Signal(signal) => on_signal(state, signal),
        Action::Async(action) => sync::reduce(state, action, now),
        Action::Close => close(state),
    }
}

fn on_timer(state: &mut SessionState, kind: TimerKind, now: Instant) -> Vec<Command> {
    match kind {
        TimerKind::Commit(side) => {
            state.panel_mut(side).commit.scheduled = false;
            sync::begin_commit(state, side)
        }
        TimerKind::Refresh => sync::begin_refresh(state),
        TimerKind::Preview => sync::begin_preview(state),
        TimerKind::DeferredRetry => retry_deferred(state, now),
    }
}

fn on_signal(state: &mut SessionState, signal: SessionSignal) -> Vec<Command> {
    match signal {
        SessionSignal::DocumentChanged { document_id } => {
            if Side::BOTH
                .iter()
                .any(|side| *state.document_id(*side) == document_id)
            {
                vec![Command::Schedule(TimerKind::Refresh)]
            } else {
                Vec::new()
            }
        }
        SessionSignal::HistoryActionRequested {
            tab_id,
            side,
            action,
        } => {
            if tab_id == state.tab_id {
                panel::request_history(state, side, action)
            } else {
                Vec::new()
            }
        }
    }
}

fn close(state: &mut SessionState) -> Vec<Command> {
    state.disposed = true;
    state.deferred = None;
    state.queued_copies.clear();
    state.preserver.clear();
    for side in Side::BOTH {
        state.pairs[side.index()].clear();
    }
    vec![
        Command::Cancel(TimerKind::Commit(Side::Source)),
        Command::Cancel(TimerKind::Commit(Side::Target)),
        Command::Cancel(TimerKind::Refresh),
        Command::Cancel(TimerKind::Preview),
        Command::Cancel(TimerKind::DeferredRetry),
    ]
}

/// A result waits while the user is typing, while a pane still has an
/// uncommitted edit, and (for refreshes) while a commit is in flight that
/// will bring a newer alignment anyway.
fn should_hold(state: &SessionState, origin: ResultOrigin, now: Instant) -> bool {
    if state.is_actively_editing(now) {
        return true;
    }
    let uncommitted = state
        .panels
        .iter()
        .any(|panel| panel.commit.scheduled || panel.commit.replay);
    let committing = state.panels.iter().any(|panel| panel.commit.in_flight);
    uncommitted || (matches!(origin, ResultOrigin::Refresh(_)) && committing)
}

/// Applies an authoritative alignment now or parks it for a retry.
pub(crate) fn gate(
    state: &mut SessionState,
    origin: ResultOrigin,
    result: AlignedDiffResult,
    now: Instant,
) -> Vec<Command> {
    if should_hold(state, origin, now) {
        debug!(target: "sync", "holding {:?} result while editing", origin);
        state.deferred = Some(DeferredResult { origin, result });
        return vec![Command::Schedule(TimerKind::DeferredRetry)];
    }
    apply_authoritative(state, result)
}

/// Re-gates the parked result, dropping it if a newer call was issued since.
pub(crate) fn retry_deferred(state: &mut SessionState, now: Instant) -> Vec<Command> {
    let Some(deferred) = state.deferred.take() else {
        return Vec::new();
    };
    if !state.is_current(deferred.origin) {
        debug!(target: "sync", "dropping stale deferred {:?} result", deferred.origin);
        return Vec::new();
    }
    gate(state, deferred.origin, deferred.result, now)
}

/// Replaces the model wholesale, carrying caret and scroll across, and
/// re-derives everything keyed on rows.
pub(crate) fn apply_authoritative(
    state: &mut SessionState,
    result: AlignedDiffResult,
) -> Vec<Command> {
    let scroll = state.scroll.offsets();
    state
        .preserver
        .capture(state.store.current(), state.focus, state.caret, scroll);
    state.store.replace(result);
    state.deferred = None;
    state.metadata_stale = false;
    state.seq.preview += 1;

    for side in Side::BOTH {
        let (line_count, text) = {
            let model = state.store.current();
            (model.line_count(side), model.side_text(side))
        };
        let panel = state.panel_mut(side);
        panel.line_count = line_count;
        if !panel.commit.in_flight {
            panel.last_committed = Some(text);
        }
    }

    state.effects.push(ViewEffect::ModelReplaced);
    if let Some(scroll) = state.preserver.take_scroll() {
        state.scroll.restore(scroll);
        state.effects.push(ViewEffect::RestoreScroll(scroll));
    }
    restore_caret(state);

    let mut commands = vec![
        Command::Cancel(TimerKind::Preview),
        Command::Cancel(TimerKind::DeferredRetry),
    ];
    for side in Side::BOTH {
        if state.search[side.index()].is_active() {
            commands.push(editor::issue_search(state, side));
        }
    }
    if let Some(caret) = state.caret {
        commands.extend(editor::lookup_pair(state, caret));
    }
    commands
}

/// Emits the pending caret restore and moves the tracked caret with it.
pub(crate) fn restore_caret(state: &mut SessionState) {
    let Some(restore) = state.preserver.take_caret(state.store.current()) else {
        return;
    };
    if let Some(caret) = state.caret.as_mut()
        && caret.side == restore.side
    {
        caret.row_index = restore.row_index;
    }
    state.effects.push(ViewEffect::RestoreCaret(restore));
}
