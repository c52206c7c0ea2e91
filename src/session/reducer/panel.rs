//! Pane-level operations: line copy, undo/redo and save.

use log::{debug, warn};

use super::super::action::PanelAction;
use super::super::command::{Command, PanelOp, PanelOpOutcome};
use super::super::state::{PendingCopy, SessionState, ViewEffect};
use super::sync;
use crate::domain::Side;
use crate::infra::services::{AlignedRows, CopyLinesRequest, HistoryAction};

pub fn reduce(state: &mut SessionState, action: PanelAction) -> Vec<Command> {
    match action {
        PanelAction::CopyLines {
            from,
            start_row,
            end_row,
        } => copy_lines(state, from, start_row, end_row),
        PanelAction::History { side, action } => request_history(state, side, action),
        PanelAction::Save { side } => request_op(state, side, PanelOp::Save),
    }
}

pub(crate) fn request_history(
    state: &mut SessionState,
    side: Side,
    action: HistoryAction,
) -> Vec<Command> {
    request_op(state, side, PanelOp::History(action))
}

/// Queues the operation behind the pane's commit: a debounced edit is
/// flushed first and the queue drains once no commit is in flight.
fn request_op(state: &mut SessionState, side: Side, op: PanelOp) -> Vec<Command> {
    state.panel_mut(side).queued_ops.push(op);
    let commit = state.panel(side).commit.clone();
    if commit.scheduled {
        debug!(target: "sync", "{} on {} waits for pending commit", op, side);
        sync::flush_commit(state, side)
    } else if commit.in_flight {
        debug!(target: "sync", "{} on {} waits for commit in flight", op, side);
        Vec::new()
    } else {
        drain_queued_ops(state, side)
    }
}

/// Runs whatever waited for `side`'s commit to settle.
pub(crate) fn settle(state: &mut SessionState, side: Side) -> Vec<Command> {
    let mut commands = drain_queued_ops(state, side);
    commands.extend(issue_queued_copy(state));
    commands
}

pub(crate) fn drain_queued_ops(state: &mut SessionState, side: Side) -> Vec<Command> {
    let ops = std::mem::take(&mut state.panel_mut(side).queued_ops);
    if ops.is_empty() {
        return Vec::new();
    }
    vec![Command::RunPanelOps {
        side,
        document_id: state.document_id(side).clone(),
        ops,
    }]
}

pub(crate) fn on_panel_op_done(
    state: &mut SessionState,
    side: Side,
    op: PanelOp,
    result: Result<PanelOpOutcome, String>,
) {
    match result {
        Ok(outcome) => {
            let panel = state.panel_mut(side);
            panel.is_dirty = outcome.is_dirty;
            if let Some(line_count) = outcome.line_count {
                panel.line_count = line_count;
            }
            if matches!(op, PanelOp::History(_)) {
                panel.last_committed = None;
            }
            state.effects.push(ViewEffect::PanelUpdated(side));
        }
        Err(err) => warn!(target: "sync", "{} on {} failed: {}", op, side, err),
    }
}

/// Copies rows `start_row..=end_row` of `from` into the other pane. The range
/// is clamped to the model and may be given in either order. The copy waits
/// for both panes' commits, flushing debounced ones.
fn copy_lines(state: &mut SessionState, from: Side, start_row: usize, end_row: usize) -> Vec<Command> {
    let rows = state.store.current().aligned_line_count;
    if rows == 0 {
        return Vec::new();
    }
    state.queued_copies.push(PendingCopy {
        from,
        start_row: start_row.min(end_row).min(rows - 1),
        end_row: start_row.max(end_row).min(rows - 1),
    });

    let mut commands = Vec::new();
    for side in Side::BOTH {
        commands.extend(sync::flush_commit(state, side));
    }
    commands.extend(issue_queued_copy(state));
    commands
}

/// Sends the oldest queued copy once no commit or other copy is in flight.
pub(crate) fn issue_queued_copy(state: &mut SessionState) -> Vec<Command> {
    if state.copy_in_flight || state.queued_copies.is_empty() || !state.commits_settled() {
        return Vec::new();
    }
    let copy = state.queued_copies.remove(0);
    let rows = state.store.current().aligned_line_count;
    if rows == 0 {
        return Vec::new();
    }

    state.seq.refresh += 1;
    state.seq.copy += 1;
    state.copy_in_flight = true;
    vec![Command::CopyLines {
        seq: state.seq.copy,
        request: CopyLinesRequest {
            source_id: state.document_id(Side::Source).clone(),
            target_id: state.document_id(Side::Target).clone(),
            from_side: copy.from,
            to_side: copy.from.other(),
            start_row: copy.start_row.min(rows - 1),
            end_row: copy.end_row.min(rows - 1),
            rows: AlignedRows::of(state.store.current()),
        },
    }]
}
