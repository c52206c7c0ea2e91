//! Commit, refresh and preview round trips, and everything that comes back
//! from the services.

use log::{debug, warn};
use tokio::time::Instant;

use super::super::action::{AsyncAction, TimerKind};
use super::super::command::Command;
use super::super::state::{ResultOrigin, SessionState, ViewEffect};
use super::{apply_authoritative, gate, panel};
use crate::application::metadata::{DiffMetadata, compute_metadata};
use crate::application::search::normalize_matches;
use crate::domain::{AlignedDiffResult, RawAlignedDiff, Side, infer_trailing_newline, normalize};
use crate::infra::services::{AlignedRows, ApplyEditRequest, ApplyEditResponse};

pub fn reduce(state: &mut SessionState, action: AsyncAction, now: Instant) -> Vec<Command> {
    match action {
        AsyncAction::EditApplied {
            side,
            seq,
            text,
            result,
        } => on_edit_applied(state, side, seq, text, result, now),
        AsyncAction::Compared { seq, result } => match result {
            Ok(raw) if seq == state.seq.refresh => {
                gate(state, ResultOrigin::Refresh(seq), normalize(raw), now)
            }
            Ok(_) => {
                debug!(target: "sync", "dropping stale refresh {} (current {})", seq, state.seq.refresh);
                Vec::new()
            }
            Err(err) => {
                warn!(target: "sync", "refresh failed: {}", err);
                Vec::new()
            }
        },
        AsyncAction::PreviewComputed { seq, result } => on_preview(state, seq, result),
        AsyncAction::LinesCopied {
            seq,
            to_side,
            result,
        } => {
            state.copy_in_flight = false;
            let mut commands = match result {
                Ok(response) if seq == state.seq.copy => {
                    if response.changed {
                        state.panel_mut(to_side).is_dirty = true;
                        state.effects.push(ViewEffect::PanelUpdated(to_side));
                    }
                    apply_authoritative(state, normalize(response.result))
                }
                Ok(_) => {
                    debug!(target: "sync", "dropping stale copy {} (current {})", seq, state.seq.copy);
                    Vec::new()
                }
                Err(err) => {
                    warn!(target: "sync", "copy into {} failed: {}", to_side, err);
                    Vec::new()
                }
            };
            commands.extend(panel::issue_queued_copy(state));
            commands
        }
        AsyncAction::SearchCompleted { side, seq, result } => {
            if seq != state.seq.search[side.index()] {
                debug!(target: "search", "dropping stale {} search {}", side, seq);
                return Vec::new();
            }
            match result {
                Ok(matches) => {
                    let model = state.store.current();
                    let rows = normalize_matches(
                        matches,
                        model.line_numbers_by_row(side),
                        model.aligned_line_count,
                    );
                    state.search[side.index()].set_matches(rows);
                    state.effects.push(ViewEffect::SearchUpdated(side));
                }
                Err(err) => warn!(target: "search", "search on {} failed: {}", side, err),
            }
            Vec::new()
        }
        AsyncAction::PairFound {
            side,
            request_id,
            text,
            result,
        } => {
            match result {
                Ok(found) => {
                    if state.pairs[side.index()].resolve(request_id, &text, found) {
                        state.effects.push(ViewEffect::PairHighlightsUpdated(side));
                    } else {
                        debug!(target: "pairs", "dropping stale lookup {} on {}", request_id, side);
                    }
                }
                Err(err) => warn!(target: "pairs", "pair lookup on {} failed: {}", side, err),
            }
            Vec::new()
        }
        AsyncAction::PanelOpDone { side, op, result } => {
            panel::on_panel_op_done(state, side, op, result);
            Vec::new()
        }
    }
}

/// Sends the pane's text to the edit service unless it matches the last
/// commit. A commit already in flight only marks a trailing replay.
pub(crate) fn begin_commit(state: &mut SessionState, side: Side) -> Vec<Command> {
    if state.panel(side).commit.in_flight {
        debug!(target: "sync", "commit on {} in flight, queueing replay", side);
        state.panel_mut(side).commit.replay = true;
        return Vec::new();
    }

    let model = state.store.current();
    let lines = model.real_lines(side);
    let text = model.side_text(side);
    if state.panel(side).last_committed.as_deref() == Some(text.as_str()) {
        debug!(target: "sync", "{} unchanged since last commit, skipping", side);
        return panel::settle(state, side);
    }

    let request = ApplyEditRequest {
        source_id: state.document_id(Side::Source).clone(),
        target_id: state.document_id(Side::Target).clone(),
        edited_side: side,
        rows: AlignedRows::of(model),
        edited_trailing_newline: infer_trailing_newline(lines.len(), &lines),
    };
    state.seq.supersede_reads();
    state.seq.commit += 1;
    state.panel_mut(side).commit.in_flight = true;
    vec![Command::ApplyEdit {
        seq: state.seq.commit,
        side,
        text,
        request,
    }]
}

/// Fires a debounced commit right away. The runtime turns the flush into the
/// timer's own elapse, so the commit goes through `begin_commit` as usual.
pub(crate) fn flush_commit(state: &SessionState, side: Side) -> Vec<Command> {
    if state.panel(side).commit.scheduled {
        vec![Command::Flush(TimerKind::Commit(side))]
    } else {
        Vec::new()
    }
}

fn on_edit_applied(
    state: &mut SessionState,
    side: Side,
    seq: u64,
    text: String,
    result: Result<ApplyEditResponse, String>,
    now: Instant,
) -> Vec<Command> {
    state.panel_mut(side).commit.in_flight = false;
    let mut commands = Vec::new();

    let aligned = match result {
        Ok(_) if seq != state.seq.commit => {
            debug!(target: "sync", "dropping stale commit {} (current {})", seq, state.seq.commit);
            None
        }
        Ok(response) => {
            let aligned = normalize(response.result);
            let panel = state.panel_mut(side);
            panel.last_committed = Some(text);
            for (side, is_dirty) in [
                (Side::Source, response.source_is_dirty),
                (Side::Target, response.target_is_dirty),
            ] {
                let panel = state.panel_mut(side);
                panel.is_dirty = is_dirty;
                panel.line_count = aligned.line_count(side);
                state.effects.push(ViewEffect::PanelUpdated(side));
            }
            Some(aligned)
        }
        Err(err) => {
            warn!(target: "sync", "commit of {} failed: {}", side, err);
            None
        }
    };

    // A trailing commit supersedes this result before it is gated.
    if std::mem::take(&mut state.panel_mut(side).commit.replay) {
        commands.extend(begin_commit(state, side));
    }

    if let Some(aligned) = aligned {
        if seq == state.seq.commit {
            commands.extend(gate(state, ResultOrigin::Commit(seq), aligned, now));
        } else {
            debug!(target: "sync", "commit {} superseded by replay {}", seq, state.seq.commit);
        }
    }

    if !state.panel(side).commit.in_flight {
        commands.extend(panel::settle(state, side));
    }
    commands
}

pub(crate) fn begin_refresh(state: &mut SessionState) -> Vec<Command> {
    state.seq.refresh += 1;
    vec![Command::Compare {
        seq: state.seq.refresh,
        source_id: state.document_id(Side::Source).clone(),
        target_id: state.document_id(Side::Target).clone(),
    }]
}

pub(crate) fn begin_preview(state: &mut SessionState) -> Vec<Command> {
    if !state.metadata_stale {
        return Vec::new();
    }
    state.seq.preview += 1;
    vec![Command::PreviewMetadata {
        seq: state.seq.preview,
        rows: AlignedRows::of(state.store.current()),
    }]
}

fn on_preview(
    state: &mut SessionState,
    seq: u64,
    result: Result<RawAlignedDiff, String>,
) -> Vec<Command> {
    let raw = match result {
        Ok(raw) if seq == state.seq.preview => raw,
        Ok(_) => {
            debug!(target: "preview", "dropping stale preview {} (current {})", seq, state.seq.preview);
            return Vec::new();
        }
        Err(err) => {
            warn!(target: "preview", "preview failed: {}", err);
            return Vec::new();
        }
    };

    let metadata = preview_metadata(raw, state.store.current());
    if !state.store.mutate(|model| model.apply_metadata(metadata)) {
        debug!(target: "preview", "preview row count no longer matches, ignoring");
        return Vec::new();
    }
    state.metadata_stale = false;
    state.effects.push(ViewEffect::MetadataRefreshed);
    super::restore_caret(state);
    Vec::new()
}

/// Reads the classification fields of a preview response. An incomplete
/// response is recomputed locally from the model's rows.
fn preview_metadata(raw: RawAlignedDiff, model: &AlignedDiffResult) -> DiffMetadata {
    let rows = model.aligned_line_count;
    match raw {
        RawAlignedDiff {
            aligned_diff_kinds: Some(aligned_diff_kinds),
            source_line_numbers_by_aligned_row: Some(source_line_numbers_by_aligned_row),
            target_line_numbers_by_aligned_row: Some(target_line_numbers_by_aligned_row),
            diff_line_numbers: Some(diff_line_numbers),
            source_diff_line_numbers: Some(source_diff_line_numbers),
            target_diff_line_numbers: Some(target_diff_line_numbers),
            diff_row_indexes: Some(diff_row_indexes),
            source_line_count: Some(source_line_count),
            target_line_count: Some(target_line_count),
            ..
        } if aligned_diff_kinds.len() == rows
            && source_line_numbers_by_aligned_row.len() == rows
            && target_line_numbers_by_aligned_row.len() == rows =>
        {
            DiffMetadata {
                diff_line_numbers,
                source_diff_line_numbers,
                target_diff_line_numbers,
                aligned_diff_kinds,
                source_line_numbers_by_aligned_row,
                target_line_numbers_by_aligned_row,
                diff_row_indexes,
                source_line_count,
                target_line_count,
                aligned_line_count: rows,
            }
        }
        _ => {
            debug!(target: "preview", "incomplete preview response, classifying locally");
            compute_metadata(
                &model.aligned_source_lines,
                &model.aligned_target_lines,
                &model.aligned_source_present,
                &model.aligned_target_present,
            )
        }
    }
}
