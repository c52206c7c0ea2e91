//! Spawns service calls and posts their results back to the session.
//!
//! Calls are never aborted; a late answer is dropped by the reducer's
//! sequence checks.

use log::debug;
use std::future::Future;
use tokio::sync::mpsc;

use super::super::action::{Action, AsyncAction};
use super::super::command::{PanelOp, PanelOpOutcome};
use super::super::{DiffSession, SessionMessage};
use crate::application::pair::needs_forward_correction;
use crate::domain::{DocumentId, Side};
use crate::infra::services::{AlignedRows, ApplyEditRequest, CopyLinesRequest, HistoryAction};

fn spawn_call<F>(tx: &mpsc::UnboundedSender<SessionMessage>, call: F)
where
    F: Future<Output = AsyncAction> + Send + 'static,
{
    let tx = tx.clone();
    tokio::spawn(async move {
        let action = call.await;
        if tx.send(SessionMessage::Action(Action::Async(action))).is_err() {
            debug!(target: "sync", "session gone, dropping service result");
        }
    });
}

pub fn apply_edit(
    session: &mut DiffSession,
    seq: u64,
    side: Side,
    text: String,
    request: ApplyEditRequest,
) {
    let edits = session.services.edits.clone();
    spawn_call(&session.tx, async move {
        let result = edits
            .apply_edit(request)
            .await
            .map_err(|e| format!("Failed to apply edit: {e}"));
        AsyncAction::EditApplied {
            side,
            seq,
            text,
            result,
        }
    });
}

pub fn compare(session: &mut DiffSession, seq: u64, source_id: DocumentId, target_id: DocumentId) {
    let compare = session.services.compare.clone();
    spawn_call(&session.tx, async move {
        let result = compare
            .compare(&source_id, &target_id)
            .await
            .map_err(|e| format!("Failed to compare documents: {e}"));
        AsyncAction::Compared { seq, result }
    });
}

pub fn preview_metadata(session: &mut DiffSession, seq: u64, rows: AlignedRows) {
    let preview = session.services.preview.clone();
    spawn_call(&session.tx, async move {
        let result = preview
            .preview_metadata(rows)
            .await
            .map_err(|e| format!("Failed to preview metadata: {e}"));
        AsyncAction::PreviewComputed { seq, result }
    });
}

pub fn copy_lines(session: &mut DiffSession, seq: u64, request: CopyLinesRequest) {
    let copy = session.services.copy.clone();
    let to_side = request.to_side;
    spawn_call(&session.tx, async move {
        let result = copy
            .copy_lines(request)
            .await
            .map_err(|e| format!("Failed to copy lines: {e}"));
        AsyncAction::LinesCopied {
            seq,
            to_side,
            result,
        }
    });
}

pub fn search(
    session: &mut DiffSession,
    side: Side,
    seq: u64,
    document_id: DocumentId,
    keyword: String,
    presence: Vec<bool>,
) {
    let search = session.services.search.clone();
    spawn_call(&session.tx, async move {
        let result = search
            .search_matches(&document_id, &keyword, &presence)
            .await
            .map_err(|e| format!("Failed to search: {e}"));
        AsyncAction::SearchCompleted { side, seq, result }
    });
}

/// Looks up the pair at `offset`. When the caret sits on a pair character
/// but the answer belongs to the character before it, the lookup is repeated
/// one position later and the corrected answer wins.
pub fn find_pair(session: &mut DiffSession, side: Side, request_id: u64, text: String, offset: usize) {
    let pairs = session.services.pairs.clone();
    spawn_call(&session.tx, async move {
        let result = match pairs.find_matching_pair(&text, offset).await {
            Ok(found) if needs_forward_correction(&text, offset, found.as_ref()) => {
                match pairs.find_matching_pair(&text, offset + 1).await {
                    Ok(Some(corrected)) => Ok(Some(corrected)),
                    _ => Ok(found),
                }
            }
            other => other.map_err(|e| format!("Failed to match pair: {e}")),
        };
        AsyncAction::PairFound {
            side,
            request_id,
            text,
            result,
        }
    });
}

/// Runs the operations in order and reports each one separately.
pub fn run_panel_ops(session: &mut DiffSession, side: Side, document_id: DocumentId, ops: Vec<PanelOp>) {
    let history = session.services.history.clone();
    let tx = session.tx.clone();
    tokio::spawn(async move {
        for op in ops {
            let result = async {
                let line_count = match op {
                    PanelOp::History(HistoryAction::Undo) => Some(history.undo(&document_id).await?),
                    PanelOp::History(HistoryAction::Redo) => Some(history.redo(&document_id).await?),
                    PanelOp::Save => {
                        history.save(&document_id).await?;
                        None
                    }
                };
                let state = history.edit_history_state(&document_id).await?;
                anyhow::Ok(PanelOpOutcome {
                    line_count,
                    is_dirty: state.is_dirty,
                })
            }
            .await
            .map_err(|e| format!("Failed to {op}: {e}"));

            let action = AsyncAction::PanelOpDone { side, op, result };
            if tx.send(SessionMessage::Action(Action::Async(action))).is_err() {
                debug!(target: "sync", "session gone, dropping {} result", op);
                return;
            }
        }
    });
}
