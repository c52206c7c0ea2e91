//! Caret and scroll preservation across wholesale model replacement.
//!
//! Padding rows shift when the diff service realigns the panes, so the caret
//! is tracked by its real line number and mapped back to a row afterwards.

use crate::domain::aligned::{AlignedDiffResult, Side};
use crate::domain::snapshot::{CaretRestore, CaretSnapshot, PanelScrollSnapshot};

/// Live caret position reported by the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaretPosition {
    pub side: Side,
    pub row_index: usize,
    pub selection_start: usize,
    pub selection_end: usize,
}

impl CaretPosition {
    pub fn is_collapsed(&self) -> bool {
        self.selection_start == self.selection_end
    }
}

/// Snapshots captured before a replacement, consumed once after it.
#[derive(Debug, Default)]
pub struct CaretScrollPreserver {
    pending_caret: Option<CaretSnapshot>,
    pending_scroll: Option<PanelScrollSnapshot>,
}

impl CaretScrollPreserver {
    /// Records scroll offsets unconditionally and the caret only when one of
    /// the editable panes has focus.
    pub fn capture(
        &mut self,
        model: &AlignedDiffResult,
        focus: Option<Side>,
        caret: Option<CaretPosition>,
        scroll: PanelScrollSnapshot,
    ) {
        self.pending_scroll = Some(scroll);
        self.pending_caret = match (focus, caret) {
            (Some(focused), Some(caret)) if focused == caret.side => {
                Some(snapshot_caret(model, caret))
            }
            _ => None,
        };
    }

    /// Records only the caret, leaving any pending scroll snapshot alone.
    pub fn capture_caret(
        &mut self,
        model: &AlignedDiffResult,
        focus: Option<Side>,
        caret: Option<CaretPosition>,
    ) {
        if let (Some(focused), Some(caret)) = (focus, caret)
            && focused == caret.side
        {
            self.pending_caret = Some(snapshot_caret(model, caret));
        }
    }

    pub fn take_scroll(&mut self) -> Option<PanelScrollSnapshot> {
        self.pending_scroll.take()
    }

    /// Consumes the caret snapshot and locates it in `model`.
    pub fn take_caret(&mut self, model: &AlignedDiffResult) -> Option<CaretRestore> {
        self.pending_caret
            .take()
            .map(|snapshot| restore_caret(model, &snapshot))
    }

    pub fn clear(&mut self) {
        self.pending_caret = None;
        self.pending_scroll = None;
    }
}

/// The line number is counted from the presence flags rather than read from
/// the line-number arrays, which lag behind while classification is offloaded.
pub fn snapshot_caret(model: &AlignedDiffResult, caret: CaretPosition) -> CaretSnapshot {
    let present = model.present(caret.side);
    let line_number = match present.get(caret.row_index) {
        Some(true) => present[..=caret.row_index].iter().filter(|p| **p).count(),
        _ => 0,
    };
    CaretSnapshot {
        side: caret.side,
        row_index: caret.row_index,
        line_number,
        selection_start: caret.selection_start,
        selection_end: caret.selection_end,
    }
}

/// Maps a snapshot onto `model`: the row carrying the same real line number
/// wins, otherwise the recorded row index clamped to the row count.
pub fn restore_caret(model: &AlignedDiffResult, snapshot: &CaretSnapshot) -> CaretRestore {
    let last_row = model.aligned_line_count.saturating_sub(1);
    let row_index = model
        .row_for_line(snapshot.side, snapshot.line_number)
        .unwrap_or_else(|| snapshot.row_index.min(last_row));
    CaretRestore {
        side: snapshot.side,
        row_index,
        selection_start: snapshot.selection_start,
        selection_end: snapshot.selection_end,
    }
}
