use std::fmt;

use crate::domain::{DocumentId, Side};
use crate::infra::services::{AlignedRows, ApplyEditRequest, CopyLinesRequest, HistoryAction};

use super::action::TimerKind;

/// A history or persistence operation on one pane's document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelOp {
    History(HistoryAction),
    Save,
}

impl fmt::Display for PanelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelOp::History(HistoryAction::Undo) => f.write_str("undo"),
            PanelOp::History(HistoryAction::Redo) => f.write_str("redo"),
            PanelOp::Save => f.write_str("save"),
        }
    }
}

/// Pane bookkeeping reported back after a [`PanelOp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelOpOutcome {
    /// Only undo and redo report a line count.
    pub line_count: Option<usize>,
    pub is_dirty: bool,
}

#[derive(Debug, Clone)]
pub enum Command {
    Schedule(TimerKind),
    Cancel(TimerKind),
    /// Fires the timer right away if it is pending.
    Flush(TimerKind),
    ApplyEdit {
        seq: u64,
        side: Side,
        /// The committed text, remembered for no-op elision on success.
        text: String,
        request: ApplyEditRequest,
    },
    Compare {
        seq: u64,
        source_id: DocumentId,
        target_id: DocumentId,
    },
    PreviewMetadata {
        seq: u64,
        rows: AlignedRows,
    },
    CopyLines {
        seq: u64,
        request: CopyLinesRequest,
    },
    Search {
        side: Side,
        seq: u64,
        document_id: DocumentId,
        keyword: String,
        presence: Vec<bool>,
    },
    FindPair {
        side: Side,
        request_id: u64,
        text: String,
        offset: usize,
    },
    /// Runs the operations one after another on the same document.
    RunPanelOps {
        side: Side,
        document_id: DocumentId,
        ops: Vec<PanelOp>,
    },
}
