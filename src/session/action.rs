use crate::application::caret::CaretPosition;
use crate::application::pair::PairMatch;
use crate::application::scroll::ScrollEvent;
use crate::application::search::SearchMatches;
use crate::domain::{RawAlignedDiff, Side};
use crate::infra::bus::SessionSignal;
use crate::infra::services::{ApplyEditResponse, CopyLinesResponse, HistoryAction};

use super::command::{PanelOp, PanelOpOutcome};

/// The debounce and retry timers a session owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Commit(Side),
    Refresh,
    Preview,
    DeferredRetry,
}

#[derive(Debug)]
pub enum Action {
    Editor(EditorAction),
    Panel(PanelAction),
    TimerElapsed(TimerKind),
    Signal(SessionSignal),
    Async(AsyncAction),
    Close,
}

/// Input reported by the two editable panes.
#[derive(Debug, Clone)]
pub enum EditorAction {
    /// The full new line list of one pane after a keystroke.
    Edit { side: Side, lines: Vec<String> },
    Focus(Side),
    Blur,
    CaretMoved(CaretPosition),
    Scrolled(ScrollEvent),
    ScrollIdle,
    Search { side: Side, keyword: String },
}

/// Pane-level commands from toolbars and menus.
#[derive(Debug, Clone)]
pub enum PanelAction {
    /// Copies an inclusive row range from `from` into the other pane.
    CopyLines {
        from: Side,
        start_row: usize,
        end_row: usize,
    },
    History { side: Side, action: HistoryAction },
    Save { side: Side },
}

/// Results of service calls, tagged with the sequence number or request id
/// they were issued under.
#[derive(Debug)]
pub enum AsyncAction {
    EditApplied {
        side: Side,
        seq: u64,
        text: String,
        result: Result<ApplyEditResponse, String>,
    },
    Compared {
        seq: u64,
        result: Result<RawAlignedDiff, String>,
    },
    PreviewComputed {
        seq: u64,
        result: Result<RawAlignedDiff, String>,
    },
    LinesCopied {
        seq: u64,
        to_side: Side,
        result: Result<CopyLinesResponse, String>,
    },
    SearchCompleted {
        side: Side,
        seq: u64,
        result: Result<SearchMatches, String>,
    },
    PairFound {
        side: Side,
        request_id: u64,
        text: String,
        result: Result<Option<PairMatch>, String>,
    },
    PanelOpDone {
        side: Side,
        op: PanelOp,
        result: Result<PanelOpOutcome, String>,
    },
}
