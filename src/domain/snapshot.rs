use serde::{Deserialize, Serialize};

use super::aligned::Side;

/// Caret state captured before the aligned model is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaretSnapshot {
    pub side: Side,
    pub row_index: usize,
    /// Real line number on `side` at the caret row, `0` on a virtual row.
    pub line_number: usize,
    pub selection_start: usize,
    pub selection_end: usize,
}

/// Scroll offsets of both panes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelScrollSnapshot {
    pub source_top: f64,
    pub source_left: f64,
    pub target_top: f64,
    pub target_left: f64,
}

impl PanelScrollSnapshot {
    pub fn set(&mut self, side: Side, top: f64, left: f64) {
        match side {
            Side::Source => {
                self.source_top = top;
                self.source_left = left;
            }
            Side::Target => {
                self.target_top = top;
                self.target_left = left;
            }
        }
    }
}

/// Where the view should put the caret after the next render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaretRestore {
    pub side: Side,
    pub row_index: usize,
    pub selection_start: usize,
    pub selection_end: usize,
}
