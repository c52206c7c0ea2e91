//! Bracket and quote pair highlighting around the caret.
//!
//! Offsets are character offsets into the pane text (virtual rows included,
//! joined with `\n`).

use serde::{Deserialize, Serialize};

const PAIR_CANDIDATES: &[char] = &['(', ')', '[', ']', '{', '}', '<', '>', '"', '\'', '`'];

/// A 0-based line/column position as reported by the pair-match service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineColumn {
    pub line: usize,
    pub column: usize,
}

/// Response of the pair-match service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairMatch {
    pub left_offset: usize,
    pub right_offset: usize,
    #[serde(default)]
    pub left_position: Option<LineColumn>,
    #[serde(default)]
    pub right_position: Option<LineColumn>,
}

impl PairMatch {
    pub fn touches(&self, offset: usize) -> bool {
        self.left_offset == offset || self.right_offset == offset
    }
}

/// One highlighted character, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairHighlight {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

pub fn is_pair_candidate(ch: char) -> bool {
    PAIR_CANDIDATES.contains(&ch)
}

/// True when the caret sits on a pair character but `found` describes the
/// pair of the character just before it. The caller should query again at
/// `offset + 1`.
pub fn needs_forward_correction(text: &str, offset: usize, found: Option<&PairMatch>) -> bool {
    let Some(found) = found else {
        return false;
    };
    if offset == 0 || found.touches(offset) || !found.touches(offset - 1) {
        return false;
    }
    text.chars().nth(offset).is_some_and(is_pair_candidate)
}

/// Converts a match into highlight targets sorted by offset. Service
/// line/column pairs are used when both are present, otherwise positions are
/// derived from the offsets.
pub fn highlights_for(text: &str, found: &PairMatch) -> Vec<PairHighlight> {
    let mut highlights = match (found.left_position, found.right_position) {
        (Some(left), Some(right)) => vec![
            PairHighlight {
                line: left.line + 1,
                column: left.column + 1,
                offset: found.left_offset,
            },
            PairHighlight {
                line: right.line + 1,
                column: right.column + 1,
                offset: found.right_offset,
            },
        ],
        _ => [found.left_offset, found.right_offset]
            .into_iter()
            .filter_map(|offset| position_of(text, offset))
            .collect(),
    };
    highlights.sort_by_key(|h| h.offset);
    highlights.dedup_by_key(|h| h.offset);
    highlights
}

/// 1-based line/column of a character offset, `None` past the end.
pub fn position_of(text: &str, offset: usize) -> Option<PairHighlight> {
    let mut line = 1;
    let mut column = 1;
    for (index, ch) in text.chars().enumerate() {
        if index == offset {
            return Some(PairHighlight {
                line,
                column,
                offset,
            });
        }
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    None
}

/// Highlight state of one pane. Each lookup gets a fresh request id and only
/// the newest answer is applied.
#[derive(Debug, Clone, Default)]
pub struct PairHighlighter {
    request_id: u64,
    highlights: Vec<PairHighlight>,
}

impl PairHighlighter {
    pub fn highlights(&self) -> &[PairHighlight] {
        &self.highlights
    }

    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Starts a lookup and returns its id. Earlier lookups become stale.
    pub fn begin(&mut self) -> u64 {
        self.request_id += 1;
        self.request_id
    }

    /// Cancels any lookup in flight and drops the highlights.
    pub fn clear(&mut self) {
        self.request_id += 1;
        self.highlights.clear();
    }

    /// Applies a lookup answer. Returns `false` if `request_id` is stale.
    pub fn resolve(&mut self, request_id: u64, text: &str, found: Option<PairMatch>) -> bool {
        if request_id != self.request_id {
            return false;
        }
        self.highlights = found
            .map(|found| highlights_for(text, &found))
            .unwrap_or_default();
        true
    }
}
