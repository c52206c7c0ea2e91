//! The aligned two-pane line model.
//!
//! An [`AlignedDiffResult`] lays the lines of two documents out on a shared
//! row grid. Every parallel array has exactly `aligned_line_count` entries and
//! every row is real on at least one side. Derived fields (line numbers, diff
//! kinds, diff row lists) are always rebuilt from the line and presence arrays,
//! so a value produced by [`normalize`] satisfies the classification rule for
//! every row.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::application::metadata::{DiffMetadata, compute_metadata};

/// Identifier of a backing document owned by the storage service.
pub type DocumentId = String;

/// Identifier of a diff tab (one session per tab).
pub type TabId = String;

/// One of the two editable panes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Source,
    Target,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Source, Side::Target];

    pub fn other(self) -> Side {
        match self {
            Side::Source => Side::Target,
            Side::Target => Side::Source,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Side::Source => 0,
            Side::Target => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => write!(f, "source"),
            Side::Target => write!(f, "target"),
        }
    }
}

/// Classification of a row whose two sides differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    Insert,
    Delete,
    Modify,
}

impl DiffKind {
    /// Applies the per-row classification rule. `None` means unchanged.
    pub fn classify(
        source_line: &str,
        target_line: &str,
        source_present: bool,
        target_present: bool,
    ) -> Option<DiffKind> {
        match (source_present, target_present) {
            (false, true) => Some(DiffKind::Insert),
            (true, false) => Some(DiffKind::Delete),
            _ if source_line != target_line => Some(DiffKind::Modify),
            _ => None,
        }
    }

    pub fn marker(self) -> char {
        match self {
            DiffKind::Insert => '+',
            DiffKind::Delete => '-',
            DiffKind::Modify => '~',
        }
    }
}

/// The single source of truth for one diff tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignedDiffResult {
    pub aligned_source_lines: Vec<String>,
    pub aligned_target_lines: Vec<String>,
    pub aligned_source_present: Vec<bool>,
    pub aligned_target_present: Vec<bool>,
    pub source_line_numbers_by_aligned_row: Vec<usize>,
    pub target_line_numbers_by_aligned_row: Vec<usize>,
    pub aligned_diff_kinds: Vec<Option<DiffKind>>,
    /// 1-based aligned line numbers of every diff row.
    pub diff_line_numbers: Vec<usize>,
    /// 1-based source line numbers touched by a diff row.
    pub source_diff_line_numbers: Vec<usize>,
    /// 1-based target line numbers touched by a diff row.
    pub target_diff_line_numbers: Vec<usize>,
    /// 0-based row indexes of every diff row.
    pub diff_row_indexes: Vec<usize>,
    pub source_line_count: usize,
    pub target_line_count: usize,
    pub aligned_line_count: usize,
}

/// Wire form of an alignment as delivered by a service. Any field may be
/// missing; [`normalize`] fills the gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAlignedDiff {
    pub aligned_source_lines: Option<Vec<String>>,
    pub aligned_target_lines: Option<Vec<String>>,
    pub aligned_source_present: Option<Vec<bool>>,
    pub aligned_target_present: Option<Vec<bool>>,
    pub source_line_numbers_by_aligned_row: Option<Vec<usize>>,
    pub target_line_numbers_by_aligned_row: Option<Vec<usize>>,
    pub aligned_diff_kinds: Option<Vec<Option<DiffKind>>>,
    pub diff_line_numbers: Option<Vec<usize>>,
    pub source_diff_line_numbers: Option<Vec<usize>>,
    pub target_diff_line_numbers: Option<Vec<usize>>,
    pub diff_row_indexes: Option<Vec<usize>>,
    pub source_line_count: Option<usize>,
    pub target_line_count: Option<usize>,
    pub aligned_line_count: Option<usize>,
}

impl From<AlignedDiffResult> for RawAlignedDiff {
    fn from(value: AlignedDiffResult) -> Self {
        RawAlignedDiff {
            aligned_source_lines: Some(value.aligned_source_lines),
            aligned_target_lines: Some(value.aligned_target_lines),
            aligned_source_present: Some(value.aligned_source_present),
            aligned_target_present: Some(value.aligned_target_present),
            source_line_numbers_by_aligned_row: Some(value.source_line_numbers_by_aligned_row),
            target_line_numbers_by_aligned_row: Some(value.target_line_numbers_by_aligned_row),
            aligned_diff_kinds: Some(value.aligned_diff_kinds),
            diff_line_numbers: Some(value.diff_line_numbers),
            source_diff_line_numbers: Some(value.source_diff_line_numbers),
            target_diff_line_numbers: Some(value.target_diff_line_numbers),
            diff_row_indexes: Some(value.diff_row_indexes),
            source_line_count: Some(value.source_line_count),
            target_line_count: Some(value.target_line_count),
            aligned_line_count: Some(value.aligned_line_count),
        }
    }
}

/// Pads or truncates every parallel array to one row count and rebuilds the
/// derived fields from the presence arrays. A declared `alignedLineCount`
/// beyond the longest array is ignored.
///
/// Missing lines become empty strings and missing presence flags become
/// `true`. Rows that are virtual on both sides are repaired: a side carrying
/// leftover text is promoted to real, an empty row is dropped. The result
/// always has at least one row and both line counts are at least 1.
pub fn normalize(input: RawAlignedDiff) -> AlignedDiffResult {
    let source_lines = input.aligned_source_lines.unwrap_or_default();
    let target_lines = input.aligned_target_lines.unwrap_or_default();
    let source_present = input.aligned_source_present.unwrap_or_default();
    let target_present = input.aligned_target_present.unwrap_or_default();

    // The declared count can only shorten the arrays, never grow past them.
    let longest = source_lines
        .len()
        .max(target_lines.len())
        .max(source_present.len())
        .max(target_present.len());
    let row_count = input.aligned_line_count.map_or(longest, |declared| declared.min(longest));

    let source_lines = fit(source_lines, row_count, String::new());
    let target_lines = fit(target_lines, row_count, String::new());
    let source_present = fit(source_present, row_count, true);
    let target_present = fit(target_present, row_count, true);

    AlignedDiffResult::from_rows(source_lines, target_lines, source_present, target_present)
}

impl AlignedDiffResult {
    /// Builds a fully derived result from the four authoritative arrays.
    ///
    /// The arrays are expected to have equal length; rows virtual on both
    /// sides are repaired as described on [`normalize`].
    pub fn from_rows(
        source_lines: Vec<String>,
        target_lines: Vec<String>,
        source_present: Vec<bool>,
        target_present: Vec<bool>,
    ) -> Self {
        let (source_lines, target_lines, source_present, target_present) =
            repair_rows(source_lines, target_lines, source_present, target_present);
        let metadata = compute_metadata(
            &source_lines,
            &target_lines,
            &source_present,
            &target_present,
        );
        Self::from_parts(
            source_lines,
            target_lines,
            source_present,
            target_present,
            metadata,
        )
    }

    /// Assembles a result from row arrays and already computed metadata.
    pub fn from_parts(
        source_lines: Vec<String>,
        target_lines: Vec<String>,
        source_present: Vec<bool>,
        target_present: Vec<bool>,
        metadata: DiffMetadata,
    ) -> Self {
        AlignedDiffResult {
            aligned_source_lines: source_lines,
            aligned_target_lines: target_lines,
            aligned_source_present: source_present,
            aligned_target_present: target_present,
            source_line_numbers_by_aligned_row: metadata.source_line_numbers_by_aligned_row,
            target_line_numbers_by_aligned_row: metadata.target_line_numbers_by_aligned_row,
            aligned_diff_kinds: metadata.aligned_diff_kinds,
            diff_line_numbers: metadata.diff_line_numbers,
            source_diff_line_numbers: metadata.source_diff_line_numbers,
            target_diff_line_numbers: metadata.target_diff_line_numbers,
            diff_row_indexes: metadata.diff_row_indexes,
            source_line_count: metadata.source_line_count,
            target_line_count: metadata.target_line_count,
            aligned_line_count: metadata.aligned_line_count,
        }
    }

    /// Pairs the two texts line by line without any diffing. Used when a tab
    /// opens without a precomputed alignment.
    pub fn naive_pairing(source_text: &str, target_text: &str) -> Self {
        let source: Vec<String> = source_text.split('\n').map(str::to_string).collect();
        let target: Vec<String> = target_text.split('\n').map(str::to_string).collect();
        let rows = source.len().max(target.len()).max(1);

        let source_present = (0..rows).map(|i| i < source.len()).collect();
        let target_present = (0..rows).map(|i| i < target.len()).collect();

        Self::from_rows(
            fit(source, rows, String::new()),
            fit(target, rows, String::new()),
            source_present,
            target_present,
        )
    }

    /// Replaces the row arrays while keeping the previous classification,
    /// resized to the new row count. Used on the large-document path where
    /// authoritative metadata arrives later.
    pub fn with_stale_metadata(
        &self,
        source_lines: Vec<String>,
        target_lines: Vec<String>,
        source_present: Vec<bool>,
        target_present: Vec<bool>,
    ) -> Self {
        let rows = source_lines.len();
        let mut next = self.clone();
        next.aligned_line_count = rows;
        next.source_line_count = source_present.iter().filter(|p| **p).count().max(1);
        next.target_line_count = target_present.iter().filter(|p| **p).count().max(1);
        next.aligned_source_lines = source_lines;
        next.aligned_target_lines = target_lines;
        next.aligned_source_present = source_present;
        next.aligned_target_present = target_present;
        next.aligned_diff_kinds.resize(rows, None);
        next.source_line_numbers_by_aligned_row.resize(rows, 0);
        next.target_line_numbers_by_aligned_row.resize(rows, 0);
        next.diff_row_indexes.retain(|row| *row < rows);
        next.diff_line_numbers.retain(|line| *line <= rows);
        next
    }

    /// Overwrites the derived fields with `metadata`, keeping lines and
    /// presence. Returns `false` when the metadata describes a different row
    /// count and was not applied.
    pub fn apply_metadata(&mut self, metadata: DiffMetadata) -> bool {
        if metadata.aligned_line_count != self.aligned_source_lines.len() {
            return false;
        }
        self.source_line_numbers_by_aligned_row = metadata.source_line_numbers_by_aligned_row;
        self.target_line_numbers_by_aligned_row = metadata.target_line_numbers_by_aligned_row;
        self.aligned_diff_kinds = metadata.aligned_diff_kinds;
        self.diff_line_numbers = metadata.diff_line_numbers;
        self.source_diff_line_numbers = metadata.source_diff_line_numbers;
        self.target_diff_line_numbers = metadata.target_diff_line_numbers;
        self.diff_row_indexes = metadata.diff_row_indexes;
        self.source_line_count = metadata.source_line_count;
        self.target_line_count = metadata.target_line_count;
        self.aligned_line_count = metadata.aligned_line_count;
        true
    }

    pub fn lines(&self, side: Side) -> &[String] {
        match side {
            Side::Source => &self.aligned_source_lines,
            Side::Target => &self.aligned_target_lines,
        }
    }

    pub fn present(&self, side: Side) -> &[bool] {
        match side {
            Side::Source => &self.aligned_source_present,
            Side::Target => &self.aligned_target_present,
        }
    }

    pub fn line_numbers_by_row(&self, side: Side) -> &[usize] {
        match side {
            Side::Source => &self.source_line_numbers_by_aligned_row,
            Side::Target => &self.target_line_numbers_by_aligned_row,
        }
    }

    pub fn line_count(&self, side: Side) -> usize {
        match side {
            Side::Source => self.source_line_count,
            Side::Target => self.target_line_count,
        }
    }

    /// Real lines of one side, see [`extract_real_lines`].
    pub fn real_lines(&self, side: Side) -> Vec<String> {
        extract_real_lines(self.lines(side), self.present(side))
    }

    /// The document text one side represents.
    pub fn side_text(&self, side: Side) -> String {
        let lines = self.real_lines(side);
        let trailing_newline = infer_trailing_newline(lines.len(), &lines);
        serialize(&lines, trailing_newline)
    }

    /// The text shown in a pane: every aligned row, virtual rows included.
    pub fn panel_text(&self, side: Side) -> String {
        self.lines(side).join("\n")
    }

    /// Row whose real line number on `side` equals `line_number`.
    pub fn row_for_line(&self, side: Side, line_number: usize) -> Option<usize> {
        if line_number == 0 {
            return None;
        }
        self.line_numbers_by_row(side)
            .iter()
            .position(|n| *n == line_number)
    }
}

/// Returns the lines of rows that are present, plus any virtual row that
/// still carries text. Never returns an empty vector.
pub fn extract_real_lines(aligned_lines: &[String], present: &[bool]) -> Vec<String> {
    let mut lines: Vec<String> = aligned_lines
        .iter()
        .enumerate()
        .filter(|(row, line)| present.get(*row).copied().unwrap_or(true) || !line.is_empty())
        .map(|(_, line)| line.clone())
        .collect();
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Joins lines with `\n`. With `trailing_newline` set and more than one
/// line, the text is terminated by a newline; a final empty line already
/// stands for that terminator and is not doubled.
pub fn serialize(lines: &[String], trailing_newline: bool) -> String {
    let mut text = lines.join("\n");
    if trailing_newline && lines.len() > 1 && !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

/// A trailing newline shows up as an empty final line after splitting on
/// `\n`.
pub fn infer_trailing_newline(line_count: usize, lines: &[String]) -> bool {
    line_count > 1 && lines.last().is_some_and(|line| line.is_empty())
}

/// Splits document text into lines the way panes do.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_string).collect()
}

fn fit<T: Clone>(mut values: Vec<T>, len: usize, fill: T) -> Vec<T> {
    values.resize(len, fill);
    values
}

fn repair_rows(
    source_lines: Vec<String>,
    target_lines: Vec<String>,
    source_present: Vec<bool>,
    target_present: Vec<bool>,
) -> (Vec<String>, Vec<String>, Vec<bool>, Vec<bool>) {
    let rows = source_lines
        .len()
        .max(target_lines.len())
        .max(source_present.len())
        .max(target_present.len());

    let mut out_source = Vec::with_capacity(rows);
    let mut out_target = Vec::with_capacity(rows);
    let mut out_source_present = Vec::with_capacity(rows);
    let mut out_target_present = Vec::with_capacity(rows);

    for row in 0..rows {
        let source = source_lines.get(row).cloned().unwrap_or_default();
        let target = target_lines.get(row).cloned().unwrap_or_default();
        let mut has_source = source_present.get(row).copied().unwrap_or(true);
        let mut has_target = target_present.get(row).copied().unwrap_or(true);

        if !has_source && !has_target {
            has_source = !source.is_empty();
            has_target = !target.is_empty();
            if !has_source && !has_target {
                continue;
            }
        }

        out_source.push(source);
        out_target.push(target);
        out_source_present.push(has_source);
        out_target_present.push(has_target);
    }

    if out_source.is_empty() {
        out_source.push(String::new());
        out_target.push(String::new());
        out_source_present.push(true);
        out_target_present.push(true);
    }

    (out_source, out_target, out_source_present, out_target_present)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_modify_row_classification() {
        let result = AlignedDiffResult::from_rows(
            lines(&["a", "b", "c"]),
            lines(&["a", "x", "c"]),
            vec![true; 3],
            vec![true; 3],
        );
        assert_eq!(
            result.aligned_diff_kinds,
            vec![None, Some(DiffKind::Modify), None]
        );
        assert_eq!(result.diff_line_numbers, vec![2]);
        assert_eq!(result.diff_row_indexes, vec![1]);
    }

    #[test]
    fn test_virtual_target_row_is_delete() {
        let result = AlignedDiffResult::from_rows(
            lines(&["a", "b"]),
            lines(&["a", ""]),
            vec![true, true],
            vec![true, false],
        );
        assert_eq!(result.aligned_diff_kinds, vec![None, Some(DiffKind::Delete)]);
        assert_eq!(result.target_line_count, 1);
        assert_eq!(result.target_line_numbers_by_aligned_row, vec![1, 0]);
    }

    #[test]
    fn test_normalize_fills_missing_fields() {
        let raw = RawAlignedDiff {
            aligned_source_lines: Some(lines(&["a", "b", "c"])),
            aligned_target_lines: Some(lines(&["a"])),
            aligned_target_present: Some(vec![true]),
            ..Default::default()
        };
        let result = normalize(raw);
        assert_eq!(result.aligned_line_count, 3);
        assert_eq!(result.aligned_target_lines, lines(&["a", "", ""]));
        assert_eq!(result.aligned_target_present, vec![true, true, true]);
        assert_eq!(result.aligned_source_present, vec![true, true, true]);
        assert_eq!(
            result.aligned_diff_kinds,
            vec![None, Some(DiffKind::Modify), Some(DiffKind::Modify)]
        );
    }

    #[test]
    fn test_normalize_truncates_to_declared_count() {
        let raw = RawAlignedDiff {
            aligned_source_lines: Some(lines(&["a", "b", "c"])),
            aligned_target_lines: Some(lines(&["a", "b", "c", "d"])),
            aligned_line_count: Some(2),
            ..Default::default()
        };
        let result = normalize(raw);
        assert_eq!(result.aligned_line_count, 2);
        assert_eq!(result.aligned_target_lines, lines(&["a", "b"]));
    }

    #[test]
    fn test_normalize_ignores_oversized_declared_count() {
        let raw: RawAlignedDiff = serde_json::from_str(
            r#"{"alignedSourceLines":["a"],"alignedTargetLines":["a"],"alignedLineCount":18446744073709551615}"#,
        )
        .unwrap();
        let result = normalize(raw);
        assert_eq!(result.aligned_line_count, 1);
        assert_eq!(result.aligned_source_lines, lines(&["a"]));

        let raw = RawAlignedDiff {
            aligned_source_lines: Some(lines(&["a"])),
            aligned_source_present: Some(vec![true, true, true]),
            aligned_line_count: Some(usize::MAX),
            ..Default::default()
        };
        assert_eq!(normalize(raw).aligned_line_count, 3);
    }

    #[test]
    fn test_normalize_empty_input_has_one_row() {
        let result = normalize(RawAlignedDiff::default());
        assert_eq!(result.aligned_line_count, 1);
        assert_eq!(result.source_line_count, 1);
        assert_eq!(result.target_line_count, 1);
        assert_eq!(result.aligned_diff_kinds, vec![None]);
    }

    #[test]
    fn test_normalize_repairs_rows_absent_on_both_sides() {
        let raw = RawAlignedDiff {
            aligned_source_lines: Some(lines(&["a", "", "leftover"])),
            aligned_target_lines: Some(lines(&["a", "", ""])),
            aligned_source_present: Some(vec![true, false, false]),
            aligned_target_present: Some(vec![true, false, false]),
            ..Default::default()
        };
        let result = normalize(raw);
        assert_eq!(result.aligned_source_lines, lines(&["a", "leftover"]));
        assert_eq!(result.aligned_source_present, vec![true, true]);
        assert_eq!(result.aligned_target_present, vec![true, false]);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = RawAlignedDiff {
            aligned_source_lines: Some(lines(&["x", "y"])),
            aligned_target_present: Some(vec![false, true, true, false]),
            diff_row_indexes: Some(vec![42]),
            source_line_count: Some(0),
            ..Default::default()
        };
        let once = normalize(raw);
        let twice = normalize(RawAlignedDiff::from(once.clone()));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_extract_keeps_virtual_rows_with_text() {
        let extracted = extract_real_lines(
            &lines(&["a", "ghost", "", "b"]),
            &[true, false, false, true],
        );
        assert_eq!(extracted, lines(&["a", "ghost", "b"]));
    }

    #[test]
    fn test_extract_never_returns_empty() {
        let extracted = extract_real_lines(&lines(&[""]), &[false]);
        assert_eq!(extracted, lines(&[""]));
    }

    #[test]
    fn test_serialize_and_trailing_newline() {
        let with_newline = lines(&["a", "b", ""]);
        assert!(infer_trailing_newline(3, &with_newline));
        assert_eq!(serialize(&with_newline, true), "a\nb\n");

        let without = lines(&["a", "b"]);
        assert!(!infer_trailing_newline(2, &without));
        assert_eq!(serialize(&without, false), "a\nb");
        assert_eq!(serialize(&without, true), "a\nb\n");

        let single = lines(&[""]);
        assert!(!infer_trailing_newline(1, &single));
        assert_eq!(serialize(&single, true), "");
    }

    #[test]
    fn test_side_text_round_trip() {
        for text in ["", "a", "a\n", "a\nb", "a\nb\n", "\n\n", "x\n\ny\n"] {
            let result = AlignedDiffResult::naive_pairing(text, "other\ntext");
            assert_eq!(result.side_text(Side::Source), text, "text {:?}", text);
        }
    }

    #[test]
    fn test_row_for_line_skips_virtual_rows() {
        let result = AlignedDiffResult::from_rows(
            lines(&["a", "", "b"]),
            lines(&["a", "new", "b"]),
            vec![true, false, true],
            vec![true, true, true],
        );
        assert_eq!(result.row_for_line(Side::Source, 2), Some(2));
        assert_eq!(result.row_for_line(Side::Target, 2), Some(1));
        assert_eq!(result.row_for_line(Side::Source, 0), None);
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let result = AlignedDiffResult::naive_pairing("a", "b");
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("alignedSourceLines").is_some());
        assert_eq!(json["alignedDiffKinds"][0], "modify");

        let raw: RawAlignedDiff =
            serde_json::from_str(r#"{"alignedSourceLines":["a"],"alignedTargetLines":["a"]}"#)
                .unwrap();
        assert_eq!(normalize(raw).aligned_diff_kinds, vec![None]);
    }
}
