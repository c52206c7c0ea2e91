//! Local prediction of which rows are real after a keystroke.
//!
//! The diff service realigns the panes eventually. Until then the edited
//! pane keeps the presence flags of every row outside the changed span, so
//! padding far away from the caret stays put while the user types.

use crate::domain::aligned::{AlignedDiffResult, Side};

/// Row arrays of both panes after a local edit, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedEdit {
    pub source_lines: Vec<String>,
    pub target_lines: Vec<String>,
    pub source_present: Vec<bool>,
    pub target_present: Vec<bool>,
}

impl AlignedEdit {
    pub fn row_count(&self) -> usize {
        self.source_lines.len()
    }
}

/// Derives presence flags for `new_lines` from the previous state of the
/// same pane.
///
/// Rows in the common prefix and suffix of `old_lines` / `new_lines` inherit
/// their old flag. Rows in between are freshly typed content and are always
/// real.
pub fn reconcile_presence(
    old_lines: &[String],
    old_present: &[bool],
    new_lines: &[String],
) -> Vec<bool> {
    let shorter = old_lines.len().min(new_lines.len());

    let mut prefix = 0;
    while prefix < shorter && old_lines[prefix] == new_lines[prefix] {
        prefix += 1;
    }

    let mut suffix = 0;
    while suffix < shorter - prefix
        && old_lines[old_lines.len() - 1 - suffix] == new_lines[new_lines.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let old_flag = |row: usize| old_present.get(row).copied().unwrap_or(true);
    let changed_end = new_lines.len() - suffix;
    let suffix_offset = old_lines.len() - suffix;

    (0..new_lines.len())
        .map(|row| {
            if row < prefix {
                old_flag(row)
            } else if row < changed_end {
                true
            } else {
                old_flag(suffix_offset + (row - changed_end))
            }
        })
        .collect()
}

/// Applies the new content of one pane to the current alignment.
///
/// The other pane keeps its rows; both are padded with virtual rows at the
/// tail to a common length of at least one. Rows left virtual on both sides
/// carry no line and are removed.
pub fn apply_edit(current: &AlignedDiffResult, side: Side, new_lines: Vec<String>) -> AlignedEdit {
    let new_present = reconcile_presence(current.lines(side), current.present(side), &new_lines);

    let other = side.other();
    let mut other_lines = current.lines(other).to_vec();
    let mut other_present = current.present(other).to_vec();
    other_present.resize(other_lines.len(), true);

    let mut edited_lines = new_lines;
    let mut edited_present = new_present;

    let rows = edited_lines.len().max(other_lines.len()).max(1);
    edited_lines.resize(rows, String::new());
    edited_present.resize(rows, false);
    other_lines.resize(rows, String::new());
    other_present.resize(rows, false);

    let mut edited_rows = Vec::with_capacity(rows);
    let mut other_rows = Vec::with_capacity(rows);
    for (((edited_line, edited_flag), other_line), other_flag) in edited_lines
        .into_iter()
        .zip(edited_present)
        .zip(other_lines)
        .zip(other_present)
    {
        if !edited_flag && !other_flag && edited_line.is_empty() && other_line.is_empty() {
            continue;
        }
        edited_rows.push((edited_line, edited_flag));
        other_rows.push((other_line, other_flag));
    }

    if edited_rows.is_empty() {
        edited_rows.push((String::new(), true));
        other_rows.push((String::new(), false));
    }

    let (edited_lines, edited_present): (Vec<String>, Vec<bool>) = edited_rows.into_iter().unzip();
    let (other_lines, other_present): (Vec<String>, Vec<bool>) = other_rows.into_iter().unzip();

    match side {
        Side::Source => AlignedEdit {
            source_lines: edited_lines,
            target_lines: other_lines,
            source_present: edited_present,
            target_present: other_present,
        },
        Side::Target => AlignedEdit {
            source_lines: other_lines,
            target_lines: edited_lines,
            source_present: other_present,
            target_present: edited_present,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_edit_in_middle_keeps_outer_flags() {
        let old = lines(&["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"]);
        let old_present = vec![
            true, false, true, false, true, true, false, true, false, true,
        ];
        let mut new = old.clone();
        new[4] = "four".to_string();

        let present = reconcile_presence(&old, &old_present, &new);
        assert_eq!(&present[0..4], &old_present[0..4]);
        assert_eq!(&present[5..10], &old_present[5..10]);
        assert!(present[4]);
    }

    #[test]
    fn test_typing_into_virtual_row_makes_it_real() {
        let old = lines(&["a", "", "c"]);
        let new = lines(&["a", "b", "c"]);
        let present = reconcile_presence(&old, &[true, false, true], &new);
        assert_eq!(present, vec![true, true, true]);
    }

    #[test]
    fn test_inserted_lines_shift_suffix_flags() {
        let old = lines(&["a", "b", "", "d"]);
        let new = lines(&["a", "x", "y", "b", "", "d"]);
        let present = reconcile_presence(&old, &[true, true, false, true], &new);
        assert_eq!(present, vec![true, true, true, true, false, true]);
    }

    #[test]
    fn test_deleted_lines_keep_suffix_flags() {
        let old = lines(&["a", "b", "c", "", "e"]);
        let new = lines(&["a", "", "e"]);
        let present = reconcile_presence(&old, &[true, true, true, false, true], &new);
        assert_eq!(present, vec![true, false, true]);
    }

    #[test]
    fn test_apply_edit_pads_other_side() {
        let current = AlignedDiffResult::from_rows(
            lines(&["a", "b"]),
            lines(&["a", "b"]),
            vec![true, true],
            vec![true, true],
        );
        let edit = apply_edit(&current, Side::Target, lines(&["a", "b", "c"]));
        assert_eq!(edit.row_count(), 3);
        assert_eq!(edit.source_lines, lines(&["a", "b", ""]));
        assert_eq!(edit.source_present, vec![true, true, false]);
        assert_eq!(edit.target_present, vec![true, true, true]);
    }

    #[test]
    fn test_apply_edit_drops_rows_absent_on_both_sides() {
        let current = AlignedDiffResult::from_rows(
            lines(&["a", "b", "c"]),
            lines(&["a", "", ""]),
            vec![true, true, true],
            vec![true, false, false],
        );
        let edit = apply_edit(&current, Side::Source, lines(&["a", "b"]));
        assert_eq!(edit.row_count(), 2);
        assert_eq!(edit.target_lines, lines(&["a", ""]));
        assert_eq!(edit.target_present, vec![true, false]);
    }
}
