//! Diff classification and numbering for an aligned pair of panes.

use serde::{Deserialize, Serialize};

use crate::domain::aligned::DiffKind;

/// Everything derivable from the line and presence arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffMetadata {
    pub diff_line_numbers: Vec<usize>,
    pub source_diff_line_numbers: Vec<usize>,
    pub target_diff_line_numbers: Vec<usize>,
    pub aligned_diff_kinds: Vec<Option<DiffKind>>,
    pub source_line_numbers_by_aligned_row: Vec<usize>,
    pub target_line_numbers_by_aligned_row: Vec<usize>,
    pub diff_row_indexes: Vec<usize>,
    pub source_line_count: usize,
    pub target_line_count: usize,
    pub aligned_line_count: usize,
}

/// Classifies every row and rebuilds all numbering arrays in one pass.
///
/// The row count is the longest of the four inputs; a missing line reads as
/// empty and a missing presence flag as present.
pub fn compute_metadata(
    source_lines: &[String],
    target_lines: &[String],
    source_present: &[bool],
    target_present: &[bool],
) -> DiffMetadata {
    let rows = source_lines
        .len()
        .max(target_lines.len())
        .max(source_present.len())
        .max(target_present.len());

    let mut metadata = DiffMetadata {
        aligned_diff_kinds: Vec::with_capacity(rows),
        source_line_numbers_by_aligned_row: Vec::with_capacity(rows),
        target_line_numbers_by_aligned_row: Vec::with_capacity(rows),
        aligned_line_count: rows,
        ..Default::default()
    };

    let mut source_line = 0usize;
    let mut target_line = 0usize;

    for row in 0..rows {
        let has_source = source_present.get(row).copied().unwrap_or(true);
        let has_target = target_present.get(row).copied().unwrap_or(true);
        let source_text = source_lines.get(row).map(String::as_str).unwrap_or("");
        let target_text = target_lines.get(row).map(String::as_str).unwrap_or("");

        if has_source {
            source_line += 1;
        }
        if has_target {
            target_line += 1;
        }
        metadata
            .source_line_numbers_by_aligned_row
            .push(if has_source { source_line } else { 0 });
        metadata
            .target_line_numbers_by_aligned_row
            .push(if has_target { target_line } else { 0 });

        let kind = DiffKind::classify(source_text, target_text, has_source, has_target);
        if kind.is_some() {
            metadata.diff_row_indexes.push(row);
            metadata.diff_line_numbers.push(row + 1);
            if has_source {
                metadata.source_diff_line_numbers.push(source_line);
            }
            if has_target {
                metadata.target_diff_line_numbers.push(target_line);
            }
        }
        metadata.aligned_diff_kinds.push(kind);
    }

    metadata.source_line_count = source_line.max(1);
    metadata.target_line_count = target_line.max(1);
    metadata
}

/// Decides where classification runs after a keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffloadPolicy {
    /// Row count above which classification is delegated to the preview
    /// service. `0` delegates every keystroke.
    pub threshold_rows: usize,
}

impl OffloadPolicy {
    pub fn new(threshold_rows: usize) -> Self {
        Self { threshold_rows }
    }

    pub fn should_offload(&self, aligned_rows: usize) -> bool {
        aligned_rows > self.threshold_rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_numbering_skips_virtual_rows() {
        let metadata = compute_metadata(
            &lines(&["a", "", "b", "c"]),
            &lines(&["a", "new", "b", ""]),
            &[true, false, true, true],
            &[true, true, true, false],
        );
        assert_eq!(metadata.source_line_numbers_by_aligned_row, vec![1, 0, 2, 3]);
        assert_eq!(metadata.target_line_numbers_by_aligned_row, vec![1, 2, 3, 0]);
        assert_eq!(
            metadata.aligned_diff_kinds,
            vec![None, Some(DiffKind::Insert), None, Some(DiffKind::Delete)]
        );
        assert_eq!(metadata.diff_row_indexes, vec![1, 3]);
        assert_eq!(metadata.diff_line_numbers, vec![2, 4]);
        assert_eq!(metadata.source_diff_line_numbers, vec![3]);
        assert_eq!(metadata.target_diff_line_numbers, vec![2]);
        assert_eq!(metadata.source_line_count, 3);
        assert_eq!(metadata.target_line_count, 3);
    }

    #[test]
    fn test_unchanged_iff_both_present_and_equal() {
        let source = lines(&["same", "left", "", "x"]);
        let target = lines(&["same", "right", "gone", ""]);
        let source_present = [true, true, false, true];
        let target_present = [true, true, true, false];
        let metadata = compute_metadata(&source, &target, &source_present, &target_present);

        for row in 0..source.len() {
            let unchanged = source_present[row] && target_present[row] && source[row] == target[row];
            assert_eq!(metadata.aligned_diff_kinds[row].is_none(), unchanged, "row {row}");
        }
    }

    #[test]
    fn test_line_counts_clamped_to_one() {
        let metadata = compute_metadata(&lines(&[""]), &lines(&["x"]), &[false], &[true]);
        assert_eq!(metadata.source_line_count, 1);
        assert_eq!(metadata.aligned_line_count, 1);
    }

    #[test]
    fn test_offload_policy() {
        let policy = OffloadPolicy::new(100);
        assert!(!policy.should_offload(100));
        assert!(policy.should_offload(101));
        assert!(OffloadPolicy::new(0).should_offload(1));
    }
}
