//! Line alignment of two texts for the in-process backend.

use similar::{Algorithm, DiffOp, capture_diff_slices};

use crate::domain::{AlignedDiffResult, split_lines};

#[derive(Default)]
struct RowBuilder {
    source_lines: Vec<String>,
    target_lines: Vec<String>,
    source_present: Vec<bool>,
    target_present: Vec<bool>,
}

impl RowBuilder {
    fn push(&mut self, source: Option<&str>, target: Option<&str>) {
        self.source_lines.push(source.unwrap_or_default().to_string());
        self.target_lines.push(target.unwrap_or_default().to_string());
        self.source_present.push(source.is_some());
        self.target_present.push(target.is_some());
    }

    /// Pairs removed and added lines of one hunk row by row; the surplus of
    /// the longer side gets a virtual partner.
    fn push_hunk(&mut self, removed: &[&str], added: &[&str]) {
        for row in 0..removed.len().max(added.len()) {
            self.push(removed.get(row).copied(), added.get(row).copied());
        }
    }

    fn finish(self) -> AlignedDiffResult {
        AlignedDiffResult::from_rows(
            self.source_lines,
            self.target_lines,
            self.source_present,
            self.target_present,
        )
    }
}

/// Aligns two texts on a shared row grid using a Myers line diff.
///
/// Consecutive deletions and insertions between two unchanged runs form one
/// hunk whose lines are paired as modifications.
pub fn align_texts(source_text: &str, target_text: &str) -> AlignedDiffResult {
    let source = split_lines(source_text);
    let target = split_lines(target_text);
    let source: Vec<&str> = source.iter().map(String::as_str).collect();
    let target: Vec<&str> = target.iter().map(String::as_str).collect();

    let ops = capture_diff_slices(Algorithm::Myers, &source, &target);

    let mut rows = RowBuilder::default();
    let mut removed: Vec<&str> = Vec::new();
    let mut added: Vec<&str> = Vec::new();

    for op in ops {
        match op {
            DiffOp::Equal {
                old_index,
                new_index,
                len,
            } => {
                rows.push_hunk(&removed, &added);
                removed.clear();
                added.clear();
                for i in 0..len {
                    rows.push(Some(source[old_index + i]), Some(target[new_index + i]));
                }
            }
            DiffOp::Delete {
                old_index, old_len, ..
            } => removed.extend_from_slice(&source[old_index..old_index + old_len]),
            DiffOp::Insert {
                new_index, new_len, ..
            } => added.extend_from_slice(&target[new_index..new_index + new_len]),
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => {
                removed.extend_from_slice(&source[old_index..old_index + old_len]);
                added.extend_from_slice(&target[new_index..new_index + new_len]);
            }
        }
    }
    rows.push_hunk(&removed, &added);

    rows.finish()
}
