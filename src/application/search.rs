//! Per-pane search results and row traversal.

use serde::{Deserialize, Serialize};

/// Result of the per-document search service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum SearchMatches {
    /// Already expressed as 0-based aligned rows.
    Rows(Vec<usize>),
    /// 1-based real line numbers of the document (legacy form).
    LineNumbers(Vec<usize>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

/// Converts a service result into sorted, deduplicated, in-bounds rows.
pub fn normalize_matches(
    matches: SearchMatches,
    line_numbers_by_row: &[usize],
    row_count: usize,
) -> Vec<usize> {
    let mut rows: Vec<usize> = match matches {
        SearchMatches::Rows(rows) => rows.into_iter().filter(|row| *row < row_count).collect(),
        SearchMatches::LineNumbers(line_numbers) => line_numbers
            .into_iter()
            .filter(|line| *line > 0)
            .filter_map(|line| line_numbers_by_row.iter().position(|n| *n == line))
            .filter(|row| *row < row_count)
            .collect(),
    };
    rows.sort_unstable();
    rows.dedup();
    rows
}

/// Steps through `rows` from a remembered selection, wrapping at both ends.
///
/// Without a selection `Next` lands on the first row and `Prev` on the last.
pub fn cycle_match(rows: &[usize], current: Option<usize>, direction: Direction) -> Option<usize> {
    if rows.is_empty() {
        return None;
    }
    let position = current.and_then(|row| rows.iter().position(|r| *r == row));
    let index = match (position, direction) {
        (None, Direction::Next) => 0,
        (None, Direction::Prev) => rows.len() - 1,
        (Some(i), Direction::Next) => (i + 1) % rows.len(),
        (Some(i), Direction::Prev) => (i + rows.len() - 1) % rows.len(),
    };
    Some(rows[index])
}

/// Finds the first row strictly after (or before) `anchor`, wrapping to the
/// first (or last) row when nothing lies in that direction. `rows` must be
/// sorted.
pub fn step_from_anchor(rows: &[usize], anchor: usize, direction: Direction) -> Option<usize> {
    match direction {
        Direction::Next => rows
            .iter()
            .copied()
            .find(|row| *row > anchor)
            .or_else(|| rows.first().copied()),
        Direction::Prev => rows
            .iter()
            .rev()
            .copied()
            .find(|row| *row < anchor)
            .or_else(|| rows.last().copied()),
    }
}

/// Search state of one pane.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchNavigator {
    keyword: String,
    matched_rows: Vec<usize>,
    current: Option<usize>,
}

impl SearchNavigator {
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn is_active(&self) -> bool {
        !self.keyword.is_empty()
    }

    pub fn matched_rows(&self) -> &[usize] {
        &self.matched_rows
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// Stores the trimmed keyword. Returns `false` when it is empty, in which
    /// case the results are cleared.
    pub fn set_keyword(&mut self, keyword: &str) -> bool {
        self.keyword = keyword.trim().to_string();
        if self.keyword.is_empty() {
            self.clear();
            return false;
        }
        true
    }

    pub fn clear(&mut self) {
        self.keyword.clear();
        self.matched_rows.clear();
        self.current = None;
    }

    /// Replaces the matched rows. The current match survives only if the new
    /// set still contains it.
    pub fn set_matches(&mut self, rows: Vec<usize>) {
        if rows != self.matched_rows
            && self.current.is_some_and(|current| !rows.contains(&current))
        {
            self.current = None;
        }
        self.matched_rows = rows;
    }

    pub fn step(&mut self, direction: Direction) -> Option<usize> {
        let next = cycle_match(&self.matched_rows, self.current, direction);
        if next.is_some() {
            self.current = next;
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_without_selection() {
        let rows = [2, 5, 9];
        assert_eq!(cycle_match(&rows, None, Direction::Next), Some(2));
        assert_eq!(cycle_match(&rows, None, Direction::Prev), Some(9));
    }

    #[test]
    fn test_cycle_wraps() {
        let rows = [2, 5, 9];
        assert_eq!(cycle_match(&rows, Some(9), Direction::Next), Some(2));
        assert_eq!(cycle_match(&rows, Some(2), Direction::Prev), Some(9));
        assert_eq!(cycle_match(&rows, Some(5), Direction::Next), Some(9));
        assert_eq!(cycle_match(&[], None, Direction::Next), None);
    }

    #[test]
    fn test_anchor_traversal() {
        let rows = [2, 5, 9];
        assert_eq!(step_from_anchor(&rows, 5, Direction::Next), Some(9));
        assert_eq!(step_from_anchor(&rows, 9, Direction::Next), Some(2));
        assert_eq!(step_from_anchor(&rows, 5, Direction::Prev), Some(2));
        assert_eq!(step_from_anchor(&rows, 2, Direction::Prev), Some(9));
        assert_eq!(step_from_anchor(&rows, 3, Direction::Next), Some(5));
        assert_eq!(step_from_anchor(&[], 3, Direction::Next), None);
    }

    #[test]
    fn test_normalize_translates_line_numbers() {
        let by_row = [1, 0, 2, 3, 0];
        let rows = normalize_matches(SearchMatches::LineNumbers(vec![3, 1, 7, 0, 1]), &by_row, 5);
        assert_eq!(rows, vec![0, 3]);

        let rows = normalize_matches(SearchMatches::Rows(vec![4, 1, 12, 1]), &by_row, 5);
        assert_eq!(rows, vec![1, 4]);
    }

    #[test]
    fn test_current_match_reset_when_missing() {
        let mut nav = SearchNavigator::default();
        assert!(nav.set_keyword("  foo "));
        assert_eq!(nav.keyword(), "foo");
        nav.set_matches(vec![2, 5, 9]);
        assert_eq!(nav.step(Direction::Next), Some(2));
        assert_eq!(nav.step(Direction::Next), Some(5));

        nav.set_matches(vec![1, 5]);
        assert_eq!(nav.current(), Some(5));

        nav.set_matches(vec![1, 6]);
        assert_eq!(nav.current(), None);
        assert_eq!(nav.step(Direction::Prev), Some(6));
    }

    #[test]
    fn test_blank_keyword_clears() {
        let mut nav = SearchNavigator::default();
        nav.set_keyword("x");
        nav.set_matches(vec![1]);
        assert!(!nav.set_keyword("   "));
        assert!(nav.matched_rows().is_empty());
        assert!(!nav.is_active());
    }
}
