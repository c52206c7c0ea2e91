//! Bracket and quote matching for the in-process backend.
//!
//! The character examined is the one just before `offset`, the way a caret
//! sitting after a bracket highlights it.

use crate::application::pair::{LineColumn, PairMatch};

const BRACKETS: &[(char, char)] = &[('(', ')'), ('[', ']'), ('{', '}'), ('<', '>')];
const QUOTES: &[char] = &['"', '\'', '`'];

pub fn find_pair(text: &str, offset: usize) -> Option<PairMatch> {
    let chars: Vec<char> = text.chars().collect();
    if offset == 0 || offset > chars.len() {
        return None;
    }
    let index = offset - 1;
    let ch = chars[index];

    let partner = if let Some((open, close)) = BRACKETS.iter().find(|(open, _)| *open == ch) {
        scan_forward(&chars, index, *open, *close)
    } else if let Some((open, close)) = BRACKETS.iter().find(|(_, close)| *close == ch) {
        scan_backward(&chars, index, *open, *close)
    } else if QUOTES.contains(&ch) {
        match_quote(&chars, index)
    } else {
        None
    }?;

    let (left, right) = (index.min(partner), index.max(partner));
    Some(PairMatch {
        left_offset: left,
        right_offset: right,
        left_position: Some(line_column(&chars, left)),
        right_position: Some(line_column(&chars, right)),
    })
}

fn scan_forward(chars: &[char], from: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    for (index, ch) in chars.iter().enumerate().skip(from) {
        if *ch == open {
            depth += 1;
        } else if *ch == close {
            depth -= 1;
            if depth == 0 {
                return Some(index);
            }
        }
    }
    None
}

fn scan_backward(chars: &[char], from: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    for index in (0..=from).rev() {
        let ch = chars[index];
        if ch == close {
            depth += 1;
        } else if ch == open {
            depth -= 1;
            if depth == 0 {
                return Some(index);
            }
        }
    }
    None
}

/// Quotes pair up within a line: an even number of the same quote before
/// `index` makes it an opening quote.
fn match_quote(chars: &[char], index: usize) -> Option<usize> {
    let quote = chars[index];
    let line_start = chars[..index]
        .iter()
        .rposition(|ch| *ch == '\n')
        .map_or(0, |pos| pos + 1);
    let before = chars[line_start..index]
        .iter()
        .filter(|ch| **ch == quote)
        .count();

    if before % 2 == 0 {
        chars[index + 1..]
            .iter()
            .take_while(|ch| **ch != '\n')
            .position(|ch| *ch == quote)
            .map(|pos| index + 1 + pos)
    } else {
        chars[line_start..index]
            .iter()
            .rposition(|ch| *ch == quote)
            .map(|pos| line_start + pos)
    }
}

fn line_column(chars: &[char], offset: usize) -> LineColumn {
    let mut line = 0;
    let mut column = 0;
    for ch in &chars[..offset] {
        if *ch == '\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
    }
    LineColumn { line, column }
}
