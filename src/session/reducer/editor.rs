use log::debug;
use tokio::time::Instant;

use super::super::action::{EditorAction, TimerKind};
use super::super::command::Command;
use super::super::state::{SessionState, ViewEffect};
use super::sync;
use crate::application::caret::CaretPosition;
use crate::application::metadata::compute_metadata;
use crate::application::reconcile::apply_edit;
use crate::domain::{AlignedDiffResult, Side};

pub fn reduce(state: &mut SessionState, action: EditorAction, now: Instant) -> Vec<Command> {
    match action {
        EditorAction::Edit { side, lines } => on_edit(state, side, lines, now),
        EditorAction::Focus(side) => {
            state.focus = Some(side);
            Vec::new()
        }
        EditorAction::Blur => on_blur(state, now),
        EditorAction::CaretMoved(caret) => {
            state.caret = Some(caret);
            lookup_pair(state, caret)
        }
        EditorAction::Scrolled(event) => {
            if let Some(mirror) = state.scroll.on_scroll(event) {
                state.effects.push(ViewEffect::MirrorScroll(mirror));
            }
            Vec::new()
        }
        EditorAction::ScrollIdle => {
            state.scroll.on_idle();
            Vec::new()
        }
        EditorAction::Search { side, keyword } => on_search(state, side, &keyword),
    }
}

fn on_edit(state: &mut SessionState, side: Side, lines: Vec<String>, now: Instant) -> Vec<Command> {
    state.focus = Some(side);
    state.last_edit_at = Some(now);

    let edit = apply_edit(state.store.current(), side, lines);
    let mut commands = Vec::new();

    if state.policy.should_offload(edit.row_count()) {
        let next = state.store.current().with_stale_metadata(
            edit.source_lines,
            edit.target_lines,
            edit.source_present,
            edit.target_present,
        );
        state.store.replace(next);
        state
            .preserver
            .capture_caret(state.store.current(), state.focus, state.caret);
        state.metadata_stale = true;
        state.seq.preview += 1;
        commands.push(Command::Schedule(TimerKind::Preview));
    } else {
        let metadata = compute_metadata(
            &edit.source_lines,
            &edit.target_lines,
            &edit.source_present,
            &edit.target_present,
        );
        state.store.replace(AlignedDiffResult::from_parts(
            edit.source_lines,
            edit.target_lines,
            edit.source_present,
            edit.target_present,
            metadata,
        ));
        if state.metadata_stale {
            state.metadata_stale = false;
            state.seq.preview += 1;
            commands.push(Command::Cancel(TimerKind::Preview));
        }
    }

    state.panel_mut(side).commit.scheduled = true;
    commands.push(Command::Schedule(TimerKind::Commit(side)));
    commands
}

/// Flushes pending commits. A parked result keeps waiting while they are
/// outstanding, so it cannot overwrite text that was never committed.
fn on_blur(state: &mut SessionState, now: Instant) -> Vec<Command> {
    state.focus = None;
    let mut commands = Vec::new();
    for side in Side::BOTH {
        commands.extend(sync::flush_commit(state, side));
    }
    commands.extend(super::retry_deferred(state, now));
    commands
}

fn on_search(state: &mut SessionState, side: Side, keyword: &str) -> Vec<Command> {
    if !state.search[side.index()].set_keyword(keyword) {
        state.seq.search[side.index()] += 1;
        state.effects.push(ViewEffect::SearchUpdated(side));
        return Vec::new();
    }
    vec![issue_search(state, side)]
}

pub(crate) fn issue_search(state: &mut SessionState, side: Side) -> Command {
    state.seq.search[side.index()] += 1;
    Command::Search {
        side,
        seq: state.seq.search[side.index()],
        document_id: state.document_id(side).clone(),
        keyword: state.search[side.index()].keyword().to_string(),
        presence: state.store.current().present(side).to_vec(),
    }
}

/// Starts a bracket lookup for a collapsed caret; a selection clears the
/// pane's highlights instead.
pub(crate) fn lookup_pair(state: &mut SessionState, caret: CaretPosition) -> Vec<Command> {
    let side = caret.side;
    let pairs = &mut state.pairs[side.index()];
    if !caret.is_collapsed() {
        let had_highlights = !pairs.highlights().is_empty();
        pairs.clear();
        if had_highlights {
            state.effects.push(ViewEffect::PairHighlightsUpdated(side));
        }
        return Vec::new();
    }
    let request_id = pairs.begin();
    debug!(target: "pairs", "lookup {} on {} at {}", request_id, side, caret.selection_start);
    vec![Command::FindPair {
        side,
        request_id,
        text: state.store.current().panel_text(side),
        offset: caret.selection_start,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::scroll::ScrollEvent;
    use crate::infra::app_config::SyncConfig;

    fn state() -> SessionState {
        SessionState::new(
            "tab".to_string(),
            "src".to_string(),
            "tgt".to_string(),
            AlignedDiffResult::naive_pairing("f(x)\ny", "f(x)\nz"),
            SyncConfig::default(),
        )
    }

    fn caret(start: usize, end: usize) -> CaretPosition {
        CaretPosition {
            side: Side::Source,
            row_index: 0,
            selection_start: start,
            selection_end: end,
        }
    }

    #[test]
    fn test_collapsed_caret_requests_pair_lookup() {
        let mut state = state();
        let commands = reduce(
            &mut state,
            EditorAction::CaretMoved(caret(2, 2)),
            Instant::now(),
        );
        match commands.as_slice() {
            [Command::FindPair {
                side,
                request_id,
                text,
                offset,
            }] => {
                assert_eq!(*side, Side::Source);
                assert_eq!(*request_id, 1);
                assert_eq!(text, "f(x)\ny");
                assert_eq!(*offset, 2);
            }
            other => panic!("unexpected commands {other:?}"),
        }
    }

    #[test]
    fn test_selection_clears_pairs_and_invalidates_lookup() {
        let mut state = state();
        reduce(&mut state, EditorAction::CaretMoved(caret(2, 2)), Instant::now());
        let commands = reduce(&mut state, EditorAction::CaretMoved(caret(1, 3)), Instant::now());
        assert!(commands.is_empty());
        assert_eq!(state.pairs[0].request_id(), 2);
    }

    #[test]
    fn test_blank_search_clears_results() {
        let mut state = state();
        let commands = reduce(
            &mut state,
            EditorAction::Search {
                side: Side::Target,
                keyword: "  z ".to_string(),
            },
            Instant::now(),
        );
        assert!(matches!(
            commands.as_slice(),
            [Command::Search { keyword, seq: 1, .. }] if keyword == "z"
        ));

        let commands = reduce(
            &mut state,
            EditorAction::Search {
                side: Side::Target,
                keyword: "   ".to_string(),
            },
            Instant::now(),
        );
        assert!(commands.is_empty());
        assert!(!state.search[1].is_active());
        assert_eq!(state.seq.search[1], 2);
    }

    #[test]
    fn test_scroll_mirrors_and_suppresses_echo() {
        let mut state = state();
        let event = ScrollEvent {
            side: Side::Source,
            top: 50.0,
            left: 3.0,
            max_top: 100.0,
            other_max_top: 200.0,
        };
        reduce(&mut state, EditorAction::Scrolled(event), Instant::now());
        let Some(ViewEffect::MirrorScroll(mirror)) = state.effects.pop() else {
            panic!("expected a mirrored scroll");
        };
        assert_eq!(mirror.side, Side::Target);
        assert_eq!(mirror.top, 100.0);

        let echo = ScrollEvent {
            side: Side::Target,
            top: 100.0,
            left: 3.0,
            max_top: 200.0,
            other_max_top: 100.0,
        };
        reduce(&mut state, EditorAction::Scrolled(echo), Instant::now());
        assert!(state.effects.is_empty());
    }

    #[test]
    fn test_edit_claims_focus() {
        let mut state = state();
        let now = Instant::now();
        reduce(
            &mut state,
            EditorAction::Edit {
                side: Side::Target,
                lines: vec!["f(x)".to_string(), "y".to_string()],
            },
            now,
        );
        assert_eq!(state.focus, Some(Side::Target));
        assert!(state.is_actively_editing(now));
        assert!(state.model().diff_row_indexes.is_empty());
    }
}
