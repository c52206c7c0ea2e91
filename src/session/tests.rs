use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::*;
use crate::application::caret::CaretPosition;
use crate::domain::{DiffKind, RawAlignedDiff};
use crate::infra::local::InMemoryBackend;
use crate::infra::services::{
    ApplyEditRequest, ApplyEditResponse, CompareService, EditApplyService, HistoryAction,
};

const QUIET: Duration = Duration::from_secs(3);

struct Fixture {
    backend: Arc<InMemoryBackend>,
    bus: SessionBus,
    session: DiffSession,
    source_id: DocumentId,
    target_id: DocumentId,
}

fn open(source: &str, target: &str) -> Fixture {
    open_with(source, target, SyncConfig::default(), |services, _| services)
}

fn open_with(
    source: &str,
    target: &str,
    config: SyncConfig,
    wrap: impl FnOnce(Services, Arc<InMemoryBackend>) -> Services,
) -> Fixture {
    let bus = SessionBus::new();
    let backend = Arc::new(InMemoryBackend::with_bus(bus.clone()));
    let source_id = backend.open(source);
    let target_id = backend.open(target);
    let services = wrap(Services::from_backend(backend.clone()), backend.clone());
    let session = DiffSession::open(
        SessionOptions {
            tab_id: "tab-1".to_string(),
            source_id: source_id.clone(),
            target_id: target_id.clone(),
            initial: InitialPayload::Texts {
                source: source.to_string(),
                target: target.to_string(),
            },
            config,
        },
        services,
        &bus,
    );
    Fixture {
        backend,
        bus,
        session,
        source_id,
        target_id,
    }
}

fn lines(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn edit(side: Side, values: &[&str]) -> EditorAction {
    EditorAction::Edit {
        side,
        lines: lines(values),
    }
}

struct CountingEdits {
    inner: Arc<InMemoryBackend>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl EditApplyService for CountingEdits {
    async fn apply_edit(&self, request: ApplyEditRequest) -> Result<ApplyEditResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.apply_edit(request).await
    }
}

struct SlowCompare {
    inner: Arc<InMemoryBackend>,
    delay: Duration,
}

#[async_trait]
impl CompareService for SlowCompare {
    async fn compare(&self, source_id: &DocumentId, target_id: &DocumentId) -> Result<RawAlignedDiff> {
        tokio::time::sleep(self.delay).await;
        self.inner.compare(source_id, target_id).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_edit_is_committed_and_realigned() {
    let mut fx = open("a\nb\nc", "a\nb\nc");
    fx.session.dispatch_editor(edit(Side::Target, &["a", "x", "c"]));
    assert_eq!(
        fx.session.model().aligned_diff_kinds,
        vec![None, Some(DiffKind::Modify), None]
    );
    assert!(fx.session.timer_pending(TimerKind::Commit(Side::Target)));

    fx.session.run_until_idle(QUIET).await;

    assert_eq!(fx.backend.text(&fx.target_id).unwrap(), "a\nx\nc");
    assert_eq!(fx.backend.text(&fx.source_id).unwrap(), "a\nb\nc");
    let panel = fx.session.panel(Side::Target);
    assert!(panel.is_dirty);
    assert_eq!(panel.last_committed.as_deref(), Some("a\nx\nc"));
    assert!(!fx.session.panel(Side::Source).is_dirty);
    assert!(!fx.session.has_deferred_result());
    assert_eq!(fx.session.model().diff_line_numbers, vec![2]);
}

#[tokio::test(start_paused = true)]
async fn test_keystroke_burst_commits_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let mut fx = open_with("a", "a", SyncConfig::default(), |mut services, backend| {
        services.edits = Arc::new(CountingEdits {
            inner: backend,
            calls: counter,
        });
        services
    });

    for text in ["ab", "abc", "abcd"] {
        fx.session.dispatch_editor(edit(Side::Source, &[text]));
        tokio::time::sleep(Duration::from_millis(30)).await;
        fx.session.poll_messages();
    }
    fx.session.run_until_idle(QUIET).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(fx.backend.text(&fx.source_id).unwrap(), "abcd");

    fx.session.dispatch_editor(edit(Side::Source, &["abcd"]));
    fx.session.run_until_idle(QUIET).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_result_waits_for_typing_to_stop() {
    let mut fx = open("one", "one");
    fx.session.dispatch_editor(edit(Side::Source, &["two"]));

    // Commit fires after the debounce; the answer is held inside the hold
    // window because the pane still has focus.
    tokio::time::sleep(Duration::from_millis(200)).await;
    fx.session.poll_messages();
    tokio::time::sleep(Duration::from_millis(10)).await;
    fx.session.poll_messages();
    assert!(fx.session.has_deferred_result());

    fx.session.run_until_idle(QUIET).await;
    assert!(!fx.session.has_deferred_result());
    assert_eq!(fx.session.model().side_text(Side::Source), "two");
}

#[tokio::test(start_paused = true)]
async fn test_blur_releases_held_result() {
    let mut fx = open("one", "one");
    fx.session.dispatch_editor(edit(Side::Source, &["two"]));
    tokio::time::sleep(Duration::from_millis(200)).await;
    fx.session.poll_messages();
    tokio::time::sleep(Duration::from_millis(10)).await;
    fx.session.poll_messages();
    assert!(fx.session.has_deferred_result());
    fx.session.take_effects();

    fx.session.dispatch_editor(EditorAction::Blur);
    assert!(!fx.session.has_deferred_result());
    assert!(fx.session.take_effects().contains(&ViewEffect::ModelReplaced));
}

#[tokio::test(start_paused = true)]
async fn test_external_change_triggers_refresh() {
    let mut fx = open("a\nb", "a\nb");
    fx.backend
        .write(&fx.source_id, "a\nb\nc".to_string())
        .unwrap();
    fx.session.run_until_idle(QUIET).await;

    let model = fx.session.model();
    assert_eq!(model.side_text(Side::Source), "a\nb\nc");
    assert_eq!(model.aligned_diff_kinds[2], Some(DiffKind::Delete));
    assert_eq!(fx.session.next_diff_row(), Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_undo_runs_after_pending_commit() {
    let mut fx = open("a", "a");
    fx.session.dispatch_editor(edit(Side::Source, &["a", "b"]));
    fx.session.dispatch_panel(PanelAction::History {
        side: Side::Source,
        action: HistoryAction::Undo,
    });
    assert!(!fx.session.timer_pending(TimerKind::Commit(Side::Source)));

    fx.session.dispatch_editor(EditorAction::Blur);
    fx.session.run_until_idle(QUIET).await;

    assert_eq!(fx.backend.text(&fx.source_id).unwrap(), "a");
    let panel = fx.session.panel(Side::Source);
    assert!(!panel.is_dirty);
    assert_eq!(panel.line_count, 1);
    assert_eq!(fx.session.model().side_text(Side::Source), "a");
}

#[tokio::test(start_paused = true)]
async fn test_history_signal_from_bus() {
    let mut fx = open("a", "a");
    fx.backend.write(&fx.target_id, "b".to_string()).unwrap();
    fx.session.run_until_idle(QUIET).await;
    assert_eq!(fx.session.model().side_text(Side::Target), "b");

    fx.bus.publish(SessionSignal::HistoryActionRequested {
        tab_id: "tab-1".to_string(),
        side: Side::Target,
        action: HistoryAction::Undo,
    });
    fx.session.run_until_idle(QUIET).await;
    assert_eq!(fx.backend.text(&fx.target_id).unwrap(), "a");
    assert_eq!(fx.session.model().side_text(Side::Target), "a");
    assert!(fx.session.model().diff_row_indexes.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_save_marks_panel_clean() {
    let mut fx = open("a", "a");
    fx.session.dispatch_editor(edit(Side::Target, &["z"]));
    fx.session.dispatch_panel(PanelAction::Save { side: Side::Target });
    fx.session.run_until_idle(QUIET).await;

    assert_eq!(fx.backend.text(&fx.target_id).unwrap(), "z");
    assert!(!fx.backend.is_dirty(&fx.target_id).unwrap());
    assert!(!fx.session.panel(Side::Target).is_dirty);
}

#[tokio::test(start_paused = true)]
async fn test_copy_lines_between_panes() {
    let mut fx = open("a\nb\nc", "a\nc");
    fx.bus.document_changed(&fx.target_id);
    fx.session.run_until_idle(QUIET).await;
    assert_eq!(fx.session.model().diff_row_indexes, vec![1]);

    fx.session.dispatch_panel(PanelAction::CopyLines {
        from: Side::Source,
        start_row: 1,
        end_row: 1,
    });
    fx.session.run_until_idle(QUIET).await;

    assert_eq!(fx.backend.text(&fx.target_id).unwrap(), "a\nb\nc");
    assert!(fx.session.model().diff_row_indexes.is_empty());
    assert!(fx.session.panel(Side::Target).is_dirty);
}

#[tokio::test(start_paused = true)]
async fn test_search_and_match_cycling() {
    let mut fx = open("alpha\nbeta\nalphabet", "x");
    fx.session.dispatch_editor(EditorAction::Search {
        side: Side::Source,
        keyword: " ALPHA ".to_string(),
    });
    fx.session.run_until_idle(QUIET).await;

    let search = fx.session.search(Side::Source);
    assert_eq!(search.keyword(), "ALPHA");
    assert_eq!(search.matched_rows(), &[0, 2]);
    assert_eq!(fx.session.next_match(Side::Source), Some(0));
    assert_eq!(fx.session.next_match(Side::Source), Some(2));
    assert_eq!(fx.session.next_match(Side::Source), Some(0));
    assert_eq!(fx.session.prev_match(Side::Source), Some(2));
    assert!(fx.session.search(Side::Target).matched_rows().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_pair_lookup_prefers_caret_character() {
    let mut fx = open("(a)(b)", "x");
    fx.session.dispatch_editor(EditorAction::Focus(Side::Source));
    fx.session.dispatch_editor(EditorAction::CaretMoved(CaretPosition {
        side: Side::Source,
        row_index: 0,
        selection_start: 3,
        selection_end: 3,
    }));
    fx.session.run_until_idle(QUIET).await;

    let offsets: Vec<usize> = fx
        .session
        .pair_highlights(Side::Source)
        .iter()
        .map(|h| h.offset)
        .collect();
    assert_eq!(offsets, vec![3, 5]);
    let columns: Vec<usize> = fx
        .session
        .pair_highlights(Side::Source)
        .iter()
        .map(|h| h.column)
        .collect();
    assert_eq!(columns, vec![4, 6]);

    fx.session.dispatch_editor(EditorAction::CaretMoved(CaretPosition {
        side: Side::Source,
        row_index: 0,
        selection_start: 1,
        selection_end: 4,
    }));
    assert!(fx.session.pair_highlights(Side::Source).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_offloaded_classification_arrives_later() {
    let config = SyncConfig {
        offload_threshold_rows: 0,
        ..Default::default()
    };
    let mut fx = open_with("a\nb", "a\nb", config, |services, _| services);
    fx.session.dispatch_editor(edit(Side::Source, &["a", "q"]));
    assert!(fx.session.is_metadata_stale());
    assert!(fx.session.model().diff_row_indexes.is_empty());

    tokio::time::sleep(Duration::from_millis(80)).await;
    fx.session.poll_messages();
    tokio::time::sleep(Duration::from_millis(1)).await;
    fx.session.poll_messages();
    assert!(!fx.session.is_metadata_stale());
    assert_eq!(fx.session.model().diff_row_indexes, vec![1]);
}

#[tokio::test(start_paused = true)]
async fn test_close_stops_timers_and_drops_results() {
    let mut fx = open("a", "a");
    fx.session.dispatch_editor(edit(Side::Source, &["b"]));
    fx.session.close();
    assert!(fx.session.is_closed());
    assert!(!fx.session.timer_pending(TimerKind::Commit(Side::Source)));

    fx.backend.write(&fx.target_id, "c".to_string()).unwrap();
    fx.session.run_until_idle(QUIET).await;
    assert_eq!(fx.backend.text(&fx.source_id).unwrap(), "a");
    assert_eq!(fx.session.model().side_text(Side::Target), "a");
}

#[tokio::test(start_paused = true)]
async fn test_slow_refresh_does_not_revert_commit() {
    let mut fx = open_with("a", "a", SyncConfig::default(), |mut services, backend| {
        services.compare = Arc::new(SlowCompare {
            inner: backend,
            delay: Duration::from_millis(180),
        });
        services
    });

    // A refresh goes out and stays in flight for 180 ms.
    fx.bus.document_changed(&fx.source_id);
    tokio::time::sleep(Duration::from_millis(10)).await;
    fx.session.poll_messages();
    tokio::time::sleep(Duration::from_millis(230)).await;
    fx.session.poll_messages();

    // Meanwhile the user types and leaves the pane.
    fx.session.dispatch_editor(edit(Side::Target, &["typed"]));
    fx.session.dispatch_editor(EditorAction::Blur);
    tokio::time::sleep(Duration::from_millis(20)).await;
    fx.session.poll_messages();
    assert_eq!(fx.session.model().side_text(Side::Target), "typed");
    assert_eq!(fx.backend.text(&fx.target_id).unwrap(), "typed");

    // The refresh issued before the commit resolves and must be dropped.
    tokio::time::sleep(Duration::from_millis(200)).await;
    fx.session.poll_messages();
    assert_eq!(fx.session.model().side_text(Side::Target), "typed");
    assert_eq!(
        fx.session.panel(Side::Target).last_committed.as_deref(),
        Some("typed")
    );

    fx.session.run_until_idle(QUIET).await;
    fx.session.dispatch_editor(edit(Side::Target, &["typed!"]));
    fx.session.dispatch_editor(EditorAction::Blur);
    fx.session.run_until_idle(QUIET).await;
    assert_eq!(fx.backend.text(&fx.target_id).unwrap(), "typed!");
    assert_eq!(fx.session.model().side_text(Side::Target), "typed!");
}
