use tokio::time::Instant;

use crate::application::caret::{CaretPosition, CaretScrollPreserver};
use crate::application::metadata::OffloadPolicy;
use crate::application::pair::PairHighlighter;
use crate::application::scroll::{ScrollCoordinator, ScrollMirror};
use crate::application::search::SearchNavigator;
use crate::domain::{AlignedDiffResult, CaretRestore, DocumentId, PanelScrollSnapshot, Side, TabId};
use crate::infra::app_config::SyncConfig;

use super::command::PanelOp;
use super::store::AlignedStore;

/// Commit lifecycle of one pane: idle, pending (debounced), in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitFlight {
    pub scheduled: bool,
    pub in_flight: bool,
    /// Another commit was requested mid-flight; replayed once on completion.
    pub replay: bool,
}

#[derive(Debug, Clone)]
pub struct PanelState {
    pub document_id: DocumentId,
    pub is_dirty: bool,
    pub line_count: usize,
    /// Text of the last successful commit, for no-op elision.
    pub last_committed: Option<String>,
    pub commit: CommitFlight,
    /// Operations waiting for the pane's commit to settle.
    pub queued_ops: Vec<PanelOp>,
}

impl PanelState {
    pub fn new(document_id: DocumentId, line_count: usize, last_committed: String) -> Self {
        Self {
            document_id,
            is_dirty: false,
            line_count,
            last_committed: Some(last_committed),
            commit: CommitFlight::default(),
            queued_ops: Vec::new(),
        }
    }
}

/// Latest issued sequence number per call type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sequences {
    pub commit: u64,
    pub refresh: u64,
    pub preview: u64,
    pub copy: u64,
    pub search: [u64; 2],
}

impl Sequences {
    /// A write makes every refresh and copy issued before it stale: their
    /// alignment predates the write.
    pub fn supersede_reads(&mut self) {
        self.refresh += 1;
        self.copy += 1;
    }
}

/// A row copy waiting for both panes' commits to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCopy {
    pub from: Side,
    pub start_row: usize,
    pub end_row: usize,
}

/// Which call produced an authoritative result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultOrigin {
    Commit(u64),
    Refresh(u64),
}

#[derive(Debug, Clone)]
pub struct DeferredResult {
    pub origin: ResultOrigin,
    pub result: AlignedDiffResult,
}

/// Instructions for the view, drained after each batch of messages.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEffect {
    ModelReplaced,
    MetadataRefreshed,
    RestoreScroll(PanelScrollSnapshot),
    RestoreCaret(CaretRestore),
    MirrorScroll(ScrollMirror),
    SearchUpdated(Side),
    PairHighlightsUpdated(Side),
    PanelUpdated(Side),
}

#[derive(Debug)]
pub struct SessionState {
    pub tab_id: TabId,
    pub config: SyncConfig,
    pub policy: OffloadPolicy,
    pub store: AlignedStore,
    pub panels: [PanelState; 2],
    pub seq: Sequences,
    pub focus: Option<Side>,
    pub caret: Option<CaretPosition>,
    pub last_edit_at: Option<Instant>,
    /// Derived fields lag behind the row arrays until a preview lands.
    pub metadata_stale: bool,
    pub deferred: Option<DeferredResult>,
    /// Copies run one at a time, after commits.
    pub queued_copies: Vec<PendingCopy>,
    pub copy_in_flight: bool,
    pub preserver: CaretScrollPreserver,
    pub scroll: ScrollCoordinator,
    pub search: [SearchNavigator; 2],
    pub pairs: [PairHighlighter; 2],
    pub effects: Vec<ViewEffect>,
    pub disposed: bool,
}

impl SessionState {
    pub fn new(
        tab_id: TabId,
        source_id: DocumentId,
        target_id: DocumentId,
        model: AlignedDiffResult,
        config: SyncConfig,
    ) -> Self {
        let panels = [
            PanelState::new(
                source_id,
                model.line_count(Side::Source),
                model.side_text(Side::Source),
            ),
            PanelState::new(
                target_id,
                model.line_count(Side::Target),
                model.side_text(Side::Target),
            ),
        ];
        Self {
            tab_id,
            policy: OffloadPolicy::new(config.offload_threshold_rows),
            config,
            store: AlignedStore::new(model),
            panels,
            seq: Sequences::default(),
            focus: None,
            caret: None,
            last_edit_at: None,
            metadata_stale: false,
            deferred: None,
            queued_copies: Vec::new(),
            copy_in_flight: false,
            preserver: CaretScrollPreserver::default(),
            scroll: ScrollCoordinator::default(),
            search: Default::default(),
            pairs: Default::default(),
            effects: Vec::new(),
            disposed: false,
        }
    }

    pub fn model(&self) -> &AlignedDiffResult {
        self.store.current()
    }

    pub fn panel(&self, side: Side) -> &PanelState {
        &self.panels[side.index()]
    }

    pub fn panel_mut(&mut self, side: Side) -> &mut PanelState {
        &mut self.panels[side.index()]
    }

    pub fn document_id(&self, side: Side) -> &DocumentId {
        &self.panels[side.index()].document_id
    }

    /// Focus is inside a pane and the last keystroke is within the hold
    /// window.
    pub fn is_actively_editing(&self, now: Instant) -> bool {
        match (self.focus, self.last_edit_at) {
            (Some(_), Some(at)) => now.saturating_duration_since(at) < self.config.editing_hold(),
            _ => false,
        }
    }

    /// No pane has a commit scheduled, in flight or waiting to replay.
    pub fn commits_settled(&self) -> bool {
        self.panels.iter().all(|panel| {
            !(panel.commit.scheduled || panel.commit.in_flight || panel.commit.replay)
        })
    }

    pub fn is_current(&self, origin: ResultOrigin) -> bool {
        match origin {
            ResultOrigin::Commit(seq) => seq == self.seq.commit,
            ResultOrigin::Refresh(seq) => seq == self.seq.refresh,
        }
    }
}
