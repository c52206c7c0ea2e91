//! Seams to the services the sync engine consumes.
//!
//! Every call is an asynchronous request/response across a process
//! boundary. Alignments come back in their raw wire form and are normalized
//! by the caller, so a partial response never fails a call.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::application::pair::PairMatch;
use crate::application::search::SearchMatches;
use crate::domain::{AlignedDiffResult, DocumentId, RawAlignedDiff, Side};

/// The four authoritative row arrays of an alignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignedRows {
    pub aligned_source_lines: Vec<String>,
    pub aligned_target_lines: Vec<String>,
    pub aligned_source_present: Vec<bool>,
    pub aligned_target_present: Vec<bool>,
}

impl AlignedRows {
    pub fn of(model: &AlignedDiffResult) -> Self {
        AlignedRows {
            aligned_source_lines: model.aligned_source_lines.clone(),
            aligned_target_lines: model.aligned_target_lines.clone(),
            aligned_source_present: model.aligned_source_present.clone(),
            aligned_target_present: model.aligned_target_present.clone(),
        }
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
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyEditRequest {
    pub source_id: DocumentId,
    pub target_id: DocumentId,
    pub edited_side: Side,
    #[serde(flatten)]
    pub rows: AlignedRows,
    pub edited_trailing_newline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyEditResponse {
    pub result: RawAlignedDiff,
    pub source_is_dirty: bool,
    pub target_is_dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyLinesRequest {
    pub source_id: DocumentId,
    pub target_id: DocumentId,
    pub from_side: Side,
    pub to_side: Side,
    /// First aligned row to copy.
    pub start_row: usize,
    /// Last aligned row to copy, inclusive.
    pub end_row: usize,
    #[serde(flatten)]
    pub rows: AlignedRows,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyLinesResponse {
    pub result: RawAlignedDiff,
    pub changed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditHistoryState {
    pub is_dirty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Undo,
    Redo,
}

/// Full re-diff of two backing documents.
#[async_trait]
pub trait CompareService: Send + Sync {
    async fn compare(&self, source_id: &DocumentId, target_id: &DocumentId)
    -> Result<RawAlignedDiff>;
}

/// Commits a locally edited alignment into both backing documents.
#[async_trait]
pub trait EditApplyService: Send + Sync {
    async fn apply_edit(&self, request: ApplyEditRequest) -> Result<ApplyEditResponse>;
}

/// Copies a row range from one pane into the other.
#[async_trait]
pub trait PanelCopyService: Send + Sync {
    async fn copy_lines(&self, request: CopyLinesRequest) -> Result<CopyLinesResponse>;
}

/// Classification-only recompute for large documents.
#[async_trait]
pub trait PreviewService: Send + Sync {
    async fn preview_metadata(&self, rows: AlignedRows) -> Result<RawAlignedDiff>;
}

#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search_matches(
        &self,
        document_id: &DocumentId,
        keyword: &str,
        presence: &[bool],
    ) -> Result<SearchMatches>;
}

#[async_trait]
pub trait PairMatchService: Send + Sync {
    async fn find_matching_pair(&self, text: &str, offset: usize) -> Result<Option<PairMatch>>;
}

/// Undo/redo and persistence of a backing document.
#[async_trait]
pub trait HistoryService: Send + Sync {
    /// Returns the document's line count after the undo.
    async fn undo(&self, document_id: &DocumentId) -> Result<usize>;
    /// Returns the document's line count after the redo.
    async fn redo(&self, document_id: &DocumentId) -> Result<usize>;
    async fn edit_history_state(&self, document_id: &DocumentId) -> Result<EditHistoryState>;
    async fn save(&self, document_id: &DocumentId) -> Result<()>;
}

/// The full set of collaborators one diff session talks to.
#[derive(Clone)]
pub struct Services {
    pub compare: Arc<dyn CompareService>,
    pub edits: Arc<dyn EditApplyService>,
    pub copy: Arc<dyn PanelCopyService>,
    pub preview: Arc<dyn PreviewService>,
    pub search: Arc<dyn SearchService>,
    pub pairs: Arc<dyn PairMatchService>,
    pub history: Arc<dyn HistoryService>,
}

impl Services {
    /// Routes every service to one backend.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: CompareService
            + EditApplyService
            + PanelCopyService
            + PreviewService
            + SearchService
            + PairMatchService
            + HistoryService
            + 'static,
    {
        Services {
            compare: backend.clone(),
            edits: backend.clone(),
            copy: backend.clone(),
            preview: backend.clone(),
            search: backend.clone(),
            pairs: backend.clone(),
            history: backend,
        }
    }
}
