//! In-process document backend.
//!
//! Implements every service seam against documents held in memory. The CLI
//! and the tests run sessions against it; a desktop shell would swap in IPC
//! clients with the same traits.

pub mod align;
pub mod pairs;

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

use super::bus::SessionBus;
use super::services::{
    AlignedRows, ApplyEditRequest, ApplyEditResponse, CompareService, CopyLinesRequest,
    CopyLinesResponse, EditApplyService, EditHistoryState, HistoryService, PairMatchService,
    PanelCopyService, PreviewService, SearchService,
};
use crate::application::metadata::compute_metadata;
use crate::application::pair::PairMatch;
use crate::application::search::SearchMatches;
use crate::domain::{
    DocumentError, DocumentId, RawAlignedDiff, Side, extract_real_lines, infer_trailing_newline,
    serialize, split_lines,
};

#[derive(Debug, Clone)]
struct Document {
    text: String,
    saved_text: String,
    undo: Vec<String>,
    redo: Vec<String>,
}

impl Document {
    fn new(text: String) -> Self {
        Self {
            saved_text: text.clone(),
            text,
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }

    fn is_dirty(&self) -> bool {
        self.text != self.saved_text
    }

    fn line_count(&self) -> usize {
        self.text.split('\n').count()
    }
}

/// Documents keyed by id, with undo history and dirty tracking.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    documents: Mutex<HashMap<DocumentId, Document>>,
    bus: Option<SessionBus>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `DocumentChanged` on `bus` whenever a document changes.
    pub fn with_bus(bus: SessionBus) -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
            bus: Some(bus),
        }
    }

    pub fn open(&self, text: impl Into<String>) -> DocumentId {
        let id = Uuid::new_v4().to_string();
        self.documents
            .lock()
            .insert(id.clone(), Document::new(text.into()));
        id
    }

    pub fn text(&self, document_id: &DocumentId) -> Result<String, DocumentError> {
        self.documents
            .lock()
            .get(document_id)
            .map(|doc| doc.text.clone())
            .ok_or_else(|| DocumentError::NotFound(document_id.clone()))
    }

    pub fn is_dirty(&self, document_id: &DocumentId) -> Result<bool, DocumentError> {
        self.documents
            .lock()
            .get(document_id)
            .map(Document::is_dirty)
            .ok_or_else(|| DocumentError::NotFound(document_id.clone()))
    }

    /// Replaces a document's text, recording undo history. Returns whether
    /// the text changed.
    pub fn write(&self, document_id: &DocumentId, text: String) -> Result<bool, DocumentError> {
        let changed = {
            let mut documents = self.documents.lock();
            let doc = documents
                .get_mut(document_id)
                .ok_or_else(|| DocumentError::NotFound(document_id.clone()))?;
            if doc.text == text {
                false
            } else {
                let previous = std::mem::replace(&mut doc.text, text);
                doc.undo.push(previous);
                doc.redo.clear();
                true
            }
        };
        if changed {
            self.notify(document_id);
        }
        Ok(changed)
    }

    fn notify(&self, document_id: &DocumentId) {
        if let Some(bus) = &self.bus {
            bus.document_changed(document_id);
        }
    }

    fn align(&self, source_id: &DocumentId, target_id: &DocumentId) -> Result<RawAlignedDiff> {
        let source = self.text(source_id)?;
        let target = self.text(target_id)?;
        Ok(align::align_texts(&source, &target).into())
    }

    fn step_history(&self, document_id: &DocumentId, redo: bool) -> Result<usize> {
        let line_count = {
            let mut documents = self.documents.lock();
            let doc = documents
                .get_mut(document_id)
                .ok_or_else(|| DocumentError::NotFound(document_id.clone()))?;
            let (from, to) = if redo {
                (&mut doc.redo, &mut doc.undo)
            } else {
                (&mut doc.undo, &mut doc.redo)
            };
            let Some(text) = from.pop() else {
                return Err(DocumentError::HistoryEmpty {
                    document_id: document_id.clone(),
                    action: if redo { "redo" } else { "undo" },
                }
                .into());
            };
            to.push(std::mem::replace(&mut doc.text, text));
            doc.line_count()
        };
        self.notify(document_id);
        Ok(line_count)
    }
}

fn side_text(rows: &AlignedRows, side: Side, trailing_newline: Option<bool>) -> String {
    let lines = extract_real_lines(rows.lines(side), rows.present(side));
    let trailing_newline =
        trailing_newline.unwrap_or_else(|| infer_trailing_newline(lines.len(), &lines));
    serialize(&lines, trailing_newline)
}

#[async_trait]
impl CompareService for InMemoryBackend {
    async fn compare(
        &self,
        source_id: &DocumentId,
        target_id: &DocumentId,
    ) -> Result<RawAlignedDiff> {
        self.align(source_id, target_id)
    }
}

#[async_trait]
impl EditApplyService for InMemoryBackend {
    async fn apply_edit(&self, request: ApplyEditRequest) -> Result<ApplyEditResponse> {
        let edited = request.edited_side;
        for side in Side::BOTH {
            let trailing = (side == edited).then_some(request.edited_trailing_newline);
            let text = side_text(&request.rows, side, trailing);
            let document_id = match side {
                Side::Source => &request.source_id,
                Side::Target => &request.target_id,
            };
            if self.write(document_id, text)? {
                debug!(target: "backend", "applied edit to {} document {}", side, document_id);
            }
        }

        Ok(ApplyEditResponse {
            result: self.align(&request.source_id, &request.target_id)?,
            source_is_dirty: self.is_dirty(&request.source_id)?,
            target_is_dirty: self.is_dirty(&request.target_id)?,
        })
    }
}

#[async_trait]
impl PanelCopyService for InMemoryBackend {
    async fn copy_lines(&self, request: CopyLinesRequest) -> Result<CopyLinesResponse> {
        let row_count = request.rows.aligned_source_lines.len();
        if request.start_row > request.end_row || request.end_row >= row_count {
            return Err(DocumentError::InvalidRange {
                start: request.start_row,
                end: request.end_row,
                row_count,
            }
            .into());
        }

        let mut rows = request.rows.clone();
        let (from_lines, from_present) = (
            request.rows.lines(request.from_side),
            request.rows.present(request.from_side),
        );
        let (to_lines, to_present) = match request.to_side {
            Side::Source => (
                &mut rows.aligned_source_lines,
                &mut rows.aligned_source_present,
            ),
            Side::Target => (
                &mut rows.aligned_target_lines,
                &mut rows.aligned_target_present,
            ),
        };
        to_lines.resize(row_count, String::new());
        to_present.resize(row_count, true);
        for row in request.start_row..=request.end_row {
            let present = from_present.get(row).copied().unwrap_or(true);
            to_lines[row] = if present {
                from_lines.get(row).cloned().unwrap_or_default()
            } else {
                String::new()
            };
            to_present[row] = present;
        }

        let document_id = match request.to_side {
            Side::Source => &request.source_id,
            Side::Target => &request.target_id,
        };
        let changed = self.write(document_id, side_text(&rows, request.to_side, None))?;

        Ok(CopyLinesResponse {
            result: self.align(&request.source_id, &request.target_id)?,
            changed,
        })
    }
}

#[async_trait]
impl PreviewService for InMemoryBackend {
    async fn preview_metadata(&self, rows: AlignedRows) -> Result<RawAlignedDiff> {
        let metadata = compute_metadata(
            &rows.aligned_source_lines,
            &rows.aligned_target_lines,
            &rows.aligned_source_present,
            &rows.aligned_target_present,
        );
        Ok(RawAlignedDiff {
            source_line_numbers_by_aligned_row: Some(metadata.source_line_numbers_by_aligned_row),
            target_line_numbers_by_aligned_row: Some(metadata.target_line_numbers_by_aligned_row),
            aligned_diff_kinds: Some(metadata.aligned_diff_kinds),
            diff_line_numbers: Some(metadata.diff_line_numbers),
            source_diff_line_numbers: Some(metadata.source_diff_line_numbers),
            target_diff_line_numbers: Some(metadata.target_diff_line_numbers),
            diff_row_indexes: Some(metadata.diff_row_indexes),
            source_line_count: Some(metadata.source_line_count),
            target_line_count: Some(metadata.target_line_count),
            aligned_line_count: Some(metadata.aligned_line_count),
            ..Default::default()
        })
    }
}

#[async_trait]
impl SearchService for InMemoryBackend {
    async fn search_matches(
        &self,
        document_id: &DocumentId,
        keyword: &str,
        presence: &[bool],
    ) -> Result<SearchMatches> {
        let needle = keyword.to_lowercase();
        let text = self.text(document_id)?;
        let line_numbers: Vec<usize> = split_lines(&text)
            .iter()
            .enumerate()
            .filter(|(_, line)| line.to_lowercase().contains(&needle))
            .map(|(index, _)| index + 1)
            .collect();

        if presence.is_empty() {
            return Ok(SearchMatches::LineNumbers(line_numbers));
        }

        let real_rows: Vec<usize> = presence
            .iter()
            .enumerate()
            .filter(|(_, present)| **present)
            .map(|(row, _)| row)
            .collect();
        Ok(SearchMatches::Rows(
            line_numbers
                .into_iter()
                .filter_map(|line| real_rows.get(line - 1).copied())
                .collect(),
        ))
    }
}

#[async_trait]
impl PairMatchService for InMemoryBackend {
    async fn find_matching_pair(&self, text: &str, offset: usize) -> Result<Option<PairMatch>> {
        Ok(pairs::find_pair(text, offset))
    }
}

#[async_trait]
impl HistoryService for InMemoryBackend {
    async fn undo(&self, document_id: &DocumentId) -> Result<usize> {
        self.step_history(document_id, false)
    }

    async fn redo(&self, document_id: &DocumentId) -> Result<usize> {
        self.step_history(document_id, true)
    }

    async fn edit_history_state(&self, document_id: &DocumentId) -> Result<EditHistoryState> {
        Ok(EditHistoryState {
            is_dirty: self.is_dirty(document_id)?,
        })
    }

    async fn save(&self, document_id: &DocumentId) -> Result<()> {
        let mut documents = self.documents.lock();
        let doc = documents
            .get_mut(document_id)
            .ok_or_else(|| DocumentError::NotFound(document_id.clone()))?;
        doc.saved_text = doc.text.clone();
        Ok(())
    }
}
