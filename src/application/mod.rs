//! Engine logic with no I/O: local alignment prediction, classification,
//! caret/scroll bookkeeping, search and pair highlighting.

pub mod caret;
pub mod metadata;
pub mod pair;
pub mod reconcile;
pub mod scroll;
pub mod search;
