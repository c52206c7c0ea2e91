//! The authoritative aligned model of a session.

use tokio::sync::watch;

use crate::domain::AlignedDiffResult;

/// Holds the current [`AlignedDiffResult`] and bumps a revision counter on
/// every change.
///
/// Reads through [`AlignedStore::current`] are synchronous and always see the
/// latest value; views wait on the watch channel to learn when to re-render.
#[derive(Debug)]
pub struct AlignedStore {
    model: AlignedDiffResult,
    revision: watch::Sender<u64>,
}

impl AlignedStore {
    pub fn new(model: AlignedDiffResult) -> Self {
        let (revision, _) = watch::channel(0);
        Self { model, revision }
    }

    pub fn current(&self) -> &AlignedDiffResult {
        &self.model
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn replace(&mut self, model: AlignedDiffResult) {
        self.model = model;
        self.bump();
    }

    pub fn mutate<R>(&mut self, update: impl FnOnce(&mut AlignedDiffResult) -> R) -> R {
        let result = update(&mut self.model);
        self.bump();
        result
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}
