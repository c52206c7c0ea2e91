//! Publish/subscribe channel scoped to one editor session.

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::services::HistoryAction;
use crate::domain::{DocumentId, Side, TabId};

const BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", content = "data", rename_all = "snake_case")]
pub enum SessionSignal {
    /// A backing document's content changed.
    DocumentChanged { document_id: DocumentId },
    /// Undo or redo was requested for one pane of one tab.
    HistoryActionRequested {
        tab_id: TabId,
        side: Side,
        action: HistoryAction,
    },
}

/// Cloneable handle; every clone publishes to the same subscribers.
#[derive(Debug, Clone)]
pub struct SessionBus {
    sender: broadcast::Sender<SessionSignal>,
}

impl SessionBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, signal: SessionSignal) {
        if self.sender.send(signal).is_err() {
            debug!(target: "bus", "signal dropped, no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionSignal> {
        self.sender.subscribe()
    }

    pub fn document_changed(&self, document_id: &DocumentId) {
        self.publish(SessionSignal::DocumentChanged {
            document_id: document_id.clone(),
        });
    }
}

impl Default for SessionBus {
    fn default() -> Self {
        Self::new()
    }
}
