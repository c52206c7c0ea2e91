//! Mirrors vertical scroll between the two panes.

use crate::domain::aligned::Side;
use crate::domain::snapshot::PanelScrollSnapshot;

/// Scroll event reported by the view for one pane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollEvent {
    pub side: Side,
    pub top: f64,
    pub left: f64,
    /// Largest reachable `top` of the scrolled pane.
    pub max_top: f64,
    /// Largest reachable `top` of the other pane.
    pub other_max_top: f64,
}

/// Offset the view should write to the other pane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMirror {
    pub side: Side,
    pub top: f64,
    pub left: f64,
}

#[derive(Debug, Default)]
pub struct ScrollCoordinator {
    offsets: PanelScrollSnapshot,
    suppress_echo: Option<Side>,
}

impl ScrollCoordinator {
    pub fn offsets(&self) -> PanelScrollSnapshot {
        self.offsets
    }

    /// Records the event and returns the mirrored write, unless the event is
    /// the echo of a write this coordinator issued itself.
    pub fn on_scroll(&mut self, event: ScrollEvent) -> Option<ScrollMirror> {
        self.offsets.set(event.side, event.top, event.left);

        if self.suppress_echo == Some(event.side) {
            self.suppress_echo = None;
            return None;
        }

        let ratio = if event.max_top > 0.0 {
            (event.top / event.max_top).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let other = event.side.other();
        let mirror = ScrollMirror {
            side: other,
            top: ratio * event.other_max_top.max(0.0),
            left: event.left,
        };
        self.offsets.set(other, mirror.top, mirror.left);
        self.suppress_echo = Some(other);
        Some(mirror)
    }

    /// Drops the echo guard on the next idle tick.
    pub fn on_idle(&mut self) {
        self.suppress_echo = None;
    }

    /// Overwrites both offsets, used when restoring a snapshot.
    pub fn restore(&mut self, snapshot: PanelScrollSnapshot) {
        self.offsets = snapshot;
    }
}
