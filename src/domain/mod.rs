//! Domain types for pairdiff.
//! The aligned two-pane model and the snapshots that travel with it.

pub mod aligned;
pub mod error;
pub mod snapshot;

pub use aligned::*;
pub use error::*;
pub use snapshot::*;
