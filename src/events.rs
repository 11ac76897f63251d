//! Events emitted while a download run is in progress.
//!
//! Every scheduled track produces exactly two [`Event::Progress`] events:
//! one when its task starts downloading, and one when it reaches a final
//! status. [`Event::Complete`] follows once all tasks have finished.
//!
//! # Example
//!
//! ```rust
//! use yadl::events::Event;
//!
//! fn handle_event(event: Event) {
//!     match event {
//!         Event::Progress(progress) => println!("{}: {}", progress.uid, progress.status),
//!         Event::Complete => println!("all done"),
//!     }
//! }
//! ```

use std::path::PathBuf;

use uuid::Uuid;

use crate::track::{Status, TrackRecord};

/// Snapshot of one record's outcome, published by its download task.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Progress {
    /// The record this snapshot belongs to.
    pub uid: Uuid,
    pub status: Status,
    pub error: Option<String>,
    pub saved_path: Option<PathBuf>,
}

impl Progress {
    /// Writes this snapshot into its record.
    pub fn apply_to(&self, record: &mut TrackRecord) {
        record.status = self.status;
        record.error.clone_from(&self.error);
        record.saved_path.clone_from(&self.saved_path);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// A record changed status.
    Progress(Progress),

    /// Every task of the run has finished.
    ///
    /// No more events follow in this run.
    Complete,
}

impl Event {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}
