//! Per-track download records and their lifecycle.
//!
//! A [`TrackRecord`] is created once for every track that is ingested, and
//! lives for the rest of the session. Its [`Status`] moves through:
//!
//! ```text
//!              ingestion
//!     +------------+-------------+
//!     v            v             v
//!   Ready    NotAvailable    Duplicate      (frozen)
//!     |
//!     v            run
//! Downloading ---------> Downloaded | Error | AlreadyExists
//!     ^                                 |
//!     +------------- reset -------------+
//! ```

use std::{fmt, path::PathBuf, sync::Arc};

use uuid::Uuid;

use crate::protocol::gateway::Track;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Status {
    #[default]
    Ready,
    Downloading,
    Downloaded,
    Error,
    NotAvailable,
    Duplicate,
    AlreadyExists,
}

impl Status {
    /// Initial status of a freshly ingested track.
    #[must_use]
    pub fn initial(available: bool) -> Self {
        if available {
            Self::Ready
        } else {
            Self::NotAvailable
        }
    }

    /// Whether a run never schedules records in this status.
    #[must_use]
    pub fn is_skipped(self) -> bool {
        matches!(self, Self::Downloading | Self::Duplicate | Self::NotAvailable)
    }

    /// Whether a reset moves records in this status back to `Ready`.
    #[must_use]
    pub fn is_resettable(self) -> bool {
        matches!(
            self,
            Self::Downloaded | Self::Error | Self::Downloading | Self::AlreadyExists
        )
    }

    /// Whether a download task has finished with this status.
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Downloaded | Self::Error | Self::AlreadyExists)
    }

    /// Whether this status counts as a failure on the run's error counter.
    ///
    /// Tracks that were already on disk are counted here too.
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Error | Self::AlreadyExists)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Ready => "ready",
            Self::Downloading => "downloading",
            Self::Downloaded => "downloaded",
            Self::Error => "error",
            Self::NotAvailable => "not available",
            Self::Duplicate => "duplicate",
            Self::AlreadyExists => "already exists",
        };
        write!(f, "{label}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackRecord {
    /// Session-unique key, stable for the lifetime of the record.
    pub uid: Uuid,

    /// Catalog metadata; shared read-only with download tasks.
    pub track: Arc<Track>,

    pub status: Status,

    /// Set only when `status` is [`Status::Error`].
    pub error: Option<String>,

    /// Set only when the file was written or found on disk.
    pub saved_path: Option<PathBuf>,
}

impl TrackRecord {
    #[must_use]
    pub fn new(track: Track) -> Self {
        let status = Status::initial(track.available);
        Self {
            uid: Uuid::new_v4(),
            track: Arc::new(track),
            status,
            error: None,
            saved_path: None,
        }
    }

    /// Moves a finished record back to `Ready`, keeping frozen statuses.
    ///
    /// Returns whether the record changed.
    pub fn reset(&mut self) -> bool {
        if !self.status.is_resettable() {
            return false;
        }

        self.status = Status::Ready;
        self.error = None;
        self.saved_path = None;
        true
    }

    /// One-line description for display.
    ///
    /// The error message wins over the saved path, which wins over the
    /// track's title and artists.
    #[must_use]
    pub fn info(&self) -> String {
        if let Some(ref error) = self.error {
            return error.clone();
        }

        match (self.status, self.saved_path.as_ref()) {
            (Status::AlreadyExists, Some(path)) => {
                format!("file already exists: {}", path.display())
            }
            (_, Some(path)) => format!("Downloaded: {}", path.display()),
            (_, None) => format!(
                "{} - {}",
                self.track.full_title(),
                self.track.artists_string()
            ),
        }
    }
}

impl fmt::Display for TrackRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status, self.track)
    }
}

/// Counters of a download run, recomputed from the records.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RunCounters {
    pub total: usize,

    /// Records that were `Ready` when last recomputed from scratch.
    pub downloadable: usize,

    /// Records that finished downloading, successfully or not.
    pub completed: usize,

    pub errors: usize,
}

impl RunCounters {
    /// Counts `records` after ingestion or a reset.
    #[must_use]
    pub fn count<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a TrackRecord>,
    {
        let mut counters = Self::default();
        for record in records {
            counters.total += 1;
            if record.status == Status::Ready {
                counters.downloadable += 1;
            }
            counters.add_progress(record.status);
        }
        counters
    }

    /// Recounts `completed` and `errors`, keeping `total` and
    /// `downloadable`.
    pub fn recount_progress<'a, I>(&mut self, records: I)
    where
        I: IntoIterator<Item = &'a TrackRecord>,
    {
        self.completed = 0;
        self.errors = 0;
        for record in records {
            self.add_progress(record.status);
        }
    }

    fn add_progress(&mut self, status: Status) {
        if status.is_finished() {
            self.completed += 1;
        }
        if status.is_failure() {
            self.errors += 1;
        }
    }

    /// Completed share of the downloadable records, in `[0, 1]`.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.downloadable == 0 {
            return 0.0;
        }
        (self.completed as f64 / self.downloadable as f64).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::gateway::Artist;

    fn track(id: &str, title: &str, available: bool) -> Track {
        Track {
            id: id.parse().unwrap(),
            title: title.to_owned(),
            artists: vec![Artist {
                name: "Artist".to_owned(),
            }],
            available,
            ..Default::default()
        }
    }

    #[test]
    fn initial_status_follows_availability() {
        assert_eq!(TrackRecord::new(track("1", "X", true)).status, Status::Ready);
        assert_eq!(
            TrackRecord::new(track("1", "X", false)).status,
            Status::NotAvailable
        );
    }

    #[test]
    fn uids_are_unique() {
        let a = TrackRecord::new(track("1", "X", true));
        let b = TrackRecord::new(track("1", "X", true));
        assert_ne!(a.uid, b.uid);
    }

    #[test]
    fn reset_keeps_frozen_statuses() {
        for (status, expected) in [
            (Status::Downloaded, Status::Ready),
            (Status::Error, Status::Ready),
            (Status::AlreadyExists, Status::Ready),
            (Status::Downloading, Status::Ready),
            (Status::Ready, Status::Ready),
            (Status::Duplicate, Status::Duplicate),
            (Status::NotAvailable, Status::NotAvailable),
        ] {
            let mut record = TrackRecord::new(track("1", "X", true));
            record.status = status;
            record.error = Some("boom".to_owned());
            record.reset();
            assert_eq!(record.status, expected, "{status}");
        }
    }

    #[test]
    fn reset_clears_outcome() {
        let mut record = TrackRecord::new(track("1", "X", true));
        record.status = Status::Downloaded;
        record.saved_path = Some(PathBuf::from("downloads/X - Artist.mp3"));

        assert!(record.reset());
        assert_eq!(record.saved_path, None);
        assert_eq!(record.error, None);
    }

    #[test]
    fn info_prefers_error_over_path() {
        let mut record = TrackRecord::new(track("1", "X", true));
        assert_eq!(record.info(), "X - Artist");

        record.status = Status::Downloaded;
        record.saved_path = Some(PathBuf::from("out/X - Artist.mp3"));
        assert_eq!(record.info(), "Downloaded: out/X - Artist.mp3");

        record.status = Status::AlreadyExists;
        assert_eq!(record.info(), "file already exists: out/X - Artist.mp3");

        record.status = Status::Error;
        record.saved_path = None;
        record.error = Some("no download options available".to_owned());
        assert_eq!(record.info(), "no download options available");
    }

    #[test]
    fn counters_treat_already_exists_as_error() {
        let mut records: Vec<_> = (0..5)
            .map(|i| TrackRecord::new(track(&i.to_string(), "X", true)))
            .collect();

        let mut counters = RunCounters::count(&records);
        assert_eq!(counters.total, 5);
        assert_eq!(counters.downloadable, 5);
        assert_eq!(counters.fraction(), 0.0);

        records[0].status = Status::Downloaded;
        records[1].status = Status::AlreadyExists;
        records[2].status = Status::Error;
        records[3].status = Status::Downloading;
        counters.recount_progress(&records);

        assert_eq!(counters.downloadable, 5);
        assert_eq!(counters.completed, 3);
        assert_eq!(counters.errors, 2);
    }

    #[test]
    fn fraction_without_downloadable_records() {
        let records = vec![TrackRecord::new(track("1", "X", false))];
        assert_eq!(RunCounters::count(&records).fraction(), 0.0);
    }
}
