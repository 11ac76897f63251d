//! The tracks of a download session.
//!
//! [`Downloads`] owns every [`TrackRecord`] of the session and is the only
//! place where records change. Download tasks work on snapshots of the
//! records they were given and report back through [`Event`]s, which the
//! consumer feeds into [`Downloads::apply`]:
//!
//! ```rust
//! let mut downloads = Downloads::new(&config.output_dir);
//! downloads.ingest(tracks);
//!
//! let mut bridge = downloads.run(catalog).await?;
//! loop {
//!     let event = bridge.next().await;
//!     downloads.apply(&event);
//!     if event.is_complete() {
//!         break;
//!     }
//! }
//! ```

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    bridge::Bridge,
    dedup,
    error::{Error, Result},
    events::Event,
    gateway::Catalog,
    protocol::gateway::Track,
    scheduler,
    track::{RunCounters, Status, TrackRecord},
};

#[derive(Debug)]
pub struct Downloads {
    records: Vec<TrackRecord>,
    counters: RunCounters,
    output_dir: PathBuf,
    supervisor: Option<JoinHandle<()>>,
}

impl Downloads {
    /// Longest text returned by [`Downloads::info`], in characters.
    const INFO_MAX_LEN: usize = 70;

    /// Suffix of truncated info text.
    const ELLIPSIS: &'static str = "...";

    #[must_use]
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            records: Vec::new(),
            counters: RunCounters::default(),
            output_dir: output_dir.as_ref().to_path_buf(),
            supervisor: None,
        }
    }

    /// Adds tracks to the session.
    ///
    /// Each track gets its own record, also when it repeats another track.
    /// Repeats are marked as duplicates, and all records are then ordered
    /// by title.
    pub fn ingest<I>(&mut self, tracks: I)
    where
        I: IntoIterator<Item = Track>,
    {
        let before = self.records.len();
        self.records.extend(tracks.into_iter().map(TrackRecord::new));

        let duplicates = dedup::find_duplicates(&mut self.records);
        self.records
            .sort_by_cached_key(|record| record.track.full_title());
        self.counters = RunCounters::count(&self.records);

        debug!(
            "ingested {} tracks, {duplicates} duplicates, {} downloadable",
            self.records.len() - before,
            self.counters.downloadable
        );
    }

    /// Makes every finished record downloadable again.
    ///
    /// Duplicates and tracks that are not available are left alone.
    ///
    /// Returns the number of records that were reset.
    pub fn reset(&mut self) -> usize {
        let reset = self
            .records
            .iter_mut()
            .map(TrackRecord::reset)
            .filter(|changed| *changed)
            .count();
        self.counters = RunCounters::count(&self.records);
        reset
    }

    /// Starts downloading every downloadable record.
    ///
    /// Resets the session first, and creates the output directory when it
    /// does not exist yet. If that fails, the run still starts and every
    /// track fails on its own.
    ///
    /// # Errors
    ///
    /// Returns a failed precondition error if a run is in progress.
    pub async fn run(&mut self, catalog: Arc<dyn Catalog>) -> Result<Bridge> {
        if self.is_running() {
            return Err(Error::failed_precondition(
                "a download run is already in progress",
            ));
        }

        self.reset();

        if let Err(e) = tokio::fs::create_dir_all(&self.output_dir).await {
            error!(
                "could not create output directory {}: {e}",
                self.output_dir.display()
            );
        }

        info!(
            "downloading {} tracks to {}",
            self.counters.downloadable,
            self.output_dir.display()
        );

        let (bridge, supervisor) = scheduler::run(catalog, &self.output_dir, &self.records);
        self.supervisor = Some(supervisor);

        Ok(bridge)
    }

    /// Applies an event of the current run.
    ///
    /// Returns the record that changed, if any.
    pub fn apply(&mut self, event: &Event) -> Option<&TrackRecord> {
        match event {
            Event::Progress(progress) => {
                let Some(index) = self.position(progress.uid) else {
                    warn!("progress for unknown track {}", progress.uid);
                    return None;
                };

                progress.apply_to(&mut self.records[index]);
                self.counters.recount_progress(&self.records);
                Some(&self.records[index])
            }

            Event::Complete => {
                if self.supervisor.take().is_some() {
                    info!(
                        "run complete: {} of {} downloaded, {} errors",
                        self.count(Status::Downloaded),
                        self.counters.downloadable,
                        self.counters.errors
                    );
                }
                None
            }
        }
    }

    /// Whether the tasks of a started run are still going.
    ///
    /// A run whose bridge was dropped stops running once its last task has
    /// finished.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.supervisor
            .as_ref()
            .is_some_and(|supervisor| !supervisor.is_finished())
    }

    #[must_use]
    pub fn counters(&self) -> RunCounters {
        self.counters
    }

    /// All records, in display order.
    #[must_use]
    pub fn records(&self) -> &[TrackRecord] {
        &self.records
    }

    /// The records to display, optionally without duplicates.
    pub fn visible(&self, hide_duplicates: bool) -> impl Iterator<Item = &TrackRecord> {
        self.records
            .iter()
            .filter(move |record| !(hide_duplicates && record.status == Status::Duplicate))
    }

    #[must_use]
    pub fn get(&self, uid: Uuid) -> Option<&TrackRecord> {
        self.position(uid).map(|index| &self.records[index])
    }

    /// Short description of a record for display.
    ///
    /// Longer descriptions are cut off with an ellipsis.
    #[must_use]
    pub fn info(&self, uid: Uuid) -> Option<String> {
        let info = self.get(uid)?.info();
        let info = if info.chars().count() > Self::INFO_MAX_LEN {
            let keep = Self::INFO_MAX_LEN - Self::ELLIPSIS.len();
            let mut truncated: String = info.chars().take(keep).collect();
            truncated.push_str(Self::ELLIPSIS);
            truncated
        } else {
            info
        };

        Some(info.trim().to_owned())
    }

    /// Completed share of the downloadable records, in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.counters.fraction()
    }

    fn position(&self, uid: Uuid) -> Option<usize> {
        self.records.iter().position(|record| record.uid == uid)
    }

    fn count(&self, status: Status) -> usize {
        self.records
            .iter()
            .filter(|record| record.status == status)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{error::ErrorKind, gateway::testing::FakeCatalog, protocol::gateway::Artist};

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

    async fn drain(downloads: &mut Downloads, mut bridge: Bridge) -> usize {
        let mut events = 0;
        loop {
            let event = bridge.next().await;
            downloads.apply(&event);
            if event.is_complete() {
                return events;
            }
            events += 1;

            let downloading = downloads
                .records()
                .iter()
                .filter(|record| record.status == Status::Downloading)
                .count();
            assert!(downloading <= scheduler::MAX_CONCURRENT_DOWNLOADS);
        }
    }

    #[test]
    fn ingest_dedups_and_sorts() {
        let mut downloads = Downloads::new("unused");
        downloads.ingest([
            track("3", "Charlie", true),
            track("1", "Alpha", true),
            track("2", "Bravo", false),
            track("1", "Alpha", true),
        ]);

        let titles: Vec<_> = downloads
            .records()
            .iter()
            .map(|record| (record.track.title.as_str(), record.status))
            .collect();
        assert_eq!(
            titles,
            [
                ("Alpha", Status::Ready),
                ("Alpha", Status::Duplicate),
                ("Bravo", Status::NotAvailable),
                ("Charlie", Status::Ready),
            ]
        );

        let counters = downloads.counters();
        assert_eq!(counters.total, 4);
        assert_eq!(counters.downloadable, 2);
        assert_eq!(downloads.visible(true).count(), 3);
        assert_eq!(downloads.visible(false).count(), 4);
    }

    #[test]
    fn later_ingest_keeps_first_occurrence() {
        let mut downloads = Downloads::new("unused");
        downloads.ingest([track("2", "B", true)]);
        downloads.ingest([track("1", "A", true), track("2", "B", true)]);

        let statuses: Vec<_> = downloads.records().iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            [Status::Ready, Status::Ready, Status::Duplicate]
        );
    }

    #[test]
    fn info_is_truncated() {
        let mut downloads = Downloads::new("unused");
        downloads.ingest([track("1", &"x".repeat(100), true), track("2", "Short", true)]);

        let long = downloads.records()[0].uid;
        let info = downloads.info(long).unwrap();
        assert_eq!(info.chars().count(), 70);
        assert!(info.ends_with("..."));

        let short = downloads.records()[1].uid;
        assert_eq!(downloads.info(short).unwrap(), "Short - Artist");
        assert_eq!(downloads.info(Uuid::new_v4()), None);
    }

    #[tokio::test]
    async fn duplicates_are_not_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let mut downloads = Downloads::new(dir.path());
        downloads.ingest([track("1", "X", true), track("1", "X", true)]);

        assert_eq!(downloads.records()[0].status, Status::Ready);
        assert_eq!(downloads.records()[1].status, Status::Duplicate);

        let catalog = Arc::new(FakeCatalog::default());
        let bridge = downloads.run(catalog.clone()).await.unwrap();
        assert_eq!(drain(&mut downloads, bridge).await, 2);

        let counters = downloads.counters();
        assert_eq!(counters.total, 2);
        assert_eq!(counters.downloadable, 1);
        assert_eq!(counters.completed, 1);
        assert_eq!(counters.errors, 0);
        assert_eq!(downloads.records()[0].status, Status::Downloaded);
        assert_eq!(downloads.records()[1].status, Status::Duplicate);
        assert!((downloads.progress() - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("nested").join("downloads");
        let mut downloads = Downloads::new(&output_dir);
        downloads.ingest([track("1", "X", true)]);

        let bridge = downloads
            .run(Arc::new(FakeCatalog::default()))
            .await
            .unwrap();
        drain(&mut downloads, bridge).await;

        assert!(output_dir.join("X - Artist.mp3").exists());
    }

    #[tokio::test]
    async fn one_run_at_a_time() {
        let dir = tempfile::tempdir().unwrap();
        let mut downloads = Downloads::new(dir.path());
        downloads.ingest([track("1", "X", true)]);
        let catalog = Arc::new(FakeCatalog::default());

        let bridge = downloads.run(catalog.clone()).await.unwrap();
        assert!(downloads.is_running());
        let err = downloads.run(catalog.clone()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::FailedPrecondition);

        drain(&mut downloads, bridge).await;
        assert!(!downloads.is_running());
        assert!(downloads.run(catalog).await.is_ok());
    }

    #[tokio::test]
    async fn abandoned_run_does_not_block_the_next() {
        let dir = tempfile::tempdir().unwrap();
        let mut downloads = Downloads::new(dir.path());
        downloads.ingest([track("1", "X", true), track("2", "Y", true)]);
        let catalog = Arc::new(FakeCatalog::default().with_delay(Duration::from_millis(10)));

        let bridge = downloads.run(catalog.clone()).await.unwrap();
        drop(bridge);

        tokio::time::timeout(Duration::from_secs(5), async {
            while downloads.is_running() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        let bridge = downloads.run(catalog).await.unwrap();
        drain(&mut downloads, bridge).await;
        assert!(!downloads.is_running());
        assert_eq!(downloads.count(Status::AlreadyExists), 2);
    }

    #[tokio::test]
    async fn unusable_output_dir_fails_every_track() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("file");
        std::fs::write(&output_dir, b"x").unwrap();

        let mut downloads = Downloads::new(&output_dir);
        downloads.ingest([track("1", "X", true), track("2", "Y", true)]);

        let bridge = downloads
            .run(Arc::new(FakeCatalog::default()))
            .await
            .unwrap();
        assert_eq!(drain(&mut downloads, bridge).await, 4);

        assert_eq!(downloads.count(Status::Error), 2);
        assert_eq!(downloads.counters().errors, 2);
        assert!(output_dir.is_file());
    }

    #[tokio::test]
    async fn rerun_resets_and_finds_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut downloads = Downloads::new(dir.path());
        downloads.ingest([
            track("1", "A", true),
            track("2", "B", true),
            track("3", "C", false),
            track("1", "D", true),
        ]);
        let catalog = Arc::new(FakeCatalog::default().failing_download("2"));

        let bridge = downloads.run(catalog.clone()).await.unwrap();
        drain(&mut downloads, bridge).await;

        let statuses: Vec<_> = downloads.records().iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            [
                Status::Downloaded,
                Status::Error,
                Status::NotAvailable,
                Status::Duplicate
            ]
        );
        assert_eq!(downloads.counters().errors, 1);

        assert_eq!(downloads.reset(), 2);
        let statuses: Vec<_> = downloads.records().iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            [
                Status::Ready,
                Status::Ready,
                Status::NotAvailable,
                Status::Duplicate
            ]
        );
        assert_eq!(downloads.records()[0].saved_path, None);
        assert_eq!(downloads.records()[1].error, None);

        let calls = catalog.calls();
        let bridge = downloads.run(catalog.clone()).await.unwrap();
        drain(&mut downloads, bridge).await;

        let first = &downloads.records()[0];
        assert_eq!(first.status, Status::AlreadyExists);
        assert!(downloads
            .info(first.uid)
            .unwrap()
            .starts_with("file already exists: "));

        // Only the failed track went back to the catalog.
        assert_eq!(catalog.calls() - calls, 3);

        let counters = downloads.counters();
        assert_eq!(counters.downloadable, 2);
        assert_eq!(counters.completed, 2);
        assert_eq!(counters.errors, 2);
    }

    #[test]
    fn blocking_consumer() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let mut downloads = Downloads::new(dir.path());
        downloads.ingest((0..5).map(|i| track(&i.to_string(), &format!("Song {i}"), true)));

        let catalog = Arc::new(FakeCatalog::default());
        let mut bridge = runtime.block_on(downloads.run(catalog)).unwrap();

        let mut events = 0;
        loop {
            let event = bridge.blocking_next();
            downloads.apply(&event);
            if event.is_complete() {
                break;
            }
            events += 1;
        }

        assert_eq!(events, 10);
        assert_eq!(downloads.counters().completed, 5);
        assert!(!downloads.is_running());
    }
}
