//! Bounded concurrent downloading.
//!
//! Every eligible record gets its own task. Tasks are admitted by a
//! semaphore so that at most [`MAX_CONCURRENT_DOWNLOADS`] of them are
//! downloading at any time; the rest wait for a free permit.
//!
//! A task publishes a [`Progress`] snapshot when it is admitted, and another
//! one with its final status before giving up its permit. Consumers that
//! apply snapshots in order therefore never see more records downloading
//! than there are permits.
//!
//! Task failures are reported on the failing record only. A task that
//! panics is reported as failed as well, so that every scheduled record
//! reaches a final status.
//!
//! Each file name is claimed by the first record that maps to it. Later
//! records of the run with the same file name fail without touching the
//! file.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use thiserror::Error;
use tokio::{
    sync::{mpsc, Semaphore},
    task::{JoinHandle, JoinSet},
};
use uuid::Uuid;

use crate::{
    bridge::Bridge,
    events::Progress,
    gateway::Catalog,
    protocol::gateway::Track,
    resolver,
    track::{Status, TrackRecord},
    util,
};

/// Number of tracks downloaded at the same time.
pub const MAX_CONCURRENT_DOWNLOADS: usize = 3;

/// Extension of downloaded files.
pub const FILE_EXTENSION: &str = "mp3";

/// Why a single track could not be downloaded.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("file name already used by another track: {}", .0.display())]
    PathTaken(PathBuf),

    #[error(transparent)]
    Resolve(#[from] resolver::Error),

    #[error("failed to download file: {0}")]
    Transfer(#[source] crate::error::Error),

    #[error("failed to check {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where a track is saved to.
///
/// `{output_dir}/{title version} - {artists}.mp3`, with characters that are
/// not allowed in file names replaced.
#[must_use]
pub fn track_path(output_dir: &Path, track: &Track) -> PathBuf {
    let name = format!("{} - {}", track.full_title(), track.artists_string());
    output_dir.join(format!(
        "{}.{FILE_EXTENSION}",
        util::sanitize_filename(&name)
    ))
}

/// Starts downloading every record that is not skipped.
///
/// Must be called from within a Tokio runtime context. The returned
/// [`Bridge`] yields the progress of all started tasks, then completes.
/// The returned handle finishes once every task has finished, whether or
/// not the bridge is still being read.
pub fn run(
    catalog: Arc<dyn Catalog>,
    output_dir: &Path,
    records: &[TrackRecord],
) -> (Bridge, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let permits = Arc::new(Semaphore::new(MAX_CONCURRENT_DOWNLOADS));

    let mut claimed = HashSet::new();
    let mut tasks = JoinSet::new();
    for record in records.iter().filter(|record| !record.status.is_skipped()) {
        let path = track_path(output_dir, &record.track);
        let owns_path = claimed.insert(path.clone());
        if !owns_path {
            warn!("{}: {} is used by another track", record.track, path.display());
        }

        let task = Task {
            uid: record.uid,
            track: Arc::clone(&record.track),
            path,
            owns_path,
            catalog: Arc::clone(&catalog),
            events: tx.clone(),
        };
        tasks.spawn(task.run(Arc::clone(&permits)));
    }
    debug!(
        "scheduled {} of {} tracks, {MAX_CONCURRENT_DOWNLOADS} at a time",
        tasks.len(),
        records.len()
    );

    // The channel closes once the last task has dropped its sender.
    drop(tx);
    let supervisor = tokio::spawn(supervise(tasks));

    (Bridge::new(rx), supervisor)
}

async fn supervise(mut tasks: JoinSet<()>) {
    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            error!("download task failed: {e}");
        }
    }
}

struct Task {
    uid: Uuid,
    track: Arc<Track>,
    path: PathBuf,
    owns_path: bool,
    catalog: Arc<dyn Catalog>,
    events: mpsc::UnboundedSender<Progress>,
}

impl Task {
    async fn run(self, permits: Arc<Semaphore>) {
        let permit = permits.acquire_owned().await;

        // Declared after the permit so that it reports before the permit is
        // released, also when unwinding.
        let mut reporter = Reporter {
            uid: self.uid,
            events: self.events.clone(),
            finished: false,
        };

        if let Err(ref e) = permit {
            reporter.finish(Status::Error, Some(e.to_string()), None);
            return;
        }

        reporter.send(Status::Downloading, None, None);
        debug!("downloading {}", self.track);

        match self.download().await {
            Ok(path) => {
                info!("downloaded {}", path.display());
                reporter.finish(Status::Downloaded, None, Some(path));
            }
            Err(DownloadError::AlreadyExists(path)) => {
                info!("skipping {}: file already exists", self.track);
                reporter.finish(Status::AlreadyExists, None, Some(path));
            }
            Err(e) => {
                warn!("{}: {e}", self.track);
                reporter.finish(Status::Error, Some(e.to_string()), None);
            }
        }
    }

    async fn download(&self) -> Result<PathBuf, DownloadError> {
        let path = self.path.clone();
        if !self.owns_path {
            return Err(DownloadError::PathTaken(path));
        }

        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|source| DownloadError::Io {
                path: path.clone(),
                source,
            })?;
        if exists {
            return Err(DownloadError::AlreadyExists(path));
        }

        let link = resolver::resolve(self.catalog.as_ref(), &self.track.id).await?;
        self.catalog
            .download_to_file(&link.to_string(), &path)
            .await
            .map_err(DownloadError::Transfer)?;

        Ok(path)
    }
}

/// Publishes the snapshots of one task.
///
/// A task that ends without a final status, because it panicked, is
/// reported as failed when the reporter is dropped.
struct Reporter {
    uid: Uuid,
    events: mpsc::UnboundedSender<Progress>,
    finished: bool,
}

impl Reporter {
    fn send(&self, status: Status, error: Option<String>, saved_path: Option<PathBuf>) {
        let progress = Progress {
            uid: self.uid,
            status,
            error,
            saved_path,
        };

        // The receiver is gone when nobody is interested in the run anymore.
        if self.events.send(progress).is_err() {
            trace!("dropping progress of {}: no receiver", self.uid);
        }
    }

    fn finish(&mut self, status: Status, error: Option<String>, saved_path: Option<PathBuf>) {
        self.finished = true;
        self.send(status, error, saved_path);
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        if !self.finished {
            self.finish(Status::Error, Some("download task failed".to_owned()), None);
        }
    }
}
