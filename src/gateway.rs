//! Access to the music catalog.
//!
//! The download engine only needs three operations from the catalog, which
//! make up the [`Catalog`] trait:
//! * list the encodings of a track
//! * fetch the location data of one encoding
//! * stream a signed download link to a file
//!
//! [`Gateway`] implements them over HTTP against the public catalog API, and
//! adds the metadata queries used to turn user input into tracks.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use crate::{
    config::Config,
    error::{Error, Result},
    http::Client as HttpClient,
    protocol::{
        self,
        gateway::{AccountStatus, EncodingOption, Location, Playlist, Response, Track, TrackId},
    },
    source::Source,
};

/// Catalog operations consumed by the download engine.
///
/// Implementations must be shareable between concurrently running download
/// tasks.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Lists the available encodings of a track.
    ///
    /// An empty list is not an error.
    async fn encodings(&self, track_id: &TrackId) -> Result<Vec<EncodingOption>>;

    /// Fetches the raw file location for an encoding's query URL.
    async fn location(&self, query_url: &Url) -> Result<Location>;

    /// Streams the body at `url` into the file at `path`.
    async fn download_to_file(&self, url: &str, path: &Path) -> Result<()>;
}

pub struct Gateway {
    http_client: HttpClient,
    base_url: Url,
}

impl Gateway {
    /// The URL of the catalog API.
    const API_URL: &'static str = "https://api.music.yandex.net";

    /// Creates a gateway against the public catalog API.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the HTTP client cannot be created, for example
    /// when the token is not a valid header value.
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = Self::API_URL.parse::<Url>()?;
        Self::with_base_url(config, base_url)
    }

    /// Creates a gateway against a catalog API at `base_url`.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the HTTP client cannot be created.
    pub fn with_base_url(config: &Config, base_url: Url) -> Result<Self> {
        let http_client = HttpClient::new(config)?;
        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Resolves `path` against the API base URL.
    fn endpoint(base_url: &Url, path: &str) -> Result<Url> {
        let mut url = base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::internal(format!("{base_url} cannot be a base URL")))?
            .pop_if_empty()
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
        Ok(url)
    }

    /// Performs a GET request against the API and unwraps the response
    /// envelope.
    ///
    /// # Errors
    ///
    /// Will return `Err` if:
    /// - the HTTP request fails
    /// - the response cannot be parsed as JSON
    /// - the response envelope carries an API error
    async fn get<T>(&self, path: &str) -> Result<T>
    where
        T: std::fmt::Debug + for<'de> Deserialize<'de>,
    {
        let url = Self::endpoint(&self.base_url, path)?;
        let request = self.http_client.get(url);
        let body = self.http_client.execute(request).await?.text().await?;

        protocol::json::<Response<T>>(&body, path)?.into_result()
    }

    /// Queries the account that the configured token belongs to.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the request fails or the token is rejected.
    pub async fn account_status(&self) -> Result<AccountStatus> {
        self.get("account/status").await
    }

    /// Fetches the metadata of a single track.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the request fails or the track does not exist.
    pub async fn track(&self, id: &TrackId) -> Result<Track> {
        let tracks: Vec<Track> = self.get(&format!("tracks/{id}")).await?;
        tracks
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(format!("track {id} not found")))
    }

    /// Fetches a user's playlist.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the request fails or the playlist does not
    /// exist.
    pub async fn playlist(&self, username: &str, kind: u64) -> Result<Playlist> {
        self.get(&format!("users/{username}/playlists/{kind}"))
            .await
    }

    /// Fetches the tracks that `source` refers to, in source order.
    ///
    /// Playlist entries without embedded metadata are looked up one by one.
    ///
    /// # Errors
    ///
    /// Will return `Err` if any request fails.
    pub async fn tracks(&self, source: &Source) -> Result<Vec<Track>> {
        match source {
            Source::Track { track_id, .. } => Ok(vec![self.track(track_id).await?]),
            Source::Playlist { username, kind } => {
                let playlist = self.playlist(username, *kind).await?;
                debug!(
                    "playlist \"{}\" has {} tracks",
                    playlist.title,
                    playlist.tracks.len()
                );

                let mut tracks = Vec::with_capacity(playlist.tracks.len());
                for entry in playlist.tracks {
                    let track = match entry.track {
                        Some(track) => track,
                        None => {
                            trace!("fetching metadata of playlist entry {}", entry.id);
                            self.track(&entry.id).await?
                        }
                    };
                    tracks.push(track);
                }

                Ok(tracks)
            }
        }
    }
}

#[async_trait]
impl Catalog for Gateway {
    async fn encodings(&self, track_id: &TrackId) -> Result<Vec<EncodingOption>> {
        self.get(&format!("tracks/{track_id}/download-info")).await
    }

    async fn location(&self, query_url: &Url) -> Result<Location> {
        let request = self.http_client.get(query_url.clone());
        let body = self
            .http_client
            .execute(request)
            .await?
            .error_for_status()?
            .text()
            .await?;

        protocol::xml(&body, "download-info")
    }

    async fn download_to_file(&self, url: &str, path: &Path) -> Result<()> {
        let url = url.parse::<Url>()?;
        let written = self.http_client.download(url, path).await?;
        debug!("wrote {written} bytes to {}", path.display());

        Ok(())
    }
}


#[cfg(test)]
pub(crate) mod testing {
    //! In-memory catalog for exercising the download engine.

    use std::{
        collections::{HashMap, HashSet},
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;
    use crate::protocol::gateway::Codec;

    /// Serves one 320 kbps encoding per track and writes a small file per
    /// download. Individual tracks can be configured to misbehave.
    #[derive(Default)]
    pub struct FakeCatalog {
        bitrates: HashMap<String, u32>,
        without_encodings: HashSet<String>,
        failing_encodings: HashSet<String>,
        failing_downloads: HashSet<String>,
        panicking: HashSet<String>,
        delay: Duration,

        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeCatalog {
        pub const HOST: &'static str = "s1.storage.example";
        pub const SEED: &'static str = "seed";

        #[must_use]
        pub fn with_bitrate(mut self, id: &str, bitrate: u32) -> Self {
            self.bitrates.insert(id.to_owned(), bitrate);
            self
        }

        #[must_use]
        pub fn without_encodings(mut self, id: &str) -> Self {
            self.without_encodings.insert(id.to_owned());
            self
        }

        #[must_use]
        pub fn failing_encodings(mut self, id: &str) -> Self {
            self.failing_encodings.insert(id.to_owned());
            self
        }

        #[must_use]
        pub fn failing_download(mut self, id: &str) -> Self {
            self.failing_downloads.insert(id.to_owned());
            self
        }

        #[must_use]
        pub fn panicking(mut self, id: &str) -> Self {
            self.panicking.insert(id.to_owned());
            self
        }

        #[must_use]
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Number of catalog operations performed.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Highest number of downloads that were in progress at once.
        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Catalog for FakeCatalog {
        async fn encodings(&self, track_id: &TrackId) -> Result<Vec<EncodingOption>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let id = track_id.as_str();

            if self.panicking.contains(id) {
                panic!("catalog exploded on track {id}");
            }
            if self.failing_encodings.contains(id) {
                return Err(Error::unavailable("catalog is down"));
            }
            if self.without_encodings.contains(id) {
                return Ok(Vec::new());
            }

            Ok(vec![EncodingOption {
                bitrate: self.bitrates.get(id).copied().unwrap_or(320),
                codec: Codec::Mp3,
                query_url: Some(format!("https://storage.example/download-info/{id}").parse()?),
                direct: false,
                gain: false,
                preview: false,
            }])
        }

        async fn location(&self, query_url: &Url) -> Result<Location> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let id = query_url
                .path_segments()
                .and_then(Iterator::last)
                .unwrap_or_default();

            Ok(Location {
                host: Self::HOST.to_owned(),
                path: format!("/rmusic/{id}"),
                ts: "0005f1b2".to_owned(),
                region: None,
                s: Self::SEED.to_owned(),
            })
        }

        async fn download_to_file(&self, url: &str, path: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let id = url.rsplit('/').next().unwrap_or_default();

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing_downloads.contains(id) {
                return Err(Error::unavailable("connection reset"));
            }

            tokio::fs::write(path, url).await?;
            Ok(())
        }
    }
}
