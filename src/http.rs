//! HTTP client for the catalog API and its download hosts.
//!
//! This module provides a wrapper around `reqwest::Client` that adds:
//! * Consistent timeouts and headers
//! * OAuth authorization for the catalog API
//! * Streaming of response bodies to files
//!
//! # Timeouts
//!
//! API requests are short and use [`Client::REQUEST_TIMEOUT`]. File
//! transfers get the longer [`Client::DOWNLOAD_TIMEOUT`] for the whole
//! transfer.
//!
//! # Example
//!
//! ```rust
//! use yadl::http::Client;
//!
//! let client = Client::new(&config)?;
//!
//! let request = client.get(url);
//! let body = client.execute(request).await?.text().await?;
//!
//! let bytes = client.download(url, Path::new("downloads/song.mp3")).await?;
//! ```

use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use futures_util::StreamExt;
use reqwest::{
    self,
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Method, Url,
};
use tokio::io::AsyncWriteExt;

use crate::{
    config::Config,
    error::{Error, Result},
};

/// HTTP client with catalog headers and timeouts.
pub struct Client {
    inner: reqwest::Client,
}

impl Client {
    /// Duration to keep idle connections alive.
    ///
    /// Prevents frequent reconnection overhead for subsequent requests.
    const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Duration to wait for a connection to be established.
    const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Duration of a complete API request, including the response body.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Duration of a complete file transfer.
    pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(2 * 60);

    /// Suffix of the file a transfer is written to before it completes.
    const PARTIAL_SUFFIX: &'static str = "part";

    /// Creates a new client.
    ///
    /// Sends the configured `User-Agent` with every request, and an
    /// `Authorization` header when a token is configured.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// * HTTP client creation fails
    /// * The token is not a valid header value
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(ref token) = config.token {
            let mut value = HeaderValue::from_str(&format!("OAuth {token}"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let inner = reqwest::Client::builder()
            .tcp_keepalive(Self::KEEPALIVE_TIMEOUT)
            .connect_timeout(Self::CONNECT_TIMEOUT)
            .default_headers(headers)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { inner })
    }

    /// Builds a request with specified method and URL.
    ///
    /// The request times out after [`Self::REQUEST_TIMEOUT`].
    pub fn request<U>(&self, method: Method, url: U) -> reqwest::Request
    where
        U: Into<Url>,
    {
        let mut request = reqwest::Request::new(method, url.into());
        *request.timeout_mut() = Some(Self::REQUEST_TIMEOUT);
        request
    }

    /// Builds a GET request.
    ///
    /// Convenience method for `request()` with GET method.
    pub fn get<U>(&self, url: U) -> reqwest::Request
    where
        U: Into<Url>,
    {
        self.request(Method::GET, url)
    }

    /// Executes a request.
    ///
    /// # Errors
    ///
    /// Returns error if a network error occurs or the request times out.
    pub async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        self.inner.execute(request).await.map_err(Into::into)
    }

    /// Streams the body at `url` into the file at `path`.
    ///
    /// The body is written to `{path}.part` first and renamed to `path` once
    /// complete. On failure the partial file is removed, so `path` only ever
    /// holds complete transfers. A partial file that already exists belongs
    /// to another transfer and is left alone.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// * The request fails or times out
    /// * The response status is not a success
    /// * The partial file already exists
    /// * The file cannot be created or written
    pub async fn download<U>(&self, url: U, path: &Path) -> Result<u64>
    where
        U: Into<Url>,
    {
        let partial = Self::partial_path(path);
        let file = Self::create_partial(&partial).await?;
        let partial = partial.as_path();

        let result = tokio::time::timeout(Self::DOWNLOAD_TIMEOUT, self.transfer(url, file))
            .await
            .map_err(|_| {
                Error::deadline_exceeded(format!(
                    "transfer did not complete within {}s",
                    Self::DOWNLOAD_TIMEOUT.as_secs()
                ))
            })
            .and_then(|result| result);

        match result {
            Ok(written) => {
                tokio::fs::rename(partial, path).await?;
                Ok(written)
            }
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(partial).await {
                    if remove_err.kind() != io::ErrorKind::NotFound {
                        warn!(
                            "could not remove partial file {}: {remove_err}",
                            partial.display()
                        );
                    }
                }
                Err(e)
            }
        }
    }

    fn partial_path(path: &Path) -> PathBuf {
        let mut partial = path.as_os_str().to_owned();
        partial.push(".");
        partial.push(Self::PARTIAL_SUFFIX);
        PathBuf::from(partial)
    }

    async fn create_partial(partial: &Path) -> Result<tokio::fs::File> {
        tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(partial)
            .await
            .map_err(|e| {
                if e.kind() == io::ErrorKind::AlreadyExists {
                    Error::already_exists(format!(
                        "{} is being written by another transfer",
                        partial.display()
                    ))
                } else {
                    e.into()
                }
            })
    }

    async fn transfer<U>(&self, url: U, mut file: tokio::fs::File) -> Result<u64>
    where
        U: Into<Url>,
    {
        let request = reqwest::Request::new(Method::GET, url.into());
        let response = self.execute(request).await?.error_for_status()?;

        if let Some(length) = response.content_length() {
            trace!("downloading {length} bytes");
        }

        let mut written = 0;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}
