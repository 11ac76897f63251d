//! Catalog API payloads.
//!
//! This module provides type-safe views on the catalog endpoints:
//! * Account status ([`account`])
//! * Track metadata ([`track`])
//! * User playlists ([`playlist`])
//! * Encodings and file locations ([`download_info`])
//!
//! # Response Envelope
//!
//! Every JSON endpoint wraps its payload the same way:
//!
//! ```json
//! {
//!     "invocationInfo": { "req-id": "...", "hostname": "..." },
//!     "result": { ... }
//! }
//! ```
//!
//! Failures replace `result` with an `error` member, either as an object or,
//! for some authentication failures, as a bare name:
//!
//! ```json
//! { "error": { "name": "not-found", "message": "track not found" } }
//! { "error": "session-expired" }
//! ```

pub mod account;
pub mod download_info;
pub mod playlist;
pub mod track;

pub use account::{Account, AccountStatus};
pub use download_info::{Codec, EncodingOption, Location};
pub use playlist::{Owner, Playlist, TrackShort};
pub use track::{Artist, Track, TrackId};

use std::fmt;

use serde::Deserialize;

use crate::error::{Error, ErrorKind};

/// Response envelope of a catalog API endpoint.
///
/// Parsed as a plain struct so that a malformed payload reports the field
/// that failed to parse.
#[derive(Clone, PartialEq, Deserialize, Debug)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Response<T> {
    /// Endpoint-specific payload, absent on failure.
    #[serde(default)]
    pub result: Option<T>,

    /// Description of a service-side failure.
    #[serde(default)]
    pub error: Option<ApiError>,
}

impl<T> Response<T> {
    /// Unwraps the payload, converting a service-side failure into an
    /// [`Error`].
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] categorized by its name when the envelope
    /// carries an error, and a data loss error when it carries neither an
    /// error nor a result.
    pub fn into_result(self) -> crate::error::Result<T> {
        if let Some(error) = self.error {
            return Err(error.into());
        }

        self.result
            .ok_or_else(|| Error::data_loss("response has neither result nor error"))
    }
}

/// Failure reported by the catalog API.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "RawApiError")]
pub struct ApiError {
    /// Machine-readable name, such as `not-found` or `session-expired`
    pub name: String,

    /// Human-readable message; may be empty
    pub message: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawApiError {
    Detailed {
        #[serde(default)]
        name: String,
        #[serde(default)]
        message: String,
    },
    Name(String),
}

impl From<RawApiError> for ApiError {
    fn from(raw: RawApiError) -> Self {
        match raw {
            RawApiError::Detailed { name, message } => Self { name, message },
            RawApiError::Name(name) => Self {
                name,
                message: String::new(),
            },
        }
    }
}

impl ApiError {
    /// Category of this failure, derived from its name.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self.name.as_str() {
            "session-expired" | "Unauthorized" | "unauthorized" => ErrorKind::Unauthenticated,
            "not-found" | "playlist-not-found" => ErrorKind::NotFound,
            "forbidden" => ErrorKind::PermissionDenied,
            "validate" | "bad-request" => ErrorKind::InvalidArgument,
            _ => ErrorKind::Unknown,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ApiError> for Error {
    fn from(e: ApiError) -> Self {
        Self::new(e.kind(), e)
    }
}
