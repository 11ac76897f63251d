//! Encodings and file locations of a track.
//!
//! # Wire Format
//!
//! Encodings, from `/tracks/{id}/download-info`:
//! ```json
//! [{
//!     "codec": "mp3",
//!     "gain": false,
//!     "preview": false,
//!     "downloadInfoUrl": "https://storage.mds.yandex.net/download-info/...",
//!     "direct": false,
//!     "bitrateInKbps": 320
//! }]
//! ```
//!
//! Location data, from the `downloadInfoUrl` of one encoding:
//! ```xml
//! <download-info>
//!     <host>s123vla.storage.yandex.net</host>
//!     <path>/rmusic/U2FsdGVk...</path>
//!     <ts>0005f1b2c3d4e5f6</ts>
//!     <region>-1</region>
//!     <s>2f9c...</s>
//! </download-info>
//! ```

use std::fmt;

use serde::Deserialize;
use serde_with::{serde_as, DefaultOnError};
use url::Url;

/// One available encoding of a track.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingOption {
    #[serde(rename = "bitrateInKbps", default)]
    pub bitrate: u32,

    #[serde(default)]
    pub codec: Codec,

    /// Where to query the [`Location`] of this encoding.
    ///
    /// A missing or malformed URL makes only this encoding unusable.
    #[serde_as(as = "DefaultOnError")]
    #[serde(rename = "downloadInfoUrl", default)]
    pub query_url: Option<Url>,

    #[serde(default)]
    pub direct: bool,

    #[serde(default)]
    pub gain: bool,

    #[serde(default)]
    pub preview: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    Mp3,
    Aac,
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mp3 => write!(f, "mp3"),
            Self::Aac => write!(f, "aac"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Raw file location data used to sign a download link.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename = "download-info")]
pub struct Location {
    pub host: String,
    pub path: String,
    pub ts: String,

    #[serde(default)]
    pub region: Option<i64>,

    /// Signing seed.
    pub s: String,
}
