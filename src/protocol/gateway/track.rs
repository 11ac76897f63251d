//! Track metadata.
//!
//! # Wire Format
//!
//! ```json
//! {
//!     "id": "12345",
//!     "title": "Song",
//!     "version": "Live",
//!     "available": true,
//!     "durationMs": 215000,
//!     "artists": [{ "id": 1, "name": "Artist" }]
//! }
//! ```
//!
//! Identifiers arrive as numbers or strings depending on the endpoint, so
//! [`TrackId`] accepts both.

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Deserializer, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};

use crate::error::Error;

/// Catalog identifier of a track.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for TrackId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            String(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(number) => Self(number.to_string()),
            Raw::String(string) => Self(string),
        })
    }
}

impl FromStr for TrackId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim();
        if id.is_empty() {
            return Err(Error::invalid_argument("track id must not be empty"));
        }
        Ok(Self(id.to_owned()))
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A performing artist.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct Artist {
    #[serde(default)]
    pub name: String,
}

/// Immutable metadata of a track as returned by the catalog.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: TrackId,

    #[serde(default)]
    pub title: String,

    /// Edition of the recording, such as "Live" or "Remastered 2011".
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub artists: Vec<Artist>,

    /// Whether the catalog allows this track to be downloaded.
    #[serde(default)]
    pub available: bool,

    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(default, rename = "durationMs")]
    pub duration: Option<Duration>,
}

impl Track {
    /// Title followed by the version, trimmed.
    ///
    /// ```rust
    /// // "Song" + "Live" => "Song Live"
    /// // "Song" + None   => "Song"
    /// ```
    #[must_use]
    pub fn full_title(&self) -> String {
        let version = self.version.as_deref().unwrap_or_default();
        format!("{} {version}", self.title).trim().to_owned()
    }

    /// Artist names joined with `", "`.
    #[must_use]
    pub fn artists_string(&self) -> String {
        self.artists
            .iter()
            .map(|artist| artist.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: \"{} - {}\"",
            self.id,
            self.artists_string(),
            self.full_title()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_track() {
        let body = r#"{
            "id": 12345,
            "title": "Song",
            "version": "Live",
            "available": true,
            "durationMs": 215000,
            "artists": [{"id": 1, "name": "A"}, {"id": 2, "name": "B"}],
            "albums": []
        }"#;

        let track: Track = serde_json::from_str(body).unwrap();
        assert_eq!(track.id.as_str(), "12345");
        assert_eq!(track.full_title(), "Song Live");
        assert_eq!(track.artists_string(), "A, B");
        assert!(track.available);
        assert_eq!(track.duration, Some(Duration::from_millis(215_000)));
    }

    #[test]
    fn string_ids_and_missing_fields() {
        let track: Track = serde_json::from_str(r#"{"id": "abc-1", "title": "Song"}"#).unwrap();
        assert_eq!(track.id.as_str(), "abc-1");
        assert_eq!(track.full_title(), "Song");
        assert_eq!(track.artists_string(), "");
        assert!(!track.available);
    }

    #[test]
    fn display() {
        let track = Track {
            id: "7".parse().unwrap(),
            title: "Song".to_owned(),
            artists: vec![Artist {
                name: "A".to_owned(),
            }],
            ..Default::default()
        };
        assert_eq!(track.to_string(), "7: \"A - Song\"");
    }
}
