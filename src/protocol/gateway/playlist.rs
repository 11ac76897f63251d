//! User playlists.
//!
//! Playlist entries normally embed the full track object. Entries that only
//! carry an `id` have to be looked up separately.

use serde::Deserialize;

use super::{Track, TrackId};

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub kind: u64,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub track_count: u64,

    #[serde(default)]
    pub owner: Option<Owner>,

    #[serde(default)]
    pub tracks: Vec<TrackShort>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Owner {
    #[serde(default)]
    pub login: String,

    #[serde(default)]
    pub uid: Option<u64>,
}

/// Playlist entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct TrackShort {
    pub id: TrackId,

    #[serde(default)]
    pub track: Option<Track>,
}
