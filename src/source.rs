//! User-supplied catalog links.
//!
//! Accepted forms, with or without scheme and with an optional query string:
//!
//! * `https://music.yandex.ru/album/{album}/track/{track}`
//! * `https://music.yandex.ru/users/{username}/playlists/{kind}`

use std::{fmt, str::FromStr, sync::LazyLock};

use regex_lite::Regex;

use crate::{error::Error, protocol::gateway::TrackId};

static TRACK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?music\.yandex\.ru/album/(\d+)/track/(\d+)(?:\?.*)?$")
        .expect("track pattern is invalid")
});

static PLAYLIST_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?music\.yandex\.ru/users/([^/]+)/playlists/(\d+)(?:\?.*)?$")
        .expect("playlist pattern is invalid")
});

/// What to download.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Source {
    Track { album_id: u64, track_id: TrackId },
    Playlist { username: String, kind: u64 },
}

impl FromStr for Source {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();

        if let Some(captures) = TRACK_PATTERN.captures(input) {
            return Ok(Self::Track {
                album_id: captures[1].parse()?,
                track_id: captures[2].parse()?,
            });
        }

        if let Some(captures) = PLAYLIST_PATTERN.captures(input) {
            return Ok(Self::Playlist {
                username: captures[1].to_owned(),
                kind: captures[2].parse()?,
            });
        }

        Err(Error::invalid_argument(format!("invalid URL: {input}")))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Track { album_id, track_id } => {
                write!(f, "https://music.yandex.ru/album/{album_id}/track/{track_id}")
            }
            Self::Playlist { username, kind } => {
                write!(f, "https://music.yandex.ru/users/{username}/playlists/{kind}")
            }
        }
    }
}
